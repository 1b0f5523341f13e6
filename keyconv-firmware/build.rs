//! Build script for keyconv-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates converter.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const PROTOCOLS: &[&str] = &["at", "ps2", "at_ps2", "ps2_mouse", "mouse", "xt", "amiga", "m0110"];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate converter.toml
fn validate_config() {
    println!("cargo:rerun-if-changed=converter.toml");

    let config_path = Path::new("converter.toml");
    if !config_path.exists() {
        fail("converter.toml not found", &["The firmware embeds converter.toml; create one in keyconv-firmware."]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read converter.toml", &[&e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let msg = e.to_string();
            let lines: Vec<&str> = msg.lines().collect();
            fail("Invalid TOML syntax in converter.toml", &lines)
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_interface(&config, &mut errors);
    validate_timing(&config, &mut errors);
    validate_status(&config, &mut errors);

    if !errors.is_empty() {
        let lines: Vec<&str> = errors.iter().map(String::as_str).collect();
        fail("Invalid converter.toml", &lines);
    }

    println!("cargo:warning=converter.toml validated successfully");
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[&str]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        return;
    };
    for (name, value) in table {
        if !["interface", "timing", "mouse", "status"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

/// Parse "^!gpioNN" into the GPIO number
fn pin_number(value: &str) -> Option<u8> {
    let digits = value.trim_start_matches(['^', '!']).strip_prefix("gpio")?;
    digits.parse::<u8>().ok().filter(|&n| n <= 29)
}

fn pin_field(section: &toml::Value, key: &str, errors: &mut Vec<String>) -> Option<u8> {
    match section.get(key) {
        Some(toml::Value::String(s)) => {
            let pin = pin_number(s);
            if pin.is_none() {
                errors.push(format!("'{}' is not a valid pin (gpio0-gpio29)", s));
            }
            pin
        }
        Some(_) => {
            errors.push(format!("{} must be a string like \"gpio2\"", key));
            None
        }
        None => None,
    }
}

fn validate_interface(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(iface) = config.get("interface") else {
        return;
    };

    match iface.get("protocol") {
        Some(toml::Value::String(p)) if PROTOCOLS.contains(&p.as_str()) => {}
        Some(_) => errors.push(format!("protocol must be one of {}", PROTOCOLS.join(", "))),
        None => {}
    }

    match iface.get("code_set") {
        Some(toml::Value::Integer(1..=3)) | None => {}
        Some(toml::Value::String(s)) if ["set1", "set2", "set3"].contains(&s.as_str()) => {}
        Some(_) => errors.push("code_set must be 1, 2 or 3".to_string()),
    }

    let data = pin_field(iface, "data_pin", errors).unwrap_or(2);
    let clock = pin_field(iface, "clock_pin", errors).unwrap_or(3);
    if clock != data + 1 {
        errors.push(format!(
            "clock_pin (gpio{}) must be the GPIO above data_pin (gpio{})",
            clock, data
        ));
    }

    let led = config
        .get("status")
        .and_then(|s| s.get("led_pin"))
        .and_then(|v| v.as_str())
        .and_then(pin_number);
    if let Some(led) = led {
        if led == data || led == clock {
            errors.push(format!("led_pin gpio{} is used by the interface", led));
        }
    }
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(timing) = config.get("timing").and_then(|t| t.as_table()) else {
        return;
    };
    for (key, value) in timing {
        let max = match key.as_str() {
            "stall_period_ms" | "response_timeout_ms" => 60_000,
            "ack_stall_limit" | "id_stall_limit" => 255,
            _ => {
                errors.push(format!("[timing] unknown key '{}'", key));
                continue;
            }
        };
        match value.as_integer() {
            Some(v) if (1..=max).contains(&v) => {}
            _ => errors.push(format!("[timing] {} must be 1-{}", key, max)),
        }
    }
}

fn validate_status(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(status) = config.get("status") {
        pin_field(status, "led_pin", errors);
    }
}
