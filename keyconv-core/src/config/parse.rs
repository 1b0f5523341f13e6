//! Minimal TOML parser for the converter configuration
//!
//! Handles only the subset `converter.toml` needs; arrays, inline tables and
//! multi-line strings are not supported.
//!
//! Supported:
//! - `[interface]`, `[timing]`, `[mouse]` and `[status]` section headers
//! - Key = value pairs (string, integer, boolean)
//! - Comments (# ...), whole-line and trailing
//!
//! Pins are written as `"gpioNN"`, optionally prefixed with `^` (pull-up)
//! and/or `!` (inverted).

use super::types::{CodeSet, ConverterConfig, PinConfig, Protocol};

/// Highest GPIO number on the RP2040
const MAX_PIN: u8 = 29;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Key not valid in the current section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Invalid pin string or pin assignment
    InvalidPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Interface,
    Timing,
    Mouse,
    Status,
}

/// Parse TOML configuration into a [`ConverterConfig`]
///
/// Missing keys keep their defaults.
pub fn parse_config(input: &str) -> Result<ConverterConfig, ParseError> {
    let mut config = ConverterConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&header[1..header.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        apply_value(section, key, value, &mut config)?;
    }

    validate(&config)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "interface" => Ok(Section::Interface),
        "timing" => Ok(Section::Timing),
        "mouse" => Ok(Section::Mouse),
        "status" => Ok(Section::Status),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut ConverterConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => return Err(ParseError::UnknownKey),
        Section::Interface => {
            let iface = &mut config.interface;
            match key {
                "protocol" => iface.protocol = parse_protocol(value)?,
                "code_set" => iface.code_set = parse_code_set(value)?,
                "data_pin" => iface.data_pin = parse_pin(value)?,
                "clock_pin" => iface.clock_pin = parse_pin(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Timing => {
            let timing = &mut config.timing;
            match key {
                "stall_period_ms" => timing.stall_period_ms = parse_nonzero(value)?,
                "ack_stall_limit" => timing.ack_stall_limit = parse_nonzero(value)?,
                "id_stall_limit" => timing.id_stall_limit = parse_nonzero(value)?,
                "response_timeout_ms" => timing.response_timeout_ms = parse_nonzero(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Mouse => match key {
            "wheel" => config.mouse.wheel = parse_bool(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Status => match key {
            "led_pin" => config.status.led_pin = Some(parse_pin(value)?),
            _ => return Err(ParseError::UnknownKey),
        },
    }
    Ok(())
}

/// Check cross-field constraints
fn validate(config: &ConverterConfig) -> Result<(), ParseError> {
    let iface = &config.interface;
    if iface.clock_pin.pin != iface.data_pin.pin + 1 {
        return Err(ParseError::InvalidPin);
    }
    if let Some(led) = config.status.led_pin {
        if led.pin == iface.data_pin.pin || led.pin == iface.clock_pin.pin {
            return Err(ParseError::InvalidPin);
        }
    }
    Ok(())
}

fn strip_comment(s: &str) -> &str {
    match s.find('#') {
        // Make sure # is not inside a string
        Some(pos) if s[..pos].matches('"').count() % 2 == 0 => s[..pos].trim(),
        _ => s,
    }
}

/// Parse a key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_nonzero<T: core::str::FromStr + PartialEq + Default>(value: &str) -> Result<T, ParseError> {
    let v: T = parse_int(value)?;
    if v == T::default() {
        return Err(ParseError::InvalidValue);
    }
    Ok(v)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_protocol(value: &str) -> Result<Protocol, ParseError> {
    match parse_string(value)? {
        "at" | "ps2" | "at_ps2" => Ok(Protocol::AtPs2Keyboard),
        "ps2_mouse" | "mouse" => Ok(Protocol::AtPs2Mouse),
        "xt" => Ok(Protocol::Xt),
        "amiga" => Ok(Protocol::Amiga),
        "m0110" => Ok(Protocol::M0110),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Accepts `2` as well as `"set2"`
fn parse_code_set(value: &str) -> Result<CodeSet, ParseError> {
    let n: u8 = match parse_string(value) {
        Ok(s) => parse_int(s.strip_prefix("set").ok_or(ParseError::InvalidValue)?)?,
        Err(_) => parse_int(value)?,
    };
    match n {
        1 => Ok(CodeSet::Set1),
        2 => Ok(CodeSet::Set2),
        3 => Ok(CodeSet::Set3),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a pin string like `"^gpio2"` or `"!gpio25"`
fn parse_pin(value: &str) -> Result<PinConfig, ParseError> {
    let mut s = parse_string(value)?;
    let mut inverted = false;
    let mut pull_up = false;

    loop {
        if let Some(rest) = s.strip_prefix('!') {
            inverted = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('^') {
            pull_up = true;
            s = rest;
        } else {
            break;
        }
    }

    let pin: u8 = s
        .strip_prefix("gpio")
        .ok_or(ParseError::InvalidPin)?
        .parse()
        .map_err(|_| ParseError::InvalidPin)?;
    if pin > MAX_PIN {
        return Err(ParseError::InvalidPin);
    }

    Ok(PinConfig {
        pin,
        inverted,
        pull_up,
    })
}
