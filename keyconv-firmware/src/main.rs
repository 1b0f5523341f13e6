//! keyconv - Legacy Keyboard and Mouse Converter Firmware
//!
//! Main firmware binary for RP2040-based converters. Reads an IBM AT/PS2,
//! IBM XT, Commodore Amiga or Apple M0110 keyboard (or a PS/2 mouse)
//! through one PIO state machine and hands decoded key and mouse events to
//! the USB HID layer.
//!
//! # Executors
//!
//! - Interrupt executor on `SWI_IRQ_1` (priority P1): the interface task,
//!   which owns the PIO state machine and feeds frames to the port
//! - Thread mode: coordinator (decoding and session timeouts), HID and
//!   status LED tasks

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Pio;
use {defmt_rtt as _, panic_probe as _};

use keyconv_core::config::{parse_config, ConverterConfig};
use keyconv_core::Port;
use keyconv_hal_rp2040::pins::PinBank;
use keyconv_hal_rp2040::{PioClockLine, PioInterface, StatusLed};

use crate::channels::{QueuedTransmitter, PORT};

mod channels;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit converter.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../converter.toml");

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

/// Executor for the receive path, preempts thread mode
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("keyconv firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    let iface = config.interface;
    info!(
        "Interface: {} on data gpio{=u8}, clock gpio{=u8}",
        iface.protocol, iface.data_pin.pin, iface.clock_pin.pin
    );
    if iface.data_pin.inverted || iface.clock_pin.inverted {
        warn!("Inverted interface pins are not supported, ignoring '!'");
    }

    let (mut pins, remaining) = PinBank::from_peripherals(p);
    let data_pin = unwrap!(pins.take(iface.data_pin.pin));
    let clock_pin = unwrap!(pins.take(iface.clock_pin.pin));

    // Protocol interface on PIO0 SM0
    let Pio {
        mut common, sm0, ..
    } = Pio::new(remaining.pio0, Irqs);
    let interface = PioInterface::new(
        &mut common,
        sm0,
        data_pin,
        clock_pin,
        iface.protocol.wire_format(),
        iface.data_pin.pull_up || iface.clock_pin.pull_up,
    );
    info!("PIO interface initialized");

    let clock = PioClockLine::new(iface.clock_pin.pin);
    PORT.lock(|port| {
        *port.borrow_mut() = Some(Port::new(&config, QueuedTransmitter, clock));
    });

    let status_led = config.status.led_pin.and_then(|led| match pins.take(led.pin) {
        Ok(pin) => Some(StatusLed::new(pin, led.inverted)),
        Err(e) => {
            warn!("Status LED gpio{=u8} unavailable: {}", led.pin, e);
            None
        }
    });

    // Receive path at interrupt priority
    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high_spawner
        .spawn(tasks::interface_task(interface))
        .unwrap();

    spawner.spawn(tasks::hid_task()).unwrap();
    if let Some(led) = status_led {
        spawner.spawn(tasks::status_led_task(led)).unwrap();
    }
    spawner.spawn(tasks::coordinator_task(config)).unwrap();

    info!("All tasks spawned, firmware running");

    // `common` owns the loaded PIO program and must outlive the interface
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded configuration
///
/// build.rs validates converter.toml, so a failure here means the core
/// parser and the build-time check disagree. Defaults keep the converter
/// usable.
fn load_config() -> ConverterConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using default configuration");
            ConverterConfig::default()
        }
    }
}
