//! Inter-task communication
//!
//! Statics shared between the interrupt-priority interface task and the
//! thread-mode tasks. The port itself sits behind a critical-section mutex
//! so `on_frame` and `on_tick` always run to completion.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use keyconv_core::decoder::Decoded;
use keyconv_core::error::DiagnosticLog;
use keyconv_core::{HidSink, Port, PortControl, PortTick, RingBuffer, StatusSink};
use keyconv_hal::{CommandTransmitter, RawWord, TransmitError};
use keyconv_hal_rp2040::PioClockLine;
use keyconv_protocol::{KeyEvent, LockLeds, MouseReport};

/// Commands waiting for the PIO transmit FIFO
const COMMAND_QUEUE_SIZE: usize = 4;

/// Decoded events waiting for the USB HID layer
const EVENT_CHANNEL_SIZE: usize = 16;

/// Port as used by the firmware
pub type FirmwarePort = Port<QueuedTransmitter, PioClockLine>;

/// Device session and command path
pub static PORT: Mutex<CriticalSectionRawMutex, RefCell<Option<FirmwarePort>>> =
    Mutex::new(RefCell::new(None));

/// Bytes accepted by the session, waiting for the decoder
pub static RING: RingBuffer = RingBuffer::new();

/// Encoded command words for the interface task
pub static COMMANDS: Channel<CriticalSectionRawMutex, RawWord, COMMAND_QUEUE_SIZE> =
    Channel::new();

/// Decoded key and mouse events for the USB HID layer
pub static HID_EVENTS: Channel<CriticalSectionRawMutex, Decoded, EVENT_CHANNEL_SIZE> =
    Channel::new();

/// Ask the interface task to restart its receiver
pub static RESTART_RECEIVER: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// New bytes in `RING`
pub static DATA_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Device lifecycle for the status LED
pub static DEVICE_READY: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Lock LED state reported by the USB host
///
/// Produced by the USB HID output-report handler; until one is attached the
/// keyboard LEDs stay off.
pub static HOST_LEDS: Signal<CriticalSectionRawMutex, LockLeds> = Signal::new();

/// Command transmitter that hands words to the interface task
///
/// The PIO state machine is owned by the interface task; sessions running
/// under the port mutex only ever queue.
pub struct QueuedTransmitter;

impl CommandTransmitter for QueuedTransmitter {
    fn send_command(&mut self, word: RawWord) -> Result<(), TransmitError> {
        COMMANDS.try_send(word).map_err(|_| TransmitError::Busy)
    }
}

/// Coordinator access to `PORT`, one critical section per call
///
/// Pending host LED changes are handed to the session on the way.
pub struct SharedPort;

impl PortControl for SharedPort {
    fn service(
        &mut self,
        now_ms: u32,
        ring: &RingBuffer,
        diagnostics: &mut DiagnosticLog,
    ) -> Option<PortTick> {
        let leds = HOST_LEDS.try_take();
        PORT.lock(|port| {
            let mut port = port.borrow_mut();
            let port = port.as_mut()?;
            if let Some(leds) = leds {
                port.set_lock_leds(leds);
            }
            Some(port.service(now_ms, ring, diagnostics))
        })
    }
}

/// HID sink feeding `HID_EVENTS`
pub struct ChannelSink;

impl HidSink for ChannelSink {
    fn ready(&self) -> bool {
        !HID_EVENTS.is_full()
    }

    fn deliver(&mut self, event: KeyEvent) {
        if HID_EVENTS.try_send(Decoded::Key(event)).is_err() {
            defmt::warn!("HID queue full, key {=u8:#x} lost", event.code);
        }
    }

    fn deliver_mouse(&mut self, report: MouseReport) {
        if HID_EVENTS.try_send(Decoded::Mouse(report)).is_err() {
            defmt::warn!("HID queue full, mouse report lost");
        }
    }
}

/// Status sink feeding `DEVICE_READY`
pub struct SignalStatus;

impl StatusSink for SignalStatus {
    fn set_initialised(&mut self, initialised: bool) {
        DEVICE_READY.signal(initialised);
    }
}
