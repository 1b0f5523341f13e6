//! Per-device protocol sessions
//!
//! A session owns device initialization, command issuance, lock LED
//! synchronization and the timeout/retry policy of one legacy device. It is
//! driven by two entry points:
//!
//! - `on_byte` for every validated protocol byte (interrupt context)
//! - `on_tick` periodically from the task loop, so timeouts progress even
//!   when the device is silent
//!
//! Both return an [`Action`] for the port to carry out. Sessions never touch
//! hardware or the ring buffer themselves.
//!
//! # Layering
//!
//! Sessions consume every byte that is protocol management or a device
//! quirk (acks, resend requests, self-test results, Amiga management codes
//! and CAPS LOCK toggles, M0110 null responses). Everything else is passed
//! on for decoding; scan-code sequences, prefixes included, belong to the
//! decoders.

pub mod amiga;
pub mod at_ps2;
pub mod m0110;
pub mod mouse;
pub mod stall;
pub mod xt;

pub use amiga::AmigaKeyboard;
pub use at_ps2::AtPs2Keyboard;
pub use m0110::M0110Keyboard;
pub use mouse::AtPs2Mouse;
pub use stall::StallTimer;
pub use xt::XtKeyboard;

use keyconv_protocol::commands::ps2;
use keyconv_protocol::LockLeds;

use crate::config::{CodeSet, ConverterConfig, Protocol};
use crate::error::DiagnosticLog;

/// What the port must do after a session handled an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Nothing further
    None,
    /// Send a command byte to the device
    SendCommand(u8),
    /// Pass the byte just received on to the decoder
    EnqueueForDecoding,
    /// Pass the byte on and poll the device again (host-driven protocols)
    EnqueueAndSend(u8),
    /// Queue two synthetic bytes instead of the one received
    EnqueueBytes(u8, u8),
    /// Restart the hardware receiver
    RestartReceiver,
}

/// Common contract of all protocol sessions
pub trait ProtocolSession {
    /// Handle one validated byte from the device
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action;

    /// Evaluate timeouts
    ///
    /// `clock_idle` reports whether the device clock line rests idle-high.
    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action;

    /// Forget all device state and start over from `Uninitialised`
    fn reset(&mut self);

    /// True once the device is ready for normal operation
    fn is_initialised(&self) -> bool;

    /// Number of times the session has reached `Initialised`
    ///
    /// Bytes queued before a change of epoch belong to a previous device
    /// session and must not be combined with later ones.
    fn epoch(&self) -> u16;

    /// Lock LED state requested by the host
    fn set_lock_leds(&mut self, _leds: LockLeds) {}
}

/// Stop resending after this many consecutive resend requests
const MAX_RESENDS: u8 = 3;

/// Last command sent, for answering resend requests
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CommandTracker {
    last: Option<u8>,
    resends: u8,
}

impl CommandTracker {
    pub(crate) const fn new() -> Self {
        Self {
            last: None,
            resends: 0,
        }
    }

    pub(crate) fn send(&mut self, command: u8) -> Action {
        self.last = Some(command);
        self.resends = 0;
        Action::SendCommand(command)
    }

    /// Repeat the last command, or `None` if the device keeps refusing it
    pub(crate) fn resend(&mut self) -> Option<Action> {
        let command = self.last?;
        if self.resends >= MAX_RESENDS {
            return None;
        }
        self.resends += 1;
        Some(Action::SendCommand(command))
    }

    pub(crate) fn last(&self) -> Option<u8> {
        self.last
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    /// Issue the reset command
    pub(crate) fn reset_device(&mut self) -> Action {
        self.send(ps2::RESET)
    }
}

/// The session of the configured device
#[derive(Debug)]
pub enum DeviceSession {
    AtPs2Keyboard(AtPs2Keyboard),
    AtPs2Mouse(AtPs2Mouse),
    Xt(XtKeyboard),
    Amiga(AmigaKeyboard),
    M0110(M0110Keyboard),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            DeviceSession::AtPs2Keyboard($s) => $body,
            DeviceSession::AtPs2Mouse($s) => $body,
            DeviceSession::Xt($s) => $body,
            DeviceSession::Amiga($s) => $body,
            DeviceSession::M0110($s) => $body,
        }
    };
}

impl DeviceSession {
    /// Create the session for the configured protocol
    pub fn new(config: &ConverterConfig) -> Self {
        let timing = config.timing;
        match config.interface.protocol {
            Protocol::AtPs2Keyboard => {
                DeviceSession::AtPs2Keyboard(AtPs2Keyboard::new(timing, config.interface.code_set))
            }
            Protocol::AtPs2Mouse => DeviceSession::AtPs2Mouse(AtPs2Mouse::new(timing, config.mouse.wheel)),
            Protocol::Xt => DeviceSession::Xt(XtKeyboard::new(timing)),
            Protocol::Amiga => DeviceSession::Amiga(AmigaKeyboard::new()),
            Protocol::M0110 => DeviceSession::M0110(M0110Keyboard::new(timing)),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            DeviceSession::AtPs2Keyboard(_) => Protocol::AtPs2Keyboard,
            DeviceSession::AtPs2Mouse(_) => Protocol::AtPs2Mouse,
            DeviceSession::Xt(_) => Protocol::Xt,
            DeviceSession::Amiga(_) => Protocol::Amiga,
            DeviceSession::M0110(_) => Protocol::M0110,
        }
    }

    /// Scan code set in use, for IBM keyboards
    pub fn code_set(&self) -> Option<CodeSet> {
        match self {
            DeviceSession::AtPs2Keyboard(s) => Some(s.code_set()),
            DeviceSession::Xt(_) => Some(CodeSet::Set1),
            _ => None,
        }
    }

    /// Whether the mouse reports a scroll wheel
    pub fn mouse_wheel(&self) -> Option<bool> {
        match self {
            DeviceSession::AtPs2Mouse(s) => Some(s.has_wheel()),
            _ => None,
        }
    }
}

impl ProtocolSession for DeviceSession {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        dispatch!(self, s => s.on_byte(byte, diag))
    }

    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action {
        dispatch!(self, s => s.on_tick(now_ms, clock_idle, diag))
    }

    fn reset(&mut self) {
        dispatch!(self, s => s.reset())
    }

    fn is_initialised(&self) -> bool {
        dispatch!(self, s => s.is_initialised())
    }

    fn epoch(&self) -> u16 {
        dispatch!(self, s => s.epoch())
    }

    fn set_lock_leds(&mut self, leds: LockLeds) {
        dispatch!(self, s => s.set_lock_leds(leds))
    }
}
