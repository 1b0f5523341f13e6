//! Configuration type definitions

use keyconv_protocol::WireFormat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Legacy device attached to the converter port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Protocol {
    /// IBM AT or PS/2 keyboard
    #[default]
    AtPs2Keyboard,
    /// PS/2 mouse, optionally with wheel
    AtPs2Mouse,
    /// IBM PC/XT keyboard
    Xt,
    /// Commodore Amiga keyboard
    Amiga,
    /// Apple M0110/M0110A keyboard
    M0110,
}

impl Protocol {
    /// Frame shape the hardware receiver delivers for this protocol
    pub fn wire_format(self) -> WireFormat {
        match self {
            Protocol::AtPs2Keyboard | Protocol::AtPs2Mouse => WireFormat::AtPs2,
            Protocol::Xt => WireFormat::Xt,
            Protocol::Amiga => WireFormat::Amiga,
            Protocol::M0110 => WireFormat::M0110,
        }
    }

    /// True for pointing devices
    pub fn is_mouse(self) -> bool {
        matches!(self, Protocol::AtPs2Mouse)
    }
}

/// IBM scan code set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CodeSet {
    /// XT keyboards, and AT keyboards switched to translation mode
    Set1,
    /// PS/2 default
    #[default]
    Set2,
    /// Terminal keyboards
    Set3,
}

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number (0-29 for RP2040)
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a new pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: false,
        }
    }

    /// Create a pin with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
            pull_up: true,
        }
    }
}

/// Device port wiring and protocol selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterfaceConfig {
    /// Attached device
    pub protocol: Protocol,
    /// Scan code set assumed for AT/PS2 keyboards that do not identify
    /// as terminal keyboards
    pub code_set: CodeSet,
    /// DATA line
    pub data_pin: PinConfig,
    /// CLOCK line
    ///
    /// The RP2040 receivers sample CLOCK relative to DATA, so this must be
    /// the pin right after `data_pin`.
    pub clock_pin: PinConfig,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::AtPs2Keyboard,
            code_set: CodeSet::Set2,
            data_pin: PinConfig::with_pullup(2),
            clock_pin: PinConfig::with_pullup(3),
        }
    }
}

/// Session timeout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Length of one stall period (ms)
    pub stall_period_ms: u32,
    /// Stalls tolerated while waiting for the power-on ack or self test
    pub ack_stall_limit: u8,
    /// Stalls tolerated during identification and mode setup
    pub id_stall_limit: u8,
    /// Poll response timeout for host-driven protocols (ms)
    pub response_timeout_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stall_period_ms: 200,
            ack_stall_limit: 5,
            id_stall_limit: 2,
            response_timeout_ms: 500,
        }
    }
}

/// Mouse options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseConfig {
    /// Probe for an IntelliMouse scroll wheel
    pub wheel: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self { wheel: true }
    }
}

/// Status output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusConfig {
    /// LED lit while the device is initialised
    pub led_pin: Option<PinConfig>,
}

/// Complete converter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConverterConfig {
    pub interface: InterfaceConfig,
    pub timing: TimingConfig,
    pub mouse: MouseConfig,
    pub status: StatusConfig,
}
