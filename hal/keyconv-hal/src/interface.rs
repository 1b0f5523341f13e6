//! Protocol interface capability
//!
//! The hardware bit receiver/transmitter is treated as an external
//! capability: it already solves sub-microsecond signal timing and hands the
//! engine whole frames. Bidirectional protocols (AT/PS2) deliver an 11-bit
//! word (start, 8 data, parity, stop) right-aligned with the start bit in
//! bit 0. IBM XT delivers a 9-bit word (start, 8 data). Amiga and M0110
//! deliver the 8 data bits as shifted in.

use crate::gpio::InputPin;

/// One frame as delivered by the hardware receiver, right-aligned
pub type RawWord = u32;

/// Errors from the command transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// Transmit FIFO is full, the command was not queued
    Busy,
    /// The protocol has no host-to-device path (IBM XT)
    Unsupported,
}

/// Hardware frame receiver
///
/// Implementations must never block; the receive path polls or awaits the
/// hardware FIFO outside of this trait.
pub trait FrameReceiver {
    /// Pop the next frame from the hardware FIFO, if one is pending
    fn read_frame(&mut self) -> Option<RawWord>;

    /// Restart the receiver from a known idle state
    ///
    /// Used after a framing error, when the bit position in the stream can
    /// no longer be trusted.
    fn restart(&mut self);
}

/// Host-to-device command path
pub trait CommandTransmitter {
    /// Queue a pre-encoded command word (data plus any parity/stop bits)
    fn send_command(&mut self, word: RawWord) -> Result<(), TransmitError>;
}

/// Transmitter for receive-only protocols (IBM XT, Amiga)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveOnly;

impl CommandTransmitter for ReceiveOnly {
    fn send_command(&mut self, _word: RawWord) -> Result<(), TransmitError> {
        Err(TransmitError::Unsupported)
    }
}

/// Idle sensing of the device clock line
///
/// Protocol sessions only count a timeout "stall" while the clock line is
/// idle-high: the device is present but not talking.
pub trait ClockLine {
    /// True if the clock line currently rests at its idle level
    fn is_idle(&self) -> bool;
}

/// Any input pin can serve as an idle-high clock sense
impl<P: InputPin> ClockLine for P {
    fn is_idle(&self) -> bool {
        self.is_high()
    }
}
