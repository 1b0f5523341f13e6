//! Frame decoding and command encoding
//!
//! Word layout handed over by the hardware receiver (right-aligned):
//! - AT/PS2: bit 0 START, bits 1-8 DATA (LSB first), bit 9 PARITY, bit 10 STOP
//! - XT: bit 0 START, bits 1-8 DATA (LSB first)
//! - Amiga: bits 7-0 line levels of D6 D5 D4 D3 D2 D1 D0 D7 (active low)
//! - M0110: bits 7-0 DATA (MSB first on the wire)

use crate::parity::odd_parity_bit;

/// AT/PS2 start bit level
const START_LOW: u32 = 0;

/// AT/PS2 stop bit level
const STOP_HIGH: u32 = 1;

/// Mask for one complete AT/PS2 frame
const AT_FRAME_MASK: u32 = 0x7FF;

/// Errors that can occur while validating a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Start bit has the wrong level; bit alignment is lost
    BadStart,
    /// Parity bit does not make the frame odd; ask the device to resend
    BadParity,
    /// Stop bit has the wrong level; bit alignment is lost
    BadStop,
}

impl FrameError {
    /// True if the frame position in the bit stream can no longer be trusted
    ///
    /// Such errors require a session reset and a receiver restart, while a
    /// parity error only requires the device to resend the last byte.
    pub fn needs_resync(self) -> bool {
        matches!(self, FrameError::BadStart | FrameError::BadStop)
    }
}

/// Wire shape of a protocol's frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireFormat {
    /// 11-bit odd-parity frame, bidirectional
    AtPs2,
    /// 9-bit frame, device to host only
    Xt,
    /// 8 inverted, rotated bits, acknowledged by a handshake pulse
    Amiga,
    /// 8 bits MSB first, keyboard clocked
    M0110,
}

impl WireFormat {
    /// True if the host can send commands to the device
    pub fn is_bidirectional(self) -> bool {
        matches!(self, WireFormat::AtPs2 | WireFormat::M0110)
    }
}

/// One AT/PS2 frame split into its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub start_bit: bool,
    pub data: u8,
    pub parity_bit: bool,
    pub stop_bit: bool,
}

impl Frame {
    /// Split a right-aligned 11-bit word
    pub fn from_word(word: u32) -> Self {
        let word = word & AT_FRAME_MASK;
        Self {
            start_bit: word & 0x1 != START_LOW,
            data: ((word >> 1) & 0xFF) as u8,
            parity_bit: (word >> 9) & 0x1 != 0,
            stop_bit: (word >> 10) & 0x1 == STOP_HIGH,
        }
    }

    /// Assemble the right-aligned 11-bit word for a data byte
    pub fn to_word(data: u8) -> u32 {
        let parity = odd_parity_bit(data) as u32;
        START_LOW | ((data as u32) << 1) | (parity << 9) | (STOP_HIGH << 10)
    }

    /// Check start, stop and parity, yielding the data byte
    ///
    /// Start and stop are checked first: with a misaligned frame the parity
    /// bit is meaningless.
    pub fn validate(&self) -> Result<u8, FrameError> {
        if self.start_bit {
            return Err(FrameError::BadStart);
        }
        if !self.stop_bit {
            return Err(FrameError::BadStop);
        }
        if odd_parity_bit(self.data) != self.parity_bit {
            return Err(FrameError::BadParity);
        }
        Ok(self.data)
    }
}

/// Turn one hardware word into a validated byte
pub fn decode_frame(format: WireFormat, word: u32) -> Result<u8, FrameError> {
    match format {
        WireFormat::AtPs2 => Frame::from_word(word).validate(),
        WireFormat::Xt => {
            // Clone keyboards send a single high start bit, genuine IBM
            // keyboards a low/high pair of which the receiver keeps the last.
            if word & 0x1 == 0 {
                return Err(FrameError::BadStart);
            }
            Ok(((word >> 1) & 0xFF) as u8)
        }
        WireFormat::Amiga => Ok((!(word as u8)).rotate_right(1)),
        WireFormat::M0110 => Ok(word as u8),
    }
}

/// Encode a host-to-device command for the transmitter
///
/// AT/PS2 commands carry data, odd parity and the stop bit, LSB first; the
/// transmitter generates the start bit itself by pulling DATA low. Returns
/// `None` for protocols without a host-to-device path.
pub fn encode_command(format: WireFormat, byte: u8) -> Option<u32> {
    match format {
        WireFormat::AtPs2 => {
            let parity = odd_parity_bit(byte) as u32;
            Some((byte as u32) | (parity << 8) | (STOP_HIGH << 9))
        }
        WireFormat::M0110 => Some(byte as u32),
        WireFormat::Xt | WireFormat::Amiga => None,
    }
}
