//! Amiga scan codes
//!
//! One byte per transition: bit 7 set for release, 7-bit key code. CAPS
//! LOCK arrives here already converted into a press/release pair by the
//! session.

use keyconv_protocol::commands::amiga::MAX_KEY_CODE;
use keyconv_protocol::KeyEvent;

use super::SequenceDecoder;
use crate::error::SequenceError;

#[derive(Debug, Default)]
pub struct AmigaDecoder;

impl AmigaDecoder {
    pub const fn new() -> Self {
        Self
    }
}

impl SequenceDecoder for AmigaDecoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        let code = byte & 0x7F;
        if code > MAX_KEY_CODE {
            return Err(SequenceError::UnexpectedByte(byte));
        }
        Ok(Some(KeyEvent {
            code,
            make: byte & 0x80 == 0,
        }))
    }

    fn reset(&mut self) {}
}
