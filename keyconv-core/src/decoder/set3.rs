//! Scan code set 3
//!
//! One byte per key, breaks announced by 0xF0, no prefixes. Three codes
//! above 0x7F are remapped before the make/break split.

use keyconv_protocol::KeyEvent;

use super::SequenceDecoder;
use crate::error::SequenceError;

const BREAK_PREFIX: u8 = 0xF0;

/// Set 3 code to interface code
fn remap(byte: u8) -> Option<u8> {
    match byte {
        0x83 => Some(0x02), // F7
        0x84 => Some(0x7F), // Keypad -
        0x85 => Some(0x68), // F13 on 122-key boards
        0x01..=0x7F => Some(byte),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Set3State {
    #[default]
    Init,
    F0,
}

#[derive(Debug, Default)]
pub struct Set3Decoder {
    state: Set3State,
}

impl Set3Decoder {
    pub const fn new() -> Self {
        Self {
            state: Set3State::Init,
        }
    }

    pub fn state(&self) -> Set3State {
        self.state
    }
}

impl SequenceDecoder for Set3Decoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        match (self.state, byte) {
            (Set3State::Init, BREAK_PREFIX) => {
                self.state = Set3State::F0;
                Ok(None)
            }
            (Set3State::Init, _) => Ok(remap(byte).map(KeyEvent::make)),
            (Set3State::F0, _) => {
                self.state = Set3State::Init;
                let code = remap(byte).ok_or(SequenceError::UnexpectedByte(byte))?;
                Ok(Some(KeyEvent::brk(code)))
            }
        }
    }

    fn reset(&mut self) {
        self.state = Set3State::Init;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::feed_all;

    #[test]
    fn test_make_break() {
        let mut d = Set3Decoder::new();
        assert_eq!(
            feed_all(&mut d, &[0x1C, 0xF0, 0x1C]),
            [KeyEvent::make(0x1C), KeyEvent::brk(0x1C)]
        );
    }

    #[test]
    fn test_remapped_codes() {
        let mut d = Set3Decoder::new();
        assert_eq!(
            feed_all(&mut d, &[0x83, 0x84, 0xF0, 0x85]),
            [KeyEvent::make(0x02), KeyEvent::make(0x7F), KeyEvent::brk(0x68)]
        );
    }

    #[test]
    fn test_no_extended_prefix() {
        let mut d = Set3Decoder::new();
        // 0xE0 is not a set 3 prefix and not a key
        assert!(feed_all(&mut d, &[0xE0]).is_empty());
        assert_eq!(d.state(), Set3State::Init);
        d.step(0xF0).unwrap();
        assert_eq!(d.step(0xE0), Err(SequenceError::UnexpectedByte(0xE0)));
        assert_eq!(d.state(), Set3State::Init);
    }
}
