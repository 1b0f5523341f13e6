//! Apple M0110/M0110A scan codes
//!
//! Every byte carries a 1 in bit 0, the 6-bit key code in bits 6-1 and the
//! release flag in bit 7. Keypad keys of the M0110A (and the external
//! keypad) are announced by 0x79. The keypad operators `= / * +` are
//! shifted keypad codes: the keyboard sends a shift transition (0x71 or
//! 0xF1) followed by 0x79 and the key. The shift transition is reported as
//! is; the operator after it gets its own interface code.

use keyconv_protocol::commands::m0110::{KEYPAD_PREFIX, SHIFT_PREFIX};
use keyconv_protocol::KeyEvent;

use super::SequenceDecoder;
use crate::error::SequenceError;

const BREAK: u8 = 0x80;

/// Keypad keys are folded above the main key block
const KEYPAD: u8 = 0x40;

/// Interface codes for the shifted keypad operators
pub const KP_EQUAL: u8 = 0x80 | 0x06;
pub const KP_SLASH: u8 = 0x80 | 0x0D;
pub const KP_ASTERISK: u8 = 0x80 | 0x02;
pub const KP_PLUS: u8 = 0x80 | 0x08;

fn key_code(byte: u8) -> u8 {
    (byte >> 1) & 0x3F
}

fn is_make(byte: u8) -> bool {
    byte & BREAK == 0
}

fn shifted_keypad(code: u8) -> u8 {
    match code {
        0x06 | 0x0D | 0x02 | 0x08 => 0x80 | code,
        _ => KEYPAD | code,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum M0110State {
    #[default]
    Init,
    /// After 0x79
    Keypad,
    /// After a shift transition, which may announce a keypad operator
    Shift,
    /// After 0x71 0x79 / 0xF1 0x79
    ShiftKeypad,
}

#[derive(Debug, Default)]
pub struct M0110Decoder {
    state: M0110State,
}

impl M0110Decoder {
    pub const fn new() -> Self {
        Self {
            state: M0110State::Init,
        }
    }

    pub fn state(&self) -> M0110State {
        self.state
    }

    fn init(&mut self, byte: u8) -> Option<KeyEvent> {
        match byte {
            KEYPAD_PREFIX => {
                self.state = M0110State::Keypad;
                None
            }
            _ if byte & !BREAK == SHIFT_PREFIX => {
                self.state = M0110State::Shift;
                Some(KeyEvent {
                    code: key_code(byte),
                    make: is_make(byte),
                })
            }
            _ => Some(KeyEvent {
                code: key_code(byte),
                make: is_make(byte),
            }),
        }
    }
}

impl SequenceDecoder for M0110Decoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        if byte & 0x01 == 0 {
            self.state = M0110State::Init;
            return Err(SequenceError::UnexpectedByte(byte));
        }

        let state = self.state;
        self.state = M0110State::Init;

        let out = match state {
            M0110State::Init => self.init(byte),
            M0110State::Keypad => Some(KeyEvent {
                code: KEYPAD | key_code(byte),
                make: is_make(byte),
            }),
            M0110State::Shift if byte == KEYPAD_PREFIX => {
                self.state = M0110State::ShiftKeypad;
                None
            }
            // A plain shift transition
            M0110State::Shift => self.init(byte),
            M0110State::ShiftKeypad => Some(KeyEvent {
                code: shifted_keypad(key_code(byte)),
                make: is_make(byte),
            }),
        };
        Ok(out)
    }

    fn reset(&mut self) {
        self.state = M0110State::Init;
    }
}
