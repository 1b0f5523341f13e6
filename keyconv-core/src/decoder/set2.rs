//! Scan code set 2
//!
//! A break is announced by a leading 0xF0. Extended keys are prefixed with
//! 0xE0 and folded into unused set 2 codes. Pause is the fixed sequence
//! `E1 14 77 E1 F0 14 F0 77` with no separate break; it is reported as a
//! make on `E1 14 77` and a break on `E1 F0 14 F0 77`.

use keyconv_protocol::KeyEvent;

use super::SequenceDecoder;
use crate::error::SequenceError;

/// Interface code for Pause/Break
pub const PAUSE: u8 = 0x80;

/// F7 is the only base key above 0x7F
const F7_RAW: u8 = 0x83;
const F7: u8 = 0x02;
/// Alt+SysRq as sent by some keyboards
const ALT_SYSRQ_RAW: u8 = 0x84;
const PRINT_SCREEN: u8 = 0x7F;

const BREAK_PREFIX: u8 = 0xF0;

/// Extended (E0) code to interface code; zero means unknown
pub static E0_TABLE: [u8; 128] = build_e0_table();

const fn build_e0_table() -> [u8; 128] {
    const MAP: [(u8, u8); 22] = [
        (0x11, 0x0F), // Right Alt
        (0x14, 0x17), // Right Ctrl
        (0x1F, 0x19), // Left GUI
        (0x27, 0x1F), // Right GUI
        (0x2F, 0x5C), // Application
        (0x4A, 0x60), // Keypad /
        (0x5A, 0x62), // Keypad Enter
        (0x69, 0x27), // End
        (0x6B, 0x53), // Left
        (0x6C, 0x2F), // Home
        (0x70, 0x39), // Insert
        (0x71, 0x37), // Delete
        (0x72, 0x3F), // Down
        (0x74, 0x47), // Right
        (0x75, 0x4F), // Up
        (0x7A, 0x56), // Page Down
        (0x7D, 0x5E), // Page Up
        (0x7C, PRINT_SCREEN), // Print Screen
        (0x7E, PAUSE), // Ctrl+Break
        (0x21, 0x65), // Volume Down
        (0x32, 0x6E), // Volume Up
        (0x23, 0x6F), // Mute
    ];
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < MAP.len() {
        let (raw, code) = MAP[i];
        table[raw as usize] = code;
        i += 1;
    }
    table
}

/// Fake shifts wrapped around navigation keys
fn is_fake_shift(byte: u8) -> bool {
    matches!(byte, 0x12 | 0x59)
}

/// Base (unprefixed) code to interface code
fn base_code(byte: u8) -> Option<u8> {
    match byte {
        F7_RAW => Some(F7),
        ALT_SYSRQ_RAW => Some(PRINT_SCREEN),
        0x01..=0x7F => Some(byte),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(non_camel_case_types)]
pub enum Set2State {
    #[default]
    Init,
    F0,
    E0,
    E0_F0,
    E1,
    E1_14,
    E1_F0,
    E1_F0_14,
    E1_F0_14_F0,
}

#[derive(Debug, Default)]
pub struct Set2Decoder {
    state: Set2State,
}

impl Set2Decoder {
    pub const fn new() -> Self {
        Self {
            state: Set2State::Init,
        }
    }

    pub fn state(&self) -> Set2State {
        self.state
    }

    fn extended(byte: u8, make: bool) -> Result<Option<KeyEvent>, SequenceError> {
        if is_fake_shift(byte) {
            return Ok(None);
        }
        if byte >= 0x80 {
            return Err(SequenceError::UnexpectedByte(byte));
        }
        match E0_TABLE[byte as usize] {
            0 => {
                debug!("set2: unmapped E0 {=u8:x}", byte);
                Ok(None)
            }
            code => Ok(Some(KeyEvent { code, make })),
        }
    }
}

impl SequenceDecoder for Set2Decoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        use Set2State::*;

        let state = self.state;
        self.state = Init;

        let out = match (state, byte) {
            (Init, 0xE0) => {
                self.state = E0;
                None
            }
            (Init, 0xE1) => {
                self.state = E1;
                None
            }
            (Init, BREAK_PREFIX) => {
                self.state = F0;
                None
            }
            (Init, _) => base_code(byte).map(KeyEvent::make),
            (F0, _) => Some(KeyEvent::brk(
                base_code(byte).ok_or(SequenceError::UnexpectedByte(byte))?,
            )),

            (E0, BREAK_PREFIX) => {
                self.state = E0_F0;
                None
            }
            (E0, _) => Self::extended(byte, true)?,
            (E0_F0, _) => Self::extended(byte, false)?,

            (E1, 0x14) => {
                self.state = E1_14;
                None
            }
            (E1, BREAK_PREFIX) => {
                self.state = E1_F0;
                None
            }
            (E1_14, 0x77) => Some(KeyEvent::make(PAUSE)),
            (E1_F0, 0x14) => {
                self.state = E1_F0_14;
                None
            }
            (E1_F0_14, BREAK_PREFIX) => {
                self.state = E1_F0_14_F0;
                None
            }
            (E1_F0_14_F0, 0x77) => Some(KeyEvent::brk(PAUSE)),
            (E1 | E1_14 | E1_F0 | E1_F0_14 | E1_F0_14_F0, _) => {
                return Err(SequenceError::UnexpectedByte(byte));
            }
        };
        Ok(out)
    }

    fn reset(&mut self) {
        self.state = Set2State::Init;
    }
}
