//! Scan code set 1
//!
//! Make codes are below 0x80, break codes set bit 7. 0xE0 prefixes one
//! extended key, which is folded into an unused set 1 code. 0xE1 starts the
//! fixed Pause sequence `E1 1D 45` / `E1 9D C5`.
//!
//! Korean keyboards send Hanja (0xF1) and Hangul (0xF2) on press only, with
//! no break code; they come out as makes of [`HANJA`] and [`HANGUL`].

use keyconv_protocol::KeyEvent;

use super::SequenceDecoder;
use crate::error::SequenceError;

/// Interface code for Pause/Break
pub const PAUSE: u8 = 0x55;

/// Interface code for the Hanja key
pub const HANJA: u8 = 0x71;

/// Interface code for the Hangul key
pub const HANGUL: u8 = 0x72;

const BREAK: u8 = 0x80;

/// Extended (E0) byte to interface code; zero means ignore
///
/// Indexed by the raw byte, so make and break share a value. Zero entries include the fake shifts (E0 2A, E0 36, E0 AA, E0 B6) some
/// keyboards wrap around navigation keys.
pub static E0_TABLE: [u8; 256] = build_e0_table();

const fn build_e0_table() -> [u8; 256] {
    const MAP: [(u8, u8); 22] = [
        (0x37, 0x54), // Print Screen
        (0x46, PAUSE), // Ctrl+Break
        (0x1C, 0x6F), // Keypad Enter
        (0x35, 0x7F), // Keypad /
        (0x5B, 0x5A), // Left GUI
        (0x5C, 0x5B), // Right GUI
        (0x5D, 0x5C), // Application
        (0x5E, 0x5D), // Power
        (0x5F, 0x5E), // Sleep
        (0x63, 0x5F), // Wake
        (0x48, 0x60), // Up
        (0x4B, 0x61), // Left
        (0x50, 0x62), // Down
        (0x4D, 0x63), // Right
        (0x52, 0x6A), // Insert
        (0x53, 0x6B), // Delete
        (0x47, 0x74), // Home
        (0x4F, 0x75), // End
        (0x49, 0x77), // Page Up
        (0x51, 0x78), // Page Down
        (0x1D, 0x7A), // Right Ctrl
        (0x38, 0x7C), // Right Alt
    ];
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < MAP.len() {
        let (raw, code) = MAP[i];
        table[raw as usize] = code;
        table[(raw | BREAK) as usize] = code;
        i += 1;
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(non_camel_case_types)]
pub enum Set1State {
    #[default]
    Init,
    E0,
    E1,
    E1_1D,
    E1_9D,
}

#[derive(Debug, Default)]
pub struct Set1Decoder {
    state: Set1State,
}

impl Set1Decoder {
    pub const fn new() -> Self {
        Self {
            state: Set1State::Init,
        }
    }

    pub fn state(&self) -> Set1State {
        self.state
    }
}

fn event(code: u8, raw: u8) -> Option<KeyEvent> {
    if code == 0 {
        return None;
    }
    Some(KeyEvent {
        code,
        make: raw & BREAK == 0,
    })
}

impl SequenceDecoder for Set1Decoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        use Set1State::*;

        let (next, out) = match (self.state, byte) {
            (Init, 0xE0) => (E0, None),
            (Init, 0xE1) => (E1, None),
            (Init, 0xF1) => (Init, Some(KeyEvent::make(HANJA))),
            (Init, 0xF2) => (Init, Some(KeyEvent::make(HANGUL))),
            (Init, _) => (Init, event(byte & !BREAK, byte)),

            (E0, _) => (Init, event(E0_TABLE[byte as usize], byte)),

            (E1, 0x1D) => (E1_1D, None),
            (E1, 0x9D) => (E1_9D, None),
            (E1_1D, 0x45) => (Init, Some(KeyEvent::make(PAUSE))),
            (E1_9D, 0xC5) => (Init, Some(KeyEvent::brk(PAUSE))),
            (E1 | E1_1D | E1_9D, _) => {
                self.state = Init;
                return Err(SequenceError::UnexpectedByte(byte));
            }
        };
        self.state = next;
        Ok(out)
    }

    fn reset(&mut self) {
        self.state = Set1State::Init;
    }
}
