//! Commodore Amiga keyboard session
//!
//! The Amiga keyboard needs no command phase. The session intercepts the
//! protocol management codes and the CAPS LOCK key, which the keyboard
//! latches itself: it is only reported on press, with bit 7 carrying the
//! keyboard's new LED state instead of press/release. The session turns it
//! into a synthetic press/release pair whenever the keyboard and host
//! disagree about the caps lock state.
//!
//! The handshake pulse after every byte is generated by the receiver
//! hardware and never waits for the session.

use keyconv_protocol::commands::amiga;
use keyconv_protocol::LockLeds;

use super::{Action, ProtocolSession};
use crate::error::{Diagnostic, DiagnosticLog};

const BREAK: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmigaState {
    Uninitialised,
    /// Between the power-up stream markers: keys held at power-on
    PowerUpStream,
    Initialised,
}

#[derive(Debug)]
pub struct AmigaKeyboard {
    state: AmigaState,
    host_caps: bool,
    epoch: u16,
}

impl AmigaKeyboard {
    pub fn new() -> Self {
        Self {
            state: AmigaState::Uninitialised,
            host_caps: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> AmigaState {
        self.state
    }

    fn enter_initialised(&mut self) {
        if self.state != AmigaState::Initialised {
            self.state = AmigaState::Initialised;
            self.epoch = self.epoch.wrapping_add(1);
        }
    }

    fn caps_lock(&mut self, byte: u8) -> Action {
        // Bit 7 clear: the keyboard just turned its caps LED on
        let keyboard_caps = byte & BREAK == 0;
        if keyboard_caps == self.host_caps {
            return Action::None;
        }
        Action::EnqueueBytes(amiga::CAPS_LOCK, amiga::CAPS_LOCK | BREAK)
    }

    fn key(&mut self, byte: u8) -> Action {
        if byte & !BREAK == amiga::CAPS_LOCK {
            self.caps_lock(byte)
        } else {
            Action::EnqueueForDecoding
        }
    }
}

impl Default for AmigaKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolSession for AmigaKeyboard {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        use AmigaState::*;

        match (self.state, byte) {
            (_, amiga::POWER_UP_STREAM_START) => {
                self.state = PowerUpStream;
                Action::None
            }
            (_, amiga::POWER_UP_STREAM_END) => {
                self.enter_initialised();
                Action::None
            }
            (PowerUpStream, key) => {
                diag.push(Diagnostic::PowerUpKeyDropped(key));
                Action::None
            }
            (_, amiga::RESET_WARNING) => {
                // The keyboard is about to reset the machine and itself
                diag.push(Diagnostic::AmigaManagement(byte));
                self.state = Uninitialised;
                Action::None
            }
            (_, amiga::LOST_SYNC | amiga::BUFFER_OVERFLOW) => {
                diag.push(Diagnostic::AmigaManagement(byte));
                Action::None
            }
            (_, amiga::SELF_TEST_FAILED) => {
                diag.push(Diagnostic::SelfTestFailed);
                Action::None
            }
            // A keyboard that was already running
            (Uninitialised, key) => {
                self.enter_initialised();
                self.key(key)
            }
            (Initialised, key) => self.key(key),
        }
    }

    fn on_tick(&mut self, _now_ms: u32, _clock_idle: bool, _diag: &mut DiagnosticLog) -> Action {
        Action::None
    }

    fn reset(&mut self) {
        self.state = AmigaState::Uninitialised;
    }

    fn is_initialised(&self) -> bool {
        self.state == AmigaState::Initialised
    }

    fn epoch(&self) -> u16 {
        self.epoch
    }

    fn set_lock_leds(&mut self, leds: LockLeds) {
        self.host_caps = leds.caps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_up_stream_is_dropped() {
        let mut kb = AmigaKeyboard::new();
        let mut diag = DiagnosticLog::new();
        assert_eq!(kb.on_byte(0xFD, &mut diag), Action::None);
        assert_eq!(kb.on_byte(0x20, &mut diag), Action::None);
        assert_eq!(kb.on_byte(0xFE, &mut diag), Action::None);
        assert!(kb.is_initialised());
        assert_eq!(diag.pop(), Some(Diagnostic::PowerUpKeyDropped(0x20)));
        assert_eq!(kb.on_byte(0x20, &mut diag), Action::EnqueueForDecoding);
    }

    #[test]
    fn test_management_codes_never_reach_decoder() {
        let mut kb = AmigaKeyboard::new();
        let mut diag = DiagnosticLog::new();
        kb.on_byte(0xFE, &mut diag);
        for code in [0xF9, 0xFA, 0xFC] {
            assert_eq!(kb.on_byte(code, &mut diag), Action::None);
        }
        assert!(kb.is_initialised());
        assert_eq!(kb.on_byte(0x78, &mut diag), Action::None);
        assert!(!kb.is_initialised());
    }

    #[test]
    fn test_running_keyboard_initialises_on_first_key() {
        let mut kb = AmigaKeyboard::new();
        let mut diag = DiagnosticLog::new();
        assert_eq!(kb.on_byte(0x45, &mut diag), Action::EnqueueForDecoding);
        assert!(kb.is_initialised());
        assert_eq!(kb.epoch(), 1);
    }

    #[test]
    fn test_caps_lock_taps_only_when_out_of_sync() {
        let mut kb = AmigaKeyboard::new();
        let mut diag = DiagnosticLog::new();
        kb.on_byte(0xFE, &mut diag);

        // Keyboard LED on, host off: tap
        assert_eq!(
            kb.on_byte(0x62, &mut diag),
            Action::EnqueueBytes(0x62, 0xE2)
        );
        kb.set_lock_leds(LockLeds::from_hid_report(0x02));
        // Keyboard LED off, host on: tap
        assert_eq!(
            kb.on_byte(0xE2, &mut diag),
            Action::EnqueueBytes(0x62, 0xE2)
        );
        kb.set_lock_leds(LockLeds::default());
        // Already in sync
        assert_eq!(kb.on_byte(0xE2, &mut diag), Action::None);
    }
}
