//! IBM PC/XT keyboard session
//!
//! XT keyboards cannot be sent commands. The session only waits for the
//! power-on self test result; a silent keyboard is recovered by restarting
//! the receiver, which on the XT interface includes the soft-reset pulse on
//! CLOCK that makes the keyboard run its self test again.

use keyconv_protocol::commands::xt;

use super::stall::StallTimer;
use super::{Action, ProtocolSession};
use crate::config::TimingConfig;
use crate::error::{Diagnostic, DiagnosticLog, HandshakeTimeout};

/// Overrun code sent when the keyboard's buffer is full
const OVERRUN: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XtState {
    Uninitialised,
    Initialised,
}

#[derive(Debug)]
pub struct XtKeyboard {
    state: XtState,
    timing: TimingConfig,
    activity: u32,
    timer: StallTimer,
    epoch: u16,
}

impl XtKeyboard {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            state: XtState::Uninitialised,
            timing,
            activity: 0,
            timer: StallTimer::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> XtState {
        self.state
    }
}

impl ProtocolSession for XtKeyboard {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        self.activity = self.activity.wrapping_add(1);

        match (self.state, byte) {
            (XtState::Uninitialised, xt::SELF_TEST_PASSED) => {
                self.state = XtState::Initialised;
                self.epoch = self.epoch.wrapping_add(1);
                Action::None
            }
            (XtState::Uninitialised, _) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                Action::None
            }
            (XtState::Initialised, OVERRUN) => {
                diag.push(Diagnostic::DeviceOverrun(byte));
                Action::None
            }
            (XtState::Initialised, _) => Action::EnqueueForDecoding,
        }
    }

    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action {
        let stalls = self
            .timer
            .tick(self.activity, now_ms, clock_idle, self.timing.stall_period_ms);

        if self.state == XtState::Uninitialised && stalls >= self.timing.ack_stall_limit {
            self.timer.restart(now_ms);
            diag.push(Diagnostic::Timeout(HandshakeTimeout {
                stalls,
                gave_up: false,
            }));
            return Action::RestartReceiver;
        }
        Action::None
    }

    fn reset(&mut self) {
        self.state = XtState::Uninitialised;
        self.timer.clear();
    }

    fn is_initialised(&self) -> bool {
        self.state == XtState::Initialised
    }

    fn epoch(&self) -> u16 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_test_initialises() {
        let mut kb = XtKeyboard::new(TimingConfig::default());
        let mut diag = DiagnosticLog::new();
        assert_eq!(kb.on_byte(0x1C, &mut diag), Action::None);
        assert!(!kb.is_initialised());
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::None);
        assert!(kb.is_initialised());
        assert_eq!(kb.epoch(), 1);
        // Left shift release in set 1 once running
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::EnqueueForDecoding);
        assert_eq!(kb.on_byte(0xFF, &mut diag), Action::None);
        assert_eq!(diag.pop(), Some(Diagnostic::UnexpectedResponse(0x1C)));
        assert_eq!(diag.pop(), Some(Diagnostic::DeviceOverrun(0xFF)));
    }

    #[test]
    fn test_silent_keyboard_restarts_receiver() {
        let mut kb = XtKeyboard::new(TimingConfig::default());
        let mut diag = DiagnosticLog::new();
        let restarts = (0..=2000)
            .step_by(200)
            .filter(|&t| kb.on_tick(t, true, &mut diag) == Action::RestartReceiver)
            .count();
        assert_eq!(restarts, 2);
    }

    #[test]
    fn test_initialised_never_times_out() {
        let mut kb = XtKeyboard::new(TimingConfig::default());
        let mut diag = DiagnosticLog::new();
        kb.on_byte(0xAA, &mut diag);
        for t in (0..5000).step_by(200) {
            assert_eq!(kb.on_tick(t, true, &mut diag), Action::None);
        }
        kb.reset();
        assert!(!kb.is_initialised());
    }
}
