//! IBM AT/PS2 keyboard session
//!
//! ```text
//! Uninitialised ─AA─► ReadId1 ─► ReadId2 ─┬─────────────► Initialised ◄─┐
//!      │                 ▲                └─► Setup (F8) ──┘     │       │
//!   timeout/           AA│                                       ▼       │
//!   unexpected       AwaitSelfTest ◄─FA── AwaitAck        SetLockLeds ───┘
//! ```
//!
//! Any byte outside the happy path resets the keyboard and waits for its
//! ack. Identification and mode setup are retried once after a timeout,
//! then the session falls back to the configured default code set.

use keyconv_protocol::commands::ps2;
use keyconv_protocol::LockLeds;

use super::stall::StallTimer;
use super::{Action, CommandTracker, ProtocolSession};
use crate::config::{CodeSet, TimingConfig};
use crate::error::{Diagnostic, DiagnosticLog, HandshakeTimeout};

/// Device id recorded when identification never completed
pub const UNKNOWN_ID: u16 = 0xFFFF;

/// Progress of a lock LED update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedStage {
    /// 0xED sent, waiting for its ack
    AwaitCommandAck,
    /// LED bitmap sent, waiting for its ack
    AwaitValueAck,
}

/// Keyboard session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyboardState {
    /// Waiting for the power-on self test result
    Uninitialised,
    /// Reset sent, waiting for its ack
    AwaitAck,
    /// Reset acknowledged, waiting for the self test result
    AwaitSelfTest,
    /// Get-id sent, waiting for the first id byte
    ReadId1,
    /// Waiting for the second id byte
    ReadId2,
    /// Terminal keyboard: all-keys make/break sent
    Setup,
    /// Updating the lock LEDs
    SetLockLeds(LedStage),
    /// Normal operation
    Initialised,
}

/// True for keyboards that speak code set 3
///
/// IBM terminal keyboards identify as 0xBFxx; 0xAB85 and 0xAB86 are the
/// 122-key terminal boards that also answer like AT keyboards.
pub fn is_terminal_keyboard(id: u16) -> bool {
    (id & 0xFF00) == 0xBF00 || id == 0xAB85 || id == 0xAB86
}

#[derive(Debug)]
pub struct AtPs2Keyboard {
    state: KeyboardState,
    timing: TimingConfig,
    default_set: CodeSet,
    code_set: CodeSet,
    device_id: u16,
    retries: u8,
    commands: CommandTracker,
    host_leds: LockLeds,
    device_leds: Option<LockLeds>,
    pending_leds: LockLeds,
    activity: u32,
    timer: StallTimer,
    epoch: u16,
}

impl AtPs2Keyboard {
    pub fn new(timing: TimingConfig, default_set: CodeSet) -> Self {
        Self {
            state: KeyboardState::Uninitialised,
            timing,
            default_set,
            code_set: default_set,
            device_id: 0,
            retries: 0,
            commands: CommandTracker::new(),
            host_leds: LockLeds::default(),
            device_leds: None,
            pending_leds: LockLeds::default(),
            activity: 0,
            timer: StallTimer::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> KeyboardState {
        self.state
    }

    /// Keyboard id, [`UNKNOWN_ID`] if identification timed out
    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    pub fn code_set(&self) -> CodeSet {
        self.code_set
    }

    fn reset_device(&mut self) -> Action {
        self.state = KeyboardState::AwaitAck;
        self.retries = 0;
        self.commands.reset_device()
    }

    fn request_id(&mut self) -> Action {
        self.state = KeyboardState::ReadId1;
        self.device_id = 0;
        self.retries = 0;
        self.commands.send(ps2::GET_ID)
    }

    fn identified(&mut self, diag: &mut DiagnosticLog) -> Action {
        diag.push(Diagnostic::DeviceIdentified(self.device_id));
        if is_terminal_keyboard(self.device_id) {
            self.code_set = CodeSet::Set3;
            self.state = KeyboardState::Setup;
            self.retries = 0;
            self.commands.send(ps2::SET_ALL_MAKE_BREAK)
        } else {
            self.code_set = self.default_set;
            self.enter_initialised();
            Action::None
        }
    }

    fn enter_initialised(&mut self) {
        self.state = KeyboardState::Initialised;
        self.retries = 0;
        // A freshly reset keyboard has all LEDs off, whatever we sent before
        self.device_leds = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn resend(&mut self, diag: &mut DiagnosticLog) -> Action {
        diag.push(Diagnostic::ResendRequested(self.commands.last().unwrap_or(0)));
        match self.commands.resend() {
            Some(action) => action,
            None => self.reset_device(),
        }
    }

    fn on_id_timeout(&mut self, stalls: u8, now_ms: u32, diag: &mut DiagnosticLog) -> Action {
        self.timer.restart(now_ms);
        if self.retries == 0 {
            diag.push(Diagnostic::Timeout(HandshakeTimeout {
                stalls,
                gave_up: false,
            }));
            let action = self.request_id();
            self.retries = 1;
            action
        } else {
            diag.push(Diagnostic::Timeout(HandshakeTimeout {
                stalls,
                gave_up: true,
            }));
            self.device_id = UNKNOWN_ID;
            diag.push(Diagnostic::DeviceIdentified(UNKNOWN_ID));
            self.code_set = self.default_set;
            self.enter_initialised();
            Action::None
        }
    }
}

impl ProtocolSession for AtPs2Keyboard {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        use KeyboardState::*;

        self.activity = self.activity.wrapping_add(1);

        match (self.state, byte) {
            (Uninitialised, ps2::RESEND_REQUEST) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                self.reset_device()
            }
            (_, ps2::RESEND_REQUEST) => self.resend(diag),

            // Power-on or reset self test passed
            (Uninitialised | AwaitAck | AwaitSelfTest, ps2::SELF_TEST_PASSED) => self.request_id(),
            (AwaitAck, ps2::ACK) => {
                self.state = AwaitSelfTest;
                Action::None
            }
            (AwaitSelfTest, ps2::SELF_TEST_FAILED) => {
                diag.push(Diagnostic::SelfTestFailed);
                self.reset_device()
            }

            // Ack of get-id, then two id bytes
            (ReadId1, ps2::ACK) => Action::None,
            (ReadId1, high) => {
                self.device_id = (high as u16) << 8;
                self.state = ReadId2;
                Action::None
            }
            (ReadId2, low) => {
                self.device_id |= low as u16;
                self.identified(diag)
            }

            (Setup, ps2::ACK) => {
                self.enter_initialised();
                Action::None
            }

            (SetLockLeds(LedStage::AwaitCommandAck), ps2::ACK) => {
                self.state = SetLockLeds(LedStage::AwaitValueAck);
                self.commands.send(self.pending_leds.to_ps2_bitmap())
            }
            (SetLockLeds(LedStage::AwaitValueAck), ps2::ACK) => {
                self.device_leds = Some(self.pending_leds);
                self.state = Initialised;
                Action::None
            }
            // Re-plugged during the LED update; a set 1 shift release otherwise
            (SetLockLeds(_), ps2::SELF_TEST_PASSED) if self.code_set != CodeSet::Set1 => {
                self.device_leds = None;
                self.request_id()
            }
            // Keys pressed while the LED update is in flight
            (SetLockLeds(_), _) => Action::EnqueueForDecoding,

            (Initialised, ps2::ACK | ps2::ECHO_RESPONSE) => Action::None,
            (Initialised, ps2::KEY_ERROR | ps2::BUFFER_OVERRUN) => {
                diag.push(Diagnostic::DeviceOverrun(byte));
                Action::None
            }
            // 0xAA is a shift release in set 1, a re-plugged keyboard otherwise
            (Initialised, ps2::SELF_TEST_PASSED) if self.code_set != CodeSet::Set1 => {
                self.device_leds = None;
                self.request_id()
            }
            (Initialised, _) => Action::EnqueueForDecoding,

            (_, _) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                self.reset_device()
            }
        }
    }

    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action {
        use KeyboardState::*;

        let stalls = self
            .timer
            .tick(self.activity, now_ms, clock_idle, self.timing.stall_period_ms);

        match self.state {
            Uninitialised | AwaitAck | AwaitSelfTest => {
                if stalls < self.timing.ack_stall_limit {
                    return Action::None;
                }
                diag.push(Diagnostic::Timeout(HandshakeTimeout {
                    stalls,
                    gave_up: false,
                }));
                self.timer.restart(now_ms);
                self.reset_device()
            }
            ReadId1 | ReadId2 => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                self.on_id_timeout(stalls, now_ms, diag)
            }
            Setup => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                self.timer.restart(now_ms);
                let gave_up = self.retries > 0;
                diag.push(Diagnostic::Timeout(HandshakeTimeout { stalls, gave_up }));
                if gave_up {
                    self.enter_initialised();
                    Action::None
                } else {
                    self.retries = 1;
                    self.commands.send(ps2::SET_ALL_MAKE_BREAK)
                }
            }
            SetLockLeds(_) => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                self.timer.restart(now_ms);
                diag.push(Diagnostic::Timeout(HandshakeTimeout {
                    stalls,
                    gave_up: true,
                }));
                // Do not retry until the host changes the LEDs again
                self.device_leds = Some(self.pending_leds);
                self.state = Initialised;
                Action::None
            }
            Initialised => {
                if self.device_leds == Some(self.host_leds) {
                    return Action::None;
                }
                self.pending_leds = self.host_leds;
                self.state = SetLockLeds(LedStage::AwaitCommandAck);
                self.timer.restart(now_ms);
                self.commands.send(ps2::SET_LOCK_LEDS)
            }
        }
    }

    fn reset(&mut self) {
        self.state = KeyboardState::Uninitialised;
        self.device_id = 0;
        self.retries = 0;
        self.code_set = self.default_set;
        self.commands.clear();
        self.device_leds = None;
        self.timer.clear();
    }

    fn is_initialised(&self) -> bool {
        matches!(
            self.state,
            KeyboardState::Initialised | KeyboardState::SetLockLeds(_)
        )
    }

    fn epoch(&self) -> u16 {
        self.epoch
    }

    fn set_lock_leds(&mut self, leds: LockLeds) {
        self.host_leds = leds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard() -> AtPs2Keyboard {
        AtPs2Keyboard::new(TimingConfig::default(), CodeSet::Set2)
    }

    fn feed(kb: &mut AtPs2Keyboard, bytes: &[u8], diag: &mut DiagnosticLog) -> Vec<Action> {
        bytes.iter().map(|&b| kb.on_byte(b, diag)).collect()
    }

    #[test]
    fn test_power_on_to_initialised() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        let actions = feed(&mut kb, &[0xAA, 0xFA, 0xAB, 0x83], &mut diag);
        assert_eq!(
            actions,
            [
                Action::SendCommand(ps2::GET_ID),
                Action::None,
                Action::None,
                Action::None
            ]
        );
        assert_eq!(kb.state(), KeyboardState::Initialised);
        assert_eq!(kb.device_id(), 0xAB83);
        assert_eq!(kb.code_set(), CodeSet::Set2);
        assert!(kb.is_initialised());
        assert_eq!(kb.epoch(), 1);
        assert_eq!(diag.pop(), Some(Diagnostic::DeviceIdentified(0xAB83)));
    }

    #[test]
    fn test_terminal_keyboard_gets_set3_setup() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        let actions = feed(&mut kb, &[0xAA, 0xFA, 0xBF, 0xBF], &mut diag);
        assert_eq!(actions[3], Action::SendCommand(ps2::SET_ALL_MAKE_BREAK));
        assert_eq!(kb.state(), KeyboardState::Setup);
        assert!(!kb.is_initialised());

        assert_eq!(kb.on_byte(ps2::ACK, &mut diag), Action::None);
        assert_eq!(kb.state(), KeyboardState::Initialised);
        assert_eq!(kb.code_set(), CodeSet::Set3);
    }

    #[test]
    fn test_terminal_id_classification() {
        assert!(is_terminal_keyboard(0xBF00));
        assert!(is_terminal_keyboard(0xBFBF));
        assert!(is_terminal_keyboard(0xAB85));
        assert!(is_terminal_keyboard(0xAB86));
        assert!(!is_terminal_keyboard(0xAB83));
        assert!(!is_terminal_keyboard(UNKNOWN_ID));
    }

    #[test]
    fn test_unexpected_byte_resets_keyboard() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        assert_eq!(kb.on_byte(0x1C, &mut diag), Action::SendCommand(ps2::RESET));
        assert_eq!(kb.state(), KeyboardState::AwaitAck);
        assert_eq!(diag.pop(), Some(Diagnostic::UnexpectedResponse(0x1C)));

        assert_eq!(kb.on_byte(ps2::ACK, &mut diag), Action::None);
        assert_eq!(kb.state(), KeyboardState::AwaitSelfTest);
        assert_eq!(
            kb.on_byte(ps2::SELF_TEST_PASSED, &mut diag),
            Action::SendCommand(ps2::GET_ID)
        );
        assert_eq!(kb.state(), KeyboardState::ReadId1);
    }

    #[test]
    fn test_self_test_failure_resets() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0x00, ps2::ACK], &mut diag);
        assert_eq!(
            kb.on_byte(ps2::SELF_TEST_FAILED, &mut diag),
            Action::SendCommand(ps2::RESET)
        );
        assert_eq!(diag.pop(), Some(Diagnostic::UnexpectedResponse(0x00)));
        assert_eq!(diag.pop(), Some(Diagnostic::SelfTestFailed));
    }

    #[test]
    fn test_ack_timeout_reissues_reset() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        let mut sent = Vec::new();
        for t in (0..=1000).step_by(100) {
            let action = kb.on_tick(t, true, &mut diag);
            if action != Action::None {
                sent.push((t, action));
            }
        }
        assert_eq!(sent, [(1000, Action::SendCommand(ps2::RESET))]);
        assert_eq!(kb.state(), KeyboardState::AwaitAck);
    }

    #[test]
    fn test_busy_clock_never_times_out() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        for t in (0..5000).step_by(100) {
            assert_eq!(kb.on_tick(t, false, &mut diag), Action::None);
        }
    }

    #[test]
    fn test_read_id_retries_once_then_falls_back() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::SendCommand(ps2::GET_ID));

        let mut get_id_retries = 0;
        for t in (0..=2000).step_by(50) {
            match kb.on_tick(t, true, &mut diag) {
                Action::SendCommand(ps2::GET_ID) => get_id_retries += 1,
                Action::SendCommand(ps2::SET_LOCK_LEDS) => break,
                Action::None => {}
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(get_id_retries, 1);
        assert!(kb.is_initialised());
        assert_eq!(kb.device_id(), UNKNOWN_ID);
        assert_eq!(kb.code_set(), CodeSet::Set2);

        let logged: Vec<_> = core::iter::from_fn(|| diag.pop()).collect();
        assert!(logged.contains(&Diagnostic::Timeout(HandshakeTimeout {
            stalls: 2,
            gave_up: true
        })));
        assert!(logged.contains(&Diagnostic::DeviceIdentified(UNKNOWN_ID)));
    }

    #[test]
    fn test_setup_retries_once() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xBF, 0xBF], &mut diag);
        assert_eq!(kb.on_tick(0, true, &mut diag), Action::None);
        assert_eq!(kb.on_tick(200, true, &mut diag), Action::None);
        assert_eq!(
            kb.on_tick(400, true, &mut diag),
            Action::SendCommand(ps2::SET_ALL_MAKE_BREAK)
        );
        assert_eq!(kb.on_tick(600, true, &mut diag), Action::None);
        assert_eq!(kb.on_tick(800, true, &mut diag), Action::None);
        assert!(kb.is_initialised());
        assert_eq!(kb.code_set(), CodeSet::Set3);
    }

    #[test]
    fn test_lock_led_sync() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        let leds = LockLeds {
            num: true,
            caps: true,
            scroll: false,
        };
        kb.set_lock_leds(leds);

        assert_eq!(
            kb.on_tick(0, true, &mut diag),
            Action::SendCommand(ps2::SET_LOCK_LEDS)
        );
        assert_eq!(kb.state(), KeyboardState::SetLockLeds(LedStage::AwaitCommandAck));
        // A key arriving mid-update still reaches the decoder
        assert_eq!(kb.on_byte(0x1C, &mut diag), Action::EnqueueForDecoding);
        assert_eq!(
            kb.on_byte(ps2::ACK, &mut diag),
            Action::SendCommand(leds.to_ps2_bitmap())
        );
        assert_eq!(kb.on_byte(ps2::ACK, &mut diag), Action::None);
        assert_eq!(kb.state(), KeyboardState::Initialised);

        // In sync: nothing to do
        assert_eq!(kb.on_tick(10, true, &mut diag), Action::None);
        // LED updates do not start a new epoch
        assert_eq!(kb.epoch(), 1);
    }

    #[test]
    fn test_led_update_gives_up_after_timeout() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        assert_eq!(
            kb.on_tick(0, true, &mut diag),
            Action::SendCommand(ps2::SET_LOCK_LEDS)
        );
        kb.on_tick(200, true, &mut diag);
        kb.on_tick(400, true, &mut diag);
        assert_eq!(kb.state(), KeyboardState::Initialised);
        assert_eq!(kb.on_tick(600, true, &mut diag), Action::None);
    }

    #[test]
    fn test_resend_request_repeats_last_command() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        kb.on_byte(0xAA, &mut diag);
        assert_eq!(
            kb.on_byte(ps2::RESEND_REQUEST, &mut diag),
            Action::SendCommand(ps2::GET_ID)
        );
        assert_eq!(kb.state(), KeyboardState::ReadId1);
    }

    #[test]
    fn test_initialised_absorbs_protocol_bytes() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        diag.take();

        assert_eq!(kb.on_byte(ps2::ACK, &mut diag), Action::None);
        assert_eq!(kb.on_byte(ps2::ECHO_RESPONSE, &mut diag), Action::None);
        assert_eq!(kb.on_byte(ps2::KEY_ERROR, &mut diag), Action::None);
        assert_eq!(diag.pop(), Some(Diagnostic::DeviceOverrun(ps2::KEY_ERROR)));
        assert_eq!(kb.on_byte(0xE0, &mut diag), Action::EnqueueForDecoding);
        assert_eq!(kb.on_byte(0xF0, &mut diag), Action::EnqueueForDecoding);
    }

    #[test]
    fn test_replug_restarts_identification() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::SendCommand(ps2::GET_ID));
        feed(&mut kb, &[0xFA, 0xAB, 0x83], &mut diag);
        assert_eq!(kb.epoch(), 2);
    }

    #[test]
    fn test_replug_during_led_update_restarts_identification() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        kb.on_tick(0, true, &mut diag);
        assert_eq!(kb.state(), KeyboardState::SetLockLeds(LedStage::AwaitCommandAck));

        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::SendCommand(ps2::GET_ID));
        assert_eq!(kb.state(), KeyboardState::ReadId1);
        feed(&mut kb, &[0xAB, 0x83], &mut diag);
        assert_eq!(kb.state(), KeyboardState::Initialised);
        assert_eq!(kb.epoch(), 2);
        // The new keyboard gets the LED state again
        assert_eq!(
            kb.on_tick(10, true, &mut diag),
            Action::SendCommand(ps2::SET_LOCK_LEDS)
        );
    }

    #[test]
    fn test_set1_shift_release_during_led_update_is_a_key() {
        let mut kb = AtPs2Keyboard::new(TimingConfig::default(), CodeSet::Set1);
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        kb.on_tick(0, true, &mut diag);
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::EnqueueForDecoding);
    }

    #[test]
    fn test_set1_keeps_0xaa_as_key_code() {
        let mut kb = AtPs2Keyboard::new(TimingConfig::default(), CodeSet::Set1);
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        assert_eq!(kb.on_byte(0xAA, &mut diag), Action::EnqueueForDecoding);
    }

    #[test]
    fn test_reset_returns_to_uninitialised() {
        let mut kb = keyboard();
        let mut diag = DiagnosticLog::new();
        feed(&mut kb, &[0xAA, 0xAB, 0x83], &mut diag);
        kb.reset();
        assert_eq!(kb.state(), KeyboardState::Uninitialised);
        assert!(!kb.is_initialised());
        assert_eq!(kb.epoch(), 1);
    }
}
