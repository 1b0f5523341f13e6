//! PS/2 mouse session
//!
//! After the self test the mouse sends its id (0x00). If wheel detection is
//! enabled the session performs the IntelliMouse knock: sample rates 200,
//! 100 and 80 followed by get-id. A wheel mouse then answers 0x03 and
//! switches to 4-byte packets. Finally data reporting is enabled.

use keyconv_protocol::commands::ps2;

use super::stall::StallTimer;
use super::{Action, CommandTracker, ProtocolSession};
use crate::config::TimingConfig;
use crate::error::{Diagnostic, DiagnosticLog, HandshakeTimeout};

/// Mouse session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseState {
    Uninitialised,
    AwaitAck,
    AwaitSelfTest,
    /// Self test passed, waiting for the id byte that follows it
    AwaitMouseId,
    /// Knock step `index`; `value_sent` once the rate byte went out
    SampleRate { index: u8, value_sent: bool },
    ReadWheelId,
    AwaitEnableAck,
    Initialised,
}

#[derive(Debug)]
pub struct AtPs2Mouse {
    state: MouseState,
    timing: TimingConfig,
    detect_wheel: bool,
    has_wheel: bool,
    retries: u8,
    commands: CommandTracker,
    activity: u32,
    timer: StallTimer,
    epoch: u16,
}

impl AtPs2Mouse {
    pub fn new(timing: TimingConfig, detect_wheel: bool) -> Self {
        Self {
            state: MouseState::Uninitialised,
            timing,
            detect_wheel,
            has_wheel: false,
            retries: 0,
            commands: CommandTracker::new(),
            activity: 0,
            timer: StallTimer::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> MouseState {
        self.state
    }

    /// True if the mouse sends 4-byte packets
    pub fn has_wheel(&self) -> bool {
        self.has_wheel
    }

    fn reset_device(&mut self) -> Action {
        self.state = MouseState::AwaitAck;
        self.retries = 0;
        self.has_wheel = false;
        self.commands.reset_device()
    }

    fn enter(&mut self, state: MouseState, command: u8) -> Action {
        self.state = state;
        self.retries = 0;
        self.commands.send(command)
    }

    fn after_mouse_id(&mut self) -> Action {
        if self.detect_wheel {
            self.enter(
                MouseState::SampleRate {
                    index: 0,
                    value_sent: false,
                },
                ps2::SET_SAMPLE_RATE,
            )
        } else {
            self.enter(MouseState::AwaitEnableAck, ps2::ENABLE_REPORTING)
        }
    }

    fn enter_initialised(&mut self) {
        self.state = MouseState::Initialised;
        self.retries = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn timeout(&mut self, stalls: u8, gave_up: bool, now_ms: u32, diag: &mut DiagnosticLog) {
        self.timer.restart(now_ms);
        diag.push(Diagnostic::Timeout(HandshakeTimeout { stalls, gave_up }));
    }
}

impl ProtocolSession for AtPs2Mouse {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        use MouseState::*;

        self.activity = self.activity.wrapping_add(1);

        match (self.state, byte) {
            // Movement data may take any value
            (Initialised, _) => Action::EnqueueForDecoding,

            (Uninitialised, ps2::RESEND_REQUEST) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                self.reset_device()
            }
            (_, ps2::RESEND_REQUEST) => {
                diag.push(Diagnostic::ResendRequested(self.commands.last().unwrap_or(0)));
                match self.commands.resend() {
                    Some(action) => action,
                    None => self.reset_device(),
                }
            }

            (Uninitialised | AwaitAck | AwaitSelfTest, ps2::SELF_TEST_PASSED) => {
                self.state = AwaitMouseId;
                Action::None
            }
            (AwaitAck, ps2::ACK) => {
                self.state = AwaitSelfTest;
                Action::None
            }
            (AwaitSelfTest, ps2::SELF_TEST_FAILED) => {
                diag.push(Diagnostic::SelfTestFailed);
                self.reset_device()
            }
            (AwaitMouseId, id) => {
                diag.push(Diagnostic::DeviceIdentified(id as u16));
                self.after_mouse_id()
            }

            (SampleRate { index, value_sent: false }, ps2::ACK) => {
                let rate = ps2::WHEEL_KNOCK[index as usize];
                self.state = SampleRate {
                    index,
                    value_sent: true,
                };
                self.commands.send(rate)
            }
            (SampleRate { index, value_sent: true }, ps2::ACK) => {
                let next = index + 1;
                if (next as usize) < ps2::WHEEL_KNOCK.len() {
                    self.enter(
                        SampleRate {
                            index: next,
                            value_sent: false,
                        },
                        ps2::SET_SAMPLE_RATE,
                    )
                } else {
                    self.enter(ReadWheelId, ps2::GET_ID)
                }
            }

            (ReadWheelId, ps2::ACK) => Action::None,
            (ReadWheelId, id) => {
                diag.push(Diagnostic::DeviceIdentified(id as u16));
                self.has_wheel = id == ps2::MOUSE_ID_WHEEL;
                self.enter(AwaitEnableAck, ps2::ENABLE_REPORTING)
            }

            (AwaitEnableAck, ps2::ACK) => {
                self.enter_initialised();
                Action::None
            }

            (_, _) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                self.reset_device()
            }
        }
    }

    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action {
        use MouseState::*;

        let stalls = self
            .timer
            .tick(self.activity, now_ms, clock_idle, self.timing.stall_period_ms);

        match self.state {
            Initialised => Action::None,
            Uninitialised | AwaitAck | AwaitSelfTest => {
                if stalls < self.timing.ack_stall_limit {
                    return Action::None;
                }
                self.timeout(stalls, false, now_ms, diag);
                self.reset_device()
            }
            AwaitMouseId => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                // Some mice omit the id after the self test
                self.timeout(stalls, false, now_ms, diag);
                self.after_mouse_id()
            }
            SampleRate { .. } | ReadWheelId => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                let gave_up = self.retries > 0;
                self.timeout(stalls, gave_up, now_ms, diag);
                if gave_up {
                    self.has_wheel = false;
                    return self.enter(AwaitEnableAck, ps2::ENABLE_REPORTING);
                }
                self.retries = 1;
                self.commands.resend().unwrap_or(Action::None)
            }
            AwaitEnableAck => {
                if stalls < self.timing.id_stall_limit {
                    return Action::None;
                }
                let gave_up = self.retries > 0;
                self.timeout(stalls, gave_up, now_ms, diag);
                if gave_up {
                    self.enter_initialised();
                    return Action::None;
                }
                self.retries = 1;
                self.commands.send(ps2::ENABLE_REPORTING)
            }
        }
    }

    fn reset(&mut self) {
        self.state = MouseState::Uninitialised;
        self.retries = 0;
        self.has_wheel = false;
        self.commands.clear();
        self.timer.clear();
    }

    fn is_initialised(&self) -> bool {
        self.state == MouseState::Initialised
    }

    fn epoch(&self) -> u16 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mouse: &mut AtPs2Mouse, bytes: &[u8], diag: &mut DiagnosticLog) -> Vec<u8> {
        bytes
            .iter()
            .filter_map(|&b| match mouse.on_byte(b, diag) {
                Action::SendCommand(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_wheel_knock_sequence() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), true);
        let mut diag = DiagnosticLog::new();
        let sent = run(
            &mut mouse,
            &[0xAA, 0x00, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0x03, 0xFA],
            &mut diag,
        );
        assert_eq!(sent, [0xF3, 200, 0xF3, 100, 0xF3, 80, 0xF2, 0xF4]);
        assert!(mouse.is_initialised());
        assert!(mouse.has_wheel());
        assert_eq!(mouse.epoch(), 1);
    }

    #[test]
    fn test_plain_mouse_after_knock() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), true);
        let mut diag = DiagnosticLog::new();
        run(
            &mut mouse,
            &[0xAA, 0x00, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0x00, 0xFA],
            &mut diag,
        );
        assert!(mouse.is_initialised());
        assert!(!mouse.has_wheel());
    }

    #[test]
    fn test_wheel_detection_disabled() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), false);
        let mut diag = DiagnosticLog::new();
        let sent = run(&mut mouse, &[0xAA, 0x00, 0xFA], &mut diag);
        assert_eq!(sent, [ps2::ENABLE_REPORTING]);
        assert!(mouse.is_initialised());
    }

    #[test]
    fn test_initialised_passes_everything() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), false);
        let mut diag = DiagnosticLog::new();
        run(&mut mouse, &[0xAA, 0x00, 0xFA], &mut diag);
        for b in [0x08, 0xFE, 0xFA, 0xAA] {
            assert_eq!(mouse.on_byte(b, &mut diag), Action::EnqueueForDecoding);
        }
    }

    #[test]
    fn test_knock_timeout_retries_then_falls_back() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), true);
        let mut diag = DiagnosticLog::new();
        run(&mut mouse, &[0xAA, 0x00], &mut diag);
        assert_eq!(mouse.on_tick(0, true, &mut diag), Action::None);
        assert_eq!(mouse.on_tick(200, true, &mut diag), Action::None);
        assert_eq!(
            mouse.on_tick(400, true, &mut diag),
            Action::SendCommand(ps2::SET_SAMPLE_RATE)
        );
        assert_eq!(mouse.on_tick(600, true, &mut diag), Action::None);
        assert_eq!(
            mouse.on_tick(800, true, &mut diag),
            Action::SendCommand(ps2::ENABLE_REPORTING)
        );
        assert_eq!(mouse.on_byte(ps2::ACK, &mut diag), Action::None);
        assert!(mouse.is_initialised());
        assert!(!mouse.has_wheel());
    }

    #[test]
    fn test_unpowered_mouse_gets_reset() {
        let mut mouse = AtPs2Mouse::new(TimingConfig::default(), true);
        let mut diag = DiagnosticLog::new();
        let mut action = Action::None;
        for t in (0..=1000).step_by(200) {
            action = mouse.on_tick(t, true, &mut diag);
        }
        assert_eq!(action, Action::SendCommand(ps2::RESET));
        assert_eq!(mouse.state(), MouseState::AwaitAck);
        let sent = run(&mut mouse, &[0xFA, 0xAA], &mut diag);
        assert!(sent.is_empty());
        assert_eq!(mouse.state(), MouseState::AwaitMouseId);
    }
}
