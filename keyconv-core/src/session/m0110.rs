//! Apple M0110/M0110A keyboard session
//!
//! The M0110 only talks when asked. The session queries the model number,
//! then keeps an inquiry outstanding at all times: every response, a key
//! transition or the null byte, is answered with the next inquiry. A
//! keyboard that stays silent for the response timeout is queried for its
//! model again, which also resets it.

use keyconv_protocol::commands::m0110;

use super::stall::StallTimer;
use super::{Action, ProtocolSession};
use crate::config::TimingConfig;
use crate::error::{Diagnostic, DiagnosticLog, HandshakeTimeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum M0110State {
    Uninitialised,
    /// Model command sent
    AwaitModel,
    /// Inquiry loop running
    Initialised,
}

#[derive(Debug)]
pub struct M0110Keyboard {
    state: M0110State,
    timing: TimingConfig,
    model: Option<u8>,
    activity: u32,
    timer: StallTimer,
    epoch: u16,
}

impl M0110Keyboard {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            state: M0110State::Uninitialised,
            timing,
            model: None,
            activity: 0,
            timer: StallTimer::new(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> M0110State {
        self.state
    }

    /// Model byte reported by the keyboard
    pub fn model(&self) -> Option<u8> {
        self.model
    }

    fn query_model(&mut self, now_ms: u32) -> Action {
        self.state = M0110State::AwaitModel;
        self.timer.restart(now_ms);
        Action::SendCommand(m0110::MODEL)
    }
}

impl ProtocolSession for M0110Keyboard {
    fn on_byte(&mut self, byte: u8, diag: &mut DiagnosticLog) -> Action {
        self.activity = self.activity.wrapping_add(1);

        match (self.state, byte) {
            (M0110State::Uninitialised, _) => {
                diag.push(Diagnostic::UnexpectedResponse(byte));
                Action::None
            }
            (M0110State::AwaitModel, model) => {
                self.model = Some(model);
                diag.push(Diagnostic::DeviceIdentified(model as u16));
                self.state = M0110State::Initialised;
                self.epoch = self.epoch.wrapping_add(1);
                Action::SendCommand(m0110::INQUIRY)
            }
            (M0110State::Initialised, m0110::NULL) => Action::SendCommand(m0110::INQUIRY),
            (M0110State::Initialised, _) => Action::EnqueueAndSend(m0110::INQUIRY),
        }
    }

    fn on_tick(&mut self, now_ms: u32, clock_idle: bool, diag: &mut DiagnosticLog) -> Action {
        if self.state == M0110State::Uninitialised {
            return self.query_model(now_ms);
        }

        let stalls = self.timer.tick(
            self.activity,
            now_ms,
            clock_idle,
            self.timing.response_timeout_ms,
        );
        if stalls == 0 {
            return Action::None;
        }

        diag.push(Diagnostic::Timeout(HandshakeTimeout {
            stalls,
            gave_up: false,
        }));
        self.query_model(now_ms)
    }

    fn reset(&mut self) {
        self.state = M0110State::Uninitialised;
        self.model = None;
        self.timer.clear();
    }

    fn is_initialised(&self) -> bool {
        self.state == M0110State::Initialised
    }

    fn epoch(&self) -> u16 {
        self.epoch
    }
}
