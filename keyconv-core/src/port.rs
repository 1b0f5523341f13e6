//! Device port: hardware frames in, session actions out
//!
//! The port binds one device session to its hardware transmitter and clock
//! line. `on_frame` is the whole interrupt-side body of the receive path:
//! validate the frame, run the session, and carry out its action (send a
//! command, or push the byte into the ring buffer). It never logs; every
//! recoverable event is recorded as a [`Diagnostic`] for the task side.
//!
//! # Frame errors
//!
//! - Bad parity: ask the device to resend, drop the frame
//! - Bad start or stop bit: the bit position is lost; reset the session and
//!   have the caller restart the receiver
//!
//! # Stale bytes
//!
//! Whenever the receiver restarts or the session starts a new epoch, the
//! bytes still waiting in the ring buffer are discarded, so nothing from an
//! earlier device session reaches the decoder built for the new one.

use keyconv_hal::{ClockLine, CommandTransmitter, RawWord};
use keyconv_protocol::commands::ps2;
use keyconv_protocol::{decode_frame, encode_command, LockLeds, WireFormat};

use crate::config::{CodeSet, ConverterConfig, Protocol};
use crate::error::{Diagnostic, DiagnosticLog};
use crate::ringbuf::RingBuffer;
use crate::session::{Action, DeviceSession, ProtocolSession};

/// What the receive path must do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// Keep receiving
    Continue,
    /// Restart the hardware receiver
    RestartReceiver,
}

/// Port counters, readable from task context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortStats {
    /// Frames received
    pub frames: u32,
    /// Frames rejected by the codec
    pub frame_errors: u32,
    /// Resend requests sent for parity errors
    pub resends: u32,
    /// Bytes dropped because the ring buffer was full
    pub overflows: u32,
    /// Receiver restarts requested
    pub restarts: u32,
}

/// Snapshot of the session for the task side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortStatus {
    pub protocol: Protocol,
    /// Device ready for normal operation
    pub initialised: bool,
    /// Changes each time the session (re)reaches `Initialised`
    pub epoch: u16,
    /// Scan code set in use, for IBM keyboards
    pub code_set: Option<CodeSet>,
    /// Wheel reporting, for mice
    pub mouse_wheel: Option<bool>,
}

/// Result of one task-side service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortTick {
    pub status: PortStatus,
    pub outcome: FrameOutcome,
}

pub struct Port<T, C> {
    format: WireFormat,
    session: DeviceSession,
    transmitter: T,
    clock: C,
    diagnostics: DiagnosticLog,
    stats: PortStats,
}

impl<T: CommandTransmitter, C: ClockLine> Port<T, C> {
    pub fn new(config: &ConverterConfig, transmitter: T, clock: C) -> Self {
        Self {
            format: config.interface.protocol.wire_format(),
            session: DeviceSession::new(config),
            transmitter,
            clock,
            diagnostics: DiagnosticLog::new(),
            stats: PortStats::default(),
        }
    }

    /// Handle one raw frame from the hardware receiver (interrupt context)
    pub fn on_frame(&mut self, word: RawWord, ring: &RingBuffer) -> FrameOutcome {
        self.stats.frames = self.stats.frames.wrapping_add(1);

        let byte = match decode_frame(self.format, word) {
            Ok(byte) => byte,
            Err(e) => {
                self.stats.frame_errors = self.stats.frame_errors.wrapping_add(1);
                self.diagnostics.push(Diagnostic::Frame(e));
                if e.needs_resync() {
                    self.session.reset();
                    return self.restart(ring);
                }
                // Resend requests bypass the session so its own resend
                // bookkeeping stays intact
                self.stats.resends = self.stats.resends.wrapping_add(1);
                self.transmit(ps2::RESEND);
                return FrameOutcome::Continue;
            }
        };

        let epoch = self.session.epoch();
        let action = self.session.on_byte(byte, &mut self.diagnostics);
        if self.session.epoch() != epoch {
            ring.discard_pending();
        }
        match action {
            Action::None => {}
            Action::SendCommand(command) => self.transmit(command),
            Action::EnqueueForDecoding => self.enqueue(byte, ring),
            Action::EnqueueAndSend(command) => {
                self.enqueue(byte, ring);
                self.transmit(command);
            }
            Action::EnqueueBytes(first, second) => {
                self.enqueue(first, ring);
                self.enqueue(second, ring);
            }
            Action::RestartReceiver => return self.restart(ring),
        }
        FrameOutcome::Continue
    }

    /// Evaluate session timeouts (task context)
    ///
    /// Must not run concurrently with `on_frame`: a timeout can start a new
    /// epoch, which discards queued bytes on the producer's behalf.
    pub fn on_tick(&mut self, now_ms: u32, ring: &RingBuffer) -> FrameOutcome {
        let idle = self.clock.is_idle();
        let epoch = self.session.epoch();
        let action = self.session.on_tick(now_ms, idle, &mut self.diagnostics);
        if self.session.epoch() != epoch {
            ring.discard_pending();
        }
        match action {
            Action::SendCommand(command) => self.transmit(command),
            Action::RestartReceiver => return self.restart(ring),
            // Ticks never carry a received byte
            Action::None
            | Action::EnqueueForDecoding
            | Action::EnqueueAndSend(_)
            | Action::EnqueueBytes(..) => {}
        }
        FrameOutcome::Continue
    }

    /// Task-side service: timeouts, diagnostics and a status snapshot
    pub fn service(
        &mut self,
        now_ms: u32,
        ring: &RingBuffer,
        diagnostics: &mut DiagnosticLog,
    ) -> PortTick {
        let outcome = self.on_tick(now_ms, ring);
        self.drain_diagnostics(diagnostics);
        PortTick {
            status: self.status(),
            outcome,
        }
    }

    /// Forward the host's lock LED state to the session
    pub fn set_lock_leds(&mut self, leds: LockLeds) {
        self.session.set_lock_leds(leds);
    }

    pub fn status(&self) -> PortStatus {
        PortStatus {
            protocol: self.session.protocol(),
            initialised: self.session.is_initialised(),
            epoch: self.session.epoch(),
            code_set: self.session.code_set(),
            mouse_wheel: self.session.mouse_wheel(),
        }
    }

    pub fn stats(&self) -> PortStats {
        self.stats
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Move pending diagnostics into `out`
    pub fn drain_diagnostics(&mut self, out: &mut DiagnosticLog) {
        self.diagnostics.drain_into(out);
    }

    fn transmit(&mut self, command: u8) {
        let sent = encode_command(self.format, command)
            .map(|word| self.transmitter.send_command(word).is_ok())
            .unwrap_or(false);
        if !sent {
            self.diagnostics.push(Diagnostic::TransmitFailed(command));
        }
    }

    fn enqueue(&mut self, byte: u8, ring: &RingBuffer) {
        if let Err(overflow) = ring.put(byte) {
            self.stats.overflows = self.stats.overflows.wrapping_add(1);
            self.diagnostics.push(Diagnostic::Overflow(overflow));
        }
    }

    fn restart(&mut self, ring: &RingBuffer) -> FrameOutcome {
        ring.discard_pending();
        self.stats.restarts = self.stats.restarts.wrapping_add(1);
        FrameOutcome::RestartReceiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyconv_hal::{ReceiveOnly, TransmitError};
    use keyconv_protocol::{Frame, FrameError};

    #[derive(Default)]
    struct Recorder(Vec<RawWord>);

    impl CommandTransmitter for Recorder {
        fn send_command(&mut self, word: RawWord) -> Result<(), TransmitError> {
            self.0.push(word);
            Ok(())
        }
    }

    struct Idle;

    impl ClockLine for Idle {
        fn is_idle(&self) -> bool {
            true
        }
    }

    fn at_port() -> Port<Recorder, Idle> {
        Port::new(&ConverterConfig::default(), Recorder::default(), Idle)
    }

    fn sent_bytes(port: &Port<Recorder, Idle>) -> Vec<u8> {
        port.transmitter.0.iter().map(|&w| w as u8).collect()
    }

    #[test]
    fn test_valid_frames_drive_session_and_ring() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83, 0x1C] {
            assert_eq!(port.on_frame(Frame::to_word(b), &ring), FrameOutcome::Continue);
        }
        assert_eq!(sent_bytes(&port), [ps2::GET_ID]);
        assert_eq!(port.transmitter.0[0], 0x2F2);
        assert_eq!(ring.get(), Some(0x1C));
        assert_eq!(ring.get(), None);
        assert!(port.status().initialised);
        assert_eq!(port.status().code_set, Some(CodeSet::Set2));
    }

    #[test]
    fn test_parity_error_requests_resend() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        let bad = Frame::to_word(0x1C) ^ (1 << 9);
        assert_eq!(port.on_frame(bad, &ring), FrameOutcome::Continue);
        assert_eq!(sent_bytes(&port), [ps2::RESEND]);
        assert!(ring.is_empty());
        let stats = port.stats();
        assert_eq!(stats.frame_errors, 1);
        assert_eq!(stats.resends, 1);

        let mut diag = DiagnosticLog::new();
        port.drain_diagnostics(&mut diag);
        assert_eq!(diag.pop(), Some(Diagnostic::Frame(FrameError::BadParity)));
    }

    #[test]
    fn test_framing_error_resets_session_and_restarts() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        assert!(port.status().initialised);

        let bad = Frame::to_word(0x1C) & !(1 << 10);
        assert_eq!(port.on_frame(bad, &ring), FrameOutcome::RestartReceiver);
        assert!(!port.status().initialised);
        assert_eq!(port.stats().restarts, 1);
        // No resend for a frame that cannot be trusted
        assert_eq!(sent_bytes(&port), [ps2::GET_ID]);
    }

    #[test]
    fn test_framing_error_discards_queued_bytes() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83, 0xE0] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        assert_eq!(ring.len(), 1);
        let bad = Frame::to_word(0x75) & !(1 << 10);
        assert_eq!(port.on_frame(bad, &ring), FrameOutcome::RestartReceiver);
        assert!(ring.is_empty());
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_new_epoch_discards_queued_bytes() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83, 0xE0] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        let epoch = port.status().epoch;
        // Re-plugged keyboard: self test, then identification
        for b in [0xAA, 0xAB, 0x83] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        assert_ne!(port.status().epoch, epoch);
        port.on_frame(Frame::to_word(0x75), &ring);
        assert_eq!(ring.get(), Some(0x75));
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_amiga_first_key_survives_its_own_epoch() {
        let mut config = ConverterConfig::default();
        config.interface.protocol = Protocol::Amiga;
        let ring = RingBuffer::new();
        let mut port = Port::new(&config, ReceiveOnly, Idle);
        // Key 0x20 pressed on a keyboard that was already running
        port.on_frame(0xBF, &ring);
        assert!(port.status().initialised);
        assert_eq!(ring.get(), Some(0x20));
    }

    #[test]
    fn test_service_ticks_and_reports() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        let mut diag = DiagnosticLog::new();
        let tick = port.service(0, &ring, &mut diag);
        assert_eq!(tick.outcome, FrameOutcome::Continue);
        assert!(tick.status.initialised);
        assert_eq!(diag.pop(), Some(Diagnostic::DeviceIdentified(0xAB83)));
        // Fresh keyboard: LEDs are brought in line with the host
        assert_eq!(sent_bytes(&port), [ps2::GET_ID, ps2::SET_LOCK_LEDS]);
    }

    #[test]
    fn test_overflow_is_dropped_and_counted() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        for _ in 0..ring.usable_capacity() + 2 {
            port.on_frame(Frame::to_word(0x1C), &ring);
        }
        assert_eq!(ring.len(), ring.usable_capacity());
        assert_eq!(port.stats().overflows, 2);
        // Overflow never touches the session
        assert!(port.status().initialised);
    }

    #[test]
    fn test_tick_sends_through_transmitter() {
        let ring = RingBuffer::new();
        let mut port = at_port();
        for b in [0xAA, 0xAB, 0x83] {
            port.on_frame(Frame::to_word(b), &ring);
        }
        port.set_lock_leds(LockLeds::from_hid_report(0x01));
        assert_eq!(port.on_tick(0, &ring), FrameOutcome::Continue);
        assert_eq!(sent_bytes(&port), [ps2::GET_ID, ps2::SET_LOCK_LEDS]);
    }

    #[test]
    fn test_xt_bad_start_restarts_receiver() {
        let mut config = ConverterConfig::default();
        config.interface.protocol = Protocol::Xt;
        let ring = RingBuffer::new();
        let mut port = Port::new(&config, ReceiveOnly, Idle);
        assert_eq!(port.on_frame(0x1 | (0xAA << 1), &ring), FrameOutcome::Continue);
        assert!(port.status().initialised);
        assert_eq!(port.on_frame(0x1C << 1, &ring), FrameOutcome::RestartReceiver);
        assert!(!port.status().initialised);
    }

    #[test]
    fn test_amiga_caps_tap_enqueues_two_bytes() {
        let mut config = ConverterConfig::default();
        config.interface.protocol = Protocol::Amiga;
        let ring = RingBuffer::new();
        let mut port = Port::new(&config, ReceiveOnly, Idle);
        // Caps lock pressed, LED on: wire level of 0x62 rotated left and inverted
        let word = !(0x62u8.rotate_left(1)) as u32;
        port.on_frame(word, &ring);
        assert_eq!(ring.get(), Some(0x62));
        assert_eq!(ring.get(), Some(0xE2));
    }

    #[test]
    fn test_m0110_poll_enqueues_and_polls() {
        let mut config = ConverterConfig::default();
        config.interface.protocol = Protocol::M0110;
        let ring = RingBuffer::new();
        let mut port = Port::new(&config, Recorder::default(), Idle);
        port.on_tick(0, &ring);
        port.on_frame(0x0B, &ring);
        port.on_frame(0x7B, &ring);
        port.on_frame(0x01, &ring);
        assert_eq!(sent_bytes(&port), [0x16, 0x10, 0x10, 0x10]);
        assert_eq!(ring.get(), Some(0x01));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_receive_only_commands_are_logged() {
        let mut config = ConverterConfig::default();
        config.interface.protocol = Protocol::M0110;
        let ring = RingBuffer::new();
        let mut port = Port::new(&config, ReceiveOnly, Idle);
        port.on_tick(0, &ring);
        let mut diag = DiagnosticLog::new();
        port.drain_diagnostics(&mut diag);
        assert_eq!(diag.pop(), Some(Diagnostic::TransmitFailed(0x16)));
    }
}
