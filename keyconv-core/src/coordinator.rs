//! Task-side drain loop
//!
//! The coordinator runs in thread mode. Each iteration it services the port
//! (session timeouts), follows the port status (switching decoders when the
//! device is re-identified), writes out the diagnostics the interrupt side
//! recorded, and moves at most one byte from the ring buffer through the
//! decoder to the HID sink. Bytes are only taken while the sink is ready;
//! otherwise they wait in the ring.

use crate::config::{CodeSet, ConverterConfig};
use crate::decoder::{Decoded, InputDecoder, SequenceDecoder};
use crate::error::{Diagnostic, DiagnosticLog};
use crate::port::{FrameOutcome, PortStatus};
use crate::ringbuf::RingBuffer;
use crate::traits::{HidSink, PortControl, StatusSink};

/// What one coordinator iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollResult {
    /// A byte left the ring buffer
    pub consumed: bool,
    /// The session asked for a hardware receiver restart
    pub restart_receiver: bool,
}

pub struct TaskCoordinator {
    decoder: InputDecoder,
    default_set: CodeSet,
    last: Option<PortStatus>,
}

impl TaskCoordinator {
    pub fn new(config: &ConverterConfig) -> Self {
        let default_set = config.interface.code_set;
        Self {
            decoder: InputDecoder::select(config.interface.protocol, default_set, false),
            default_set,
            last: None,
        }
    }

    /// Follow the port status
    ///
    /// A new epoch means a new device session: the decoder is replaced so no
    /// partial sequence survives, and the scan code set or packet size the
    /// session found takes effect. Returns the new `initialised` value when
    /// it changed.
    pub fn sync(&mut self, status: PortStatus) -> Option<bool> {
        let previous = self.last.replace(status);

        if previous.map(|p| p.epoch) != Some(status.epoch) {
            let code_set = status.code_set.unwrap_or(self.default_set);
            let wheel = status.mouse_wheel.unwrap_or(false);
            self.decoder = InputDecoder::select(status.protocol, code_set, wheel);
            debug!("coordinator: decoder for epoch {=u16}", status.epoch);
        }

        match previous {
            Some(p) if p.initialised == status.initialised => None,
            _ => Some(status.initialised),
        }
    }

    /// Write out pending diagnostics
    pub fn log_diagnostics(&mut self, diagnostics: &mut DiagnosticLog) {
        let mut pending = diagnostics.take();
        while let Some(d) = pending.pop() {
            log_diagnostic(d);
        }
        if pending.dropped() > 0 {
            warn!("{=u16} diagnostics lost", pending.dropped());
        }
    }

    /// Move at most one byte from the ring to the sink
    ///
    /// `generation` is the ring's discard generation read before the port
    /// status this decoder was synced to. If the producer discarded since,
    /// the bytes now at the front belong to a session the decoder has not
    /// caught up with yet, so nothing is taken until the next sync.
    ///
    /// Returns true if a byte was consumed.
    pub fn drain_one<S: HidSink>(
        &mut self,
        ring: &RingBuffer,
        generation: usize,
        sink: &mut S,
    ) -> bool {
        if !sink.ready() || ring.discard_generation() != generation {
            return false;
        }
        let Some(byte) = ring.get() else {
            return false;
        };
        match self.decoder.feed(byte) {
            Some(Decoded::Key(event)) => sink.deliver(event),
            Some(Decoded::Mouse(report)) => sink.deliver_mouse(report),
            None => {}
        }
        true
    }

    /// One full iteration of the task loop
    ///
    /// Runs the session's timeouts at `now_ms`, then syncs, logs and drains
    /// one byte. Restarting the receiver is left to the caller, which owns
    /// the hardware.
    pub fn poll<P: PortControl, S: HidSink, L: StatusSink>(
        &mut self,
        now_ms: u32,
        port: &mut P,
        diagnostics: &mut DiagnosticLog,
        ring: &RingBuffer,
        sink: &mut S,
        status_sink: &mut L,
    ) -> PollResult {
        let generation = ring.discard_generation();
        let Some(tick) = port.service(now_ms, ring, diagnostics) else {
            return PollResult::default();
        };

        if let Some(initialised) = self.sync(tick.status) {
            info!("device {}", if initialised { "ready" } else { "lost" });
            status_sink.set_initialised(initialised);
        }
        self.log_diagnostics(diagnostics);

        PollResult {
            consumed: self.drain_one(ring, generation, sink),
            restart_receiver: tick.outcome == FrameOutcome::RestartReceiver,
        }
    }

    pub fn decoder(&self) -> &InputDecoder {
        &self.decoder
    }
}

fn log_diagnostic(d: Diagnostic) {
    match d {
        Diagnostic::Frame(e) => warn!("frame error: {}", e),
        Diagnostic::Overflow(o) => warn!("ring buffer full, dropped {=u8:#x}", o.0),
        Diagnostic::Timeout(t) => {
            if t.gave_up {
                warn!("device timeout after {=u8} stalls, using defaults", t.stalls)
            } else {
                info!("device timeout after {=u8} stalls, retrying", t.stalls)
            }
        }
        Diagnostic::UnexpectedResponse(b) => debug!("unexpected response {=u8:#x}", b),
        Diagnostic::SelfTestFailed => error!("device self test failed"),
        Diagnostic::DeviceIdentified(id) => info!("device id {=u16:#x}", id),
        Diagnostic::ResendRequested(c) => debug!("device asked to resend {=u8:#x}", c),
        Diagnostic::DeviceOverrun(b) => warn!("device overrun ({=u8:#x})", b),
        Diagnostic::AmigaManagement(b) => info!("amiga management code {=u8:#x}", b),
        Diagnostic::PowerUpKeyDropped(b) => debug!("power-up key {=u8:#x} dropped", b),
        Diagnostic::TransmitFailed(c) => warn!("command {=u8:#x} not sent", c),
    }
}
