//! Task-side access to the device port

use keyconv_hal::{ClockLine, CommandTransmitter};

use crate::error::DiagnosticLog;
use crate::port::{Port, PortTick};
use crate::ringbuf::RingBuffer;

/// The device port as seen from the coordinator loop
///
/// Firmware keeps the port behind a lock shared with the receive interrupt;
/// an implementation takes the lock for the duration of one call.
pub trait PortControl {
    /// Run session timeouts, collect diagnostics and snapshot the status
    ///
    /// Returns `None` while no port is attached.
    fn service(
        &mut self,
        now_ms: u32,
        ring: &RingBuffer,
        diagnostics: &mut DiagnosticLog,
    ) -> Option<PortTick>;
}

impl<T: CommandTransmitter, C: ClockLine> PortControl for Port<T, C> {
    fn service(
        &mut self,
        now_ms: u32,
        ring: &RingBuffer,
        diagnostics: &mut DiagnosticLog,
    ) -> Option<PortTick> {
        Some(Port::service(self, now_ms, ring, diagnostics))
    }
}
