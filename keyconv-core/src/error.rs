//! Error taxonomy and diagnostics
//!
//! Every error the engine can meet is recovered locally. What surfaces is a
//! [`Diagnostic`] for the log, recorded in interrupt context into a
//! [`DiagnosticLog`] and written out later from task context.

use heapless::Deque;
use keyconv_protocol::FrameError;

/// Capacity of a diagnostic log between two task-side drains
pub const DIAGNOSTIC_LOG_SIZE: usize = 8;

/// A multi-byte scan-code sequence was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// Byte not valid in the decoder's current state
    UnexpectedByte(u8),
}

/// A device stopped answering during a handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakeTimeout {
    /// Number of stall periods observed
    pub stalls: u8,
    /// True if the session falls back to defaults instead of retrying
    pub gave_up: bool,
}

/// The ring buffer was full; the byte was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferOverflow(pub u8);

/// Recoverable events worth logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Diagnostic {
    /// Frame rejected by the codec
    Frame(FrameError),
    /// Byte dropped for lack of ring buffer space
    Overflow(BufferOverflow),
    /// Device did not answer in time
    Timeout(HandshakeTimeout),
    /// Byte outside the session's expected vocabulary
    UnexpectedResponse(u8),
    /// Device reported a failed power-on self test
    SelfTestFailed,
    /// Keyboard or mouse id read (0xFFFF = unknown)
    DeviceIdentified(u16),
    /// Device asked for the last command again
    ResendRequested(u8),
    /// Device reported a key detection error or internal overrun
    DeviceOverrun(u8),
    /// Amiga keyboard management code
    AmigaManagement(u8),
    /// Key dropped from the Amiga power-up stream
    PowerUpKeyDropped(u8),
    /// Command could not be queued on the transmitter
    TransmitFailed(u8),
}

/// Bounded queue of diagnostics
///
/// Pushing never blocks or allocates; when full, the newest entry is
/// dropped and counted.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Deque<Diagnostic, DIAGNOSTIC_LOG_SIZE>,
    dropped: u16,
}

impl DiagnosticLog {
    /// Create an empty log
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            dropped: 0,
        }
    }

    /// Record a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.entries.push_back(diagnostic).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Take the oldest diagnostic
    pub fn pop(&mut self) -> Option<Diagnostic> {
        self.entries.pop_front()
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics lost because the log was full
    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    /// Move everything pending into `other`, oldest first
    pub fn drain_into(&mut self, other: &mut DiagnosticLog) {
        while let Some(d) = self.pop() {
            other.push(d);
        }
        other.dropped = other.dropped.saturating_add(self.dropped);
        self.dropped = 0;
    }

    /// Take the whole log, leaving an empty one behind
    pub fn take(&mut self) -> DiagnosticLog {
        core::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_fifo() {
        let mut log = DiagnosticLog::new();
        log.push(Diagnostic::SelfTestFailed);
        log.push(Diagnostic::UnexpectedResponse(0x12));
        assert_eq!(log.pop(), Some(Diagnostic::SelfTestFailed));
        assert_eq!(log.pop(), Some(Diagnostic::UnexpectedResponse(0x12)));
        assert_eq!(log.pop(), None);
    }

    #[test]
    fn test_full_log_counts_drops() {
        let mut log = DiagnosticLog::new();
        for i in 0..(DIAGNOSTIC_LOG_SIZE as u8 + 3) {
            log.push(Diagnostic::UnexpectedResponse(i));
        }
        assert_eq!(log.len(), DIAGNOSTIC_LOG_SIZE);
        assert_eq!(log.dropped(), 3);
        // Oldest entries survive
        assert_eq!(log.pop(), Some(Diagnostic::UnexpectedResponse(0)));
    }

    #[test]
    fn test_drain_into_moves_entries_and_drop_count() {
        let mut a = DiagnosticLog::new();
        let mut b = DiagnosticLog::new();
        for _ in 0..(DIAGNOSTIC_LOG_SIZE + 1) {
            a.push(Diagnostic::SelfTestFailed);
        }
        a.drain_into(&mut b);
        assert!(a.is_empty());
        assert_eq!(a.dropped(), 0);
        assert_eq!(b.len(), DIAGNOSTIC_LOG_SIZE);
        assert_eq!(b.dropped(), 1);
    }
}
