//! Single-producer single-consumer byte ring
//!
//! The receive interrupt is the only producer and the coordinator task the
//! only consumer. The producer owns `head`, the consumer owns `tail`; each
//! publishes its index with release ordering after touching the slot, and
//! reads the other side's index with acquire ordering.
//!
//! One slot always stays free so that `head == tail` means empty and
//! `head + 1 == tail` means full.
//!
//! # Discarding
//!
//! After a resync or a new device session the bytes still queued belong to
//! a stream that no longer exists. The producer cannot touch `tail`, so it
//! publishes a discard mark instead: its own `head` plus a generation
//! number. The consumer moves `tail` up to the mark the next time it reads,
//! and the producer already treats the mark as the tail when checking for
//! space.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::error::BufferOverflow;

/// Number of slots, one of which is always unused
pub const RING_CAPACITY: usize = 32;

const MASK: usize = RING_CAPACITY - 1;

const _: () = assert!(RING_CAPACITY.is_power_of_two());

/// Lock-free byte FIFO shared between interrupt and task context
pub struct RingBuffer {
    slots: [AtomicU8; RING_CAPACITY],
    head: AtomicUsize,
    tail: AtomicUsize,
    /// Producer: head position of the latest discard
    discard_mark: AtomicUsize,
    /// Producer: bumped after every new mark
    discard_generation: AtomicUsize,
    /// Consumer: generation already applied to `tail`
    discard_applied: AtomicUsize,
}

impl RingBuffer {
    /// Create an empty ring, usable in a `static`
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: AtomicU8 = AtomicU8::new(0);
        Self {
            slots: [EMPTY; RING_CAPACITY],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            discard_mark: AtomicUsize::new(0),
            discard_generation: AtomicUsize::new(0),
            discard_applied: AtomicUsize::new(0),
        }
    }

    /// Number of bytes the ring can hold at once
    pub const fn usable_capacity(&self) -> usize {
        RING_CAPACITY - 1
    }

    /// True if there is nothing to read
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.live_tail()
    }

    /// True if a `put` would be rejected
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        (head + 1) & MASK == self.live_tail()
    }

    /// Number of bytes waiting to be read
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(self.live_tail()) & MASK
    }

    /// Append a byte (producer side)
    ///
    /// A full ring rejects the byte and stays unchanged.
    pub fn put(&self, byte: u8) -> Result<(), BufferOverflow> {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & MASK;
        if next == self.live_tail() {
            return Err(BufferOverflow(byte));
        }
        self.slots[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Drop every byte queued so far (producer side)
    ///
    /// Bytes put afterwards are kept. Safe while the consumer is running.
    pub fn discard_pending(&self) {
        let head = self.head.load(Ordering::Relaxed);
        self.discard_mark.store(head, Ordering::Release);
        let generation = self.discard_generation.load(Ordering::Relaxed);
        self.discard_generation
            .store(generation.wrapping_add(1), Ordering::Release);
    }

    /// Number of discards so far, wrapping
    ///
    /// A consumer that must not mix bytes across a discard reads this before
    /// looking at other shared state and compares it again before `get`.
    pub fn discard_generation(&self) -> usize {
        self.discard_generation.load(Ordering::Acquire)
    }

    /// Remove the oldest byte (consumer side)
    pub fn get(&self) -> Option<u8> {
        self.apply_discard();
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.slots[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) & MASK, Ordering::Release);
        Some(byte)
    }

    /// Discard everything pending and forget past marks
    ///
    /// Only safe to call while the producer is quiescent, e.g. before the
    /// receiver is started.
    pub fn reset(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
        self.discard_mark.store(head, Ordering::Release);
        let generation = self.discard_generation.load(Ordering::Acquire);
        self.discard_applied.store(generation, Ordering::Release);
    }

    /// Tail as seen by either side, with an unapplied discard taken into account
    fn live_tail(&self) -> usize {
        let generation = self.discard_generation.load(Ordering::Acquire);
        if generation == self.discard_applied.load(Ordering::Acquire) {
            self.tail.load(Ordering::Acquire)
        } else {
            self.discard_mark.load(Ordering::Acquire)
        }
    }

    /// Move `tail` up to the latest discard mark (consumer side)
    ///
    /// The mark is re-read until the generation around it is stable, so a
    /// discard published in between is never half applied.
    fn apply_discard(&self) {
        loop {
            let generation = self.discard_generation.load(Ordering::Acquire);
            if generation == self.discard_applied.load(Ordering::Relaxed) {
                return;
            }
            let mark = self.discard_mark.load(Ordering::Acquire);
            if self.discard_generation.load(Ordering::Acquire) == generation {
                self.tail.store(mark, Ordering::Release);
                self.discard_applied.store(generation, Ordering::Release);
                return;
            }
        }
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_ring_is_empty() {
        let ring = RingBuffer::new();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_fifo_order() {
        let ring = RingBuffer::new();
        for b in [0xE0, 0xF0, 0x1C] {
            ring.put(b).unwrap();
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(), Some(0xE0));
        assert_eq!(ring.get(), Some(0xF0));
        assert_eq!(ring.get(), Some(0x1C));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_rejects_and_keeps_contents() {
        let ring = RingBuffer::new();
        for i in 0..ring.usable_capacity() {
            ring.put(i as u8).unwrap();
        }
        assert!(ring.is_full());
        assert_eq!(ring.put(0xAA), Err(BufferOverflow(0xAA)));
        assert_eq!(ring.len(), RING_CAPACITY - 1);

        for i in 0..ring.usable_capacity() {
            assert_eq!(ring.get(), Some(i as u8));
        }
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_wraps_around() {
        let ring = RingBuffer::new();
        for round in 0..3u8 {
            for i in 0..20u8 {
                ring.put(round.wrapping_mul(20).wrapping_add(i)).unwrap();
            }
            for i in 0..20u8 {
                assert_eq!(ring.get(), Some(round.wrapping_mul(20).wrapping_add(i)));
            }
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reset_discards_pending() {
        let ring = RingBuffer::new();
        ring.put(1).unwrap();
        ring.put(2).unwrap();
        ring.reset();
        assert!(ring.is_empty());
        ring.put(3).unwrap();
        assert_eq!(ring.get(), Some(3));
    }

    #[test]
    fn test_discard_skips_queued_bytes() {
        let ring = RingBuffer::new();
        ring.put(0xE0).unwrap();
        ring.put(0xF0).unwrap();
        ring.discard_pending();
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        ring.put(0x75).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(), Some(0x75));
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_discard_frees_space_before_consumer_reads() {
        let ring = RingBuffer::new();
        for i in 0..ring.usable_capacity() {
            ring.put(i as u8).unwrap();
        }
        assert!(ring.is_full());
        ring.discard_pending();
        assert!(!ring.is_full());
        for i in 0..ring.usable_capacity() {
            ring.put(0x80 | i as u8).unwrap();
        }
        assert_eq!(ring.put(0xFF), Err(BufferOverflow(0xFF)));
        for i in 0..ring.usable_capacity() {
            assert_eq!(ring.get(), Some(0x80 | i as u8));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_repeated_discards_never_move_tail_back() {
        let ring = RingBuffer::new();
        ring.put(1).unwrap();
        ring.discard_pending();
        ring.put(2).unwrap();
        ring.put(3).unwrap();
        assert_eq!(ring.get(), Some(2));
        ring.discard_pending();
        ring.discard_pending();
        ring.put(4).unwrap();
        assert_eq!(ring.get(), Some(4));
        assert_eq!(ring.get(), None);
        assert_eq!(ring.discard_generation(), 3);
    }

    #[test]
    fn test_discard_on_empty_ring() {
        let ring = RingBuffer::new();
        ring.discard_pending();
        assert!(ring.is_empty());
        assert_eq!(ring.get(), None);
        ring.put(7).unwrap();
        assert_eq!(ring.get(), Some(7));
    }

    proptest! {
        #[test]
        fn prop_output_is_prefix_of_input(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let ring = RingBuffer::new();
            let mut accepted = 0;
            for &b in &bytes {
                if ring.put(b).is_ok() {
                    accepted += 1;
                }
            }
            prop_assert_eq!(accepted, bytes.len().min(RING_CAPACITY - 1));
            let mut out = Vec::new();
            while let Some(b) = ring.get() {
                out.push(b);
            }
            prop_assert_eq!(&out[..], &bytes[..accepted]);
        }

        #[test]
        fn prop_interleaved_put_get_is_fifo(ops in proptest::collection::vec(any::<Option<u8>>(), 0..200)) {
            let ring = RingBuffer::new();
            let mut model = std::collections::VecDeque::new();
            for op in ops {
                match op {
                    Some(b) => {
                        let accepted = ring.put(b).is_ok();
                        prop_assert_eq!(accepted, model.len() < RING_CAPACITY - 1);
                        if accepted {
                            model.push_back(b);
                        }
                    }
                    None => prop_assert_eq!(ring.get(), model.pop_front()),
                }
                prop_assert_eq!(ring.len(), model.len());
            }
        }
    }
}
