//! Single-slot frame mailbox between the assembler and the consumer.
//!
//! The producer overwrites; the consumer consumes-and-clears. Stale frames
//! are never queued: a consumer always sees the most recent unique frame or
//! blocks until one arrives.

use parking_lot::{Condvar, Mutex};

use strikeline_foundation::Fault;

use crate::packet::PIXELS_PER_FRAME;

/// A published thermal frame, copied out to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonic capture timestamp.
    pub t_ns: u64,
    /// Strictly monotonic publish counter, starting at 0.
    pub seq: u32,
    /// Row-major °F pixels, [`PIXELS_PER_FRAME`] of them.
    pub pixels: Vec<f32>,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            t_ns: 0,
            seq: 0,
            pixels: vec![0.0; PIXELS_PER_FRAME],
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the producer side went away, which decides what waiting consumers
/// are told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Shutdown,
    StreamEnded,
}

struct Slot {
    pixels: Vec<f32>,
    t_ns: u64,
    seq: u32,
    fresh: bool,
    closed: Option<CloseReason>,
}

pub struct FrameMailbox {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                pixels: vec![0.0; PIXELS_PER_FRAME],
                t_ns: 0,
                seq: 0,
                fresh: false,
                closed: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// Producer side: overwrite the slot and wake one waiter.
    pub fn publish(&self, pixels: &[f32], t_ns: u64, seq: u32) {
        debug_assert_eq!(pixels.len(), PIXELS_PER_FRAME);
        let mut slot = self.slot.lock();
        slot.pixels.copy_from_slice(pixels);
        slot.t_ns = t_ns;
        slot.seq = seq;
        slot.fresh = true;
        self.cond.notify_one();
    }

    /// Consumer side: block until a fresh frame or a close, copy the frame
    /// out and clear the fresh flag.
    ///
    /// After a shutdown close the call fails immediately with
    /// [`Fault::Shutting`]; after the stream ends, any remaining fresh frame
    /// is delivered first and later calls fail with [`Fault::EndOfStream`].
    pub fn take(&self, frame: &mut Frame) -> Result<(), Fault> {
        let mut slot = self.slot.lock();
        loop {
            if matches!(slot.closed, Some(CloseReason::Shutdown)) {
                return Err(Fault::Shutting);
            }
            if slot.fresh {
                frame.pixels.clear();
                frame.pixels.extend_from_slice(&slot.pixels);
                frame.t_ns = slot.t_ns;
                frame.seq = slot.seq;
                slot.fresh = false;
                return Ok(());
            }
            if matches!(slot.closed, Some(CloseReason::StreamEnded)) {
                return Err(Fault::EndOfStream);
            }
            self.cond.wait(&mut slot);
        }
    }

    /// Mark the mailbox closed and wake every waiter. A later `Shutdown`
    /// close overrides an earlier `StreamEnded` one.
    pub fn close(&self, reason: CloseReason) {
        let mut slot = self.slot.lock();
        match (slot.closed, reason) {
            (Some(CloseReason::Shutdown), _) => {}
            _ => slot.closed = Some(reason),
        }
        self.cond.notify_all();
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}
