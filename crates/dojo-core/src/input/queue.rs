//! Single-producer single-consumer step queue feeding the input hook.
//!
//! The monitor thread enqueues per-visual-frame steps; the hook, running
//! on the game's own thread, pops one step per processed frame. Lock-free
//! because the consumer side executes inside the host's input routine and
//! must never block.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One visual frame of a scripted input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueuedStep {
    pub mask: u8,
    /// Also mirror this frame into the engine's input-history ring.
    pub write_ring: bool,
}

const QUEUE_CAP: usize = 64;

/// Fixed-capacity SPSC ring of [`QueuedStep`]s.
pub struct StepQueue {
    buf: [UnsafeCell<QueuedStep>; QUEUE_CAP],
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: slot at `tail` is written only by the producer before the tail
// is published; slot at `head` is read only by the consumer before the
// head advances. Indices never alias an in-flight slot.
unsafe impl Sync for StepQueue {}
unsafe impl Send for StepQueue {}

impl StepQueue {
    pub fn new() -> Self {
        Self {
            buf: std::array::from_fn(|_| UnsafeCell::new(QueuedStep::default())),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.tail
            .load(Ordering::Acquire)
            .wrapping_sub(self.head.load(Ordering::Acquire))
    }

    /// Producer side. Returns `false` when the queue is full.
    pub fn push(&self, step: QueuedStep) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= QUEUE_CAP {
            return false;
        }
        // SAFETY: this slot is outside the readable window until the tail
        // store below publishes it.
        unsafe {
            *self.buf[tail % QUEUE_CAP].get() = step;
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<QueuedStep> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: head != tail, so this slot holds a published value the
        // producer will not touch until head advances past it.
        let step = unsafe { *self.buf[head % QUEUE_CAP].get() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(step)
    }

    /// Drop all pending steps (consumer side).
    pub fn clear(&self) {
        while self.pop().is_some() {}
    }
}

impl Default for StepQueue {
    fn default() -> Self {
        Self::new()
    }
}
