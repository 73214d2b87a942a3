//! Lock-free snapshot publishing for overlay/GUI consumers.
//!
//! The monitor publishes a small projection of game state every tick; GUI
//! threads read it without ever blocking the writer. The cell is a classic
//! seqlock over two buffers: the sequence counter is odd while a write is
//! in progress, and a reader that observes an odd or changed sequence
//! retries instead of using the torn payload.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering, fence};

use chrono::Utc;

use crate::state::GamePhase;

/// Publish-only projection of the per-frame sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSnapshot {
    pub tick: u64,
    /// Wall-clock milliseconds at publish time.
    pub wall_ms: i64,
    pub phase: GamePhase,
    pub move_id: [u16; 2],
    pub pos_x: [f32; 2],
    pub pos_y: [f32; 2],
    pub hp: [u16; 2],
    pub meter: [u16; 2],
    pub rf: [f32; 2],
    pub in_blockstun: [bool; 2],
    pub in_hitstun: [bool; 2],
    /// Entered blockstun this tick.
    pub blockstun_edge: [bool; 2],
    /// Entered hitstun this tick.
    pub hitstun_edge: [bool; 2],
    pub hits_landed: [u32; 2],
}

const READ_RETRIES: u32 = 4;

/// Double-buffered seqlock cell. Exactly one writer (the monitor thread);
/// any number of readers.
pub struct SnapshotCell {
    seq: AtomicU32,
    slots: [UnsafeCell<FrameSnapshot>; 2],
}

// SAFETY: the sequence protocol below ensures readers never use a payload
// that raced with the single writer; torn reads are detected and retried.
unsafe impl Sync for SnapshotCell {}
unsafe impl Send for SnapshotCell {}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            slots: [
                UnsafeCell::new(FrameSnapshot::default()),
                UnsafeCell::new(FrameSnapshot::default()),
            ],
        }
    }

    /// Publish a new snapshot. Never blocks.
    ///
    /// Must only ever be called from one thread at a time; the monitor
    /// thread is the sole writer by construction.
    pub fn publish(&self, snapshot: FrameSnapshot) {
        let s0 = self.seq.load(Ordering::Relaxed);
        debug_assert!(s0.is_multiple_of(2), "concurrent snapshot writers");

        // Odd sequence marks the write window.
        self.seq.store(s0.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        // Alternate buffers so a slow reader of the previous snapshot is
        // never overwritten mid-copy.
        let idx = (((s0 >> 1) as usize) + 1) & 1;
        // SAFETY: single writer; readers validate the sequence counter and
        // discard anything read during the odd window.
        unsafe {
            std::ptr::write_volatile(self.slots[idx].get(), snapshot);
        }

        fence(Ordering::Release);
        self.seq.store(s0.wrapping_add(2), Ordering::Release);
    }

    /// Read the most recent complete snapshot, or `None` if the writer is
    /// mid-publish on every retry or nothing was ever published.
    pub fn try_read(&self) -> Option<FrameSnapshot> {
        for _ in 0..READ_RETRIES {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 == 0 {
                return None;
            }
            if !s1.is_multiple_of(2) {
                std::hint::spin_loop();
                continue;
            }

            let idx = ((s1 >> 1) as usize) & 1;
            // SAFETY: a concurrent write is detected by the sequence
            // re-check below, in which case the value is discarded.
            let snapshot = unsafe { std::ptr::read_volatile(self.slots[idx].get()) };

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == s1 {
                return Some(snapshot);
            }
            std::hint::spin_loop();
        }
        None
    }

    /// Read the latest snapshot if it is no older than `max_age_ms`.
    pub fn try_get_latest(&self, out: &mut FrameSnapshot, max_age_ms: i64) -> bool {
        let Some(snapshot) = self.try_read() else {
            return false;
        };
        let age = Utc::now().timestamp_millis() - snapshot.wall_ms;
        if age > max_age_ms {
            return false;
        }
        *out = snapshot;
        true
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}
