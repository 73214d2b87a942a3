//! Arbitration for the game's per-character input-processing hook.
//!
//! The host re-enters this code synchronously from its own thread once per
//! character per visual frame. Nothing here may block or loop unbounded:
//! the whole path is a handful of atomic loads and memory writes.
//!
//! Authorities, in priority order:
//! 1. poll override (macro replay) — the low-level polling hook returns the
//!    override mask directly; the processing routine runs unmodified.
//! 2. the scripted step queue (auto-action motions, manual override) — the
//!    original routine is bypassed and both the immediate register and,
//!    where flagged, the input-history ring are written directly.
//! 3. the immediate-input writer's effective mask — written both before
//!    and after the original routine, which is known to overwrite the
//!    immediate registers mid-call.
//! 4. nothing — defer to the original routine, forcing one neutral write
//!    if the previous frame used a bypass path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::{ImmediateMode, SIDES, SharedContext};
use crate::memory::{GameMemory, layout};

/// The host's own input-processing routine, reachable through the detour
/// trampoline. A seam so arbitration is testable without a live game.
pub trait OriginalInputRoutine {
    fn process(&self, side: usize);
}

impl<F: Fn(usize)> OriginalInputRoutine for F {
    fn process(&self, side: usize) {
        self(side)
    }
}

/// Which authority won a given invocation. Returned for tests and
/// diagnostics; the host ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    /// A buffer freeze is held for this side; original ran untouched.
    FrozenSkip,
    /// Poll override active; original ran and consumed the override mask.
    PollOverride,
    /// Queue step applied; original bypassed.
    Bypassed,
    /// Immediate mask applied around the original routine.
    Augmented,
    /// No authority; original ran untouched.
    Passthrough,
}

pub struct InputHook {
    ctx: Arc<SharedContext>,
    mem: Arc<dyn GameMemory>,
    bypassed_last: [AtomicBool; SIDES],
}

impl InputHook {
    pub fn new(ctx: Arc<SharedContext>, mem: Arc<dyn GameMemory>) -> Self {
        Self {
            ctx,
            mem,
            bypassed_last: Default::default(),
        }
    }

    /// Low-level polling hook. `Some(mask)` replaces the device read.
    pub fn on_poll(&self, side: usize) -> Option<u8> {
        self.ctx.poll_override[side].get()
    }

    /// Processing hook, called by the host once per character per visual
    /// frame.
    pub fn on_process_input(
        &self,
        side: usize,
        original: &dyn OriginalInputRoutine,
    ) -> HookDecision {
        // An external freeze owner controls this side's buffer; stay out.
        if self.ctx.buffer_freeze[side].load(Ordering::Acquire) {
            original.process(side);
            return HookDecision::FrozenSkip;
        }

        if self.ctx.poll_override[side].get().is_some() {
            // The override is consumed through on_poll inside the original
            // routine; arbitration has nothing further to add.
            original.process(side);
            self.bypassed_last[side].store(false, Ordering::Release);
            return HookDecision::PollOverride;
        }

        if let Some(step) = self.ctx.queues[side].pop() {
            self.write_immediate(side, step.mask);
            if step.write_ring {
                self.push_ring(side, step.mask);
            }
            self.bypassed_last[side].store(true, Ordering::Release);
            return HookDecision::Bypassed;
        }

        let slot = &self.ctx.immediate[side];
        if slot.mode() != ImmediateMode::Off {
            let mask = slot.current();
            if self.ctx.force_bypass[side].load(Ordering::Acquire) {
                self.write_immediate(side, mask);
                self.push_ring(side, mask);
                self.bypassed_last[side].store(true, Ordering::Release);
                return HookDecision::Bypassed;
            }
            self.write_immediate(side, mask);
            original.process(side);
            self.write_immediate(side, mask);
            self.bypassed_last[side].store(false, Ordering::Release);
            return HookDecision::Augmented;
        }

        if self.bypassed_last[side].swap(false, Ordering::AcqRel) {
            // One clean release so the latched bypass mask cannot bleed
            // into organic play.
            self.write_immediate(side, 0);
        }
        original.process(side);
        HookDecision::Passthrough
    }

    /// Batch-write a dash motion's history entries. Called at enqueue time
    /// because per-frame ring writes are too slow for dash detection and
    /// get interleaved with the host's own neutral frames.
    pub fn write_ring_batch(&self, side: usize, masks: &[u8]) {
        for &mask in masks {
            self.push_ring(side, mask);
        }
    }

    fn char_base(&self, side: usize) -> Option<u32> {
        self.mem
            .resolve_base(self.mem.base_address() + layout::player::BASE_SLOT[side])
    }

    fn write_immediate(&self, side: usize, mask: u8) {
        if let Some(base) = self.char_base(side) {
            let _ = self.mem.write_u8(base + layout::player::INPUT_IMMEDIATE, mask);
        }
    }

    fn push_ring(&self, side: usize, mask: u8) {
        push_ring_entry(&*self.mem, side, mask);
    }
}

/// Append one entry to a side's input-history ring, advancing the engine's
/// own index. Shared by the hook and by subsystems that batch-write
/// history (dash motions).
pub fn push_ring_entry(mem: &dyn GameMemory, side: usize, mask: u8) {
    let Some(base) = mem.resolve_base(mem.base_address() + layout::player::BASE_SLOT[side]) else {
        return;
    };
    let Ok(index) = mem.read_u16(base + layout::player::INPUT_RING_INDEX) else {
        return;
    };
    let next = (index + 1) % layout::player::RING_LEN as u16;
    let _ = mem.write_u8(base + layout::player::INPUT_RING + next as u32, mask);
    let _ = mem.write_u16(base + layout::player::INPUT_RING_INDEX, next);
}
