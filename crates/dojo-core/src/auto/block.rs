//! Dummy auto-block control.
//!
//! Drives the game's own practice auto-block flag according to the
//! configured policy, plus an orthogonal adaptive-stance mode that keeps
//! the dummy's guard matched to incoming highs and lows.
//!
//! The flag is never dropped while the dummy is guarding or otherwise
//! locked: an OFF decision in that window is deferred and applied on the
//! next safe edge, so a policy change can never cut an active guard short.

use std::sync::atomic::Ordering;

use tracing::debug;

use crate::context::SharedContext;
use crate::memory::{GameMemory, layout};
use crate::sample::PerFrameSample;
use crate::settings::{AutoBlockPolicy, Settings};
use crate::state;

pub struct AutoBlockMachine {
    /// Last value written to the game's flag, if any.
    flag_on: Option<bool>,
    pending_off: bool,
    /// FirstHitThenOff: a hit/block has been absorbed.
    /// EnableAfterFirstHit: the first hit has landed.
    saw_first_event: bool,
    neutral_frames: u32,
}

impl AutoBlockMachine {
    pub fn new() -> Self {
        Self {
            flag_on: None,
            pending_off: false,
            saw_first_event: false,
            neutral_frames: 0,
        }
    }

    /// Restart the policy progression (match entry, policy change).
    pub fn reset(&mut self) {
        self.flag_on = None;
        self.pending_off = false;
        self.saw_first_event = false;
        self.neutral_frames = 0;
    }

    pub fn tick(
        &mut self,
        sample: &PerFrameSample,
        settings: &Settings,
        ctx: &SharedContext,
        mem: &dyn GameMemory,
    ) {
        let dummy = dummy_side(settings);
        let policy = if ctx.features.auto_block.load(Ordering::Acquire) {
            settings.auto_block.policy.normalized()
        } else {
            AutoBlockPolicy::None
        };

        self.track_events(dummy, sample, settings);
        let want_on = self.desired_flag(policy);
        self.commit_flag(dummy, want_on, sample, mem);

        if settings.auto_block.adaptive_stance
            && ctx.features.adaptive_stance.load(Ordering::Acquire)
        {
            self.adapt_stance(dummy, sample, mem);
        }
    }

    fn track_events(&mut self, dummy: usize, sample: &PerFrameSample, settings: &Settings) {
        if sample.entered(dummy, state::is_blockstun) || sample.entered(dummy, state::is_hitstun) {
            self.saw_first_event = true;
            self.neutral_frames = 0;
        }

        // Neutral timeout: a dummy resting in an allowed-neutral state for
        // long enough re-arms the policy. Zero disables the timer entirely.
        let timeout = settings.auto_block.neutral_timeout_frames;
        if timeout == 0 {
            return;
        }
        if state::is_neutral(sample.move_id[dummy]) {
            if sample.tick.is_multiple_of(3) {
                self.neutral_frames += 1;
            }
            if self.neutral_frames >= timeout && self.saw_first_event {
                debug!("auto-block neutral timeout, re-arming policy");
                self.saw_first_event = false;
                self.neutral_frames = 0;
            }
        } else {
            self.neutral_frames = 0;
        }
    }

    fn desired_flag(&self, policy: AutoBlockPolicy) -> bool {
        match policy {
            AutoBlockPolicy::None => false,
            AutoBlockPolicy::All => true,
            AutoBlockPolicy::FirstHitThenOff => !self.saw_first_event,
            AutoBlockPolicy::EnableAfterFirstHit => self.saw_first_event,
            // normalized() upstream maps Adaptive to All.
            AutoBlockPolicy::Adaptive => true,
        }
    }

    fn commit_flag(
        &mut self,
        dummy: usize,
        want_on: bool,
        sample: &PerFrameSample,
        mem: &dyn GameMemory,
    ) {
        let base = sample.char_base[dummy];
        if base == 0 {
            return;
        }
        let flag_addr = base + layout::player::AUTOBLOCK_FLAG;

        if want_on {
            self.pending_off = false;
            if self.flag_on != Some(true) && mem.write_u8(flag_addr, 1).is_ok() {
                self.flag_on = Some(true);
            }
            return;
        }

        if self.flag_on == Some(false) && !self.pending_off {
            return;
        }

        // Dropping the flag mid-guard would cut the dummy's block window
        // short; defer until the dummy is free and out of guard.
        let id = sample.move_id[dummy];
        let unsafe_now =
            state::is_blockstun(id) || state::is_guard_stance(id) || !sample.actionable[dummy];
        if unsafe_now {
            self.pending_off = true;
            return;
        }

        if mem.write_u8(flag_addr, 0).is_ok() {
            self.flag_on = Some(false);
            self.pending_off = false;
        }
    }

    /// Continuously match the dummy's stance to the attacker's current
    /// frame properties, with a small lookahead so the switch lands before
    /// the hit does.
    fn adapt_stance(&mut self, dummy: usize, sample: &PerFrameSample, mem: &dyn GameMemory) {
        let attacker = 1 - dummy;
        if !state::is_attack(sample.move_id[attacker]) {
            return;
        }
        let attacker_base = sample.char_base[attacker];
        let dummy_base = sample.char_base[dummy];
        if attacker_base == 0 || dummy_base == 0 {
            return;
        }

        let Ok(props_ptr) = mem.read_u32(attacker_base + layout::player::FRAME_PROPS_PTR) else {
            return;
        };
        if props_ptr == 0 {
            return;
        }
        let Ok(frame) = mem.read_u16(attacker_base + layout::player::ANIM_FRAME) else {
            return;
        };

        // Current frame plus 1- and 2-frame lookahead.
        let mut props = 0u8;
        for offset in 0..3u32 {
            if let Ok(p) = mem.read_u8(props_ptr + frame as u32 + offset) {
                props |= p;
            }
        }

        let crouch = if props & layout::frame_props::HITS_LOW != 0 {
            true
        } else if props & layout::frame_props::HITS_HIGH != 0 {
            false
        } else {
            return;
        };

        // Preserve an in-progress guard across the stance write: the
        // engine re-derives guard from these fields on the same frame.
        let blockstun = mem.read_u16(dummy_base + layout::player::BLOCKSTUN_TIMER).ok();
        let move_id = mem.read_u16(dummy_base + layout::player::MOVE_ID).ok();

        let _ = mem.write_u8(dummy_base + layout::player::STANCE, u8::from(crouch));
        let _ = mem.write_u8(
            dummy_base + layout::player::BLOCK_MODE,
            if crouch { 2 } else { 1 },
        );

        if let Some(timer) = blockstun {
            let _ = mem.write_u16(dummy_base + layout::player::BLOCKSTUN_TIMER, timer);
        }
        if let Some(id) = move_id {
            let _ = mem.write_u16(dummy_base + layout::player::MOVE_ID, id);
        }
    }
}

impl Default for AutoBlockMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn dummy_side(settings: &Settings) -> usize {
    match settings.trigger_side {
        crate::settings::TargetSide::P1 => 0,
        _ => 1,
    }
}
