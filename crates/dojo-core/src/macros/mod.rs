//! Macro recording and replay.
//!
//! Recording nominally samples once per visual frame (every third internal
//! tick), but the host can be paused and single-frame-stepped at any time,
//! so under pause the recorder advances on evidence of actual game
//! progress instead: the engine's input-ring index moved, or the
//! frame-step counter incremented. Each recorded tick captures the
//! resolved input mask, the facing at capture time, and the exact raw
//! ring writes the engine performed, so replay can reproduce the host's
//! own write cadence rather than an idealized one-write-per-tick stream.

mod slot;
mod text;

pub use slot::{MacroSlot, MacroSpan, SLOT_COUNT, SlotStats};
pub use text::{ParsedMacro, export_slot, import_slot, parse_macro};

use tracing::{debug, info};

use crate::context::SharedContext;
use crate::input::{InputMask, push_ring_entry};
use crate::memory::{GameMemory, layout};
use crate::sample::PerFrameSample;
use crate::state;

const DIRECTION_BITS: u8 = 0x0F;
const BUTTON_BITS: u8 = 0xF0;

/// Internal frames of the post-replay guard window.
const GUARD_WINDOW_TICKS: u32 = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacroState {
    #[default]
    Idle,
    /// Human has control of the target side; capture not started yet.
    PreRecord,
    Recording,
    Replaying,
}

impl MacroState {
    pub fn raw(self) -> u8 {
        match self {
            MacroState::Idle => 0,
            MacroState::PreRecord => 1,
            MacroState::Recording => 2,
            MacroState::Replaying => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winddown {
    /// One full logical tick of forced neutral for a clean release edge.
    Neutral { sub: u8 },
    /// Hold neutral until the replayed side commits or the budget runs out.
    Guard { ticks_left: u32 },
}

pub struct MacroController {
    state: MacroState,
    active_slot: usize,
    record_side: usize,
    slots: Vec<MacroSlot>,

    // Recording.
    baseline_pending: bool,
    last_ring_index: u16,
    last_step_counter: u32,

    // Replay.
    replay_pos: usize,
    sub_tick: u8,
    buf_offset: usize,
    writes_emitted: usize,
    mirrored: bool,
    winddown: Option<Winddown>,
}

impl MacroController {
    pub fn new(record_side: usize) -> Self {
        Self {
            state: MacroState::Idle,
            active_slot: 0,
            record_side,
            slots: vec![MacroSlot::default(); SLOT_COUNT],
            baseline_pending: false,
            last_ring_index: 0,
            last_step_counter: 0,
            replay_pos: 0,
            sub_tick: 0,
            buf_offset: 0,
            writes_emitted: 0,
            mirrored: false,
            winddown: None,
        }
    }

    pub fn state(&self) -> MacroState {
        self.state
    }

    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    pub fn select_slot(&mut self, slot: usize) -> crate::error::Result<()> {
        if slot >= SLOT_COUNT {
            return Err(crate::error::Error::SlotOutOfRange(slot));
        }
        if self.state == MacroState::Idle {
            self.active_slot = slot;
        }
        Ok(())
    }

    pub fn slot(&self, slot: usize) -> Option<&MacroSlot> {
        self.slots.get(slot)
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut MacroSlot> {
        self.slots.get_mut(slot)
    }

    pub fn slot_stats(&self, slot: usize) -> Option<SlotStats> {
        self.slots.get(slot).map(|s| s.stats())
    }

    pub fn status_line(&self) -> String {
        match self.state {
            MacroState::Idle => format!("Macro: idle (slot {})", self.active_slot + 1),
            MacroState::PreRecord => {
                format!("Macro: slot {} armed, press again to record", self.active_slot + 1)
            }
            MacroState::Recording => format!(
                "Macro: recording slot {} ({} ticks)",
                self.active_slot + 1,
                self.slots[self.active_slot].tick_count()
            ),
            MacroState::Replaying => format!(
                "Macro: replaying slot {} ({}/{})",
                self.active_slot + 1,
                self.replay_pos.min(self.slots[self.active_slot].tick_count()),
                self.slots[self.active_slot].tick_count()
            ),
        }
    }

    /// The record hotkey: Idle -> PreRecord -> Recording -> Idle.
    pub fn handle_record_key(&mut self) {
        match self.state {
            MacroState::Idle => {
                info!("macro slot {} armed for recording", self.active_slot + 1);
                self.state = MacroState::PreRecord;
            }
            MacroState::PreRecord => {
                self.slots[self.active_slot].clear();
                self.baseline_pending = true;
                self.state = MacroState::Recording;
                info!("macro recording started on slot {}", self.active_slot + 1);
            }
            MacroState::Recording => {
                let stats = self.slots[self.active_slot].stats();
                info!(
                    "macro recording finished: {} ticks, {} raw writes",
                    stats.ticks, stats.buf_writes
                );
                self.state = MacroState::Idle;
            }
            MacroState::Replaying => {}
        }
    }

    /// Begin replaying `slot`. Returns `false` (with a status log) when the
    /// slot is empty or a recording is in progress.
    pub fn start_replay(&mut self, slot: usize) -> bool {
        if slot >= SLOT_COUNT || self.state == MacroState::Recording {
            return false;
        }
        if self.slots[slot].is_empty() {
            info!("Macro: slot {} empty", slot + 1);
            return false;
        }
        self.active_slot = slot;
        self.state = MacroState::Replaying;
        self.replay_pos = 0;
        self.sub_tick = 0;
        self.buf_offset = 0;
        self.writes_emitted = 0;
        self.mirrored = false;
        self.winddown = None;
        info!("macro replay started on slot {}", slot + 1);
        true
    }

    /// Stop whatever is in progress and release all overrides.
    pub fn stop(&mut self, ctx: &SharedContext) {
        ctx.poll_override[self.record_side].clear();
        self.winddown = None;
        if self.state != MacroState::Idle {
            debug!("macro stopped from {:?}", self.state);
        }
        self.state = MacroState::Idle;
    }

    /// Advance one internal tick. Called by the monitor.
    pub fn tick(&mut self, sample: &PerFrameSample, ctx: &SharedContext, mem: &dyn GameMemory) {
        match self.state {
            MacroState::Idle | MacroState::PreRecord => {}
            MacroState::Recording => self.record_tick(sample, mem),
            MacroState::Replaying => self.replay_tick(sample, ctx, mem),
        }
        ctx.macro_control.publish_state(self.state.raw());
    }

    fn record_tick(&mut self, sample: &PerFrameSample, mem: &dyn GameMemory) {
        let side = self.record_side;
        let base = sample.char_base[side];
        if base == 0 {
            return;
        }
        let Ok(index) = mem.read_u16(base + layout::player::INPUT_RING_INDEX) else {
            return;
        };
        let step_counter = mem
            .read_u32(mem.base_address() + layout::game::FRAME_STEP_COUNTER)
            .unwrap_or(self.last_step_counter);

        if self.baseline_pending {
            // Clean baseline: nothing before this point belongs to the take.
            self.last_ring_index = index;
            self.last_step_counter = step_counter;
            self.baseline_pending = false;
            return;
        }

        let ring_advanced = index != self.last_ring_index;
        let step_advanced = step_counter != self.last_step_counter;
        // Paused or frame-stepped hosts make wall-clock cadence meaningless;
        // advance on evidence of engine progress instead.
        let progressed = if sample.paused {
            ring_advanced || step_advanced
        } else {
            sample.tick.is_multiple_of(3)
        };
        if !progressed {
            return;
        }

        // Exact raw writes since the last recorded tick, in ring order.
        let mut writes = Vec::new();
        let ring_len = layout::player::RING_LEN as u16;
        let mut i = self.last_ring_index;
        while i != index && writes.len() < ring_len as usize {
            i = (i + 1) % ring_len;
            if let Ok(value) = mem.read_u8(base + layout::player::INPUT_RING + i as u32) {
                writes.push(value);
            }
        }

        let immediate = mem
            .read_u8(base + layout::player::INPUT_IMMEDIATE)
            .unwrap_or(0);
        // Direction from the freshest raw write; buttons from everything
        // seen this tick so short taps between writes are not lost.
        let direction_source = writes.last().copied().unwrap_or(immediate);
        let buttons = writes
            .iter()
            .fold(immediate & BUTTON_BITS, |acc, w| acc | (w & BUTTON_BITS));
        let mask = (direction_source & DIRECTION_BITS) | buttons;

        if writes.is_empty() {
            // Quiet tick (common during a neutral frame-step): keep the
            // one-entry-per-tick invariant alive for replay timing.
            writes.push(mask);
        }

        self.slots[self.active_slot].push_tick(mask, sample.facing_right[side], &writes);
        #[cfg(feature = "heavy-diagnostics")]
        self.slots[self.active_slot].raw_immediate.push(immediate);
        self.last_ring_index = index;
        self.last_step_counter = step_counter;
    }

    fn replay_tick(&mut self, sample: &PerFrameSample, ctx: &SharedContext, mem: &dyn GameMemory) {
        let side = self.record_side;

        if sample.paused {
            // Mirror the recording rule: only advance with the engine.
            let step_counter = mem
                .read_u32(mem.base_address() + layout::game::FRAME_STEP_COUNTER)
                .unwrap_or(self.last_step_counter);
            if step_counter == self.last_step_counter {
                return;
            }
            self.last_step_counter = step_counter;
        }

        if self.winddown.is_some() {
            self.winddown_tick(sample, ctx);
            return;
        }

        if self.sub_tick == 0 {
            if self.replay_pos >= self.slots[self.active_slot].tick_count() {
                ctx.poll_override[side].set(0);
                self.winddown = Some(Winddown::Neutral { sub: 1 });
                return;
            }
            let recorded_mask = self.slots[self.active_slot].mask_stream[self.replay_pos];
            let recorded_facing = self.slots[self.active_slot].facing_stream[self.replay_pos];
            self.mirrored = sample.facing_right[side] != recorded_facing;
            let mask = if self.mirrored {
                InputMask::new(recorded_mask).mirror().bits()
            } else {
                recorded_mask
            };
            ctx.poll_override[side].set(mask);
            self.writes_emitted = 0;
        }

        // Spread the tick's raw writes across its three sub-ticks,
        // ceiling-divided so earlier sub-ticks carry the remainder.
        let total = self.slots[self.active_slot].buf_counts[self.replay_pos] as usize;
        let per_sub = total.div_ceil(3);
        let end = ((self.sub_tick as usize + 1) * per_sub).min(total);
        for k in self.writes_emitted..end {
            let mut value = self.slots[self.active_slot].buf_stream[self.buf_offset + k];
            if self.mirrored {
                value = InputMask::new(value).mirror().bits();
            }
            push_ring_entry(mem, side, value);
        }
        self.writes_emitted = end;

        self.sub_tick += 1;
        if self.sub_tick == 3 {
            self.sub_tick = 0;
            self.buf_offset += total;
            self.replay_pos += 1;
        }
    }

    fn winddown_tick(&mut self, sample: &PerFrameSample, ctx: &SharedContext) {
        let side = self.record_side;
        match self.winddown {
            Some(Winddown::Neutral { sub }) => {
                ctx.poll_override[side].set(0);
                self.winddown = if sub + 1 >= 3 {
                    Some(Winddown::Guard {
                        ticks_left: GUARD_WINDOW_TICKS,
                    })
                } else {
                    Some(Winddown::Neutral { sub: sub + 1 })
                };
            }
            Some(Winddown::Guard { ticks_left }) => {
                // A committed state means restoring control now cannot
                // desync a command in flight; bail out early.
                if state::is_commitment(sample.move_id[side]) || ticks_left == 0 {
                    self.finish_replay(ctx);
                    return;
                }
                ctx.poll_override[side].set(0);
                self.winddown = Some(Winddown::Guard {
                    ticks_left: ticks_left - 1,
                });
            }
            None => {}
        }
    }

    fn finish_replay(&mut self, ctx: &SharedContext) {
        ctx.poll_override[self.record_side].clear();
        self.winddown = None;
        self.state = MacroState::Idle;
        info!("macro replay finished on slot {}", self.active_slot + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockMemory, MockMemoryBuilder};
    use crate::state::GamePhase;
    use std::sync::Arc;

    const CHAR1: u32 = 0x400;

    fn mem_with_char() -> MockMemory {
        // Sized to cover the module-base-relative globals (e.g. the frame-step
        // counter) and the side-1 character struct, with BASE_SLOT[1] pointing
        // at it so `push_ring_entry` resolves the same base that `sample()`
        // reports via `char_base`.
        MockMemoryBuilder::new()
            .with_size(0x3A_0000)
            .pointer(layout::player::BASE_SLOT[1] as usize, CHAR1 as usize)
            .build()
    }

    fn char_base(mem: &MockMemory) -> u32 {
        mem.base_address() + CHAR1
    }

    fn sample(tick: u64, mem: &MockMemory) -> PerFrameSample {
        let mut s = PerFrameSample::empty();
        s.tick = tick;
        s.phase = GamePhase::Match;
        s.char_base = [0, char_base(mem)];
        s.facing_right = [true, false];
        s
    }

    fn set_ring(mem: &MockMemory, entries: &[u8], index: u16) {
        let base = char_base(mem);
        mem.write_u16(base + layout::player::INPUT_RING_INDEX, index)
            .unwrap();
        for (i, &e) in entries.iter().enumerate() {
            mem.write_u8(base + layout::player::INPUT_RING + i as u32, e)
                .unwrap();
        }
    }

    fn recording_controller(mem: &MockMemory) -> (MacroController, Arc<SharedContext>) {
        let ctx = Arc::new(SharedContext::new());
        let mut mc = MacroController::new(1);
        mc.handle_record_key();
        mc.handle_record_key();
        assert_eq!(mc.state(), MacroState::Recording);
        // Baseline tick.
        mc.tick(&sample(0, mem), &ctx, mem);
        (mc, ctx)
    }

    #[test]
    fn record_key_cycles_states() {
        let mut mc = MacroController::new(1);
        assert_eq!(mc.state(), MacroState::Idle);
        mc.handle_record_key();
        assert_eq!(mc.state(), MacroState::PreRecord);
        mc.handle_record_key();
        assert_eq!(mc.state(), MacroState::Recording);
        mc.handle_record_key();
        assert_eq!(mc.state(), MacroState::Idle);
    }

    #[test]
    fn recording_captures_raw_ring_writes() {
        let mem = mem_with_char();
        let (mut mc, ctx) = recording_controller(&mem);

        // Engine wrote two entries since the baseline: index 0 -> 2.
        let base = char_base(&mem);
        mem.write_u8(base + layout::player::INPUT_RING + 1, 0x08).unwrap();
        mem.write_u8(base + layout::player::INPUT_RING + 2, 0x18).unwrap();
        mem.write_u16(base + layout::player::INPUT_RING_INDEX, 2).unwrap();
        mem.write_u8(base + layout::player::INPUT_IMMEDIATE, 0x08).unwrap();

        mc.tick(&sample(3, &mem), &ctx, &mem);

        let slot = mc.slot(0).unwrap();
        assert_eq!(slot.tick_count(), 1);
        // Direction from the freshest write, buttons unioned.
        assert_eq!(slot.mask_stream[0], 0x18);
        assert_eq!(slot.buf_counts[0], 2);
        assert_eq!(slot.buf_stream, vec![0x08, 0x18]);
        assert!(slot.invariants_hold());
    }

    #[test]
    fn quiet_tick_synthesizes_one_write() {
        let mem = mem_with_char();
        let (mut mc, ctx) = recording_controller(&mem);

        let base = char_base(&mem);
        mem.write_u8(base + layout::player::INPUT_IMMEDIATE, 0x04).unwrap();
        mc.tick(&sample(3, &mem), &ctx, &mem);

        let slot = mc.slot(0).unwrap();
        assert_eq!(slot.tick_count(), 1);
        assert_eq!(slot.mask_stream[0], 0x04);
        assert_eq!(slot.buf_counts[0], 1);
        assert_eq!(slot.buf_stream, vec![0x04]);
    }

    #[test]
    fn paused_recording_waits_for_engine_progress() {
        let mem = mem_with_char();
        let (mut mc, ctx) = recording_controller(&mem);

        let mut s = sample(3, &mem);
        s.paused = true;
        // Paused, no ring or step movement: nothing recorded even on the
        // 64 Hz cadence.
        mc.tick(&s, &ctx, &mem);
        assert_eq!(mc.slot(0).unwrap().tick_count(), 0);

        // Frame-step: the step counter moves, one tick is captured.
        mem.write_u32(
            mem.base_address() + layout::game::FRAME_STEP_COUNTER,
            1,
        )
        .unwrap();
        let mut s = sample(4, &mem);
        s.paused = true;
        mc.tick(&s, &ctx, &mem);
        assert_eq!(mc.slot(0).unwrap().tick_count(), 1);
    }

    #[test]
    fn off_cadence_unpaused_ticks_are_skipped() {
        let mem = mem_with_char();
        let (mut mc, ctx) = recording_controller(&mem);
        mc.tick(&sample(4, &mem), &ctx, &mem);
        mc.tick(&sample(5, &mem), &ctx, &mem);
        assert_eq!(mc.slot(0).unwrap().tick_count(), 0);
        mc.tick(&sample(6, &mem), &ctx, &mem);
        assert_eq!(mc.slot(0).unwrap().tick_count(), 1);
    }

    fn loaded_controller(ticks: &[(u8, Vec<u8>)], facing: bool) -> MacroController {
        let mut mc = MacroController::new(1);
        let slot = mc.slot_mut(0).unwrap();
        for (mask, writes) in ticks {
            slot.push_tick(*mask, facing, writes);
        }
        mc
    }

    #[test]
    fn replay_drives_poll_override_for_three_subticks() {
        let mem = mem_with_char();
        let ctx = Arc::new(SharedContext::new());
        // Recorded facing left; replayed side also faces left: no mirror.
        let mut mc = loaded_controller(&[(0x18, vec![0x18])], false);
        assert!(mc.start_replay(0));

        for tick in 0..3u64 {
            mc.tick(&sample(tick, &mem), &ctx, &mem);
            assert_eq!(ctx.poll_override[1].get(), Some(0x18), "sub-tick {tick}");
        }
        // Stream exhausted: neutral tick begins.
        mc.tick(&sample(3, &mem), &ctx, &mem);
        assert_eq!(ctx.poll_override[1].get(), Some(0));
    }

    #[test]
    fn replay_mirrors_mask_and_raw_writes_on_facing_change() {
        let mem = mem_with_char();
        let ctx = Arc::new(SharedContext::new());
        // Recorded facing right (0x08 = right); side now faces left.
        let mut mc = loaded_controller(&[(0x18, vec![0x08])], true);
        assert!(mc.start_replay(0));

        mc.tick(&sample(0, &mem), &ctx, &mem);
        // RIGHT|A mirrored to LEFT|A.
        assert_eq!(ctx.poll_override[1].get(), Some(0x14));

        // The single raw write landed mirrored in the ring.
        let base = char_base(&mem);
        let idx = mem.read_u16(base + layout::player::INPUT_RING_INDEX).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(
            mem.read_u8(base + layout::player::INPUT_RING + 1).unwrap(),
            0x04
        );
    }

    #[test]
    fn raw_writes_are_ceiling_distributed_across_subticks() {
        let mem = mem_with_char();
        let ctx = Arc::new(SharedContext::new());
        // 4 raw writes in one tick: ceil(4/3) = 2 per sub-tick -> 2,2,0.
        let mut mc = loaded_controller(&[(0x08, vec![1, 2, 3, 4])], false);
        assert!(mc.start_replay(0));

        let base = char_base(&mem);
        let ring_index = |mem: &MockMemory| {
            mem.read_u16(base + layout::player::INPUT_RING_INDEX).unwrap()
        };

        mc.tick(&sample(0, &mem), &ctx, &mem);
        assert_eq!(ring_index(&mem), 2);
        mc.tick(&sample(1, &mem), &ctx, &mem);
        assert_eq!(ring_index(&mem), 4);
        mc.tick(&sample(2, &mem), &ctx, &mem);
        assert_eq!(ring_index(&mem), 4);
    }

    #[test]
    fn winddown_holds_neutral_then_exits_on_commitment() {
        let mem = mem_with_char();
        let ctx = Arc::new(SharedContext::new());
        let mut mc = loaded_controller(&[(0x08, vec![0x08])], false);
        assert!(mc.start_replay(0));

        // Play the single tick (3 sub-ticks), then exhaust.
        for tick in 0..4u64 {
            mc.tick(&sample(tick, &mem), &ctx, &mem);
        }
        // Neutral logical tick completes, guard window holds neutral.
        for tick in 4..8u64 {
            mc.tick(&sample(tick, &mem), &ctx, &mem);
            assert_eq!(ctx.poll_override[1].get(), Some(0));
            assert_eq!(mc.state(), MacroState::Replaying);
        }

        // Side enters a dash start: replay ends and releases the override.
        let mut s = sample(8, &mem);
        s.move_id = [0, state::MOVE_DASH_START];
        mc.tick(&s, &ctx, &mem);
        assert_eq!(mc.state(), MacroState::Idle);
        assert_eq!(ctx.poll_override[1].get(), None);
    }

    #[test]
    fn winddown_gives_up_at_the_frame_budget() {
        let mem = mem_with_char();
        let ctx = Arc::new(SharedContext::new());
        let mut mc = loaded_controller(&[(0x08, vec![0x08])], false);
        assert!(mc.start_replay(0));

        let mut tick = 0u64;
        while mc.state() == MacroState::Replaying && tick < 200 {
            mc.tick(&sample(tick, &mem), &ctx, &mem);
            tick += 1;
        }
        assert_eq!(mc.state(), MacroState::Idle);
        assert!(tick < 200, "guard window must be bounded");
        assert_eq!(ctx.poll_override[1].get(), None);
    }

    #[test]
    fn empty_slot_does_not_replay() {
        let mut mc = MacroController::new(1);
        assert!(!mc.start_replay(0));
        assert_eq!(mc.state(), MacroState::Idle);
    }
}
