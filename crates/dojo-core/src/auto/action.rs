//! Auto-action triggers.
//!
//! Four independently configured triggers watch for game-state edges on
//! the target side and schedule a configured action, optionally after a
//! delay counted in visual frames. A delayed action only fires while the
//! side is actionable; otherwise the countdown holds at zero until it can
//! fire cleanly.

use std::sync::atomic::Ordering;

use strum::Display;
use tracing::debug;

use crate::context::SharedContext;
use crate::input::{ActionPlan, QueuedStep, push_ring_entry, resolve_action};
use crate::memory::{GameMemory, layout};
use crate::sample::PerFrameSample;
use crate::settings::{Settings, TriggerSettings};
use crate::state;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TriggerKind {
    AfterBlock,
    OnWakeup,
    AfterHitstun,
    AfterAirtech,
}

/// A scheduled, not-yet-applied action for one side.
#[derive(Debug, Default)]
struct TriggerDelayState {
    delaying: bool,
    frames_remaining: u32,
    trigger: Option<TriggerKind>,
    pending: Option<TriggerSettings>,
}

impl TriggerDelayState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Read-only view of trigger activity for collaborators that must not
/// reach into this engine's internals.
pub trait AutoActionActivity {
    fn is_active_for(&self, side: usize) -> bool;
}

pub struct AutoActionEngine {
    delay: [TriggerDelayState; 2],
}

impl AutoActionEngine {
    pub fn new() -> Self {
        Self {
            delay: Default::default(),
        }
    }

    pub fn reset(&mut self) {
        for d in &mut self.delay {
            d.reset();
        }
    }

    /// Any trigger currently counting down or waiting to fire.
    pub fn has_pending(&self) -> bool {
        self.delay.iter().any(|d| d.delaying)
    }

    pub fn tick(
        &mut self,
        sample: &PerFrameSample,
        settings: &Settings,
        ctx: &SharedContext,
        mem: &dyn GameMemory,
    ) {
        if !ctx.features.auto_action.load(Ordering::Acquire) {
            self.reset();
            return;
        }

        for side in 0..2 {
            if !settings.trigger_side.applies_to(side) {
                continue;
            }
            self.detect_edges(side, sample, settings);
            self.advance_delay(side, sample, ctx, mem);
        }
    }

    fn detect_edges(&mut self, side: usize, sample: &PerFrameSample, settings: &Settings) {
        // A pending delay is never preempted by a newer edge.
        if self.delay[side].delaying {
            return;
        }

        let edge = if sample.left(side, state::is_blockstun) {
            Some((TriggerKind::AfterBlock, settings.after_block))
        } else if sample.left(side, state::is_groundtech) {
            Some((TriggerKind::OnWakeup, settings.on_wakeup))
        } else if sample.left(side, state::is_hitstun) && !state::is_stun(sample.move_id[side]) {
            Some((TriggerKind::AfterHitstun, settings.after_hitstun))
        } else if sample.left(side, state::is_airtech) {
            Some((TriggerKind::AfterAirtech, settings.after_airtech))
        } else {
            None
        };

        let Some((kind, config)) = edge else {
            return;
        };
        if !config.enabled {
            return;
        }

        debug!(side, trigger = %kind, delay = config.delay_frames, "trigger armed");
        self.delay[side] = TriggerDelayState {
            delaying: true,
            frames_remaining: config.delay_frames,
            trigger: Some(kind),
            pending: Some(config),
        };
    }

    fn advance_delay(
        &mut self,
        side: usize,
        sample: &PerFrameSample,
        ctx: &SharedContext,
        mem: &dyn GameMemory,
    ) {
        let d = &mut self.delay[side];
        if !d.delaying {
            return;
        }

        // Delays are expressed in visual frames; one visual frame is three
        // internal ticks.
        if !sample.tick.is_multiple_of(3) {
            return;
        }

        if d.frames_remaining > 0 {
            d.frames_remaining -= 1;
            return;
        }

        // Countdown done: fire only into an actionable state, otherwise
        // hold here until the side frees up.
        if !sample.actionable[side] {
            return;
        }

        let Some(config) = d.pending else {
            d.reset();
            return;
        };
        let kind = d.trigger;
        d.reset();

        debug!(side, trigger = ?kind, action = %config.action, "trigger firing");
        apply_action(side, &config, sample, ctx, mem);
    }
}

impl Default for AutoActionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoActionActivity for AutoActionEngine {
    fn is_active_for(&self, side: usize) -> bool {
        self.delay[side].delaying
    }
}

/// Carry out a resolved trigger action for `side`.
fn apply_action(
    side: usize,
    config: &TriggerSettings,
    sample: &PerFrameSample,
    ctx: &SharedContext,
    mem: &dyn GameMemory,
) {
    let plan = resolve_action(
        config.action,
        config.strength,
        sample.facing_right[side],
        config.custom_move_id,
    );

    match plan {
        ActionPlan::DirectMoveId(id) => {
            let base = sample.char_base[side];
            if base != 0 {
                let _ = mem.write_u16(base + layout::player::MOVE_ID, id);
            }
        }
        ActionPlan::Sequence { steps, .. } if steps.len() == 1 => {
            // Simple presses go through the immediate-input writer, which
            // owns hold/press edge semantics.
            let step = steps[0];
            ctx.press(side, step.mask.bits(), step.frames);
        }
        ActionPlan::Sequence { steps, dash } => {
            if dash {
                // Dash history must land as one batch; frame-by-frame ring
                // writes are too slow and pick up the engine's own neutral
                // frames mid-motion.
                for step in &steps {
                    for _ in 0..step.frames {
                        push_ring_entry(mem, side, step.mask.bits());
                    }
                }
            }
            for step in &steps {
                for _ in 0..step.frames {
                    ctx.queues[side].push(QueuedStep {
                        mask: step.mask.bits(),
                        write_ring: !dash,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputMask;
    use crate::memory::{MockMemory, MockMemoryBuilder};
    use crate::settings::{ActionKind, Strength, TargetSide};
    use crate::state::GamePhase;
    use std::sync::Arc;

    fn setup() -> (AutoActionEngine, Settings, Arc<SharedContext>, MockMemory) {
        let engine = AutoActionEngine::new();
        let settings = Settings {
            trigger_side: TargetSide::P2,
            ..Settings::default()
        };
        let ctx = Arc::new(SharedContext::new());
        ctx.features.auto_action.store(true, Ordering::Release);
        let mem = MockMemoryBuilder::new().with_size(0x1000).build();
        (engine, settings, ctx, mem)
    }

    fn sample_leaving_blockstun(tick: u64) -> PerFrameSample {
        let mut s = PerFrameSample::empty();
        s.tick = tick;
        s.phase = GamePhase::Match;
        s.prev_move_id = [0, 150];
        s.move_id = [0, 0];
        s.actionable = [true, true];
        s
    }

    #[test]
    fn zero_delay_trigger_fires_immediately() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_block = TriggerSettings {
            enabled: true,
            action: ActionKind::StandingNormal,
            strength: Strength::A,
            custom_move_id: 0,
            delay_frames: 0,
        };

        // Edge on a visual-frame boundary with the side actionable: the
        // action applies within the same tick.
        engine.tick(&sample_leaving_blockstun(3), &settings, &ctx, &mem);
        assert!(!engine.is_active_for(1));
        assert_eq!(ctx.immediate[1].desired_mask(), InputMask::A);
    }

    #[test]
    fn delay_counts_visual_frames() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_block = TriggerSettings {
            enabled: true,
            action: ActionKind::StandingNormal,
            strength: Strength::B,
            custom_move_id: 0,
            delay_frames: 2,
        };

        // Edge tick burns the first visual-frame boundary (2 -> 1).
        engine.tick(&sample_leaving_blockstun(3), &settings, &ctx, &mem);
        assert!(engine.has_pending());

        let mut s = sample_leaving_blockstun(0);
        s.prev_move_id = [0, 0];

        // Second boundary: 1 -> 0, still pending.
        s.tick = 6;
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(engine.has_pending());

        // Intermediate internal ticks do not count.
        s.tick = 7;
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(engine.has_pending());

        // Third boundary fires.
        s.tick = 9;
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(!engine.has_pending());
        assert_eq!(ctx.immediate[1].desired_mask(), InputMask::B);
    }

    #[test]
    fn fire_holds_until_actionable() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_hitstun = TriggerSettings {
            enabled: true,
            action: ActionKind::Jump,
            strength: Strength::A,
            custom_move_id: 0,
            delay_frames: 0,
        };

        let mut s = PerFrameSample::empty();
        s.phase = GamePhase::Match;
        s.tick = 3;
        s.prev_move_id = [0, 55];
        s.move_id = [0, 40]; // airborne recovery: out of hitstun, not actionable
        s.actionable = [true, false];
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(engine.is_active_for(1));

        // Still locked: held.
        s.tick = 6;
        s.prev_move_id = [0, 40];
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(engine.is_active_for(1));
        assert_eq!(ctx.immediate[1].desired_mask(), 0);

        // Free now: fires.
        s.tick = 9;
        s.move_id = [0, 0];
        s.actionable = [true, true];
        engine.tick(&s, &settings, &ctx, &mem);
        assert!(!engine.is_active_for(1));
        assert_eq!(ctx.immediate[1].desired_mask(), InputMask::UP);
    }

    #[test]
    fn pending_delay_is_not_preempted() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_block = TriggerSettings {
            enabled: true,
            action: ActionKind::StandingNormal,
            strength: Strength::A,
            custom_move_id: 0,
            delay_frames: 30,
        };
        settings.after_hitstun = settings.after_block;

        engine.tick(&sample_leaving_blockstun(3), &settings, &ctx, &mem);
        assert_eq!(engine.delay[1].trigger, Some(TriggerKind::AfterBlock));

        // A hitstun-exit edge while delaying must not replace the trigger.
        let mut s = PerFrameSample::empty();
        s.phase = GamePhase::Match;
        s.tick = 6;
        s.prev_move_id = [0, 55];
        s.move_id = [0, 0];
        engine.tick(&s, &settings, &ctx, &mem);
        assert_eq!(engine.delay[1].trigger, Some(TriggerKind::AfterBlock));
    }

    #[test]
    fn motion_actions_enqueue_steps() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_block = TriggerSettings {
            enabled: true,
            action: ActionKind::QuarterCircleForward,
            strength: Strength::C,
            custom_move_id: 0,
            delay_frames: 0,
        };

        engine.tick(&sample_leaving_blockstun(3), &settings, &ctx, &mem);

        // QCF: 3 steps x 2 frames, buffered history per frame.
        assert_eq!(ctx.queues[1].len(), 6);
        let first = ctx.queues[1].pop().unwrap();
        assert!(first.write_ring);
        assert_eq!(first.mask, InputMask::DOWN);
    }

    #[test]
    fn custom_move_id_writes_directly() {
        let (mut engine, mut settings, ctx, _mem) = setup();
        settings.after_block = TriggerSettings {
            enabled: true,
            action: ActionKind::CustomMoveId,
            strength: Strength::A,
            custom_move_id: 412,
            delay_frames: 0,
        };

        const CHAR1: u32 = 0x200;
        let mem = MockMemoryBuilder::new().with_size(0x1000).build();
        let mut s = sample_leaving_blockstun(3);
        s.char_base[1] = mem.base_address() + CHAR1;

        engine.tick(&s, &settings, &ctx, &mem);
        let addr = mem.base_address() + CHAR1 + layout::player::MOVE_ID;
        assert_eq!(mem.read_u16(addr).unwrap(), 412);
    }

    #[test]
    fn disabled_feature_clears_pending() {
        let (mut engine, mut settings, ctx, mem) = setup();
        settings.after_block.enabled = true;
        settings.after_block.delay_frames = 30;
        engine.tick(&sample_leaving_blockstun(3), &settings, &ctx, &mem);
        assert!(engine.has_pending());

        ctx.features.auto_action.store(false, Ordering::Release);
        engine.tick(&sample_leaving_blockstun(6), &settings, &ctx, &mem);
        assert!(!engine.has_pending());
    }
}
