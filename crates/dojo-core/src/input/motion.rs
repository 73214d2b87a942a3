//! Resolving symbolic trigger actions into concrete input sequences.
//!
//! Sequences are authored facing right; [`resolve_action`] mirrors them
//! for a left-facing character so motion intent is preserved.

use crate::input::InputMask;
use crate::settings::{ActionKind, Strength};

/// One element of a motion: a mask held for a number of visual frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStep {
    pub mask: InputMask,
    pub frames: u32,
}

impl MotionStep {
    fn new(mask: InputMask, frames: u32) -> Self {
        Self { mask, frames }
    }
}

/// How a resolved action is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    /// Step sequence to inject frame by frame. `dash` marks motions whose
    /// ring-buffer history must be written as one batch up front.
    Sequence { steps: Vec<MotionStep>, dash: bool },
    /// Write this move-ID into the character struct directly.
    DirectMoveId(u16),
}

impl ActionPlan {
    /// Total visual frames the sequence occupies; zero for direct writes.
    pub fn total_frames(&self) -> u32 {
        match self {
            ActionPlan::Sequence { steps, .. } => steps.iter().map(|s| s.frames).sum(),
            ActionPlan::DirectMoveId(_) => 0,
        }
    }
}

fn dir(digit: u8) -> InputMask {
    InputMask::from_direction_digit(digit).unwrap_or(InputMask::NEUTRAL)
}

/// Resolve an action into the steps for the given facing.
pub fn resolve_action(
    kind: ActionKind,
    strength: Strength,
    facing_right: bool,
    custom_move_id: u16,
) -> ActionPlan {
    let button = strength.button_bit();

    let plan = match kind {
        ActionKind::Jump => ActionPlan::Sequence {
            steps: vec![MotionStep::new(dir(8), 2)],
            dash: false,
        },
        ActionKind::ForwardDash => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(6), 2),
                MotionStep::new(dir(5), 1),
                MotionStep::new(dir(6), 2),
            ],
            dash: true,
        },
        ActionKind::Backdash => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(4), 2),
                MotionStep::new(dir(5), 1),
                MotionStep::new(dir(4), 2),
            ],
            dash: true,
        },
        ActionKind::StandingNormal => ActionPlan::Sequence {
            steps: vec![MotionStep::new(dir(5).with_buttons(button), 2)],
            dash: false,
        },
        ActionKind::CrouchingNormal => ActionPlan::Sequence {
            steps: vec![MotionStep::new(dir(2).with_buttons(button), 2)],
            dash: false,
        },
        ActionKind::QuarterCircleForward => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(2), 2),
                MotionStep::new(dir(3), 2),
                MotionStep::new(dir(6).with_buttons(button), 2),
            ],
            dash: false,
        },
        ActionKind::QuarterCircleBack => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(2), 2),
                MotionStep::new(dir(1), 2),
                MotionStep::new(dir(4).with_buttons(button), 2),
            ],
            dash: false,
        },
        ActionKind::DragonPunch => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(6), 2),
                MotionStep::new(dir(2), 2),
                MotionStep::new(dir(3).with_buttons(button), 2),
            ],
            dash: false,
        },
        ActionKind::Super => ActionPlan::Sequence {
            steps: vec![
                MotionStep::new(dir(2), 2),
                MotionStep::new(dir(3), 2),
                MotionStep::new(dir(6), 2),
                MotionStep::new(dir(2), 2),
                MotionStep::new(dir(3), 2),
                MotionStep::new(dir(6).with_buttons(button), 2),
            ],
            dash: false,
        },
        ActionKind::CustomMoveId => return ActionPlan::DirectMoveId(custom_move_id),
    };

    if facing_right {
        plan
    } else {
        mirror_plan(plan)
    }
}

fn mirror_plan(plan: ActionPlan) -> ActionPlan {
    match plan {
        ActionPlan::Sequence { steps, dash } => ActionPlan::Sequence {
            steps: steps
                .into_iter()
                .map(|s| MotionStep::new(s.mask.mirror(), s.frames))
                .collect(),
            dash,
        },
        direct => direct,
    }
}
