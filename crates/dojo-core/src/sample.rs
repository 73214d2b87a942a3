//! The per-tick memory sample shared by every reactive subsystem.

use crate::state::{self, GameMode, GamePhase};

/// Everything the reactive subsystems need from one monitor tick, read
/// from game memory exactly once.
///
/// Owned by the monitor thread; handed to subsystems by shared reference
/// and never retained across ticks except through the explicit `prev_*`
/// fields.
#[derive(Debug, Clone, Copy)]
pub struct PerFrameSample {
    /// Monotonic internal-frame counter (192 Hz).
    pub tick: u64,
    /// Wall-clock milliseconds at sampling time.
    pub wall_ms: i64,
    pub phase: GamePhase,
    pub mode: GameMode,
    pub move_id: [u16; 2],
    pub prev_move_id: [u16; 2],
    pub actionable: [bool; 2],
    pub neutral: [bool; 2],
    /// True while facing right.
    pub facing_right: [bool; 2],
    /// Character struct pointers, zero when unresolved this tick.
    pub char_base: [u32; 2],
    /// Superflash / global freeze active this tick.
    pub global_freeze: bool,
    pub paused: bool,
    pub online: bool,
}

impl PerFrameSample {
    pub fn empty() -> Self {
        Self {
            tick: 0,
            wall_ms: 0,
            phase: GamePhase::Unknown,
            mode: GameMode::Unknown,
            move_id: [0; 2],
            prev_move_id: [0; 2],
            actionable: [true; 2],
            neutral: [true; 2],
            facing_right: [true, false],
            char_base: [0; 2],
            global_freeze: false,
            paused: false,
            online: false,
        }
    }

    pub fn move_changed(&self, side: usize) -> bool {
        self.move_id[side] != self.prev_move_id[side]
    }

    pub fn any_move_changed(&self) -> bool {
        self.move_changed(0) || self.move_changed(1)
    }

    /// Edge: the side just became actionable this tick.
    pub fn became_actionable(&self, side: usize) -> bool {
        self.actionable[side] && !state::is_actionable(self.prev_move_id[side])
    }

    /// Edge: the side just lost actionability this tick.
    pub fn became_locked(&self, side: usize) -> bool {
        !self.actionable[side] && state::is_actionable(self.prev_move_id[side])
    }

    /// Edge: the side just entered a state matched by `pred`.
    pub fn entered(&self, side: usize, pred: fn(u16) -> bool) -> bool {
        pred(self.move_id[side]) && !pred(self.prev_move_id[side])
    }

    /// Edge: the side just left a state matched by `pred`.
    pub fn left(&self, side: usize, pred: fn(u16) -> bool) -> bool {
        !pred(self.move_id[side]) && pred(self.prev_move_id[side])
    }
}
