//! Shared runtime context.
//!
//! Every value that genuinely crosses a thread boundary lives here as an
//! atomic scalar (or the seqlock snapshot cell); each subsystem receives
//! the context as an explicit constructor/tick argument. There are no
//! hidden globals in the core.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU8, AtomicU32, AtomicU64, Ordering};

use crate::input::StepQueue;
use crate::snapshot::SnapshotCell;

pub const SIDES: usize = 2;

/// Desired immediate-input mode for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateMode {
    Off,
    Hold,
    Press,
}

impl ImmediateMode {
    fn from_raw(v: u8) -> Self {
        match v {
            1 => Self::Hold,
            2 => Self::Press,
            _ => Self::Off,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Hold => 1,
            Self::Press => 2,
        }
    }
}

/// Cross-thread desired-input slot for one player.
///
/// Subsystems request holds/presses through [`SharedContext`]; the
/// immediate-input writer thread turns the request into a per-visual-frame
/// effective mask (`current`) with proper press edges; the input hook
/// reads `current` only.
#[derive(Debug, Default)]
pub struct ImmediateSlot {
    mode: AtomicU8,
    mask: AtomicU8,
    ticks: AtomicU32,
    /// Set when the next assert must be preceded by one neutral frame.
    edge_pending: AtomicBool,
    current: AtomicU8,
}

impl ImmediateSlot {
    pub fn mode(&self) -> ImmediateMode {
        ImmediateMode::from_raw(self.mode.load(Ordering::Acquire))
    }

    pub fn desired_mask(&self) -> u8 {
        self.mask.load(Ordering::Acquire)
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn take_edge_pending(&self) -> bool {
        self.edge_pending.swap(false, Ordering::AcqRel)
    }

    pub fn set_ticks(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::Release);
    }

    pub fn deactivate(&self) {
        self.mode.store(ImmediateMode::Off.raw(), Ordering::Release);
        self.mask.store(0, Ordering::Release);
        self.ticks.store(0, Ordering::Release);
        self.edge_pending.store(false, Ordering::Release);
        self.current.store(0, Ordering::Release);
    }

    /// Effective mask for this visual frame (writer thread output).
    pub fn current(&self) -> u8 {
        self.current.load(Ordering::Acquire)
    }

    pub fn set_current(&self, mask: u8) {
        self.current.store(mask, Ordering::Release);
    }

    fn request(&self, mode: ImmediateMode, mask: u8, ticks: u32) {
        let prev_mode = ImmediateMode::from_raw(self.mode.load(Ordering::Acquire));
        // The game only registers a press on a 0->1 transition. Whether the
        // mask changed or the same nonzero mask is being re-asserted, a live
        // previous assert means a neutral frame must be wedged in first.
        if mask != 0 && prev_mode != ImmediateMode::Off {
            self.edge_pending.store(true, Ordering::Release);
        }
        self.mask.store(mask, Ordering::Release);
        self.ticks.store(ticks, Ordering::Release);
        self.mode.store(mode.raw(), Ordering::Release);
    }
}

/// Poll-level override used by macro replay.
#[derive(Debug, Default)]
pub struct PollOverride {
    active: AtomicBool,
    mask: AtomicU8,
}

impl PollOverride {
    pub fn set(&self, mask: u8) {
        self.mask.store(mask, Ordering::Release);
        self.active.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
        self.mask.store(0, Ordering::Release);
    }

    pub fn get(&self) -> Option<u8> {
        if self.active.load(Ordering::Acquire) {
            Some(self.mask.load(Ordering::Acquire))
        } else {
            None
        }
    }
}

/// Master feature switches, togglable from the GUI thread.
#[derive(Debug, Default)]
pub struct FeatureFlags {
    pub auto_action: AtomicBool,
    pub auto_airtech: AtomicBool,
    pub auto_jump: AtomicBool,
    pub auto_block: AtomicBool,
    pub adaptive_stance: AtomicBool,
    pub frame_advantage: AtomicBool,
}

/// Published frame-advantage display values.
#[derive(Debug, Default)]
pub struct AdvantageShared {
    valid: AtomicBool,
    /// Internal frames; positive favors the attacker.
    value: AtomicI32,
    until_ms: AtomicI64,
    gap_valid: AtomicBool,
    gap: AtomicI32,
    gap_until_ms: AtomicI64,
}

/// Value copy of the advantage display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvantageView {
    pub value_internal: Option<i32>,
    pub gap_internal: Option<i32>,
}

impl AdvantageShared {
    pub fn publish_value(&self, internal: i32, until_ms: i64) {
        self.value.store(internal, Ordering::Release);
        self.until_ms.store(until_ms, Ordering::Release);
        self.valid.store(true, Ordering::Release);
    }

    pub fn publish_gap(&self, internal: i32, until_ms: i64) {
        self.gap.store(internal, Ordering::Release);
        self.gap_until_ms.store(until_ms, Ordering::Release);
        self.gap_valid.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.valid.store(false, Ordering::Release);
        self.gap_valid.store(false, Ordering::Release);
    }

    /// Current view at wall-clock `now_ms`, expiring stale values.
    pub fn view(&self, now_ms: i64) -> AdvantageView {
        let value_internal = (self.valid.load(Ordering::Acquire)
            && now_ms <= self.until_ms.load(Ordering::Acquire))
        .then(|| self.value.load(Ordering::Acquire));
        let gap_internal = (self.gap_valid.load(Ordering::Acquire)
            && now_ms <= self.gap_until_ms.load(Ordering::Acquire))
        .then(|| self.gap.load(Ordering::Acquire));
        AdvantageView {
            value_internal,
            gap_internal,
        }
    }
}

/// Cross-thread macro commands and published controller state.
///
/// The controller itself is owned by the monitor thread; other threads
/// request transitions here and the monitor applies them on its next tick.
#[derive(Debug, Default)]
pub struct MacroControl {
    command: AtomicU8,
    slot: AtomicU8,
    state: AtomicU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroCommand {
    /// The record hotkey: advances Idle -> PreRecord -> Recording -> Idle.
    RecordKey,
    Play,
    Stop,
}

impl MacroControl {
    pub fn request(&self, command: MacroCommand, slot: usize) {
        self.slot.store(slot as u8, Ordering::Release);
        let raw = match command {
            MacroCommand::RecordKey => 1,
            MacroCommand::Play => 2,
            MacroCommand::Stop => 3,
        };
        self.command.store(raw, Ordering::Release);
    }

    /// Consume the pending command, if any. Monitor thread only.
    pub fn take(&self) -> Option<(MacroCommand, usize)> {
        let raw = self.command.swap(0, Ordering::AcqRel);
        let command = match raw {
            1 => MacroCommand::RecordKey,
            2 => MacroCommand::Play,
            3 => MacroCommand::Stop,
            _ => return None,
        };
        Some((command, self.slot.load(Ordering::Acquire) as usize))
    }

    pub fn publish_state(&self, raw: u8) {
        self.state.store(raw, Ordering::Release);
    }

    pub fn state_raw(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }
}

/// The explicit, injectable shared state of the trainer.
#[derive(Default)]
pub struct SharedContext {
    /// Canonical internal-frame counter, owned by the monitor thread.
    pub tick: AtomicU64,
    /// Latched once netplay is detected; never cleared.
    pub online: AtomicBool,
    /// Cooperative shutdown request for the worker threads.
    pub shutdown: AtomicBool,
    pub monitor_running: AtomicBool,
    pub features: FeatureFlags,
    pub buffer_freeze: [AtomicBool; SIDES],
    pub force_bypass: [AtomicBool; SIDES],
    pub poll_override: [PollOverride; SIDES],
    pub immediate: [ImmediateSlot; SIDES],
    pub queues: [StepQueue; SIDES],
    pub advantage: AdvantageShared,
    pub macro_control: MacroControl,
    pub snapshot: SnapshotCell,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Hold `mask` on `side` until cleared.
    pub fn set_hold(&self, side: usize, mask: u8) {
        self.immediate[side].request(ImmediateMode::Hold, mask, 0);
    }

    pub fn clear_hold(&self, side: usize) {
        self.immediate[side].deactivate();
    }

    /// Press `mask` on `side` for `frames` visual frames, then release.
    pub fn press(&self, side: usize, mask: u8, frames: u32) {
        self.immediate[side].request(ImmediateMode::Press, mask, frames.max(1));
    }

    /// Reset all injection state for both sides. Used on phase exits and
    /// by the online hard stop.
    pub fn clear_all_injection(&self) {
        for side in 0..SIDES {
            self.immediate[side].deactivate();
            self.poll_override[side].clear();
            self.queues[side].clear();
            self.buffer_freeze[side].store(false, Ordering::Release);
            self.force_bypass[side].store(false, Ordering::Release);
        }
        self.advantage.clear();
    }
}
