//! Screen-phase and mode decoding with transition debouncing.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decoded screen-state byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Unknown,
    Title,
    CharacterSelect,
    Loading,
    Match,
    Results,
}

impl GamePhase {
    pub fn from_raw(value: u8) -> Self {
        match value {
            3 => Self::Title,
            5 => Self::CharacterSelect,
            6 => Self::Loading,
            13 => Self::Match,
            16 => Self::Results,
            _ => Self::Unknown,
        }
    }
}

/// Decoded game-mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Unknown,
    Arcade,
    Practice,
    VsHuman,
    VsCpu,
    Replay,
    Netplay,
}

impl GameMode {
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::Arcade,
            1 => Self::VsCpu,
            2 => Self::VsHuman,
            3 => Self::Practice,
            4 => Self::Replay,
            5 => Self::Netplay,
            _ => Self::Unknown,
        }
    }
}

/// A committed phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: GamePhase,
    pub to: GamePhase,
}

/// Debounced phase tracking.
///
/// The engine's screen-state byte can flicker for a single frame during
/// scene swaps; a change is only committed after the same new value has
/// been observed for three consecutive ticks.
#[derive(Debug)]
pub struct PhaseDetector {
    committed: GamePhase,
    candidate: GamePhase,
    streak: u32,
}

/// Consecutive observations required before a phase change commits.
pub const PHASE_DEBOUNCE_TICKS: u32 = 3;

impl PhaseDetector {
    pub fn new() -> Self {
        Self {
            committed: GamePhase::Unknown,
            candidate: GamePhase::Unknown,
            streak: 0,
        }
    }

    pub fn current(&self) -> GamePhase {
        self.committed
    }

    /// Feed one raw observation; returns the transition if one commits.
    pub fn observe(&mut self, raw: u8) -> Option<PhaseTransition> {
        let phase = GamePhase::from_raw(raw);

        if phase == self.committed {
            self.candidate = phase;
            self.streak = 0;
            return None;
        }

        if phase == self.candidate {
            self.streak += 1;
        } else {
            self.candidate = phase;
            self.streak = 1;
        }

        if self.streak < PHASE_DEBOUNCE_TICKS {
            return None;
        }

        let transition = PhaseTransition {
            from: self.committed,
            to: phase,
        };
        debug!("phase change committed: {:?} -> {:?}", transition.from, transition.to);
        self.committed = phase;
        self.streak = 0;
        Some(transition)
    }

    pub fn reset(&mut self) {
        self.committed = GamePhase::Unknown;
        self.candidate = GamePhase::Unknown;
        self.streak = 0;
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}
