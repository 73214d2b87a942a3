mod move_id;
mod phase;

pub use move_id::*;
pub use phase::{GameMode, GamePhase, PhaseDetector, PhaseTransition};
