//! Core of the dojo practice trainer: a frame-synchronized monitor over a
//! fighting game's live memory, reactive practice tooling (frame
//! advantage, auto-actions, auto-airtech, dummy auto-block), and an
//! input-injection pipeline with macro record/replay.
//!
//! Everything platform-specific sits behind the [`memory::GameMemory`]
//! trait; the rest of the crate is testable against [`memory::MockMemory`].

pub mod advantage;
pub mod auto;
pub mod context;
pub mod error;
pub mod input;
pub mod macros;
pub mod memory;
pub mod monitor;
pub mod sample;
pub mod settings;
pub mod snapshot;
pub mod state;

pub use advantage::{FrameAdvantage, format_advantage};
pub use auto::{AutoActionEngine, AutoAirtech, AutoBlockMachine, AutoJump};
pub use context::{AdvantageView, MacroCommand, SharedContext};
pub use error::{Error, Result};
pub use input::{ImmediateInputWriter, InputHook, InputMask};
pub use macros::{MacroController, MacroSlot, MacroState, SlotStats, export_slot, import_slot};
pub use memory::{GameMemory, MockMemory, MockMemoryBuilder};
pub use monitor::{FixedRateScheduler, FrameMonitor, MONITOR_PERIOD};
pub use sample::PerFrameSample;
pub use settings::Settings;
pub use snapshot::{FrameSnapshot, SnapshotCell};
pub use state::{GameMode, GamePhase};
