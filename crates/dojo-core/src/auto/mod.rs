mod action;
mod airtech;
mod block;
mod jump;

pub use action::{AutoActionActivity, AutoActionEngine, TriggerKind};
pub use airtech::AutoAirtech;
pub use block::AutoBlockMachine;
pub use jump::AutoJump;
