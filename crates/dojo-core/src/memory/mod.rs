pub mod layout;

mod access;
mod mock;
#[cfg(target_os = "windows")]
mod process;

pub use access::GameMemory;
pub use mock::{MockMemory, MockMemoryBuilder};
#[cfg(target_os = "windows")]
pub use process::{ProcessHandle, ProcessMemory, find_game_process};
