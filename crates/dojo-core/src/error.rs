use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read game memory at {address:#010x}: {message}")]
    MemoryRead { address: u32, message: String },

    #[error("Failed to write game memory at {address:#010x}: {message}")]
    MemoryWrite { address: u32, message: String },

    #[error("Macro parse error: {0}")]
    MacroParse(String),

    #[error("Macro slot {0} out of range (8 slots)")]
    SlotOutOfRange(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
