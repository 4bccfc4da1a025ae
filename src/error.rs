use std::io;
use thiserror::Error;

/// everything that can go wrong outside of instruction execution; execution
/// anomalies (stack wrap, unknown opcodes) are not errors
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("program is {size} bytes but only {capacity} bytes are available")]
    ProgramTooLarge { size: usize, capacity: usize },

    #[error("program file reports {expected} bytes but {read} were read")]
    ProgramSizeMismatch { expected: u64, read: usize },

    #[error("state file must be exactly {expected} bytes, found {found}")]
    StateSize { expected: usize, found: usize },

    #[error("write of {len} bytes at {addr:#05x} falls outside memory")]
    MemoryRange { addr: u16, len: usize },

    #[error("display failed to initialise: {0}")]
    DisplayInit(String),

    #[error("sound failed to initialise: {0}")]
    SoundInit(String),

    #[error("sound error: {0}")]
    Sound(String),

    #[error("bad configuration: {0}")]
    Config(String),
}
