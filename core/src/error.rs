use crate::constants::MAX_ROM_SIZE;

/// Ways the interpreter can fail.
///
/// Failures are returned from the step that discovered them and leave the machine state as it was
/// before that step; the driver decides whether to halt, report or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unimplemented instruction {opcode:#06X}")]
    UnimplementedInstruction { opcode: u16 },

    #[error("stack overflow: subroutine calls nested deeper than 16")]
    StackOverflow,

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("no such key {key:#04X}")]
    InvalidKey { key: u8 },
}

impl Error {
    pub(crate) fn rom_too_large(size: usize) -> Self {
        Error::RomTooLarge {
            size,
            max_size: MAX_ROM_SIZE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
