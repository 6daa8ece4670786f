//! # emu8-core
//! The processing unit of the Chip-8 virtual machine: memory, registers, stack and timers, and
//! the fetch-decode-execute cycle over its 35 instructions.
//!
//! Rendering, key mapping, audio and pacing belong to whatever drives a [`Chip8`]; it only exposes
//! the frame buffer, key states and timers those need.

pub use chip8::{Chip8, Step};
pub use config::{Config, Quirks};
pub use error::{Error, Result};
pub use instruction::Instruction;
pub use state::{FrameBuffer, State};

mod chip8;
pub mod config;
pub mod constants;
pub mod error;
pub mod instruction;
mod opcode;
mod operations;
pub mod state;
