use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::constants::{KEY_COUNT, MAX_ROM_SIZE, PROGRAM_START};
use crate::error::{Error, Result};
use crate::instruction::{Context, Instruction};
use crate::operations::resume_key_wait;
use crate::state::{FrameBuffer, State};

/// What a single call to `Chip8::step` did
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran to completion, or started waiting for a key (Fx0A)
    Executed(Instruction),
    /// An earlier Fx0A is still waiting for a key to be pressed
    AwaitingKey { register: u8 },
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`, including the keys the driver reports as held
///  - the `config` selecting interpreter quirks
///  - the `rng` behind Cxnn
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the CPU one instruction at a time
/// - advancing its timers
/// - inspecting its frame buffer and sound timer for some display and speaker
///
/// Nothing here keeps time: the driver decides how many steps to run per frame and must call
/// `tick_timers` at `TIMER_FREQUENCY_HZ`.
pub struct Chip8 {
    state: State,
    config: Config,
    rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Chip8 {
            state: State::new(),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load a rom at the start of program memory
    ///
    /// # Arguments
    /// * `rom` the program image; at most `MAX_ROM_SIZE` bytes
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Error::rom_too_large(rom.len()));
        }
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + rom.len()].copy_from_slice(rom);
        debug!("loaded {} byte ROM at {:#05X}", rom.len(), start);
        Ok(())
    }

    /// Points the CPU back at the start of the program.
    /// Memory, registers and timers are left as they are.
    pub fn init(&mut self) {
        self.state.pc = PROGRAM_START;
        self.state.i = 0;
        self.state.sp = 0;
        self.state.key_wait = None;
        debug!("initialized at {:#05X}", PROGRAM_START);
    }

    /// Advances the CPU by a single instruction
    /// - re-checks the keys instead if an Fx0A is waiting
    /// - otherwise gets, decodes and executes the next opcode
    ///
    /// On error the state is left exactly as it was before the call.
    pub fn step(&mut self) -> Result<Step> {
        if let Some(wait) = self.state.key_wait {
            self.state = resume_key_wait(&self.state, wait);
            return Ok(match self.state.key_wait {
                Some(_) => Step::AwaitingKey {
                    register: wait.register,
                },
                None => {
                    debug!(
                        "key {:X} stored in V{:X}",
                        self.state.v[wait.register as usize], wait.register
                    );
                    Step::Executed(Instruction::WaitKey { x: wait.register })
                }
            });
        }

        match self.execute_next() {
            Ok((instruction, state)) => {
                if let Instruction::WaitKey { x } = instruction {
                    debug!("waiting for a key press for V{:X}", x);
                }
                self.state = state;
                Ok(Step::Executed(instruction))
            }
            Err(e) => {
                warn!("halted at {:#05X}: {}", self.state.pc, e);
                Err(e)
            }
        }
    }

    fn execute_next(&mut self) -> Result<(Instruction, State)> {
        let op = self.state.fetch()?;
        let instruction = Instruction::decode(op)?;
        trace!(
            "{:04X} {:<16} v{:02X?} i{:04X} pc{:04X}",
            op,
            instruction.to_string(),
            self.state.v,
            self.state.i,
            self.state.pc
        );
        let mut ctx = Context {
            quirks: self.config.quirks,
            rng: &mut self.rng,
        };
        let state = instruction.execute(&self.state, &mut ctx)?;
        Ok((instruction, state))
    }

    /// Decrements the delay and sound timers towards 0.
    /// Called by the driver at `TIMER_FREQUENCY_HZ`, independently of how many steps it runs.
    pub fn tick_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the keypad index 0x0..=0xF
    /// * `pressed` whether the key is now held
    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<()> {
        let index = key as usize;
        if index >= KEY_COUNT {
            return Err(Error::InvalidKey { key });
        }
        self.state.keys[index] = pressed;
        Ok(())
    }

    pub fn key_press(&mut self, key: u8) -> Result<()> {
        self.set_key(key, true)
    }

    pub fn key_release(&mut self, key: u8) -> Result<()> {
        self.set_key(key, false)
    }

    /// The register an Fx0A is waiting to fill, if any
    pub fn awaiting_key(&self) -> Option<u8> {
        self.state.key_wait.map(|wait| wait.register)
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if it changed since the last call
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Whether the speaker should be sounding
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
