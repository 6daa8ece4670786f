use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_START, KEY_COUNT, MEMORY_SIZE, PROGRAM_START,
    REGISTER_COUNT, SPRITE_SHEET, STACK_DEPTH,
};
use crate::error::{Error, Result};

/// The FrameBuffer is indexed as [y][x]; every cell is either 0 (off) or 1 (on)
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// Progress of an Fx0A that is waiting for a key press
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyWait {
    /// Register receiving the pressed key
    pub register: u8,
    /// Keys held at the previous check; only a key going from up to down completes the wait
    pub held: [bool; KEY_COUNT],
}

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is overwritten as a flag by arithmetic, shifts and draws
/// - (i) a 16-bit memory address register, of which 12 bits are addressable
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the next free slot of the stack; 0 when empty
///
/// Timers
/// - 2 8-bit timers (delay & sound), decremented by the driver at 60Hz
/// - A sound timer above 0 means a tone should play
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x200 is reserved for the interpreter and holds the sprite sheet
///     - programs are loaded at 0x200
/// - 32x64 frame buffer
///
/// ## Input
/// - pressed status of keys 0..F, written by the driver
/// - execution pauses on Fx0A until a key goes down
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct State {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_DEPTH],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub keys: [bool; KEY_COUNT],
    pub key_wait: Option<KeyWait>,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let font = FONT_START as usize;
        memory[font..font + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_DEPTH],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            keys: [false; KEY_COUNT],
            key_wait: None,
        }
    }

    /// The `len` bytes of memory starting at `addr`, if they are all addressable
    pub fn memory_range(&self, addr: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let end = addr + len;
        if end > MEMORY_SIZE {
            // report the first byte that doesn't exist
            Err(Error::MemoryOutOfBounds {
                address: addr.max(MEMORY_SIZE),
            })
        } else {
            Ok(addr..end)
        }
    }

    /// Gets the opcode pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self) -> Result<u16> {
        let range = self.memory_range(self.pc as usize, 2)?;
        let bytes = &self.memory[range];
        Ok(u16::from(bytes[0]) << 8 | u16::from(bytes[1]))
    }

    /// Whether `key` is held; keys are selected by the low nibble
    pub fn key_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for State {
    // memory and the frame buffer are too big to be useful in a debug dump
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("v", &self.v)
            .field("i", &self.i)
            .field("pc", &self.pc)
            .field("sp", &self.sp)
            .field("stack", &&self.stack[..self.sp as usize])
            .field("delay_timer", &self.delay_timer)
            .field("sound_timer", &self.sound_timer)
            .field("keys", &self.keys)
            .field("key_wait", &self.key_wait)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_program() {
        let state = State::new();
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.i, 0);
        assert_eq!(state.sp, 0);
        assert_eq!(state.v, [0; 16]);
    }

    #[test]
    fn test_new_state_loads_sprite_sheet() {
        let state = State::new();
        assert_eq!(state.memory[0x00..0x05], [0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(state.memory[0x4B..0x50], [0xF0, 0x80, 0xF0, 0x80, 0x80]);
        assert!(state.memory[0x50..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fetch_is_big_endian() {
        let mut state = State::new();
        state.memory[0x200..0x202].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(state.fetch(), Ok(0xAABB));
    }

    #[test]
    fn test_fetch_past_end_of_memory() {
        let mut state = State::new();
        state.pc = 0xFFF;
        assert_eq!(
            state.fetch(),
            Err(Error::MemoryOutOfBounds { address: 0x1000 })
        );
    }

    #[test]
    fn test_memory_range_bounds() {
        let state = State::new();
        assert_eq!(state.memory_range(0xFFD, 3), Ok(0xFFD..0x1000));
        assert_eq!(
            state.memory_range(0xFFE, 3),
            Err(Error::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(
            state.memory_range(0x1234, 1),
            Err(Error::MemoryOutOfBounds { address: 0x1234 })
        );
    }

    #[test]
    fn test_key_pressed_uses_low_nibble() {
        let mut state = State::new();
        state.keys[0x3] = true;
        assert!(state.key_pressed(0x3));
        assert!(state.key_pressed(0x13));
        assert!(!state.key_pressed(0x4));
    }
}
