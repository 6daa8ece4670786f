use std::fmt;

use rand::RngCore;

use crate::config::Quirks;
use crate::error::{Error, Result};
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// A decoded Chip-8 instruction and its operands.
///
/// `x` and `y` name registers, `nn` is an immediate byte, `addr` a 12-bit address and `n` a sprite
/// height.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 1nnn
    Jump { addr: u16 },
    /// 2nnn
    Call { addr: u16 },
    /// 3xnn
    SkipEq { x: u8, nn: u8 },
    /// 4xnn
    SkipNe { x: u8, nn: u8 },
    /// 5xy0
    SkipRegEq { x: u8, y: u8 },
    /// 6xnn
    Load { x: u8, nn: u8 },
    /// 7xnn
    Add { x: u8, nn: u8 },
    /// 8xy0
    Move { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4
    AddReg { x: u8, y: u8 },
    /// 8xy5
    Sub { x: u8, y: u8 },
    /// 8xy6
    ShiftRight { x: u8, y: u8 },
    /// 8xy7
    SubN { x: u8, y: u8 },
    /// 8xyE
    ShiftLeft { x: u8, y: u8 },
    /// 9xy0
    SkipRegNe { x: u8, y: u8 },
    /// Annn
    LoadI { addr: u16 },
    /// Bnnn
    JumpV0 { addr: u16 },
    /// Cxnn
    Rand { x: u8, nn: u8 },
    /// Dxyn
    Draw { x: u8, y: u8, n: u8 },
    /// Ex9E
    SkipPressed { x: u8 },
    /// ExA1
    SkipReleased { x: u8 },
    /// Fx07
    GetDelay { x: u8 },
    /// Fx0A
    WaitKey { x: u8 },
    /// Fx15
    SetDelay { x: u8 },
    /// Fx18
    SetSound { x: u8 },
    /// Fx1E
    AddI { x: u8 },
    /// Fx29
    LoadSprite { x: u8 },
    /// Fx33
    Bcd { x: u8 },
    /// Fx55
    Store { x: u8 },
    /// Fx65
    Read { x: u8 },
}

/// What an instruction may consult besides the machine state
pub struct Context<'a> {
    pub quirks: Quirks,
    pub rng: &'a mut dyn RngCore,
}

impl Instruction {
    /// Selects the Instruction for a given opcode
    pub fn decode(op: u16) -> Result<Self> {
        use Instruction::*;

        let (x, y, n, nn, addr) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());
        let instruction = match op.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => Clear,
            (0x0, 0x0, 0xE, 0xE) => Return,
            (0x1, ..) => Jump { addr },
            (0x2, ..) => Call { addr },
            (0x3, ..) => SkipEq { x, nn },
            (0x4, ..) => SkipNe { x, nn },
            (0x5, .., 0x0) => SkipRegEq { x, y },
            (0x6, ..) => Load { x, nn },
            (0x7, ..) => Add { x, nn },
            (0x8, .., 0x0) => Move { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddReg { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => ShiftRight { x, y },
            (0x8, .., 0x7) => SubN { x, y },
            (0x8, .., 0xE) => ShiftLeft { x, y },
            (0x9, .., 0x0) => SkipRegNe { x, y },
            (0xA, ..) => LoadI { addr },
            (0xB, ..) => JumpV0 { addr },
            (0xC, ..) => Rand { x, nn },
            (0xD, ..) => Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => SkipPressed { x },
            (0xE, _, 0xA, 0x1) => SkipReleased { x },
            (0xF, _, 0x0, 0x7) => GetDelay { x },
            (0xF, _, 0x0, 0xA) => WaitKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddI { x },
            (0xF, _, 0x2, 0x9) => LoadSprite { x },
            (0xF, _, 0x3, 0x3) => Bcd { x },
            (0xF, _, 0x5, 0x5) => Store { x },
            (0xF, _, 0x6, 0x5) => Read { x },
            _ => return Err(Error::UnimplementedInstruction { opcode: op }),
        };
        Ok(instruction)
    }

    /// Returns the state after executing this instruction against `state`
    pub fn execute(self, state: &State, ctx: &mut Context<'_>) -> Result<State> {
        use Instruction::*;

        let quirks = ctx.quirks;
        match self {
            Clear => clr(state),
            Return => rts(state),
            Jump { addr } => jump(state, addr),
            Call { addr } => call(state, addr),
            SkipEq { x, nn } => ske(state, x, nn),
            SkipNe { x, nn } => skne(state, x, nn),
            SkipRegEq { x, y } => skre(state, x, y),
            Load { x, nn } => load(state, x, nn),
            Add { x, nn } => add(state, x, nn),
            Move { x, y } => mv(state, x, y),
            Or { x, y } => or(state, x, y),
            And { x, y } => and(state, x, y),
            Xor { x, y } => xor(state, x, y),
            AddReg { x, y } => add_reg(state, x, y),
            Sub { x, y } => sub(state, x, y),
            ShiftRight { x, y } => shr(state, x, y, quirks.shift_uses_vy),
            SubN { x, y } => subn(state, x, y),
            ShiftLeft { x, y } => shl(state, x, y, quirks.shift_uses_vy),
            SkipRegNe { x, y } => skrne(state, x, y),
            LoadI { addr } => loadi(state, addr),
            JumpV0 { addr } => jumpi(state, addr),
            Rand { x, nn } => rand(state, x, nn, ctx.rng.next_u32() as u8),
            Draw { x, y, n } => draw(state, x, y, n),
            SkipPressed { x } => skpr(state, x),
            SkipReleased { x } => skup(state, x),
            GetDelay { x } => moved(state, x),
            WaitKey { x } => keyd(state, x),
            SetDelay { x } => loads(state, x),
            SetSound { x } => ld(state, x),
            AddI { x } => addi(state, x),
            LoadSprite { x } => ldspr(state, x),
            Bcd { x } => bcd(state, x),
            Store { x } => stor(state, x, quirks.load_store_increments_i),
            Read { x } => read(state, x, quirks.load_store_increments_i),
        }
    }
}

/// Assembly mnemonics, in the usual Chip-8 notation
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP {:#05X}", addr),
            Call { addr } => write!(f, "CALL {:#05X}", addr),
            SkipEq { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            SkipNe { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            SkipRegEq { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Load { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Add { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, y } => write!(f, "SHR V{:X}, V{:X}", x, y),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, y } => write!(f, "SHL V{:X}, V{:X}", x, y),
            SkipRegNe { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadI { addr } => write!(f, "LD I, {:#05X}", addr),
            JumpV0 { addr } => write!(f, "JP V0, {:#05X}", addr),
            Rand { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipPressed { x } => write!(f, "SKP V{:X}", x),
            SkipReleased { x } => write!(f, "SKNP V{:X}", x),
            GetDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddI { x } => write!(f, "ADD I, V{:X}", x),
            LoadSprite { x } => write!(f, "LD F, V{:X}", x),
            Bcd { x } => write!(f, "LD B, V{:X}", x),
            Store { x } => write!(f, "LD [I], V{:X}", x),
            Read { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
