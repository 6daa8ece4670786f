//! One function per instruction.
//!
//! Each takes the current state and the instruction's operands and returns the state after the
//! instruction, leaving its input untouched. Failures are detected before anything is built, so an
//! `Err` never comes with a half-applied instruction.

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FLAG_REGISTER, FONT_SPRITE_SIZE, FONT_START, KEY_COUNT,
    STACK_DEPTH,
};
use crate::error::{Error, Result};
use crate::state::{KeyWait, State};

fn next(state: &State) -> u16 {
    state.pc + 0x2
}

fn skip_if(state: &State, condition: bool) -> Result<State> {
    let pc = if condition {
        state.pc + 0x4
    } else {
        state.pc + 0x2
    };
    Ok(State { pc, ..*state })
}

/// clear
pub fn clr(state: &State) -> Result<State> {
    Ok(State {
        pc: next(state),
        frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop() + 2
/// The stack holds the address of the call itself, so resume after it
pub fn rts(state: &State) -> Result<State> {
    if state.sp == 0 {
        return Err(Error::StackUnderflow);
    }
    let sp = state.sp - 0x1;
    Ok(State {
        pc: state.stack[sp as usize] + 0x2,
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(state: &State, addr: u16) -> Result<State> {
    Ok(State { pc: addr, ..*state })
}

/// STACK.push(PC); PC = addr
pub fn call(state: &State, addr: u16) -> Result<State> {
    if state.sp as usize >= STACK_DEPTH {
        return Err(Error::StackOverflow);
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = state.pc;
    Ok(State {
        pc: addr,
        sp: state.sp + 0x1,
        stack,
        ..*state
    })
}

/// if Vx == nn then pc += 2
pub fn ske(state: &State, x: u8, nn: u8) -> Result<State> {
    skip_if(state, state.v[x as usize] == nn)
}

/// if Vx != nn then pc += 2
pub fn skne(state: &State, x: u8, nn: u8) -> Result<State> {
    skip_if(state, state.v[x as usize] != nn)
}

/// if Vx == Vy then pc += 2
pub fn skre(state: &State, x: u8, y: u8) -> Result<State> {
    skip_if(state, state.v[x as usize] == state.v[y as usize])
}

/// if Vx != Vy then pc += 2
pub fn skrne(state: &State, x: u8, y: u8) -> Result<State> {
    skip_if(state, state.v[x as usize] != state.v[y as usize])
}

/// Vx = nn
pub fn load(state: &State, x: u8, nn: u8) -> Result<State> {
    let mut v = state.v;
    v[x as usize] = nn;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Vx += nn
/// Wraps on overflow and leaves VF alone
pub fn add(state: &State, x: u8, nn: u8) -> Result<State> {
    let mut v = state.v;
    v[x as usize] = v[x as usize].wrapping_add(nn);
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Vx = f(Vx, Vy) for the flag-free ALU operations
fn alu(state: &State, x: u8, y: u8, f: fn(u8, u8) -> u8) -> Result<State> {
    let mut v = state.v;
    v[x as usize] = f(v[x as usize], v[y as usize]);
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Vx = Vy
pub fn mv(state: &State, x: u8, y: u8) -> Result<State> {
    alu(state, x, y, |_, vy| vy)
}

/// Vx |= Vy
pub fn or(state: &State, x: u8, y: u8) -> Result<State> {
    alu(state, x, y, |vx, vy| vx | vy)
}

/// Vx &= Vy
pub fn and(state: &State, x: u8, y: u8) -> Result<State> {
    alu(state, x, y, |vx, vy| vx & vy)
}

/// Vx ^= Vy
pub fn xor(state: &State, x: u8, y: u8) -> Result<State> {
    alu(state, x, y, |vx, vy| vx ^ vy)
}

/// VF = flag; Vx = result
/// The flag is written first, so Vx wins when x is F
fn alu_with_flag(state: &State, x: u8, result: u8, flag: bool) -> Result<State> {
    let mut v = state.v;
    v[FLAG_REGISTER] = flag as u8;
    v[x as usize] = result;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Vx += Vy; VF = carry
pub fn add_reg(state: &State, x: u8, y: u8) -> Result<State> {
    let (res, carry) = state.v[x as usize].overflowing_add(state.v[y as usize]);
    alu_with_flag(state, x, res, carry)
}

/// Vx -= Vy; VF = Vx > Vy
pub fn sub(state: &State, x: u8, y: u8) -> Result<State> {
    let (vx, vy) = (state.v[x as usize], state.v[y as usize]);
    alu_with_flag(state, x, vx.wrapping_sub(vy), vx > vy)
}

/// Vx = Vy - Vx; VF = Vy > Vx
pub fn subn(state: &State, x: u8, y: u8) -> Result<State> {
    let (vx, vy) = (state.v[x as usize], state.v[y as usize]);
    alu_with_flag(state, x, vy.wrapping_sub(vx), vy > vx)
}

/// VF = shifted out bit; Vsrc = Vx = shifted
/// `src` is Vy on the COSMAC VIP and Vx on later interpreters
fn shift(state: &State, x: u8, src: u8, shifted: u8, flag: u8) -> Result<State> {
    let mut v = state.v;
    v[FLAG_REGISTER] = flag;
    v[src as usize] = shifted;
    v[x as usize] = shifted;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Vx = Vy >> 1; VF = lsb
pub fn shr(state: &State, x: u8, y: u8, shift_uses_vy: bool) -> Result<State> {
    let src = if shift_uses_vy { y } else { x };
    let value = state.v[src as usize];
    shift(state, x, src, value >> 1, value & 0x1)
}

/// Vx = Vy << 1; VF = msb
pub fn shl(state: &State, x: u8, y: u8, shift_uses_vy: bool) -> Result<State> {
    let src = if shift_uses_vy { y } else { x };
    let value = state.v[src as usize];
    shift(state, x, src, value << 1, (value & 0x80) >> 7)
}

/// I = addr
pub fn loadi(state: &State, addr: u16) -> Result<State> {
    Ok(State {
        pc: next(state),
        i: addr,
        ..*state
    })
}

/// PC = V0 + addr
pub fn jumpi(state: &State, addr: u16) -> Result<State> {
    Ok(State {
        pc: u16::from(state.v[0x0]) + addr,
        ..*state
    })
}

/// Vx = rand_byte & nn
pub fn rand(state: &State, x: u8, nn: u8, rand_byte: u8) -> Result<State> {
    let mut v = state.v;
    v[x as usize] = rand_byte & nn;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixels were erased
pub fn draw(state: &State, x: u8, y: u8, n: u8) -> Result<State> {
    let sprite = &state.memory[state.memory_range(state.i as usize, n as usize)?];
    let left = state.v[x as usize] as usize;
    let top = state.v[y as usize] as usize;

    let mut frame_buffer = state.frame_buffer;
    let mut collision = 0x0;
    for (row, byte) in sprite.iter().enumerate() {
        let py = (top + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let px = (left + bit) % DISPLAY_WIDTH;
            let pixel = (byte >> (7 - bit)) & 0x1;
            collision |= pixel & frame_buffer[py][px];
            frame_buffer[py][px] ^= pixel;
        }
    }

    let mut v = state.v;
    v[FLAG_REGISTER] = collision;
    Ok(State {
        pc: next(state),
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    })
}

/// if Vx.pressed then pc += 2
pub fn skpr(state: &State, x: u8) -> Result<State> {
    skip_if(state, state.key_pressed(state.v[x as usize]))
}

/// if !Vx.pressed then pc += 2
pub fn skup(state: &State, x: u8) -> Result<State> {
    skip_if(state, !state.key_pressed(state.v[x as usize]))
}

/// Vx = DT
pub fn moved(state: &State, x: u8) -> Result<State> {
    let mut v = state.v;
    v[x as usize] = state.delay_timer;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// await keypress for Vx
/// The pc stays on this instruction until `resume_key_wait` sees a key go down
pub fn keyd(state: &State, x: u8) -> Result<State> {
    Ok(State {
        key_wait: Some(KeyWait {
            register: x,
            held: state.keys,
        }),
        ..*state
    })
}

/// Checks a pending Fx0A against the current keys.
/// A key that is down now but wasn't at the last check is stored in the waiting register and
/// execution moves past the Fx0A; otherwise the snapshot is refreshed so a release followed by a
/// press is seen.
pub fn resume_key_wait(state: &State, wait: KeyWait) -> State {
    match (0..KEY_COUNT).find(|&key| state.keys[key] && !wait.held[key]) {
        Some(key) => {
            let mut v = state.v;
            v[wait.register as usize] = key as u8;
            State {
                pc: next(state),
                v,
                key_wait: None,
                ..*state
            }
        }
        None => State {
            key_wait: Some(KeyWait {
                held: state.keys,
                ..wait
            }),
            ..*state
        },
    }
}

/// DT = Vx
pub fn loads(state: &State, x: u8) -> Result<State> {
    Ok(State {
        pc: next(state),
        delay_timer: state.v[x as usize],
        ..*state
    })
}

/// ST = Vx
pub fn ld(state: &State, x: u8) -> Result<State> {
    Ok(State {
        pc: next(state),
        sound_timer: state.v[x as usize],
        ..*state
    })
}

/// I += Vx
pub fn addi(state: &State, x: u8) -> Result<State> {
    Ok(State {
        pc: next(state),
        i: state.i.wrapping_add(u16::from(state.v[x as usize])),
        ..*state
    })
}

/// I = FONT_START + (Vx & 0xF) * 5
/// Set I to the memory address of the sprite for the hex digit in Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(state: &State, x: u8) -> Result<State> {
    let digit = u16::from(state.v[x as usize] & 0xF);
    Ok(State {
        pc: next(state),
        i: FONT_START + digit * FONT_SPRITE_SIZE,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(state: &State, x: u8) -> Result<State> {
    let range = state.memory_range(state.i as usize, 3)?;
    let value = state.v[x as usize];
    let mut memory = state.memory;
    memory[range].copy_from_slice(&[value / 100, value / 10 % 10, value % 10]);
    Ok(State {
        pc: next(state),
        memory,
        ..*state
    })
}

/// Where I ends up after transferring `count` registers
fn index_after_transfer(state: &State, count: usize, increments_i: bool) -> u16 {
    if increments_i {
        state.i + count as u16
    } else {
        state.i
    }
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(state: &State, x: u8, increments_i: bool) -> Result<State> {
    let count = x as usize + 1;
    let range = state.memory_range(state.i as usize, count)?;
    let mut memory = state.memory;
    memory[range].copy_from_slice(&state.v[..count]);
    Ok(State {
        pc: next(state),
        i: index_after_transfer(state, count, increments_i),
        memory,
        ..*state
    })
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(state: &State, x: u8, increments_i: bool) -> Result<State> {
    let count = x as usize + 1;
    let range = state.memory_range(state.i as usize, count)?;
    let mut v = state.v;
    v[..count].copy_from_slice(&state.memory[range]);
    Ok(State {
        pc: next(state),
        i: index_after_transfer(state, count, increments_i),
        v,
        ..*state
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_on(register: u8, held: [bool; KEY_COUNT]) -> (State, KeyWait) {
        let wait = KeyWait { register, held };
        let state = State {
            key_wait: Some(wait),
            keys: held,
            ..State::new()
        };
        (state, wait)
    }

    #[test]
    fn test_resume_key_wait_without_press() {
        let (state, wait) = waiting_on(0x3, [false; KEY_COUNT]);
        let state = resume_key_wait(&state, wait);
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.key_wait, Some(wait));
    }

    #[test]
    fn test_resume_key_wait_ignores_held_key() {
        let mut held = [false; KEY_COUNT];
        held[0x7] = true;
        let (state, wait) = waiting_on(0x3, held);
        let state = resume_key_wait(&state, wait);
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.v[0x3], 0x0);
    }

    #[test]
    fn test_resume_key_wait_sees_release_then_press() {
        let mut held = [false; KEY_COUNT];
        held[0x7] = true;
        let (mut state, wait) = waiting_on(0x3, held);

        state.keys[0x7] = false;
        state = resume_key_wait(&state, wait);
        let wait = state.key_wait.unwrap();
        assert!(!wait.held[0x7]);

        state.keys[0x7] = true;
        state = resume_key_wait(&state, wait);
        assert_eq!(state.v[0x3], 0x7);
        assert_eq!(state.pc, 0x202);
        assert_eq!(state.key_wait, None);
    }

    #[test]
    fn test_resume_key_wait_takes_lowest_new_key() {
        let (mut state, wait) = waiting_on(0x0, [false; KEY_COUNT]);
        state.keys[0xB] = true;
        state.keys[0x4] = true;
        let state = resume_key_wait(&state, wait);
        assert_eq!(state.v[0x0], 0x4);
    }

    #[test]
    fn test_draw_zero_rows_clears_flag() {
        let mut state = State::new();
        state.v[0xF] = 0x1;
        let state = draw(&state, 0x0, 0x1, 0).unwrap();
        assert_eq!(state.v[0xF], 0x0);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_shift_vx_in_place_without_vy_quirk() {
        let mut state = State::new();
        state.v[0x1] = 0x81;
        state.v[0x2] = 0x10;
        let right = shr(&state, 0x1, 0x2, false).unwrap();
        assert_eq!(right.v[0x1], 0x40);
        assert_eq!(right.v[0x2], 0x10);
        assert_eq!(right.v[0xF], 0x1);

        let left = shl(&state, 0x1, 0x2, false).unwrap();
        assert_eq!(left.v[0x1], 0x02);
        assert_eq!(left.v[0x2], 0x10);
        assert_eq!(left.v[0xF], 0x1);
    }

    #[test]
    fn test_load_store_increment_quirk() {
        let mut state = State::new();
        state.i = 0x300;
        let stored = stor(&state, 0x3, true).unwrap();
        assert_eq!(stored.i, 0x304);
        let read_back = read(&state, 0x3, true).unwrap();
        assert_eq!(read_back.i, 0x304);
    }
}
