/// # Opcodes
///
/// Chip-8 opcodes are 16 bits each, fetched big-endian. Their behavior is cased on some
/// combination of:
/// - `(n, _, _, _)` the instruction family; applies to all opcodes
/// - `(_, _, _, n)` specific behavior within a family (8xyn)
/// - `(_, _, n, n)` more specific behavior within a family (Exnn, Fxnn)
/// - `(_, n, n, n)` some fixed function that takes no operands (00E0, 00EE)
///
/// Nibbles not used to select the operation carry its operands.
/// - `(_, n, n, n)` a 12-bit address, `nnn`
/// - `(_, _, n, n)` a byte assigned to and/or compared with Vx, `nn`
/// - `(_, n, _, _)` either the register Vx or the range of registers V0..=Vx
/// - `(_, _, n, _)` the register Vy
/// - `(_, _, _, n)` a sprite height, `n`
pub trait Opcode {
    /// Returns the Opcode's component nibbles.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// `[x___]`
    fn family(&self) -> u8;

    /// `[_x__]`
    fn x(&self) -> u8;

    /// `[__y_]`
    fn y(&self) -> u8;

    /// `[___n]`
    fn n(&self) -> u8;

    /// `[__nn]`
    fn nn(&self) -> u8;

    /// `[_nnn]`
    fn nnn(&self) -> u16;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.family(), self.x(), self.y(), self.n())
    }

    fn family(&self) -> u8 {
        (self >> 12) as u8
    }

    fn x(&self) -> u8 {
        ((self & 0x0F00) >> 8) as u8
    }

    fn y(&self) -> u8 {
        ((self & 0x00F0) >> 4) as u8
    }

    fn n(&self) -> u8 {
        (self & 0x000F) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0x00FF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0x0FFF
    }
}

#[cfg(test)]
mod test_opcode {
    use super::*;

    #[test]
    fn test_nibbles() {
        assert_eq!(0xABCDu16.nibbles(), (0xA, 0xB, 0xC, 0xD));
        assert_eq!(0x00E0u16.nibbles(), (0x0, 0x0, 0xE, 0x0));
    }

    #[test]
    fn test_operands() {
        let op: u16 = 0xD12F;
        assert_eq!(op.family(), 0xD);
        assert_eq!(op.x(), 0x1);
        assert_eq!(op.y(), 0x2);
        assert_eq!(op.n(), 0xF);
        assert_eq!(op.nn(), 0x2F);
        assert_eq!(op.nnn(), 0x12F);
    }
}
