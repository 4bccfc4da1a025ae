use std::fmt;

/// a decoded CHIP-8 instruction. register operands are 0x0-0xf
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 1nnn
    Jump(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SkipEqByte(u8, u8),
    /// 4xkk
    SkipNeByte(u8, u8),
    /// 5xy_
    SkipEqReg(u8, u8),
    /// 6xkk
    LoadByte(u8, u8),
    /// 7xkk
    AddByte(u8, u8),
    /// 8xy0
    LoadReg(u8, u8),
    /// 8xy1
    Or(u8, u8),
    /// 8xy2
    And(u8, u8),
    /// 8xy3
    Xor(u8, u8),
    /// 8xy4
    AddReg(u8, u8),
    /// 8xy5
    Sub(u8, u8),
    /// 8xy6
    ShiftRight(u8),
    /// 8xy7
    SubN(u8, u8),
    /// 8xyE
    ShiftLeft(u8),
    /// 9xy_
    SkipNeReg(u8, u8),
    /// Annn
    LoadI(u16),
    /// Bnnn
    JumpV0(u16),
    /// Cxkk
    Random(u8, u8),
    /// Dxyn
    Draw(u8, u8, u8),
    /// Ex9E
    SkipKeyDown(u8),
    /// ExA1
    SkipKeyUp(u8),
    /// Fx07
    LoadDelay(u8),
    /// Fx0A
    WaitKey(u8),
    /// Fx15
    SetDelay(u8),
    /// Fx18
    SetSound(u8),
    /// Fx1E
    AddI(u8),
    /// Fx29
    Glyph(u8),
    /// Fx33
    Bcd(u8),
    /// Fx55
    StoreRegs(u8),
    /// Fx65
    LoadRegs(u8),
    /// anything unassigned; executes as a no-op
    Unknown(u16),
}

impl Instruction {
    /// two-level decode: the top nibble picks the family, and the four
    /// families that share a top nibble (0, 8, E, F) then look at the rest
    pub fn decode(opcode: u16) -> Instruction {
        let x = ((opcode >> 8) & 0x0f) as u8;
        let y = ((opcode >> 4) & 0x0f) as u8;
        let kk = (opcode & 0xff) as u8;
        let n = (opcode & 0x0f) as u8;
        let addr = opcode & 0x0fff;

        match opcode >> 12 {
            0x0 => match opcode {
                0x00e0 => Instruction::Clear,
                0x00ee => Instruction::Return,
                _ => Instruction::Unknown(opcode),
            },
            0x1 => Instruction::Jump(addr),
            0x2 => Instruction::Call(addr),
            0x3 => Instruction::SkipEqByte(x, kk),
            0x4 => Instruction::SkipNeByte(x, kk),
            0x5 => Instruction::SkipEqReg(x, y),
            0x6 => Instruction::LoadByte(x, kk),
            0x7 => Instruction::AddByte(x, kk),
            0x8 => match n {
                0x0 => Instruction::LoadReg(x, y),
                0x1 => Instruction::Or(x, y),
                0x2 => Instruction::And(x, y),
                0x3 => Instruction::Xor(x, y),
                0x4 => Instruction::AddReg(x, y),
                0x5 => Instruction::Sub(x, y),
                0x6 => Instruction::ShiftRight(x),
                0x7 => Instruction::SubN(x, y),
                0xe => Instruction::ShiftLeft(x),
                _ => Instruction::Unknown(opcode),
            },
            0x9 => Instruction::SkipNeReg(x, y),
            0xa => Instruction::LoadI(addr),
            0xb => Instruction::JumpV0(addr),
            0xc => Instruction::Random(x, kk),
            0xd => Instruction::Draw(x, y, n),
            0xe => match kk {
                0x9e => Instruction::SkipKeyDown(x),
                0xa1 => Instruction::SkipKeyUp(x),
                _ => Instruction::Unknown(opcode),
            },
            0xf => match kk {
                0x07 => Instruction::LoadDelay(x),
                0x0a => Instruction::WaitKey(x),
                0x15 => Instruction::SetDelay(x),
                0x18 => Instruction::SetSound(x),
                0x1e => Instruction::AddI(x),
                0x29 => Instruction::Glyph(x),
                0x33 => Instruction::Bcd(x),
                0x55 => Instruction::StoreRegs(x),
                0x65 => Instruction::LoadRegs(x),
                _ => Instruction::Unknown(opcode),
            },
            // top nibble of a u16 can't be anything else
            _ => Instruction::Unknown(opcode),
        }
    }
}

/// Cowgod-style mnemonics, for tracing
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Clear => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump(a) => write!(f, "JP {:03X}", a),
            Instruction::Call(a) => write!(f, "CALL {:03X}", a),
            Instruction::SkipEqByte(x, kk) => write!(f, "SE V{:X}, {:02X}", x, kk),
            Instruction::SkipNeByte(x, kk) => write!(f, "SNE V{:X}, {:02X}", x, kk),
            Instruction::SkipEqReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::LoadByte(x, kk) => write!(f, "LD V{:X}, {:02X}", x, kk),
            Instruction::AddByte(x, kk) => write!(f, "ADD V{:X}, {:02X}", x, kk),
            Instruction::LoadReg(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Instruction::Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            Instruction::And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Instruction::Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            Instruction::AddReg(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Instruction::Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            Instruction::ShiftRight(x) => write!(f, "SHR V{:X}", x),
            Instruction::SubN(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Instruction::ShiftLeft(x) => write!(f, "SHL V{:X}", x),
            Instruction::SkipNeReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            Instruction::LoadI(a) => write!(f, "LD I, {:03X}", a),
            Instruction::JumpV0(a) => write!(f, "JP V0, {:03X}", a),
            Instruction::Random(x, kk) => write!(f, "RND V{:X}, {:02X}", x, kk),
            Instruction::Draw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {:X}", x, y, n),
            Instruction::SkipKeyDown(x) => write!(f, "SKP V{:X}", x),
            Instruction::SkipKeyUp(x) => write!(f, "SKNP V{:X}", x),
            Instruction::LoadDelay(x) => write!(f, "LD V{:X}, DT", x),
            Instruction::WaitKey(x) => write!(f, "LD V{:X}, K", x),
            Instruction::SetDelay(x) => write!(f, "LD DT, V{:X}", x),
            Instruction::SetSound(x) => write!(f, "LD ST, V{:X}", x),
            Instruction::AddI(x) => write!(f, "ADD I, V{:X}", x),
            Instruction::Glyph(x) => write!(f, "LD F, V{:X}", x),
            Instruction::Bcd(x) => write!(f, "LD B, V{:X}", x),
            Instruction::StoreRegs(x) => write!(f, "LD [I], V{:X}", x),
            Instruction::LoadRegs(x) => write!(f, "LD V{:X}, [I]", x),
            Instruction::Unknown(op) => write!(f, "??? {:04X}", op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_family_zero() {
        assert_eq!(Instruction::decode(0x00e0), Instruction::Clear);
        assert_eq!(Instruction::decode(0x00ee), Instruction::Return);
        // SYS addr is not supported
        assert_eq!(Instruction::decode(0x0123), Instruction::Unknown(0x0123));
    }

    #[test]
    fn test_decode_operand_fields() {
        assert_eq!(Instruction::decode(0x1abc), Instruction::Jump(0xabc));
        assert_eq!(Instruction::decode(0x2456), Instruction::Call(0x456));
        assert_eq!(Instruction::decode(0x3a42), Instruction::SkipEqByte(0xa, 0x42));
        assert_eq!(Instruction::decode(0x5ab0), Instruction::SkipEqReg(0xa, 0xb));
        assert_eq!(Instruction::decode(0xb300), Instruction::JumpV0(0x300));
        assert_eq!(Instruction::decode(0xd12f), Instruction::Draw(0x1, 0x2, 0xf));
        assert_eq!(Instruction::decode(0xf733), Instruction::Bcd(0x7));
    }

    #[test]
    fn test_decode_family_eight() {
        assert_eq!(Instruction::decode(0x8124), Instruction::AddReg(1, 2));
        assert_eq!(Instruction::decode(0x8126), Instruction::ShiftRight(1));
        assert_eq!(Instruction::decode(0x812e), Instruction::ShiftLeft(1));
        for n in [0x8, 0x9, 0xa, 0xb, 0xc, 0xd, 0xf] {
            let op = 0x8120 | n;
            assert_eq!(Instruction::decode(op), Instruction::Unknown(op));
        }
    }

    #[test]
    fn test_decode_key_and_misc_families() {
        assert_eq!(Instruction::decode(0xe39e), Instruction::SkipKeyDown(3));
        assert_eq!(Instruction::decode(0xe3a1), Instruction::SkipKeyUp(3));
        assert_eq!(Instruction::decode(0xe3ff), Instruction::Unknown(0xe3ff));
        assert_eq!(Instruction::decode(0xf50a), Instruction::WaitKey(5));
        assert_eq!(Instruction::decode(0xf5ff), Instruction::Unknown(0xf5ff));
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Instruction::decode(0xd005).to_string(), "DRW V0, V0, 5");
        assert_eq!(Instruction::decode(0xa202).to_string(), "LD I, 202");
        assert_eq!(Instruction::decode(0x8128).to_string(), "??? 8128");
    }
}
