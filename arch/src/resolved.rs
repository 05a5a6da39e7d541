use crate::alu::ALU;
use crate::reg::Reg;

// ----------------------------------------------------------------------------

pub struct OpCode;

impl OpCode {
    pub const CALC: u8 = 0b0000;
    pub const CALCI: u8 = 0b0001;
    pub const LOAD: u8 = 0b0011;
    pub const STORE: u8 = 0b0111;
    pub const CTRL: u8 = 0b1111;
}

// ----------------------------------------------------------------------------

/// Machine-level form every instruction lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    CALC(ALU, Reg, Reg, Reg),
    CALCI(ALU, Reg, Reg, u16),
    LOAD(Reg, Reg, u16),
    STORE(Reg, Reg, u16),
    CTRL(Reg, Reg, Reg, u16),
}

fn enc_format(opcode: u8, rd: u8, rs1: u8, rs2: u8, imm: u16) -> u32 {
    (opcode as u32)
        | ((rs1 as u32) << 4)
        | ((rs2 as u32) << 8)
        | ((rd as u32) << 12)
        | ((imm as u32) << 16)
}

fn dec_format(bin: u32) -> (u8, u8, u8, u8, u16) {
    let opcode = (bin & 0xF) as u8;
    let rs1 = ((bin >> 4) & 0xF) as u8;
    let rs2 = ((bin >> 8) & 0xF) as u8;
    let rd = ((bin >> 12) & 0xF) as u8;
    let imm = ((bin >> 16) & 0xFFFF) as u16;
    (opcode, rd, rs1, rs2, imm)
}

// ----------------------------------------------------------------------------

impl Op {
    pub fn to_bin(&self) -> u32 {
        match *self {
            Op::CALC(alu, rd, rs1, rs2) => {
                enc_format(OpCode::CALC, rd.index(), rs1.index(), rs2.index(), u8::from(alu) as u16)
            }
            Op::CALCI(alu, rd, rs1, imm) => {
                enc_format(OpCode::CALCI, rd.index(), rs1.index(), alu.into(), imm)
            }
            Op::LOAD(rd, rs1, imm) => enc_format(OpCode::LOAD, rd.index(), rs1.index(), 0, imm),
            Op::STORE(rs1, rs2, imm) => {
                enc_format(OpCode::STORE, 0, rs1.index(), rs2.index(), imm)
            }
            Op::CTRL(rd, rs1, rs2, imm) => {
                enc_format(OpCode::CTRL, rd.index(), rs1.index(), rs2.index(), imm)
            }
        }
    }

    pub fn from_bin(bin: u32) -> Result<Op, String> {
        let (opcode, rd, rs1, rs2, imm) = dec_format(bin);
        let (rd, rs1, rs2) = (Reg::from(rd), Reg::from(rs1), Reg::from(rs2));
        match opcode {
            OpCode::CALC => match imm {
                0..=13 => Ok(Op::CALC(ALU::from(imm as u8), rd, rs1, rs2)),
                _ => Err(format!("Unknown ALU operation: {imm}")),
            },
            OpCode::CALCI => Ok(Op::CALCI(ALU::from(rs2.index()), rd, rs1, imm)),
            OpCode::LOAD => Ok(Op::LOAD(rd, rs1, imm)),
            OpCode::STORE => Ok(Op::STORE(rs1, rs2, imm)),
            OpCode::CTRL => Ok(Op::CTRL(rd, rs1, rs2, imm)),
            _ => Err(format!("Unknown opcode: {opcode:04b}")),
        }
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fields_do_not_overlap() {
        for (opcode, rd, rs1, rs2, imm) in [(0x0, 0x1, 0x2, 0x3, 0x1234), (0xF, 0xF, 0xF, 0xF, 0xFFFF)] {
            assert_eq!(dec_format(enc_format(opcode, rd, rs1, rs2, imm)), (opcode, rd, rs1, rs2, imm));
        }
    }

    macro_rules! test_op {
        ($name:ident, $op:expr) => {
            #[test]
            fn $name() {
                let op = $op;
                let bin = op.to_bin();
                assert_eq!(Op::from_bin(bin), Ok(op), "bin: {:08X}", bin);
            }
        };
    }

    test_op!(test_calc, Op::CALC(ALU::SUB, Reg::T0, Reg::T1, Reg::T2));
    test_op!(test_calci, Op::CALCI(ALU::XOR, Reg::A0, Reg::A1, 0xFFFF));
    test_op!(test_load, Op::LOAD(Reg::S0, Reg::SP, 42));
    test_op!(test_store, Op::STORE(Reg::SP, Reg::S1, 7));
    test_op!(test_ctrl, Op::CTRL(Reg::RA, Reg::ZERO, Reg::T3, 0x0100));

    #[test]
    fn unknown_opcode() {
        assert!(Op::from_bin(0b0010).is_err());
    }
}
