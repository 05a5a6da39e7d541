use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    Display,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum ALU {
    #[default]
    ADD,
    SUB,
    AND,
    OR,
    XOR,
    EQ,
    NEQ,
    LT,
    LTS,
    SR,
    SRS,
    SRR,
    SL,
    SLR,
}

macro_rules! boo {
    ($cond:expr) => {
        if $cond {
            0xFFFF
        } else {
            0x0000
        }
    };
}

pub fn valu<T: Into<ALU>>(op: T, a: u16, b: u16) -> u16 {
    use ALU::*;
    match op.into() {
        ADD => a.wrapping_add(b),
        SUB => a.wrapping_sub(b),
        AND => a & b,
        OR => a | b,
        XOR => a ^ b,
        EQ => boo!(a == b),
        NEQ => boo!(a != b),
        LT => boo!(a < b),
        LTS => boo!((a as i16) < (b as i16)),
        SR => a >> 1,
        SRS => (a as i16 >> 1) as u16,
        SRR => a.rotate_right(1),
        SL => a << 1,
        SLR => a.rotate_left(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(valu(ALU::ADD, 0xFFFF, 2), 1);
        assert_eq!(valu(ALU::SUB, 0, 1), 0xFFFF);
    }

    #[test]
    fn compare_yields_mask() {
        assert_eq!(valu(ALU::EQ, 3, 3), 0xFFFF);
        assert_eq!(valu(ALU::LT, 4, 3), 0);
        assert_eq!(valu(ALU::LTS, 0xFFFF, 0), 0xFFFF);
    }

    #[test]
    fn shifts() {
        assert_eq!(valu(ALU::SRS, 0x8000, 0), 0xC000);
        assert_eq!(valu(ALU::SRR, 0x0001, 0), 0x8000);
        assert_eq!(valu(ALU::SLR, 0x8000, 0), 0x0001);
    }
}
