use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    ZERO,
    IRA,
    PC,
    SP,
    RA,
    FP,
    A0,
    A1,
    T0,
    T1,
    T2,
    T3,
    S0,
    S1,
    S2,
    S3,
}

impl Reg {
    pub const COUNT: usize = 16;

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }

    /// Register by file index, `None` past the file.
    pub fn from_index(index: u64) -> Option<Self> {
        (index < Self::COUNT as u64).then(|| Self::from(index as u8))
    }

    pub fn index(self) -> u8 {
        self.into()
    }

    /// Registers a test program may freely clobber.
    pub fn is_general(self) -> bool {
        !matches!(self, Reg::ZERO | Reg::IRA | Reg::PC | Reg::SP | Reg::RA)
    }
}

impl From<Reg> for u16 {
    fn from(reg: Reg) -> u16 {
        reg as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Reg::parse("s2"), Ok(Reg::S2));
        assert_eq!(Reg::parse("zero"), Ok(Reg::ZERO));
        assert!(Reg::parse("hoge").is_err());
    }

    #[test]
    fn index_round_trip() {
        for i in 0..Reg::COUNT as u64 {
            assert_eq!(Reg::from_index(i).map(|r| r.index() as u64), Some(i));
        }
        assert_eq!(Reg::from_index(0x13), None);
    }

    #[test]
    fn general_registers() {
        assert!(!Reg::PC.is_general());
        assert!(Reg::T0.is_general());
        assert!(Reg::S3.is_general());
    }
}
