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
pub enum OpKind {
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
    #[default]
    NOP,
    MOV,
    ADDI,
    SUBI,
    ANDI,
    ORI,
    XORI,
    EQI,
    NEQI,
    LTI,
    LTSI,
    NOT,
    LOADI,
    LOAD,
    STORE,
    IF,
    IFR,
    JUMP,
    JUMPR,
    CALL,
    RET,
    IRET,
}

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_uppercase().parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    pub fn mnemonic(&self) -> String {
        self.to_string().to_lowercase()
    }
}

/// Operand slot of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RD,
    RS1,
    RS2,
    IMM,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::RD => "rd",
            Field::RS1 => "rs1",
            Field::RS2 => "rs2",
            Field::IMM => "imm",
        }
    }

    pub fn is_reg(&self) -> bool {
        !matches!(self, Field::IMM)
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Field::RD)
    }
}

impl OpKind {
    pub fn arg_field(&self) -> &'static [Field] {
        use Field::*;
        use OpKind::*;
        match self {
            ADD | SUB | AND | OR | XOR | EQ | NEQ | LT | LTS => &[RD, RS1, RS2],
            SR | SRS | SRR | SL | SLR | MOV | NOT => &[RD, RS1],
            NOP | RET | IRET => &[],
            ADDI | SUBI | ANDI | ORI | XORI | EQI | NEQI | LTI | LTSI => &[RD, RS1, IMM],
            LOADI => &[RD, IMM],
            LOAD => &[RD, RS1, IMM],
            STORE => &[RS2, RS1, IMM],
            IF | IFR => &[RS2, IMM],
            JUMP | JUMPR | CALL => &[IMM],
        }
    }

    pub fn is_branch(&self) -> bool {
        use OpKind::*;
        matches!(self, IF | IFR | JUMP | JUMPR | CALL | RET | IRET)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, OpKind::IF | OpKind::IFR)
    }
}
