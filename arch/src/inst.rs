use crate::{
    alu::ALU,
    op::{Field, OpKind},
    reg::Reg,
    resolved::Op,
};

use color_print::cformat;

/// Instruction as written by a template: a kind plus its operand slots.
/// Slots the kind does not use stay at their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inst {
    pub kind: OpKind,
    pub rd: Reg,
    pub rs1: Reg,
    pub rs2: Reg,
    pub imm: u16,
}

impl Inst {
    pub fn new(kind: OpKind) -> Self {
        Inst {
            kind,
            ..Default::default()
        }
    }

    /// Sets one field. `None` if the value does not fit it.
    pub fn with(mut self, field: Field, val: u64) -> Option<Self> {
        match field {
            Field::RD => self.rd = Reg::from_index(val)?,
            Field::RS1 => self.rs1 = Reg::from_index(val)?,
            Field::RS2 => self.rs2 = Reg::from_index(val)?,
            Field::IMM => self.imm = u16::try_from(val).ok()?,
        }
        Some(self)
    }

    pub fn reg(&self, field: Field) -> Option<Reg> {
        match field {
            Field::RD => Some(self.rd),
            Field::RS1 => Some(self.rs1),
            Field::RS2 => Some(self.rs2),
            Field::IMM => None,
        }
    }

    pub fn field(&self, field: Field) -> u64 {
        match field {
            Field::RD => self.rd.index() as u64,
            Field::RS1 => self.rs1.index() as u64,
            Field::RS2 => self.rs2.index() as u64,
            Field::IMM => self.imm as u64,
        }
    }
}

impl Inst {
    pub fn to_op(self) -> Op {
        let Inst {
            kind,
            rd,
            rs1,
            rs2,
            imm,
        } = self;
        use OpKind::*;
        match kind {
            ADD => Op::CALC(ALU::ADD, rd, rs1, rs2),
            ADDI => Op::CALCI(ALU::ADD, rd, rs1, imm),
            SUB => Op::CALC(ALU::SUB, rd, rs1, rs2),
            SUBI => Op::CALCI(ALU::SUB, rd, rs1, imm),

            NOT => Op::CALCI(ALU::XOR, rd, rs1, 0xFFFF),
            AND => Op::CALC(ALU::AND, rd, rs1, rs2),
            ANDI => Op::CALCI(ALU::AND, rd, rs1, imm),
            OR => Op::CALC(ALU::OR, rd, rs1, rs2),
            ORI => Op::CALCI(ALU::OR, rd, rs1, imm),
            XOR => Op::CALC(ALU::XOR, rd, rs1, rs2),
            XORI => Op::CALCI(ALU::XOR, rd, rs1, imm),

            EQ => Op::CALC(ALU::EQ, rd, rs1, rs2),
            EQI => Op::CALCI(ALU::EQ, rd, rs1, imm),
            NEQ => Op::CALC(ALU::NEQ, rd, rs1, rs2),
            NEQI => Op::CALCI(ALU::NEQ, rd, rs1, imm),
            LT => Op::CALC(ALU::LT, rd, rs1, rs2),
            LTI => Op::CALCI(ALU::LT, rd, rs1, imm),
            LTS => Op::CALC(ALU::LTS, rd, rs1, rs2),
            LTSI => Op::CALCI(ALU::LTS, rd, rs1, imm),

            SR => Op::CALC(ALU::SR, rd, rs1, Reg::ZERO),
            SRS => Op::CALC(ALU::SRS, rd, rs1, Reg::ZERO),
            SRR => Op::CALC(ALU::SRR, rd, rs1, Reg::ZERO),
            SL => Op::CALC(ALU::SL, rd, rs1, Reg::ZERO),
            SLR => Op::CALC(ALU::SLR, rd, rs1, Reg::ZERO),

            MOV => Op::CALC(ALU::ADD, rd, rs1, Reg::ZERO),
            LOAD => Op::LOAD(rd, rs1, imm),
            LOADI => Op::CALCI(ALU::ADD, rd, Reg::ZERO, imm),
            STORE => Op::STORE(rs1, rs2, imm),

            NOP => Op::CALC(ALU::ADD, Reg::ZERO, Reg::ZERO, Reg::ZERO),
            JUMP => Op::CTRL(Reg::ZERO, Reg::ZERO, Reg::ZERO, imm),
            JUMPR => Op::CTRL(Reg::ZERO, Reg::PC, Reg::ZERO, imm),
            IF => Op::CTRL(Reg::ZERO, Reg::ZERO, rs2, imm),
            IFR => Op::CTRL(Reg::ZERO, Reg::PC, rs2, imm),
            CALL => Op::CTRL(Reg::RA, Reg::ZERO, Reg::ZERO, imm),
            RET => Op::CTRL(Reg::ZERO, Reg::RA, Reg::ZERO, 0),
            IRET => Op::CTRL(Reg::ZERO, Reg::IRA, Reg::ZERO, 0),
        }
    }

    pub fn from_op(op: Op) -> Result<Inst, String> {
        let rrr = |kind, rd, rs1, rs2| Inst {
            kind,
            rd,
            rs1,
            rs2,
            imm: 0,
        };
        let rri = |kind, rd, rs1, imm| Inst {
            kind,
            rd,
            rs1,
            rs2: Reg::ZERO,
            imm,
        };
        let inst = match op {
            Op::CALC(alu, rd, rs1, rs2) => match alu {
                ALU::ADD => match (rd, rs1, rs2) {
                    (Reg::ZERO, Reg::ZERO, Reg::ZERO) => Inst::new(OpKind::NOP),
                    (_, _, Reg::ZERO) => rrr(OpKind::MOV, rd, rs1, Reg::ZERO),
                    _ => rrr(OpKind::ADD, rd, rs1, rs2),
                },
                ALU::SUB => rrr(OpKind::SUB, rd, rs1, rs2),
                ALU::AND => rrr(OpKind::AND, rd, rs1, rs2),
                ALU::OR => rrr(OpKind::OR, rd, rs1, rs2),
                ALU::XOR => rrr(OpKind::XOR, rd, rs1, rs2),
                ALU::EQ => rrr(OpKind::EQ, rd, rs1, rs2),
                ALU::NEQ => rrr(OpKind::NEQ, rd, rs1, rs2),
                ALU::LT => rrr(OpKind::LT, rd, rs1, rs2),
                ALU::LTS => rrr(OpKind::LTS, rd, rs1, rs2),
                ALU::SR => rrr(OpKind::SR, rd, rs1, Reg::ZERO),
                ALU::SRS => rrr(OpKind::SRS, rd, rs1, Reg::ZERO),
                ALU::SRR => rrr(OpKind::SRR, rd, rs1, Reg::ZERO),
                ALU::SL => rrr(OpKind::SL, rd, rs1, Reg::ZERO),
                ALU::SLR => rrr(OpKind::SLR, rd, rs1, Reg::ZERO),
            },
            Op::CALCI(alu, rd, rs1, imm) => match alu {
                ALU::ADD => match rs1 {
                    Reg::ZERO => rri(OpKind::LOADI, rd, Reg::ZERO, imm),
                    _ => rri(OpKind::ADDI, rd, rs1, imm),
                },
                ALU::SUB => rri(OpKind::SUBI, rd, rs1, imm),
                ALU::AND => rri(OpKind::ANDI, rd, rs1, imm),
                ALU::OR => rri(OpKind::ORI, rd, rs1, imm),
                ALU::XOR => match imm {
                    0xFFFF => rri(OpKind::NOT, rd, rs1, 0),
                    _ => rri(OpKind::XORI, rd, rs1, imm),
                },
                ALU::EQ => rri(OpKind::EQI, rd, rs1, imm),
                ALU::NEQ => rri(OpKind::NEQI, rd, rs1, imm),
                ALU::LT => rri(OpKind::LTI, rd, rs1, imm),
                ALU::LTS => rri(OpKind::LTSI, rd, rs1, imm),
                _ => return Err(format!("Shift has no immediate form: {:?}", op)),
            },
            Op::LOAD(rd, rs1, imm) => rri(OpKind::LOAD, rd, rs1, imm),
            Op::STORE(rs1, rs2, imm) => Inst {
                kind: OpKind::STORE,
                rs1,
                rs2,
                imm,
                ..Default::default()
            },
            Op::CTRL(rd, rs1, rs2, imm) => {
                let ctrl = |kind, rs2, imm| Inst {
                    kind,
                    rs2,
                    imm,
                    ..Default::default()
                };
                match (rd, rs1, rs2) {
                    (Reg::ZERO, Reg::ZERO, Reg::ZERO) => ctrl(OpKind::JUMP, Reg::ZERO, imm),
                    (Reg::ZERO, Reg::PC, Reg::ZERO) => ctrl(OpKind::JUMPR, Reg::ZERO, imm),
                    (Reg::ZERO, Reg::ZERO, rs2) => ctrl(OpKind::IF, rs2, imm),
                    (Reg::ZERO, Reg::PC, rs2) => ctrl(OpKind::IFR, rs2, imm),
                    (Reg::RA, Reg::ZERO, Reg::ZERO) => ctrl(OpKind::CALL, Reg::ZERO, imm),
                    (Reg::ZERO, Reg::RA, Reg::ZERO) => ctrl(OpKind::RET, Reg::ZERO, 0),
                    (Reg::ZERO, Reg::IRA, Reg::ZERO) => ctrl(OpKind::IRET, Reg::ZERO, 0),
                    _ => return Err(format!("Undefined Inst: {:?}", op)),
                }
            }
        };
        Ok(inst)
    }
}

impl Inst {
    pub fn cformat(&self) -> String {
        macro_rules! rrr {
            ($name:expr, $rd:expr, $rs1:expr, $rs2:expr) => {
                cformat!("<r>{:<6}</><b>{:<4} {:<4} {:<4}</>", $name, $rd, $rs1, $rs2)
            };
        }

        macro_rules! rri {
            ($name:expr, $rd:expr, $rs1:expr, $imm:expr) => {
                cformat!(
                    "<r>{:<6}</><b>{:<4} {:<4} <y>0x{:0>4X}</></>",
                    $name,
                    $rd,
                    $rs1,
                    $imm
                )
            };
        }

        let name = self.kind.mnemonic();
        let (rd, rs1, rs2, imm) = (self.rd, self.rs1, self.rs2, self.imm);
        use OpKind::*;
        match self.kind {
            ADD | SUB | AND | OR | XOR | EQ | NEQ | LT | LTS => rrr!(name, rd, rs1, rs2),
            SR | SRS | SRR | SL | SLR | MOV | NOT => rrr!(name, rd, rs1, ""),
            NOP | RET | IRET => rrr!(name, "", "", ""),
            ADDI | SUBI | ANDI | ORI | XORI | EQI | NEQI | LTI | LTSI | LOAD => {
                rri!(name, rd, rs1, imm)
            }
            LOADI => rri!(name, rd, "", imm),
            STORE => rri!(name, rs2, rs1, imm),
            IF | IFR => rri!(name, rs2, "", imm),
            JUMP | JUMPR | CALL => rri!(name, "", "", imm),
        }
    }
}

/// Plain assembly text, operands in `arg_field` order.
impl std::fmt::Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.mnemonic())?;
        for (i, field) in self.kind.arg_field().iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match self.reg(*field) {
                None => write!(f, "{sep}0x{:04X}", self.imm)?,
                Some(reg) => write!(f, "{sep}{}", reg.to_string().to_lowercase())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(kind: OpKind, args: &[u64]) -> Inst {
        kind.arg_field()
            .iter()
            .zip(args)
            .try_fold(Inst::new(kind), |inst, (f, v)| inst.with(*f, *v))
            .unwrap()
    }

    macro_rules! test_inst {
        ($($name:ident: $kind:ident $args:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let inst = inst(OpKind::$kind, &$args);
                    let op = inst.to_op();
                    let inst_back = Inst::from_op(op).unwrap();
                    assert_eq!(inst, inst_back);
                    let bin = op.to_bin();
                    assert_eq!(Op::from_bin(bin).unwrap(), op);
                }
            )*
        }
    }

    test_inst! {
        test_add: ADD [8, 9, 10],
        test_addi: ADDI [8, 9, 0x0123],
        test_sub: SUB [8, 9, 10],
        test_subi: SUBI [8, 9, 0x0123],
        test_and: AND [8, 9, 10],
        test_andi: ANDI [8, 9, 0x0123],
        test_or: OR [8, 9, 10],
        test_ori: ORI [8, 9, 0x0123],
        test_xor: XOR [8, 9, 10],
        test_xori: XORI [8, 9, 0x0123],
        test_eq: EQ [8, 9, 10],
        test_eqi: EQI [8, 9, 0x0123],
        test_neq: NEQ [8, 9, 10],
        test_lt: LT [8, 9, 10],
        test_ltsi: LTSI [8, 9, 0x0123],
        test_sr: SR [8, 9],
        test_slr: SLR [8, 9],
        test_mov: MOV [8, 9],
        test_load: LOAD [8, 9, 0x0123],
        test_loadi: LOADI [8, 0x0123],
        test_store: STORE [8, 9, 0x0123],
        test_nop: NOP [],
        test_if: IF [8, 0x0123],
        test_ifr: IFR [8, 0x0123],
        test_jump: JUMP [0x0123],
        test_jumpr: JUMPR [0x0123],
        test_call: CALL [0x0123],
        test_ret: RET [],
        test_iret: IRET [],
    }

    #[test]
    fn not_lowers_to_xori() {
        let not = inst(OpKind::NOT, &[8, 9]);
        assert_eq!(not.to_op(), Op::CALCI(ALU::XOR, Reg::T0, Reg::T1, 0xFFFF));
        assert_eq!(Inst::from_op(not.to_op()).unwrap().kind, OpKind::NOT);
    }

    #[test]
    fn out_of_range_fields() {
        assert_eq!(Inst::new(OpKind::MOV).with(Field::RD, 16), None);
        assert_eq!(Inst::new(OpKind::LOADI).with(Field::IMM, 0x1_0000), None);
        assert!(Inst::new(OpKind::LOADI).with(Field::IMM, 0xFFFF).is_some());
    }

    #[test]
    fn display() {
        assert_eq!(inst(OpKind::ADDI, &[8, 9, 1]).to_string(), "addi t0, t1, 0x0001");
        assert_eq!(inst(OpKind::STORE, &[12, 3, 2]).to_string(), "store s0, sp, 0x0002");
        assert_eq!(inst(OpKind::RET, &[]).to_string(), "ret");
    }
}
