use arch::{Field, Inst, OpKind, Reg, State};

use crate::error::{Error, Result};
use crate::isa::Model;
use crate::template::{ArgMode, Kind, Primitive, Value};

/// RK16 register file and memory driven by template primitives.
#[derive(Debug, Clone, Default)]
pub struct Rk16 {
    state: State,
    saved: Option<State>,
}

impl Rk16 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Instruction word of an operation. Relative kinds turn label
    /// arguments into offsets from `pc`.
    fn inst(&self, op: &Primitive, pc: u64) -> Result<Inst> {
        if op.kind != Kind::Op {
            return Err(Error::MalformedPrimitive(format!("{} is not an operation", op.signature())));
        }
        let kind = OpKind::parse(&op.name).map_err(Error::Model)?;
        let relative = matches!(kind, OpKind::IFR | OpKind::JUMPR);
        kind.arg_field().iter().try_fold(Inst::new(kind), |inst, field| {
            let arg = op
                .args
                .get(field.name())
                .ok_or_else(|| Error::UnassignedArgument(op.signature(), field.name().to_string()))?;
            let value = match &arg.value {
                Value::Mode(mode) if field.is_reg() => reg_index(mode)?,
                Value::Label(_) if relative => arg.value.as_imm().unwrap_or(0).wrapping_sub(pc) & 0xFFFF,
                value => value
                    .as_imm()
                    .ok_or_else(|| Error::UnassignedArgument(op.signature(), field.name().to_string()))?,
            };
            inst.with(*field, value).ok_or_else(|| {
                Error::Model(format!("{} = 0x{value:X} does not fit {}", field.name(), op.signature()))
            })
        })
    }

    fn location(&self, mode: &Primitive) -> Result<u16> {
        match mode.name.as_str() {
            "reg" => {
                let index = reg_index(mode)?;
                Reg::from_index(index)
                    .map(u16::from)
                    .ok_or_else(|| Error::Model(format!("no register {index}")))
            }
            "mem" => {
                let addr = mode
                    .imm("addr")
                    .ok_or_else(|| Error::UnassignedArgument(mode.signature(), "addr".to_string()))?;
                u16::try_from(addr).map_err(|_| Error::Model(format!("address 0x{addr:X} is out of memory")))
            }
            _ => Err(Error::MalformedPrimitive(format!("unknown addressing mode {}", mode.signature()))),
        }
    }
}

fn reg_index(mode: &Primitive) -> Result<u64> {
    if mode.name != "reg" {
        return Err(Error::MalformedPrimitive(format!("{} is not a register", mode.signature())));
    }
    mode.imm("i")
        .ok_or_else(|| Error::UnassignedArgument(mode.signature(), "i".to_string()))
}

/// Unique name of the first resolved label argument.
fn label_name(op: &Primitive) -> Option<&str> {
    op.args.values().find_map(|arg| match &arg.value {
        Value::Label(r) => r.target.as_ref().map(|(name, _)| name.as_str()),
        _ => None,
    })
}

impl Model for Rk16 {
    fn size_of(&self, op: &Primitive) -> Result<u64> {
        OpKind::parse(&op.name).map_err(Error::Model)?;
        Ok(1)
    }

    fn text_of(&self, op: &Primitive) -> Result<String> {
        let inst = self.inst(op, 0)?;
        let text = inst.to_string();
        if let Some(name) = label_name(op) {
            let imm = format!("0x{:04X}", inst.field(Field::IMM));
            if let Some(head) = text.strip_suffix(&imm) {
                return Ok(format!("{head}{name}"));
            }
        }
        Ok(text)
    }

    fn execute(&mut self, op: &Primitive) -> Result<()> {
        let inst = self.inst(op, self.pc())?;
        self.state.step(inst.to_op());
        Ok(())
    }

    fn pc(&self) -> u64 {
        self.state.pc() as u64
    }

    fn set_pc(&mut self, pc: u64) {
        self.state.set_pc(pc as u16);
    }

    fn read(&self, mode: &Primitive) -> Result<u64> {
        Ok(self.state.get(self.location(mode)?) as u64)
    }

    fn write(&mut self, mode: &Primitive, value: u64) -> Result<()> {
        let addr = self.location(mode)?;
        self.state.set(addr, value as u16);
        Ok(())
    }

    fn data_width(&self, _: &Primitive) -> u32 {
        16
    }

    fn arg_width(&self, prim: &Primitive, arg: &str) -> u32 {
        match (prim.name.as_str(), arg) {
            ("reg", "i") => 4,
            _ => 16,
        }
    }

    fn arg_mode(&self, op: &str, arg: &str) -> ArgMode {
        super::direction(op, arg)
    }

    fn use_temp_state(&mut self, temp: bool) {
        if temp {
            self.saved = Some(self.state.clone());
        } else if let Some(saved) = self.saved.take() {
            self.state = saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelRef;
    use crate::rk16::{op, reg};

    fn labeled(name: &str, addr: u64) -> Value {
        let mut r = LabelRef::new(name);
        r.target = Some((format!("{name}_0"), addr));
        Value::Label(r)
    }

    #[test]
    fn text() {
        let model = Rk16::new();
        let addi = op(
            "addi",
            vec![("rd", Value::Mode(reg(8))), ("rs1", Value::Mode(reg(9))), ("imm", Value::Fixed(1))],
        );
        assert_eq!(model.text_of(&addi).unwrap(), "addi t0, t1, 0x0001");
        let jump = op("if", vec![("rs2", Value::Mode(reg(10))), ("imm", labeled("loop", 4))]);
        assert_eq!(model.text_of(&jump).unwrap(), "if t2, loop_0");
    }

    #[test]
    fn relative_branch_and_temp_state() {
        let mut model = Rk16::new();
        model.use_temp_state(true);
        model.set_pc(0x10);
        let ifr = op("ifr", vec![("rs2", Value::Mode(reg(0))), ("imm", labeled("back", 0x0C))]);
        model.execute(&ifr).unwrap();
        assert_eq!(model.pc(), 0x0C);

        model.write(&reg(8), 0xBEEF).unwrap();
        assert_eq!(model.read(&reg(8)).unwrap(), 0xBEEF);
        model.use_temp_state(false);
        assert_eq!(model.read(&reg(8)).unwrap(), 0);
        assert_eq!(model.pc(), 0);
    }

    #[test]
    fn unknown_register_is_unassigned() {
        let model = Rk16::new();
        let free = Primitive::mode("reg").arg("i", Value::unknown(), ArgMode::In);
        let mov = op("mov", vec![("rd", Value::Mode(reg(8))), ("rs1", Value::Mode(free))]);
        assert!(matches!(model.text_of(&mov), Err(Error::UnassignedArgument(_, _))));
        assert!(matches!(model.size_of(&Primitive::op("fly")), Err(Error::Model(_))));
    }

    #[test]
    fn out_of_range_operands() {
        let mut model = Rk16::new();
        let mov = op("mov", vec![("rd", Value::Mode(reg(20))), ("rs1", Value::Mode(reg(8)))]);
        assert!(matches!(model.text_of(&mov), Err(Error::Model(_))));
        let load = op("loadi", vec![("rd", Value::Mode(reg(8))), ("imm", Value::Fixed(0x1_0000))]);
        assert!(matches!(model.execute(&load), Err(Error::Model(_))));
        assert!(matches!(model.read(&reg(16)), Err(Error::Model(_))));
        let far = Primitive::mode("mem").arg("addr", Value::Fixed(0x2_0000), ArgMode::In);
        assert!(matches!(model.write(&far, 1), Err(Error::Model(_))));
    }
}
