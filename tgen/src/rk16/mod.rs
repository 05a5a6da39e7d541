//! RK16 binding: model, knowledge base and the default preparators.

mod model;
mod testbase;

pub use model::Rk16;
pub use testbase::Rk16TestBase;

use arch::{OpKind, Reg};

use crate::context::Context;
use crate::options::Options;
use crate::preparator::{Preparator, PreparatorStore};
use crate::template::{ArgMode, Call, Lazy, Primitive, Value};

/// Registers handed out by the allocator. S2 and S3 are left to
/// preparators and self-checks.
pub const ALLOCATABLE: [Reg; 8] = [
    Reg::A0,
    Reg::A1,
    Reg::T0,
    Reg::T1,
    Reg::T2,
    Reg::T3,
    Reg::S0,
    Reg::S1,
];

/// Scratch register of the self-check comparator.
pub const CHECK_REG: Reg = Reg::S3;

/// Register `i` as an addressing mode.
pub fn reg(i: u64) -> Primitive {
    Primitive::mode("reg").arg("i", Value::Fixed(i), ArgMode::In)
}

/// `rd` is written, everything else read.
pub fn direction(op: &str, arg: &str) -> ArgMode {
    let output = OpKind::parse(op)
        .ok()
        .and_then(|k| k.arg_field().iter().find(|f| f.name() == arg).copied())
        .is_some_and(|f| f.is_output());
    if output {
        ArgMode::Out
    } else {
        ArgMode::In
    }
}

/// Operation with its arguments.
pub fn op(name: &str, args: Vec<(&str, Value)>) -> Primitive {
    args.into_iter().fold(Primitive::op(name), |prim, (arg, value)| {
        prim.arg(arg, value, direction(name, arg))
    })
}

fn target() -> Value {
    Value::Lazy(Lazy::Target)
}

fn word() -> Value {
    Value::Lazy(Lazy::Value { lo: 0, hi: 15 })
}

/// Preparators and the comparator for `reg`.
pub fn preparators(store: &mut PreparatorStore) {
    store.add(Preparator::new(
        "reg",
        vec![Call::op(op("loadi", vec![("rd", target()), ("imm", word())]))],
    ));
    store.add(
        Preparator::new(
            "reg",
            vec![Call::op(op("xor", vec![("rd", target()), ("rs1", target()), ("rs2", target())]))],
        )
        .name("zero")
        .mask("0000"),
    );
    store.add(
        Preparator::new(
            "reg",
            vec![
                Call::op(op("xor", vec![("rd", target()), ("rs1", target()), ("rs2", target())])),
                Call::op(op("not", vec![("rd", target()), ("rs1", target())])),
            ],
        )
        .name("ones")
        .mask("ffff"),
    );

    let check = Value::Mode(reg(CHECK_REG.index() as u64));
    store.add(
        Preparator::new(
            "reg",
            vec![
                Call::op(op("neqi", vec![("rd", check.clone()), ("rs1", target()), ("imm", word())])),
                Call::op(op("ifr", vec![("rs2", check), ("imm", Value::Fixed(2))])),
                Call::op(op("jump", vec![("imm", Value::Fixed(0xFFFF))])),
            ],
        )
        .comparator(),
    );
}

/// Context with the RK16 model, knowledge base, preparators and register
/// allocation table.
pub fn context(options: Options) -> Context {
    let mut ctx = Context::new(options, Box::new(Rk16::new()), Box::new(Rk16TestBase));
    preparators(&mut ctx.preparators);
    let regs = ALLOCATABLE.iter().map(|r| r.index() as u64).collect();
    ctx.allocator.add_table("reg", "i", regs);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_follow_fields() {
        let add = op(
            "add",
            vec![
                ("rd", Value::Mode(reg(8))),
                ("rs1", Value::Mode(reg(9))),
                ("rs2", Value::Mode(reg(10))),
            ],
        );
        assert_eq!(add.args["rd"].mode, ArgMode::Out);
        assert_eq!(add.args["rs1"].mode, ArgMode::In);
        assert_eq!(add.to_string(), "add(rd: reg(i: 8), rs1: reg(i: 9), rs2: reg(i: 10))");
    }

    #[test]
    fn allocatable_registers_are_general() {
        assert!(ALLOCATABLE.iter().all(|r| r.is_general()));
        assert!(!ALLOCATABLE.contains(&CHECK_REG));
    }
}
