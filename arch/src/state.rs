use crate::alu::{valu, ALU};
use crate::reg::Reg;
use crate::resolved::Op;

/// Architectural state. Registers alias the first words of RAM and the
/// zero register ignores writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    ram: Vec<u16>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

// Memory access
impl State {
    pub fn new() -> Self {
        State {
            ram: vec![0; 65536],
        }
    }

    pub fn get(&self, addr: impl Into<u16>) -> u16 {
        self.ram[addr.into() as usize]
    }

    pub fn set(&mut self, addr: impl Into<u16>, val: u16) {
        let addr = addr.into() as usize;
        if addr != 0 {
            self.ram[addr] = val;
        }
    }

    pub fn pc(&self) -> u16 {
        self.ram[Reg::PC as usize]
    }

    pub fn set_pc(&mut self, val: u16) {
        self.ram[Reg::PC as usize] = val;
    }

    fn inc_pc(&mut self) {
        let pc = self.pc();
        self.set_pc(pc.wrapping_add(1));
    }
}

impl State {
    pub fn step(&mut self, op: Op) {
        match op {
            Op::CALC(alu, rd, rs1, rs2) => self.calc(alu, rd, rs1, rs2),
            Op::CALCI(alu, rd, rs1, imm) => self.calci(alu, rd, rs1, imm),
            Op::LOAD(rd, rs1, imm) => self.load(rd, rs1, imm),
            Op::STORE(rs1, rs2, imm) => self.store(rs1, rs2, imm),
            Op::CTRL(rd, rs1, rs2, imm) => self.ctrl(rd, rs1, rs2, imm),
        }
    }

    fn calc(&mut self, alu: ALU, rd: Reg, rs1: Reg, rs2: Reg) {
        let calc = valu(alu, self.get(rs1), self.get(rs2));
        self.set(rd, calc);
        self.inc_pc();
    }

    fn calci(&mut self, alu: ALU, rd: Reg, rs1: Reg, imm: u16) {
        let calc = valu(alu, self.get(rs1), imm);
        self.set(rd, calc);
        self.inc_pc();
    }

    fn load(&mut self, rd: Reg, rs1: Reg, imm: u16) {
        self.set(rd, self.get(self.get(rs1).wrapping_add(imm)));
        self.inc_pc();
    }

    fn store(&mut self, rs1: Reg, rs2: Reg, imm: u16) {
        self.set(self.get(rs1).wrapping_add(imm), self.get(rs2));
        self.inc_pc();
    }

    fn ctrl(&mut self, rd: Reg, rs1: Reg, rs2: Reg, imm: u16) {
        let cond = self.get(rs2);
        let base = self.get(rs1);
        self.set(rd, self.pc().wrapping_add(1));
        if cond == 0 {
            self.set_pc(base.wrapping_add(imm));
        } else {
            self.inc_pc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::Inst;
    use crate::op::OpKind;

    fn run(state: &mut State, kind: OpKind, args: &[u64]) {
        let inst = kind
            .arg_field()
            .iter()
            .zip(args)
            .try_fold(Inst::new(kind), |inst, (f, v)| inst.with(*f, *v))
            .unwrap();
        state.step(inst.to_op());
    }

    #[test]
    fn zero_register_is_read_only() {
        let mut state = State::new();
        run(&mut state, OpKind::LOADI, &[0, 5]);
        assert_eq!(state.get(Reg::ZERO), 0);
        assert_eq!(state.pc(), 1);
    }

    #[test]
    fn load_store() {
        let mut state = State::new();
        run(&mut state, OpKind::LOADI, &[8, 0x100]);
        run(&mut state, OpKind::LOADI, &[9, 42]);
        run(&mut state, OpKind::STORE, &[9, 8, 2]);
        run(&mut state, OpKind::LOAD, &[10, 8, 2]);
        assert_eq!(state.get(0x102u16), 42);
        assert_eq!(state.get(Reg::T2), 42);
    }

    #[test]
    fn conditional_jump_takes_on_zero() {
        let mut state = State::new();
        state.set_pc(10);
        run(&mut state, OpKind::IF, &[Reg::T0.index() as u64, 20]);
        assert_eq!(state.pc(), 20);

        state.set(Reg::T0, 1);
        run(&mut state, OpKind::IF, &[Reg::T0.index() as u64, 40]);
        assert_eq!(state.pc(), 21);
    }

    #[test]
    fn call_links_return_address() {
        let mut state = State::new();
        state.set_pc(7);
        run(&mut state, OpKind::CALL, &[0x30]);
        assert_eq!(state.pc(), 0x30);
        assert_eq!(state.get(Reg::RA), 8);
        run(&mut state, OpKind::RET, &[]);
        assert_eq!(state.pc(), 8);
    }
}
