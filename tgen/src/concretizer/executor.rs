use bimap::BiMap;
use log::trace;

use crate::code::Code;
use crate::concrete::ConcreteCall;
use crate::context::Context;
use crate::error::{Error, Result};

/// Hooks around every executed call.
pub trait Listener {
    fn before(&mut self, _ctx: &mut Context, _calls: &mut [ConcreteCall], _index: usize) -> Result<()> {
        Ok(())
    }

    fn after(&mut self, _ctx: &mut Context, _calls: &mut [ConcreteCall], _index: usize) -> Result<()> {
        Ok(())
    }
}

pub struct NoopListener;

impl Listener for NoopListener {}

/// Runs concrete calls on the model, following control flow from `start`
/// until the program counter reaches `end`.
pub struct Executor {
    map: BiMap<u64, usize>,
    start: u64,
    end: u64,
}

impl Executor {
    pub fn new(calls: &[ConcreteCall], start: u64, end: u64) -> Self {
        let mut map = BiMap::new();
        for (index, call) in calls.iter().enumerate() {
            if call.is_executable() {
                // Later calls at an occupied address are unreachable by jumps.
                let _ = map.insert_no_overwrite(call.address, index);
            }
        }
        Executor { map, start, end }
    }

    pub fn index_of(&self, address: u64) -> Option<usize> {
        self.map.get_by_left(&address).copied()
    }

    /// First executable call after `index`.
    fn following(&self, index: Option<usize>, len: usize) -> Option<usize> {
        let from = index.map_or(0, |i| i + 1);
        (from..len).find(|i| self.map.contains_right(i))
    }

    /// Call to continue with once control leaves the sequence: the one
    /// after the last executed call, in address order while the code
    /// blocks are chained.
    fn resume(&self, code: &Code, calls: &[ConcreteCall], last: Option<usize>) -> Option<usize> {
        last.and_then(|i| code.next_address(calls[i].address).ok())
            .and_then(|address| self.index_of(address))
            .or_else(|| self.following(last, calls.len()))
    }

    pub fn run(
        &self,
        ctx: &mut Context,
        calls: &mut [ConcreteCall],
        listener: &mut dyn Listener,
    ) -> Result<()> {
        let limit = ctx.options.branch_exec_limit;
        let mut pc = self.start;
        let mut last = None;
        while pc != self.end {
            let index = match self.index_of(pc) {
                Some(index) => index,
                None => {
                    if ctx.code.code.has_address(pc) {
                        trace!("0x{pc:04X} is outside the sequence");
                    } else {
                        trace!("No code at 0x{pc:04X}");
                    }
                    match self.resume(&ctx.code.code, calls, last) {
                        Some(index) => index,
                        None => break,
                    }
                }
            };

            calls[index].exec_count += 1;
            if calls[index].exec_count > limit {
                let text = calls[index]
                    .prim
                    .as_ref()
                    .map_or_else(String::new, |p| p.to_string());
                return Err(Error::ExecutionLimit(text, limit));
            }

            listener.before(ctx, calls, index)?;
            let call = &calls[index];
            if let Some(prim) = &call.prim {
                ctx.model.set_pc(call.address);
                ctx.model.execute(prim)?;
            }
            listener.after(ctx, calls, index)?;

            last = Some(index);
            pc = ctx.model.pc();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::rk16::{self, op};
    use crate::template::Value;

    fn at(origin: Option<u64>, prim: crate::template::Primitive) -> ConcreteCall {
        ConcreteCall {
            prim: Some(prim),
            size: 1,
            origin,
            ..Default::default()
        }
    }

    #[test]
    fn leaving_resumes_in_address_order() {
        let mut ctx = rk16::context(Options::default());
        let mut calls = vec![
            at(Some(0x10), op("nop", vec![])),
            at(None, op("jump", vec![("imm", Value::Fixed(0x100))])),
            at(Some(0x20), op("nop", vec![])),
            at(Some(0x12), op("nop", vec![])),
        ];
        ctx.code.allocate(&mut calls).unwrap();
        assert_eq!(ctx.code.address, 0x13);
        assert_eq!(ctx.code.code.next_address(0x11).unwrap(), 0x12);

        let executor = Executor::new(&calls, 0x10, 0x13);
        executor.run(&mut ctx, &mut calls, &mut NoopListener).unwrap();
        let counts: Vec<usize> = calls.iter().map(|c| c.exec_count).collect();
        assert_eq!(counts, vec![1, 1, 0, 1]);
    }

    #[test]
    fn gap_after_alignment_falls_to_next_call() {
        let mut ctx = rk16::context(Options::default());
        let mut calls = vec![at(None, op("nop", vec![])), at(None, op("nop", vec![]))];
        calls[1].align = Some(4);
        ctx.code.allocate(&mut calls).unwrap();
        assert!(!ctx.code.code.has_address(1));

        let executor = Executor::new(&calls, 0, 5);
        executor.run(&mut ctx, &mut calls, &mut NoopListener).unwrap();
        assert!(calls.iter().all(|c| c.exec_count == 1));
    }
}
