use std::collections::HashSet;

use log::{debug, warn};

use super::entry::CallEntries;
use super::executor::{Executor, Listener, NoopListener};
use super::{build, place};
use crate::concrete::ConcreteCall;
use crate::context::Context;
use crate::error::Result;
use crate::preparator::expand_ref;
use crate::template::{ArgMode, Call, Data, Primitive, PreparatorRef, Situation, Value};
use crate::testdata::{default_data, Query, TestData};

/// Produces the calls that put a value into an addressing mode.
pub trait InitializerMaker {
    fn make(&self, ctx: &mut Context, mode: &Primitive, data: Data, situation: Option<&Situation>) -> Result<Vec<Call>>;
}

/// Initializes through the registered preparators.
pub struct PreparatorMaker;

impl InitializerMaker for PreparatorMaker {
    fn make(&self, ctx: &mut Context, mode: &Primitive, data: Data, _: Option<&Situation>) -> Result<Vec<Call>> {
        let reference = PreparatorRef::new(mode.clone(), Value::Fixed(data.value), data.width);
        expand_ref(ctx, &reference, false)
    }
}

/// Mode to initialize with its value.
struct Init {
    mode: Primitive,
    data: Data,
}

/// Generates test data and initialization code while a sequence runs.
pub(crate) struct Generation {
    entries: CallEntries,
    initialized: HashSet<String>,
    sequence: usize,
    pub prologue: Vec<ConcreteCall>,
}

impl Generation {
    pub fn new(calls: &[ConcreteCall], sequence: usize) -> Self {
        Generation {
            entries: CallEntries::new(calls),
            initialized: HashSet::new(),
            sequence,
            prologue: vec![],
        }
    }

    /// Handles the entries that never executed.
    pub fn finish(&mut self, ctx: &mut Context, calls: &mut [ConcreteCall]) -> Result<()> {
        for index in self.entries.unvisited() {
            self.process(ctx, calls, index)?;
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut Context, calls: &mut [ConcreteCall], index: usize) -> Result<()> {
        let Some(mut prim) = calls[index].prim.take() else {
            return Ok(());
        };
        let mut inits = vec![];
        let generated = prim.try_visit_mut(&mut |node| generate(ctx, node, &mut inits));
        calls[index].prim = Some(prim);
        generated?;

        let situation = calls[index].prim.as_ref().and_then(|p| p.situation.clone());
        for init in inits {
            self.initialize(ctx, init, situation.as_ref())?;
        }
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut Context, init: Init, situation: Option<&Situation>) -> Result<()> {
        if !init.mode.is_fixed() {
            debug!("{} is not fixed; left uninitialized", init.mode);
            return Ok(());
        }
        if !self.initialized.insert(init.mode.to_string()) {
            return Ok(());
        }

        let kind = situation
            .and_then(|s| s.testdata.as_ref())
            .map_or("default", |t| t.kind.as_str());
        let maker = ctx.registry.maker(kind);
        let mut symbolic = maker.make(ctx, &init.mode, init.data, situation)?;
        ctx.allocator.allocate(&mut symbolic, false, &mut ctx.rng)?;
        let mut calls = build(ctx, &symbolic, self.sequence)?;
        let start = ctx.code.address;
        place(ctx, &mut calls)?;
        let end = ctx.code.address;

        let pc = ctx.model.pc();
        let stream = match situation.and_then(Situation::stream) {
            Some(name) => match ctx.streams.get(name).cloned() {
                Some(stream) => {
                    let saved = ctx.model.read(&stream.index)?;
                    Some((stream, saved))
                }
                None => {
                    warn!("Unknown stream '{name}'");
                    None
                }
            },
            None => None,
        };

        Executor::new(&calls, start, end).run(ctx, &mut calls, &mut NoopListener)?;

        ctx.model.set_pc(pc);
        if let Some((stream, saved)) = stream {
            ctx.model.write(&stream.index, saved)?;
        }
        debug!("{} initialized with 0x{}", init.mode, init.data.to_hex());
        self.prologue.extend(calls);
        Ok(())
    }
}

impl Listener for Generation {
    fn before(&mut self, ctx: &mut Context, calls: &mut [ConcreteCall], index: usize) -> Result<()> {
        if let Some(group) = self.entries.visit(index) {
            for i in group {
                self.process(ctx, calls, i)?;
            }
        }
        Ok(())
    }

    /// Modes the program writes already hold meaningful values.
    fn after(&mut self, _: &mut Context, calls: &mut [ConcreteCall], index: usize) -> Result<()> {
        if let Some(prim) = &calls[index].prim {
            prim.visit(&mut |node| {
                for arg in node.args.values() {
                    if let (true, Value::Mode(mode)) = (arg.mode.is_write(), &arg.value) {
                        self.initialized.insert(mode.to_string());
                    }
                }
            });
        }
        Ok(())
    }
}

/// Test data for one node of the tree, applied to its unknown immediates.
/// Modes that need a value are queued in `inits`.
fn generate(ctx: &mut Context, node: &mut Primitive, inits: &mut Vec<Init>) -> Result<()> {
    let data = match &node.situation {
        Some(s) if s.engine.is_some() => None,
        Some(Situation {
            testdata: Some(data),
            ..
        }) => Some(data.clone()),
        Some(s) => {
            let query = Query::new(node, ctx.model.as_ref());
            let found = query.ask(ctx.testbase.as_mut())?;
            match found.into_iter().next() {
                Some(data) => Some(data),
                None if ctx.options.default_test_data => {
                    warn!("No test data for situation '{}'; using random data", s.name);
                    Some(default_data(&query, &mut ctx.rng))
                }
                None => {
                    warn!("No test data for situation '{}'", s.name);
                    None
                }
            }
        }
        None if ctx.options.default_test_data => {
            let query = Query::new(node, ctx.model.as_ref());
            Some(default_data(&query, &mut ctx.rng))
        }
        None => None,
    };
    if let Some(data) = data {
        let prefix = node.name.clone();
        apply(ctx, &prefix, node, &data, inits);
    }
    Ok(())
}

fn apply(ctx: &Context, prefix: &str, node: &mut Primitive, data: &TestData, inits: &mut Vec<Init>) {
    for arg in node.args.values_mut() {
        let name = format!("{prefix}.{}", arg.name);
        match &mut arg.value {
            Value::Unknown(unknown) if unknown.value.is_none() => {
                unknown.value = data.bindings.get(&name).copied();
            }
            Value::Mode(mode) => {
                apply(ctx, &name, mode, data, inits);
                if arg.mode != ArgMode::Out {
                    if let Some(value) = data.bindings.get(&name) {
                        let width = ctx.model.data_width(mode);
                        inits.push(Init {
                            mode: mode.clone(),
                            data: Data::new(*value, width),
                        });
                    }
                }
            }
            Value::Op(op) => apply(ctx, &name, op, data, inits),
            _ => {}
        }
    }
}
