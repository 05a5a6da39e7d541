//! Turns symbolic sequences into concrete code by presimulation.

pub mod entry;
pub mod executor;
pub mod init;

pub use entry::{CallEntries, CallEntry};
pub use executor::{Executor, Listener, NoopListener};
pub use init::{InitializerMaker, PreparatorMaker};

use std::collections::VecDeque;

use log::{debug, warn};

use crate::concrete::{ConcreteCall, ConcreteSequence, SelfCheck};
use crate::context::{Context, RunState};
use crate::error::{Error, Result};
use crate::iter::LazyIterator;
use crate::label::manager::numeric;
use crate::label::LabelKind;
use crate::preparator::expand_ref;
use crate::template::{Body, Call, Data, Primitive, PreparatorRef, Sequence, Value};
use crate::testdata;
use init::Generation;

/// Lazy stream of concrete sequences. Not forkable: every step changes the
/// context.
pub struct SequenceConcretizer<'a> {
    ctx: &'a mut Context,
    source: Box<dyn LazyIterator<Sequence>>,
    presim: bool,
    snapshot: RunState,
    pending: VecDeque<Sequence>,
    current: Option<ConcreteSequence>,
    error: Option<Error>,
}

impl<'a> SequenceConcretizer<'a> {
    pub fn new(ctx: &'a mut Context, source: Box<dyn LazyIterator<Sequence>>, presim: bool) -> Self {
        let snapshot = ctx.snapshot();
        SequenceConcretizer {
            ctx,
            source,
            presim,
            snapshot,
            pending: VecDeque::new(),
            current: None,
            error: None,
        }
    }

    /// Error that stopped the stream.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn advance(&mut self) {
        self.current = None;
        while self.error.is_none() {
            let index = self.ctx.sequence_index;
            if let Some(seq) = self.pending.pop_front() {
                self.ctx.restore_allocator(&self.snapshot);
                match concretize(self.ctx, seq, self.presim) {
                    Ok(concrete) => self.current = Some(concrete),
                    Err(err) => self.error = Some(Error::aborted(index, err)),
                }
                return;
            }
            if !self.source.has_value() {
                return;
            }
            let mut seq = self.source.value();
            self.source.next();
            let bound = seq
                .resolve_dependencies()
                .and_then(|_| testdata::bind(self.ctx, &seq));
            match bound {
                Ok(sequences) => self.pending.extend(sequences),
                Err(err) => self.error = Some(Error::aborted(index, err)),
            }
        }
    }
}

impl LazyIterator<ConcreteSequence> for SequenceConcretizer<'_> {
    fn init(&mut self) {
        self.ctx.restore(&self.snapshot);
        self.pending.clear();
        self.error = None;
        self.source.init();
        self.advance();
    }

    fn has_value(&self) -> bool {
        self.current.is_some()
    }

    fn value(&self) -> ConcreteSequence {
        self.current.clone().unwrap_or_default()
    }

    fn next(&mut self) {
        self.advance();
    }

    fn stop(&mut self) {
        self.source.stop();
    }
}

// ----------------------------------------------------------------------------

fn concretize(ctx: &mut Context, seq: Sequence, presim: bool) -> Result<ConcreteSequence> {
    let index = ctx.sequence_index;
    ctx.sequence_index += 1;

    let mut calls = build(ctx, &seq.calls, index)?;
    let start = ctx.code.address;
    place(ctx, &mut calls)?;
    let start = calls.first().map_or(start, |c| c.address);
    let end = ctx.code.address;
    debug!("sequence {index}: 0x{start:04X}..0x{end:04X}");

    let mut out = ConcreteSequence {
        index,
        calls,
        start,
        end,
        ..Default::default()
    };
    if presim {
        let expected = presimulate(ctx, &mut out)?;
        for (mode, value) in expected {
            out.self_checks.push(self_check(ctx, mode, value, index)?);
        }
    }

    for call in out.prologue.iter_mut().chain(out.calls.iter_mut()) {
        render(ctx, call)?;
    }
    for check in out.self_checks.iter_mut() {
        for call in check.calls.iter_mut() {
            render(ctx, call)?;
        }
    }
    Ok(out)
}

/// Runs the sequence on a scratch state, generating data and initializers
/// on the way. Returns the expected values of written modes when
/// self-checks are on.
fn presimulate(ctx: &mut Context, seq: &mut ConcreteSequence) -> Result<Vec<(Primitive, u64)>> {
    ctx.model.use_temp_state(true);
    let result = run(ctx, seq);
    ctx.model.use_temp_state(false);
    result
}

fn run(ctx: &mut Context, seq: &mut ConcreteSequence) -> Result<Vec<(Primitive, u64)>> {
    let mut generation = Generation::new(&seq.calls, seq.index);
    let executor = Executor::new(&seq.calls, seq.start, seq.end);
    executor.run(ctx, &mut seq.calls, &mut generation)?;
    generation.finish(ctx, &mut seq.calls)?;
    seq.prologue = std::mem::take(&mut generation.prologue);

    if !ctx.options.self_checks {
        return Ok(vec![]);
    }
    let mut expected = vec![];
    for mode in written_modes(&seq.calls) {
        if !mode.is_fixed() {
            warn!("{mode} is not fixed; no self-check");
            continue;
        }
        let value = ctx.model.read(&mode)?;
        expected.push((mode, value));
    }
    Ok(expected)
}

/// Distinct modes written by the calls, in first-seen order.
fn written_modes(calls: &[ConcreteCall]) -> Vec<Primitive> {
    let mut modes: Vec<Primitive> = vec![];
    for prim in calls.iter().filter_map(|c| c.prim.as_ref()) {
        prim.visit(&mut |node| {
            for arg in node.args.values() {
                if let (true, Value::Mode(mode)) = (arg.mode.is_write(), &arg.value) {
                    if !modes.iter().any(|m| m.same_as(mode)) {
                        modes.push(mode.clone());
                    }
                }
            }
        });
    }
    modes
}

fn self_check(ctx: &mut Context, mode: Primitive, expected: u64, sequence: usize) -> Result<SelfCheck> {
    let width = ctx.model.data_width(&mode);
    let reference = PreparatorRef::new(mode.clone(), Value::Fixed(expected), width);
    let data = Data::new(expected, width);
    let calls = if ctx.preparators.find(&mode, &data, None, true).is_some() {
        let symbolic = expand_ref(ctx, &reference, true)?;
        let mut calls = build(ctx, &symbolic, sequence)?;
        place(ctx, &mut calls)?;
        calls
    } else {
        vec![]
    };
    Ok(SelfCheck {
        mode,
        expected,
        calls,
    })
}

/// One concrete call per symbolic call. Random immediates are drawn here.
pub(crate) fn build(ctx: &mut Context, calls: &[Call], sequence: usize) -> Result<Vec<ConcreteCall>> {
    calls
        .iter()
        .map(|call| build_call(ctx, call, sequence))
        .collect()
}

fn build_call(ctx: &mut Context, call: &Call, sequence: usize) -> Result<ConcreteCall> {
    let mut concrete = ConcreteCall {
        labels: call.labels.clone(),
        outputs: call.outputs.clone(),
        depends_on: call.depends_on_index,
        ..Default::default()
    };
    for label in concrete.labels.iter_mut() {
        if matches!(label.kind, LabelKind::Normal | LabelKind::Global) {
            label.sequence = Some(sequence);
        }
    }

    match &call.body {
        Body::Op(prim) => {
            let mut prim = prim.clone();
            prim.try_for_each_value(&mut |value| {
                match value {
                    Value::Random { min, max } => {
                        *value = Value::Fixed(Value::draw(*min, *max, &mut ctx.rng)?);
                    }
                    Value::Label(r) => r.sequence = Some(sequence),
                    _ => {}
                }
                Ok(())
            })?;
            concrete.size = ctx.model.size_of(&prim)?;
            concrete.prim = Some(prim);
        }
        Body::Text(text) => concrete.text = text.clone(),
        Body::Comment(text) => concrete.text = format!("// {text}"),
        Body::Origin(addr) => {
            concrete.origin = Some(*addr);
            concrete.text = format!(".org 0x{addr:04X}");
        }
        Body::Align(align) => {
            concrete.align = Some(*align);
            concrete.text = format!(".align {align}");
        }
        Body::Data(words) => {
            concrete.size = words.len() as u64;
            concrete.data = words.clone();
            let words: Vec<String> = words.iter().map(|w| format!("0x{w:04X}")).collect();
            concrete.text = format!(".data {}", words.join(", "));
        }
        Body::Free(modes) => {
            let modes: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
            concrete.text = format!("// free {}", modes.join(", "));
        }
        Body::Empty => {}
        Body::Preparator(_) | Body::Atomic(_) => {
            return Err(Error::MalformedPrimitive(format!(
                "call {:?} was not expanded before concretization",
                call.id
            )))
        }
    }
    Ok(concrete)
}

/// Assigns addresses, registers labels and patches label references.
pub(crate) fn place(ctx: &mut Context, calls: &mut [ConcreteCall]) -> Result<()> {
    ctx.code.allocate(calls)?;
    for call in calls.iter() {
        for label in &call.labels {
            ctx.labels.add(label.clone(), call.address)?;
        }
    }
    for call in calls.iter_mut() {
        let address = call.address;
        if let Some(prim) = call.prim.as_mut() {
            prim.try_for_each_value(&mut |value| {
                if let Value::Label(r) = value {
                    r.target = match ctx.labels.resolve_at(r, address) {
                        Some(target) if numeric(&r.name).is_some() => Some((r.name.clone(), target.address)),
                        Some(target) => Some((target.label.unique_name(), target.address)),
                        None => {
                            warn!("Label '{}' is not defined; using address 0", r.name);
                            Some((r.name.clone(), 0))
                        }
                    };
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn render(ctx: &Context, call: &mut ConcreteCall) -> Result<()> {
    let Some(prim) = call.prim.as_mut() else {
        return Ok(());
    };
    if !prim.is_fixed() {
        debug!("{prim} has unassigned values; printing them as 0");
        prim.try_for_each_value(&mut |value| {
            if value.as_imm().is_none() {
                *value = Value::Fixed(0);
            }
            Ok(())
        })?;
    }
    call.text = ctx.model.text_of(prim)?;
    Ok(())
}
