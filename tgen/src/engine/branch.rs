use log::debug;

use super::{Adapter, AdapterIterator, Engine, Parameter, SequenceSelector};
use crate::context::Context;
use crate::error::Result;
use crate::iter::{CollectionIterator, LazyIterator, ProductIterator, TakeIterator};
use crate::preparator::expand_ref;
use crate::template::{ArgMode, Attr, Attrs, Call, Primitive, PreparatorRef, Sequence, Value};

/// Enumerates taken and not-taken outcomes of the selected branches and
/// prepares their conditions accordingly.
pub struct BranchEngine {
    trace_count_limit: Parameter<i64>,
    taken_value: Parameter<i64>,
    not_taken_value: Parameter<i64>,
}

impl Default for BranchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchEngine {
    pub const ID: &'static str = "branch";

    pub fn new() -> Self {
        BranchEngine {
            trace_count_limit: Parameter::new("trace_count_limit", -1),
            taken_value: Parameter::new("taken_value", 0),
            not_taken_value: Parameter::new("not_taken_value", 1),
        }
    }

    fn control(&self, ctx: &mut Context, branch: &Call, cond: &Primitive, taken: bool) -> Result<Vec<Call>> {
        let value = if taken {
            *self.taken_value.get()
        } else {
            *self.not_taken_value.get()
        };
        let width = ctx.model.data_width(cond);
        let reference = PreparatorRef::new(cond.clone(), Value::Fixed(value as u64), width);
        let mut calls = expand_ref(ctx, &reference, false)?;
        if let Some(first) = calls.first_mut() {
            first.depends_on = Some(branch.id);
        }
        Ok(calls)
    }
}

/// First addressing mode the branch reads.
fn condition(prim: &Primitive) -> Option<&Primitive> {
    prim.args.values().find_map(|arg| match &arg.value {
        Value::Mode(mode) if arg.mode != ArgMode::Out => Some(mode),
        _ => None,
    })
}

#[derive(Debug, Clone)]
struct Branch {
    local: usize,
    outcomes: Vec<bool>,
    controls: Vec<Vec<Call>>,
}

impl Engine for BranchEngine {
    fn id(&self) -> &str {
        Self::ID
    }

    fn selector(&self) -> SequenceSelector {
        SequenceSelector::new(Self::ID, false)
    }

    fn configure(&mut self, attrs: &Attrs) -> Result<()> {
        self.trace_count_limit.configure(attrs)?;
        self.taken_value.configure(attrs)?;
        self.not_taken_value.configure(attrs)
    }

    fn solve(&mut self, ctx: &mut Context, selected: Sequence) -> Result<Box<dyn LazyIterator<Sequence>>> {
        let mut branches = vec![];
        for (local, call) in selected.calls.iter().enumerate() {
            if !selected.flags[local] {
                continue;
            }
            let Some(prim) = call.primitive() else {
                continue;
            };
            let (outcomes, controls) = match condition(prim) {
                Some(cond) => (
                    vec![true, false],
                    vec![
                        self.control(ctx, call, cond, true)?,
                        self.control(ctx, call, cond, false)?,
                    ],
                ),
                None => (vec![true], vec![vec![]]),
            };
            branches.push(Branch {
                local,
                outcomes,
                controls,
            });
        }
        debug!("{} branch(es) selected", branches.len());

        let choices = branches
            .iter()
            .map(|b| CollectionIterator::new((0..b.outcomes.len()).collect::<Vec<usize>>()))
            .collect();
        let traces = AdapterIterator::new(
            ProductIterator::<usize, _>::new(choices),
            BranchAdapter {
                base: selected,
                branches,
            },
        );
        let traces: Box<dyn LazyIterator<Sequence>> =
            match usize::try_from(*self.trace_count_limit.get()) {
                Ok(limit) => Box::new(TakeIterator::new(traces, limit)),
                Err(_) => Box::new(traces),
            };
        Ok(traces)
    }
}

/// Writes one outcome per branch into the selected sub-sequence.
#[derive(Debug, Clone)]
struct BranchAdapter {
    base: Sequence,
    branches: Vec<Branch>,
}

impl Adapter<Vec<usize>> for BranchAdapter {
    fn adapt(&self, choice: Vec<usize>) -> Sequence {
        let mut seq = self.base.clone();
        for (branch, c) in self.branches.iter().zip(choice) {
            seq.prologues[branch.local] = branch.controls[c].clone();
            seq.calls[branch.local]
                .attrs
                .insert("taken".to_string(), Attr::Bool(branch.outcomes[c]));
        }
        seq
    }
}
