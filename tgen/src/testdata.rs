//! Test data: knowledge-base queries and their binding onto sequences.

use indexmap::IndexMap;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::Rng;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::isa::Model;
use crate::iter::{drain, CollectionIterator, CombinatorKind};
use crate::template::{ArgMode, Attrs, Call, Primitive, Sequence, Value};

/// Values for `prefix.arg` paths of one primitive. `kind` picks the
/// initializer maker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestData {
    pub kind: String,
    pub bindings: IndexMap<String, u64>,
}

impl TestData {
    pub fn new(kind: &str) -> Self {
        TestData {
            kind: kind.to_string(),
            bindings: IndexMap::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: u64) -> Self {
        self.bindings.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Known(u64),
    Free { width: u32 },
}

/// Constraint query for one situation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub situation: String,
    pub attrs: Attrs,
    pub bindings: IndexMap<String, Binding>,
}

impl Query {
    pub fn new(prim: &Primitive, model: &dyn Model) -> Self {
        let (situation, attrs) = match &prim.situation {
            Some(s) => (s.name.clone(), s.attrs.clone()),
            None => (String::new(), Attrs::new()),
        };
        let mut bindings = IndexMap::new();
        collect(&prim.name, prim, model, &mut bindings);
        Query {
            situation,
            attrs,
            bindings,
        }
    }

    pub fn free(&self) -> impl Iterator<Item = (&str, u32)> {
        self.bindings.iter().filter_map(|(name, b)| match b {
            Binding::Free { width } => Some((name.as_str(), *width)),
            Binding::Known(_) => None,
        })
    }

    /// Runs the query, reporting knowledge-base failures against the
    /// situation.
    pub fn ask(&self, testbase: &mut dyn TestBase) -> Result<Vec<TestData>> {
        testbase.execute(self).map_err(|err| match err {
            Error::Query(..) => err,
            other => Error::Query(self.situation.clone(), other.to_string()),
        })
    }

    pub fn known(&self, name: &str) -> Option<u64> {
        match self.bindings.get(name) {
            Some(Binding::Known(v)) => Some(*v),
            _ => None,
        }
    }
}

fn collect(prefix: &str, prim: &Primitive, model: &dyn Model, out: &mut IndexMap<String, Binding>) {
    for arg in prim.args.values() {
        let name = format!("{prefix}.{}", arg.name);
        match &arg.value {
            Value::Mode(mode) => {
                if arg.mode != ArgMode::Out {
                    let width = model.data_width(mode);
                    out.insert(name.clone(), Binding::Free { width });
                }
                collect(&name, mode, model, out);
            }
            Value::Op(op) => collect(&name, op, model, out),
            Value::Unknown(unknown) if unknown.value.is_none() => {
                let width = model.arg_width(prim, &arg.name);
                out.insert(name, Binding::Free { width });
            }
            value => {
                if let Some(v) = value.as_imm() {
                    out.insert(name, Binding::Known(v));
                }
            }
        }
    }
}

/// Knowledge base answering situation queries.
pub trait TestBase {
    /// Solutions for the query. Empty means nothing matched.
    fn execute(&mut self, query: &Query) -> Result<Vec<TestData>>;
}

/// Random values for every free variable of the query.
pub fn default_data(query: &Query, rng: &mut StdRng) -> TestData {
    let mut data = TestData::new("default");
    for (name, width) in query.free() {
        let value = if width >= 64 {
            rng.gen()
        } else {
            rng.gen_range(0..(1u64 << width))
        };
        data.bindings.insert(name.to_string(), value);
    }
    data
}

// ----------------------------------------------------------------------------

/// Position of a provider situation: call index and bottom-up node ordinal.
type Slot = (usize, usize);

/// Queries every unbound provider situation of the sequence and returns one
/// copy of the sequence per combination of answers.
pub fn bind(ctx: &mut Context, seq: &Sequence) -> Result<Vec<Sequence>> {
    let mut slots: Vec<Slot> = vec![];
    let mut answers = vec![];
    for (index, call) in seq.calls.iter().enumerate() {
        let Some(prim) = call.primitive() else {
            continue;
        };
        let mut providers = vec![];
        let mut ordinal = 0;
        prim.visit(&mut |node| {
            if node
                .situation
                .as_ref()
                .is_some_and(|s| s.provider && s.testdata.is_none())
            {
                providers.push((ordinal, node));
            }
            ordinal += 1;
        });
        for (ordinal, node) in providers {
            let query = Query::new(node, ctx.model.as_ref());
            let found = query.ask(ctx.testbase.as_mut())?;
            if found.is_empty() {
                warn!("No test data for situation '{}' of {}", query.situation, node);
                continue;
            }
            debug!("{} solution(s) for situation '{}'", found.len(), query.situation);
            slots.push((index, ordinal));
            answers.push(CollectionIterator::new(found));
        }
    }
    if slots.is_empty() {
        return Ok(vec![seq.clone()]);
    }

    let combinator = CombinatorKind::parse(&ctx.options.testdata_combinator)?;
    let tuples = drain(&mut combinator.build(answers));
    tuples
        .into_iter()
        .map(|tuple| {
            let mut bound = seq.clone();
            for (&(index, ordinal), data) in slots.iter().zip(tuple) {
                assign(&mut bound.calls[index], ordinal, data)?;
            }
            Ok(bound)
        })
        .collect()
}

fn assign(call: &mut Call, ordinal: usize, data: TestData) -> Result<()> {
    let mut count = 0;
    let mut data = Some(data);
    call.try_for_each_primitive(&mut |node| {
        if count == ordinal {
            if let Some(s) = node.situation.as_mut() {
                s.testdata = data.take();
            }
        }
        count += 1;
        Ok(())
    })
}
