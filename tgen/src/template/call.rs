use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::attr::{Attr, Attrs};
use super::primitive::{Data, Primitive, Value};
use crate::error::Result;
use crate::label::{Label, LabelRef};

/// Template-time identities. Generation renumbers calls from its context.
static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a call. Clones keep the id of their original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    pub fn fresh() -> Self {
        CallId(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Call identities of one generation context.
#[derive(Debug, Clone, Default)]
pub struct CallIds {
    issued: u64,
}

impl CallIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> CallId {
        self.issued += 1;
        CallId(self.issued)
    }

    /// Gives every call, nested ones included, a new identity and keeps the
    /// dependencies between them. A dependency on a call outside `calls`
    /// gets an identity no call carries.
    pub fn renumber(&mut self, calls: &mut [Call]) {
        let mut renamed = HashMap::new();
        self.stamp(calls, &mut renamed);
        self.relink(calls, &mut renamed);
    }

    fn stamp(&mut self, calls: &mut [Call], renamed: &mut HashMap<CallId, CallId>) {
        for call in calls.iter_mut() {
            let id = self.next();
            renamed.insert(call.id, id);
            call.id = id;
            if let Body::Atomic(inner) = &mut call.body {
                self.stamp(inner, renamed);
            }
        }
    }

    fn relink(&mut self, calls: &mut [Call], renamed: &mut HashMap<CallId, CallId>) {
        for call in calls.iter_mut() {
            if let Some(old) = call.depends_on {
                let id = match renamed.get(&old) {
                    Some(id) => *id,
                    None => {
                        let id = self.next();
                        renamed.insert(old, id);
                        id
                    }
                };
                call.depends_on = Some(id);
            }
            if let Body::Atomic(inner) = &mut call.body {
                self.relink(inner, renamed);
            }
        }
    }
}

/// Request to load `value` into the `target` mode through a preparator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparatorRef {
    pub target: Value,
    pub value: Value,
    pub width: u32,
    pub preparator: Option<String>,
    pub variant: Option<String>,
}

impl PreparatorRef {
    pub fn new(target: Primitive, value: Value, width: u32) -> Self {
        PreparatorRef {
            target: Value::Mode(target),
            value,
            width,
            preparator: None,
            variant: None,
        }
    }

    fn bind(&mut self, target: &Primitive, data: &Data) -> Result<()> {
        for value in [&mut self.target, &mut self.value] {
            match value {
                Value::Mode(p) | Value::Op(p) => p.bind(target, data)?,
                value => super::primitive::bind_value(value, target, data)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Op(Primitive),
    Preparator(PreparatorRef),
    Text(String),
    Comment(String),
    Origin(u64),
    Align(u64),
    Data(Vec<u64>),
    Atomic(Vec<Call>),
    /// Releases the listed modes back to the allocator.
    Free(Vec<Primitive>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub id: CallId,
    pub body: Body,
    pub labels: Vec<Label>,
    pub outputs: Vec<String>,
    pub attrs: Attrs,
    pub depends_on: Option<CallId>,
    pub depends_on_index: Option<usize>,
}

impl Call {
    pub fn new(body: Body) -> Self {
        Call {
            id: CallId::fresh(),
            body,
            labels: vec![],
            outputs: vec![],
            attrs: Attrs::new(),
            depends_on: None,
            depends_on_index: None,
        }
    }

    pub fn op(prim: Primitive) -> Self {
        Self::new(Body::Op(prim))
    }

    pub fn label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<Attr>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn output(mut self, text: &str) -> Self {
        self.outputs.push(text.to_string());
        self
    }

    pub fn depends_on(mut self, other: &Call) -> Self {
        self.depends_on = Some(other.id);
        self
    }

    pub fn primitive(&self) -> Option<&Primitive> {
        match &self.body {
            Body::Op(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.body, Body::Op(_))
    }

    pub fn label_refs(&self) -> Vec<&LabelRef> {
        match &self.body {
            Body::Op(p) => p.label_refs(),
            Body::Atomic(calls) => calls.iter().flat_map(|c| c.label_refs()).collect(),
            _ => vec![],
        }
    }

    /// Every primitive reachable from this call, nested calls included.
    pub fn try_for_each_primitive(
        &mut self,
        f: &mut dyn FnMut(&mut Primitive) -> Result<()>,
    ) -> Result<()> {
        match &mut self.body {
            Body::Op(p) => p.try_visit_mut(f),
            Body::Preparator(r) => match &mut r.target {
                Value::Mode(p) => p.try_visit_mut(f),
                _ => Ok(()),
            },
            Body::Atomic(calls) => calls
                .iter_mut()
                .try_for_each(|c| c.try_for_each_primitive(&mut *f)),
            _ => Ok(()),
        }
    }

    /// Label definitions and references of this call and its nested calls.
    pub fn try_for_each_label(
        &mut self,
        def: &mut dyn FnMut(&mut Label) -> Result<()>,
        refer: &mut dyn FnMut(&mut LabelRef) -> Result<()>,
    ) -> Result<()> {
        self.labels.iter_mut().try_for_each(&mut *def)?;
        match &mut self.body {
            Body::Op(p) => p.try_for_each_value(&mut |value| match value {
                Value::Label(r) => refer(r),
                _ => Ok(()),
            }),
            Body::Atomic(calls) => calls
                .iter_mut()
                .try_for_each(|c| c.try_for_each_label(&mut *def, &mut *refer)),
            _ => Ok(()),
        }
    }

    /// Substitutes preparator placeholders throughout the call.
    pub fn bind(&mut self, target: &Primitive, data: &Data) -> Result<()> {
        match &mut self.body {
            Body::Op(p) => p.bind(target, data),
            Body::Preparator(r) => r.bind(target, data),
            Body::Atomic(calls) => calls.iter_mut().try_for_each(|c| c.bind(target, data)),
            _ => Ok(()),
        }
    }
}

/// Inlines nested atomic sub-sequences. Labels and dependencies of an
/// atomic call move to its first inner call.
pub fn flatten(calls: Vec<Call>) -> Vec<Call> {
    let mut out = Vec::with_capacity(calls.len());
    for call in calls {
        match call.body {
            Body::Atomic(inner) => {
                let mut inner = flatten(inner);
                match inner.first_mut() {
                    Some(first) => {
                        let mut labels = call.labels;
                        labels.append(&mut first.labels);
                        first.labels = labels;
                        first.depends_on = first.depends_on.or(call.depends_on);
                        out.extend(inner);
                    }
                    None if !call.labels.is_empty() => {
                        out.push(Call::new(Body::Empty).with_labels(call.labels));
                    }
                    None => {}
                }
            }
            body => out.push(Call { body, ..call }),
        }
    }
    out
}

impl Call {
    fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }
}
