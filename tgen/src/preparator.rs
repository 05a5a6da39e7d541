//! Preparators: macros that load a value into an addressing mode.

use indexmap::IndexMap;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::template::{Body, Call, Data, Primitive, PreparatorRef, Value};

/// Bit mask over the hex image of the prepared value. `x` matches any digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(String);

impl Mask {
    pub fn new(text: &str) -> Self {
        Mask(text.to_ascii_uppercase())
    }

    pub fn matches(&self, image: &str) -> bool {
        self.0.len() == image.len()
            && self
                .0
                .chars()
                .zip(image.to_ascii_uppercase().chars())
                .all(|(m, c)| m == 'X' || m == c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgFilter {
    Values(Vec<u64>),
    Range { min: u64, max: u64 },
}

impl ArgFilter {
    fn accepts(&self, value: u64) -> bool {
        match self {
            ArgFilter::Values(values) => values.contains(&value),
            ArgFilter::Range { min, max } => (*min..=*max).contains(&value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub bias: u32,
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone)]
pub struct Preparator {
    /// Name of the target addressing mode.
    pub target: String,
    pub name: Option<String>,
    pub comparator: bool,
    pub masks: Vec<Mask>,
    pub args: IndexMap<String, ArgFilter>,
    pub calls: Vec<Call>,
    pub variants: Vec<Variant>,
    series: String,
}

impl Preparator {
    pub fn new(target: &str, calls: Vec<Call>) -> Self {
        Preparator {
            target: target.to_string(),
            name: None,
            comparator: false,
            masks: vec![],
            args: IndexMap::new(),
            calls,
            variants: vec![],
            series: String::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn comparator(mut self) -> Self {
        self.comparator = true;
        self
    }

    pub fn mask(mut self, mask: &str) -> Self {
        self.masks.push(Mask::new(mask));
        self
    }

    pub fn arg(mut self, name: &str, filter: ArgFilter) -> Self {
        self.args.insert(name.to_string(), filter);
        self
    }

    pub fn variant(mut self, name: &str, bias: u32, calls: Vec<Call>) -> Self {
        self.variants.push(Variant {
            name: name.to_string(),
            bias,
            calls,
        });
        self
    }

    /// Used when nothing more specific matches.
    pub fn is_default(&self) -> bool {
        self.masks.is_empty() && self.args.is_empty()
    }

    fn matches(&self, target: &Primitive, data: &Data, name: Option<&str>) -> bool {
        if name.is_some() && self.name.as_deref() != name {
            return false;
        }
        if !self.masks.is_empty() {
            let image = data.to_hex();
            if !self.masks.iter().any(|m| m.matches(&image)) {
                return false;
            }
        }
        self.args
            .iter()
            .all(|(arg, filter)| target.imm(arg).is_some_and(|v| filter.accepts(v)))
    }

    /// Template calls with the variant chosen.
    fn select(&self, variant: Option<&str>, rng: &mut StdRng) -> &[Call] {
        if let Some(name) = variant {
            match self.variants.iter().find(|v| v.name == name) {
                Some(v) => return &v.calls,
                None => warn!(
                    "Variant '{}' is not defined for the {} preparator; choosing at random",
                    name, self.target
                ),
            }
        }
        match self.variants.choose_weighted(rng, |v| v.bias) {
            Ok(v) => &v.calls,
            Err(_) => self.variants.first().map_or(&self.calls, |v| &v.calls),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Group {
    items: Vec<Preparator>,
    default: Option<Preparator>,
}

impl Group {
    fn find(&self, target: &Primitive, data: &Data, name: Option<&str>) -> Option<&Preparator> {
        self.items
            .iter()
            .find(|p| p.matches(target, data, name))
            .or(self.default.as_ref())
    }
}

/// Registered preparators and comparators, grouped by target mode.
#[derive(Debug, Clone, Default)]
pub struct PreparatorStore {
    preparators: IndexMap<String, Group>,
    comparators: IndexMap<String, Group>,
    count: usize,
}

impl PreparatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut preparator: Preparator) {
        preparator.series = format!("{}#{}", preparator.target, self.count);
        self.count += 1;
        let groups = if preparator.comparator {
            &mut self.comparators
        } else {
            &mut self.preparators
        };
        let group = groups.entry(preparator.target.clone()).or_default();
        if preparator.is_default() {
            if group.default.is_some() {
                debug!("default {} preparator replaced", preparator.target);
            }
            group.default = Some(preparator);
        } else {
            group.items.push(preparator);
        }
    }

    pub fn find(
        &self,
        target: &Primitive,
        data: &Data,
        name: Option<&str>,
        comparator: bool,
    ) -> Option<&Preparator> {
        let groups = if comparator {
            &self.comparators
        } else {
            &self.preparators
        };
        groups.get(&target.name)?.find(target, data, name)
    }
}

// ----------------------------------------------------------------------------

/// Replaces every preparator reference with the calls it expands to.
pub fn expand(ctx: &mut Context, calls: Vec<Call>) -> Result<Vec<Call>> {
    let mut out = Vec::with_capacity(calls.len());
    for call in calls {
        match call.body {
            Body::Preparator(reference) => {
                let mut expanded = expand_ref(ctx, &reference, false)?;
                if expanded.is_empty() && !call.labels.is_empty() {
                    expanded.push(Call::new(Body::Empty));
                }
                if let Some(first) = expanded.first_mut() {
                    // Dependents of the reference now point at its first call.
                    first.id = call.id;
                    let mut labels = call.labels;
                    labels.append(&mut first.labels);
                    first.labels = labels;
                    first.depends_on = first.depends_on.or(call.depends_on);
                    first.attrs.extend(call.attrs);
                }
                out.extend(expanded);
            }
            Body::Atomic(inner) => out.push(Call {
                body: Body::Atomic(expand(ctx, inner)?),
                ..call
            }),
            body => out.push(Call { body, ..call }),
        }
    }
    Ok(out)
}

/// Expands one reference: picks the preparator, binds its placeholders and
/// expands nested references under a new label scope.
pub fn expand_ref(ctx: &mut Context, reference: &PreparatorRef, comparator: bool) -> Result<Vec<Call>> {
    let Value::Mode(target) = &reference.target else {
        return Err(Error::MalformedPrimitive(format!(
            "preparator target must be an addressing mode: {}",
            reference.target
        )));
    };
    let value = match &reference.value {
        Value::Random { min, max } => Value::draw(*min, *max, &mut ctx.rng)?,
        value => value
            .as_imm()
            .ok_or_else(|| Error::UnassignedArgument(target.signature(), "value".to_string()))?,
    };
    let data = Data::new(value, reference.width);

    let preparator = ctx
        .preparators
        .find(target, &data, reference.preparator.as_deref(), comparator)
        .ok_or_else(|| Error::NoPreparator(target.signature()))?;
    let series = preparator.series.clone();
    let mut calls = preparator
        .select(reference.variant.as_deref(), &mut ctx.rng)
        .to_vec();
    debug!("expand {} with 0x{} ({})", target, data.to_hex(), series);

    for call in calls.iter_mut() {
        call.bind(target, &data)?;
    }
    ctx.ids.renumber(&mut calls);

    ctx.scopes.push(&series);
    let result = scope_labels(ctx, &mut calls).and_then(|_| expand(ctx, calls));
    ctx.scopes.pop()?;
    result
}

/// Defines every label first so that forward references are tagged too.
fn scope_labels(ctx: &mut Context, calls: &mut [Call]) -> Result<()> {
    for call in calls.iter_mut() {
        call.try_for_each_label(&mut |label| ctx.scopes.define(label), &mut |_| Ok(()))?;
    }
    for call in calls.iter_mut() {
        call.try_for_each_label(&mut |_| Ok(()), &mut |r| {
            ctx.scopes.refer(r);
            Ok(())
        })?;
    }
    Ok(())
}
