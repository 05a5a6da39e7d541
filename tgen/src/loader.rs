//! YAML template front-end.
//!
//! A template is a tree of nodes. Each node is a plain call list, an
//! `iterate` list or a nested `block`:
//!
//! ```yaml
//! combinator: product
//! nodes:
//!   - calls:
//!       - op: addi
//!         args: { rd: { mode: reg, i: 8 }, rs1: { mode: reg, i: 8 }, imm: 1 }
//!         situation: overflow
//! ```
//!
//! Immediate words: `?` (unknown), `?free`/`?used`/`?random` (allocated),
//! `@name` (label), `[min..max]` (random), `$target`, `$target.arg` and
//! `$value[hi:lo]` (preparator placeholders).

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::allocator::{AllocationRequest, Strategy};
use crate::context::{Context, Stream};
use crate::error::{Error, Result};
use crate::isa::Model;
use crate::label::{BlockId, Label, LabelKind, LabelRef};
use crate::preparator::{ArgFilter, Preparator};
use crate::template::{
    ArgMode, Attrs, Block, Body, Call, CallId, Lazy, Node, PreparatorRef, Primitive, Situation,
    Unknown, Value,
};
use crate::testdata::TestData;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateDef {
    pub attrs: Attrs,
    pub combinator: Option<String>,
    pub compositor: Option<String>,
    pub preparators: Vec<PreparatorDef>,
    pub allocation: Vec<AllocationDef>,
    pub streams: IndexMap<String, ModeDef>,
    pub nodes: Vec<NodeDef>,
}

/// One of `calls`, `iterate` or `block`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeDef {
    pub calls: Option<Vec<CallDef>>,
    pub iterate: Option<Vec<NodeDef>>,
    pub block: Option<BlockDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockDef {
    pub attrs: Attrs,
    pub combinator: Option<String>,
    pub compositor: Option<String>,
    pub nodes: Vec<NodeDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallDef {
    pub id: Option<String>,
    pub depends_on: Option<String>,
    pub label: Option<String>,
    pub labels: Vec<String>,
    pub global: Option<String>,
    pub weak: Option<String>,
    pub op: Option<String>,
    pub args: IndexMap<String, ArgDef>,
    pub situation: Option<SituationDef>,
    pub prepare: Option<PrepareDef>,
    pub text: Option<String>,
    pub comment: Option<String>,
    pub org: Option<u64>,
    pub align: Option<u64>,
    pub data: Option<Vec<u64>>,
    pub atomic: Option<Vec<CallDef>>,
    pub free: Option<Vec<ModeDef>>,
    pub output: Vec<String>,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgDef {
    Imm(u64),
    Word(String),
    Mode(ModeDef),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeDef {
    pub mode: String,
    #[serde(flatten)]
    pub args: IndexMap<String, ArgDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SituationDef {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        engine: Option<String>,
        #[serde(default)]
        provider: bool,
        #[serde(default)]
        attrs: Attrs,
        #[serde(default)]
        testdata: Option<IndexMap<String, u64>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrepareDef {
    pub target: ModeDef,
    pub value: ArgDef,
    pub width: Option<u32>,
    pub preparator: Option<String>,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreparatorDef {
    pub target: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub comparator: bool,
    #[serde(default)]
    pub mask: Vec<String>,
    #[serde(default)]
    pub args: IndexMap<String, FilterDef>,
    #[serde(default)]
    pub calls: Vec<CallDef>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterDef {
    Values(Vec<u64>),
    Range { min: u64, max: u64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDef {
    pub name: String,
    #[serde(default = "default_bias")]
    pub bias: u32,
    pub calls: Vec<CallDef>,
}

fn default_bias() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationDef {
    pub mode: String,
    pub arg: String,
    pub values: Vec<u64>,
}

// ----------------------------------------------------------------------------

/// Loaded template: the root block plus what it registers in the context.
#[derive(Debug, Clone)]
pub struct Template {
    pub root: Block,
    pub preparators: Vec<Preparator>,
    pub allocation: Vec<AllocationDef>,
    pub streams: IndexMap<String, Primitive>,
}

impl Template {
    pub fn load(fname: &str, model: &dyn Model) -> Result<Self> {
        let file = File::open(fname)?;
        let def: TemplateDef = serde_yaml::from_reader(BufReader::new(file))?;
        Builder { model }.template(def)
    }

    pub fn parse(text: &str, model: &dyn Model) -> Result<Self> {
        let def: TemplateDef = serde_yaml::from_str(text)?;
        Builder { model }.template(def)
    }

    /// Registers preparators, allocation tables and streams.
    pub fn install(&self, ctx: &mut Context) {
        for preparator in &self.preparators {
            ctx.preparators.add(preparator.clone());
        }
        for table in &self.allocation {
            ctx.allocator.add_table(&table.mode, &table.arg, table.values.clone());
        }
        for (name, index) in &self.streams {
            ctx.streams.insert(name.clone(), Stream { index: index.clone() });
        }
    }
}

struct Builder<'a> {
    model: &'a dyn Model,
}

impl Builder<'_> {
    fn template(&self, def: TemplateDef) -> Result<Template> {
        let block = BlockId::root();
        let preparators = def
            .preparators
            .into_iter()
            .map(|p| self.preparator(p, &block))
            .collect::<Result<Vec<_>>>()?;
        let streams = def
            .streams
            .into_iter()
            .map(|(name, mode)| Ok((name, self.mode(mode, &block)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        let root = self.block(
            BlockDef {
                attrs: def.attrs,
                combinator: def.combinator,
                compositor: def.compositor,
                nodes: def.nodes,
            },
            block,
        )?;
        Ok(Template {
            root,
            preparators,
            allocation: def.allocation,
            streams,
        })
    }

    fn block(&self, def: BlockDef, id: BlockId) -> Result<Block> {
        let mut block = Block::new(id.clone());
        block.attrs = def.attrs;
        block.combinator = def.combinator;
        block.compositor = def.compositor;
        let mut children = 0;
        block.nodes = def
            .nodes
            .into_iter()
            .map(|node| self.node(node, &id, &mut children))
            .collect::<Result<Vec<_>>>()?;
        Ok(block)
    }

    fn node(&self, def: NodeDef, block: &BlockId, children: &mut u32) -> Result<Node> {
        Ok(match def {
            NodeDef {
                calls: Some(calls),
                iterate: None,
                block: None,
            } => Node::Calls(self.calls(calls, block)?),
            NodeDef {
                calls: None,
                iterate: Some(nodes),
                block: None,
            } => Node::Iterate(
                nodes
                    .into_iter()
                    .map(|n| self.node(n, block, children))
                    .collect::<Result<Vec<_>>>()?,
            ),
            NodeDef {
                calls: None,
                iterate: None,
                block: Some(def),
            } => {
                *children += 1;
                Node::Block(self.block(def, block.child(*children))?)
            }
            _ => {
                return Err(Error::Template(
                    "a node takes exactly one of calls, iterate or block".to_string(),
                ))
            }
        })
    }

    fn calls(&self, defs: Vec<CallDef>, block: &BlockId) -> Result<Vec<Call>> {
        let mut ids: HashMap<String, CallId> = HashMap::new();
        defs.into_iter()
            .map(|def| self.call(def, block, &mut ids))
            .collect()
    }

    fn call(&self, def: CallDef, block: &BlockId, ids: &mut HashMap<String, CallId>) -> Result<Call> {
        let body = if let Some(name) = &def.op {
            let mut prim = Primitive::op(name);
            for (arg, value) in def.args {
                let mode = self.model.arg_mode(name, &arg);
                let value = self.value(value, block)?;
                prim = prim.arg(&arg, value, mode);
            }
            prim.situation = def.situation.map(situation);
            Body::Op(prim)
        } else if let Some(prepare) = def.prepare {
            let target = self.mode(prepare.target, block)?;
            let width = prepare.width.unwrap_or_else(|| self.model.data_width(&target));
            let mut reference = PreparatorRef::new(target, self.value(prepare.value, block)?, width);
            reference.preparator = prepare.preparator;
            reference.variant = prepare.variant;
            Body::Preparator(reference)
        } else if let Some(text) = def.text {
            Body::Text(text)
        } else if let Some(text) = def.comment {
            Body::Comment(text)
        } else if let Some(addr) = def.org {
            Body::Origin(addr)
        } else if let Some(align) = def.align {
            Body::Align(align)
        } else if let Some(words) = def.data {
            Body::Data(words)
        } else if let Some(calls) = def.atomic {
            Body::Atomic(self.calls(calls, block)?)
        } else if let Some(modes) = def.free {
            Body::Free(
                modes
                    .into_iter()
                    .map(|m| self.mode(m, block))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            Body::Empty
        };

        let mut call = Call::new(body);
        let labels = def
            .label
            .into_iter()
            .chain(def.labels)
            .map(|name| Label::with_kind(&name, label_kind(&name)))
            .chain(def.global.map(|name| Label::with_kind(&name, LabelKind::Global)))
            .chain(def.weak.map(|name| Label::with_kind(&name, LabelKind::Weak)));
        for label in labels {
            call = call.label(label.in_block(block.clone()));
        }
        for text in &def.output {
            call = call.output(text);
        }
        call.attrs = def.attrs;

        if let Some(target) = def.depends_on {
            let id = ids
                .get(&target)
                .ok_or_else(|| Error::Template(format!("unknown call id '{target}'")))?;
            call.depends_on = Some(*id);
        }
        if let Some(name) = def.id {
            ids.insert(name, call.id);
        }
        Ok(call)
    }

    fn mode(&self, def: ModeDef, block: &BlockId) -> Result<Primitive> {
        def.args.into_iter().try_fold(Primitive::mode(&def.mode), |prim, (arg, value)| {
            Ok(prim.arg(&arg, self.value(value, block)?, ArgMode::In))
        })
    }

    fn value(&self, def: ArgDef, block: &BlockId) -> Result<Value> {
        match def {
            ArgDef::Imm(v) => Ok(Value::Fixed(v)),
            ArgDef::Mode(mode) => Ok(Value::Mode(self.mode(mode, block)?)),
            ArgDef::Word(word) => word_value(&word, block),
        }
    }

    fn preparator(&self, def: PreparatorDef, block: &BlockId) -> Result<Preparator> {
        let mut preparator = Preparator::new(&def.target, self.calls(def.calls, block)?);
        if let Some(name) = &def.name {
            preparator = preparator.name(name);
        }
        if def.comparator {
            preparator = preparator.comparator();
        }
        for mask in &def.mask {
            preparator = preparator.mask(mask);
        }
        for (arg, filter) in def.args {
            let filter = match filter {
                FilterDef::Values(values) => ArgFilter::Values(values),
                FilterDef::Range { min, max } => ArgFilter::Range { min, max },
            };
            preparator = preparator.arg(&arg, filter);
        }
        for variant in def.variants {
            let calls = self.calls(variant.calls, block)?;
            preparator = preparator.variant(&variant.name, variant.bias, calls);
        }
        Ok(preparator)
    }
}

fn situation(def: SituationDef) -> Situation {
    match def {
        SituationDef::Name(name) => Situation::new(&name),
        SituationDef::Full {
            name,
            engine,
            provider,
            attrs,
            testdata,
        } => Situation {
            name,
            engine,
            provider,
            attrs,
            testdata: testdata.map(|bindings| TestData {
                kind: "default".to_string(),
                bindings,
            }),
        },
    }
}

fn label_kind(name: &str) -> LabelKind {
    if name.chars().all(|c| c.is_ascii_digit()) {
        LabelKind::Numeric
    } else {
        LabelKind::Normal
    }
}

fn word_value(word: &str, block: &BlockId) -> Result<Value> {
    let bad = || Error::Template(format!("cannot read argument '{word}'"));
    if let Some(rest) = word.strip_prefix('?') {
        if rest.is_empty() {
            return Ok(Value::unknown());
        }
        let strategy: Strategy = rest.parse().map_err(|_| bad())?;
        return Ok(Value::Unknown(Unknown {
            value: None,
            allocation: Some(AllocationRequest::new(strategy)),
        }));
    }
    if let Some(name) = word.strip_prefix('@') {
        return Ok(Value::Label(LabelRef::new(name).in_block(block.clone())));
    }
    if let Some(range) = word.strip_prefix('[').and_then(|w| w.strip_suffix(']')) {
        let (min, max) = range.split_once("..").ok_or_else(bad)?;
        let min = number(min).ok_or_else(bad)?;
        let max = number(max).ok_or_else(bad)?;
        if min > max {
            return Err(Error::Template(format!("empty range '{word}'")));
        }
        return Ok(Value::Random { min, max });
    }
    if word == "$target" {
        return Ok(Value::Lazy(Lazy::Target));
    }
    if let Some(arg) = word.strip_prefix("$target.") {
        return Ok(Value::Lazy(Lazy::TargetArg(arg.to_string())));
    }
    if word == "$value" {
        return Ok(Value::Lazy(Lazy::Value { lo: 0, hi: 63 }));
    }
    if let Some(bits) = word.strip_prefix("$value[").and_then(|w| w.strip_suffix(']')) {
        let (hi, lo) = bits.split_once(':').ok_or_else(bad)?;
        let hi = number(hi).ok_or_else(bad)? as u32;
        let lo = number(lo).ok_or_else(bad)? as u32;
        return Ok(Value::Lazy(Lazy::Value { lo, hi }));
    }
    number(word).map(Value::Fixed).ok_or_else(bad)
}

/// Decimal or `0x` hex.
fn number(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
