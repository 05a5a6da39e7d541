use std::fmt;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::situation::Situation;
use crate::allocator::AllocationRequest;
use crate::error::{Error, Result};
use crate::label::LabelRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Mode,
    Op,
}

/// Direction of an argument.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum ArgMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ArgMode {
    pub fn is_write(self) -> bool {
        matches!(self, ArgMode::Out | ArgMode::InOut)
    }
}

/// Immediate whose value is decided late: by the allocator, by test data or
/// by default data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unknown {
    pub value: Option<u64>,
    pub allocation: Option<AllocationRequest>,
}

/// Placeholder bound when a preparator is expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lazy {
    /// Bits `lo..=hi` of the prepared value.
    Value { lo: u32, hi: u32 },
    /// The prepared mode itself.
    Target,
    /// An argument of the prepared mode.
    TargetArg(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Fixed(u64),
    Random { min: u64, max: u64 },
    Unknown(Unknown),
    Lazy(Lazy),
    Label(LabelRef),
    Mode(Primitive),
    Op(Primitive),
}

impl Value {
    pub fn unknown() -> Self {
        Value::Unknown(Unknown::default())
    }

    /// Draws from `[min..max]`. An empty range is an error.
    pub fn draw(min: u64, max: u64, rng: &mut StdRng) -> Result<u64> {
        if min > max {
            return Err(Error::MalformedPrimitive(format!("empty random range [{min}..{max}]")));
        }
        Ok(rng.gen_range(min..=max))
    }

    /// Immediate value if it is already decided.
    pub fn as_imm(&self) -> Option<u64> {
        match self {
            Value::Fixed(v) => Some(*v),
            Value::Unknown(Unknown { value, .. }) => *value,
            Value::Label(r) => r.target.as_ref().map(|(_, addr)| *addr),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Mode(p) | Value::Op(p) => Some(p),
            _ => None,
        }
    }

    fn type_name(&self) -> &str {
        match self {
            Value::Fixed(_) | Value::Random { .. } | Value::Unknown(_) => "imm",
            Value::Lazy(_) => "lazy",
            Value::Label(_) => "label",
            Value::Mode(p) | Value::Op(p) => &p.name,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Fixed(v) => write!(f, "{v}"),
            Value::Random { min, max } => write!(f, "[{min}..{max}]"),
            Value::Unknown(Unknown { value: Some(v), .. }) => write!(f, "{v}"),
            Value::Unknown(Unknown { value: None, .. }) => write!(f, "?"),
            Value::Lazy(Lazy::Value { lo, hi }) => write!(f, "$value[{hi}:{lo}]"),
            Value::Lazy(Lazy::Target) => write!(f, "$target"),
            Value::Lazy(Lazy::TargetArg(name)) => write!(f, "$target.{name}"),
            Value::Label(r) => write!(f, "@{}", r.name),
            Value::Mode(p) | Value::Op(p) => write!(f, "{p}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
    pub mode: ArgMode,
}

/// Node of a call tree: an addressing mode or an operation with named
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub kind: Kind,
    pub name: String,
    pub args: IndexMap<String, Argument>,
    pub situation: Option<Situation>,
}

impl Primitive {
    pub fn new(kind: Kind, name: &str) -> Self {
        Primitive {
            kind,
            name: name.to_string(),
            args: IndexMap::new(),
            situation: None,
        }
    }

    pub fn mode(name: &str) -> Self {
        Self::new(Kind::Mode, name)
    }

    pub fn op(name: &str) -> Self {
        Self::new(Kind::Op, name)
    }

    pub fn arg(mut self, name: &str, value: Value, mode: ArgMode) -> Self {
        let name = name.to_string();
        self.args.insert(name.clone(), Argument { name, value, mode });
        self
    }

    pub fn with_situation(mut self, situation: Situation) -> Self {
        self.situation = Some(situation);
        self
    }

    /// `mode reg(i: imm)`
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .args
            .values()
            .map(|arg| format!("{}: {}", arg.name, arg.value.type_name()))
            .collect();
        format!("{} {}({})", self.kind, self.name, args.join(", "))
    }

    /// Same primitive with the same arguments. Situations are ignored.
    pub fn same_as(&self, other: &Primitive) -> bool {
        self.kind == other.kind && self.name == other.name && self.args == other.args
    }

    pub fn imm(&self, name: &str) -> Option<u64> {
        self.args.get(name).and_then(|arg| arg.value.as_imm())
    }

    /// Visits nested primitives first, then this one.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a Primitive)) {
        for arg in self.args.values() {
            if let Some(p) = arg.value.as_primitive() {
                p.visit(f);
            }
        }
        f(self);
    }

    /// Bottom-up like [`Primitive::visit`], stopping at the first error.
    pub fn try_visit_mut(&mut self, f: &mut dyn FnMut(&mut Primitive) -> Result<()>) -> Result<()> {
        for arg in self.args.values_mut() {
            if let Value::Mode(p) | Value::Op(p) = &mut arg.value {
                p.try_visit_mut(f)?;
            }
        }
        f(self)
    }

    /// Every leaf value of the tree, nested primitives included.
    pub fn try_for_each_value(&mut self, f: &mut dyn FnMut(&mut Value) -> Result<()>) -> Result<()> {
        for arg in self.args.values_mut() {
            match &mut arg.value {
                Value::Mode(p) | Value::Op(p) => p.try_for_each_value(f)?,
                value => f(value)?,
            }
        }
        Ok(())
    }

    pub fn label_refs(&self) -> Vec<&LabelRef> {
        let mut refs = Vec::new();
        self.visit(&mut |p| {
            for arg in p.args.values() {
                if let Value::Label(r) = &arg.value {
                    refs.push(r);
                }
            }
        });
        refs
    }

    pub fn is_fixed(&self) -> bool {
        self.args.values().all(|arg| match &arg.value {
            Value::Mode(p) | Value::Op(p) => p.is_fixed(),
            value => value.as_imm().is_some(),
        })
    }

    /// Substitutes preparator placeholders.
    pub fn bind(&mut self, target: &Primitive, data: &Data) -> Result<()> {
        self.try_for_each_value(&mut |value| bind_value(value, target, data))
    }
}

pub(crate) fn bind_value(value: &mut Value, target: &Primitive, data: &Data) -> Result<()> {
    if let Value::Lazy(lazy) = value {
        *value = match lazy {
            Lazy::Value { lo, hi } => Value::Fixed(data.bits(*lo, *hi)),
            Lazy::Target => Value::Mode(target.clone()),
            Lazy::TargetArg(name) => match target.args.get(name.as_str()) {
                Some(arg) => arg.value.clone(),
                None => {
                    return Err(Error::UnassignedArgument(
                        target.signature(),
                        name.to_string(),
                    ))
                }
            },
        };
    }
    Ok(())
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .args
            .values()
            .map(|arg| format!("{}: {}", arg.name, arg.value))
            .collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

// ----------------------------------------------------------------------------

/// Value handed to a preparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Data {
    pub value: u64,
    pub width: u32,
}

impl Data {
    pub fn new(value: u64, width: u32) -> Self {
        Data { value, width }
    }

    /// Zero-padded upper-case hex image, one digit per started nibble.
    pub fn to_hex(&self) -> String {
        let digits = (self.width as usize).div_ceil(4).max(1);
        format!("{:0digits$X}", self.masked())
    }

    pub fn bits(&self, lo: u32, hi: u32) -> u64 {
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        if lo >= 64 {
            return 0;
        }
        let len = hi - lo + 1;
        let mask = if len >= 64 { u64::MAX } else { (1 << len) - 1 };
        (self.value >> lo) & mask
    }

    fn masked(&self) -> u64 {
        if self.width >= 64 {
            self.value
        } else {
            self.value & ((1 << self.width) - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(i: Value) -> Primitive {
        Primitive::mode("reg").arg("i", i, ArgMode::In)
    }

    #[test]
    fn signature_names_argument_types() {
        assert_eq!(reg(Value::Fixed(3)).signature(), "mode reg(i: imm)");
        let add = Primitive::op("add")
            .arg("rd", Value::Mode(reg(Value::Fixed(1))), ArgMode::Out)
            .arg("rs1", Value::Mode(reg(Value::unknown())), ArgMode::In);
        assert_eq!(add.signature(), "op add(rd: reg, rs1: reg)");
        assert_eq!(add.to_string(), "add(rd: reg(i: 1), rs1: reg(i: ?))");
        assert!(!add.is_fixed());
    }

    #[test]
    fn visit_is_bottom_up() {
        let add = Primitive::op("add")
            .arg("rd", Value::Mode(reg(Value::Fixed(1))), ArgMode::Out)
            .arg("imm", Value::Fixed(2), ArgMode::In);
        let mut names = vec![];
        add.visit(&mut |p| names.push(p.name.clone()));
        assert_eq!(names, vec!["reg", "add"]);
    }

    #[test]
    fn bind_lazy_values() {
        let target = reg(Value::Fixed(9));
        let data = Data::new(0xABCD, 16);
        let mut load = Primitive::op("loadi")
            .arg("rd", Value::Lazy(Lazy::Target), ArgMode::Out)
            .arg("imm", Value::Lazy(Lazy::Value { lo: 8, hi: 15 }), ArgMode::In)
            .arg("idx", Value::Lazy(Lazy::TargetArg("i".into())), ArgMode::In);
        load.bind(&target, &data).unwrap();
        assert_eq!(load.args["rd"].value, Value::Mode(target.clone()));
        assert_eq!(load.imm("imm"), Some(0xAB));
        assert_eq!(load.imm("idx"), Some(9));

        let mut bad = Primitive::op("x").arg("v", Value::Lazy(Lazy::TargetArg("j".into())), ArgMode::In);
        assert!(matches!(
            bad.bind(&target, &data),
            Err(Error::UnassignedArgument(_, _))
        ));
    }

    #[test]
    fn empty_random_range() {
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Value::draw(7, 7, &mut rng).unwrap(), 7);
        assert!(matches!(
            Value::draw(10, 5, &mut rng),
            Err(Error::MalformedPrimitive(_))
        ));
    }

    #[test]
    fn data_image() {
        assert_eq!(Data::new(0x1F, 16).to_hex(), "001F");
        assert_eq!(Data::new(0x1F, 4).to_hex(), "F");
        assert_eq!(Data::new(0xF0F0, 16).bits(4, 7), 0xF);
    }
}
