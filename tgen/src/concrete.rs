use std::fmt;

use crate::label::Label;
use crate::template::Primitive;

/// Fully bound instruction or directive with its place in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConcreteCall {
    pub text: String,
    pub prim: Option<Primitive>,
    pub address: u64,
    pub size: u64,
    pub exec_count: usize,
    pub labels: Vec<Label>,
    pub outputs: Vec<String>,
    pub origin: Option<u64>,
    pub align: Option<u64>,
    pub data: Vec<u64>,
    /// Position of the dependency target in the same sequence.
    pub depends_on: Option<usize>,
}

impl ConcreteCall {
    pub fn is_executable(&self) -> bool {
        self.prim.is_some() && self.size > 0
    }
}

impl fmt::Display for ConcreteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            writeln!(f, "{}:", label.unique_name())?;
        }
        if self.prim.is_some() {
            write!(f, "0x{:04X}  {}", self.address, self.text)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

/// Comparison of a written mode against its value after presimulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfCheck {
    pub mode: Primitive,
    pub expected: u64,
    pub calls: Vec<ConcreteCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConcreteSequence {
    pub index: usize,
    /// Initialization code produced while presimulating.
    pub prologue: Vec<ConcreteCall>,
    pub calls: Vec<ConcreteCall>,
    pub self_checks: Vec<SelfCheck>,
    pub start: u64,
    pub end: u64,
}

impl ConcreteSequence {
    /// Every call in output order.
    pub fn all_calls(&self) -> impl Iterator<Item = &ConcreteCall> {
        self.prologue
            .iter()
            .chain(self.calls.iter())
            .chain(self.self_checks.iter().flat_map(|check| check.calls.iter()))
    }
}
