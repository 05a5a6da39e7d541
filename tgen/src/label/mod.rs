//! Labels, label references and their disambiguation.

pub mod manager;
pub mod scope;

pub use manager::LabelManager;
pub use scope::LabelScopes;

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum LabelKind {
    Global,
    #[default]
    Normal,
    Numeric,
    /// Placeholder that a later definition may replace.
    Weak,
}

/// Index path of a block from the root `[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(Vec<u32>);

impl Default for BlockId {
    fn default() -> Self {
        Self::root()
    }
}

impl BlockId {
    pub fn root() -> Self {
        BlockId(vec![1])
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        BlockId(path)
    }

    pub fn parent(&self) -> Option<Self> {
        match self.0.len() {
            0 | 1 => None,
            n => Some(BlockId(self.0[..n - 1].to_vec())),
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.len() <= 1
    }

    /// Steps `(up, down)` from this block to `other` through their common
    /// ancestor.
    pub fn distance(&self, other: &BlockId) -> (usize, usize) {
        let common = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        (self.0.len() - common, other.0.len() - common)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in &self.0 {
            write!(f, "_{index}")?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub block: BlockId,
    pub kind: LabelKind,
    /// Inclusion scope number, set when defined inside a preparator.
    pub reference: Option<u32>,
    /// Index of the generated sequence.
    pub sequence: Option<usize>,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, LabelKind::Normal)
    }

    pub fn with_kind(name: &str, kind: LabelKind) -> Self {
        Label {
            name: name.to_string(),
            block: BlockId::root(),
            kind,
            reference: None,
            sequence: None,
        }
    }

    pub fn in_block(mut self, block: BlockId) -> Self {
        self.block = block;
        self
    }

    /// Process-unique name: `name[_block][_n<ref>][_<seq>]`.
    pub fn unique_name(&self) -> String {
        if self.kind == LabelKind::Numeric {
            return self.name.clone();
        }
        let mut name = self.name.clone();
        if !self.block.is_root() {
            name.push_str(&self.block.to_string());
        }
        if let Some(r) = self.reference {
            name.push_str(&format!("_n{r}"));
        }
        if let Some(s) = self.sequence {
            name.push_str(&format!("_{s}"));
        }
        name
    }

    pub(crate) fn same_target(&self, other: &Label) -> bool {
        self.name == other.name
            && self.block == other.block
            && self.reference == other.reference
            && self.sequence == other.sequence
    }
}

/// Use of a label name; resolved against the visible definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelRef {
    pub name: String,
    pub block: BlockId,
    pub reference: Option<u32>,
    pub sequence: Option<usize>,
    /// Unique name and address once resolved.
    pub target: Option<(String, u64)>,
}

impl LabelRef {
    pub fn new(name: &str) -> Self {
        LabelRef {
            name: name.to_string(),
            block: BlockId::root(),
            reference: None,
            sequence: None,
            target: None,
        }
    }

    pub fn in_block(mut self, block: BlockId) -> Self {
        self.block = block;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names() {
        let mut label = Label::new("loop");
        assert_eq!(label.unique_name(), "loop");
        label.block = BlockId::root().child(2);
        label.reference = Some(3);
        label.sequence = Some(0);
        assert_eq!(label.unique_name(), "loop_1_2_n3_0");

        let mut numeric = Label::with_kind("1", LabelKind::Numeric);
        numeric.reference = Some(5);
        assert_eq!(numeric.unique_name(), "1");
    }

    #[test]
    fn block_distance() {
        let root = BlockId::root();
        let a = root.child(1);
        let b = root.child(2).child(1);
        assert_eq!(root.distance(&root), (0, 0));
        assert_eq!(root.distance(&b), (0, 2));
        assert_eq!(b.distance(&root), (2, 0));
        assert_eq!(a.distance(&b), (1, 2));
        assert_eq!(b.parent(), Some(root.child(2)));
        assert_eq!(root.parent(), None);
    }
}
