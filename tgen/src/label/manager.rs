use indexmap::IndexMap;
use log::warn;

use super::{Label, LabelKind, LabelRef};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub label: Label,
    pub address: u64,
}

/// Label definitions of a generation run, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct LabelManager {
    table: IndexMap<String, Vec<Target>>,
}

impl LabelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric labels may be defined any number of times.
    pub fn add(&mut self, label: Label, address: u64) -> Result<()> {
        let address = if label.kind == LabelKind::Weak { 0 } else { address };
        let targets = self.table.entry(label.name.clone()).or_default();
        if label.kind == LabelKind::Numeric {
            targets.push(Target { label, address });
            return Ok(());
        }
        match targets.iter().position(|t| t.label.same_target(&label)) {
            Some(i) if targets[i].label.kind == LabelKind::Weak => {
                targets[i] = Target { label, address };
                Ok(())
            }
            Some(_) => Err(Error::DuplicateLabel(label.unique_name())),
            None => {
                targets.push(Target { label, address });
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.table.clear();
    }

    /// Resolves a reference made by the call at `address`. `1f` and `1b`
    /// pick the nearest numeric label `1` after or at-or-before it.
    pub fn resolve_at(&self, reference: &LabelRef, address: u64) -> Option<&Target> {
        let Some((name, forward)) = numeric(&reference.name) else {
            return self.resolve(reference);
        };
        let numbered = self
            .table
            .get(name)?
            .iter()
            .filter(|t| t.label.kind == LabelKind::Numeric);
        if forward {
            numbered.filter(|t| t.address > address).min_by_key(|t| t.address)
        } else {
            numbered.filter(|t| t.address <= address).max_by_key(|t| t.address)
        }
    }

    /// Picks the definition closest to the block of the reference. Global
    /// labels of other sequences are visible after those of its own.
    pub fn resolve(&self, reference: &LabelRef) -> Option<&Target> {
        let targets = self.table.get(&reference.name)?;
        if let [only] = targets.as_slice() {
            return Some(only);
        }

        let mut candidates: Vec<(Rank, &Target)> = targets
            .iter()
            .filter(|t| t.label.reference == reference.reference)
            .filter(|t| {
                t.label.sequence.is_none()
                    || t.label.sequence == reference.sequence
                    || t.label.kind == LabelKind::Global
            })
            .map(|t| (rank(reference, &t.label), t))
            .collect();
        candidates.sort_by_key(|(rank, _)| *rank);

        let (best, target) = candidates.first()?;
        let ties = candidates.iter().filter(|(rank, _)| rank == best).count();
        if ties > 1 {
            warn!(
                "Ambiguous label reference {}: {} candidates, choosing {}",
                reference.name,
                ties,
                target.label.unique_name()
            );
        }
        Some(*target)
    }
}

/// Own sequence first, then block proximity: same block, children,
/// parents, siblings.
type Rank = (bool, u8, usize, usize);

fn rank(reference: &LabelRef, label: &Label) -> Rank {
    let foreign = label.sequence.is_some() && label.sequence != reference.sequence;
    match reference.block.distance(&label.block) {
        (0, 0) => (foreign, 0, 0, 0),
        (0, down) => (foreign, 1, down, 0),
        (up, 0) => (foreign, 2, up, 0),
        (up, down) => (foreign, 3, up, down),
    }
}

/// `<digits>f` or `<digits>b`: the label number and whether it looks forward.
pub fn numeric(name: &str) -> Option<(&str, bool)> {
    let forward = match name.chars().last()? {
        'f' => true,
        'b' => false,
        _ => return None,
    };
    let number = &name[..name.len() - 1];
    (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit())).then_some((number, forward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::BlockId;

    fn label(name: &str, block: &BlockId) -> Label {
        Label::new(name).in_block(block.clone())
    }

    #[test]
    fn distance_ordering() {
        let root = BlockId::root();
        let here = root.child(1);
        let child = here.child(1);
        let sibling = root.child(2);

        let mut labels = LabelManager::new();
        labels.add(label("l", &sibling), 0x30).unwrap();
        labels.add(label("l", &root), 0x10).unwrap();
        labels.add(label("l", &child), 0x20).unwrap();

        let r = LabelRef::new("l").in_block(here.clone());
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0x20));

        labels.add(label("l", &here), 0x40).unwrap();
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0x40));

        let from_sibling = LabelRef::new("l").in_block(sibling.child(3));
        assert_eq!(labels.resolve(&from_sibling).map(|t| t.address), Some(0x30));
    }

    #[test]
    fn weak_label_is_replaced() {
        let mut labels = LabelManager::new();
        labels
            .add(Label::with_kind("entry", LabelKind::Weak), 0x55)
            .unwrap();
        let r = LabelRef::new("entry");
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0));

        labels.add(Label::with_kind("entry", LabelKind::Weak), 0x10).unwrap();
        let mut strong = Label::with_kind("entry", LabelKind::Weak);
        strong.kind = LabelKind::Normal;
        labels.add(strong.clone(), 0x10).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0x10));

        assert!(matches!(
            labels.add(strong, 0x20),
            Err(Error::DuplicateLabel(_))
        ));
    }

    #[test]
    fn numeric_labels_by_direction() {
        let mut labels = LabelManager::new();
        for address in [0x10, 0x20, 0x30] {
            labels.add(Label::with_kind("1", LabelKind::Numeric), address).unwrap();
        }
        let at = |name: &str, address| labels.resolve_at(&LabelRef::new(name), address).map(|t| t.address);
        assert_eq!(at("1f", 0x10), Some(0x20));
        assert_eq!(at("1b", 0x10), Some(0x10));
        assert_eq!(at("1b", 0x2F), Some(0x20));
        assert_eq!(at("1f", 0x30), None);
        assert_eq!(labels.len(), 3);
        assert_eq!(numeric("12f"), Some(("12", true)));
        assert_eq!(numeric("loopb"), None);
        assert_eq!(numeric("b"), None);
    }

    #[test]
    fn global_labels_of_other_sequences() {
        let mut labels = LabelManager::new();
        for sequence in 0..2 {
            let mut main = Label::with_kind("main", LabelKind::Global);
            main.sequence = Some(sequence);
            labels.add(main, 0x100 * (sequence as u64 + 1)).unwrap();
        }
        let mut r = LabelRef::new("main");
        r.sequence = Some(1);
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0x200));
        r.sequence = Some(5);
        assert!(labels.resolve(&r).is_some());
    }

    #[test]
    fn reference_number_filters() {
        let mut labels = LabelManager::new();
        for n in 0..2 {
            let mut l = Label::new("skip");
            l.reference = Some(n);
            labels.add(l, 0x100 + n as u64).unwrap();
        }
        let mut r = LabelRef::new("skip");
        r.reference = Some(1);
        assert_eq!(labels.resolve(&r).map(|t| t.address), Some(0x101));
        r.reference = Some(7);
        assert!(labels.resolve(&r).is_none());
    }
}
