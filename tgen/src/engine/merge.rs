use crate::iter::{ForkIterator, LazyIterator};
use crate::template::Sequence;

/// Rebuilds a full sequence from the default one and the sub-sequences the
/// engines solved. The first sub-sequence claiming a position replaces the
/// call there and splices its prologue and epilogue around it.
pub fn merge(default: &Sequence, parts: &[Sequence]) -> Sequence {
    if !parts.iter().any(|p| p.flags.contains(&true)) {
        return default.clone();
    }

    let mut merged = Sequence::default();
    for (call, &position) in default.calls.iter().zip(&default.positions) {
        let claim = parts
            .iter()
            .find_map(|part| part.claims(position).map(|k| (part, k)));
        match claim {
            Some((part, k)) => {
                for pre in &part.prologues[k] {
                    merged.push(pre.clone(), position, false);
                }
                merged.push(part.calls[k].clone(), position, true);
                for post in &part.epilogues[k] {
                    merged.push(post.clone(), position, false);
                }
            }
            None => merged.push(call.clone(), position, false),
        }
    }
    merged
}

/// Merges every tuple of engine solutions into the default sequence.
#[derive(Clone)]
pub struct SequenceMerger<I> {
    default: Sequence,
    inner: I,
}

impl<I: LazyIterator<Vec<Sequence>>> SequenceMerger<I> {
    pub fn new(default: Sequence, inner: I) -> Self {
        SequenceMerger { default, inner }
    }
}

impl<I: LazyIterator<Vec<Sequence>>> LazyIterator<Sequence> for SequenceMerger<I> {
    fn init(&mut self) {
        self.inner.init()
    }
    fn has_value(&self) -> bool {
        self.inner.has_value()
    }
    fn value(&self) -> Sequence {
        merge(&self.default, &self.inner.value())
    }
    fn next(&mut self) {
        self.inner.next()
    }
    fn stop(&mut self) {
        self.inner.stop()
    }
}

impl<I: LazyIterator<Vec<Sequence>> + Clone + 'static> ForkIterator<Sequence> for SequenceMerger<I> {
    fn fork(&self) -> Box<dyn ForkIterator<Sequence>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::{drain, CollectionIterator, CombinatorKind};
    use crate::template::{Call, Primitive};

    fn call(name: &str) -> Call {
        Call::op(Primitive::op(name))
    }

    fn names(seq: &Sequence) -> Vec<String> {
        seq.calls
            .iter()
            .map(|c| c.primitive().unwrap().name.clone())
            .collect()
    }

    #[test]
    fn identity_without_claims() {
        let default = Sequence::new(vec![call("a"), call("b"), call("c")]);
        let mut unclaimed = Sequence::default();
        unclaimed.push(call("x"), 1, false);
        assert_eq!(merge(&default, &[unclaimed]), default);
        assert_eq!(merge(&default, &[]), default);
    }

    #[test]
    fn first_claim_wins_and_splices() {
        let default = Sequence::new(vec![call("a"), call("b"), call("c")]);
        let mut first = Sequence::default();
        first.push(call("B1"), 1, true);
        first.prologues[0] = vec![call("pre")];
        first.epilogues[0] = vec![call("post")];
        let mut second = Sequence::default();
        second.push(call("B2"), 1, true);
        second.push(call("C2"), 2, true);

        let merged = merge(&default, &[first, second]);
        assert_eq!(names(&merged), vec!["a", "pre", "B1", "post", "C2"]);
    }

    #[test]
    fn merger_enumerates_tuples() {
        let default = Sequence::new(vec![call("a")]);
        let solutions: Vec<_> = ["x", "y"]
            .iter()
            .map(|n| {
                let mut s = Sequence::default();
                s.push(call(n), 0, true);
                s
            })
            .collect();
        let combinator = CombinatorKind::Product.build(vec![CollectionIterator::new(solutions)]);
        let mut merger = SequenceMerger::new(default, combinator);
        let all: Vec<_> = drain(&mut merger).iter().map(names).collect();
        assert_eq!(all, vec![vec!["x"], vec!["y"]]);
        assert_eq!(drain(&mut merger).len(), 2);
    }
}
