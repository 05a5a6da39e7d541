use super::call::Call;
use crate::error::{Error, Result};

/// Ordered calls. Sub-sequences selected for an engine also remember where
/// each call came from and may carry code to splice around it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    pub calls: Vec<Call>,
    /// Original index of every call.
    pub positions: Vec<usize>,
    /// Whether the engine claimed the call.
    pub flags: Vec<bool>,
    pub prologues: Vec<Vec<Call>>,
    pub epilogues: Vec<Vec<Call>>,
}

impl Sequence {
    pub fn new(calls: Vec<Call>) -> Self {
        let len = calls.len();
        Sequence {
            calls,
            positions: (0..len).collect(),
            flags: vec![false; len],
            prologues: vec![vec![]; len],
            epilogues: vec![vec![]; len],
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn push(&mut self, call: Call, position: usize, flag: bool) {
        self.calls.push(call);
        self.positions.push(position);
        self.flags.push(flag);
        self.prologues.push(vec![]);
        self.epilogues.push(vec![]);
    }

    /// Local index of the call standing for original `position`.
    pub fn local(&self, position: usize) -> Option<usize> {
        self.positions.iter().position(|p| *p == position)
    }

    pub fn claims(&self, position: usize) -> Option<usize> {
        self.local(position).filter(|&k| self.flags[k])
    }

    /// Binds every `depends_on` to the index of its target in this sequence.
    pub fn resolve_dependencies(&mut self) -> Result<()> {
        let ids: Vec<_> = self.calls.iter().map(|c| c.id).collect();
        for (index, call) in self.calls.iter_mut().enumerate() {
            call.depends_on_index = match call.depends_on {
                Some(id) => Some(
                    ids.iter()
                        .position(|other| *other == id)
                        .ok_or(Error::UnresolvedDependency(index))?,
                ),
                None => None,
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Primitive;

    #[test]
    fn dependencies_bind_to_positions() {
        let a = Call::op(Primitive::op("a"));
        let b = Call::op(Primitive::op("b")).depends_on(&a);
        let mut seq = Sequence::new(vec![b, a]);
        seq.resolve_dependencies().unwrap();
        assert_eq!(seq.calls[0].depends_on_index, Some(1));
        assert_eq!(seq.calls[1].depends_on_index, None);
    }

    #[test]
    fn missing_dependency_is_fatal() {
        let a = Call::op(Primitive::op("a"));
        let b = Call::op(Primitive::op("b")).depends_on(&a);
        let mut seq = Sequence::new(vec![b]);
        assert!(matches!(
            seq.resolve_dependencies(),
            Err(Error::UnresolvedDependency(0))
        ));
    }
}
