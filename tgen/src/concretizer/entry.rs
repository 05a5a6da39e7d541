use indexmap::IndexMap;

use crate::concrete::ConcreteCall;

/// Calls sharing one dependency target. Test data for all of them is
/// generated on the entry's first visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallEntry {
    pub calls: Vec<usize>,
    pub processing_count: usize,
}

/// Entries keyed by the index of their canonical call.
#[derive(Debug, Clone, Default)]
pub struct CallEntries {
    entries: IndexMap<usize, CallEntry>,
    keys: Vec<usize>,
}

impl CallEntries {
    pub fn new(calls: &[ConcreteCall]) -> Self {
        let mut entries: IndexMap<usize, CallEntry> = IndexMap::new();
        let mut keys = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            let key = call.depends_on.unwrap_or(index);
            entries.entry(key).or_default().calls.push(index);
            keys.push(key);
        }
        CallEntries { entries, keys }
    }

    /// Calls to process before executing `index`, if this is the first
    /// visit of its entry.
    pub fn visit(&mut self, index: usize) -> Option<Vec<usize>> {
        let entry = self.entries.get_mut(self.keys.get(index)?)?;
        entry.processing_count += 1;
        (entry.processing_count == 1).then(|| entry.calls.clone())
    }

    /// Calls of entries no execution reached.
    pub fn unvisited(&mut self) -> Vec<usize> {
        let mut out = vec![];
        for entry in self.entries.values_mut() {
            if entry.processing_count == 0 {
                entry.processing_count = 1;
                out.extend(&entry.calls);
            }
        }
        out
    }

    pub fn get(&self, key: usize) -> Option<&CallEntry> {
        self.entries.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependents_share_the_first_visit() {
        let mut calls = vec![ConcreteCall::default(); 3];
        calls[1].depends_on = Some(0);
        let mut entries = CallEntries::new(&calls);
        assert_eq!(entries.visit(1), Some(vec![0, 1]));
        assert_eq!(entries.visit(0), None);
        assert_eq!(entries.visit(1), None);
        assert_eq!(entries.get(0).map(|e| e.processing_count), Some(3));
        assert_eq!(entries.unvisited(), vec![2]);
        assert!(entries.unvisited().is_empty());
    }
}
