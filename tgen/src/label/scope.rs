use std::collections::HashSet;

use indexmap::IndexMap;
use log::trace;

use super::{Label, LabelKind, LabelRef};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct Scope {
    reference: u32,
    names: HashSet<String>,
}

/// Reference numbers for labels duplicated by preparator expansion.
///
/// Each series counts how many times one preparator definition has been
/// inlined; every inclusion opens a scope numbered by that count.
#[derive(Debug, Clone, Default)]
pub struct LabelScopes {
    series: IndexMap<String, u32>,
    stack: Vec<Scope>,
}

impl LabelScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens a scope for one inclusion of `series` and returns its number.
    pub fn push(&mut self, series: &str) -> u32 {
        let counter = self.series.entry(series.to_string()).or_insert(0);
        let reference = *counter;
        *counter += 1;
        trace!("label scope {series} #{reference}");
        self.stack.push(Scope {
            reference,
            names: HashSet::new(),
        });
        reference
    }

    pub fn pop(&mut self) -> Result<()> {
        self.stack.pop().map(|_| ()).ok_or(Error::NoOpenScope)
    }

    /// Tags a label defined in the innermost scope. Outside any scope the
    /// label stays untagged.
    pub fn define(&mut self, label: &mut Label) -> Result<()> {
        let Some(scope) = self.stack.last_mut() else {
            return Ok(());
        };
        if label.kind == LabelKind::Numeric {
            return Ok(());
        }
        if !scope.names.insert(label.name.clone()) {
            return Err(Error::LabelRedefinition(label.name.clone()));
        }
        label.reference = Some(scope.reference);
        Ok(())
    }

    /// Tags a reference with the number of the innermost open scope that
    /// defines its name. Already tagged references are left alone.
    pub fn refer(&self, reference: &mut LabelRef) {
        if reference.reference.is_some() {
            return;
        }
        if let Some(scope) = self
            .stack
            .iter()
            .rev()
            .find(|scope| scope.names.contains(&reference.name))
        {
            reference.reference = Some(scope.reference);
        }
    }

    /// Restarts every series. Only legal with no scope open.
    pub fn reset(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::ScopeOpen(self.stack.len()));
        }
        self.series.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusions_get_distinct_numbers() {
        let mut scopes = LabelScopes::new();
        let mut names = vec![];
        for _ in 0..3 {
            scopes.push("reg#0");
            let mut label = Label::new("skip");
            scopes.define(&mut label).unwrap();
            let mut r = LabelRef::new("skip");
            scopes.refer(&mut r);
            assert_eq!(r.reference, label.reference);
            names.push(label.unique_name());
            scopes.pop().unwrap();
        }
        assert_eq!(names, vec!["skip_n0", "skip_n1", "skip_n2"]);
    }

    #[test]
    fn redefinition_in_scope() {
        let mut scopes = LabelScopes::new();
        scopes.push("p");
        scopes.define(&mut Label::new("a")).unwrap();
        assert!(matches!(
            scopes.define(&mut Label::new("a")),
            Err(Error::LabelRedefinition(_))
        ));
    }

    #[test]
    fn numeric_labels_repeat_in_scope() {
        let mut scopes = LabelScopes::new();
        scopes.push("p");
        for _ in 0..2 {
            let mut label = Label::with_kind("1", LabelKind::Numeric);
            scopes.define(&mut label).unwrap();
            assert_eq!(label.reference, None);
        }
    }

    #[test]
    fn reset_requires_closed_scopes() {
        let mut scopes = LabelScopes::new();
        scopes.push("p");
        assert!(matches!(scopes.reset(), Err(Error::ScopeOpen(1))));
        scopes.pop().unwrap();
        scopes.reset().unwrap();
        assert_eq!(scopes.push("p"), 0);
        assert!(matches!(LabelScopes::new().pop(), Err(Error::NoOpenScope)));
    }

    #[test]
    fn outside_names_stay_untagged() {
        let mut scopes = LabelScopes::new();
        scopes.push("p");
        let mut r = LabelRef::new("elsewhere");
        scopes.refer(&mut r);
        assert_eq!(r.reference, None);
    }
}
