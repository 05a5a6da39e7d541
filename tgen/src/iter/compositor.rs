use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Flattens one tuple of call lists into a single list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CompositorKind {
    Catenation,
    Rotation,
}

impl CompositorKind {
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| Error::UnknownCompositor(name.to_string()))
    }

    pub fn compose<T>(self, lists: Vec<Vec<T>>) -> Vec<T> {
        match self {
            CompositorKind::Catenation => lists.into_iter().flatten().collect(),
            CompositorKind::Rotation => {
                let total = lists.iter().map(Vec::len).sum();
                let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
                let mut out = Vec::with_capacity(total);
                while out.len() < total {
                    for iter in iters.iter_mut() {
                        if let Some(item) = iter.next() {
                            out.push(item);
                        }
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catenation() {
        let out = CompositorKind::Catenation.compose(vec![vec![1, 2], vec![3]]);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn rotation_interleaves() {
        let out = CompositorKind::Rotation.compose(vec![vec![1, 2, 3], vec![10], vec![20, 21]]);
        assert_eq!(out, vec![1, 10, 20, 2, 21, 3]);
    }

    #[test]
    fn names() {
        assert_eq!(CompositorKind::parse("rotation").unwrap(), CompositorKind::Rotation);
        assert!(CompositorKind::parse("nesting").is_err());
    }
}
