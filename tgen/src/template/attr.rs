use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type Attrs = IndexMap<String, Attr>;

/// Open attribute value attached to calls, situations and sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Attr>),
    Map(Attrs),
}

impl Attr {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attr::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attr::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attrs> {
        match self {
            Attr::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Attr {
    fn from(b: bool) -> Self {
        Attr::Bool(b)
    }
}

impl From<i64> for Attr {
    fn from(i: i64) -> Self {
        Attr::Int(i)
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Attr::Text(s.to_string())
    }
}

impl From<Attrs> for Attr {
    fn from(m: Attrs) -> Self {
        Attr::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_yaml() {
        let attrs: Attrs =
            serde_yaml::from_str("engines:\n  branch:\n    trace_count_limit: 2\npresimulation: false\n")
                .unwrap();
        assert_eq!(attrs["presimulation"], Attr::Bool(false));
        let branch = attrs["engines"].as_map().unwrap()["branch"].as_map().unwrap();
        assert_eq!(branch["trace_count_limit"].as_int(), Some(2));
    }
}
