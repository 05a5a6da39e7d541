use super::attr::{Attr, Attrs};
use crate::testdata::TestData;

/// Named request for test data, optionally routed to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Situation {
    pub name: String,
    pub engine: Option<String>,
    /// Queried before concretization and combined across the sequence.
    pub provider: bool,
    pub attrs: Attrs,
    pub testdata: Option<TestData>,
}

impl Situation {
    pub fn new(name: &str) -> Self {
        Situation {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn engine(mut self, id: &str) -> Self {
        self.engine = Some(id.to_string());
        self
    }

    pub fn provider(mut self) -> Self {
        self.provider = true;
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<Attr>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn stream(&self) -> Option<&str> {
        self.attrs.get("stream").and_then(Attr::as_str)
    }
}
