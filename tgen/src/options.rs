use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;

use crate::error::Result;

/// Generation switches. Every field may be omitted from the YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub presimulation: bool,
    pub self_checks: bool,
    pub default_test_data: bool,
    pub seed: u64,
    pub code_origin: u64,
    pub branch_exec_limit: usize,
    /// Mark explicitly written mode values as used before allocating.
    pub reserve_explicit: bool,
    pub testdata_combinator: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            presimulation: true,
            self_checks: false,
            default_test_data: true,
            seed: 0,
            code_origin: 0,
            branch_exec_limit: 100,
            reserve_explicit: true,
            testdata_combinator: "exhaustive".to_string(),
        }
    }
}

impl Options {
    pub fn load(fname: &str) -> Result<Self> {
        let file = File::open(fname)?;
        let options = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(options)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let options = Options::parse("seed: 42\nself_checks: true\n").unwrap();
        assert_eq!(options.seed, 42);
        assert!(options.self_checks);
        assert!(options.presimulation);
        assert_eq!(options.branch_exec_limit, 100);
        assert_eq!(options.testdata_combinator, "exhaustive");
    }

    #[test]
    fn empty_document() {
        assert_eq!(Options::parse("{}").unwrap(), Options::default());
    }
}
