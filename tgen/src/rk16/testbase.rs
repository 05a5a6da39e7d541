use log::debug;

use crate::error::Result;
use crate::testdata::{Query, TestBase, TestData};

/// Data situations over 16-bit operands. Narrower free variables (register
/// indices) are left for the allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rk16TestBase;

const BOUNDARY: [u64; 4] = [0x0000, 0x7FFF, 0x8000, 0xFFFF];

impl Rk16TestBase {
    fn fill(query: &Query, mut value: impl FnMut(usize) -> u64) -> TestData {
        query
            .free()
            .filter(|(_, width)| *width == 16)
            .enumerate()
            .fold(TestData::new("default"), |data, (n, (name, _))| data.bind(name, value(n)))
    }
}

impl TestBase for Rk16TestBase {
    fn execute(&mut self, query: &Query) -> Result<Vec<TestData>> {
        let solutions = match query.situation.as_str() {
            "zero" => vec![Self::fill(query, |_| 0)],
            "equal" => {
                let value = query
                    .attrs
                    .get("value")
                    .and_then(|a| a.as_int())
                    .map_or(0x5A5A, |v| v as u64 & 0xFFFF);
                vec![Self::fill(query, |_| value)]
            }
            // Signed overflow on addition: 0x7FFF plus one.
            "overflow" => vec![Self::fill(query, |n| if n == 0 { 0x7FFF } else { 0x0001 })],
            "boundary" => BOUNDARY
                .iter()
                .map(|v| Self::fill(query, |_| *v))
                .collect(),
            _ => vec![],
        };
        debug!("situation '{}': {} solution(s)", query.situation, solutions.len());
        Ok(solutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rk16::{op, reg, Rk16};
    use crate::template::{Situation, Value};

    fn query(situation: Situation) -> Query {
        let mut add = op(
            "add",
            vec![
                ("rd", Value::Mode(reg(8))),
                ("rs1", Value::Mode(reg(9))),
                ("rs2", Value::Mode(reg(10))),
            ],
        );
        add.situation = Some(situation);
        Query::new(&add, &Rk16::new())
    }

    #[test]
    fn overflow_binds_sources_only() {
        let data = Rk16TestBase.execute(&query(Situation::new("overflow"))).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].bindings.get("add.rs1"), Some(&0x7FFF));
        assert_eq!(data[0].bindings.get("add.rs2"), Some(&0x0001));
        assert!(!data[0].bindings.contains_key("add.rd"));
    }

    #[test]
    fn boundary_alternatives() {
        let data = Rk16TestBase.execute(&query(Situation::new("boundary"))).unwrap();
        let values: Vec<u64> = data.iter().map(|d| d.bindings["add.rs1"]).collect();
        assert_eq!(values, BOUNDARY);
    }

    #[test]
    fn equal_takes_attribute() {
        let data = Rk16TestBase
            .execute(&query(Situation::new("equal").attr("value", 3i64)))
            .unwrap();
        assert_eq!(data[0].bindings["add.rs2"], 3);
    }

    #[test]
    fn unknown_situation_is_empty() {
        assert!(Rk16TestBase.execute(&query(Situation::new("nope"))).unwrap().is_empty());
    }
}
