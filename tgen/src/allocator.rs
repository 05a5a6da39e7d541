use indexmap::{IndexMap, IndexSet};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};
use crate::template::{Body, Call, Primitive, Unknown, Value};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// A value no other mode holds.
    #[default]
    Free,
    /// A value some mode already holds.
    Used,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationRequest {
    pub strategy: Strategy,
    pub exclude: Vec<u64>,
}

impl AllocationRequest {
    pub fn new(strategy: Strategy) -> Self {
        AllocationRequest {
            strategy,
            exclude: vec![],
        }
    }
}

#[derive(Debug, Clone)]
struct Table {
    arg: String,
    values: Vec<u64>,
    used: IndexSet<u64>,
}

/// Allocation tables of addressing modes, keyed by mode name.
#[derive(Debug, Clone, Default)]
pub struct ModeAllocator {
    tables: IndexMap<String, Table>,
}

impl ModeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate values for argument `arg` of mode `mode`.
    pub fn add_table(&mut self, mode: &str, arg: &str, values: Vec<u64>) {
        self.tables.insert(
            mode.to_string(),
            Table {
                arg: arg.to_string(),
                values,
                used: IndexSet::new(),
            },
        );
    }

    pub fn reset(&mut self) {
        self.tables.values_mut().for_each(|t| t.used.clear());
    }

    pub fn is_used(&self, mode: &str, value: u64) -> bool {
        self.tables
            .get(mode)
            .is_some_and(|t| t.used.contains(&value))
    }

    /// Fills unknown mode arguments that ask for allocation. `Free` calls
    /// release their modes at the point they appear.
    pub fn allocate(&mut self, calls: &mut [Call], mark_explicit: bool, rng: &mut StdRng) -> Result<()> {
        if mark_explicit {
            for call in calls.iter_mut() {
                call.try_for_each_primitive(&mut |p| {
                    self.mark(p);
                    Ok(())
                })?;
            }
        }
        for call in calls.iter_mut() {
            if let Body::Free(modes) = &call.body {
                modes.iter().for_each(|m| self.release(m));
                continue;
            }
            call.try_for_each_primitive(&mut |p| self.fill(p, rng))?;
        }
        Ok(())
    }

    fn mark(&mut self, mode: &Primitive) {
        if let Some(table) = self.tables.get_mut(&mode.name) {
            if let Some(Value::Fixed(v)) = mode.args.get(&table.arg).map(|a| &a.value) {
                table.used.insert(*v);
            }
        }
    }

    fn release(&mut self, mode: &Primitive) {
        if let Some(table) = self.tables.get_mut(&mode.name) {
            if let Some(v) = mode.imm(&table.arg) {
                debug!("free {}", mode);
                table.used.shift_remove(&v);
            }
        }
    }

    fn fill(&mut self, mode: &mut Primitive, rng: &mut StdRng) -> Result<()> {
        let Some(table) = self.tables.get_mut(&mode.name) else {
            return Ok(());
        };
        let Some(arg) = mode.args.get_mut(&table.arg) else {
            return Ok(());
        };
        let Value::Unknown(Unknown {
            value: value @ None,
            allocation: Some(request),
        }) = &mut arg.value
        else {
            return Ok(());
        };

        let candidates: Vec<u64> = table
            .values
            .iter()
            .copied()
            .filter(|v| !request.exclude.contains(v))
            .filter(|v| match request.strategy {
                Strategy::Free => !table.used.contains(v),
                Strategy::Used => table.used.contains(v),
                Strategy::Random => true,
            })
            .collect();
        let chosen = candidates
            .choose(rng)
            .copied()
            .ok_or_else(|| Error::AllocationFailed(mode.name.clone(), request.strategy.to_string()))?;
        table.used.insert(chosen);
        *value = Some(chosen);
        Ok(())
    }
}
