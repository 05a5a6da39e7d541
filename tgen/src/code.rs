use std::collections::HashMap;

use log::trace;

use crate::concrete::ConcreteCall;
use crate::error::{Error, Result};

/// Contiguously addressed run of concrete calls, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub start: u64,
    pub end: u64,
    /// Block starting where this one ends.
    pub next: Option<usize>,
    addresses: Vec<u64>,
}

impl CodeBlock {
    fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end && self.start < end
    }

    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }
}

/// Registered code blocks with an address index.
#[derive(Debug, Clone, Default)]
pub struct Code {
    blocks: Vec<CodeBlock>,
    index: HashMap<u64, (usize, usize)>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the run `[start, end)` whose calls start at `addresses`.
    pub fn add_block(&mut self, start: u64, end: u64, addresses: Vec<u64>) -> Result<usize> {
        if let Some(other) = self.blocks.iter().find(|b| b.overlaps(start, end)) {
            return Err(Error::CodeOverlap(start, end, other.start, other.end));
        }

        let id = self.blocks.len();
        let mut next = None;
        for (i, block) in self.blocks.iter_mut().enumerate() {
            if block.end == start {
                block.next = Some(id);
            }
            if block.start == end {
                next = Some(i);
            }
        }
        for (offset, addr) in addresses.iter().enumerate() {
            self.index.insert(*addr, (id, offset));
        }
        trace!("code block {id}: 0x{start:04X}..0x{end:04X}");
        self.blocks.push(CodeBlock {
            start,
            end,
            next,
            addresses,
        });
        Ok(id)
    }

    pub fn has_address(&self, addr: u64) -> bool {
        self.index.contains_key(&addr)
    }

    /// Block and offset of the call at `addr`.
    pub fn locate(&self, addr: u64) -> Option<(usize, usize)> {
        self.index.get(&addr).copied()
    }

    /// Address of the call that follows the one at `addr`, falling through
    /// into the chained block.
    pub fn next_address(&self, addr: u64) -> Result<u64> {
        let (id, offset) = self.locate(addr).ok_or(Error::NoCode(addr))?;
        let block = &self.blocks[id];
        match block.addresses.get(offset + 1) {
            Some(next) => Ok(*next),
            None => Ok(block.next.map_or(block.end, |n| self.blocks[n].start)),
        }
    }

    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }
}

/// Assigns addresses to concrete calls and registers them as code blocks.
#[derive(Debug, Clone, Default)]
pub struct CodeAllocator {
    pub address: u64,
    pub code: Code,
}

impl CodeAllocator {
    pub fn new(origin: u64) -> Self {
        CodeAllocator {
            address: origin,
            code: Code::new(),
        }
    }

    pub fn allocate(&mut self, calls: &mut [ConcreteCall]) -> Result<()> {
        let mut run = Run::new(self.address);
        for call in calls.iter_mut() {
            if let Some(origin) = call.origin {
                run.close(&mut self.code, self.address)?;
                self.address = origin;
                run = Run::new(origin);
            }
            if let Some(align) = call.align.filter(|a| *a > 1) {
                let aligned = self.address.div_ceil(align) * align;
                if aligned != self.address {
                    run.close(&mut self.code, self.address)?;
                    self.address = aligned;
                    run = Run::new(aligned);
                }
            }
            call.address = self.address;
            if call.size > 0 {
                run.addresses.push(self.address);
                self.address += call.size;
            }
        }
        run.close(&mut self.code, self.address)
    }
}

struct Run {
    start: u64,
    addresses: Vec<u64>,
}

impl Run {
    fn new(start: u64) -> Self {
        Run {
            start,
            addresses: vec![],
        }
    }

    fn close(&mut self, code: &mut Code, end: u64) -> Result<()> {
        if !self.addresses.is_empty() {
            code.add_block(self.start, end, std::mem::take(&mut self.addresses))?;
        }
        Ok(())
    }
}
