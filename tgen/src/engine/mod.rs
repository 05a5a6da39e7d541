//! Engines solve the calls they claim and yield candidate sub-sequences.

pub mod branch;
pub mod merge;
pub mod param;
pub mod processor;
pub mod selector;

pub use branch::BranchEngine;
pub use merge::{merge, SequenceMerger};
pub use param::{FromAttr, Parameter};
pub use processor::process;
pub use selector::SequenceSelector;

use std::marker::PhantomData;

use crate::context::Context;
use crate::error::Result;
use crate::iter::{ForkIterator, LazyIterator};
use crate::template::{Attrs, Sequence};

pub trait Engine {
    fn id(&self) -> &str;

    fn selector(&self) -> SequenceSelector {
        SequenceSelector::new(self.id(), true)
    }

    /// Reads parameters from the engine's attribute map.
    fn configure(&mut self, attrs: &Attrs) -> Result<()>;

    /// Candidate solutions for the selected calls.
    fn solve(&mut self, ctx: &mut Context, selected: Sequence) -> Result<Box<dyn LazyIterator<Sequence>>>;
}

/// Turns an engine-specific solution into a sequence.
pub trait Adapter<S> {
    fn adapt(&self, solution: S) -> Sequence;
}

/// Solutions of an engine seen through its adapter.
pub struct AdapterIterator<S, I, A> {
    inner: I,
    adapter: A,
    _marker: PhantomData<fn() -> S>,
}

impl<S, I: LazyIterator<S>, A: Adapter<S>> AdapterIterator<S, I, A> {
    pub fn new(inner: I, adapter: A) -> Self {
        AdapterIterator {
            inner,
            adapter,
            _marker: PhantomData,
        }
    }
}

impl<S, I: Clone, A: Clone> Clone for AdapterIterator<S, I, A> {
    fn clone(&self) -> Self {
        AdapterIterator {
            inner: self.inner.clone(),
            adapter: self.adapter.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, I: LazyIterator<S>, A: Adapter<S>> LazyIterator<Sequence> for AdapterIterator<S, I, A> {
    fn init(&mut self) {
        self.inner.init()
    }
    fn has_value(&self) -> bool {
        self.inner.has_value()
    }
    fn value(&self) -> Sequence {
        self.adapter.adapt(self.inner.value())
    }
    fn next(&mut self) {
        self.inner.next()
    }
    fn stop(&mut self) {
        self.inner.stop()
    }
}

impl<S, I, A> ForkIterator<Sequence> for AdapterIterator<S, I, A>
where
    S: 'static,
    I: LazyIterator<S> + Clone + 'static,
    A: Adapter<S> + Clone + 'static,
{
    fn fork(&self) -> Box<dyn ForkIterator<Sequence>> {
        Box::new(self.clone())
    }
}
