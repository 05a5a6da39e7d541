use std::rc::Rc;

use indexmap::IndexMap;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::allocator::ModeAllocator;
use crate::code::CodeAllocator;
use crate::concrete::ConcreteSequence;
use crate::concretizer::{InitializerMaker, PreparatorMaker};
use crate::engine::{process, BranchEngine, Engine};
use crate::error::Result;
use crate::isa::Model;
use crate::iter::drain;
use crate::label::{LabelManager, LabelScopes};
use crate::options::Options;
use crate::preparator::PreparatorStore;
use crate::template::{Attrs, Block, Call, CallIds, Primitive};
use crate::testdata::TestBase;

/// Engines in registration order and initializer makers by test-data kind.
pub struct Registry {
    pub(crate) engines: Vec<Box<dyn Engine>>,
    makers: IndexMap<String, Rc<dyn InitializerMaker>>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            engines: vec![Box::new(BranchEngine::new())],
            makers: IndexMap::new(),
        }
    }
}

impl Registry {
    pub fn add_engine(&mut self, engine: Box<dyn Engine>) {
        self.engines.push(engine);
    }

    pub fn engine_ids(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.id()).collect()
    }

    pub fn add_maker(&mut self, kind: &str, maker: Rc<dyn InitializerMaker>) {
        self.makers.insert(kind.to_string(), maker);
    }

    /// Maker for a test-data kind. Unknown kinds expand preparators.
    pub fn maker(&self, kind: &str) -> Rc<dyn InitializerMaker> {
        match self.makers.get(kind) {
            Some(maker) => Rc::clone(maker),
            None => Rc::new(PreparatorMaker),
        }
    }
}

/// Location holding the current position of a data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub index: Primitive,
}

/// Everything a generation run shares.
pub struct Context {
    pub options: Options,
    pub model: Box<dyn Model>,
    pub testbase: Box<dyn TestBase>,
    pub registry: Registry,
    pub preparators: PreparatorStore,
    pub scopes: LabelScopes,
    pub labels: LabelManager,
    pub allocator: ModeAllocator,
    pub streams: IndexMap<String, Stream>,
    pub code: CodeAllocator,
    pub ids: CallIds,
    pub rng: StdRng,
    pub sequence_index: usize,
}

/// Part of the context a concretizer rewinds on `init()`.
#[derive(Debug, Clone)]
pub(crate) struct RunState {
    rng: StdRng,
    scopes: LabelScopes,
    labels: LabelManager,
    allocator: ModeAllocator,
    code: CodeAllocator,
    ids: CallIds,
    sequence_index: usize,
}

impl Context {
    pub fn new(options: Options, model: Box<dyn Model>, testbase: Box<dyn TestBase>) -> Self {
        Context {
            rng: StdRng::seed_from_u64(options.seed),
            code: CodeAllocator::new(options.code_origin),
            options,
            model,
            testbase,
            registry: Registry::default(),
            preparators: PreparatorStore::new(),
            scopes: LabelScopes::new(),
            labels: LabelManager::new(),
            allocator: ModeAllocator::new(),
            streams: IndexMap::new(),
            ids: CallIds::new(),
            sequence_index: 0,
        }
    }

    pub(crate) fn snapshot(&self) -> RunState {
        RunState {
            rng: self.rng.clone(),
            scopes: self.scopes.clone(),
            labels: self.labels.clone(),
            allocator: self.allocator.clone(),
            code: self.code.clone(),
            ids: self.ids.clone(),
            sequence_index: self.sequence_index,
        }
    }

    pub(crate) fn restore(&mut self, state: &RunState) {
        self.rng = state.rng.clone();
        self.scopes = state.scopes.clone();
        self.labels = state.labels.clone();
        self.allocator = state.allocator.clone();
        self.code = state.code.clone();
        self.ids = state.ids.clone();
        self.sequence_index = state.sequence_index;
    }

    /// Allocation tables as they were when `state` was taken. Every concrete
    /// sequence starts from the symbolic sequence's allocation.
    pub(crate) fn restore_allocator(&mut self, state: &RunState) {
        self.allocator = state.allocator.clone();
    }
}

/// Runs whole templates through the pipeline.
pub struct Generator {
    pub ctx: Context,
}

impl Generator {
    pub fn new(ctx: Context) -> Self {
        Generator { ctx }
    }

    /// Concrete sequences for one symbolic sequence. The first fatal error
    /// aborts the run.
    pub fn run(&mut self, attrs: &Attrs, calls: Vec<Call>) -> Result<Vec<ConcreteSequence>> {
        let mut concretizer = process(&mut self.ctx, attrs, calls)?;
        let sequences = drain(&mut concretizer);
        match concretizer.take_error() {
            Some(err) => Err(err),
            None => Ok(sequences),
        }
    }

    pub fn run_block(&mut self, block: &Block) -> Result<Vec<ConcreteSequence>> {
        let mut out = vec![];
        for calls in block.sequences()? {
            out.extend(self.run(&block.attrs, calls)?);
        }
        info!("{} sequence(s) generated", out.len());
        Ok(out)
    }
}
