//! Template-driven test program generator.
//!
//! Symbolic call sequences go through preparator expansion, test-data
//! engines and presimulation on an ISA model, and come out as concrete,
//! addressed instruction sequences.

pub mod allocator;
pub mod code;
pub mod concrete;
pub mod concretizer;
pub mod context;
pub mod engine;
pub mod error;
pub mod isa;
pub mod iter;
pub mod label;
pub mod loader;
pub mod options;
pub mod preparator;
pub mod rk16;
pub mod template;
pub mod testdata;

pub use concrete::{ConcreteCall, ConcreteSequence, SelfCheck};
pub use context::{Context, Generator};
pub use error::{Error, Result};
pub use isa::Model;
pub use loader::Template;
pub use options::Options;
pub use testdata::{Query, TestBase, TestData};
