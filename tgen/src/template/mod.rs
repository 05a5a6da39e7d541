//! Symbolic call model: primitive trees, calls and sequences.

pub mod attr;
pub mod block;
pub mod call;
pub mod primitive;
pub mod sequence;
pub mod situation;

pub use attr::{Attr, Attrs};
pub use block::{Block, Node};
pub use call::{flatten, Body, Call, CallId, CallIds, PreparatorRef};
pub use primitive::{ArgMode, Argument, Data, Kind, Lazy, Primitive, Unknown, Value};
pub use sequence::Sequence;
pub use situation::Situation;
