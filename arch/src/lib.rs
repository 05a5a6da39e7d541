pub mod alu;
pub mod inst;
pub mod op;
pub mod reg;
pub mod resolved;
pub mod state;

pub use inst::Inst;
pub use op::{Field, OpKind};
pub use reg::Reg;
pub use resolved::Op;
pub use state::State;
