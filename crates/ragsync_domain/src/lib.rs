//! Domain types for keeping a vector index in step with a source tree

mod chunk;
mod chunking;
mod identity;

pub use chunk::*;
pub use chunking::*;
pub use identity::*;
