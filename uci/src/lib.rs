//! UCI engine client used as the move oracle.

pub mod codec;
pub mod types;

pub(crate) mod protocol;

mod engine;

pub use engine::UciEngine;
pub use types::{BestMove, UciConfig};
