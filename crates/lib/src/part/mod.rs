//! Parts and the graph of their "runs after" dependencies.

pub mod graph;
mod types;

pub use graph::{GraphError, PartGraph};
pub use types::*;
