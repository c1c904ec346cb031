//! Persisted step state.
//!
//! A [`StepState`] records the inputs and fingerprint of a step the last time
//! it completed. The sequencer compares those records with the inputs it
//! wants now to decide what must run.

mod file;
mod store;
mod types;

pub use file::FileStateStore;
pub use store::{MemoryStateStore, StateStore};
pub use types::*;
