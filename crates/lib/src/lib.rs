//! partplan-lib: incremental planning of parts lifecycles
//!
//! A project is a set of parts, each taken through the ordered lifecycle
//! steps pull, overlay, build, stage and prime. This crate works out which of
//! those steps must run, and why, to reach a target step:
//! - `Step`: the ordered lifecycle phases
//! - `PartGraph`: parts and their "runs after" dependencies
//! - `StateStore`: what each step last ran with
//! - `Sequencer`: the pure planning function producing `Action`s
//! - `LifecycleManager`: the façade tying configuration, graph and state together
//!
//! Executing the steps is left to the caller.

pub mod consts;
pub mod lifecycle;
pub mod part;
pub mod plugin;
pub mod project;
pub mod schedule;
pub mod sequencer;
pub mod state;
pub mod step;
pub mod util;
