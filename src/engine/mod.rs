// src/engine/mod.rs

//! Rebuild/test/restart coordination.
//!
//! The pure per-cycle state machine lives in [`core`]; the async shell that
//! owns the watcher session, invokes the toolchain and drives the supervisor
//! is implemented in [`runtime`].

pub mod core;
pub mod runtime;

pub use core::{
    CycleCommand, CycleCore, CycleEvent, CycleOptions, CycleStep, CycleSummary, Report,
};
pub use runtime::{LoopOptions, RerunLoop};
