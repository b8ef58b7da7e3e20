//! Gateway crate: wires StatusStore, TaskRunner, the pipeline orchestrator,
//! webhook delivery, cleanup policy, and the HTTP control surface into one
//! `AppState` (§9 "singletons initialized on first use" → explicit
//! constructor injection at process startup).

pub mod api;
pub mod bootstrap;
pub mod runtime;
pub mod state;
