//! Simulation Execution Module
//!
//! Provides the bounded, cancellable out-of-process execution harness:
//! request values, the isolated runner pool, and the supervisor that
//! enforces the wall-clock budget.
//!
//! # Architecture
//!
//! - [`request`]: Immutable description of one simulation run
//! - [`runner`]: Worker pool executing requests in engine child processes
//! - [`supervisor`]: Budgeted polling, cancellation, outcome mapping

pub mod request;
pub mod runner;
pub mod supervisor;

pub use request::ExecutionRequest;
pub use runner::{EngineError, RunHandle, RunnerPool};
pub use supervisor::{ExecutionOutcome, Supervisor};
