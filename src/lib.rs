//! fmusim - Bounded Out-of-Process Simulation Harness
//!
//! Runs FMU (Functional Mock-up Unit) simulations through an external
//! simulation engine, in isolated OS processes, under a wall-clock budget.
//! A runaway or crashing simulation can time out or fail, but it can never
//! hang or take down the caller.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`model`]: Variable metadata and model-package introspection
//! - [`execution`]: Runner pool and budgeted execution supervisor
//! - [`results`]: Raw-result normalization and CSV export
//! - [`engine`]: Adapter to the external simulation engine binary
//!
//! # Example
//!
//! ```rust,no_run
//! use fmusim::execution::{ExecutionOutcome, ExecutionRequest, RunnerPool, Supervisor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let supervisor = Supervisor::new(RunnerPool::new());
//!
//!     let request = ExecutionRequest::new("bouncingBall.fmu", 1.0, 0.1)
//!         .with_override("g", 9.81);
//!
//!     match supervisor.run(request) {
//!         ExecutionOutcome::Success(table) => {
//!             table.write_csv("simulation_result.csv".as_ref())?;
//!         }
//!         ExecutionOutcome::Timeout => eprintln!("Simulation took too long to run."),
//!         ExecutionOutcome::Failure(detail) => eprintln!("Error running simulation: {}", detail),
//!     }
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod execution;
pub mod model;
pub mod results;

// Re-export commonly used types
pub use execution::{ExecutionOutcome, ExecutionRequest, RunnerPool, Supervisor};
pub use model::{inspect, ModelDescription, ScalarValue, VariableDescriptor};
pub use results::{normalize, ResultTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "fmusim";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "fmusim");
    }

    #[test]
    fn test_module_exports_request() {
        let request = ExecutionRequest::new("model.fmu", 1.0, 0.1);
        assert_eq!(request.stop_time, 1.0);
        assert_eq!(request.start_time, 0.0);
    }

    #[test]
    fn test_module_exports_pool() {
        let pool = RunnerPool::with_capacity(2);
        assert_eq!(pool.capacity(), 2);
    }
}
