//! Simulation Engine Integration
//!
//! Handles locating the external simulation engine binary and building
//! the command lines for model introspection and simulation runs.

pub mod adapter;

pub use adapter::{describe_command, simulate_command, DEFAULT_ENGINE, ENGINE_ENV_VAR, ENGINE_PATH};
