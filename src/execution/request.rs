//! Execution Request
//!
//! The immutable value object describing one simulation run: which model to
//! simulate, which start values to override, and the time grid. Built by the
//! caller, consumed by the runner pool; never shared across submissions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::variable::ScalarValue;

/// Start time for every run. The original tool always simulates from zero
/// regardless of what the model's default experiment declares.
pub const START_TIME: f64 = 0.0;

/// Describes a single simulation run.
///
/// # Example
///
/// ```
/// use fmusim::execution::request::ExecutionRequest;
///
/// let request = ExecutionRequest::new("bouncingBall.fmu", 1.0, 0.1)
///     .with_override("g", 9.81)
///     .with_override("e", 0.7);
///
/// assert!(request.validate().is_ok());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExecutionRequest {
    /// Path to the materialized model package
    pub model: PathBuf,

    /// Start-value overrides, keyed by variable name
    overrides: HashMap<String, ScalarValue>,

    /// Simulation start time, fixed at zero
    pub start_time: f64,

    /// Simulation stop time in seconds
    pub stop_time: f64,

    /// Solver communication step size in seconds
    pub step_size: f64,
}

impl ExecutionRequest {
    /// Creates a request for `model` running from 0.0 to `stop_time`.
    pub fn new(model: impl Into<PathBuf>, stop_time: f64, step_size: f64) -> Self {
        Self {
            model: model.into(),
            overrides: HashMap::new(),
            start_time: START_TIME,
            stop_time,
            step_size,
        }
    }

    /// Adds a single start-value override.
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Replaces the full override map.
    pub fn with_overrides(mut self, overrides: HashMap<String, ScalarValue>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Start-value overrides for this run.
    pub fn overrides(&self) -> impl Iterator<Item = (&String, &ScalarValue)> {
        self.overrides.iter()
    }

    /// Number of start-value overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Checks the run parameters before submission.
    ///
    /// The time grid must be non-empty and the step strictly positive;
    /// anything else would make the engine spin or reject the run anyway.
    pub fn validate(&self) -> Result<(), String> {
        if !self.stop_time.is_finite() || self.stop_time <= self.start_time {
            return Err(format!(
                "stop time must be greater than start time ({}): got {}",
                self.start_time, self.stop_time
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(format!("step size must be positive: got {}", self.step_size));
        }
        Ok(())
    }
}
