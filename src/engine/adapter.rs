//! Simulation Engine Adapter
//!
//! Locates the external simulation engine binary and builds the command
//! lines the crate uses to talk to it. The engine is a black box with two
//! entry points:
//!
//! - `<engine> describe <model.fmu>` prints the model metadata as JSON on
//!   stdout (`modelName`, `fmiVersion`, `variables`, `defaultExperiment`).
//! - `<engine> simulate <model.fmu> --start-time S --stop-time T
//!   --step-size H --output <path> [--set name=value ...]` runs the
//!   simulation and writes one JSON object per sample (JSON Lines) to
//!   `<path>`, fields keyed by variable name with `time` first. Errors are
//!   reported via a non-zero exit code and stderr.
//!
//! # Binary Resolution Priority
//!
//! The engine binary is resolved in the following order:
//! 1. `FMUSIM_ENGINE` environment variable
//! 2. Next to the fmusim executable
//! 3. System PATH
//! 4. Bare default name (`fmu-engine`), left to the OS to resolve

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::execution::request::ExecutionRequest;
use crate::model::variable::ScalarValue;

/// Default engine binary name when nothing else resolves.
pub const DEFAULT_ENGINE: &str = "fmu-engine";

/// Environment variable overriding the engine binary location.
pub const ENGINE_ENV_VAR: &str = "FMUSIM_ENGINE";

/// Lazily-initialized path to the simulation engine binary.
pub static ENGINE_PATH: Lazy<PathBuf> = Lazy::new(|| {
    // Priority 1: explicit override
    if let Ok(path) = std::env::var(ENGINE_ENV_VAR) {
        info!("Using engine from {}: {}", ENGINE_ENV_VAR, path);
        return PathBuf::from(path);
    }

    // Priority 2: bundled next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled = exe_dir.join(DEFAULT_ENGINE);
            if bundled.exists() {
                info!("Using bundled engine: {}", bundled.display());
                return bundled;
            }
        }
    }

    // Priority 3: system PATH
    if let Ok(output) = Command::new("which").arg(DEFAULT_ENGINE).output() {
        if output.status.success() {
            let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path_str.is_empty() {
                let system_path = PathBuf::from(path_str);
                info!("Using system engine: {}", system_path.display());
                return system_path;
            }
        }
    }

    warn!("Simulation engine '{}' not found", DEFAULT_ENGINE);
    warn!("  Set {} to point at the engine binary", ENGINE_ENV_VAR);

    PathBuf::from(DEFAULT_ENGINE)
});

/// Builds the metadata extraction command for a model package.
pub fn describe_command(engine: &Path, model: &Path) -> Command {
    let mut cmd = Command::new(engine);
    cmd.arg("describe").arg(model);
    cmd
}

/// Builds the simulation command for one execution request.
///
/// The engine writes its result rows to `output`; the caller owns that file.
pub fn simulate_command(engine: &Path, request: &ExecutionRequest, output: &Path) -> Command {
    let mut cmd = Command::new(engine);
    cmd.arg("simulate")
        .arg(&request.model)
        .arg("--start-time")
        .arg(request.start_time.to_string())
        .arg("--stop-time")
        .arg(request.stop_time.to_string())
        .arg("--step-size")
        .arg(request.step_size.to_string())
        .arg("--output")
        .arg(output);

    for (name, value) in request.overrides() {
        cmd.arg("--set").arg(format_override(name, value));
    }

    cmd
}

/// Renders one start-value override as a `name=value` argument.
fn format_override(name: &str, value: &ScalarValue) -> String {
    format!("{}={}", name, value)
}
