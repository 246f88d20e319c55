//! Model Inspector
//!
//! Extracts the declared variable list and default experiment from an FMU
//! package by delegating to the external engine's `describe` command. Pure
//! read: inspecting the same package twice yields the same metadata and
//! mutates nothing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::engine::adapter::{self, ENGINE_PATH};
use crate::model::variable::ModelDescription;

/// Raised when a model package cannot be loaded or introspected.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model package not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to launch simulation engine: {0}")]
    EngineUnavailable(#[source] io::Error),

    #[error("engine rejected the model package: {detail}")]
    Rejected { detail: String },

    #[error("engine returned unreadable model metadata: {0}")]
    Metadata(#[source] serde_json::Error),

    #[error("failed to materialize model package: {0}")]
    Materialize(#[source] io::Error),
}

/// Reads the model description of an FMU package.
///
/// Runs `<engine> describe <model>` and parses the JSON it prints. Fails
/// with [`ModelLoadError`] if the package is missing, the engine cannot be
/// launched, or the package is structurally invalid.
pub fn inspect(model: &Path) -> Result<ModelDescription, ModelLoadError> {
    inspect_with_engine(&ENGINE_PATH, model)
}

/// Same as [`inspect`] with an explicit engine binary.
pub fn inspect_with_engine(engine: &Path, model: &Path) -> Result<ModelDescription, ModelLoadError> {
    if !model.exists() {
        return Err(ModelLoadError::NotFound(model.to_path_buf()));
    }

    debug!("Inspecting model package: {}", model.display());

    let output = adapter::describe_command(engine, model)
        .output()
        .map_err(ModelLoadError::EngineUnavailable)?;

    if !output.status.success() {
        let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ModelLoadError::Rejected {
            detail: if detail.is_empty() {
                format!("describe exited with {:?}", output.status.code())
            } else {
                detail
            },
        });
    }

    let description: ModelDescription =
        serde_json::from_slice(&output.stdout).map_err(ModelLoadError::Metadata)?;

    info!(
        "Model '{}': {} variables, {} settable",
        description.model_name.as_deref().unwrap_or("unnamed"),
        description.variables.len(),
        description.settable_variables().len()
    );

    Ok(description)
}

/// Writes an uploaded model package to a scoped location on disk.
///
/// The engine requires file-based access, so package bytes received from a
/// caller are written once under the system temp directory and treated as
/// read-only afterwards. Returns the materialized path.
pub fn materialize_package(file_name: &str, bytes: &[u8]) -> Result<PathBuf, ModelLoadError> {
    let package_dir = std::env::temp_dir().join("fmusim_models");
    fs::create_dir_all(&package_dir).map_err(ModelLoadError::Materialize)?;

    // Strip any path components an uploader might smuggle into the name.
    let base_name = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "model.fmu".to_string());

    let package_path = package_dir.join(base_name);
    fs::write(&package_path, bytes).map_err(ModelLoadError::Materialize)?;

    debug!("Materialized model package: {}", package_path.display());

    Ok(package_path)
}
