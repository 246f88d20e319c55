//! Model Metadata Module
//!
//! Provides data structures and introspection for FMU model packages.
//!
//! # Structure
//!
//! - [`variable`]: Variable descriptors, scalar values, default experiment
//! - [`inspector`]: Metadata extraction and package materialization

pub mod inspector;
pub mod variable;

pub use inspector::{inspect, inspect_with_engine, materialize_package, ModelLoadError};
pub use variable::{
    Causality, DefaultExperiment, ModelDescription, ScalarValue, VarType, VariableDescriptor,
};
