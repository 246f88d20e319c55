//! Simulation Results Module
//!
//! Normalizes the engine's row-oriented raw output into a column-oriented
//! table and renders it for export.

pub mod table;

pub use table::{normalize, MalformedResultError, RawResult, RawRow, ResultTable, TIME_COLUMN};
