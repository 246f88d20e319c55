//! Model Variable Metadata
//!
//! Data structures describing the variables declared by an FMU and the
//! default experiment embedded in its model description. These are produced
//! once at inspection time and treated as read-only afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a variable within the model.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Causality {
    /// Externally supplied signal
    Input,
    /// Computed signal exposed by the model
    Output,
    /// Constant configuration value
    Parameter,
    /// Internal state
    Local,
    /// Derived from other variables
    Calculated,
}

impl fmt::Display for Causality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Parameter => "parameter",
            Causality::Local => "local",
            Causality::Calculated => "calculated",
        };
        write!(f, "{}", name)
    }
}

/// Declared value type of a variable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Real,
    Integer,
    Boolean,
    String,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Real => "Real",
            VarType::Integer => "Integer",
            VarType::Boolean => "Boolean",
            VarType::String => "String",
        };
        write!(f, "{}", name)
    }
}

/// A single scalar value as exchanged with the simulation engine.
///
/// Used both for variable start values and for result samples. The untagged
/// representation matches the engine's plain JSON scalars.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ScalarValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Booleans and text do not coerce; integer samples do, since engines
    /// commonly emit `0` where a column is otherwise Real-valued.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Integer(i) => Some(*i as f64),
            ScalarValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Real(r) => write!(f, "{}", r),
            ScalarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Real(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Integer(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

/// One variable declared by the model description.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VariableDescriptor {
    /// Variable name as declared by the model
    pub name: String,

    /// Role of the variable (input, output, parameter, ...)
    pub causality: Causality,

    /// Declared value type
    #[serde(rename = "type")]
    pub var_type: VarType,

    /// Optional declared default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ScalarValue>,
}

impl VariableDescriptor {
    /// True if the variable accepts a user-supplied start value.
    ///
    /// Inputs and parameters always do; locals only when the model declares
    /// a start value, which marks them as tunable initial conditions.
    pub fn is_settable(&self) -> bool {
        match self.causality {
            Causality::Input | Causality::Parameter => true,
            Causality::Local => self.start.is_some(),
            _ => false,
        }
    }

    /// True if the variable shows up in simulation results.
    pub fn is_observable(&self) -> bool {
        matches!(
            self.causality,
            Causality::Output | Causality::Local | Causality::Calculated | Causality::Input
        )
    }
}

/// Default experiment parameters embedded in the model description.
///
/// Only used to pre-fill run parameters; never applied implicitly.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DefaultExperiment {
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub stop_time: Option<f64>,
    #[serde(default)]
    pub step_size: Option<f64>,
}

/// Full metadata extracted from one model package.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    /// Human-readable model name
    #[serde(default)]
    pub model_name: Option<String>,

    /// FMI standard version the package declares
    #[serde(default)]
    pub fmi_version: Option<String>,

    /// Declared variables, in declaration order
    #[serde(default)]
    pub variables: Vec<VariableDescriptor>,

    /// Optional default experiment block
    #[serde(default)]
    pub default_experiment: Option<DefaultExperiment>,
}

impl ModelDescription {
    /// Variables that accept user-supplied start values.
    pub fn settable_variables(&self) -> Vec<&VariableDescriptor> {
        self.variables.iter().filter(|v| v.is_settable()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causality_wire_format() {
        let c: Causality = serde_json::from_str("\"parameter\"").unwrap();
        assert_eq!(c, Causality::Parameter);

        let c: Causality = serde_json::from_str("\"calculated\"").unwrap();
        assert_eq!(c, Causality::Calculated);
    }

    #[test]
    fn test_scalar_value_untagged_parse() {
        let v: ScalarValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, ScalarValue::Boolean(true));

        let v: ScalarValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, ScalarValue::Integer(42));

        let v: ScalarValue = serde_json::from_str("9.81").unwrap();
        assert_eq!(v, ScalarValue::Real(9.81));

        let v: ScalarValue = serde_json::from_str("\"on\"").unwrap();
        assert_eq!(v, ScalarValue::Text("on".to_string()));
    }

    #[test]
    fn test_scalar_value_display() {
        assert_eq!(ScalarValue::Real(9.81).to_string(), "9.81");
        assert_eq!(ScalarValue::Integer(3).to_string(), "3");
        assert_eq!(ScalarValue::Boolean(false).to_string(), "false");
        assert_eq!(ScalarValue::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_scalar_value_as_f64() {
        assert_eq!(ScalarValue::Real(0.5).as_f64(), Some(0.5));
        assert_eq!(ScalarValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(ScalarValue::Boolean(true).as_f64(), None);
        assert_eq!(ScalarValue::from("x").as_f64(), None);
    }

    #[test]
    fn test_variable_descriptor_parse() {
        let json = r#"{"name": "g", "causality": "parameter", "type": "Real", "start": 9.81}"#;
        let var: VariableDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(var.name, "g");
        assert_eq!(var.causality, Causality::Parameter);
        assert_eq!(var.var_type, VarType::Real);
        assert_eq!(var.start, Some(ScalarValue::Real(9.81)));
        assert!(var.is_settable());
    }

    #[test]
    fn test_variable_descriptor_no_start() {
        let json = r#"{"name": "h", "causality": "output", "type": "Real"}"#;
        let var: VariableDescriptor = serde_json::from_str(json).unwrap();

        assert!(var.start.is_none());
        assert!(!var.is_settable());
        assert!(var.is_observable());
    }

    #[test]
    fn test_default_experiment_partial() {
        let json = r#"{"stepSize": 0.01}"#;
        let exp: DefaultExperiment = serde_json::from_str(json).unwrap();

        assert_eq!(exp.step_size, Some(0.01));
        assert!(exp.start_time.is_none());
        assert!(exp.stop_time.is_none());
    }

    #[test]
    fn test_local_settable_only_with_start() {
        let json = r#"{"name": "h", "causality": "local", "type": "Real", "start": 1.0}"#;
        let with_start: VariableDescriptor = serde_json::from_str(json).unwrap();
        assert!(with_start.is_settable());

        let json = r#"{"name": "der(h)", "causality": "local", "type": "Real"}"#;
        let without_start: VariableDescriptor = serde_json::from_str(json).unwrap();
        assert!(!without_start.is_settable());
    }

    #[test]
    fn test_model_description_settable() {
        let json = r#"{
            "modelName": "bouncingBall",
            "fmiVersion": "2.0",
            "variables": [
                {"name": "time", "causality": "local", "type": "Real"},
                {"name": "g", "causality": "parameter", "type": "Real", "start": -9.81},
                {"name": "v", "causality": "input", "type": "Real", "start": 0.0},
                {"name": "h", "causality": "local", "type": "Real", "start": 1.0},
                {"name": "e", "causality": "output", "type": "Real"}
            ],
            "defaultExperiment": {"startTime": 0.0, "stopTime": 3.0, "stepSize": 0.1}
        }"#;
        let desc: ModelDescription = serde_json::from_str(json).unwrap();

        assert_eq!(desc.model_name.as_deref(), Some("bouncingBall"));
        assert_eq!(desc.variables.len(), 5);

        let settable = desc.settable_variables();
        let names: Vec<&str> = settable.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["g", "v", "h"]);

        let exp = desc.default_experiment.unwrap();
        assert_eq!(exp.stop_time, Some(3.0));
    }
}
