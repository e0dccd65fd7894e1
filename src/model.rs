//! Records persisted in the bucket: projects, parameter studies, and cases.
//!
//! Field names are the on-disk JSON contract read back by the fill tool
//! inside the batch container, so renames here are format changes.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One candidate value for a sweep axis.
///
/// JSON carries these untagged (`1`, `0.5`, `true`, `"kEpsilon"`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Text substituted for a template token.
    ///
    /// Integers are plain decimal, floats always carry a decimal point
    /// (`1.0`, never `1` or `1e0`), booleans use the OpenFOAM switch
    /// spelling, and text is verbatim.
    pub fn render(&self) -> String {
        match self {
            ParameterValue::Bool(value) => value.to_string(),
            ParameterValue::Int(value) => value.to_string(),
            ParameterValue::Float(value) => render_float(*value),
            ParameterValue::Text(value) => value.clone(),
        }
    }
}

fn render_float(value: f64) -> String {
    let text = value.to_string();
    if !value.is_finite() || text.contains('.') {
        return text;
    }
    format!("{text}.0")
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// A sweep axis supplied by the user: which file, which token, which values.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InputParameter {
    /// File location relative to the case working directory.
    pub path: String,
    /// Token name without the `@` delimiters.
    pub variable_name: String,
    pub values: Vec<ParameterValue>,
}

impl InputParameter {
    pub fn new(
        path: impl Into<String>,
        variable_name: impl Into<String>,
        values: Vec<ParameterValue>,
    ) -> Self {
        Self {
            path: path.into(),
            variable_name: variable_name.into(),
            values,
        }
    }
}

/// The value one case assigns to one input parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParameterSet {
    pub path: String,
    pub variable_name: String,
    pub value: String,
}

/// One concrete combination of a parameter study.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Case {
    pub id: String,
    pub path: String,
    pub last_run: Option<DateTime<Utc>>,
    /// One entry per input parameter, in input-parameter order.
    pub parameter_settings: Vec<ParameterSet>,
    pub run_script: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterStudy {
    pub name: String,
    pub path: String,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub files_path: String,
    pub name: String,
}
