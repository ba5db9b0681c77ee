// Data types for Deployment module

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Status of a Deployment Manager operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Done,
    Other(String),
}

impl From<String> for OperationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "DONE" => Self::Done,
            _ => Self::Other(s),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Done => f.write_str("DONE"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// A tracked unit of work, as returned by `--async` submissions and
/// `operations describe`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// The error payload, if it is truthy
    pub fn failure(&self) -> Option<&Value> {
        self.error.as_ref().filter(|e| is_truthy(e))
    }
}

/// Submission output: a single operation, or a list holding one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OperationHandle {
    // Tried first: a derived struct also accepts a sequence, so `[]` would
    // otherwise decode as an empty single operation
    List(Vec<Operation>),
    Single(Operation),
}

impl OperationHandle {
    pub fn into_operation(self) -> Option<Operation> {
        match self {
            OperationHandle::Single(op) => Some(op),
            OperationHandle::List(ops) => ops.into_iter().next(),
        }
    }
}

/// One entry of `resources list --format=json`
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// YAML-encoded resource properties
    #[serde(default)]
    pub properties: Option<String>,
}

/// A compute instance created by a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub zone: String,
    /// Internal IP of the first network interface
    pub network_ip: Option<String>,
}

/// Empty, zero and null values count as absent, everything else as present
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
