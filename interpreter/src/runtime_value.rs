use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::context::Context;

/// A value flowing between pipeline steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuntimeValue {
    Unit,
    String(String),
    List(Vec<RuntimeValue>),
    /// Key/value record, e.g. a context returned as a pipeline's result.
    Map(BTreeMap<String, RuntimeValue>),
}

impl RuntimeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Unit => "Unit",
            RuntimeValue::String(_) => "String",
            RuntimeValue::List(_) => "List",
            RuntimeValue::Map(_) => "Map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a map value from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<RuntimeValue>,
    {
        RuntimeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Unit => Ok(()),
            RuntimeValue::String(s) => write!(f, "{}", s),
            // Structured values render as compact JSON
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::String(s)
    }
}

impl From<Vec<RuntimeValue>> for RuntimeValue {
    fn from(items: Vec<RuntimeValue>) -> Self {
        RuntimeValue::List(items)
    }
}

impl From<Option<RuntimeValue>> for RuntimeValue {
    fn from(value: Option<RuntimeValue>) -> Self {
        value.unwrap_or(RuntimeValue::Unit)
    }
}

impl From<Context> for RuntimeValue {
    fn from(ctx: Context) -> Self {
        ctx.into_value()
    }
}

impl From<serde_json::Value> for RuntimeValue {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => RuntimeValue::Unit,
            serde_json::Value::String(s) => RuntimeValue::String(s),
            serde_json::Value::Array(items) => {
                RuntimeValue::List(items.into_iter().map(RuntimeValue::from).collect())
            }
            serde_json::Value::Object(entries) => RuntimeValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, RuntimeValue::from(v)))
                    .collect(),
            ),
            // Scripts only deal in strings
            scalar => RuntimeValue::String(scalar.to_string()),
        }
    }
}
