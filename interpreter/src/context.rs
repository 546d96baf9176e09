use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::runtime_value::RuntimeValue;

/// The per-invocation data bag shared by the steps of one pipe.
///
/// Each pipe invocation starts with an empty context. Steps write into it to
/// keep values outside the primary data flow; if anything was written by the
/// time the last step finishes, the context becomes the pipe's result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, RuntimeValue>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn get(&self, key: &str) -> Option<&RuntimeValue> {
        self.values.get(key)
    }

    /// Store a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: RuntimeValue) -> Option<RuntimeValue> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<RuntimeValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RuntimeValue> {
        self.values.iter()
    }

    pub fn into_value(self) -> RuntimeValue {
        RuntimeValue::Map(self.values)
    }
}
