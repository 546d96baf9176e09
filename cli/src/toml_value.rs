use interpreter::RuntimeValue;

/// Convert a TOML value from a test or check file into a RuntimeValue.
/// Scalars other than strings become their TOML text.
pub fn to_runtime(val: &toml::Value) -> RuntimeValue {
    match val {
        toml::Value::String(s) => RuntimeValue::String(s.clone()),
        toml::Value::Array(items) => RuntimeValue::List(items.iter().map(to_runtime).collect()),
        toml::Value::Table(table) => {
            RuntimeValue::map(table.iter().map(|(k, v)| (k.clone(), to_runtime(v))))
        }
        other => RuntimeValue::String(other.to_string()),
    }
}
