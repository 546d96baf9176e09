use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use interpreter::{CommandRegistry, RuntimeValue};

use crate::toml_value;

/// A TOML check suite: a list of `[[check]]` tables.
#[derive(Debug, Deserialize)]
pub struct Suite {
    #[serde(rename = "check", default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Deserialize)]
pub struct Check {
    pub name: String,

    /// Inline script source.
    #[serde(default)]
    pub script: Option<String>,

    /// Script file, relative to the suite file.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Initial input for the pipeline. Unit when absent.
    #[serde(default)]
    pub input: Option<toml::Value>,
}

impl Check {
    fn source(&self, base_dir: &Path) -> Result<String, String> {
        match (&self.script, &self.file) {
            (Some(script), None) => Ok(script.clone()),
            (None, Some(file)) => std::fs::read_to_string(base_dir.join(file))
                .map_err(|e| format!("cannot read '{}': {}", file.display(), e)),
            (Some(_), Some(_)) => Err("check sets both `script` and `file`".into()),
            (None, None) => Err("check sets neither `script` nor `file`".into()),
        }
    }
}

/// Results keyed by check name, plus the number of failed checks.
pub struct Report {
    pub results: BTreeMap<String, serde_json::Value>,
    pub failed: usize,
}

pub fn parse_suite(content: &str) -> Result<Suite, String> {
    let suite: Suite = toml::from_str(content).map_err(|e| format!("TOML parse error: {}", e))?;

    let mut seen = HashSet::new();
    for check in &suite.checks {
        if !seen.insert(check.name.as_str()) {
            return Err(format!("duplicate check name '{}'", check.name));
        }
    }
    Ok(suite)
}

pub fn load_suite(path: &Path) -> Result<Suite, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    parse_suite(&content)
}

async fn run_check(
    check: &Check,
    base_dir: &Path,
    registry: &CommandRegistry,
) -> Result<serde_json::Value, String> {
    let source = check.source(base_dir)?;
    let input = check
        .input
        .as_ref()
        .map(toml_value::to_runtime)
        .unwrap_or(RuntimeValue::Unit);
    let value = interpreter::run_script(&source, registry, input)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::to_value(&value).map_err(|e| e.to_string())
}

/// Run every check of a suite in order.
pub async fn run_suite(suite: &Suite, base_dir: &Path, registry: &CommandRegistry) -> Report {
    let mut results = BTreeMap::new();
    let mut failed = 0;

    for check in &suite.checks {
        info!(check = %check.name, "running check");
        let value = match run_check(check, base_dir, registry).await {
            Ok(value) => value,
            Err(message) => {
                warn!(check = %check.name, error = %message, "check failed");
                failed += 1;
                serde_json::json!({ "error": message })
            }
        };
        results.insert(check.name.clone(), value);
    }

    Report { results, failed }
}
