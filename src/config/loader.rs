//! Configuration loading from files.
//!
//! String values of the exact form `"${dotted.key}"` are replaced by the value
//! stored at that key elsewhere in the same document before deserialisation,
//! so one axis can reuse another's settings.

use std::fs;
use std::path::Path;

use toml::{Table, Value};

use crate::error::{truncated, ConfigError, Result};

use super::MachineConfig;

/// Maximum chain length of `${KEY}` references.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use leadscrew_motion::load_config;
///
/// let config = load_config("lathe.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MachineConfig> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| ConfigError::Io(truncated(&e.to_string())))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid, a reference cannot be resolved,
/// or the result fails validation.
pub fn parse_config(content: &str) -> Result<MachineConfig> {
    let table: Table = content
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse(truncated(e.message())))?;

    let expanded = expand_references(&table)?;

    let config: MachineConfig = Value::Table(expanded)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(truncated(e.message())))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

/// Replace every `${KEY}` string in `root` with the value it names.
pub fn expand_references(root: &Table) -> Result<Table> {
    let mut out = root.clone();
    for (_, value) in out.iter_mut() {
        expand_value(value, root, 0)?;
    }
    Ok(out)
}

fn expand_value(value: &mut Value, root: &Table, depth: usize) -> Result<()> {
    match value {
        Value::String(s) => {
            if let Some(key) = reference_key(s).map(str::to_owned) {
                *value = resolve(&key, root, depth)?;
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                expand_value(item, root, depth)?;
            }
        }
        Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                expand_value(item, root, depth)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn resolve(key: &str, root: &Table, depth: usize) -> Result<Value> {
    let unresolved = || ConfigError::UnresolvedReference(truncated(key));

    if depth >= MAX_REFERENCE_DEPTH {
        return Err(unresolved().into());
    }

    let mut segments = key.split('.');
    let first = segments.next().ok_or_else(unresolved)?;
    let mut current = root.get(first).ok_or_else(unresolved)?;
    for segment in segments {
        current = current.get(segment).ok_or_else(unresolved)?;
    }

    let mut found = current.clone();
    expand_value(&mut found, root, depth + 1)?;
    Ok(found)
}

/// `"${a.b}"` -> `Some("a.b")`.
fn reference_key(s: &str) -> Option<&str> {
    s.strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|key| !key.is_empty())
}
