use crate::error::RuntimeError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Load connection params from a JSON object of scalar values.
///
/// ```json
/// { "token": "abc", "room": 7, "debug": true }
/// ```
pub fn load_params_file(path: &Path) -> Result<BTreeMap<String, String>, RuntimeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RuntimeError::ParamsFile {
        path: path.to_path_buf(),
        source,
    })?;

    let object: Map<String, Value> =
        serde_json::from_str(&contents).map_err(|source| RuntimeError::ParamsFormat {
            path: path.to_path_buf(),
            source,
        })?;

    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(RuntimeError::ParamsValue { key }),
            };
            Ok((key, value))
        })
        .collect()
}
