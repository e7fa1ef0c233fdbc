use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("patch configuration must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Options for a patch run. The contents belong to the patch engine and are
/// passed through untouched; an empty configuration applies the engine's
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchConfiguration(Map<String, Value>);

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl PatchConfiguration {
    pub fn new() -> PatchConfiguration {
        PatchConfiguration::default()
    }

    pub fn from_json(json: &str) -> Result<PatchConfiguration, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(map) => Ok(PatchConfiguration(map)),
            other => Err(ConfigError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_file(path: &Path) -> Result<PatchConfiguration, ConfigError> {
        let text = fs::read_to_string(path)?;
        PatchConfiguration::from_json(&text)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl From<Map<String, Value>> for PatchConfiguration {
    fn from(map: Map<String, Value>) -> Self {
        PatchConfiguration(map)
    }
}

/// A whole run described as one JSON document:
///
/// ```json
/// { "inputIso": "prime.iso", "outputIso": "out.iso", "version": "0-00",
///   "configuration": { ... } }
/// ```
///
/// `version` may be left out to detect it from the input image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    pub input_iso: PathBuf,
    pub output_iso: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub configuration: PatchConfiguration,
}

impl PatchRequest {
    pub fn from_json(json: &str) -> Result<PatchRequest, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
