//! File-backed config storage.
//!
//! The file holds one instance document:
//!
//! ```json
//! {
//!   "label": "ws",
//!   "config": { "url": "ws://localhost:8080" },
//!   "feedbacks": [{ "id": "fb1", "options": { "subpath": "a.b", "variable": "x" } }]
//! }
//! ```
//!
//! Only `config` is migrated and written back; other keys are preserved.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use wsbridge_core::{ConfigError, ConfigStorage};
use wsbridge_protocol::{codec::decode_feedbacks, FeedbackInstance};

/// Default instance label used in variable references.
pub const DEFAULT_LABEL: &str = "ws";

pub struct FileConfigStorage {
    path: PathBuf,
}

impl FileConfigStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_document(&self) -> Result<Map<String, Value>, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(self.path.display().to_string()),
            _ => ConfigError::ReadError(e.to_string()),
        })?;
        match serde_json::from_str(&text) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => Err(ConfigError::InvalidData("document is not an object".to_string())),
            Err(e) => Err(ConfigError::InvalidData(e.to_string())),
        }
    }

    /// Instance label, used to resolve `$(<label>:<variable>)`.
    pub fn load_label(&self) -> Result<String, ConfigError> {
        Ok(match self.read_document()?.get("label") {
            Some(Value::String(label)) if !label.is_empty() => label.clone(),
            _ => DEFAULT_LABEL.to_string(),
        })
    }

    /// Feedback instances to subscribe on startup.
    pub fn load_feedbacks(&self) -> Result<Vec<FeedbackInstance>, ConfigError> {
        match self.read_document()?.remove("feedbacks") {
            Some(feedbacks) => {
                decode_feedbacks(feedbacks).map_err(|e| ConfigError::InvalidData(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }
}

impl ConfigStorage for FileConfigStorage {
    fn load_config(&self) -> Result<Map<String, Value>, ConfigError> {
        match self.read_document()?.remove("config") {
            Some(Value::Object(config)) => Ok(config),
            Some(_) => Err(ConfigError::InvalidData("config is not an object".to_string())),
            None => Ok(Map::new()),
        }
    }

    fn save_config(&self, config: &Map<String, Value>) -> Result<(), ConfigError> {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(ConfigError::NotFound(_)) => Map::new(),
            Err(e) => return Err(e),
        };
        document.insert("config".to_string(), Value::Object(config.clone()));

        let text = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}
