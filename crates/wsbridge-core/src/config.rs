//! Endpoint configuration and its storage abstraction.
//!
//! The persisted instance config uses the host field names so that the same
//! JSON document can be read by the host and by this crate. Storage is
//! abstracted behind [`ConfigStorage`] so that persistence can be provided
//! by whatever embeds the bridge.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::upgrade::upgrade_config;

/// Pattern accepted for the endpoint URL: `ws[s]://host[:port][/path]`.
pub const ENDPOINT_PATTERN: &str = r"^wss?://([\da-z\.-]+)(:\d{1,5})?(?:/(.*))?$";

/// Heartbeat timeout used when none is configured.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 30;

static ENDPOINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(ENDPOINT_PATTERN).unwrap());
static TIMEOUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^$|^[1-9][0-9]*$").unwrap());
static AFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w\.\-_+/\\\$ ]*$").unwrap());

/// Check a URL against [`ENDPOINT_PATTERN`].
pub fn is_valid_endpoint(url: &str) -> bool {
    ENDPOINT.is_match(url)
}

/// Line termination appended to outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationMode {
    /// Nothing appended ('').
    None,
    /// '\r' ('r').
    Cr,
    /// '\n' ('n').
    Lf,
    /// '\r\n' ('rn').
    #[default]
    CrLf,
    /// '\n\r' ('nr').
    LfCr,
}

impl TerminationMode {
    /// Map a host code to a mode. Unknown codes append nothing.
    pub fn from_code(code: &str) -> Self {
        match code {
            "rn" => TerminationMode::CrLf,
            "nr" => TerminationMode::LfCr,
            "r" => TerminationMode::Cr,
            "n" => TerminationMode::Lf,
            _ => TerminationMode::None,
        }
    }

    /// Map the legacy boolean flag to a mode.
    pub fn from_legacy(flag: bool) -> Self {
        if flag {
            TerminationMode::CrLf
        } else {
            TerminationMode::None
        }
    }

    /// Host code for this mode.
    pub fn code(&self) -> &'static str {
        match self {
            TerminationMode::None => "",
            TerminationMode::Cr => "r",
            TerminationMode::Lf => "n",
            TerminationMode::CrLf => "rn",
            TerminationMode::LfCr => "nr",
        }
    }

    /// Characters appended for this mode.
    pub fn suffix(&self) -> &'static str {
        match self {
            TerminationMode::None => "",
            TerminationMode::Cr => "\r",
            TerminationMode::Lf => "\n",
            TerminationMode::CrLf => "\r\n",
            TerminationMode::LfCr => "\n\r",
        }
    }

    /// True when `code` is one of the enum codes.
    pub fn is_code(code: &str) -> bool {
        matches!(code, "" | "rn" | "nr" | "r" | "n")
    }
}

impl Serialize for TerminationMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for TerminationMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Code(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Flag(flag)) => TerminationMode::from_legacy(flag),
            Some(Raw::Code(code)) => TerminationMode::from_code(&code),
            None => TerminationMode::None,
        })
    }
}

/// Endpoint configuration as persisted by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// WebSocket URL (`ws[s]://host[:port][/path]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Reconnect 5 seconds after the connection closes.
    #[serde(default = "default_true")]
    pub reconnect: bool,

    /// Termination appended to outbound commands.
    #[serde(default)]
    pub append_new_line: TerminationMode,

    /// Close the connection when no ping arrives within `timeout`.
    #[serde(default)]
    pub heartbeat: bool,

    /// Heartbeat timeout in seconds, as entered by the user.
    #[serde(default = "default_timeout", deserialize_with = "string_or_number")]
    pub timeout: String,

    /// Log every inbound and outbound message.
    #[serde(default)]
    pub debug_messages: bool,

    /// Reset variables on init, on connect and on new subscriptions.
    #[serde(default = "default_true")]
    pub reset_variables: bool,

    /// Prepended to every feedback path expression.
    #[serde(default, deserialize_with = "string_or_null")]
    pub fbprefix: String,

    /// Appended to every feedback path expression.
    #[serde(default, deserialize_with = "string_or_null")]
    pub fbsuffix: String,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> String {
    DEFAULT_HEARTBEAT_TIMEOUT_SECS.to_string()
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            reconnect: true,
            append_new_line: TerminationMode::CrLf,
            heartbeat: false,
            timeout: default_timeout(),
            debug_messages: false,
            reset_variables: true,
            fbprefix: String::new(),
            fbsuffix: String::new(),
        }
    }
}

impl EndpointConfig {
    /// Config pointing at `url` with every other field defaulted.
    pub fn with_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    /// Decode from the persisted JSON object.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidData(e.to_string()))
    }

    /// The validated endpoint URL.
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        match self.url.as_deref() {
            None | Some("") => Err(ConfigError::MissingUrl),
            Some(url) if is_valid_endpoint(url) => Ok(url),
            Some(url) => Err(ConfigError::InvalidUrl(url.to_string())),
        }
    }

    /// Heartbeat timeout. Empty or unparsable values fall back to 30 seconds.
    pub fn heartbeat_timeout(&self) -> Duration {
        let secs = match self.timeout.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => DEFAULT_HEARTBEAT_TIMEOUT_SECS,
        };
        Duration::from_secs(secs)
    }

    /// Check the fields the host schema restricts.
    ///
    /// The URL is not checked here; an invalid URL is reported through the
    /// connection status instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TIMEOUT.is_match(&self.timeout) {
            return Err(ConfigError::InvalidTimeout(self.timeout.clone()));
        }
        for (field, value) in [("prefix", &self.fbprefix), ("suffix", &self.fbsuffix)] {
            if !AFFIX.is_match(value) {
                return Err(ConfigError::InvalidAffix {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Abstract storage for the persisted instance config.
///
/// The stored document is kept as a raw JSON object so that legacy fields
/// survive until the upgrade steps have run.
pub trait ConfigStorage: Send + Sync {
    /// Load the raw config document.
    fn load_config(&self) -> Result<Map<String, Value>, ConfigError>;

    /// Save the raw config document.
    fn save_config(&self, config: &Map<String, Value>) -> Result<(), ConfigError>;
}

/// Config loading logic shared by every host.
pub struct ConfigHandlers;

impl ConfigHandlers {
    /// Load the stored config, run the upgrade steps and decode it.
    ///
    /// The upgraded document is written back only when a step changed it.
    pub fn load_upgraded<S: ConfigStorage>(storage: &S) -> Result<EndpointConfig, ConfigError> {
        let mut raw = storage.load_config()?;
        if upgrade_config(&mut raw) {
            storage.save_config(&raw)?;
        }
        EndpointConfig::from_value(Value::Object(raw))
    }

    /// Persist a config.
    pub fn save<S: ConfigStorage>(storage: &S, config: &EndpointConfig) -> Result<(), ConfigError> {
        match serde_json::to_value(config) {
            Ok(Value::Object(map)) => storage.save_config(&map),
            Ok(_) => Err(ConfigError::InvalidData("config is not an object".to_string())),
            Err(e) => Err(ConfigError::WriteError(e.to_string())),
        }
    }
}
