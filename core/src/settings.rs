//! Static transport configuration.
//!
//! Settings are read once, validated when a `Transport` is built, and never
//! change afterwards. Files are TOML; every key can be overridden through
//! `RTL_`-prefixed environment variables (`RTL_BASE_URL`, `RTL_TIMEOUT`, ...).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment};
use log::debug;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::ConfigError;
use crate::mode::{ContentTypeClassifier, DEFAULT_BINARY_TYPES, DEFAULT_STRING_TYPES};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ERROR_BODY: usize = 4096;

/// What to do with a response whose content type matches no pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownModePolicy {
    /// Decode as text when the body is valid UTF-8, keep raw bytes otherwise.
    #[default]
    AsString,
    /// Fail the request with `ErrorKind::UnknownContentType`.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub base_url: String,
    /// Whole-request timeout; written as seconds in files.
    #[serde(deserialize_with = "duration_secs")]
    pub timeout: Duration,
    pub default_headers: BTreeMap<String, String>,
    /// Sent as `User-Agent` unless a default header already sets one.
    pub agent_tag: Option<String>,
    /// Replaces the built-in binary patterns when set.
    pub binary_content_types: Option<Vec<String>>,
    /// Replaces the built-in string patterns when set.
    pub string_content_types: Option<Vec<String>>,
    pub unknown_mode: UnknownModePolicy,
    /// Upper bound, in bytes, on response text copied into an `ErrorInfo`.
    pub max_error_body: usize,
    /// Upper bound, in bytes, on a response body read by the built-in sender.
    /// Unbounded when unset.
    pub max_response_body: Option<u64>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_headers: BTreeMap::new(),
            agent_tag: Some(format!("rtl-core/{}", env!("CARGO_PKG_VERSION"))),
            binary_content_types: None,
            string_content_types: None,
            unknown_mode: UnknownModePolicy::default(),
            max_error_body: DEFAULT_MAX_ERROR_BODY,
            max_response_body: None,
        }
    }
}

impl TransportSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load settings from a TOML file, then apply `RTL_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading transport settings from {}", path.display());
        let cfg = Config::builder()
            .add_source(config::File::from(path))
            .add_source(Environment::with_prefix("RTL").prefix_separator("_").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Check the base URL, headers and content-type patterns. Returns the base
    /// URL without a trailing `/`.
    pub fn validate(&self) -> Result<String, ConfigError> {
        let parsed = Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Scheme(self.base_url.clone()));
        }
        for (name, value) in &self.default_headers {
            validate_header(name, value)?;
        }
        if let Some(agent) = &self.agent_tag {
            validate_header("user-agent", agent)?;
        }
        self.classifier()?;
        Ok(self.base_url.trim_end_matches('/').to_string())
    }

    /// Compile the configured content-type patterns, falling back to the
    /// built-in sets for any list left unset.
    pub fn classifier(&self) -> Result<ContentTypeClassifier, ConfigError> {
        let string: Vec<&str> = match &self.string_content_types {
            Some(types) => types.iter().map(String::as_str).collect(),
            None => DEFAULT_STRING_TYPES.to_vec(),
        };
        let binary: Vec<&str> = match &self.binary_content_types {
            Some(types) => types.iter().map(String::as_str).collect(),
            None => DEFAULT_BINARY_TYPES.to_vec(),
        };
        ContentTypeClassifier::new(string, binary)
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    if http::HeaderName::from_bytes(name.as_bytes()).is_err()
        || http::HeaderValue::from_str(value).is_err()
    {
        return Err(ConfigError::Header(name.to_string()));
    }
    Ok(())
}

fn duration_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
