//! Content-type driven response mode selection.
//!
//! # Design
//! A `ContentTypeClassifier` owns two compiled `GlobSet`s (`*` matches any
//! run of characters). Classification lowercases the media type, drops its
//! parameters and checks the string list before the binary list, so narrow
//! text types such as `image/svg+xml` win over broad binary families such as
//! `image/*`. Invalid patterns are rejected when the classifier is built;
//! classification itself never fails.

use std::fmt;
use std::sync::OnceLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Binary,
    String,
    Unknown,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Binary => "binary",
            ResponseMode::String => "string",
            ResponseMode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_STRING_TYPES: &[&str] = &[
    "text/*",
    "application/json",
    "application/*+json",
    "application/xml",
    "application/*+xml",
    "application/javascript",
    "application/x-javascript",
    "application/x-www-form-urlencoded",
    "application/sql",
    "application/graphql",
    "application/yaml",
    "application/x-yaml",
    "image/svg+xml",
    "multipart/form-data",
];

pub const DEFAULT_BINARY_TYPES: &[&str] = &[
    "image/*",
    "audio/*",
    "video/*",
    "font/*",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-7z-compressed",
    "application/msword",
    "application/vnd.*",
    "application/wasm",
];

/// Maps content types to a `ResponseMode`.
#[derive(Debug, Clone)]
pub struct ContentTypeClassifier {
    string: GlobSet,
    binary: GlobSet,
    string_patterns: Vec<String>,
    binary_patterns: Vec<String>,
}

impl ContentTypeClassifier {
    /// Compile both pattern sets. Patterns are case-insensitive and `*` also
    /// matches `/`.
    pub fn new<S, B>(string: S, binary: B) -> Result<Self, ConfigError>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        let string_patterns: Vec<String> = string
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .collect();
        let binary_patterns: Vec<String> = binary
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .collect();
        Ok(Self {
            string: build_set(&string_patterns)?,
            binary: build_set(&binary_patterns)?,
            string_patterns,
            binary_patterns,
        })
    }

    /// The built-in pattern sets.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_STRING_TYPES, DEFAULT_BINARY_TYPES)
    }

    pub fn classify(&self, content_type: &str) -> ResponseMode {
        let media_type = media_type(content_type);
        if media_type.is_empty() {
            return ResponseMode::Unknown;
        }
        if self.string.is_match(&media_type) {
            return ResponseMode::String;
        }
        if self.binary.is_match(&media_type) {
            return ResponseMode::Binary;
        }
        if has_charset(content_type) {
            return ResponseMode::String;
        }
        ResponseMode::Unknown
    }

    pub fn string_patterns(&self) -> &[String] {
        &self.string_patterns
    }

    pub fn binary_patterns(&self) -> &[String] {
        &self.binary_patterns
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Classify with the default pattern sets.
///
/// The built-in patterns are compiled once per process.
pub fn classify(content_type: &str) -> ResponseMode {
    static DEFAULT: OnceLock<Option<ContentTypeClassifier>> = OnceLock::new();
    match DEFAULT.get_or_init(|| ContentTypeClassifier::defaults().ok()) {
        Some(classifier) => classifier.classify(content_type),
        None => ResponseMode::Unknown,
    }
}

/// True for `application/json` and any `+json` structured syntax suffix.
pub fn is_json(content_type: &str) -> bool {
    let media_type = media_type(content_type);
    media_type == "application/json" || media_type.ends_with("+json")
}

/// The lowercase `type/subtype` part of a content type.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn has_charset(content_type: &str) -> bool {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .any(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
}
