//! Configuration for resource managers and location parsing
//!
//! This module provides the settings a [`ResourceManager`](crate::ResourceManager)
//! is built from, and a helper that infers a resource's location kind from a URI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::resource::LocationKind;

/// Default compression level for the built-in compression transformers
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Default timeout for URL handler requests
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings used to build a manager with the default transformers and handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Compression level for `zlib.bin` and `gz` (0-9)
    pub compression_level: u32,
    /// Timeout in seconds for fetching URL resources
    pub http_timeout_secs: u64,
    /// Root for relative filesystem locations (defaults to the working directory)
    pub base_dir: Option<PathBuf>,
}

impl ManagerConfig {
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.compression_level > 9 {
            return Err(crate::UssrError::validation(format!(
                "Compression level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::UssrError::validation(
                "HTTP timeout must be at least one second",
            ));
        }
        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            base_dir: None,
        }
    }
}

/// A location string together with the kind inferred for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub kind: LocationKind,
    pub location: String,
}

impl Location {
    /// Infer the location kind from a URI
    ///
    /// Supports formats:
    /// - `http://...` or `https://...` for URL resources
    /// - `mem://label` for in-memory resources
    /// - anything else is treated as a filesystem directory
    pub fn parse(uri: &str) -> crate::Result<Self> {
        let lower = uri.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            if uri.split_once("://").map_or(true, |(_, rest)| rest.is_empty()) {
                return Err(crate::UssrError::validation("Invalid URL: missing host"));
            }
            return Ok(Self {
                kind: LocationKind::Url,
                location: uri.to_string(),
            });
        }
        if let Some(label) = uri.strip_prefix("mem://") {
            return Ok(Self {
                kind: LocationKind::Memory,
                location: label.to_string(),
            });
        }
        Ok(Self {
            kind: LocationKind::Filesystem,
            location: uri.to_string(),
        })
    }
}
