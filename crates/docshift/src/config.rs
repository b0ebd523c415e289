//! Configuration types for docshift.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Where documents are read from.
    pub source: EndpointConfig,
    /// Where documents are written to.
    pub destination: EndpointConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// One store endpoint plus the index/type addressed on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Store base URL (e.g., http://localhost:9200).
    pub url: String,
    /// Index name.
    pub index: String,
    /// Document type name.
    #[serde(rename = "type", alias = "doc_type")]
    pub doc_type: String,
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Documents requested per scroll page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pause between two pages.
    #[serde(default, with = "duration_format")]
    pub scroll_delay: Duration,
    /// Keep-alive sent with the cursor-opening search.
    #[serde(default = "default_open_keep_alive", with = "duration_format")]
    pub open_keep_alive: Duration,
    /// Keep-alive sent with every cursor advance.
    #[serde(default = "default_keep_alive", with = "duration_format")]
    pub keep_alive: Duration,
    /// Optional query restricting the migrated documents (store query DSL).
    #[serde(default)]
    pub query: Option<serde_json::Value>,
    /// Field renames applied to every document (`source_field` -> `dest_field`).
    #[serde(default)]
    pub field_mappings: HashMap<String, String>,
    /// Dry run mode (walk and transform, never write).
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            scroll_delay: Duration::ZERO,
            open_keep_alive: default_open_keep_alive(),
            keep_alive: default_keep_alive(),
            query: None,
            field_mappings: HashMap::new(),
            dry_run: false,
        }
    }
}

fn default_page_size() -> usize {
    1000
}

fn default_open_keep_alive() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(60)
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.source.validate("source")?;
        self.destination.validate("destination")?;

        if self.options.page_size == 0 {
            return Err(Error::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.options.keep_alive.is_zero() || self.options.open_keep_alive.is_zero() {
            return Err(Error::Config("keep-alive must be greater than 0".to_string()));
        }
        // The cursor expires if the walk pauses longer than its keep-alive.
        if self.options.scroll_delay >= self.options.keep_alive {
            return Err(Error::Config(format!(
                "scroll_delay ({}) must be shorter than keep_alive ({})",
                duration_format::format_duration(self.options.scroll_delay),
                duration_format::format_duration(self.options.keep_alive)
            )));
        }
        Ok(())
    }
}

impl EndpointConfig {
    fn validate(&self, role: &str) -> Result<()> {
        validate_url(&self.url)?;
        if self.index.is_empty() {
            return Err(Error::Config(format!("{} index cannot be empty", role)));
        }
        if self.doc_type.is_empty() {
            return Err(Error::Config(format!("{} type cannot be empty", role)));
        }
        Ok(())
    }
}

/// Validates a store URL (http or https only).
pub fn validate_url(url: &str) -> Result<()> {
    let has_valid_scheme = ["http://", "https://"].iter().any(|s| url.starts_with(s));

    if !has_valid_scheme {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }

    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }

    Ok(())
}

/// Store time values such as `500ms`, `30s`, `5m`.
pub mod duration_format {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a time value string.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    /// Deserializes a time value string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parses `<n>ms`, `<n>s`, `<n>m`, `<n>h` or `<n>d`.
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        let (value_str, unit) = if let Some(v) = s.strip_suffix("ms") {
            (v, "ms")
        } else if let Some(v) = s.strip_suffix('s') {
            (v, "s")
        } else if let Some(v) = s.strip_suffix('m') {
            (v, "m")
        } else if let Some(v) = s.strip_suffix('h') {
            (v, "h")
        } else if let Some(v) = s.strip_suffix('d') {
            (v, "d")
        } else {
            return Err(format!("invalid duration format: {}", s));
        };

        let value: u64 = value_str
            .trim()
            .parse()
            .map_err(|_| format!("invalid numeric value: {}", value_str))?;

        let duration = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            "d" => Duration::from_secs(value * 86_400),
            _ => return Err(format!("unknown unit: {}", unit)),
        };

        Ok(duration)
    }

    /// Formats a duration in the largest unit that represents it exactly.
    #[must_use]
    pub fn format_duration(d: Duration) -> String {
        if d.subsec_nanos() != 0 || d.is_zero() {
            return format!("{}ms", d.as_millis());
        }
        let secs = d.as_secs();
        if secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}
