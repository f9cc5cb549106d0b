#![forbid(unsafe_code)]

//! Registry configuration.
//!
//! [`KnobsConfig`] holds the process-wide knobs of the rendering registry.
//! With the `config` feature it can be loaded from TOML or JSON at startup:
//!
//! ```toml
//! # knobs.toml
//! visible = false
//! order = "creation"
//! ```
//!
//! ```rust,ignore
//! let config = KnobsConfig::from_toml_file("knobs.toml")?;
//! let registry = Registry::with_config(config);
//! ```
//!
//! Missing fields take their [`Default`] values, which reproduce the
//! behavior of an unconfigured registry.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Where a session lands in the registry when it (re)activates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum RegistryOrder {
    /// Always at the end. A session that unsubscribes and resubscribes moves
    /// to the back.
    #[default]
    Append,
    /// Sorted by session creation, so a resubscribing session returns to its
    /// original slot.
    Creation,
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct KnobsConfig {
    /// Whether the rendering surface starts out shown.
    pub visible: bool,
    /// Placement of activating sessions.
    pub order: RegistryOrder,
}

impl Default for KnobsConfig {
    fn default() -> Self {
        Self {
            visible: true,
            order: RegistryOrder::Append,
        }
    }
}

impl KnobsConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }
}

/// Errors from loading a [`KnobsConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_visible_append() {
        let config = KnobsConfig::default();
        assert!(config.visible);
        assert_eq!(config.order, RegistryOrder::Append);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_fields() {
        let config = KnobsConfig::from_toml_str("visible = false\norder = \"creation\"\n")
            .expect("valid toml");
        assert!(!config.visible);
        assert_eq!(config.order, RegistryOrder::Creation);
    }

    #[cfg(feature = "config")]
    #[test]
    fn empty_documents_use_defaults() {
        assert_eq!(
            KnobsConfig::from_toml_str("").expect("empty toml"),
            KnobsConfig::default()
        );
        assert_eq!(
            KnobsConfig::from_json_str("{}").expect("empty json"),
            KnobsConfig::default()
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_file_round_trip() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "order": "creation" }}"#).expect("write");
        let config = KnobsConfig::from_json_file(file.path()).expect("load");
        assert!(config.visible);
        assert_eq!(config.order, RegistryOrder::Creation);
    }

    #[cfg(feature = "config")]
    #[test]
    fn unknown_order_is_a_parse_error() {
        let err = KnobsConfig::from_json_str(r#"{ "order": "random" }"#).expect_err("bad order");
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("JSON parse error"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "I/O error: gone");
    }
}
