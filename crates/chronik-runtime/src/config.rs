//! Environment configuration.
//!
//! The environment variable names are the external contract; internally the
//! factory choice is a tagged [`StorageConfig`] variant produced by one
//! loader. [`Settings::from_map`] takes an explicit variable map so tests
//! never touch the process environment; [`Settings::from_env`] is the
//! convenience wrapper over it.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `INFRASTRUCTURE_FACTORY` named no known recorder implementation.
    #[error("unknown infrastructure factory `{0}`")]
    UnknownFactory(String),
    /// A boolean variable held something outside the accepted tokens.
    #[error("{name} must be one of y/yes/t/true/on/1/n/no/f/false/off/0, got `{value}`")]
    InvalidFlag {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
    /// A required variable was absent.
    #[error("missing required variable {0}")]
    Missing(&'static str),
    /// `COMPRESSOR_TOPIC` named no known compressor.
    #[error("unknown compressor `{0}`")]
    UnknownCompressor(String),
    /// `CIPHER_TOPIC` named no known cipher.
    #[error("unknown cipher `{0}`")]
    UnknownCipher(String),
}

/// Parse the strict boolean grammar used by flag variables.
///
/// Accepts exactly six truthy and six falsy tokens, case-insensitively;
/// anything else is rejected rather than defaulted.
pub fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_owned(),
        }),
    }
}

/// Recorder implementation selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    /// In-memory recorders (non-persistent).
    Memory,
    /// SQLite recorders.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Whether to create tables on startup.
        create_table: bool,
    },
}

/// Cipher selection and key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherSettings {
    /// Base64-encoded 32-byte key.
    pub key: String,
}

/// Everything needed to wire an application.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Which recorder implementation to construct.
    pub storage: StorageConfig,
    /// Whether a snapshot store is constructed.
    pub snapshotting_enabled: bool,
    /// Whether record state is compressed.
    pub compression_enabled: bool,
    /// Cipher configuration, when record state is encrypted at rest.
    pub cipher: Option<CipherSettings>,
    /// Notification log section size cap.
    pub section_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageConfig::Memory,
            snapshotting_enabled: false,
            compression_enabled: false,
            cipher: None,
            section_size: crate::notification_log::DEFAULT_SECTION_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_map(&env::vars().collect())
    }

    /// Load settings from an explicit variable map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        let factory = vars
            .get("INFRASTRUCTURE_FACTORY")
            .map(String::as_str)
            .unwrap_or("memory");
        settings.storage = match factory.to_lowercase().as_str() {
            "memory" => StorageConfig::Memory,
            "sqlite" => {
                let path = vars
                    .get("SQLITE_DBNAME")
                    .ok_or(ConfigError::Missing("SQLITE_DBNAME"))?;
                let create_table = match vars.get("CREATE_TABLE") {
                    Some(value) => parse_bool("CREATE_TABLE", value)?,
                    None => true,
                };
                StorageConfig::Sqlite {
                    path: PathBuf::from(path),
                    create_table,
                }
            }
            other => return Err(ConfigError::UnknownFactory(other.to_owned())),
        };

        if let Some(value) = vars.get("IS_SNAPSHOTTING_ENABLED") {
            settings.snapshotting_enabled = parse_bool("IS_SNAPSHOTTING_ENABLED", value)?;
        }

        if let Some(topic) = vars.get("COMPRESSOR_TOPIC") {
            match topic.to_lowercase().as_str() {
                "zlib" => settings.compression_enabled = true,
                other => return Err(ConfigError::UnknownCompressor(other.to_owned())),
            }
        }

        if let Some(topic) = vars.get("CIPHER_TOPIC") {
            match topic.to_lowercase().as_str() {
                "aes256gcm" => {
                    let key = vars
                        .get("CIPHER_KEY")
                        .ok_or(ConfigError::Missing("CIPHER_KEY"))?;
                    settings.cipher = Some(CipherSettings { key: key.clone() });
                }
                other => return Err(ConfigError::UnknownCipher(other.to_owned())),
            }
        }

        Ok(settings)
    }
}
