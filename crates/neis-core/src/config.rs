//! Configuration loaded from `config/neis.toml` and the environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | NEIS_CONFIG | config/neis | Path of the optional TOML file. |
//! | NEIS__STORAGE_PATH | ./data | Base directory for the sled databases. |
//! | NEIS__DEFAULT_SCHOOL_LEVEL | all | School level used when a teacher has none. |
//! | NEIS__HISTORY_LIMIT | 100 | Max incidents returned by history listings. |
//! | NEIS__PATTERN_WINDOW | 50 | Incidents considered by pattern analysis. |
//! | NEIS__ATTENDANCE_HISTORY_LIMIT | 30 | Attendance rows returned per student. |
//! | NEIS__CACHE_CAPACITY | 1024 | Max sealed incidents kept in the hot cache. |
//! | ENCRYPTION_KEY | (none) | 64 hex chars; required to save encrypted incidents. |

use crate::error::ConfigError;
use crate::guidance::SchoolLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the 64-hex-char field encryption key.
pub const ENV_ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";

const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub app_name: String,
    /// Base directory for sled DBs (incident and roster paths are derived from this).
    pub storage_path: String,
    #[serde(default)]
    pub default_school_level: SchoolLevel,
    pub history_limit: usize,
    pub pattern_window: usize,
    pub attendance_history_limit: usize,
    pub cache_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "NEIS Guidance".to_string(),
            storage_path: "./data".to_string(),
            default_school_level: SchoolLevel::All,
            history_limit: 100,
            pattern_window: 50,
            attendance_history_limit: 30,
            cache_capacity: 1024,
        }
    }
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `NEIS__*` > `NEIS_CONFIG` file > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("NEIS_CONFIG").unwrap_or_else(|_| "config/neis".to_string());
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name)?
            .set_default("storage_path", defaults.storage_path)?
            .set_default("default_school_level", "all")?
            .set_default("history_limit", defaults.history_limit as i64)?
            .set_default("pattern_window", defaults.pattern_window as i64)?
            .set_default("attendance_history_limit", defaults.attendance_history_limit as i64)?
            .set_default("cache_capacity", defaults.cache_capacity as i64)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(&config_path).required(false))
        };

        let built = builder
            .add_source(config::Environment::with_prefix("NEIS").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn incidents_path(&self) -> PathBuf {
        Path::new(&self.storage_path).join("neis_incidents")
    }

    pub fn roster_path(&self) -> PathBuf {
        Path::new(&self.storage_path).join("neis_roster")
    }
}

/// 256-bit AES key for the two sensitive incident fields.
///
/// Parsed from a 64-character hex string; whitespace inside the value is ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, ConfigError> {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.len() != KEY_LEN * 2 {
            return Err(ConfigError::MalformedKey(format!(
                "expected {} hex chars, got {}",
                KEY_LEN * 2,
                cleaned.len()
            )));
        }
        let bytes = hex::decode(&cleaned).map_err(|e| ConfigError::MalformedKey(e.to_string()))?;
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| ConfigError::MalformedKey("key must decode to 32 bytes".to_string()))?;
        Ok(Self(arr))
    }

    /// Reads `ENCRYPTION_KEY`. Absent or blank is `MissingKey`; anything else must be valid hex.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_ENCRYPTION_KEY) {
            Ok(v) if !v.trim().is_empty() => Self::from_hex(&v),
            _ => Err(ConfigError::MissingKey),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Result of loading the field key, kept by a store so later failures report the real cause.
#[derive(Debug, Clone)]
pub(crate) enum KeyState {
    Loaded(EncryptionKey),
    Missing,
    Malformed(String),
}

impl KeyState {
    /// Reads `ENCRYPTION_KEY`, logging the outcome. Never fails: a store without a usable key
    /// still opens and only rejects work on encrypted records.
    pub(crate) fn from_env() -> Self {
        match EncryptionKey::from_env() {
            Ok(key) => {
                tracing::info!(target: "neis::vault", "field encryption key loaded");
                Self::Loaded(key)
            }
            Err(ConfigError::MalformedKey(reason)) => {
                tracing::warn!(target: "neis::vault", error = %reason, "ENCRYPTION_KEY rejected");
                Self::Malformed(reason)
            }
            Err(_) => {
                tracing::warn!(
                    target: "neis::vault",
                    "ENCRYPTION_KEY not set; encrypted incidents cannot be saved or read"
                );
                Self::Missing
            }
        }
    }

    pub(crate) fn require(&self) -> Result<&EncryptionKey, ConfigError> {
        match self {
            Self::Loaded(key) => Ok(key),
            Self::Missing => Err(ConfigError::MissingKey),
            Self::Malformed(reason) => Err(ConfigError::MalformedKey(reason.clone())),
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl From<Option<EncryptionKey>> for KeyState {
    fn from(key: Option<EncryptionKey>) -> Self {
        key.map_or(Self::Missing, Self::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_hex_accepts_64_chars() {
        let key = EncryptionKey::from_hex(&"00".repeat(32)).unwrap();
        assert_eq!(key.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn key_from_hex_ignores_whitespace() {
        let spaced = format!("{} {}\n", "ab".repeat(16), "cd".repeat(16));
        assert!(EncryptionKey::from_hex(&spaced).is_ok());
    }

    #[test]
    fn key_from_hex_rejects_short_and_non_hex() {
        assert!(matches!(
            EncryptionKey::from_hex("abcd"),
            Err(ConfigError::MalformedKey(_))
        ));
        assert!(matches!(
            EncryptionKey::from_hex(&"zz".repeat(32)),
            Err(ConfigError::MalformedKey(_))
        ));
    }

    #[test]
    fn key_state_reports_why_it_is_unusable() {
        assert!(matches!(KeyState::Missing.require(), Err(ConfigError::MissingKey)));
        let bad = EncryptionKey::from_hex("abcd").map_or_else(
            |e| match e {
                ConfigError::MalformedKey(reason) => KeyState::Malformed(reason),
                _ => KeyState::Missing,
            },
            KeyState::Loaded,
        );
        assert!(matches!(bad.require(), Err(ConfigError::MalformedKey(_))));
        assert!(KeyState::from(Some(EncryptionKey::from_bytes([1u8; 32]))).is_loaded());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let key = EncryptionKey::from_bytes([7u8; 32]);
        assert_eq!(format!("{:?}", key), "EncryptionKey(..)");
    }

    #[test]
    fn derived_paths_live_under_storage_path() {
        let cfg = CoreConfig {
            storage_path: "/tmp/neis".to_string(),
            ..CoreConfig::default()
        };
        assert_eq!(cfg.incidents_path(), PathBuf::from("/tmp/neis/neis_incidents"));
        assert_eq!(cfg.roster_path(), PathBuf::from("/tmp/neis/neis_roster"));
    }
}
