//! Error types for the incident core.
//!
//! Configuration problems (missing or malformed key) are kept apart from decryption
//! problems so callers can fail a save closed while still degrading a single field on read.

use thiserror::Error;

/// The encryption key is absent or unusable, or the config sources could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ENCRYPTION_KEY not set in environment")]
    MissingKey,

    #[error("malformed encryption key: {0}")]
    MalformedKey(String),

    #[error("config load failed: {0}")]
    Load(#[from] config::ConfigError),
}

/// A stored value could not be turned back into plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Input is not `hex(iv):hex(ciphertext)` or the hex does not decode.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Padding check failed: wrong key or corrupted ciphertext.
    #[error("decryption failed (wrong key or corrupted data)")]
    Decrypt,

    #[error("decrypted bytes are not valid UTF-8")]
    Utf8,
}

/// Errors raised by the sled-backed incident and roster stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
