//! Ciphertext shape detection and the write/read policies built on it.
//!
//! A value is treated as ciphertext only when it is exactly 32 hex chars, a colon, and
//! one or more hex chars. Everything else is plaintext: on write it gets encrypted, on
//! read it is returned unchanged (legacy rows that predate encryption).

use super::cipher;
use crate::config::EncryptionKey;
use crate::error::CipherError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Shown in place of a field that could not be decrypted.
pub const DECRYPTION_FAILED: &str = "[Decryption Failed]";

static CIPHERTEXT_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{32}:[0-9a-fA-F]+$").expect("static ciphertext pattern")
});

/// True iff `value` has the `32hex:1+hex` shape.
pub fn looks_encrypted(value: &str) -> bool {
    CIPHERTEXT_SHAPE.is_match(value)
}

/// Write path: encrypt unless the value already looks like ciphertext.
///
/// Applying this twice to the same stored value leaves it unchanged the second time.
pub fn seal_field(value: &str, key: &EncryptionKey) -> String {
    if looks_encrypted(value) {
        return value.to_string();
    }
    cipher::encrypt(value, key).unwrap_or_default()
}

/// Read path: decrypt values that look like ciphertext, pass everything else through.
pub fn open_field(value: &str, key: &EncryptionKey) -> Result<String, CipherError> {
    if looks_encrypted(value) {
        cipher::decrypt(value, key)
    } else {
        Ok(value.to_string())
    }
}
