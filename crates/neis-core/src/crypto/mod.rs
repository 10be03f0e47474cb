//! Field encryption at rest for the two free-text incident fields.

pub mod cipher;
pub mod format;

pub use cipher::{decrypt, encrypt, generate_key, IV_LEN};
pub use format::{looks_encrypted, open_field, seal_field, DECRYPTION_FAILED};
