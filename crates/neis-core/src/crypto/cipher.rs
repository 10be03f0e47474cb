//! AES-256-CBC field cipher.
//!
//! ## Wire Format
//!
//! Each encrypted value is stored inline as a plain string: `hex(iv):hex(ciphertext)`.
//! The 16-byte IV is drawn from `OsRng` on every call, so the same plaintext never
//! encrypts to the same string twice. Padding is PKCS#7.

use crate::config::EncryptionKey;
use crate::error::CipherError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// Encrypts `plaintext` into `hex(iv):hex(ciphertext)`.
///
/// Empty input is a no-op and yields `None`, mirroring an absent field.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Option<String> {
    if plaintext.is_empty() {
        return None;
    }
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Some(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
}

/// Decrypts a value produced by [`encrypt`].
///
/// The caller decides whether a value is ciphertext at all (see `format::looks_encrypted`);
/// anything that does not split into a 16-byte IV and whole cipher blocks is `Malformed`.
pub fn decrypt(encoded: &str, key: &EncryptionKey) -> Result<String, CipherError> {
    let (iv_hex, data_hex) = encoded
        .split_once(':')
        .ok_or_else(|| CipherError::Malformed("missing ':' separator".to_string()))?;

    let iv_bytes = hex::decode(iv_hex).map_err(|e| CipherError::Malformed(format!("iv: {e}")))?;
    let iv: [u8; IV_LEN] = iv_bytes
        .try_into()
        .map_err(|v: Vec<u8>| CipherError::Malformed(format!("iv is {} bytes, expected {IV_LEN}", v.len())))?;

    let data = hex::decode(data_hex).map_err(|e| CipherError::Malformed(format!("ciphertext: {e}")))?;
    if data.is_empty() || data.len() % BLOCK_LEN != 0 {
        return Err(CipherError::Malformed(format!(
            "ciphertext length {} is not a whole number of blocks",
            data.len()
        )));
    }

    let plain = Aes256CbcDec::new(key.as_bytes().into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&data)
        .map_err(|_| CipherError::Decrypt)?;

    String::from_utf8(plain).map_err(|_| CipherError::Utf8)
}

/// Fresh random 32-byte key, hex-encoded. Used for provisioning only.
pub fn generate_key() -> String {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    hex::encode(key)
}
