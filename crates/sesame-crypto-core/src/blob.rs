//! Versioned cipher blob decoding.
//!
//! Vault fields (the encrypted master key, account passwords, notes) arrive
//! as base64 blobs with a two-byte header:
//!
//! ```text
//! 0x00 | format version (u8) | 16-byte IV | ciphertext ‖ 8-byte CCM tag
//! ```
//!
//! Version 4 is AES-256-CCM with no associated data; it is the only format
//! this client implements. An empty blob is a valid encoding of the empty
//! plaintext and is passed through without touching the cipher.

use crate::ccm;
use crate::error::CryptoError;
use crate::kdf::{pbkdf2_sha256, DERIVED_KEY_LEN, PBKDF2_ITERATIONS};
use crate::memory::SecretBuffer;

/// Blob format version for AES-256-CCM.
const FORMAT_AES_256_CCM: u8 = 4;

/// IV length carried in the blob header.
const IV_LEN: usize = 16;

/// CCM tag length used by the vault format.
const TAG_LEN: usize = 8;

/// Header length: leading zero byte, version byte, IV.
const HEADER_LEN: usize = 2 + IV_LEN;

/// Decrypt a versioned cipher blob with the given key.
///
/// An empty blob decrypts to an empty plaintext.
///
/// # Errors
///
/// - `CryptoError::MalformedBlob` if the blob is shorter than its header
/// - `CryptoError::UnsupportedBlobFormat` if the leading byte is not zero
///   or the version is not 4
/// - `CryptoError::TagMismatch` if authentication fails (wrong key or
///   tampered data)
pub fn decrypt_blob(key: &[u8], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    if blob.len() < 2 {
        return Err(CryptoError::MalformedBlob(format!(
            "blob too short: {} bytes",
            blob.len()
        )));
    }
    if blob[0] != 0 {
        return Err(CryptoError::UnsupportedBlobFormat(format!(
            "unexpected leading byte {:#04x}",
            blob[0]
        )));
    }
    if blob[1] != FORMAT_AES_256_CCM {
        return Err(CryptoError::UnsupportedBlobFormat(format!(
            "version {} (expected {FORMAT_AES_256_CCM})",
            blob[1]
        )));
    }
    if blob.len() < HEADER_LEN {
        return Err(CryptoError::MalformedBlob(format!(
            "blob too short for its IV: {} bytes",
            blob.len()
        )));
    }

    let iv = &blob[2..HEADER_LEN];
    let ciphertext_and_tag = &blob[HEADER_LEN..];
    let aes = ccm::AesKey::new(key)?;
    ccm::decrypt(&aes, ciphertext_and_tag, iv, &[], TAG_LEN)
}

/// Derive the key-encryption key from the master password and decrypt the
/// vault's master key.
///
/// The key-encryption key is PBKDF2-HMAC-SHA256 over the password with the
/// server-provided salt, 10 000 iterations, 32 bytes. The decrypted master
/// key is returned in a [`SecretBuffer`].
///
/// # Errors
///
/// Propagates derivation errors and any [`decrypt_blob`] failure; a wrong
/// password surfaces as `CryptoError::TagMismatch`.
pub fn decrypt_master_key(
    password: &str,
    salt: &[u8],
    encrypted_key: &[u8],
) -> Result<SecretBuffer, CryptoError> {
    let kek = pbkdf2_sha256(
        password.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        DERIVED_KEY_LEN,
    )?;
    let mut master_key = decrypt_blob(kek.expose(), encrypted_key)?;
    let result = SecretBuffer::new(&master_key)
        .map_err(|e| CryptoError::SecureMemory(format!("master key allocation failed: {e}")))?;
    zeroize::Zeroize::zeroize(&mut master_key);
    Ok(result)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
