//! SHA-256 / HMAC-SHA256 / PBKDF2-HMAC-SHA256 primitives and the True Key
//! password-hash scheme.
//!
//! This module provides:
//! - [`sha256`] / [`hmac_sha256`] — digest and MAC building blocks
//! - [`pbkdf2_sha256`] — iterative key stretching into a [`SecretBuffer`]
//! - [`hash_password`] — the exact `"tk-v1-" + hex(...)` encoding the server
//!   expects for password verification
//!
//! The password-hash parameterization (SHA-256 of the username as salt,
//! 10 000 iterations, 32-byte output) is part of the wire contract and must
//! not change.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 iteration count for the password-hash scheme.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Output length of the password-hash derivation in bytes.
pub const DERIVED_KEY_LEN: usize = 32;

/// Prefix of the hashed-password wire format.
pub const PASSWORD_HASH_PREFIX: &str = "tk-v1-";

/// SHA-256 digest of the input.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// HMAC-SHA256 of `message` under `key`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the MAC cannot be keyed
/// (HMAC accepts any key length, so this is effectively unreachable but
/// kept explicit rather than panicking).
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("HMAC key rejected: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// PBKDF2-HMAC-SHA256 key stretching.
///
/// Returns the derived key in a [`SecretBuffer`]; the intermediate buffer is
/// zeroized after copying.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if `iterations` is zero or `length`
/// is zero.
pub fn pbkdf2_sha256(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    length: usize,
) -> Result<SecretBuffer, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be positive".into(),
        ));
    }
    if length == 0 {
        return Err(CryptoError::KeyDerivation(
            "output length must be positive".into(),
        ));
    }

    let mut output = vec![0u8; length];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut output);

    let result = SecretBuffer::new(&output)
        .map_err(|e| CryptoError::KeyDerivation(format!("secure buffer allocation failed: {e}")))?;
    output.zeroize();
    Ok(result)
}

/// Hash a password for the server's password-verification step.
///
/// Produces `"tk-v1-" + hex(PBKDF2-HMAC-SHA256(password, SHA256(username),
/// 10000, 32))`. The result is transmitted to the server, so it is returned
/// as a plain `String` rather than a secret.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the derivation fails.
pub fn hash_password(username: &str, password: &str) -> Result<String, CryptoError> {
    let salt = sha256(username.as_bytes());
    let derived = pbkdf2_sha256(
        password.as_bytes(),
        &salt,
        PBKDF2_ITERATIONS,
        DERIVED_KEY_LEN,
    )?;
    let mut out = String::with_capacity(
        PASSWORD_HASH_PREFIX
            .len()
            .saturating_add(DERIVED_KEY_LEN.saturating_mul(2)),
    );
    out.push_str(PASSWORD_HASH_PREFIX);
    out.push_str(&HEXLOWER.encode(derived.expose()));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
