//! Cryptographic error types for `sesame-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Device token blob is structurally broken — truncated at a field boundary.
    #[error("malformed device token: {0}")]
    MalformedToken(String),

    /// Device token parsed fine but describes an OTP configuration this
    /// client does not implement. Kept distinct from [`Self::MalformedToken`]
    /// so callers can tell garbled data from a valid-but-unsupported server
    /// setup.
    #[error("unsupported OTP profile: {0}")]
    UnsupportedOtpProfile(String),

    /// CCM nonce shorter than the 7-byte minimum.
    #[error("nonce must be at least 7 bytes long, got {0}")]
    InvalidNonceLength(usize),

    /// CCM tag length outside the allowed set.
    #[error("tag must be 4, 8, 10, 12, 14 or 16 bytes long, got {0}")]
    InvalidTagLength(usize),

    /// Associated-data length must be positive to be encodable.
    #[error("associated data length must be positive")]
    InvalidAssociatedDataLength,

    /// Authentication tag verification failed — ciphertext tampered, wrong
    /// key, wrong nonce, or wrong associated data. No plaintext is released.
    #[error("CCM tag doesn't match")]
    TagMismatch,

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Key derivation failure (PBKDF2 parameter validation).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Versioned cipher blob is structurally broken.
    #[error("malformed cipher blob: {0}")]
    MalformedBlob(String),

    /// Versioned cipher blob uses a format this client does not implement.
    #[error("unsupported cipher blob format: {0}")]
    UnsupportedBlobFormat(String),

    /// OCRA challenge generation or signing error.
    #[error("OTP error: {0}")]
    Otp(String),

    /// Secure memory allocation failure (mlock, CSPRNG).
    #[error("secure memory error: {0}")]
    SecureMemory(String),
}
