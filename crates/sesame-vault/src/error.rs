//! Error types for the vault client.

use sesame_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced while opening a vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A cryptographic operation failed (bad token, wrong password, ...).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The HTTP transport failed (network, TLS, non-2xx status).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with JSON we cannot make sense of.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server's response envelope reported failure.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The authentication check succeeded but the second factor has not
    /// been approved yet. Not fatal; check again later.
    #[error("authentication is still pending")]
    AuthPending,

    /// The server asked for a two-factor step this client does not
    /// implement.
    #[error("two-factor step {0} is not supported")]
    UnsupportedProtocolStep(i64),

    /// The prompt returned an answer outside the offered set.
    #[error("invalid prompt answer: {0}")]
    InvalidPromptAnswer(String),

    /// Two-factor verification ended in a failure state.
    #[error("two-factor verification failed: {0}")]
    TwoFactorFailed(String),

    /// A decrypted vault field is not valid UTF-8.
    #[error("decrypted {field} is not valid UTF-8")]
    NotUtf8 {
        /// Which account field failed to decode.
        field: &'static str,
    },
}
