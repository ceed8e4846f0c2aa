//! OCRA challenge generation for the second sign-in step.
//!
//! The server hands out an OCRA suite and HMAC seed in the device token;
//! at sign-in time the client picks a random 128-byte challenge and signs
//! `suite || 0x00 || challenge (zero-padded to 128) || counter`, where the
//! counter is the Unix time divided by the suite's time step, as an 8-byte
//! big-endian integer.

use crate::error::CryptoError;
use crate::kdf::hmac_sha256;
use crate::token::OtpProfile;
use rand::{CryptoRng, RngCore};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Challenge length in bytes, fixed by the `QA08` suite question format.
pub const CHALLENGE_LEN: usize = 128;

/// A signed OCRA challenge, ready for the `otpData` request field.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OtpChallenge {
    /// Random challenge bytes (the `qn` field).
    pub challenge: Vec<u8>,
    /// Unix timestamp the signature was computed for.
    #[zeroize(skip)]
    pub unix_seconds: u64,
    /// HMAC-SHA256 signature over suite, challenge and time counter
    /// (the `otp` field).
    pub signature: Vec<u8>,
}

/// Generate and sign a challenge using the given randomness source and
/// timestamp. Deterministic inputs make this the testable core of
/// [`generate_random_challenge`].
///
/// # Errors
///
/// Returns `CryptoError::Otp` if the profile's time step is zero, or a key
/// error from the underlying HMAC.
pub fn generate_challenge<R: RngCore + CryptoRng>(
    profile: &OtpProfile,
    rng: &mut R,
    unix_seconds: u64,
) -> Result<OtpChallenge, CryptoError> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    rng.fill_bytes(&mut challenge);
    let signature = sign_challenge(profile, &challenge, unix_seconds)?;
    Ok(OtpChallenge {
        challenge,
        unix_seconds,
        signature,
    })
}

/// Generate and sign a challenge from the OS CSPRNG and the current time.
///
/// # Errors
///
/// Returns `CryptoError::Otp` if the system clock reads before the Unix
/// epoch or the profile's time step is zero.
pub fn generate_random_challenge(profile: &OtpProfile) -> Result<OtpChallenge, CryptoError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CryptoError::Otp(format!("system clock is before the Unix epoch: {e}")))?
        .as_secs();
    generate_challenge(profile, &mut rand::rngs::OsRng, now)
}

/// Sign a challenge under the profile's HMAC seed.
fn sign_challenge(
    profile: &OtpProfile,
    challenge: &[u8],
    unix_seconds: u64,
) -> Result<Vec<u8>, CryptoError> {
    if challenge.is_empty() || challenge.len() > CHALLENGE_LEN {
        return Err(CryptoError::Otp(format!(
            "challenge must be 1 to {CHALLENGE_LEN} bytes long, got {}",
            challenge.len()
        )));
    }
    if profile.time_step == 0 {
        return Err(CryptoError::Otp("time step must be positive".into()));
    }

    // time_step is validated non-zero above.
    #[allow(clippy::arithmetic_side_effects)]
    let counter = unix_seconds / u64::from(profile.time_step);

    let mut message = Vec::with_capacity(
        profile
            .suite
            .len()
            .saturating_add(1)
            .saturating_add(CHALLENGE_LEN)
            .saturating_add(8),
    );
    message.extend_from_slice(profile.suite.as_bytes());
    message.push(0);
    message.extend_from_slice(challenge);
    let padding = CHALLENGE_LEN.saturating_sub(challenge.len());
    message.resize(message.len().saturating_add(padding), 0);
    message.extend_from_slice(&counter.to_be_bytes());

    let signature = hmac_sha256(&profile.hmac_seed, &message)?;
    message.zeroize();
    Ok(signature.to_vec())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
