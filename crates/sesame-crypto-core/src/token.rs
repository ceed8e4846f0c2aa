//! Binary device-token codec.
//!
//! Device registration returns an opaque base64 blob that carries the OTP
//! configuration for this device. Decoded, it is a nested big-endian
//! structure:
//!
//! ```text
//! outer:  token type (u8) | token length (u16) | inner token | 0x08 tag (u8)
//!         | iptmk length (u16) | iptmk
//! inner:  version (u8) | otp algorithm (u8) | otp length (u8)
//!         | hash algorithm (u8) | time step (u8) | start time (u32)
//!         | server time (u32) | wys option (u8) | suite length (u16)
//!         | suite | padding up to offset 128 | seed length (u16) | HMAC seed
//! ```
//!
//! [`parse_client_token`] decodes the structure and
//! [`validate_otp_profile`] then checks that it describes the one OTP
//! configuration this client implements (OCRA/HOTP/SHA-256, zero-digit
//! output).

use crate::error::CryptoError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed offset of the HMAC seed length field inside the inner token.
const HMAC_SEED_OFFSET: usize = 128;

/// Required seed and transaction-key length in bytes.
const KEY_LEN: usize = 32;

/// The only OCRA suite this client knows how to sign.
const SUPPORTED_SUITE: &str = "OCRA-1:HOTP-SHA256-0:QA08";

// ---------------------------------------------------------------------------
// OtpProfile
// ---------------------------------------------------------------------------

/// OTP configuration extracted from a device token.
///
/// `hmac_seed` signs OCRA challenges during sign-in; `iptmk` authenticates
/// later transactions. Both are secrets: the struct zeroizes on drop and
/// masks them in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OtpProfile {
    pub version: u8,
    pub otp_algorithm: u8,
    pub otp_length: u8,
    pub hash_algorithm: u8,
    /// OCRA time step in seconds.
    pub time_step: u32,
    pub start_time: u32,
    pub server_time: u32,
    pub wys_option: u8,
    /// OCRA suite string, e.g. `OCRA-1:HOTP-SHA256-0:QA08`.
    pub suite: String,
    /// Seed for signing OCRA challenges.
    pub hmac_seed: Vec<u8>,
    /// Instant password transaction master key.
    pub iptmk: Vec<u8>,
}

impl fmt::Debug for OtpProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpProfile")
            .field("version", &self.version)
            .field("otp_algorithm", &self.otp_algorithm)
            .field("otp_length", &self.otp_length)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("time_step", &self.time_step)
            .field("start_time", &self.start_time)
            .field("server_time", &self.server_time)
            .field("wys_option", &self.wys_option)
            .field("suite", &self.suite)
            .field("hmac_seed", &"***")
            .field("iptmk", &"***")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokenReader
// ---------------------------------------------------------------------------

/// Cursor over a token byte slice. Every read names the field it was after,
/// so truncation errors say exactly where the blob fell short.
struct TokenReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8], CryptoError> {
        let end = self.pos.checked_add(len).ok_or_else(|| truncated(field))?;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| truncated(field))?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self, field: &str) -> Result<u8, CryptoError> {
        Ok(self.read_bytes(1, field)?[0])
    }

    fn read_u16_be(&mut self, field: &str) -> Result<u16, CryptoError> {
        let bytes = self.read_bytes(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_be(&mut self, field: &str) -> Result<u32, CryptoError> {
        let bytes = self.read_bytes(4, field)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn seek(&mut self, pos: usize, field: &str) -> Result<(), CryptoError> {
        if pos > self.data.len() {
            return Err(truncated(field));
        }
        self.pos = pos;
        Ok(())
    }
}

fn truncated(field: &str) -> CryptoError {
    CryptoError::MalformedToken(format!("truncated at {field}"))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a decoded (non-base64) device token into an [`OtpProfile`].
///
/// Only the structure is checked here; use [`validate_otp_profile`] to
/// verify that the parsed configuration is actually supported.
///
/// # Errors
///
/// Returns `CryptoError::MalformedToken` naming the field at which the
/// blob ran out of bytes.
pub fn parse_client_token(token: &[u8]) -> Result<OtpProfile, CryptoError> {
    let mut outer = TokenReader::new(token);
    let _token_type = outer.read_u8("token type")?;
    let token_length = usize::from(outer.read_u16_be("token length")?);
    let inner_bytes = outer.read_bytes(token_length, "inner token")?;
    let _iptmk_tag = outer.read_u8("iptmk tag")?;
    let iptmk_length = usize::from(outer.read_u16_be("iptmk length")?);
    let iptmk = outer.read_bytes(iptmk_length, "iptmk")?.to_vec();

    let mut inner = TokenReader::new(inner_bytes);
    let version = inner.read_u8("version")?;
    let otp_algorithm = inner.read_u8("otp algorithm")?;
    let otp_length = inner.read_u8("otp length")?;
    let hash_algorithm = inner.read_u8("hash algorithm")?;
    let time_step = u32::from(inner.read_u8("time step")?);
    let start_time = inner.read_u32_be("start time")?;
    let server_time = inner.read_u32_be("server time")?;
    let wys_option = inner.read_u8("wys option")?;
    let suite_length = usize::from(inner.read_u16_be("suite length")?);
    let suite_bytes = inner.read_bytes(suite_length, "suite")?;
    let suite = std::str::from_utf8(suite_bytes)
        .map_err(|_| CryptoError::MalformedToken("suite is not valid UTF-8".into()))?
        .to_owned();

    // The seed length field sits at a fixed offset, past the suite padding.
    inner.seek(HMAC_SEED_OFFSET, "HMAC seed offset")?;
    let hmac_seed_length = usize::from(inner.read_u16_be("HMAC seed length")?);
    let hmac_seed = inner.read_bytes(hmac_seed_length, "HMAC seed")?.to_vec();

    Ok(OtpProfile {
        version,
        otp_algorithm,
        otp_length,
        hash_algorithm,
        time_step,
        start_time,
        server_time,
        wys_option,
        suite,
        hmac_seed,
        iptmk,
    })
}

/// Check that a parsed profile matches the only supported configuration:
/// token version 3, OTP algorithm 1 (TOTP-style OCRA), zero-digit output,
/// hash algorithm 2 (SHA-256), a positive time step and 32-byte keys.
///
/// # Errors
///
/// Returns `CryptoError::UnsupportedOtpProfile` naming the first field
/// that deviates.
pub fn validate_otp_profile(profile: &OtpProfile) -> Result<(), CryptoError> {
    fn unsupported(what: String) -> Result<(), CryptoError> {
        Err(CryptoError::UnsupportedOtpProfile(what))
    }

    if profile.version != 3 {
        return unsupported(format!("version {} (expected 3)", profile.version));
    }
    if profile.otp_algorithm != 1 {
        return unsupported(format!(
            "OTP algorithm {} (expected 1)",
            profile.otp_algorithm
        ));
    }
    if profile.otp_length != 0 {
        return unsupported(format!("OTP length {} (expected 0)", profile.otp_length));
    }
    if profile.hash_algorithm != 2 {
        return unsupported(format!(
            "hash algorithm {} (expected 2, SHA-256)",
            profile.hash_algorithm
        ));
    }
    if profile.time_step == 0 {
        return unsupported("time step must be positive".into());
    }
    if profile.suite != SUPPORTED_SUITE {
        return unsupported(format!(
            "suite {:?} (expected {SUPPORTED_SUITE:?})",
            profile.suite
        ));
    }
    if profile.hmac_seed.len() != KEY_LEN {
        return unsupported(format!(
            "HMAC seed is {} bytes (expected {KEY_LEN})",
            profile.hmac_seed.len()
        ));
    }
    if profile.iptmk.len() != KEY_LEN {
        return unsupported(format!(
            "iptmk is {} bytes (expected {KEY_LEN})",
            profile.iptmk.len()
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
