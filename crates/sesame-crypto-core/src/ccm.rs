//! AES-CCM authenticated encryption, byte-compatible with the SJCL encoding.
//!
//! This module provides:
//! - [`AesKey`] — AES-128/192/256 block-cipher dispatch on key length
//! - [`encrypt`] — CCM seal: `ciphertext ‖ tag`
//! - [`decrypt`] — CCM open; the tag is verified before any plaintext is
//!   released
//! - [`encode_adata_length`] — the variable-width associated-data length
//!   prefix
//!
//! # Compatibility
//!
//! The vault blobs this client receives were produced by the SJCL JavaScript
//! library, so the byte layout here reproduces SJCL exactly rather than the
//! general RFC 3610 profile:
//! - The length-of-length `L` is the larger of what the message length needs
//!   (2–4 bytes) and what the nonce length forces (`15 - nonce_len`), and the
//!   nonce is truncated to `15 - L` bytes.
//! - Associated-data lengths below `0xfeff` are encoded as a 2-byte
//!   big-endian value; larger values get a `0xfffe` marker plus a 4-byte
//!   length (`0xffff` plus 8 bytes beyond `u32`).
//!
//! With a 13-byte nonce and short messages this degenerates to standard CCM,
//! which is why the RFC 3610 vectors in the tests pass unchanged.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use crate::error::CryptoError;
use zeroize::Zeroize;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// Minimum nonce length accepted by CCM.
pub const MIN_NONCE_LEN: usize = 7;

/// Tag lengths CCM can produce.
pub const VALID_TAG_LENGTHS: [usize; 6] = [4, 8, 10, 12, 14, 16];

// ---------------------------------------------------------------------------
// Block cipher dispatch
// ---------------------------------------------------------------------------

/// An expanded AES key, selected by key length.
///
/// The vault master key is AES-256, but the RFC 3610 reference vectors are
/// AES-128, so all three standard key sizes are supported.
#[derive(Debug)]
pub enum AesKey {
    /// 16-byte key.
    Aes128(Aes128),
    /// 24-byte key.
    Aes192(Aes192),
    /// 32-byte key.
    Aes256(Aes256),
}

impl AesKey {
    /// Expand an AES key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` unless the key is exactly
    /// 16, 24, or 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        match key.len() {
            16 => Aes128::new_from_slice(key)
                .map(Self::Aes128)
                .map_err(|e| CryptoError::InvalidKeyMaterial(format!("AES-128 key: {e}"))),
            24 => Aes192::new_from_slice(key)
                .map(Self::Aes192)
                .map_err(|e| CryptoError::InvalidKeyMaterial(format!("AES-192 key: {e}"))),
            32 => Aes256::new_from_slice(key)
                .map(Self::Aes256)
                .map_err(|e| CryptoError::InvalidKeyMaterial(format!("AES-256 key: {e}"))),
            other => Err(CryptoError::InvalidKeyMaterial(format!(
                "invalid AES key length: {other} bytes (expected 16, 24 or 32)"
            ))),
        }
    }

    /// Encrypt one 16-byte block in place.
    fn encrypt_block(&self, block: &mut [u8; BLOCK_LEN]) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes192(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// CCM-encrypt `plaintext`, returning `ciphertext ‖ tag`.
///
/// # Arguments
///
/// - `nonce` — at least 7 bytes; only the first `15 - L` bytes are used
/// - `adata` — associated data, authenticated but not encrypted (may be empty)
/// - `tag_length` — one of {4, 8, 10, 12, 14, 16}
///
/// # Errors
///
/// Returns `CryptoError::InvalidNonceLength` or `CryptoError::InvalidTagLength`
/// on parameter violations.
pub fn encrypt(
    key: &AesKey,
    plaintext: &[u8],
    nonce: &[u8],
    adata: &[u8],
    tag_length: usize,
) -> Result<Vec<u8>, CryptoError> {
    let length_length = check_params(plaintext.len(), nonce, tag_length)?;
    let nonce = effective_nonce(nonce, length_length);

    let tag = compute_tag(key, plaintext, nonce, adata, tag_length, length_length)?;

    let mut output = plaintext.to_vec();
    let mut tag = tag;
    apply_ctr(key, &mut output, &mut tag, nonce, length_length);

    output.extend_from_slice(&tag[..tag_length]);
    Ok(output)
}

/// CCM-decrypt `ciphertext ‖ tag`, returning the plaintext.
///
/// The authentication tag is verified (in constant time) before any
/// plaintext is handed to the caller; on mismatch the decrypted buffer is
/// zeroized and dropped.
///
/// # Errors
///
/// Returns `CryptoError::InvalidNonceLength` / `CryptoError::InvalidTagLength`
/// on parameter violations, and `CryptoError::TagMismatch` when the input is
/// shorter than the tag or fails authentication.
pub fn decrypt(
    key: &AesKey,
    ciphertext_and_tag: &[u8],
    nonce: &[u8],
    adata: &[u8],
    tag_length: usize,
) -> Result<Vec<u8>, CryptoError> {
    let Some(ciphertext_length) = ciphertext_and_tag.len().checked_sub(tag_length) else {
        return Err(CryptoError::TagMismatch);
    };
    let length_length = check_params(ciphertext_length, nonce, tag_length)?;
    let nonce = effective_nonce(nonce, length_length);

    let mut plaintext = ciphertext_and_tag[..ciphertext_length].to_vec();
    let mut tag = [0u8; BLOCK_LEN];
    tag[..tag_length].copy_from_slice(&ciphertext_and_tag[ciphertext_length..]);

    // CTR is its own inverse: this decrypts the data and recovers the
    // unencrypted CBC-MAC from the transmitted tag.
    apply_ctr(key, &mut plaintext, &mut tag, nonce, length_length);

    let expected = compute_tag(key, &plaintext, nonce, adata, tag_length, length_length)?;
    if !constant_time_eq(&expected[..tag_length], &tag[..tag_length]) {
        plaintext.zeroize();
        return Err(CryptoError::TagMismatch);
    }

    Ok(plaintext)
}

/// Encode an associated-data length in the SJCL variable-width format.
///
/// - `1 ..= 0xfefe` → 2-byte big-endian value
/// - `0xfeff ..= 0xffff_ffff` → `0xfffe` marker + 4-byte big-endian value
/// - beyond `u32` → `0xffff` marker + 8-byte big-endian value
///
/// # Errors
///
/// Returns `CryptoError::InvalidAssociatedDataLength` for a zero length
/// (unsigned input makes negative lengths unrepresentable).
pub fn encode_adata_length(length: usize) -> Result<Vec<u8>, CryptoError> {
    if length == 0 {
        return Err(CryptoError::InvalidAssociatedDataLength);
    }
    if length < 0xfeff {
        let short =
            u16::try_from(length).map_err(|_| CryptoError::InvalidAssociatedDataLength)?;
        return Ok(short.to_be_bytes().to_vec());
    }
    match u32::try_from(length) {
        Ok(medium) => {
            let mut out = vec![0xff, 0xfe];
            out.extend_from_slice(&medium.to_be_bytes());
            Ok(out)
        }
        Err(_) => {
            let long =
                u64::try_from(length).map_err(|_| CryptoError::InvalidAssociatedDataLength)?;
            let mut out = vec![0xff, 0xff];
            out.extend_from_slice(&long.to_be_bytes());
            Ok(out)
        }
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Number of bytes needed to encode a message length: 2, 3, or 4.
const fn compute_length_length(message_length: usize) -> usize {
    if message_length < 0x1_0000 {
        2
    } else if message_length < 0x100_0000 {
        3
    } else {
        4
    }
}

/// Validate nonce and tag length, and settle the length-of-length `L`.
///
/// `L` grows beyond what the message needs when the nonce is shorter than
/// 13 bytes, because nonce and length field share the 15 bytes after the
/// flag byte.
fn check_params(
    message_length: usize,
    nonce: &[u8],
    tag_length: usize,
) -> Result<usize, CryptoError> {
    if nonce.len() < MIN_NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength(nonce.len()));
    }
    if !VALID_TAG_LENGTHS.contains(&tag_length) {
        return Err(CryptoError::InvalidTagLength(tag_length));
    }
    let length_length = compute_length_length(message_length);
    Ok(length_length.max(15usize.saturating_sub(nonce.len())))
}

/// The nonce bytes actually used: the first `15 - L` of the caller's nonce.
fn effective_nonce(nonce: &[u8], length_length: usize) -> &[u8] {
    let used = 15usize.saturating_sub(length_length);
    &nonce[..used.min(nonce.len())]
}

/// XOR `data` into the front of `block` (short `data` means implicit
/// zero-padding).
fn xor_into(block: &mut [u8; BLOCK_LEN], data: &[u8]) {
    for (b, d) in block.iter_mut().zip(data.iter()) {
        *b ^= d;
    }
}

/// CBC-MAC over the CCM-formatted header, associated data, and message.
///
/// Callers pass the already-truncated nonce (`15 - L` bytes).
// Arithmetic is bounded: tag_length ∈ {4..16}, length_length ∈ {2..8},
// nonce.len() == 15 - length_length.
#[allow(clippy::arithmetic_side_effects)]
fn compute_tag(
    key: &AesKey,
    message: &[u8],
    nonce: &[u8],
    adata: &[u8],
    tag_length: usize,
    length_length: usize,
) -> Result<[u8; BLOCK_LEN], CryptoError> {
    // Block B0: flags ‖ nonce ‖ message length.
    let mut flags = u8::try_from(((tag_length - 2) / 2) << 3)
        .map_err(|_| CryptoError::InvalidTagLength(tag_length))?;
    if !adata.is_empty() {
        flags |= 0x40;
    }
    flags |= u8::try_from(length_length - 1)
        .map_err(|_| CryptoError::InvalidNonceLength(nonce.len()))?;

    let mut block = [0u8; BLOCK_LEN];
    block[0] = flags;
    block[1..=nonce.len()].copy_from_slice(nonce);
    let length_bytes = (message.len() as u64).to_be_bytes();
    block[BLOCK_LEN - length_length..].copy_from_slice(&length_bytes[8 - length_length..]);
    key.encrypt_block(&mut block);

    // Associated data: length prefix ‖ adata, zero-padded to block size.
    if !adata.is_empty() {
        let mut prefixed = encode_adata_length(adata.len())?;
        prefixed.extend_from_slice(adata);
        for chunk in prefixed.chunks(BLOCK_LEN) {
            xor_into(&mut block, chunk);
            key.encrypt_block(&mut block);
        }
    }

    // Message blocks, zero-padded.
    for chunk in message.chunks(BLOCK_LEN) {
        xor_into(&mut block, chunk);
        key.encrypt_block(&mut block);
    }

    Ok(block)
}

/// CTR keystream: counter block 0 encrypts the tag, blocks 1.. the data.
// Arithmetic is bounded: length_length ∈ {2..8}, block count fits in the
// counter width by construction of length_length.
#[allow(clippy::arithmetic_side_effects)]
fn apply_ctr(
    key: &AesKey,
    data: &mut [u8],
    tag: &mut [u8; BLOCK_LEN],
    nonce: &[u8],
    length_length: usize,
) {
    let mut counter_block = [0u8; BLOCK_LEN];
    counter_block[0] = u8::try_from(length_length - 1).unwrap_or(0x07);
    counter_block[1..=nonce.len()].copy_from_slice(nonce);

    // Counter 0 masks the tag.
    let mut keystream = counter_block;
    key.encrypt_block(&mut keystream);
    xor_into(tag, &keystream);

    // Counters 1.. mask the data.
    for (index, chunk) in data.chunks_mut(BLOCK_LEN).enumerate() {
        let counter_bytes = (index as u64 + 1).to_be_bytes();
        counter_block[BLOCK_LEN - length_length..]
            .copy_from_slice(&counter_bytes[8 - length_length..]);
        keystream = counter_block;
        key.encrypt_block(&mut keystream);
        for (byte, ks) in chunk.iter_mut().zip(keystream.iter()) {
            *byte ^= ks;
        }
    }
}

/// Constant-time byte comparison for authentication tags.
///
/// Uses bitwise OR accumulation to avoid short-circuit timing leaks. The
/// length comparison is not secret — both sides are the caller's
/// `tag_length`.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
