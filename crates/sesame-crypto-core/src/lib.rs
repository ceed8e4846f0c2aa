//! `sesame-crypto-core` — Pure cryptographic primitives for SESAME.
//!
//! This crate is the audit target: zero network, zero async dependencies.
//! Everything needed to parse a device token, sign an OCRA challenge and
//! decrypt vault blobs lives here.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;

pub mod ccm;
pub mod token;

pub mod otp;

pub mod blob;

pub use blob::{decrypt_blob, decrypt_master_key};
pub use ccm::{encode_adata_length, AesKey, BLOCK_LEN, MIN_NONCE_LEN, VALID_TAG_LENGTHS};
pub use error::CryptoError;
pub use kdf::{
    hash_password, hmac_sha256, pbkdf2_sha256, sha256, DERIVED_KEY_LEN, PASSWORD_HASH_PREFIX,
    PBKDF2_ITERATIONS,
};
pub use memory::{LockedRegion, SecretBuffer};
pub use otp::{generate_challenge, generate_random_challenge, OtpChallenge, CHALLENGE_LEN};
pub use token::{parse_client_token, validate_otp_profile, OtpProfile};
