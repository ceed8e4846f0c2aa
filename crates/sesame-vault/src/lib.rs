//! `sesame-vault` — Vault client logic for SESAME.
//!
//! Talks the cloud protocol end to end: device registration, two-step
//! authentication, second-factor resolution and vault decryption. The
//! HTTP transport and the user prompt are both injected traits, so this
//! crate stays runtime-agnostic and fully testable offline.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod http;

pub mod protocol;

pub mod two_factor;

pub mod vault;

pub use error::VaultError;
pub use http::{HttpClient, TransportError};
pub use protocol::{ClientIdentity, DeviceInfo, EncryptedAccount, EncryptedVault};
pub use two_factor::{Answer, OobDevice, Step, TwoFactorPrompt, TwoFactorSettings};
pub use vault::{Account, Vault};
