//! Vault opening: the end-to-end flow from credentials to decrypted
//! accounts.
//!
//! Opening a vault walks the whole protocol: register a device, parse its
//! token, authenticate in two steps, clear the second factor, fetch the
//! encrypted vault and decrypt it with the master password.

use crate::error::VaultError;
use crate::http::HttpClient;
use crate::protocol::{self, ClientIdentity, EncryptedAccount};
use crate::two_factor::{self, TwoFactorPrompt};
use data_encoding::BASE64;
use sesame_crypto_core::blob::{decrypt_blob, decrypt_master_key};
use sesame_crypto_core::token::{parse_client_token, validate_otp_profile};
use sesame_crypto_core::CryptoError;
use zeroize::Zeroize;

/// Device name registered with the service.
const DEVICE_NAME: &str = "sesame";

/// A decrypted vault entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub note: String,
}

/// A decrypted vault.
#[derive(Debug)]
pub struct Vault {
    pub accounts: Vec<Account>,
}

impl Vault {
    /// Open the vault for `username` with the master `password`.
    ///
    /// The second factor, if the server demands one, is resolved through
    /// `prompt`; `http` carries all network traffic.
    ///
    /// # Errors
    ///
    /// Everything in [`VaultError`]: transport failures, malformed or
    /// unsupported tokens, a rejected or unfinished second factor, and
    /// `CryptoError::TagMismatch` (via `VaultError::Crypto`) for a wrong
    /// password.
    pub fn open(
        username: &str,
        password: &str,
        prompt: &mut dyn TwoFactorPrompt,
        http: &dyn HttpClient,
    ) -> Result<Self, VaultError> {
        // A fresh device registration per sign-in. The returned token
        // carries the OCRA configuration.
        let device = protocol::register_new_device(DEVICE_NAME, http)?;

        let mut token_bytes = BASE64.decode(device.token.as_bytes()).map_err(|e| {
            VaultError::Crypto(CryptoError::MalformedToken(format!(
                "token is not base64: {e}"
            )))
        })?;
        let otp_profile = parse_client_token(&token_bytes)?;
        token_bytes.zeroize();
        validate_otp_profile(&otp_profile)?;

        let identity = ClientIdentity {
            username: username.to_owned(),
            device_name: DEVICE_NAME.to_owned(),
            device,
            otp_profile,
        };

        let transaction_id = protocol::auth_step1(&identity, http)?;
        let settings = protocol::auth_step2(&identity, password, &transaction_id, http)?;
        let oauth_token = two_factor::run(&identity, &settings, prompt, http)?;

        let encrypted = protocol::get_vault(&oauth_token, http)?;
        let master_key = decrypt_master_key(
            password,
            &encrypted.master_key_salt,
            &encrypted.encrypted_master_key,
        )?;

        let accounts = encrypted
            .accounts
            .into_iter()
            .map(|account| decrypt_account(master_key.expose(), account))
            .collect::<Result<Vec<_>, VaultError>>()?;

        Ok(Self { accounts })
    }
}

fn decrypt_account(key: &[u8], account: EncryptedAccount) -> Result<Account, VaultError> {
    let password = decrypt_field(key, &account.encrypted_password, "password")?;
    let note = decrypt_field(key, &account.encrypted_note, "note")?;
    Ok(Account {
        id: account.id,
        name: account.name,
        username: account.username,
        password,
        url: account.url,
        note,
    })
}

fn decrypt_field(key: &[u8], blob: &[u8], field: &'static str) -> Result<String, VaultError> {
    let plaintext = decrypt_blob(key, blob)?;
    String::from_utf8(plaintext).map_err(|_| VaultError::NotUtf8 { field })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
