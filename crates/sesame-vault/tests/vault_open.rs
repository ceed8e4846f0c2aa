#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end vault opening against a canned transport.
//!
//! The device token is a real 204-byte token; the vault fixtures are
//! sealed with the same PBKDF2 and AES-CCM parameters the server uses.

use serde_json::Value;
use sesame_vault::{
    Answer, HttpClient, TransportError, TwoFactorPrompt, Vault, VaultError,
};
use std::cell::RefCell;
use std::collections::VecDeque;

const USERNAME: &str = "username@example.com";
const PASSWORD: &str = "Password123!";

const CLIENT_TOKEN: &str = "AQCmAwEAAh4AAAAAWMajHQAAGU9DUkEtMTpIT1RQLVNIQTI1Ni0wOlFBMDgAAAAA\
                            AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\
                            AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAIOiRfItpCTOkvq0Z\
                            fV2+GgvP83aF9SrTBfOuabZfcQr9AAAAAAgAIBwWTZpUTIn493Us/JwczrK6O0+L\
                            H8FRidFaZkJ2AlTu";

const SALT_HEX: &str = "845864cf3692189757f5f276aa8a6a4f9aba9a2ba07dfc925dfa0ab6a57a8dcd";
const ENCRYPTED_MASTER_KEY: &str =
    "AAQAESIzRFVmd4iZqrvM3e7/8hKgPITFuaO1M5x7nAwU49fuMsunPD2e6O2Po/dzSlrsyjwwQw4Y2Q==";
const GOOGLE_PASSWORD_BLOB: &str =
    "AAQBAgMEBQYHCAkKCwwNDg8Qt43t7RH9lsWkWWICqUMlds0l3bNcXzxVim+5dmsuYhh8A3IJ";
const GOOGLE_NOTE_BLOB: &str = "AATw4NDAsKCQgHBgUEAwIBAAZkJob6Sq8EJjfxbT7/zQssmuYOfvYA==";
const FACEBOOK_PASSWORD_BLOB: &str = "AATK/rq+yv66vsr+ur7K/rq+79WfAqOIarEUFQiVFvmQ";

struct MockHttp {
    responses: RefCell<VecDeque<String>>,
    posts: RefCell<Vec<(String, Value)>>,
}

impl MockHttp {
    fn with_responses(responses: &[String]) -> Self {
        Self {
            responses: RefCell::new(responses.iter().cloned().collect()),
            posts: RefCell::new(Vec::new()),
        }
    }
}

impl HttpClient for MockHttp {
    fn get(&self, _url: &str, headers: &[(&str, &str)]) -> Result<String, TransportError> {
        assert!(headers
            .iter()
            .any(|(name, value)| *name == "Authorization" && value.starts_with("Bearer ")));
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| TransportError("no canned response left".into()))
    }

    fn post(&self, url: &str, body: &Value) -> Result<String, TransportError> {
        self.posts.borrow_mut().push((url.to_owned(), body.clone()));
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| TransportError("no canned response left".into()))
    }
}

struct PushThenCheck {
    asked: usize,
}

impl TwoFactorPrompt for PushThenCheck {
    fn ask_to_wait_for_email(&mut self, _email: &str, _valid_answers: &[Answer]) -> Answer {
        panic!("email wait is not part of this scenario");
    }

    fn ask_to_wait_for_oob(
        &mut self,
        device_name: &str,
        email: &str,
        _valid_answers: &[Answer],
    ) -> Answer {
        assert_eq!(device_name, "LGE Nexus 5");
        assert_eq!(email, USERNAME);
        self.asked += 1;
        Answer::Check
    }

    fn ask_to_choose_oob(
        &mut self,
        _device_names: &[&str],
        _email: &str,
        _valid_answers: &[Answer],
    ) -> Answer {
        panic!("device choice is not part of this scenario");
    }
}

fn register_response() -> String {
    format!(
        r#"{{
            "responseResult": {{"isSuccess": true}},
            "clientToken": "{CLIENT_TOKEN}",
            "tkDeviceId": "d871347bd5a3e7509ab248467a1a01f5"
        }}"#
    )
}

fn step1_response() -> String {
    r#"{
        "responseResult": {"isSuccess": true},
        "oAuthTransId": "6cdfcd43-065c-43a1-aa7a-017de98eefd0"
    }"#
    .to_owned()
}

fn step2_oob_response() -> String {
    r#"{
        "responseResult": {"isSuccess": true},
        "oAuthTransId": "ae830c59-634b-437c-95b6-58158e85ffae",
        "riskAnalysisInfo": {
            "nextStep": 12,
            "nextStepData": {
                "verificationEmail": "username@example.com",
                "oobDevices": [
                    {"deviceName": "LGE Nexus 5", "deviceId": "MTU5NjAwMjI3MQP04dNsmSNQ2L"}
                ]
            }
        }
    }"#
    .to_owned()
}

fn check_done_response() -> String {
    r#"{
        "responseResult": {"isSuccess": true},
        "nextStep": 10,
        "idToken": "the-oauth-token"
    }"#
    .to_owned()
}

fn vault_response() -> String {
    format!(
        r#"{{
            "customer": {{
                "salt": "{SALT_HEX}",
                "k_kek": "{ENCRYPTED_MASTER_KEY}"
            }},
            "assets": [
                {{
                    "id": 50934080,
                    "name": "Google",
                    "login": "dude@gmail.com",
                    "password_k": "{GOOGLE_PASSWORD_BLOB}",
                    "url": "https://accounts.google.com/ServiceLogin",
                    "memo_k": "{GOOGLE_NOTE_BLOB}"
                }},
                {{
                    "id": 60789079,
                    "name": "facebook",
                    "login": "mark",
                    "password_k": "{FACEBOOK_PASSWORD_BLOB}",
                    "url": "http://facebook.com"
                }}
            ]
        }}"#
    )
}

#[test]
fn opens_vault_through_oob_confirmation() {
    let http = MockHttp::with_responses(&[
        register_response(),
        step1_response(),
        step2_oob_response(),
        check_done_response(),
        vault_response(),
    ]);
    let mut prompt = PushThenCheck { asked: 0 };

    let vault = Vault::open(USERNAME, PASSWORD, &mut prompt, &http).expect("open should succeed");

    assert_eq!(prompt.asked, 1);
    assert_eq!(vault.accounts.len(), 2);

    let google = &vault.accounts[0];
    assert_eq!(google.id, 50_934_080);
    assert_eq!(google.name, "Google");
    assert_eq!(google.username, "dude@gmail.com");
    assert_eq!(google.password, "correct horse battery staple");
    assert_eq!(google.url, "https://accounts.google.com/ServiceLogin");
    assert_eq!(google.note, "pin: 1234 éè");

    let facebook = &vault.accounts[1];
    assert_eq!(facebook.password, "hunter2");
    assert_eq!(facebook.note, "");

    // Four posts: register, step 1, step 2, check. The vault came via GET.
    let posts = http.posts.borrow();
    assert_eq!(posts.len(), 4);
    let pwd = posts[2].1["userData"]["pwd"].as_str().expect("pwd");
    assert_eq!(
        pwd,
        "tk-v1-e67335c7f2f96b09ab5a4fea0d49fcc4e3090b6bc4853f886c1cdc873f29c41d"
    );
}

#[test]
fn wrong_password_fails_master_key_authentication() {
    let http = MockHttp::with_responses(&[
        register_response(),
        step1_response(),
        step2_oob_response(),
        check_done_response(),
        vault_response(),
    ]);
    let mut prompt = PushThenCheck { asked: 0 };

    let err = Vault::open(USERNAME, "wrong password", &mut prompt, &http)
        .expect_err("open should fail");
    assert!(matches!(
        err,
        VaultError::Crypto(sesame_crypto_core::CryptoError::TagMismatch)
    ));
}

#[test]
fn garbled_device_token_is_rejected_before_any_auth() {
    let http = MockHttp::with_responses(&[
        r#"{
            "responseResult": {"isSuccess": true},
            "clientToken": "AQCm",
            "tkDeviceId": "d871347bd5a3e7509ab248467a1a01f5"
        }"#
        .to_owned(),
    ]);
    let mut prompt = PushThenCheck { asked: 0 };

    let err = Vault::open(USERNAME, PASSWORD, &mut prompt, &http).expect_err("open should fail");
    assert!(matches!(
        err,
        VaultError::Crypto(sesame_crypto_core::CryptoError::MalformedToken(_))
    ));
    // Nothing past registration was attempted.
    assert_eq!(http.posts.borrow().len(), 1);
}
