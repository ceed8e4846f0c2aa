//! Wire protocol: endpoints, request bodies and typed response decoding.
//!
//! Every POST body is built with `serde_json::json!` and every response is
//! decoded into a typed struct; nothing downstream touches raw JSON. All
//! endpoints except the authentication poll share a success envelope
//! (`responseResult/isSuccess`), which [`post`] checks before handing the
//! body over.

use crate::error::VaultError;
use crate::http::HttpClient;
use crate::two_factor::{OobDevice, Step, TwoFactorSettings};
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use serde::Deserialize;
use serde_json::{json, Value};
use sesame_crypto_core::otp::generate_random_challenge;
use sesame_crypto_core::token::OtpProfile;

// ---------------------------------------------------------------------------
// Endpoints and client constants
// ---------------------------------------------------------------------------

const REGISTER_URL: &str = "https://truekeyapi.intelsecurity.com/sp/pabe/v2/so";
const AUTH_STEP1_URL: &str = "https://truekeyapi.intelsecurity.com/session/auth";
const AUTH_STEP2_URL: &str = "https://truekeyapi.intelsecurity.com/mp/auth";
const AUTH_CHECK_URL: &str = "https://truekeyapi.intelsecurity.com/sp/profile/v1/gls";
const NOTIFICATION_URL: &str = "https://truekeyapi.intelsecurity.com/sp/oob/v1/son";
const VAULT_URL: &str = "https://pm-api.truekey.com/data";

/// OAuth client id registered for this application family.
const CLIENT_ID: &str = "42a01655e65147c3b03721df36b45195";

/// Device platform (7 = macOS) and type (5 = Mac) expected by the server.
const DEVICE_PLATFORM_ID: u32 = 7;
const DEVICE_TYPE: u32 = 5;

// ---------------------------------------------------------------------------
// Client-side identity
// ---------------------------------------------------------------------------

/// Token and id the server assigns to a newly registered device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Base64 device token carrying the OTP configuration.
    pub token: String,
    /// Server-assigned device id.
    pub id: String,
}

/// Everything the authenticated endpoints need to identify this client.
pub struct ClientIdentity {
    pub username: String,
    pub device_name: String,
    pub device: DeviceInfo,
    pub otp_profile: OtpProfile,
}

// ---------------------------------------------------------------------------
// Encrypted vault as fetched from the server
// ---------------------------------------------------------------------------

/// A vault entry with its encrypted fields still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAccount {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub encrypted_password: Vec<u8>,
    pub url: String,
    pub encrypted_note: Vec<u8>,
}

/// The fetched vault: key-derivation salt, wrapped master key and entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedVault {
    pub master_key_salt: Vec<u8>,
    pub encrypted_master_key: Vec<u8>,
    pub accounts: Vec<EncryptedAccount>,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ResponseResult {
    #[serde(rename = "isSuccess")]
    is_success: bool,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "errorDescription", default)]
    error_description: Option<String>,
}

impl ResponseResult {
    fn failure_reason(&self) -> String {
        match (&self.error_description, &self.error_code) {
            (Some(description), _) if !description.is_empty() => description.clone(),
            (_, Some(code)) if !code.is_empty() => format!("error code {code}"),
            _ => "server reported failure".into(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "responseResult")]
    response_result: Option<ResponseResult>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register a new device and receive its token and id.
///
/// This is the first call of every sign-in; the token it returns carries
/// the OCRA configuration used by the later steps.
///
/// # Errors
///
/// Transport, envelope and decoding failures, as every operation here.
pub fn register_new_device(
    device_name: &str,
    http: &dyn HttpClient,
) -> Result<DeviceInfo, VaultError> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "clientToken")]
        client_token: String,
        #[serde(rename = "tkDeviceId")]
        device_id: String,
    }

    let body = json!({
        "clientUDID": "sesame",
        "deviceName": device_name,
        "devicePlatformID": DEVICE_PLATFORM_ID,
        "deviceType": DEVICE_TYPE,
        "oSName": "Unknown",
        "oathTokenType": 1,
    });
    let response: Response = decode(post(http, REGISTER_URL, &body)?)?;
    Ok(DeviceInfo {
        token: response.client_token,
        id: response.device_id,
    })
}

/// Start an authentication session. Returns the OAuth transaction id the
/// rest of the flow is keyed on.
pub fn auth_step1(identity: &ClientIdentity, http: &dyn HttpClient) -> Result<String, VaultError> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "oAuthTransId")]
        transaction_id: String,
    }

    let body = common_request(identity, "session_id_token", "");
    let response: Response = decode(post(http, AUTH_STEP1_URL, &body)?)?;
    Ok(response.transaction_id)
}

/// Submit the hashed password and a signed OCRA challenge. The response
/// says whether we are done or which second factor comes next.
pub fn auth_step2(
    identity: &ClientIdentity,
    password: &str,
    transaction_id: &str,
    http: &dyn HttpClient,
) -> Result<TwoFactorSettings, VaultError> {
    let password_hash = sesame_crypto_core::kdf::hash_password(&identity.username, password)?;
    let challenge = generate_random_challenge(&identity.otp_profile)?;

    let body = json!({
        "userData": {
            "email": identity.username,
            "oAuthTransId": transaction_id,
            "pwd": password_hash,
        },
        "deviceData": {
            "deviceId": identity.device.id,
            "deviceType": "mac",
            "devicePlatformType": "macos",
            "otpData": {
                "qn": BASE64.encode(&challenge.challenge),
                "otpType": "time",
                "otp": BASE64.encode(&challenge.signature),
            },
        },
    });
    let response = post(http, AUTH_STEP2_URL, &body)?;
    parse_auth_step2_response(&response)
}

/// Poll whether the second factor has been approved.
///
/// # Errors
///
/// - `VaultError::AuthPending` — the server accepted the poll but the
///   factor is not approved yet; ask again later
/// - `VaultError::OperationFailed` — the server rejected the transaction
pub fn auth_check(
    identity: &ClientIdentity,
    transaction_id: &str,
    http: &dyn HttpClient,
) -> Result<String, VaultError> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "nextStep", default)]
        next_step: Option<i64>,
        #[serde(rename = "idToken", default)]
        id_token: Option<String>,
    }

    let body = common_request(identity, "code", transaction_id);
    let value = post_no_check(http, AUTH_CHECK_URL, &body)?;

    let envelope: Envelope = decode(value.clone())?;
    match envelope.response_result {
        Some(result) if result.is_success => {}
        Some(result) => return Err(VaultError::OperationFailed(result.failure_reason())),
        None => {
            return Err(VaultError::InvalidResponse(
                "missing responseResult".into(),
            ))
        }
    }

    let response: Response = decode(value)?;
    if response.next_step == Some(i64::from(Step::Done as u8)) {
        response
            .id_token
            .ok_or_else(|| VaultError::InvalidResponse("missing idToken".into()))
    } else {
        Err(VaultError::AuthPending)
    }
}

/// Ask the server to send a verification email.
pub fn auth_send_email(
    identity: &ClientIdentity,
    email: &str,
    transaction_id: &str,
    http: &dyn HttpClient,
) -> Result<(), VaultError> {
    send_notification(identity, 1, email, transaction_id, http)
}

/// Ask the server to push a confirmation to a trusted device.
pub fn auth_send_push(
    identity: &ClientIdentity,
    device_id: &str,
    transaction_id: &str,
    http: &dyn HttpClient,
) -> Result<(), VaultError> {
    send_notification(identity, 2, device_id, transaction_id, http)
}

/// Fetch the encrypted vault with the OAuth token from a completed
/// authentication.
pub fn get_vault(
    oauth_token: &str,
    http: &dyn HttpClient,
) -> Result<EncryptedVault, VaultError> {
    #[derive(Deserialize)]
    struct Customer {
        salt: String,
        k_kek: String,
    }

    #[derive(Deserialize)]
    struct Asset {
        #[serde(default)]
        id: u64,
        #[serde(default)]
        name: String,
        #[serde(default)]
        login: String,
        #[serde(default)]
        password_k: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        memo_k: String,
    }

    #[derive(Deserialize)]
    struct Response {
        customer: Customer,
        #[serde(default)]
        assets: Vec<Asset>,
    }

    let authorization = format!("Bearer {oauth_token}");
    let headers = [
        ("Accept", "application/vnd.tk-pm-api.v1+json"),
        ("Authorization", authorization.as_str()),
        ("X-TK-Client-API", "TK-API-1.1"),
        ("X-TK-Client-Version", "2.6.3820"),
        ("X-TK-Client-Language", "en-US"),
        ("X-TK-Client-Context", "crosssell-widget"),
    ];
    let text = http
        .get(VAULT_URL, &headers)
        .map_err(|e| VaultError::Transport(e.to_string()))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| VaultError::InvalidResponse(format!("vault body is not JSON: {e}")))?;
    let response: Response = decode(value)?;

    let master_key_salt = HEXLOWER_PERMISSIVE
        .decode(response.customer.salt.as_bytes())
        .map_err(|e| VaultError::InvalidResponse(format!("customer salt is not hex: {e}")))?;
    let encrypted_master_key = decode_base64(&response.customer.k_kek, "customer key")?;

    let accounts = response
        .assets
        .into_iter()
        .map(|asset| {
            Ok(EncryptedAccount {
                id: asset.id,
                name: asset.name,
                username: asset.login,
                encrypted_password: decode_base64(&asset.password_k, "account password")?,
                url: asset.url,
                encrypted_note: decode_base64(&asset.memo_k, "account note")?,
            })
        })
        .collect::<Result<Vec<_>, VaultError>>()?;

    Ok(EncryptedVault {
        master_key_salt,
        encrypted_master_key,
        accounts,
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// The request skeleton shared by the session endpoints.
fn common_request(identity: &ClientIdentity, response_type: &str, transaction_id: &str) -> Value {
    json!({
        "data": {
            "contextData": {
                "deviceInfo": {
                    "deviceName": identity.device_name,
                    "devicePlatformID": DEVICE_PLATFORM_ID,
                    "deviceType": DEVICE_TYPE,
                },
            },
            "rpData": {
                "clientId": CLIENT_ID,
                "response_type": response_type,
                "culture": "en-US",
            },
            "userData": {
                "email": identity.username,
                "oTransId": transaction_id,
            },
            "ysvcData": {
                "deviceId": identity.device.id,
            },
        },
    })
}

fn send_notification(
    identity: &ClientIdentity,
    notification_type: u32,
    recipient_id: &str,
    transaction_id: &str,
    http: &dyn HttpClient,
) -> Result<(), VaultError> {
    let mut body = common_request(identity, "code", transaction_id);
    body["data"]["notificationData"] = json!({
        "NotificationType": notification_type,
        "RecipientId": recipient_id,
    });
    post(http, NOTIFICATION_URL, &body).map(|_| ())
}

fn parse_auth_step2_response(response: &Value) -> Result<TwoFactorSettings, VaultError> {
    #[derive(Deserialize)]
    struct RawDevice {
        #[serde(rename = "deviceName")]
        name: String,
        #[serde(rename = "deviceId")]
        id: String,
    }

    #[derive(Deserialize, Default)]
    struct NextStepData {
        #[serde(rename = "verificationEmail", default)]
        verification_email: String,
        #[serde(rename = "oobDevices", default)]
        oob_devices: Vec<RawDevice>,
    }

    #[derive(Deserialize)]
    struct RiskAnalysisInfo {
        #[serde(rename = "nextStep")]
        next_step: i64,
        #[serde(rename = "nextStepData", default)]
        next_step_data: Option<NextStepData>,
    }

    #[derive(Deserialize)]
    struct Response {
        #[serde(rename = "riskAnalysisInfo")]
        risk_analysis_info: RiskAnalysisInfo,
        #[serde(rename = "oAuthTransId", default)]
        transaction_id: Option<String>,
        #[serde(rename = "idToken", default)]
        id_token: Option<String>,
    }

    let response: Response = decode(response.clone())?;
    let next_step = response.risk_analysis_info.next_step;
    let step = Step::from_code(next_step)
        .ok_or(VaultError::UnsupportedProtocolStep(next_step))?;

    if step == Step::Done {
        return Ok(TwoFactorSettings {
            step,
            transaction_id: String::new(),
            email: String::new(),
            devices: Vec::new(),
            oauth_token: response
                .id_token
                .ok_or_else(|| VaultError::InvalidResponse("missing idToken".into()))?,
        });
    }

    let transaction_id = response
        .transaction_id
        .ok_or_else(|| VaultError::InvalidResponse("missing oAuthTransId".into()))?;
    let data = response
        .risk_analysis_info
        .next_step_data
        .ok_or_else(|| VaultError::InvalidResponse("missing nextStepData".into()))?;
    let devices = data
        .oob_devices
        .into_iter()
        .map(|device| OobDevice {
            name: device.name,
            id: device.id,
        })
        .collect();

    Ok(TwoFactorSettings {
        step,
        transaction_id,
        email: data.verification_email,
        devices: if step == Step::WaitForEmail { Vec::new() } else { devices },
        oauth_token: String::new(),
    })
}

/// POST and verify the `responseResult/isSuccess` envelope.
fn post(http: &dyn HttpClient, url: &str, body: &Value) -> Result<Value, VaultError> {
    let value = post_no_check(http, url, body)?;
    let envelope: Envelope = decode(value.clone())?;
    match envelope.response_result {
        Some(result) if result.is_success => Ok(value),
        Some(result) => Err(VaultError::OperationFailed(result.failure_reason())),
        None => Err(VaultError::OperationFailed(
            "response has no responseResult".into(),
        )),
    }
}

/// POST without looking at the envelope. The authentication poll encodes
/// its state in the envelope, so it inspects it itself.
fn post_no_check(http: &dyn HttpClient, url: &str, body: &Value) -> Result<Value, VaultError> {
    let text = http
        .post(url, body)
        .map_err(|e| VaultError::Transport(e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| VaultError::InvalidResponse(format!("body is not JSON: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, VaultError> {
    serde_json::from_value(value).map_err(|e| VaultError::InvalidResponse(e.to_string()))
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, VaultError> {
    BASE64
        .decode(text.as_bytes())
        .map_err(|e| VaultError::InvalidResponse(format!("{what} is not base64: {e}")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const TRANSACTION_ID: &str = "6cdfcd43-065c-43a1-aa7a-017de98eefd0";
    const OOB_TRANSACTION_ID: &str = "ae830c59-634b-437c-95b6-58158e85ffae";
    const HMAC_SEED_BASE64: &str = "6JF8i2kJM6S+rRl9Xb4aC8/zdoX1KtMF865ptl9xCv0=";

    /// Canned-response transport that records every request.
    struct MockHttp {
        responses: RefCell<VecDeque<String>>,
        posts: RefCell<Vec<(String, Value)>>,
        gets: RefCell<Vec<String>>,
    }

    impl MockHttp {
        fn with_responses(responses: &[&str]) -> Self {
            Self {
                responses: RefCell::new(responses.iter().map(|s| (*s).to_owned()).collect()),
                posts: RefCell::new(Vec::new()),
                gets: RefCell::new(Vec::new()),
            }
        }

        fn next_response(&self) -> Result<String, crate::http::TransportError> {
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| crate::http::TransportError("no canned response left".into()))
        }
    }

    impl HttpClient for MockHttp {
        fn get(
            &self,
            url: &str,
            _headers: &[(&str, &str)],
        ) -> Result<String, crate::http::TransportError> {
            self.gets.borrow_mut().push(url.to_owned());
            self.next_response()
        }

        fn post(&self, url: &str, body: &Value) -> Result<String, crate::http::TransportError> {
            self.posts.borrow_mut().push((url.to_owned(), body.clone()));
            self.next_response()
        }
    }

    fn test_identity() -> ClientIdentity {
        ClientIdentity {
            username: "username@example.com".into(),
            device_name: "sesame".into(),
            device: DeviceInfo {
                token: "token".into(),
                id: "deadbeef".into(),
            },
            otp_profile: OtpProfile {
                version: 3,
                otp_algorithm: 1,
                otp_length: 0,
                hash_algorithm: 2,
                time_step: 30,
                start_time: 0,
                server_time: 1_489_412_893,
                wys_option: 0,
                suite: "OCRA-1:HOTP-SHA256-0:QA08".into(),
                hmac_seed: BASE64
                    .decode(HMAC_SEED_BASE64.as_bytes())
                    .expect("valid base64"),
                iptmk: vec![0u8; 32],
            },
        }
    }

    #[test]
    fn register_new_device_returns_token_and_id() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": true},
            "clientToken": "AQCmAwEAAh4=",
            "tkDeviceId": "d871347bd5a3e7509ab248467a1a01f5"
        }"#]);
        let device = register_new_device("sesame", &http).expect("should succeed");
        assert_eq!(device.token, "AQCmAwEAAh4=");
        assert_eq!(device.id, "d871347bd5a3e7509ab248467a1a01f5");

        let posts = http.posts.borrow();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, REGISTER_URL);
        assert_eq!(posts[0].1["deviceName"], "sesame");
        assert_eq!(posts[0].1["devicePlatformID"], 7);
        assert_eq!(posts[0].1["deviceType"], 5);
    }

    #[test]
    fn register_new_device_fails_on_envelope() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": false, "errorDescription": "device limit reached"}
        }"#]);
        let err = register_new_device("sesame", &http).expect_err("should fail");
        assert!(matches!(err, VaultError::OperationFailed(reason) if reason == "device limit reached"));
    }

    #[test]
    fn auth_step1_returns_transaction_id() {
        let http = MockHttp::with_responses(&[&format!(
            r#"{{"responseResult": {{"isSuccess": true}}, "oAuthTransId": "{TRANSACTION_ID}"}}"#
        )]);
        let transaction_id = auth_step1(&test_identity(), &http).expect("should succeed");
        assert_eq!(transaction_id, TRANSACTION_ID);

        let posts = http.posts.borrow();
        assert_eq!(posts[0].0, AUTH_STEP1_URL);
        let data = &posts[0].1["data"];
        assert_eq!(data["rpData"]["clientId"], CLIENT_ID);
        assert_eq!(data["rpData"]["response_type"], "session_id_token");
        assert_eq!(data["userData"]["email"], "username@example.com");
        assert_eq!(data["userData"]["oTransId"], "");
        assert_eq!(data["ysvcData"]["deviceId"], "deadbeef");
    }

    #[test]
    fn auth_step2_done_carries_token() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": true},
            "riskAnalysisInfo": {"nextStep": 10, "nextStepData": {}},
            "idToken": "the-oauth-token"
        }"#]);
        let settings = auth_step2(&test_identity(), "password", TRANSACTION_ID, &http)
            .expect("should succeed");
        assert_eq!(settings.step, Step::Done);
        assert_eq!(settings.oauth_token, "the-oauth-token");
        assert!(settings.devices.is_empty());

        // The posted body carries the hashed password and a signed challenge.
        let posts = http.posts.borrow();
        assert_eq!(posts[0].0, AUTH_STEP2_URL);
        let pwd = posts[0].1["userData"]["pwd"].as_str().expect("pwd");
        assert!(pwd.starts_with("tk-v1-"));
        let otp_data = &posts[0].1["deviceData"]["otpData"];
        assert_eq!(otp_data["otpType"], "time");
        let qn = otp_data["qn"].as_str().expect("qn");
        assert_eq!(BASE64.decode(qn.as_bytes()).expect("base64").len(), 128);
        let otp = otp_data["otp"].as_str().expect("otp");
        assert_eq!(BASE64.decode(otp.as_bytes()).expect("base64").len(), 32);
    }

    #[test]
    fn auth_step2_wait_for_oob() {
        let http = MockHttp::with_responses(&[&format!(
            r#"{{
                "responseResult": {{"isSuccess": true}},
                "oAuthTransId": "{OOB_TRANSACTION_ID}",
                "riskAnalysisInfo": {{
                    "nextStep": 12,
                    "nextStepData": {{
                        "verificationEmail": "username@example.com",
                        "oobDevices": [
                            {{"deviceName": "LGE Nexus 5", "deviceId": "MTU5NjAwMjI3MQP04dNsmSNQ2L"}}
                        ]
                    }}
                }}
            }}"#
        )]);
        let settings = auth_step2(&test_identity(), "password", TRANSACTION_ID, &http)
            .expect("should succeed");
        assert_eq!(settings.step, Step::WaitForOob);
        assert_eq!(settings.transaction_id, OOB_TRANSACTION_ID);
        assert_eq!(settings.email, "username@example.com");
        assert_eq!(settings.devices.len(), 1);
        assert_eq!(settings.devices[0].name, "LGE Nexus 5");
        assert_eq!(settings.devices[0].id, "MTU5NjAwMjI3MQP04dNsmSNQ2L");
        assert!(settings.oauth_token.is_empty());
    }

    #[test]
    fn auth_step2_wait_for_email_has_no_devices() {
        let http = MockHttp::with_responses(&[&format!(
            r#"{{
                "responseResult": {{"isSuccess": true}},
                "oAuthTransId": "{OOB_TRANSACTION_ID}",
                "riskAnalysisInfo": {{
                    "nextStep": 14,
                    "nextStepData": {{"verificationEmail": "username@example.com"}}
                }}
            }}"#
        )]);
        let settings = auth_step2(&test_identity(), "password", TRANSACTION_ID, &http)
            .expect("should succeed");
        assert_eq!(settings.step, Step::WaitForEmail);
        assert!(settings.devices.is_empty());
    }

    #[test]
    fn auth_step2_rejects_unknown_step() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": true},
            "riskAnalysisInfo": {"nextStep": 11, "nextStepData": {}}
        }"#]);
        let err = auth_step2(&test_identity(), "password", TRANSACTION_ID, &http)
            .expect_err("should fail");
        assert!(matches!(err, VaultError::UnsupportedProtocolStep(11)));
    }

    #[test]
    fn auth_check_done_returns_token() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": true},
            "nextStep": 10,
            "idToken": "the-oauth-token"
        }"#]);
        let token =
            auth_check(&test_identity(), TRANSACTION_ID, &http).expect("should succeed");
        assert_eq!(token, "the-oauth-token");

        let posts = http.posts.borrow();
        assert_eq!(posts[0].0, AUTH_CHECK_URL);
        assert_eq!(posts[0].1["data"]["rpData"]["response_type"], "code");
        assert_eq!(posts[0].1["data"]["userData"]["oTransId"], TRANSACTION_ID);
    }

    #[test]
    fn auth_check_pending_when_not_done() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": true},
            "nextStep": 12
        }"#]);
        let err = auth_check(&test_identity(), TRANSACTION_ID, &http).expect_err("pending");
        assert!(matches!(err, VaultError::AuthPending));
    }

    #[test]
    fn auth_check_failure_is_operation_failed() {
        let http = MockHttp::with_responses(&[r#"{
            "responseResult": {"isSuccess": false, "errorCode": "E1024"}
        }"#]);
        let err = auth_check(&test_identity(), TRANSACTION_ID, &http).expect_err("failed");
        assert!(matches!(err, VaultError::OperationFailed(reason) if reason == "error code E1024"));
    }

    #[test]
    fn send_email_posts_notification_data() {
        let http =
            MockHttp::with_responses(&[r#"{"responseResult": {"isSuccess": true}}"#]);
        auth_send_email(
            &test_identity(),
            "username@example.com",
            OOB_TRANSACTION_ID,
            &http,
        )
        .expect("should succeed");

        let posts = http.posts.borrow();
        assert_eq!(posts[0].0, NOTIFICATION_URL);
        let notification = &posts[0].1["data"]["notificationData"];
        assert_eq!(notification["NotificationType"], 1);
        assert_eq!(notification["RecipientId"], "username@example.com");
    }

    #[test]
    fn send_push_posts_notification_data() {
        let http =
            MockHttp::with_responses(&[r#"{"responseResult": {"isSuccess": true}}"#]);
        auth_send_push(&test_identity(), "device-id-1", OOB_TRANSACTION_ID, &http)
            .expect("should succeed");

        let posts = http.posts.borrow();
        let notification = &posts[0].1["data"]["notificationData"];
        assert_eq!(notification["NotificationType"], 2);
        assert_eq!(notification["RecipientId"], "device-id-1");
    }

    #[test]
    fn get_vault_decodes_salt_key_and_assets() {
        let http = MockHttp::with_responses(&[r#"{
            "customer": {
                "salt": "845864cf3692189757f5f276aa8a6a4f9aba9a2ba07dfc925dfa0ab6a57a8dcd",
                "k_kek": "AAR2TIPw9u1RG7cX9LXT2zLBMO3Pj8b9"
            },
            "assets": [
                {
                    "id": 50934080,
                    "name": "Google",
                    "login": "dude@gmail.com",
                    "password_k": "AATK/rq+yv66vsr+ur7K/rq+79WfAqOIarEUFQiVFvmQ",
                    "url": "https://accounts.google.com/ServiceLogin",
                    "memo_k": ""
                },
                {
                    "id": 60789079,
                    "login": "mark"
                }
            ]
        }"#]);
        let vault = get_vault("the-oauth-token", &http).expect("should succeed");

        assert_eq!(vault.master_key_salt.len(), 32);
        assert_eq!(vault.master_key_salt[0], 0x84);
        assert!(!vault.encrypted_master_key.is_empty());
        assert_eq!(vault.accounts.len(), 2);

        let first = &vault.accounts[0];
        assert_eq!(first.id, 50_934_080);
        assert_eq!(first.name, "Google");
        assert_eq!(first.username, "dude@gmail.com");
        assert_eq!(first.url, "https://accounts.google.com/ServiceLogin");
        assert!(first.encrypted_note.is_empty());

        // Missing fields default to empty.
        let second = &vault.accounts[1];
        assert_eq!(second.name, "");
        assert_eq!(second.username, "mark");
        assert!(second.encrypted_password.is_empty());

        assert_eq!(http.gets.borrow()[0], VAULT_URL);
    }

    #[test]
    fn get_vault_rejects_bad_salt() {
        let http = MockHttp::with_responses(&[r#"{
            "customer": {"salt": "not hex!", "k_kek": ""},
            "assets": []
        }"#]);
        let err = get_vault("token", &http).expect_err("should fail");
        assert!(matches!(err, VaultError::InvalidResponse(_)));
    }

    #[test]
    fn transport_errors_surface() {
        let http = MockHttp::with_responses(&[]);
        let err = auth_step1(&test_identity(), &http).expect_err("should fail");
        assert!(matches!(err, VaultError::Transport(_)));
    }
}
