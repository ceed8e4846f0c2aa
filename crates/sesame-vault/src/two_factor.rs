//! Two-factor verification state machine.
//!
//! After the password step the server may demand a second factor: an
//! email round-trip or an out-of-band (OOB) confirmation on a trusted
//! device. The flow is a small state machine driven by an injected
//! [`TwoFactorPrompt`]; each state offers the prompt the exact set of
//! answers that are valid right now, and an answer outside that set is a
//! hard error rather than a retry.
//!
//! States and transitions:
//!
//! ```text
//! WaitForOob(i)  --Check-->  Done | pending (stay) | Failure
//!                --Resend->  push re-sent, stay
//!                --Email-->  email sent, WaitForEmail
//! ChooseOob      --Device-> push sent, WaitForOob(i)
//!                --Email--> email sent, WaitForEmail
//! WaitForEmail   --Check-->  Done | pending (stay) | Failure
//!                --Resend->  email re-sent, stay
//! ```

use crate::error::VaultError;
use crate::http::HttpClient;
use crate::protocol::{self, ClientIdentity};

// ---------------------------------------------------------------------------
// Protocol-facing types
// ---------------------------------------------------------------------------

/// Two-factor step codes as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Done = 10,
    WaitForOob = 12,
    ChooseOob = 13,
    WaitForEmail = 14,
}

impl Step {
    /// Map a server step code to a [`Step`], `None` when unsupported.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Self::Done),
            12 => Some(Self::WaitForOob),
            13 => Some(Self::ChooseOob),
            14 => Some(Self::WaitForEmail),
            _ => None,
        }
    }
}

/// A trusted device capable of receiving push confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobDevice {
    pub name: String,
    pub id: String,
}

/// What the password step told us to do next.
#[derive(Debug, Clone)]
pub struct TwoFactorSettings {
    pub step: Step,
    /// Transaction id the remaining calls are keyed on.
    pub transaction_id: String,
    /// Address verification emails go to.
    pub email: String,
    /// Devices available for push confirmation.
    pub devices: Vec<OobDevice>,
    /// Filled in only when `step` is [`Step::Done`].
    pub oauth_token: String,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// An answer the user can give to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Check whether the second factor has been approved.
    Check,
    /// Re-send the pending notification.
    Resend,
    /// Switch to email verification.
    Email,
    /// Send a push to the device at this index.
    Device(usize),
}

/// User interaction surface for the two-factor flow.
///
/// Each method receives the set of answers that are valid in the current
/// state; returning anything else aborts the flow with
/// [`VaultError::InvalidPromptAnswer`].
pub trait TwoFactorPrompt {
    /// A verification email was sent to `email`. Valid answers:
    /// [`Answer::Check`], [`Answer::Resend`].
    fn ask_to_wait_for_email(&mut self, email: &str, valid_answers: &[Answer]) -> Answer;

    /// A push was sent to `device_name`. Valid answers: [`Answer::Check`],
    /// [`Answer::Resend`], [`Answer::Email`].
    fn ask_to_wait_for_oob(
        &mut self,
        device_name: &str,
        email: &str,
        valid_answers: &[Answer],
    ) -> Answer;

    /// Several devices can receive a push. Valid answers:
    /// [`Answer::Device`] for each index in `device_names`, plus
    /// [`Answer::Email`].
    fn ask_to_choose_oob(
        &mut self,
        device_names: &[&str],
        email: &str,
        valid_answers: &[Answer],
    ) -> Answer;
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum State {
    Done(String),
    Failure(String),
    WaitForEmail,
    WaitForOob(usize),
    ChooseOob,
}

/// Run the verification flow to completion and return the OAuth token.
///
/// # Errors
///
/// - `VaultError::TwoFactorFailed` when the server rejects the transaction
/// - `VaultError::InvalidPromptAnswer` when the prompt answers out of set
/// - transport and decoding errors from the underlying calls
pub fn run(
    identity: &ClientIdentity,
    settings: &TwoFactorSettings,
    prompt: &mut dyn TwoFactorPrompt,
    http: &dyn HttpClient,
) -> Result<String, VaultError> {
    let mut state = initial_state(settings)?;
    loop {
        state = match state {
            State::Done(token) => return Ok(token),
            State::Failure(reason) => return Err(VaultError::TwoFactorFailed(reason)),
            State::WaitForEmail => advance_wait_for_email(identity, settings, prompt, http)?,
            State::WaitForOob(index) => {
                advance_wait_for_oob(index, identity, settings, prompt, http)?
            }
            State::ChooseOob => advance_choose_oob(identity, settings, prompt, http)?,
        };
    }
}

fn initial_state(settings: &TwoFactorSettings) -> Result<State, VaultError> {
    match settings.step {
        Step::Done => Ok(State::Done(settings.oauth_token.clone())),
        Step::WaitForEmail => Ok(State::WaitForEmail),
        // Waiting on one device of several really means choosing first.
        Step::WaitForOob => match settings.devices.len() {
            0 => Err(VaultError::InvalidResponse(
                "no out-of-band devices offered".into(),
            )),
            1 => Ok(State::WaitForOob(0)),
            _ => Ok(State::ChooseOob),
        },
        Step::ChooseOob => Ok(State::ChooseOob),
    }
}

fn advance_wait_for_email(
    identity: &ClientIdentity,
    settings: &TwoFactorSettings,
    prompt: &mut dyn TwoFactorPrompt,
    http: &dyn HttpClient,
) -> Result<State, VaultError> {
    let valid = [Answer::Check, Answer::Resend];
    match prompt.ask_to_wait_for_email(&settings.email, &valid) {
        Answer::Check => check(identity, settings, http, State::WaitForEmail),
        Answer::Resend => {
            protocol::auth_send_email(identity, &settings.email, &settings.transaction_id, http)?;
            Ok(State::WaitForEmail)
        }
        other => Err(invalid_answer(other)),
    }
}

fn advance_wait_for_oob(
    index: usize,
    identity: &ClientIdentity,
    settings: &TwoFactorSettings,
    prompt: &mut dyn TwoFactorPrompt,
    http: &dyn HttpClient,
) -> Result<State, VaultError> {
    let device = settings.devices.get(index).ok_or_else(|| {
        VaultError::InvalidResponse(format!("out-of-band device {index} does not exist"))
    })?;

    let valid = [Answer::Check, Answer::Resend, Answer::Email];
    match prompt.ask_to_wait_for_oob(&device.name, &settings.email, &valid) {
        Answer::Check => check(identity, settings, http, State::WaitForOob(index)),
        Answer::Resend => {
            protocol::auth_send_push(identity, &device.id, &settings.transaction_id, http)?;
            Ok(State::WaitForOob(index))
        }
        Answer::Email => {
            protocol::auth_send_email(identity, &settings.email, &settings.transaction_id, http)?;
            Ok(State::WaitForEmail)
        }
        other => Err(invalid_answer(other)),
    }
}

fn advance_choose_oob(
    identity: &ClientIdentity,
    settings: &TwoFactorSettings,
    prompt: &mut dyn TwoFactorPrompt,
    http: &dyn HttpClient,
) -> Result<State, VaultError> {
    let names: Vec<&str> = settings.devices.iter().map(|d| d.name.as_str()).collect();
    let mut valid: Vec<Answer> = (0..settings.devices.len()).map(Answer::Device).collect();
    valid.push(Answer::Email);

    match prompt.ask_to_choose_oob(&names, &settings.email, &valid) {
        Answer::Email => {
            protocol::auth_send_email(identity, &settings.email, &settings.transaction_id, http)?;
            Ok(State::WaitForEmail)
        }
        Answer::Device(index) => {
            let device = settings.devices.get(index).ok_or_else(|| {
                invalid_answer(Answer::Device(index))
            })?;
            protocol::auth_send_push(identity, &device.id, &settings.transaction_id, http)?;
            Ok(State::WaitForOob(index))
        }
        other => Err(invalid_answer(other)),
    }
}

/// Poll the server. Done and still-pending are normal outcomes; a server
/// rejection parks the machine in the failure state.
fn check(
    identity: &ClientIdentity,
    settings: &TwoFactorSettings,
    http: &dyn HttpClient,
    stay: State,
) -> Result<State, VaultError> {
    match protocol::auth_check(identity, &settings.transaction_id, http) {
        Ok(token) => Ok(State::Done(token)),
        Err(VaultError::AuthPending) => Ok(stay),
        Err(VaultError::OperationFailed(reason)) => Ok(State::Failure(reason)),
        Err(other) => Err(other),
    }
}

fn invalid_answer(answer: Answer) -> VaultError {
    VaultError::InvalidPromptAnswer(format!("{answer:?}"))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
