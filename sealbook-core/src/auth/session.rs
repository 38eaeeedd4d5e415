// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Authentication Session
//!
//! One SRP login attempt against the service. A session moves
//! `Idle -> Step1Sent -> Step2Sent` and ends in `Authenticated` or `Failed`;
//! both end states are terminal, so every attempt uses a fresh session.
//!
//! A wrong password is a normal outcome, reported as
//! [`AuthOutcome::Rejected`]. Only transport failures are errors.

use tracing::{debug, warn};

use crate::crypto::KdfParams;
use crate::keys::SALT_LEN;
use crate::network::Transport;

use super::credential::{DerivedPassword, SessionToken};
use super::srp::SrpClient;
use super::AuthError;

/// Authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Step1Sent,
    Step2Sent,
    Authenticated,
    Failed,
}

/// What the user proves knowledge of.
#[derive(Debug, Clone, Copy)]
pub enum Secret<'a> {
    /// A typed password. The SRP value is derived with the server's salt.
    Password(&'a str),
    /// A previously derived SRP value, for silent re-authentication.
    Derived(&'a DerivedPassword),
}

/// Why a login attempt failed without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Step 1 came back empty, e.g. for an unknown user.
    EmptyChallenge,
    /// Step 1 came back with missing or wrongly sized fields.
    MalformedChallenge,
    /// The server public value failed the SRP safety checks.
    InvalidChallenge,
    /// The server rejected the client proof.
    CredentialsRejected,
    /// The server proof did not match; the server is not who it claims.
    ProofMismatch,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_token: SessionToken,
    pub derived_password: DerivedPassword,
    /// The salt `derived_password` was derived with.
    pub pwd_salt: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(AuthenticatedSession),
    Rejected(AuthFailure),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }
}

/// A single login attempt.
#[derive(Debug)]
pub struct AuthSession {
    username: String,
    state: AuthState,
    client: Option<SrpClient>,
}

impl AuthSession {
    pub fn new(username: &str) -> Self {
        AuthSession {
            username: username.to_string(),
            state: AuthState::Idle,
            client: None,
        }
    }

    /// Uses a fixed SRP client instead of a random one.
    pub fn with_client(username: &str, client: SrpClient) -> Self {
        AuthSession {
            client: Some(client),
            ..Self::new(username)
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Runs both steps of the exchange.
    pub fn authenticate<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        kdf: &KdfParams,
        secret: Secret<'_>,
    ) -> Result<AuthOutcome, AuthError> {
        if self.state != AuthState::Idle {
            return Err(AuthError::InvalidState(self.state));
        }

        self.state = AuthState::Step1Sent;
        let challenge = match transport.auth_step1(&self.username) {
            Ok(Some(challenge)) => challenge,
            Ok(None) => return Ok(self.reject(AuthFailure::EmptyChallenge)),
            Err(e) => {
                self.state = AuthState::Failed;
                return Err(e.into());
            }
        };
        if challenge.pwd_salt.len() != SALT_LEN
            || challenge.srp_salt.is_empty()
            || challenge.server_public.is_empty()
        {
            return Ok(self.reject(AuthFailure::MalformedChallenge));
        }

        let derived_password = match secret {
            Secret::Password(password) => {
                DerivedPassword::derive(password, &challenge.pwd_salt, kdf).map_err(|e| {
                    self.state = AuthState::Failed;
                    AuthError::Derivation(e.to_string())
                })?
            }
            Secret::Derived(derived) => derived.clone(),
        };

        let client = match self.client.take() {
            Some(client) => client,
            None => SrpClient::new().map_err(|e| {
                self.state = AuthState::Failed;
                AuthError::Derivation(e.to_string())
            })?,
        };
        let verifier = match client.process_challenge(
            &self.username,
            derived_password.as_bytes(),
            &challenge.srp_salt,
            &challenge.server_public,
        ) {
            Ok(verifier) => verifier,
            Err(e) => {
                warn!("Rejecting SRP challenge: {}", e);
                return Ok(self.reject(AuthFailure::InvalidChallenge));
            }
        };

        self.state = AuthState::Step2Sent;
        let confirmation = match transport.auth_step2(verifier.client_public(), verifier.proof())
        {
            Ok(Some(confirmation)) => confirmation,
            Ok(None) => return Ok(self.reject(AuthFailure::CredentialsRejected)),
            Err(e) => {
                self.state = AuthState::Failed;
                return Err(e.into());
            }
        };

        if !verifier.verify_server(&confirmation.server_proof) {
            warn!("Server proof mismatch for {}", self.username);
            return Ok(self.reject(AuthFailure::ProofMismatch));
        }

        self.state = AuthState::Authenticated;
        debug!("Authenticated {}", self.username);
        Ok(AuthOutcome::Authenticated(AuthenticatedSession {
            session_token: SessionToken::new(confirmation.session_token),
            derived_password,
            pwd_salt: challenge.pwd_salt,
        }))
    }

    fn reject(&mut self, failure: AuthFailure) -> AuthOutcome {
        debug!("Authentication of {} failed: {:?}", self.username, failure);
        self.state = AuthState::Failed;
        AuthOutcome::Rejected(failure)
    }
}
