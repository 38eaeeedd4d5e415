// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Zero-Knowledge Authentication
//!
//! SRP-6a login against the service. The password never leaves the device;
//! the server only ever sees the public ephemeral and the proof.

mod credential;
mod session;
pub mod srp;

pub use credential::{
    load_session_token, store_session_token, Credential, DerivedPassword, SessionToken,
};
pub use session::{
    AuthFailure, AuthOutcome, AuthSession, AuthState, AuthenticatedSession, Secret,
};
pub use srp::{compute_verifier, SrpClient, SrpError, SrpServer, SrpVerifier};

use thiserror::Error;

use crate::network::NetworkError;

/// Authentication error types.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Password derivation failed: {0}")]
    Derivation(String),

    #[error("Authentication session already used (state {0:?})")]
    InvalidState(AuthState),
}
