// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for login and sync rounds.

use thiserror::Error;

use crate::auth::AuthError;
use crate::keys::KeyError;
use crate::network::NetworkError;
use crate::storage::StorageError;
use crate::sync::{EnvelopeError, ReconcileError};

/// What the user should be asked to do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Transient or server-side; retry the round later.
    TryLater,
    /// The session cannot be renewed; ask for credentials again.
    Reauthenticate,
    /// The password does not open the account's key.
    ReenterPassword,
    /// Nothing to show.
    None,
}

/// Unified error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// The server answered with a non-success status other than unauthorized.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Still unauthorized after one re-authentication, or credentials rejected.
    #[error("authentication failed")]
    Authentication,

    /// The password does not match the account's key.
    #[error("invalid key")]
    InvalidKey,

    #[error("password too weak: {feedback}")]
    WeakPassword { feedback: String },

    /// Cooperative cancellation was observed.
    #[error("operation canceled")]
    Canceled,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The server sent an envelope that does not decode.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// No encryption key is set up; log in first.
    #[error("no encryption key for this account")]
    KeyUnavailable,

    /// Another operation holding the same guard is in progress.
    #[error("operation already running")]
    AlreadyRunning,

    #[error("crypto error: {0}")]
    Crypto(String),
}

impl SyncError {
    pub fn user_action(&self) -> UserAction {
        match self {
            SyncError::Network(_)
            | SyncError::Server { .. }
            | SyncError::Storage(_)
            | SyncError::Envelope(_)
            | SyncError::Crypto(_)
            | SyncError::AlreadyRunning => UserAction::TryLater,
            SyncError::Authentication => UserAction::Reauthenticate,
            SyncError::InvalidKey | SyncError::WeakPassword { .. } | SyncError::KeyUnavailable => {
                UserAction::ReenterPassword
            }
            SyncError::Canceled => UserAction::None,
        }
    }

    /// True for cooperative cancellation, which is not a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, SyncError::Canceled)
    }
}

impl From<KeyError> for SyncError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidKey => SyncError::InvalidKey,
            KeyError::WeakPassword { feedback } => SyncError::WeakPassword { feedback },
            KeyError::Storage(e) => SyncError::Storage(e),
            KeyError::Derivation(msg) | KeyError::Encryption(msg) => SyncError::Crypto(msg),
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Network(e) => SyncError::Network(e),
            other => SyncError::Crypto(other.to_string()),
        }
    }
}

impl From<ReconcileError> for SyncError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Storage(e) => SyncError::Storage(e),
            ReconcileError::Crypto(e) => SyncError::Crypto(e.to_string()),
            ReconcileError::Canceled => SyncError::Canceled,
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
