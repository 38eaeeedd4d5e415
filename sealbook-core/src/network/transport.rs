// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! The logical wire contract with the address-book service. How requests are
//! framed on the wire (HTTP, protocol buffers, anything else) is the
//! implementation's concern; the core only sees these calls.

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Outcome of an authenticated request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply<T> {
    Ok(T),
    /// The session token was rejected.
    Unauthorized,
    /// Any other non-success status.
    Error { status: u16, message: String },
}

impl<T> ServerReply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServerReply<U> {
        match self {
            ServerReply::Ok(value) => ServerReply::Ok(f(value)),
            ServerReply::Unauthorized => ServerReply::Unauthorized,
            ServerReply::Error { status, message } => ServerReply::Error { status, message },
        }
    }
}

/// Response to the first authentication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Salt for deriving the SRP password. Fixed length.
    pub pwd_salt: Vec<u8>,
    /// SRP salt. Variable length.
    pub srp_salt: Vec<u8>,
    /// Server public ephemeral `B`.
    pub server_public: Vec<u8>,
}

/// Response to the second authentication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfirmation {
    pub session_token: String,
    /// Server proof `M2`.
    pub server_proof: Vec<u8>,
}

/// Key salt and password-check blob mirrored on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub salt: Vec<u8>,
    pub password_check: Vec<u8>,
}

/// Transport trait for the address-book service.
///
/// # Synchronous Interface
///
/// Methods block until the server answered or the transport failed. Platform
/// implementations may use an async runtime internally. Timeouts belong to
/// the implementation.
///
/// Authentication steps return `Ok(None)` when the server sent an empty
/// response, which callers treat as a failed login rather than an error.
pub trait Transport: Send {
    /// Sends the username; receives the SRP challenge.
    fn auth_step1(&mut self, username: &str) -> TransportResult<Option<AuthChallenge>>;

    /// Sends `A` and `M1`; receives the session token and `M2`.
    fn auth_step2(
        &mut self,
        client_public: &[u8],
        client_proof: &[u8],
    ) -> TransportResult<Option<AuthConfirmation>>;

    /// Sends one encoded sync request; receives the encoded response.
    fn sync_round(&mut self, session_token: &str, request: &[u8])
        -> TransportResult<ServerReply<Vec<u8>>>;

    /// Fetches the encoded account restrictions. `None` means none are known yet.
    fn fetch_restrictions(&mut self, session_token: &str)
        -> TransportResult<ServerReply<Option<Vec<u8>>>>;

    /// Fetches the key salt and check blob, if the account has a key.
    fn fetch_key_material(&mut self, session_token: &str)
        -> TransportResult<ServerReply<Option<KeyMaterial>>>;

    /// Mirrors the key salt and check blob to the server.
    fn publish_key_material(
        &mut self,
        session_token: &str,
        material: &KeyMaterial,
    ) -> TransportResult<ServerReply<()>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn auth_step1(&mut self, username: &str) -> TransportResult<Option<AuthChallenge>> {
        (**self).auth_step1(username)
    }

    fn auth_step2(
        &mut self,
        client_public: &[u8],
        client_proof: &[u8],
    ) -> TransportResult<Option<AuthConfirmation>> {
        (**self).auth_step2(client_public, client_proof)
    }

    fn sync_round(&mut self, session_token: &str, request: &[u8])
        -> TransportResult<ServerReply<Vec<u8>>> {
        (**self).sync_round(session_token, request)
    }

    fn fetch_restrictions(&mut self, session_token: &str)
        -> TransportResult<ServerReply<Option<Vec<u8>>>> {
        (**self).fetch_restrictions(session_token)
    }

    fn fetch_key_material(&mut self, session_token: &str)
        -> TransportResult<ServerReply<Option<KeyMaterial>>> {
        (**self).fetch_key_material(session_token)
    }

    fn publish_key_material(
        &mut self,
        session_token: &str,
        material: &KeyMaterial,
    ) -> TransportResult<ServerReply<()>> {
        (**self).publish_key_material(session_token, material)
    }
}
