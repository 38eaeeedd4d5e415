// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-process stand-in for the address-book service, for tests.
//!
//! Authentication is real: the mock holds an SRP verifier and runs the server
//! half of the exchange, so a wrong password fails exactly as it would
//! against the service. Sync replies are scripted, either queued one by one
//! or produced by a handler closure.

use std::collections::{HashSet, VecDeque};

use crate::auth::srp::SrpServer;

use super::error::NetworkError;
use super::transport::{
    AuthChallenge, AuthConfirmation, KeyMaterial, ServerReply, Transport, TransportResult,
};

type SyncHandler = Box<dyn FnMut(&[u8]) -> ServerReply<Vec<u8>> + Send>;

/// An account registered with the mock server.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub username: String,
    pub pwd_salt: Vec<u8>,
    pub srp_salt: Vec<u8>,
    /// Padded SRP verifier.
    pub verifier: Vec<u8>,
}

/// Mock transport for testing.
///
/// # Example
///
/// ```ignore
/// let mut transport = MockTransport::with_account(account);
/// transport.queue_sync_reply(ServerReply::Unauthorized);
/// transport.set_sync_handler(|request| ServerReply::Ok(respond(request)));
/// ```
pub struct MockTransport {
    account: Option<MockAccount>,
    pending: Option<SrpServer>,
    valid_tokens: HashSet<String>,
    issued_tokens: usize,
    auth_attempts: usize,
    tamper_server_proof: bool,
    sync_replies: VecDeque<ServerReply<Vec<u8>>>,
    sync_handler: Option<SyncHandler>,
    sync_requests: Vec<(String, Vec<u8>)>,
    restrictions: Option<Vec<u8>>,
    restrictions_fetches: usize,
    key_material: Option<KeyMaterial>,
    publish_reply: Option<ServerReply<()>>,
    published: Vec<KeyMaterial>,
    /// Error to inject on next operation.
    inject_error: Option<NetworkError>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("account", &self.account)
            .field("issued_tokens", &self.issued_tokens)
            .field("auth_attempts", &self.auth_attempts)
            .field("sync_requests", &self.sync_requests.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a mock with no registered account.
    pub fn new() -> Self {
        MockTransport {
            account: None,
            pending: None,
            valid_tokens: HashSet::new(),
            issued_tokens: 0,
            auth_attempts: 0,
            tamper_server_proof: false,
            sync_replies: VecDeque::new(),
            sync_handler: None,
            sync_requests: Vec::new(),
            restrictions: None,
            restrictions_fetches: 0,
            key_material: None,
            publish_reply: None,
            published: Vec::new(),
            inject_error: None,
        }
    }

    /// Creates a mock that knows `account`.
    pub fn with_account(account: MockAccount) -> Self {
        MockTransport {
            account: Some(account),
            ..Self::new()
        }
    }

    /// Queues a reply returned by the next `sync_round` before the handler runs.
    pub fn queue_sync_reply(&mut self, reply: ServerReply<Vec<u8>>) {
        self.sync_replies.push_back(reply);
    }

    /// Sets the closure that answers `sync_round` once the queue is empty.
    pub fn set_sync_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&[u8]) -> ServerReply<Vec<u8>> + Send + 'static,
    {
        self.sync_handler = Some(Box::new(handler));
    }

    /// Every sync request received, with the token it carried.
    pub fn sync_requests(&self) -> &[(String, Vec<u8>)] {
        &self.sync_requests
    }

    pub fn set_restrictions(&mut self, encoded: Option<Vec<u8>>) {
        self.restrictions = encoded;
    }

    pub fn restrictions_fetches(&self) -> usize {
        self.restrictions_fetches
    }

    pub fn set_key_material(&mut self, material: Option<KeyMaterial>) {
        self.key_material = material;
    }

    pub fn key_material(&self) -> Option<&KeyMaterial> {
        self.key_material.as_ref()
    }

    /// Overrides the reply to the next `publish_key_material`.
    pub fn set_publish_reply(&mut self, reply: ServerReply<()>) {
        self.publish_reply = Some(reply);
    }

    /// Every key-material publish the server accepted.
    pub fn published(&self) -> &[KeyMaterial] {
        &self.published
    }

    /// Makes the server send a wrong `M2`.
    pub fn set_tamper_server_proof(&mut self, tamper: bool) {
        self.tamper_server_proof = tamper;
    }

    /// Number of `auth_step1` calls.
    pub fn auth_attempts(&self) -> usize {
        self.auth_attempts
    }

    /// Number of session tokens handed out.
    pub fn issued_tokens(&self) -> usize {
        self.issued_tokens
    }

    /// Expires every issued session token.
    pub fn expire_sessions(&mut self) {
        self.valid_tokens.clear();
    }

    /// Injects an error to be returned on the next operation.
    pub fn inject_error(&mut self, error: NetworkError) {
        self.inject_error = Some(error);
    }

    fn check_error(&mut self) -> TransportResult<()> {
        if let Some(err) = self.inject_error.take() {
            return Err(err);
        }
        Ok(())
    }

    fn authorized(&self, session_token: &str) -> bool {
        self.valid_tokens.contains(session_token)
    }
}

impl Transport for MockTransport {
    fn auth_step1(&mut self, username: &str) -> TransportResult<Option<AuthChallenge>> {
        self.check_error()?;
        self.auth_attempts += 1;
        self.pending = None;

        let account = match &self.account {
            Some(account) if account.username == username => account,
            _ => return Ok(None),
        };
        let server = SrpServer::new(username, &account.srp_salt, &account.verifier)
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))?;
        let challenge = AuthChallenge {
            pwd_salt: account.pwd_salt.clone(),
            srp_salt: account.srp_salt.clone(),
            server_public: server.public_ephemeral(),
        };
        self.pending = Some(server);
        Ok(Some(challenge))
    }

    fn auth_step2(
        &mut self,
        client_public: &[u8],
        client_proof: &[u8],
    ) -> TransportResult<Option<AuthConfirmation>> {
        self.check_error()?;
        let server = match self.pending.take() {
            Some(server) => server,
            None => return Ok(None),
        };

        let mut server_proof = match server.verify_client(client_public, client_proof) {
            Ok(Some(m2)) => m2.to_vec(),
            Ok(None) | Err(_) => return Ok(None),
        };
        if self.tamper_server_proof {
            server_proof[0] ^= 0x01;
        }

        self.issued_tokens += 1;
        let session_token = format!("session-{}", self.issued_tokens);
        self.valid_tokens.insert(session_token.clone());
        Ok(Some(AuthConfirmation {
            session_token,
            server_proof,
        }))
    }

    fn sync_round(
        &mut self,
        session_token: &str,
        request: &[u8],
    ) -> TransportResult<ServerReply<Vec<u8>>> {
        self.check_error()?;
        self.sync_requests
            .push((session_token.to_string(), request.to_vec()));

        if let Some(reply) = self.sync_replies.pop_front() {
            return Ok(reply);
        }
        if !self.authorized(session_token) {
            return Ok(ServerReply::Unauthorized);
        }
        match self.sync_handler.as_mut() {
            Some(handler) => Ok(handler(request)),
            None => Ok(ServerReply::Error {
                status: 501,
                message: "no sync handler".into(),
            }),
        }
    }

    fn fetch_restrictions(
        &mut self,
        session_token: &str,
    ) -> TransportResult<ServerReply<Option<Vec<u8>>>> {
        self.check_error()?;
        self.restrictions_fetches += 1;
        if !self.authorized(session_token) {
            return Ok(ServerReply::Unauthorized);
        }
        Ok(ServerReply::Ok(self.restrictions.clone()))
    }

    fn fetch_key_material(
        &mut self,
        session_token: &str,
    ) -> TransportResult<ServerReply<Option<KeyMaterial>>> {
        self.check_error()?;
        if !self.authorized(session_token) {
            return Ok(ServerReply::Unauthorized);
        }
        Ok(ServerReply::Ok(self.key_material.clone()))
    }

    fn publish_key_material(
        &mut self,
        session_token: &str,
        material: &KeyMaterial,
    ) -> TransportResult<ServerReply<()>> {
        self.check_error()?;
        if let Some(reply) = self.publish_reply.take() {
            return Ok(reply);
        }
        if !self.authorized(session_token) {
            return Ok(ServerReply::Unauthorized);
        }
        self.key_material = Some(material.clone());
        self.published.push(material.clone());
        Ok(ServerReply::Ok(()))
    }
}
