// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Session Orchestrator
//!
//! Drives login and sync rounds for one account.
//!
//! A round loads the account key, refreshes restrictions when stale, collects
//! dirty records, sends them in chunks and reconciles each response before
//! the next chunk goes out. Every authenticated call goes through one retry
//! policy: on "unauthorized" the cached session token is dropped, the
//! session is re-established once with the stored secret and the call is
//! repeated once. A second "unauthorized" is [`SyncError::Authentication`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{
    load_session_token, store_session_token, AuthFailure, AuthOutcome, AuthSession, Credential,
    Secret, SessionToken,
};
use crate::keys::{parse_salt, KeyManager, PrivateKeyRecord};
use crate::network::{KeyMaterial, ServerReply, Transport, TransportResult};
use crate::storage::{keys, unix_seconds, CredentialStore, CredentialStoreExt, LocalStore};
use crate::sync::{
    chunk_records, BincodeCodec, CachedRestrictions, CancellationToken, EnvelopeCodec,
    QuotaRejection, Restrictions, SentRecord, SingleFlight, SyncAnchor, SyncReconciler,
    SyncRequest,
};

use super::config::SyncConfig;
use super::error::{SyncError, SyncResult};
use super::events::{EventDispatcher, SyncEvent};

/// Result of a completed sync round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Records sent, across all chunks.
    pub sent: usize,
    /// Server deltas received.
    pub received: usize,
    /// New records held back by quota. They stay dirty.
    pub quota_rejected: Vec<QuotaRejection>,
    /// Entries the server reported as skipped.
    pub skipped: u32,
    /// Requests made.
    pub chunks: usize,
}

/// Result of a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn {
        /// A new encryption key was created for the account.
        key_created: bool,
        /// Salt and check blob are on the server.
        salt_published: bool,
    },
    /// Wrong password or an untrusted server; nothing was stored.
    Rejected(AuthFailure),
}

/// Orchestrates login and sync rounds for one account.
pub struct SyncSessionOrchestrator<'a, T: Transport> {
    transport: T,
    account: String,
    store: &'a dyn LocalStore,
    credentials: &'a dyn CredentialStore,
    codec: Box<dyn EnvelopeCodec>,
    keys: KeyManager,
    config: SyncConfig,
    events: Arc<EventDispatcher>,
    round_guard: SingleFlight,
    key_guard: SingleFlight,
}

impl<'a, T: Transport> SyncSessionOrchestrator<'a, T> {
    pub fn new(
        transport: T,
        account: &str,
        store: &'a dyn LocalStore,
        credentials: &'a dyn CredentialStore,
        config: SyncConfig,
        events: Arc<EventDispatcher>,
    ) -> Self {
        SyncSessionOrchestrator {
            transport,
            account: account.to_string(),
            store,
            credentials,
            codec: Box::new(BincodeCodec),
            keys: KeyManager::new(config.kdf),
            config,
            events,
            round_guard: SingleFlight::new(),
            key_guard: SingleFlight::new(),
        }
    }

    /// Replaces the default envelope codec.
    pub fn with_codec(mut self, codec: Box<dyn EnvelopeCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Shares guards with other orchestrators.
    ///
    /// `round` serializes rounds for the account; `key` serializes key
    /// re-creation process-wide.
    pub fn with_guards(mut self, round: SingleFlight, key: SingleFlight) -> Self {
        self.round_guard = round;
        self.key_guard = key;
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // === Login ===

    /// Logs in with a typed password and sets up the encryption key.
    ///
    /// When the server already has key material for the account the key is
    /// re-derived and must validate against it; otherwise a new key is
    /// created (subject to the strength gate) and published.
    pub fn login(&mut self, password: &str) -> SyncResult<LoginOutcome> {
        let mut session = AuthSession::new(&self.account);
        let authenticated =
            match session.authenticate(&mut self.transport, &self.config.kdf, Secret::Password(password))? {
                AuthOutcome::Authenticated(authenticated) => authenticated,
                AuthOutcome::Rejected(failure) => {
                    info!("Login rejected: {:?}", failure);
                    return Ok(LoginOutcome::Rejected(failure));
                }
            };

        store_session_token(self.credentials, &self.account, Some(&authenticated.session_token))?;
        Credential {
            username: self.account.clone(),
            stored_secret: authenticated.derived_password.clone(),
            pwd_salt: authenticated.pwd_salt.clone(),
        }
        .save(self.credentials)?;

        let _guard = self.key_guard.try_acquire().ok_or(SyncError::AlreadyRunning)?;
        let cancel = CancellationToken::new();
        let material = self.authorized(&cancel, |t, token| t.fetch_key_material(token))?;

        let (mut record, key_created) = match material {
            Some(material) => {
                let salt = parse_salt(&material.salt)
                    .ok_or_else(|| SyncError::Crypto("server key salt has wrong length".into()))?;
                let record =
                    self.keys
                        .create_or_recreate_key(password, salt, Some(&material.password_check))?;
                (record, false)
            }
            None => match PrivateKeyRecord::load(self.credentials, &self.account)? {
                Some(existing) => {
                    self.keys
                        .validate_password_check(&existing.password_check, &existing.key)?;
                    (existing, false)
                }
                None => {
                    let salt = KeyManager::generate_salt()?;
                    (self.keys.create_or_recreate_key(password, salt, None)?, true)
                }
            },
        };
        record.save(self.credentials, &self.account)?;

        let salt_published = record.salt_saved || self.publish_key_material(&mut record, &cancel);
        info!("Logged in as {}", self.account);
        Ok(LoginOutcome::LoggedIn {
            key_created,
            salt_published,
        })
    }

    /// Mirrors salt and check blob to the server. Failure is logged, not raised.
    fn publish_key_material(
        &mut self,
        record: &mut PrivateKeyRecord,
        cancel: &CancellationToken,
    ) -> bool {
        let material = KeyMaterial {
            salt: record.salt.to_vec(),
            password_check: record.password_check.clone(),
        };
        let result = self
            .authorized(cancel, |t, token| t.publish_key_material(token, &material))
            .and_then(|()| {
                record
                    .mark_salt_saved(self.credentials, &self.account)
                    .map_err(SyncError::from)
            });

        match result {
            Ok(()) => {
                debug!("Published key material");
                self.events.dispatch(SyncEvent::KeyMaterialPublished);
                true
            }
            Err(e) => {
                warn!("Publishing key material failed: {}", e);
                self.events.dispatch(SyncEvent::KeyMaterialPublishFailed {
                    error: e.to_string(),
                });
                false
            }
        }
    }

    // === Sync Round ===

    /// Runs one sync round.
    ///
    /// Returns [`SyncError::AlreadyRunning`] if a round holding the same guard
    /// is in progress, and [`SyncError::Canceled`] when `cancel` fired; work
    /// flushed before that point is kept.
    pub fn sync(&mut self, cancel: &CancellationToken) -> SyncResult<SyncOutcome> {
        let _guard = self.round_guard.try_acquire().ok_or(SyncError::AlreadyRunning)?;
        self.events.dispatch(SyncEvent::RoundStarted {
            account: self.account.clone(),
        });

        let result = self.run_round(cancel);
        match &result {
            Ok(outcome) => {
                info!(
                    "Sync round done: {} sent, {} received, {} over quota",
                    outcome.sent,
                    outcome.received,
                    outcome.quota_rejected.len()
                );
                self.events.dispatch(SyncEvent::RoundCompleted {
                    sent: outcome.sent,
                    received: outcome.received,
                    quota_rejected: outcome.quota_rejected.len(),
                    skipped: outcome.skipped,
                });
            }
            Err(SyncError::Canceled) => {
                info!("Sync round canceled");
                self.events.dispatch(SyncEvent::RoundCanceled);
            }
            Err(e) => warn!("Sync round failed: {}", e),
        }
        result
    }

    fn run_round(&mut self, cancel: &CancellationToken) -> SyncResult<SyncOutcome> {
        check_canceled(cancel)?;
        let mut key_record = PrivateKeyRecord::load(self.credentials, &self.account)?
            .ok_or(SyncError::KeyUnavailable)?;
        if !key_record.salt_saved {
            self.publish_key_material(&mut key_record, cancel);
        }

        let restrictions = self.current_restrictions(cancel)?;
        let include_photos = self.config.sync_photos
            && restrictions
                .as_ref()
                .map_or(true, |r| r.photo_sync_supported);

        let store = self.store;
        let reconciler = SyncReconciler::new(
            store,
            &key_record.key,
            Arc::clone(&self.events),
            self.config.batch,
        );
        let collected = reconciler.collect_dirty(&self.account, restrictions.as_ref())?;

        let mut chunks = chunk_records(collected.to_send, self.config.batch);
        if chunks.is_empty() {
            // still pull server changes
            chunks.push(Vec::new());
        }

        let mut outcome = SyncOutcome {
            quota_rejected: collected.quota_rejected,
            ..Default::default()
        };

        for chunk in chunks {
            check_canceled(cancel)?;
            let records = chunk
                .iter()
                .map(|record| reconciler.to_outgoing(record, include_photos))
                .collect::<Result<Vec<_>, _>>()?;
            let sent: Vec<SentRecord> = chunk.iter().map(SentRecord::from).collect();

            let request = SyncRequest {
                client_id: self.credentials.get(&self.account, keys::CLIENT_ID)?,
                anchor: self
                    .credentials
                    .get_bytes(&self.account, keys::SYNC_ANCHOR)?
                    .map(SyncAnchor),
                app_version: self.config.app_version.clone(),
                records,
            };
            let body = self.codec.encode_request(&request)?;
            debug!("Sending chunk of {} records", sent.len());

            let reply = self.authorized(cancel, |t, token| t.sync_round(token, &body))?;
            let response = self.codec.decode_response(&reply)?;

            if let Some(client_id) = response.new_client_id.as_deref() {
                self.credentials
                    .set(&self.account, keys::CLIENT_ID, Some(client_id))?;
            }

            let updated = reconciler.apply_server_result(
                &self.account,
                &sent,
                &response.deltas,
                &response.new_ids,
                cancel,
            )?;
            reconciler.clear_dirty_flags(&self.account, &sent, &updated, cancel)?;
            reconciler.assign_new_ids(&self.account, &sent, &response.new_ids, cancel)?;

            if let Some(SyncAnchor(anchor)) = &response.new_anchor {
                self.credentials
                    .set_bytes(&self.account, keys::SYNC_ANCHOR, Some(anchor.as_slice()))?;
            }

            outcome.sent += sent.len();
            outcome.received += response.deltas.len();
            outcome.skipped += response.skipped_count;
            outcome.chunks += 1;
            self.events.dispatch(SyncEvent::ChunkCompleted {
                sent: sent.len(),
                received: response.deltas.len(),
            });
        }

        Ok(outcome)
    }

    /// Cached restrictions, refetched when missing or stale.
    ///
    /// A stale copy is kept when the server answers with none. `None` means
    /// no restrictions are known at all.
    fn current_restrictions(&mut self, cancel: &CancellationToken) -> SyncResult<Option<Restrictions>> {
        let now = unix_seconds();
        let cached = CachedRestrictions::load(self.credentials, &self.account)?;
        if let Some(cached) = &cached {
            if !cached.is_stale(now, self.config.restrictions_max_age_secs) {
                return Ok(Some(cached.restrictions.clone()));
            }
        }

        let encoded = match self.authorized(cancel, |t, token| t.fetch_restrictions(token))? {
            Some(encoded) => encoded,
            None => {
                if cached.is_some() {
                    debug!("Server sent no restrictions, keeping stale copy");
                } else {
                    debug!("No restrictions known yet");
                }
                return Ok(cached.map(|c| c.restrictions));
            }
        };
        let restrictions = self.codec.decode_restrictions(&encoded)?;
        CachedRestrictions {
            restrictions: restrictions.clone(),
            fetched_at: now,
        }
        .save(self.credentials, &self.account)?;
        Ok(Some(restrictions))
    }

    // === Session Handling ===

    /// Runs `call` with the cached session, renewing it once on "unauthorized".
    fn authorized<R>(
        &mut self,
        cancel: &CancellationToken,
        mut call: impl FnMut(&mut T, &str) -> TransportResult<ServerReply<R>>,
    ) -> SyncResult<R> {
        let token = match load_session_token(self.credentials, &self.account)? {
            Some(token) => token,
            None => self.reauthenticate(cancel)?,
        };

        check_canceled(cancel)?;
        match call(&mut self.transport, token.as_str())? {
            ServerReply::Ok(value) => return Ok(value),
            ServerReply::Unauthorized => {}
            ServerReply::Error { status, message } => {
                return Err(SyncError::Server { status, message })
            }
        }

        warn!("Session rejected, re-authenticating");
        store_session_token(self.credentials, &self.account, None)?;
        let token = self.reauthenticate(cancel)?;
        self.events.dispatch(SyncEvent::SessionRenewed);

        check_canceled(cancel)?;
        match call(&mut self.transport, token.as_str())? {
            ServerReply::Ok(value) => Ok(value),
            ServerReply::Unauthorized => Err(SyncError::Authentication),
            ServerReply::Error { status, message } => Err(SyncError::Server { status, message }),
        }
    }

    /// Establishes a new session from the stored secret and caches its token.
    fn reauthenticate(&mut self, cancel: &CancellationToken) -> SyncResult<SessionToken> {
        check_canceled(cancel)?;
        let credential =
            Credential::load(self.credentials, &self.account)?.ok_or(SyncError::Authentication)?;

        let mut session = AuthSession::new(&self.account);
        match session.authenticate(
            &mut self.transport,
            &self.config.kdf,
            Secret::Derived(&credential.stored_secret),
        )? {
            AuthOutcome::Authenticated(authenticated) => {
                store_session_token(
                    self.credentials,
                    &self.account,
                    Some(&authenticated.session_token),
                )?;
                Ok(authenticated.session_token)
            }
            AuthOutcome::Rejected(failure) => {
                warn!("Re-authentication rejected: {:?}", failure);
                Err(SyncError::Authentication)
            }
        }
    }
}

fn check_canceled(cancel: &CancellationToken) -> SyncResult<()> {
    if cancel.is_canceled() {
        Err(SyncError::Canceled)
    } else {
        Ok(())
    }
}
