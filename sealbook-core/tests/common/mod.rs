// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Mock service accounts, a scripted sync server and shared fixtures.

#![allow(dead_code)]

pub mod strategies;

use std::sync::{Arc, Mutex};

use sealbook_core::api::SyncConfig;
use sealbook_core::auth::{compute_verifier, DerivedPassword};
use sealbook_core::crypto::{encrypt, KdfParams, SymmetricKey};
use sealbook_core::network::{MockAccount, MockTransport, ServerReply};
use sealbook_core::sync::{
    BincodeCodec, DeltaChange, NewIdEntry, RecordKind, ServerDelta, SyncAnchor, SyncRequest,
    SyncResponse,
};

pub const USERNAME: &str = "alice@example.com";
pub const PASSWORD: &str = "correct-horse-battery-staple";

pub fn kdf() -> KdfParams {
    KdfParams::fast_insecure()
}

pub fn config() -> SyncConfig {
    SyncConfig::default()
        .with_kdf(kdf())
        .with_app_version("test-1.0")
}

/// Registers `username` with the mock service the way signup would.
pub fn mock_account(username: &str, password: &str) -> MockAccount {
    let pwd_salt = vec![0x5a; 16];
    let srp_salt = vec![0xc3; 16];
    let derived = DerivedPassword::derive(password, &pwd_salt, &kdf()).unwrap();
    MockAccount {
        username: username.to_string(),
        verifier: compute_verifier(username, derived.as_bytes(), &srp_salt),
        pwd_salt,
        srp_salt,
    }
}

pub fn mock_transport() -> MockTransport {
    MockTransport::with_account(mock_account(USERNAME, PASSWORD))
}

/// Server-side view of every sync request, shared with the test.
#[derive(Debug, Default)]
pub struct ServerState {
    pub requests: Vec<SyncRequest>,
    /// Deltas handed out with the next response.
    pub pending_deltas: Vec<ServerDelta>,
    /// Withhold server ids for new records.
    pub reject_new: bool,
    next_id: u32,
    anchor: u8,
}

impl ServerState {
    pub fn records_received(&self) -> usize {
        self.requests.iter().map(|r| r.records.len()).sum()
    }
}

/// Installs a sync handler that assigns `srv-N` ids to new records.
pub fn install_server(transport: &mut MockTransport) -> Arc<Mutex<ServerState>> {
    let state = Arc::new(Mutex::new(ServerState::default()));
    let shared = Arc::clone(&state);

    transport.set_sync_handler(move |bytes| {
        let codec = BincodeCodec;
        let request = codec.decode_request(bytes).unwrap();
        let mut server = shared.lock().unwrap();

        let reject_new = server.reject_new;
        let mut new_ids = Vec::new();
        for record in &request.records {
            if record.server_id.is_some() || record.deleted {
                continue;
            }
            server.next_id += 1;
            new_ids.push(NewIdEntry {
                local_id: record.local_id.clone(),
                server_id: (!reject_new).then(|| format!("srv-{}", server.next_id)),
            });
        }
        server.anchor += 1;

        let response = SyncResponse {
            new_client_id: Some("client-1".into()),
            new_anchor: Some(SyncAnchor(vec![server.anchor])),
            deltas: std::mem::take(&mut server.pending_deltas),
            new_ids,
            skipped_count: 0,
        };
        server.requests.push(request);
        ServerReply::Ok(codec.encode_response(&response).unwrap())
    });

    state
}

/// A server-side upsert sealed under `key`.
pub fn upsert_delta(key: &SymmetricKey, kind: RecordKind, server_id: &str, data: &[u8]) -> ServerDelta {
    ServerDelta {
        kind,
        server_id: server_id.to_string(),
        change: DeltaChange::Upsert {
            data: encrypt(key, data).unwrap(),
            photo: None,
        },
    }
}
