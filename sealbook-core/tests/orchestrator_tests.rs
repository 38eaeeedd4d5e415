// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for api::SyncSessionOrchestrator
//! Login, key setup and full sync rounds against the mock service.

mod common;

use std::sync::{Arc, Mutex};

use common::{config, install_server, mock_account, mock_transport, upsert_delta, PASSWORD, USERNAME};
use sealbook_core::api::{
    CallbackHandler, EventDispatcher, LoginOutcome, SyncConfig, SyncError, SyncEvent,
    SyncSessionOrchestrator, UserAction,
};
use sealbook_core::auth::AuthFailure;
use sealbook_core::keys::{KeyManager, PrivateKeyRecord};
use sealbook_core::network::{KeyMaterial, MockTransport, ServerReply};
use sealbook_core::storage::{keys, CredentialStore, CredentialStoreExt, Storage};
use sealbook_core::sync::{
    BatchLimits, BincodeCodec, CancellationToken, NewIdEntry, RecordKind, Restrictions,
    SingleFlight, SyncResponse,
};

type Events = Arc<Mutex<Vec<SyncEvent>>>;

fn recorder() -> (Arc<EventDispatcher>, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
        seen.lock().unwrap().push(event);
    })));
    (Arc::new(dispatcher), events)
}

fn orchestrator_with(
    transport: MockTransport,
    storage: &Storage,
    config: SyncConfig,
) -> (SyncSessionOrchestrator<'_, MockTransport>, Events) {
    let (dispatcher, events) = recorder();
    let session =
        SyncSessionOrchestrator::new(transport, USERNAME, storage, storage, config, dispatcher);
    (session, events)
}

fn orchestrator(
    transport: MockTransport,
    storage: &Storage,
) -> (SyncSessionOrchestrator<'_, MockTransport>, Events) {
    orchestrator_with(transport, storage, config())
}

fn logged_in(storage: &Storage) -> (SyncSessionOrchestrator<'_, MockTransport>, Events) {
    let (mut session, events) = orchestrator(mock_transport(), storage);
    session.login(PASSWORD).unwrap();
    (session, events)
}

fn encoded_restrictions(restrictions: &Restrictions) -> Vec<u8> {
    BincodeCodec.encode_restrictions(restrictions).unwrap()
}

fn restrictions(max_contacts: u32, photos: bool) -> Restrictions {
    Restrictions {
        max_contact_count: max_contacts,
        max_group_count: 50,
        photo_sync_supported: photos,
        valid_until: None,
    }
}

// ============================================================
// Login
// ============================================================

#[test]
fn test_first_login_creates_and_publishes_key() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, events) = orchestrator(mock_transport(), &storage);

    let outcome = session.login(PASSWORD).unwrap();

    assert_eq!(
        outcome,
        LoginOutcome::LoggedIn {
            key_created: true,
            salt_published: true
        }
    );
    let record = PrivateKeyRecord::load(&storage, USERNAME).unwrap().unwrap();
    assert!(record.salt_saved);
    assert_eq!(session.transport().published().len(), 1);
    assert_eq!(session.transport().published()[0].salt, record.salt.to_vec());
    assert!(storage.get(USERNAME, keys::SESSION_TOKEN).unwrap().is_some());
    assert!(events
        .lock()
        .unwrap()
        .contains(&SyncEvent::KeyMaterialPublished));
}

#[test]
fn test_second_device_recreates_same_key() {
    let first = Storage::in_memory().unwrap();
    let (session, _) = logged_in(&first);
    let material = session.transport().key_material().cloned().unwrap();
    let first_record = PrivateKeyRecord::load(&first, USERNAME).unwrap().unwrap();

    let second = Storage::in_memory().unwrap();
    let mut transport = mock_transport();
    transport.set_key_material(Some(material));
    let (mut other, _) = orchestrator(transport, &second);

    let outcome = other.login(PASSWORD).unwrap();

    assert_eq!(
        outcome,
        LoginOutcome::LoggedIn {
            key_created: false,
            salt_published: true
        }
    );
    let recreated = PrivateKeyRecord::load(&second, USERNAME).unwrap().unwrap();
    assert_eq!(recreated.key.as_bytes(), first_record.key.as_bytes());
    assert!(other.transport().published().is_empty());
}

#[test]
fn test_key_material_from_other_password_is_invalid_key() {
    let km = KeyManager::new(common::kdf());
    let foreign = km
        .create_or_recreate_key("a-completely-different-passphrase", [6u8; 16], None)
        .unwrap();

    let storage = Storage::in_memory().unwrap();
    let mut transport = mock_transport();
    transport.set_key_material(Some(KeyMaterial {
        salt: foreign.salt.to_vec(),
        password_check: foreign.password_check,
    }));
    let (mut session, _) = orchestrator(transport, &storage);

    let err = session.login(PASSWORD).unwrap_err();

    assert!(matches!(err, SyncError::InvalidKey));
    assert_eq!(err.user_action(), UserAction::ReenterPassword);
    assert!(PrivateKeyRecord::load(&storage, USERNAME).unwrap().is_none());
}

#[test]
fn test_weak_password_blocks_first_key() {
    let storage = Storage::in_memory().unwrap();
    let transport = MockTransport::with_account(mock_account(USERNAME, "password"));
    let (mut session, _) = orchestrator(transport, &storage);

    let err = session.login("password").unwrap_err();

    assert!(matches!(err, SyncError::WeakPassword { .. }));
    assert!(PrivateKeyRecord::load(&storage, USERNAME).unwrap().is_none());
    assert!(session.transport().published().is_empty());
}

#[test]
fn test_wrong_password_stores_nothing() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = orchestrator(mock_transport(), &storage);

    let outcome = session.login("definitely-not-it").unwrap();

    assert_eq!(
        outcome,
        LoginOutcome::Rejected(AuthFailure::CredentialsRejected)
    );
    assert!(storage.get(USERNAME, keys::SESSION_TOKEN).unwrap().is_none());
    assert!(storage.get(USERNAME, keys::STORED_SECRET).unwrap().is_none());
}

#[test]
fn test_failed_publish_is_retried_next_round() {
    let storage = Storage::in_memory().unwrap();
    let mut transport = mock_transport();
    transport.set_publish_reply(ServerReply::Error {
        status: 500,
        message: "down".into(),
    });
    install_server(&mut transport);
    let (mut session, events) = orchestrator(transport, &storage);

    let outcome = session.login(PASSWORD).unwrap();
    assert_eq!(
        outcome,
        LoginOutcome::LoggedIn {
            key_created: true,
            salt_published: false
        }
    );
    assert!(!PrivateKeyRecord::load(&storage, USERNAME).unwrap().unwrap().salt_saved);
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, SyncEvent::KeyMaterialPublishFailed { .. })));

    session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(session.transport().published().len(), 1);
    assert!(PrivateKeyRecord::load(&storage, USERNAME).unwrap().unwrap().salt_saved);
}

// ============================================================
// Sync Rounds
// ============================================================

#[test]
fn test_sync_requires_key() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = orchestrator(mock_transport(), &storage);

    let err = session.sync(&CancellationToken::new()).unwrap_err();
    assert!(matches!(err, SyncError::KeyUnavailable));
}

#[test]
fn test_round_sends_dirty_records_and_stores_ids() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, events) = logged_in(&storage);
    let server = install_server(session.transport_mut());
    for name in ["ann", "ben", "cat"] {
        storage
            .create_record(USERNAME, RecordKind::Contact, name.as_bytes(), None)
            .unwrap();
    }

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(outcome.sent, 3);
    assert_eq!(outcome.chunks, 1);
    let records = storage.list_records(USERNAME, RecordKind::Contact).unwrap();
    assert!(records.iter().all(|r| !r.dirty && !r.is_new()));
    assert_eq!(
        storage.get(USERNAME, keys::CLIENT_ID).unwrap().as_deref(),
        Some("client-1")
    );
    assert_eq!(
        storage.get_bytes(USERNAME, keys::SYNC_ANCHOR).unwrap(),
        Some(vec![1])
    );

    {
        let server = server.lock().unwrap();
        let request = &server.requests[0];
        assert_eq!(request.app_version, "test-1.0");
        assert!(request.client_id.is_none());
        assert!(request.anchor.is_none());
    }

    // nothing dirty: still one request to pull changes, carrying the anchor
    let outcome = session.sync(&CancellationToken::new()).unwrap();
    assert_eq!(outcome.sent, 0);
    assert_eq!(outcome.chunks, 1);
    let server = server.lock().unwrap();
    let request = &server.requests[1];
    assert_eq!(request.client_id.as_deref(), Some("client-1"));
    assert_eq!(request.anchor.as_ref().map(|a| a.0.clone()), Some(vec![1]));

    let events = events.lock().unwrap();
    assert!(events.contains(&SyncEvent::RoundStarted {
        account: USERNAME.to_string()
    }));
    assert!(events.contains(&SyncEvent::RoundCompleted {
        sent: 3,
        received: 0,
        quota_rejected: 0,
        skipped: 0
    }));
}

#[test]
fn test_round_applies_server_changes() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    let server = install_server(session.transport_mut());
    let key = PrivateKeyRecord::load(&storage, USERNAME).unwrap().unwrap().key;
    server
        .lock()
        .unwrap()
        .pending_deltas
        .push(upsert_delta(&key, RecordKind::Group, "srv-team", b"team"));

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(outcome.received, 1);
    let groups = storage.list_records(USERNAME, RecordKind::Group).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].data, b"team");
}

#[test]
fn test_records_are_sent_in_chunks() {
    let storage = Storage::in_memory().unwrap();
    let config = config().with_batch_limits(BatchLimits {
        max_records: 2,
        max_blob_bytes: 1024 * 1024,
    });
    let (mut session, _) = orchestrator_with(mock_transport(), &storage, config);
    session.login(PASSWORD).unwrap();
    let server = install_server(session.transport_mut());
    for i in 0..5u8 {
        storage
            .create_record(USERNAME, RecordKind::Contact, &[i], None)
            .unwrap();
    }

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(outcome.chunks, 3);
    assert_eq!(outcome.sent, 5);
    let server = server.lock().unwrap();
    let sizes: Vec<usize> = server.requests.iter().map(|r| r.records.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(server.records_received(), 5);
}

#[test]
fn test_expired_session_is_renewed_once() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, events) = logged_in(&storage);
    install_server(session.transport_mut());
    session.transport_mut().expire_sessions();
    let attempts = session.transport().auth_attempts();

    session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(session.transport().auth_attempts(), attempts + 1);
    assert_eq!(
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == SyncEvent::SessionRenewed)
            .count(),
        1
    );
}

#[test]
fn test_second_unauthorized_aborts_round() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    install_server(session.transport_mut());
    let record = storage
        .create_record(USERNAME, RecordKind::Contact, b"x", None)
        .unwrap();
    session.transport_mut().queue_sync_reply(ServerReply::Unauthorized);
    session.transport_mut().queue_sync_reply(ServerReply::Unauthorized);
    let attempts = session.transport().auth_attempts();

    let err = session.sync(&CancellationToken::new()).unwrap_err();

    assert!(matches!(err, SyncError::Authentication));
    assert_eq!(err.user_action(), UserAction::Reauthenticate);
    assert_eq!(session.transport().auth_attempts(), attempts + 1);
    assert_eq!(session.transport().sync_requests().len(), 2);
    assert!(storage.load_record(USERNAME, &record.local_id).unwrap().unwrap().dirty);
}

#[test]
fn test_server_error_surfaces_status() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    session.transport_mut().queue_sync_reply(ServerReply::Error {
        status: 503,
        message: "maintenance".into(),
    });

    let err = session.sync(&CancellationToken::new()).unwrap_err();

    assert!(matches!(err, SyncError::Server { status: 503, .. }));
    assert_eq!(err.user_action(), UserAction::TryLater);
}

#[test]
fn test_canceled_before_start_sends_nothing() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, events) = logged_in(&storage);
    install_server(session.transport_mut());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = session.sync(&cancel).unwrap_err();

    assert!(err.is_canceled());
    assert!(session.transport().sync_requests().is_empty());
    assert!(events.lock().unwrap().contains(&SyncEvent::RoundCanceled));
}

#[test]
fn test_cancel_mid_round_stops_before_next_chunk() {
    let storage = Storage::in_memory().unwrap();
    let config = config().with_batch_limits(BatchLimits {
        max_records: 1,
        max_blob_bytes: 1024 * 1024,
    });
    let (mut session, _) = orchestrator_with(mock_transport(), &storage, config);
    session.login(PASSWORD).unwrap();
    for i in 0..3u8 {
        storage
            .create_record(USERNAME, RecordKind::Contact, &[i], None)
            .unwrap();
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    session.transport_mut().set_sync_handler(move |bytes| {
        let codec = BincodeCodec;
        let request = codec.decode_request(bytes).unwrap();
        trigger.cancel();
        let response = SyncResponse {
            new_ids: request
                .records
                .iter()
                .map(|r| NewIdEntry {
                    local_id: r.local_id.clone(),
                    server_id: Some(format!("srv-{}", r.local_id)),
                })
                .collect(),
            ..Default::default()
        };
        ServerReply::Ok(codec.encode_response(&response).unwrap())
    });

    let err = session.sync(&cancel).unwrap_err();

    assert!(matches!(err, SyncError::Canceled));
    assert_eq!(session.transport().sync_requests().len(), 1);
    let records = storage.list_records(USERNAME, RecordKind::Contact).unwrap();
    assert!(records.iter().all(|r| r.dirty));
}

#[test]
fn test_overlapping_round_is_refused() {
    let storage = Storage::in_memory().unwrap();
    let round = SingleFlight::new();
    let (session, _) = orchestrator(mock_transport(), &storage);
    let mut session = session.with_guards(round.clone(), SingleFlight::new());
    session.login(PASSWORD).unwrap();

    let _running = round.try_acquire().unwrap();
    let err = session.sync(&CancellationToken::new()).unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning));
}

// ============================================================
// Restrictions
// ============================================================

#[test]
fn test_quota_holds_back_new_records() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, events) = logged_in(&storage);
    install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(1, true))));
    let first = storage
        .create_record(USERNAME, RecordKind::Contact, b"1", None)
        .unwrap();
    let second = storage
        .create_record(USERNAME, RecordKind::Contact, b"2", None)
        .unwrap();

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.quota_rejected.len(), 1);
    assert_eq!(outcome.quota_rejected[0].local_id, second.local_id);
    assert!(!storage.load_record(USERNAME, &first.local_id).unwrap().unwrap().dirty);
    assert!(storage.load_record(USERNAME, &second.local_id).unwrap().unwrap().dirty);
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, SyncEvent::QuotaExceeded { max_count: 1, .. })));
}

#[test]
fn test_photos_withheld_when_unsupported() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    let server = install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(100, false))));
    storage
        .create_record(USERNAME, RecordKind::Contact, b"p", Some(&b"jpeg"[..]))
        .unwrap();

    session.sync(&CancellationToken::new()).unwrap();

    let server = server.lock().unwrap();
    assert!(server.requests[0].records[0].photo.is_none());
}

#[test]
fn test_photos_sent_when_supported() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    let server = install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(100, true))));
    storage
        .create_record(USERNAME, RecordKind::Contact, b"p", Some(&b"jpeg"[..]))
        .unwrap();

    session.sync(&CancellationToken::new()).unwrap();

    let server = server.lock().unwrap();
    assert!(server.requests[0].records[0].photo.is_some());
}

#[test]
fn test_photos_disabled_by_config() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = orchestrator_with(mock_transport(), &storage, config().without_photos());
    session.login(PASSWORD).unwrap();
    let server = install_server(session.transport_mut());
    storage
        .create_record(USERNAME, RecordKind::Contact, b"p", Some(&b"jpeg"[..]))
        .unwrap();

    session.sync(&CancellationToken::new()).unwrap();

    let server = server.lock().unwrap();
    assert!(server.requests[0].records[0].photo.is_none());
}

#[test]
fn test_restrictions_are_cached_until_stale() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(10, true))));

    session.sync(&CancellationToken::new()).unwrap();
    session.sync(&CancellationToken::new()).unwrap();
    assert_eq!(session.transport().restrictions_fetches(), 1);

    let storage = Storage::in_memory().unwrap();
    let (mut session, _) =
        orchestrator_with(mock_transport(), &storage, config().with_restrictions_max_age(0));
    session.login(PASSWORD).unwrap();
    install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(10, true))));

    session.sync(&CancellationToken::new()).unwrap();
    session.sync(&CancellationToken::new()).unwrap();
    assert_eq!(session.transport().restrictions_fetches(), 2);
}

#[test]
fn test_missing_restrictions_admit_everything() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) = logged_in(&storage);
    install_server(session.transport_mut());
    for _ in 0..4 {
        storage
            .create_record(USERNAME, RecordKind::Group, b"g", None)
            .unwrap();
    }

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(outcome.sent, 4);
    assert!(outcome.quota_rejected.is_empty());
}

#[test]
fn test_stale_restrictions_kept_when_server_sends_none() {
    let storage = Storage::in_memory().unwrap();
    let (mut session, _) =
        orchestrator_with(mock_transport(), &storage, config().with_restrictions_max_age(0));
    session.login(PASSWORD).unwrap();
    install_server(session.transport_mut());
    session
        .transport_mut()
        .set_restrictions(Some(encoded_restrictions(&restrictions(1, true))));
    session.sync(&CancellationToken::new()).unwrap();

    session.transport_mut().set_restrictions(None);
    storage
        .create_record(USERNAME, RecordKind::Contact, b"1", None)
        .unwrap();
    let second = storage
        .create_record(USERNAME, RecordKind::Contact, b"2", None)
        .unwrap();

    let outcome = session.sync(&CancellationToken::new()).unwrap();

    assert_eq!(session.transport().restrictions_fetches(), 2);
    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.quota_rejected.len(), 1);
    assert_eq!(outcome.quota_rejected[0].local_id, second.local_id);
}
