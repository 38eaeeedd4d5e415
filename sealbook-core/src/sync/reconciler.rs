// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Reconciler
//!
//! Decides what goes out in a round and folds the server's answer back into
//! the local store.
//!
//! # Dirty-flag race
//!
//! A record is sent with the version it had when the round collected it. When
//! the server acknowledges the round, the dirty flag is cleared only if the
//! record is still at that version. A local edit made while the request was
//! in flight bumps the version, so the record stays dirty and goes out again
//! next round. Records the server itself changed during the round are never
//! cleared either.
//!
//! # Quota admission
//!
//! Deletions and changes to records the server already has are always sent.
//! New records are admitted in store enumeration order while the account is
//! below its limit; the rest are reported as [`QuotaRejection`]s and stay
//! dirty.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::events::{EventDispatcher, SyncEvent};
use crate::crypto::{decrypt, encrypt, EncryptionError, SymmetricKey};
use crate::storage::{LocalStore, StorageError};

use super::batch::{BatchLimits, StoreBatch, StoreMutation};
use super::cancel::CancellationToken;
use super::envelope::{DeltaChange, NewIdEntry, OutgoingRecord, ServerDelta};
use super::record::{LocalRecord, QuotaRejection, RecordKind, SentRecord};
use super::restrictions::Restrictions;

/// Reconciliation error types.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Payload encryption error: {0}")]
    Crypto(#[from] EncryptionError),

    #[error("Reconciliation canceled")]
    Canceled,
}

/// Outcome of scanning the store for outgoing changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedBatch {
    pub to_send: Vec<LocalRecord>,
    pub quota_rejected: Vec<QuotaRejection>,
}

/// Reconciles one account's local store with the server.
pub struct SyncReconciler<'a> {
    store: &'a dyn LocalStore,
    key: &'a SymmetricKey,
    events: Arc<EventDispatcher>,
    limits: BatchLimits,
}

impl<'a> SyncReconciler<'a> {
    pub fn new(
        store: &'a dyn LocalStore,
        key: &'a SymmetricKey,
        events: Arc<EventDispatcher>,
        limits: BatchLimits,
    ) -> Self {
        SyncReconciler {
            store,
            key,
            events,
            limits,
        }
    }

    /// Collects dirty and deleted records, applying quota admission to new ones.
    ///
    /// Without restrictions every record is admitted.
    pub fn collect_dirty(
        &self,
        account: &str,
        restrictions: Option<&Restrictions>,
    ) -> Result<CollectedBatch, ReconcileError> {
        let mut collected = CollectedBatch::default();

        for kind in RecordKind::ALL {
            let records = self.store.dirty_records(account, kind)?;
            if records.is_empty() {
                continue;
            }
            let existing = self.store.count_existing(account, kind)?;
            let max_count = restrictions.map(|r| r.max_count(kind));
            let mut admitted = 0usize;
            let mut total_local = None;

            for record in records {
                if record.deleted || !record.is_new() {
                    collected.to_send.push(record);
                    continue;
                }
                match max_count {
                    Some(max) if existing + admitted >= max as usize => {
                        let total_local = match total_local {
                            Some(total) => total,
                            None => {
                                let total = self.store.count_local(account, kind)?;
                                total_local = Some(total);
                                total
                            }
                        };
                        let rejection = QuotaRejection {
                            kind,
                            local_id: record.local_id,
                            total_local,
                            max_count: max,
                        };
                        warn!(
                            "Quota reached for {}: {} not sent ({} local, max {})",
                            kind, rejection.local_id, total_local, max
                        );
                        self.events.dispatch(SyncEvent::from(&rejection));
                        collected.quota_rejected.push(rejection);
                    }
                    _ => {
                        admitted += 1;
                        collected.to_send.push(record);
                    }
                }
            }
        }

        debug!(
            "Collected {} records to send, {} over quota",
            collected.to_send.len(),
            collected.quota_rejected.len()
        );
        Ok(collected)
    }

    /// Encrypts a record's payload fields for the wire.
    ///
    /// Tombstones carry no payload. Photos are dropped unless `include_photo`.
    pub fn to_outgoing(
        &self,
        record: &LocalRecord,
        include_photo: bool,
    ) -> Result<OutgoingRecord, ReconcileError> {
        let (data, photo) = if record.deleted {
            (Vec::new(), None)
        } else {
            let data = encrypt(self.key, &record.data)?;
            let photo = match (&record.photo, include_photo) {
                (Some(photo), true) => Some(encrypt(self.key, photo)?),
                _ => None,
            };
            (data, photo)
        };

        Ok(OutgoingRecord {
            kind: record.kind,
            local_id: record.local_id.clone(),
            server_id: record.server_id.clone().filter(|id| !id.is_empty()),
            version: record.version,
            deleted: record.deleted,
            data,
            photo,
        })
    }

    /// Applies server deltas and returns the local ids they modified.
    ///
    /// A delta for a record this round sent as new (known through `new_ids`)
    /// is the server echoing our own insert and is skipped. When one response
    /// carries several deltas for the same record only the last one applies.
    pub fn apply_server_result(
        &self,
        account: &str,
        sent: &[SentRecord],
        deltas: &[ServerDelta],
        new_ids: &[NewIdEntry],
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, ReconcileError> {
        let echoes: HashSet<&str> = new_ids
            .iter()
            .filter_map(|entry| entry.server_id.as_deref())
            .filter(|id| !id.is_empty())
            .collect();
        let sent_by_server_id: HashMap<(RecordKind, &str), &str> = sent
            .iter()
            .filter_map(|s| {
                s.server_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(|id| ((s.kind, id), s.local_id.as_str()))
            })
            .collect();

        let last_delta: HashMap<(RecordKind, &str), usize> = deltas
            .iter()
            .enumerate()
            .map(|(index, delta)| ((delta.kind, delta.server_id.as_str()), index))
            .collect();

        let mut updated = HashSet::new();
        let mut batch = StoreBatch::new(self.limits);

        for (index, delta) in deltas.iter().enumerate() {
            if last_delta.get(&(delta.kind, delta.server_id.as_str())) != Some(&index) {
                debug!("Superseded delta for {} {}", delta.kind, delta.server_id);
                continue;
            }
            if echoes.contains(delta.server_id.as_str()) {
                debug!("Skipping echo of new {} {}", delta.kind, delta.server_id);
                continue;
            }

            let local_id = match sent_by_server_id.get(&(delta.kind, delta.server_id.as_str())) {
                Some(local_id) => Some((*local_id).to_string()),
                None => self
                    .store
                    .find_by_server_id(account, delta.kind, &delta.server_id)?
                    .map(|record| record.local_id),
            };

            let mutation = match (&delta.change, local_id) {
                (DeltaChange::Upsert { data, photo }, Some(local_id)) => {
                    let (data, photo) = self.open_payload(data, photo.as_deref())?;
                    updated.insert(local_id.clone());
                    StoreMutation::UpdateFromServer {
                        local_id,
                        data,
                        photo,
                    }
                }
                (DeltaChange::Upsert { data, photo }, None) => {
                    let (data, photo) = self.open_payload(data, photo.as_deref())?;
                    StoreMutation::InsertFromServer {
                        kind: delta.kind,
                        server_id: delta.server_id.clone(),
                        data,
                        photo,
                    }
                }
                (DeltaChange::Deleted, Some(local_id)) => {
                    updated.insert(local_id.clone());
                    StoreMutation::DeleteFromServer { local_id }
                }
                (DeltaChange::Deleted, None) => continue,
            };

            if batch.push(mutation) {
                self.flush(account, &mut batch, cancel)?;
            }
        }

        self.flush(account, &mut batch, cancel)?;
        Ok(updated)
    }

    /// Clears dirty flags of acknowledged records whose version did not move.
    ///
    /// Sent tombstones are purged. Records in `updated` keep their flag. New
    /// records are left to [`Self::assign_new_ids`], which clears their flag
    /// together with the id.
    pub fn clear_dirty_flags(
        &self,
        account: &str,
        sent: &[SentRecord],
        updated: &HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let mut batch = StoreBatch::new(self.limits);

        for record in sent {
            let mutation = if record.deleted {
                StoreMutation::Purge {
                    local_id: record.local_id.clone(),
                }
            } else if updated.contains(&record.local_id) || record.is_new() {
                continue;
            } else {
                match self.store.current_version(account, &record.local_id)? {
                    Some(version) if version == record.version => StoreMutation::ClearDirty {
                        local_id: record.local_id.clone(),
                        expected_version: record.version,
                    },
                    Some(version) => {
                        debug!(
                            "{} changed during round (v{} -> v{}), staying dirty",
                            record.local_id, record.version, version
                        );
                        continue;
                    }
                    None => continue,
                }
            };

            if batch.push(mutation) {
                self.flush(account, &mut batch, cancel)?;
            }
        }

        self.flush(account, &mut batch, cancel)
    }

    /// Stores server ids for accepted new records.
    ///
    /// A record sent as new in `sent` is marked clean in the same write if its
    /// version did not move. An entry with no id leaves its record new and
    /// dirty for the next round; an id for a record outside `sent` is stored
    /// without touching the flag.
    pub fn assign_new_ids(
        &self,
        account: &str,
        sent: &[SentRecord],
        new_ids: &[NewIdEntry],
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let sent_versions: HashMap<&str, u64> = sent
            .iter()
            .filter(|record| record.is_new() && !record.deleted)
            .map(|record| (record.local_id.as_str(), record.version))
            .collect();
        let mut batch = StoreBatch::new(self.limits);

        for entry in new_ids {
            let server_id = match entry.server_id.as_deref() {
                Some(id) if !id.is_empty() => id,
                _ => {
                    debug!("No server id for {}, will retry", entry.local_id);
                    continue;
                }
            };
            let mutation = StoreMutation::AssignServerId {
                local_id: entry.local_id.clone(),
                server_id: server_id.to_string(),
                expected_version: sent_versions.get(entry.local_id.as_str()).copied(),
            };
            if batch.push(mutation) {
                self.flush(account, &mut batch, cancel)?;
            }
        }

        self.flush(account, &mut batch, cancel)
    }

    fn open_payload(
        &self,
        data: &[u8],
        photo: Option<&[u8]>,
    ) -> Result<(Vec<u8>, Option<Vec<u8>>), ReconcileError> {
        let data = decrypt(self.key, data)?;
        let photo = photo.map(|p| decrypt(self.key, p)).transpose()?;
        Ok((data, photo))
    }

    fn flush(
        &self,
        account: &str,
        batch: &mut StoreBatch,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        if batch.is_empty() {
            return Ok(());
        }
        if cancel.is_canceled() {
            return Err(ReconcileError::Canceled);
        }
        self.store.apply_batch(account, batch)?;
        batch.clear();
        Ok(())
    }
}
