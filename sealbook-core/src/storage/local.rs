// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local record store abstraction used by the reconciler.

use super::StorageError;
use crate::sync::batch::StoreBatch;
use crate::sync::record::{LocalRecord, RecordKind};

/// The local address-book store the reconciler reads and writes.
///
/// Reads are plain queries; every write goes through [`apply_batch`](Self::apply_batch)
/// so that a store can apply a batch as a single transaction.
pub trait LocalStore {
    /// Dirty or deleted records of `kind`, in the store's enumeration order.
    fn dirty_records(&self, account: &str, kind: RecordKind)
        -> Result<Vec<LocalRecord>, StorageError>;

    /// Live records of `kind` that already carry a server id.
    fn count_existing(&self, account: &str, kind: RecordKind) -> Result<usize, StorageError>;

    /// All live (non-deleted) records of `kind`.
    fn count_local(&self, account: &str, kind: RecordKind) -> Result<usize, StorageError>;

    /// The current version of a record, or `None` if the row is gone.
    fn current_version(&self, account: &str, local_id: &str) -> Result<Option<u64>, StorageError>;

    /// Looks a record up by the id the server assigned to it.
    fn find_by_server_id(
        &self,
        account: &str,
        kind: RecordKind,
        server_id: &str,
    ) -> Result<Option<LocalRecord>, StorageError>;

    /// Applies every mutation in `batch`, in order.
    fn apply_batch(&self, account: &str, batch: &StoreBatch) -> Result<(), StorageError>;
}
