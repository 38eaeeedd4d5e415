// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact and group record storage operations.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::local::LocalStore;
use super::{unix_millis, Storage, StorageError};
use crate::sync::batch::{StoreBatch, StoreMutation};
use crate::sync::record::{LocalRecord, RecordKind};

const RECORD_COLUMNS: &str =
    "kind, local_id, server_id, version, dirty, deleted, last_modified, data, photo";

impl Storage {
    // === Local Edit Operations ===

    /// Creates a new, unsent record. It starts dirty at version 1.
    pub fn create_record(
        &self,
        account: &str,
        kind: RecordKind,
        data: &[u8],
        photo: Option<&[u8]>,
    ) -> Result<LocalRecord, StorageError> {
        let local_id = Uuid::new_v4().to_string();
        let now = unix_millis();

        self.conn.execute(
            "INSERT INTO records
             (local_id, account, kind, server_id, version, dirty, deleted, last_modified, data, photo)
             VALUES (?1, ?2, ?3, NULL, 1, 1, 0, ?4, ?5, ?6)",
            params![local_id, account, kind.as_i64(), now as i64, data, photo],
        )?;

        Ok(LocalRecord {
            kind,
            local_id,
            server_id: None,
            version: 1,
            dirty: true,
            deleted: false,
            last_modified: now,
            data: data.to_vec(),
            photo: photo.map(<[u8]>::to_vec),
        })
    }

    /// Applies a local edit: replaces the content, bumps the version and marks
    /// the record dirty. Returns the new version.
    pub fn update_record(
        &self,
        account: &str,
        local_id: &str,
        data: &[u8],
        photo: Option<&[u8]>,
    ) -> Result<u64, StorageError> {
        let rows = self.conn.execute(
            "UPDATE records SET data = ?1, photo = ?2, version = version + 1, dirty = 1,
                    last_modified = ?3
             WHERE account = ?4 AND local_id = ?5 AND deleted = 0",
            params![data, photo, unix_millis() as i64, account, local_id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(local_id.to_string()));
        }
        self.current_version(account, local_id)?
            .ok_or_else(|| StorageError::NotFound(local_id.to_string()))
    }

    /// Turns a record into a dirty tombstone. The row stays until the server
    /// acknowledges the deletion.
    pub fn mark_deleted(&self, account: &str, local_id: &str) -> Result<(), StorageError> {
        let rows = self.conn.execute(
            "UPDATE records SET deleted = 1, dirty = 1, version = version + 1, last_modified = ?1
             WHERE account = ?2 AND local_id = ?3",
            params![unix_millis() as i64, account, local_id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(local_id.to_string()));
        }
        Ok(())
    }

    /// Loads a record by local id.
    pub fn load_record(
        &self,
        account: &str,
        local_id: &str,
    ) -> Result<Option<LocalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM records WHERE account = ?1 AND local_id = ?2",
            RECORD_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![account, local_id], row_to_record)
            .optional()?)
    }

    /// Lists all records of a kind, including tombstones, in enumeration order.
    pub fn list_records(
        &self,
        account: &str,
        kind: RecordKind,
    ) -> Result<Vec<LocalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM records WHERE account = ?1 AND kind = ?2 ORDER BY seq",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account, kind.as_i64()], row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    fn count_where(
        &self,
        account: &str,
        kind: RecordKind,
        condition: &str,
    ) -> Result<usize, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) FROM records WHERE account = ?1 AND kind = ?2 AND {}",
            condition
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params![account, kind.as_i64()], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn apply_mutation(
        tx: &rusqlite::Transaction<'_>,
        account: &str,
        mutation: &StoreMutation,
    ) -> Result<(), StorageError> {
        let now = unix_millis() as i64;
        match mutation {
            StoreMutation::InsertFromServer {
                kind,
                server_id,
                data,
                photo,
            } => {
                tx.execute(
                    "INSERT INTO records
                     (local_id, account, kind, server_id, version, dirty, deleted, last_modified, data, photo)
                     VALUES (?1, ?2, ?3, ?4, 1, 0, 0, ?5, ?6, ?7)",
                    params![
                        Uuid::new_v4().to_string(),
                        account,
                        kind.as_i64(),
                        server_id,
                        now,
                        data,
                        photo
                    ],
                )?;
            }
            StoreMutation::UpdateFromServer {
                local_id,
                data,
                photo,
            } => {
                tx.execute(
                    "UPDATE records SET data = ?1, photo = ?2, version = version + 1,
                            last_modified = ?3
                     WHERE account = ?4 AND local_id = ?5",
                    params![data, photo, now, account, local_id],
                )?;
            }
            StoreMutation::DeleteFromServer { local_id } | StoreMutation::Purge { local_id } => {
                tx.execute(
                    "DELETE FROM records WHERE account = ?1 AND local_id = ?2",
                    params![account, local_id],
                )?;
            }
            StoreMutation::ClearDirty {
                local_id,
                expected_version,
            } => {
                tx.execute(
                    "UPDATE records SET dirty = 0
                     WHERE account = ?1 AND local_id = ?2 AND version = ?3 AND deleted = 0",
                    params![account, local_id, *expected_version as i64],
                )?;
            }
            StoreMutation::AssignServerId {
                local_id,
                server_id,
                expected_version,
            } => {
                tx.execute(
                    "UPDATE records SET server_id = ?1,
                            dirty = CASE WHEN ?2 IS NOT NULL AND version = ?2 THEN 0 ELSE dirty END
                     WHERE account = ?3 AND local_id = ?4 AND deleted = 0",
                    params![
                        server_id,
                        expected_version.map(|v| v as i64),
                        account,
                        local_id
                    ],
                )?;
            }
        }
        Ok(())
    }
}

impl LocalStore for Storage {
    fn dirty_records(
        &self,
        account: &str,
        kind: RecordKind,
    ) -> Result<Vec<LocalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM records
             WHERE account = ?1 AND kind = ?2 AND (dirty = 1 OR deleted = 1)
             ORDER BY seq",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account, kind.as_i64()], row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    fn count_existing(&self, account: &str, kind: RecordKind) -> Result<usize, StorageError> {
        self.count_where(
            account,
            kind,
            "deleted = 0 AND server_id IS NOT NULL AND server_id != ''",
        )
    }

    fn count_local(&self, account: &str, kind: RecordKind) -> Result<usize, StorageError> {
        self.count_where(account, kind, "deleted = 0")
    }

    fn current_version(&self, account: &str, local_id: &str) -> Result<Option<u64>, StorageError> {
        let version: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM records WHERE account = ?1 AND local_id = ?2",
                params![account, local_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.map(|v| v as u64))
    }

    fn find_by_server_id(
        &self,
        account: &str,
        kind: RecordKind,
        server_id: &str,
    ) -> Result<Option<LocalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM records WHERE account = ?1 AND kind = ?2 AND server_id = ?3",
            RECORD_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![account, kind.as_i64(), server_id], row_to_record)
            .optional()?)
    }

    fn apply_batch(&self, account: &str, batch: &StoreBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for mutation in batch.mutations() {
            Self::apply_mutation(&tx, account, mutation)?;
        }
        tx.commit()?;

        tracing::debug!(
            account,
            mutations = batch.len(),
            blob_bytes = batch.blob_bytes(),
            "applied store batch"
        );
        Ok(())
    }
}

/// Converts a database row to a LocalRecord.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocalRecord> {
    let kind_value: i64 = row.get(0)?;
    let kind = RecordKind::from_i64(kind_value).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(0, kind_value)
    })?;

    Ok(LocalRecord {
        kind,
        local_id: row.get(1)?,
        server_id: row.get(2)?,
        version: row.get::<_, i64>(3)? as u64,
        dirty: row.get::<_, i32>(4)? != 0,
        deleted: row.get::<_, i32>(5)? != 0,
        last_modified: row.get::<_, i64>(6)? as u64,
        data: row.get(7)?,
        photo: row.get(8)?,
    })
}
