// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local record model shared by contacts and groups.

use serde::{Deserialize, Serialize};

/// The two record families kept in the address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Contact,
    Group,
}

impl RecordKind {
    /// Every kind, in the order a round processes them.
    pub const ALL: [RecordKind; 2] = [RecordKind::Contact, RecordKind::Group];

    /// Column value used by the SQLite store.
    pub fn as_i64(self) -> i64 {
        match self {
            RecordKind::Contact => 0,
            RecordKind::Group => 1,
        }
    }

    /// Parses the column value used by the SQLite store.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(RecordKind::Contact),
            1 => Some(RecordKind::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Contact => write!(f, "contact"),
            RecordKind::Group => write!(f, "group"),
        }
    }
}

/// A contact or group row in the local store.
///
/// `data` is the plaintext record produced by the platform mapping layer and
/// is opaque here. A record without a `server_id` has never been accepted by
/// the server. A deleted record stays as a tombstone until the server
/// acknowledges the deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub kind: RecordKind,
    pub local_id: String,
    pub server_id: Option<String>,
    /// Strictly increases on every local mutation.
    pub version: u64,
    pub dirty: bool,
    pub deleted: bool,
    /// Milliseconds since the Unix epoch.
    pub last_modified: u64,
    pub data: Vec<u8>,
    pub photo: Option<Vec<u8>>,
}

impl LocalRecord {
    /// True when the server has not assigned an id yet.
    pub fn is_new(&self) -> bool {
        self.server_id.as_deref().map_or(true, str::is_empty)
    }

    /// Bytes of binary attachments carried by this record.
    pub fn blob_size(&self) -> usize {
        self.photo.as_ref().map_or(0, Vec::len)
    }
}

/// Snapshot of a record as it was when it went out in a round.
///
/// The captured `version` is the optimistic-concurrency token compared
/// against the store once the server has acknowledged the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub kind: RecordKind,
    pub local_id: String,
    pub server_id: Option<String>,
    pub version: u64,
    pub deleted: bool,
}

impl SentRecord {
    pub fn is_new(&self) -> bool {
        self.server_id.as_deref().map_or(true, str::is_empty)
    }
}

impl From<&LocalRecord> for SentRecord {
    fn from(record: &LocalRecord) -> Self {
        SentRecord {
            kind: record.kind,
            local_id: record.local_id.clone(),
            server_id: record.server_id.clone(),
            version: record.version,
            deleted: record.deleted,
        }
    }
}

/// A new record held back because the account is at its quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRejection {
    pub kind: RecordKind,
    pub local_id: String,
    /// Live (non-deleted) local records of this kind.
    pub total_local: usize,
    /// The limit from the cached restrictions.
    pub max_count: u32,
}
