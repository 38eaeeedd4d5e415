// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Store Batches
//!
//! Local-store writes produced by a round are accumulated as an ordered list
//! of [`StoreMutation`]s and handed to the store in one `apply_batch` call.
//! A batch is flushed once it holds [`BatchLimits::max_records`] mutations or
//! its attachment bytes reach [`BatchLimits::max_blob_bytes`], which bounds
//! both peak memory and the size of a single store transaction. The same
//! limits split outgoing records into request chunks.

use super::record::{LocalRecord, RecordKind};

/// Default maximum number of records per batch.
pub const DEFAULT_MAX_RECORDS: usize = 50;
/// Default attachment byte threshold per batch (400 KB).
pub const DEFAULT_MAX_BLOB_BYTES: usize = 400 * 1024;

/// Flush thresholds for batches and request chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_records: usize,
    pub max_blob_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            max_records: DEFAULT_MAX_RECORDS,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
        }
    }
}

/// A single pending write against the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMutation {
    /// A record the server knows and the client does not.
    InsertFromServer {
        kind: RecordKind,
        server_id: String,
        data: Vec<u8>,
        photo: Option<Vec<u8>>,
    },
    /// Server-side content for an existing local row. Bumps the version.
    UpdateFromServer {
        local_id: String,
        data: Vec<u8>,
        photo: Option<Vec<u8>>,
    },
    /// The server deleted the record; the row is removed.
    DeleteFromServer { local_id: String },
    /// Clears the dirty flag only if the row is still at `expected_version`.
    ClearDirty {
        local_id: String,
        expected_version: u64,
    },
    /// Removes an acknowledged tombstone.
    Purge { local_id: String },
    /// Stores the id the server assigned to a new record.
    ///
    /// The same write clears the dirty flag when the row is still at
    /// `expected_version`, so an accepted record is never clean without an id.
    AssignServerId {
        local_id: String,
        server_id: String,
        expected_version: Option<u64>,
    },
}

impl StoreMutation {
    /// Attachment bytes carried by this mutation.
    pub fn blob_bytes(&self) -> usize {
        match self {
            StoreMutation::InsertFromServer { photo, .. }
            | StoreMutation::UpdateFromServer { photo, .. } => photo.as_ref().map_or(0, Vec::len),
            _ => 0,
        }
    }
}

/// Ordered list of mutations with byte-size accounting.
#[derive(Debug, Clone)]
pub struct StoreBatch {
    mutations: Vec<StoreMutation>,
    blob_bytes: usize,
    limits: BatchLimits,
}

impl StoreBatch {
    pub fn new(limits: BatchLimits) -> Self {
        StoreBatch {
            mutations: Vec::new(),
            blob_bytes: 0,
            limits,
        }
    }

    /// Appends a mutation. Returns true when the batch should be flushed.
    pub fn push(&mut self, mutation: StoreMutation) -> bool {
        self.blob_bytes += mutation.blob_bytes();
        self.mutations.push(mutation);
        self.is_full()
    }

    /// True once either limit has been reached.
    pub fn is_full(&self) -> bool {
        self.mutations.len() >= self.limits.max_records
            || self.blob_bytes >= self.limits.max_blob_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn blob_bytes(&self) -> usize {
        self.blob_bytes
    }

    pub fn mutations(&self) -> &[StoreMutation] {
        &self.mutations
    }

    /// Empties the batch, keeping its limits.
    pub fn clear(&mut self) {
        self.mutations.clear();
        self.blob_bytes = 0;
    }
}

/// Splits outgoing records into request chunks bounded by `limits`.
///
/// Enumeration order is preserved. A record whose attachment alone exceeds
/// the byte threshold travels in a chunk of its own.
pub fn chunk_records(records: Vec<LocalRecord>, limits: BatchLimits) -> Vec<Vec<LocalRecord>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_bytes = 0usize;

    for record in records {
        let size = record.blob_size();
        if !current.is_empty() && current_bytes + size > limits.max_blob_bytes {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(record);
        if current.len() >= limits.max_records || current_bytes >= limits.max_blob_bytes {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, photo_len: usize) -> LocalRecord {
        LocalRecord {
            kind: RecordKind::Contact,
            local_id: format!("l{}", id),
            server_id: None,
            version: 1,
            dirty: true,
            deleted: false,
            last_modified: 0,
            data: vec![1, 2, 3],
            photo: (photo_len > 0).then(|| vec![0u8; photo_len]),
        }
    }

    #[test]
    fn test_batch_flushes_at_record_limit() {
        let mut batch = StoreBatch::new(BatchLimits {
            max_records: 3,
            max_blob_bytes: usize::MAX,
        });
        for i in 0..2 {
            assert!(!batch.push(StoreMutation::Purge {
                local_id: i.to_string()
            }));
        }
        assert!(batch.push(StoreMutation::Purge {
            local_id: "2".into()
        }));
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.blob_bytes(), 0);
    }

    #[test]
    fn test_batch_flushes_early_on_blob_bytes() {
        let mut batch = StoreBatch::new(BatchLimits {
            max_records: 50,
            max_blob_bytes: 1000,
        });
        assert!(!batch.push(StoreMutation::UpdateFromServer {
            local_id: "a".into(),
            data: vec![],
            photo: Some(vec![0u8; 600]),
        }));
        assert!(batch.push(StoreMutation::UpdateFromServer {
            local_id: "b".into(),
            data: vec![],
            photo: Some(vec![0u8; 600]),
        }));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.blob_bytes(), 1200);
    }

    #[test]
    fn test_chunk_by_count() {
        let records: Vec<_> = (0..120).map(|i| record(i, 0)).collect();
        let chunks = chunk_records(records, BatchLimits::default());
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(chunks[1][0].local_id, "l50");
    }

    #[test]
    fn test_chunk_by_bytes() {
        let limits = BatchLimits {
            max_records: 50,
            max_blob_bytes: 1000,
        };
        let records = vec![record(0, 400), record(1, 400), record(2, 400), record(3, 5000)];
        let chunks = chunk_records(records, limits);
        let ids: Vec<Vec<_>> = chunks
            .iter()
            .map(|c| c.iter().map(|r| r.local_id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["l0", "l1"], vec!["l2"], vec!["l3"]]);
    }

    #[test]
    fn test_chunk_empty() {
        assert!(chunk_records(Vec::new(), BatchLimits::default()).is_empty());
    }
}
