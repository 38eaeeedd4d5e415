// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Two collaborators are injected into the sync core:
//!
//! - [`CredentialStore`]: account-scoped key-value pairs (salts, check blobs,
//!   cached tokens, restrictions, anchors).
//! - [`LocalStore`]: the local contact and group records.
//!
//! [`Storage`] is the SQLite implementation of both.

mod account_data;
pub mod credentials;
mod error;
pub mod local;
pub mod migration;
mod records;
#[cfg(feature = "secure-storage")]
pub mod secure;

pub use credentials::{keys, CredentialStore, CredentialStoreExt, MemoryCredentialStore};
pub use error::StorageError;
pub use local::LocalStore;

#[cfg(feature = "secure-storage")]
pub use secure::PlatformKeyring;

use rusqlite::Connection;
use std::path::Path;

/// Returns the current Unix timestamp in seconds.
/// Falls back to 0 if the system clock is before UNIX_EPOCH.
pub(crate) fn unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns the current Unix timestamp in milliseconds.
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// SQLite-based storage implementation.
///
/// Holds the local address book and the account key-value table in a single
/// database file.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        migration::MigrationRunner::run(&self.conn, &migration::all_migrations())
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }
}
