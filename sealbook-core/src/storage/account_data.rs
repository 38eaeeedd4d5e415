// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Account key-value storage operations.

use rusqlite::params;

use super::credentials::CredentialStore;
use super::{Storage, StorageError};

impl CredentialStore for Storage {
    fn get(&self, account: &str, key: &str) -> Result<Option<String>, StorageError> {
        let result = self.conn.query_row(
            "SELECT value FROM account_data WHERE account = ?1 AND key = ?2",
            params![account, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    fn set(&self, account: &str, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => {
                self.conn.execute(
                    "INSERT OR REPLACE INTO account_data (account, key, value) VALUES (?1, ?2, ?3)",
                    params![account, key, value],
                )?;
            }
            None => {
                self.conn.execute(
                    "DELETE FROM account_data WHERE account = ?1 AND key = ?2",
                    params![account, key],
                )?;
            }
        }
        Ok(())
    }
}

impl Storage {
    /// Removes every key-value pair stored for `account`.
    pub fn clear_account_data(&self, account: &str) -> Result<usize, StorageError> {
        Ok(self
            .conn
            .execute("DELETE FROM account_data WHERE account = ?1", params![account])?)
    }
}
