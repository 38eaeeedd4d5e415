// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Platform Keychain Credential Store
//!
//! Keeps account values in the OS keychain (macOS Keychain, Linux Secret
//! Service, Windows Credential Manager). Available with the `secure-storage`
//! feature.

use super::credentials::CredentialStore;
use super::StorageError;

/// Credential store backed by the `keyring` crate.
///
/// Each value is one keychain entry named `<account>/<key>` under the
/// configured service.
pub struct PlatformKeyring {
    service: String,
}

impl PlatformKeyring {
    /// Creates a new platform keyring accessor.
    ///
    /// # Arguments
    /// * `service` - The service name to use for keychain entries (e.g., "sealbook")
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, &format!("{}/{}", account, key))
            .map_err(|e| StorageError::Keyring(e.to_string()))
    }
}

impl CredentialStore for PlatformKeyring {
    fn get(&self, account: &str, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(account, key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keyring(format!(
                "Failed to load from keychain: {}",
                e
            ))),
        }
    }

    fn set(&self, account: &str, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let entry = self.entry(account, key)?;
        match value {
            Some(v) => entry
                .set_password(v)
                .map_err(|e| StorageError::Keyring(format!("Failed to save to keychain: {}", e))),
            None => match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(StorageError::Keyring(format!(
                    "Failed to delete from keychain: {}",
                    e
                ))),
            },
        }
    }
}
