// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Account restrictions (quota) and their local cache.

use serde::{Deserialize, Serialize};

use super::record::RecordKind;
use crate::storage::{keys, CredentialStore, CredentialStoreExt, StorageError};

/// Server-communicated limits for the account.
///
/// Only gates admission of new records into a round. Records the server
/// already accepted are never held back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    pub max_contact_count: u32,
    pub max_group_count: u32,
    pub photo_sync_supported: bool,
    /// Unix seconds after which the server expects a refetch.
    pub valid_until: Option<u64>,
}

impl Restrictions {
    pub fn max_count(&self, kind: RecordKind) -> u32 {
        match kind {
            RecordKind::Contact => self.max_contact_count,
            RecordKind::Group => self.max_group_count,
        }
    }
}

/// Restrictions as cached for an account, with the time they were fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRestrictions {
    pub restrictions: Restrictions,
    /// Unix seconds.
    pub fetched_at: u64,
}

impl CachedRestrictions {
    /// True once `valid_until` has passed or the cache is older than `max_age_secs`.
    pub fn is_stale(&self, now: u64, max_age_secs: u64) -> bool {
        if matches!(self.restrictions.valid_until, Some(until) if now >= until) {
            return true;
        }
        now.saturating_sub(self.fetched_at) >= max_age_secs
    }

    pub fn load(store: &dyn CredentialStore, account: &str) -> Result<Option<Self>, StorageError> {
        let json = match store.get(account, keys::RESTRICTIONS)? {
            Some(json) => json,
            None => return Ok(None),
        };
        let restrictions: Restrictions =
            serde_json::from_str(&json).map_err(|e| StorageError::CorruptValue {
                key: keys::RESTRICTIONS.to_string(),
                reason: e.to_string(),
            })?;
        let fetched_at = store
            .get_u64(account, keys::RESTRICTIONS_FETCHED_AT)?
            .unwrap_or(0);
        Ok(Some(CachedRestrictions {
            restrictions,
            fetched_at,
        }))
    }

    pub fn save(&self, store: &dyn CredentialStore, account: &str) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.restrictions)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        store.set(account, keys::RESTRICTIONS, Some(&json))?;
        store.set_u64(account, keys::RESTRICTIONS_FETCHED_AT, self.fetched_at)
    }
}
