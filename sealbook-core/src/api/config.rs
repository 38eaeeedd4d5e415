// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Configuration
//!
//! Configuration types for the sync orchestrator.

use crate::crypto::KdfParams;
use crate::sync::BatchLimits;

/// Default age after which cached restrictions are refetched (24 hours).
pub const DEFAULT_RESTRICTIONS_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Configuration for sync rounds.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Client version reported with every sync request.
    pub app_version: String,

    /// Password KDF cost.
    pub kdf: KdfParams,

    /// Request chunk and store batch limits.
    pub batch: BatchLimits,

    /// Cached restrictions older than this are refetched.
    pub restrictions_max_age_secs: u64,

    /// Whether photos are sent at all. The account's restrictions may still
    /// forbid them.
    pub sync_photos: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            kdf: KdfParams::default(),
            batch: BatchLimits::default(),
            restrictions_max_age_secs: DEFAULT_RESTRICTIONS_MAX_AGE_SECS,
            sync_photos: true,
        }
    }
}

impl SyncConfig {
    /// Sets the reported client version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_batch_limits(mut self, batch: BatchLimits) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_restrictions_max_age(mut self, secs: u64) -> Self {
        self.restrictions_max_age_secs = secs;
        self
    }

    /// Stops sending photos regardless of restrictions.
    pub fn without_photos(mut self) -> Self {
        self.sync_photos = false;
        self
    }
}
