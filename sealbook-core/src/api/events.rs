// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for progress and per-record outcomes of a sync round.

use std::sync::Arc;

use crate::sync::{QuotaRejection, RecordKind};

/// Events emitted while syncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A round began for the account.
    RoundStarted { account: String },

    /// A new record was held back because the account is at its quota.
    QuotaExceeded {
        kind: RecordKind,
        local_id: String,
        /// Live local records of this kind.
        total_local: usize,
        max_count: u32,
    },

    /// One request chunk was answered and reconciled.
    ChunkCompleted {
        /// Records sent in this chunk.
        sent: usize,
        /// Server deltas applied from the response.
        received: usize,
    },

    /// The cached session was rejected and a new one was established.
    SessionRenewed,

    /// Key salt and check blob reached the server.
    KeyMaterialPublished,

    /// Publishing key salt and check blob failed; it is retried next round.
    KeyMaterialPublishFailed { error: String },

    /// The round finished.
    RoundCompleted {
        sent: usize,
        received: usize,
        quota_rejected: usize,
        skipped: u32,
    },

    /// The round stopped at a cancellation point.
    RoundCanceled,
}

impl From<&QuotaRejection> for SyncEvent {
    fn from(rejection: &QuotaRejection) -> Self {
        SyncEvent::QuotaExceeded {
            kind: rejection.kind,
            local_id: rejection.local_id.clone(),
            total_local: rejection.total_local,
            max_count: rejection.max_count,
        }
    }
}

/// Event handler trait.
///
/// Implement this trait to receive sync events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: SyncEvent);
}

/// Simple callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: SyncEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: SyncEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}
