// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sealbook API Layer
//!
//! Entry point for applications: a [`SyncSessionOrchestrator`] per account,
//! configured with [`SyncConfig`] and reporting through [`EventDispatcher`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sealbook_core::api::{EventDispatcher, SyncConfig, SyncSessionOrchestrator};
//! use sealbook_core::sync::CancellationToken;
//!
//! let mut session = SyncSessionOrchestrator::new(
//!     transport,
//!     "alice@example.com",
//!     &storage,
//!     &storage,
//!     SyncConfig::default(),
//!     Arc::new(EventDispatcher::new()),
//! );
//! session.login("correct horse battery staple")?;
//! let outcome = session.sync(&CancellationToken::new())?;
//! println!("sent {} records", outcome.sent);
//! ```

pub mod config;
mod error;
pub mod events;
mod sync_session;

pub use config::{SyncConfig, DEFAULT_RESTRICTIONS_MAX_AGE_SECS};
pub use error::{SyncError, SyncResult, UserAction};
pub use events::{CallbackHandler, EventDispatcher, EventHandler, SyncEvent};
pub use sync_session::{LoginOutcome, SyncOutcome, SyncSessionOrchestrator};
