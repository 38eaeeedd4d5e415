// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sealbook Core Library
//!
//! Zero-knowledge synchronization of an encrypted address book.
//! The password never leaves the device: login is SRP-6a and every record
//! payload is encrypted with a key derived on the client.
//! Hashing and AEAD primitives come from the audited `ring` crate.

pub mod api;
pub mod auth;
pub mod crypto;
pub mod keys;
pub mod network;
pub mod storage;
pub mod sync;

pub use api::{
    EventDispatcher, LoginOutcome, SyncConfig, SyncError, SyncEvent, SyncOutcome, SyncResult,
    SyncSessionOrchestrator, UserAction,
};
pub use auth::{AuthFailure, AuthSession, DerivedPassword, SrpClient, SrpServer};
pub use crypto::{decrypt, encrypt, KdfParams, SymmetricKey};
pub use keys::{check_password_strength, KeyError, KeyManager, PasswordStrength, PrivateKeyRecord};
pub use network::{MockAccount, MockTransport, NetworkError, ServerReply, Transport};
pub use storage::{CredentialStore, LocalStore, MemoryCredentialStore, Storage, StorageError};
pub use sync::{CancellationToken, LocalRecord, RecordKind, Restrictions, SingleFlight};
