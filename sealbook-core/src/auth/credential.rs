// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Credential values cached between sessions.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{derive_pbkdf2, KdfParams, PasswordKdfError, DERIVED_LEN};
use crate::storage::{keys, CredentialStore, CredentialStoreExt, StorageError};

/// The password-derived value SRP runs on.
///
/// `PBKDF2-HMAC-SHA256(password, pwd_salt)`. Cached locally so a session can
/// be re-established without asking for the password again. Never the
/// password itself.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedPassword([u8; DERIVED_LEN]);

impl std::fmt::Debug for DerivedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedPassword([REDACTED])")
    }
}

impl DerivedPassword {
    pub fn derive(
        password: &str,
        pwd_salt: &[u8],
        kdf: &KdfParams,
    ) -> Result<Self, PasswordKdfError> {
        derive_pbkdf2(password.as_bytes(), pwd_salt, kdf.pbkdf2_iterations).map(DerivedPassword)
    }

    pub fn from_bytes(bytes: [u8; DERIVED_LEN]) -> Self {
        DerivedPassword(bytes)
    }

    /// Returns `None` unless `bytes` has the derived length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(DerivedPassword)
    }

    pub fn as_bytes(&self) -> &[u8; DERIVED_LEN] {
        &self.0
    }
}

/// Opaque bearer token for an authenticated session.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        SessionToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Username plus the cached secret used for silent re-authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub stored_secret: DerivedPassword,
    /// The salt `stored_secret` was derived with.
    pub pwd_salt: Vec<u8>,
}

impl Credential {
    /// Loads the cached credential for `account`, which is also the username.
    pub fn load(store: &dyn CredentialStore, account: &str) -> Result<Option<Self>, StorageError> {
        let secret = match store.get_bytes(account, keys::STORED_SECRET)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let stored_secret =
            DerivedPassword::from_slice(&secret).ok_or_else(|| StorageError::CorruptValue {
                key: keys::STORED_SECRET.to_string(),
                reason: format!("expected {} bytes, got {}", DERIVED_LEN, secret.len()),
            })?;
        let pwd_salt = store.get_bytes(account, keys::PWD_SALT)?.unwrap_or_default();

        Ok(Some(Credential {
            username: account.to_string(),
            stored_secret,
            pwd_salt,
        }))
    }

    pub fn save(&self, store: &dyn CredentialStore) -> Result<(), StorageError> {
        store.set_bytes(
            &self.username,
            keys::STORED_SECRET,
            Some(&self.stored_secret.as_bytes()[..]),
        )?;
        store.set_bytes(&self.username, keys::PWD_SALT, Some(self.pwd_salt.as_slice()))
    }
}

/// Reads the cached session token for `account`.
pub fn load_session_token(
    store: &dyn CredentialStore,
    account: &str,
) -> Result<Option<SessionToken>, StorageError> {
    Ok(store.get(account, keys::SESSION_TOKEN)?.map(SessionToken::new))
}

/// Caches `token` for `account`; `None` invalidates the cached token.
pub fn store_session_token(
    store: &dyn CredentialStore,
    account: &str,
    token: Option<&SessionToken>,
) -> Result<(), StorageError> {
    store.set(account, keys::SESSION_TOKEN, token.map(SessionToken::as_str))
}
