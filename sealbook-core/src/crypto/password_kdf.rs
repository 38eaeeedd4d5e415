// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Password-Based Key Derivation
//!
//! Two derivations are built from the same password:
//!
//! - the end-to-end encryption key, via Argon2id over the account key salt;
//! - the SRP password value, via PBKDF2-HMAC-SHA256 over the server-issued
//!   password salt.
//!
//! Both are deterministic: the same password and salt always yield the same
//! bytes. Cost parameters are carried in [`KdfParams`].

use ring::pbkdf2;
use std::num::NonZeroU32;
use zeroize::Zeroize;

use super::SymmetricKey;

/// Argon2id memory cost in KiB (64 MB).
const ARGON2_M_COST: u32 = 65536;
/// Argon2id time cost (iterations).
const ARGON2_T_COST: u32 = 3;
/// Argon2id parallelism.
const ARGON2_P_COST: u32 = 4;

/// PBKDF2 iterations for the SRP password value.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of every derived value in bytes.
pub const DERIVED_LEN: usize = 32;

/// Cost parameters for the password KDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Argon2id memory cost in KiB.
    pub argon2_m_cost: u32,
    /// Argon2id time cost.
    pub argon2_t_cost: u32,
    /// Argon2id parallelism.
    pub argon2_p_cost: u32,
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub pbkdf2_iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams {
            argon2_m_cost: ARGON2_M_COST,
            argon2_t_cost: ARGON2_T_COST,
            argon2_p_cost: ARGON2_P_COST,
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Minimal-cost parameters for tests. Never use these for real accounts.
    pub fn fast_insecure() -> Self {
        KdfParams {
            argon2_m_cost: 256,
            argon2_t_cost: 1,
            argon2_p_cost: 1,
            pbkdf2_iterations: 1_000,
        }
    }
}

/// Derives a 32-byte symmetric key from a password using Argon2id.
pub fn derive_key_argon2id(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<SymmetricKey, PasswordKdfError> {
    let argon2_params = argon2::Params::new(
        params.argon2_m_cost,
        params.argon2_t_cost,
        params.argon2_p_cost,
        Some(DERIVED_LEN),
    )
    .map_err(|e| PasswordKdfError::DerivationFailed(e.to_string()))?;

    let argon2 =
        argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, argon2_params);

    let mut key_bytes = [0u8; DERIVED_LEN];
    argon2
        .hash_password_into(password, salt, &mut key_bytes)
        .map_err(|e| PasswordKdfError::DerivationFailed(e.to_string()))?;

    let key = SymmetricKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Derives 32 bytes from a password using PBKDF2-HMAC-SHA256.
pub fn derive_pbkdf2(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; DERIVED_LEN], PasswordKdfError> {
    let mut out = [0u8; DERIVED_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(iterations).ok_or(PasswordKdfError::DerivationFailed(
            "iterations must be non-zero".into(),
        ))?,
        salt,
        password,
        &mut out,
    );
    Ok(out)
}

/// Password KDF error types.
#[derive(Debug, thiserror::Error)]
pub enum PasswordKdfError {
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}
