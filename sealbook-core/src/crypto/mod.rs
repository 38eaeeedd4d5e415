// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod password_kdf;

pub use encryption::{
    decrypt, decrypt_with_iv, encrypt, encrypt_with_iv, EncryptionError, SymmetricKey,
};
pub(crate) use encryption::fill_random;
pub use password_kdf::{
    derive_key_argon2id, derive_pbkdf2, KdfParams, PasswordKdfError, DERIVED_LEN,
};
