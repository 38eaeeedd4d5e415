// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Symmetric Encryption (XChaCha20-Poly1305 / AES-256-GCM)
//!
//! Two ciphertext formats are in use:
//!
//! - Contact payload fields: `algorithm_tag (1 byte) || nonce (24 bytes) || ciphertext || tag`,
//!   produced by [`encrypt`] with XChaCha20-Poly1305.
//! - Password-check blobs: `iv (12 bytes) || ciphertext || tag`, produced by
//!   [`encrypt_with_iv`] with AES-256-GCM. The format is fixed because the
//!   blob is mirrored to the server and read back by other clients.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::XChaCha20Poly1305;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;
use zeroize::Zeroize;

/// Encryption error types.
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: data may be corrupted or wrong key")]
    DecryptionFailed,
    #[error("Ciphertext too short")]
    CiphertextTooShort,
    #[error("Unknown algorithm tag: {0:#04x}")]
    UnknownAlgorithm(u8),
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("Random number generator failure")]
    RandomFailure,
}

/// Algorithm tag for XChaCha20-Poly1305.
const ALG_TAG_XCHACHA20: u8 = 0x02;

/// IV size for AES-256-GCM (96 bits = 12 bytes).
pub const AES_GCM_IV_SIZE: usize = 12;
/// Nonce size for XChaCha20-Poly1305 (192 bits = 24 bytes).
const XCHACHA20_NONCE_SIZE: usize = 24;
/// Authentication tag size (16 bytes for both algorithms).
pub const TAG_SIZE: usize = 16;

/// 256-bit symmetric encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SymmetricKey {
    /// Generates a new random symmetric key.
    pub fn generate() -> Result<Self, EncryptionError> {
        let rng = SystemRandom::new();
        let key = ring::rand::generate::<[u8; 32]>(&rng)
            .map_err(|_| EncryptionError::RandomFailure)?
            .expose();
        Ok(SymmetricKey { bytes: key })
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SymmetricKey { bytes }
    }

    /// Creates a key from a slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncryptionError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EncryptionError::InvalidKeyLength(bytes.len()))?;
        Ok(SymmetricKey { bytes: array })
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Fills `buf` from the system RNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), EncryptionError> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| EncryptionError::RandomFailure)
}

/// Encrypts data using XChaCha20-Poly1305.
///
/// Output format: `0x02 || nonce (24 bytes) || ciphertext || tag (16 bytes)`
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let mut nonce_bytes = [0u8; XCHACHA20_NONCE_SIZE];
    fill_random(&mut nonce_bytes)?;

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = chacha20poly1305::XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(1 + XCHACHA20_NONCE_SIZE + ciphertext.len());
    output.push(ALG_TAG_XCHACHA20);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypts data produced by [`encrypt`].
pub fn decrypt(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let (tag, data) = ciphertext
        .split_first()
        .ok_or(EncryptionError::CiphertextTooShort)?;

    if *tag != ALG_TAG_XCHACHA20 {
        return Err(EncryptionError::UnknownAlgorithm(*tag));
    }

    if data.len() < XCHACHA20_NONCE_SIZE + TAG_SIZE {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let nonce = chacha20poly1305::XNonce::from_slice(&data[..XCHACHA20_NONCE_SIZE]);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(nonce, &data[XCHACHA20_NONCE_SIZE..])
        .map_err(|_| EncryptionError::DecryptionFailed)
}

/// Encrypts data using AES-256-GCM under a fresh random IV.
///
/// Output format: `iv (12 bytes) || ciphertext || tag (16 bytes)`
pub fn encrypt_with_iv(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let mut iv = [0u8; AES_GCM_IV_SIZE];
    fill_random(&mut iv)?;

    let unbound_key = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| EncryptionError::EncryptionFailed)?;
    let sealing_key = LessSafeKey::new(unbound_key);

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(AES_GCM_IV_SIZE + in_out.len());
    output.extend_from_slice(&iv);
    output.extend_from_slice(&in_out);

    Ok(output)
}

/// Decrypts data produced by [`encrypt_with_iv`].
pub fn decrypt_with_iv(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < AES_GCM_IV_SIZE + AES_256_GCM.tag_len() {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let iv: [u8; AES_GCM_IV_SIZE] = data[..AES_GCM_IV_SIZE]
        .try_into()
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    let unbound_key = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| EncryptionError::DecryptionFailed)?;
    let opening_key = LessSafeKey::new(unbound_key);

    let mut buffer = data[AES_GCM_IV_SIZE..].to_vec();
    let plaintext = opening_key
        .open_in_place(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut buffer)
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    Ok(plaintext.to_vec())
}
