// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Password-Check Blobs
//!
//! A check blob lets a client decide offline whether a candidate key is the
//! account's key. The plaintext is a 12-digit code: 11 random digits followed
//! by a UPC-style mod-10 check digit. The code is sealed with AES-256-GCM
//! under the key and a fresh IV; the blob is `iv || ciphertext || tag`.
//!
//! Without the key the blob reveals nothing about the password.

use rand::Rng;

use crate::crypto::{decrypt_with_iv, encrypt_with_iv, SymmetricKey};

use super::KeyError;

/// Number of random payload digits.
pub const PAYLOAD_DIGITS: usize = 11;
/// Payload digits plus the check digit.
pub const CODE_DIGITS: usize = PAYLOAD_DIGITS + 1;

/// Computes the UPC-style check digit for `digits` (values 0-9).
///
/// `res1` sums the digits at even positions, `res2` those at odd positions;
/// the check digit is `(10 - ((res1 * 3 + res2) % 10)) % 10`.
pub fn upc_checksum(digits: &[u8]) -> u8 {
    let (res1, res2) = digits
        .iter()
        .enumerate()
        .fold((0u32, 0u32), |(even, odd), (i, &d)| {
            if i % 2 == 0 {
                (even + u32::from(d), odd)
            } else {
                (even, odd + u32::from(d))
            }
        });
    ((10 - ((res1 * 3 + res2) % 10)) % 10) as u8
}

/// Returns true if `code` is 12 ASCII digits whose last digit is the
/// checksum of the first 11.
pub fn validate_check_code(code: &[u8]) -> bool {
    if code.len() != CODE_DIGITS || !code.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let digits: Vec<u8> = code.iter().map(|c| c - b'0').collect();
    upc_checksum(&digits[..PAYLOAD_DIGITS]) == digits[PAYLOAD_DIGITS]
}

/// Generates a fresh 12-digit code as ASCII bytes.
fn generate_check_code() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut digits: Vec<u8> = (0..PAYLOAD_DIGITS).map(|_| rng.gen_range(0..10u8)).collect();
    digits.push(upc_checksum(&digits));
    digits.into_iter().map(|d| b'0' + d).collect()
}

/// Seals a fresh check code under `key`.
pub fn create_password_check(key: &SymmetricKey) -> Result<Vec<u8>, KeyError> {
    let code = generate_check_code();
    encrypt_with_iv(key, &code).map_err(|e| KeyError::Encryption(e.to_string()))
}

/// Confirms that `check_blob` was sealed under `candidate`.
///
/// Tag failures, malformed blobs and checksum mismatches all collapse into
/// [`KeyError::InvalidKey`].
pub fn validate_password_check(check_blob: &[u8], candidate: &SymmetricKey) -> Result<(), KeyError> {
    let code = decrypt_with_iv(candidate, check_blob).map_err(|_| KeyError::InvalidKey)?;
    if validate_check_code(&code) {
        Ok(())
    } else {
        Err(KeyError::InvalidKey)
    }
}
