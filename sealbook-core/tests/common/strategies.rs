// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies

use proptest::prelude::*;

/// Printable passwords of realistic length.
pub fn password_strategy() -> impl Strategy<Value = String> {
    "[ -~]{1,40}"
}

/// 16-byte key salts.
pub fn salt_strategy() -> impl Strategy<Value = [u8; 16]> {
    any::<[u8; 16]>()
}

/// Opaque record payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}
