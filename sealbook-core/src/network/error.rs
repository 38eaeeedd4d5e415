// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types
//!
//! Transport failures. A server that answered, even with an error status, is
//! not a network error; see [`ServerReply`](super::ServerReply).

use thiserror::Error;

/// Network and transport error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Request send failed: {0}")]
    SendFailed(String),

    #[error("Response receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Transport not connected")]
    NotConnected,
}
