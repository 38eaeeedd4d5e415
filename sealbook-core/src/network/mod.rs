// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Layer
//!
//! The core never opens a socket. It talks to the service through the
//! [`Transport`] trait, which platform code implements over whatever wire
//! protocol the service speaks. [`MockTransport`] implements it in-process
//! for tests.

mod error;
mod mock;
mod transport;

pub use error::NetworkError;
pub use mock::{MockAccount, MockTransport};
pub use transport::{
    AuthChallenge, AuthConfirmation, KeyMaterial, ServerReply, Transport, TransportResult,
};
