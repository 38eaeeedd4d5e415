// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SRP-6a Password Proof
//!
//! Client side of the SRP-6a exchange over the RFC 5054 2048-bit group with
//! `g = 2` and SHA-256. Every group element that enters a hash is left-padded
//! to the length of `N`.
//!
//! ```text
//! k  = H(N | PAD(g))
//! x  = H(s | H(I | ":" | P))
//! u  = H(PAD(A) | PAD(B))
//! S  = (B - k * g^x) ^ (a + u * x) mod N
//! K  = H(PAD(S))
//! M1 = H(H(N) xor H(g) | H(I) | s | PAD(A) | PAD(B) | K)
//! M2 = H(PAD(A) | M1 | K)
//! ```
//!
//! [`SrpServer`] is the matching server computation. The client never needs
//! it; registration uses [`compute_verifier`] and tests use the server to
//! stand in for the real service.

use ring::digest;
use ruint::aliases::U2048;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::fill_random;

/// Byte length of the group modulus; every padded value has this length.
pub const PAD_LEN: usize = 256;
/// Length of proofs and the session key.
pub const HASH_LEN: usize = 32;
/// Length of generated private ephemerals.
const EPHEMERAL_LEN: usize = 32;
const GENERATOR: u8 = 2;

// RFC 5054 appendix A, 2048-bit group.
const N_BYTES: [u8; PAD_LEN] = [
    0xac, 0x6b, 0xdb, 0x41, 0x32, 0x4a, 0x9a, 0x9b, 0xf1, 0x66, 0xde, 0x5e, 0x13, 0x89, 0x58, 0x2f,
    0xaf, 0x72, 0xb6, 0x65, 0x19, 0x87, 0xee, 0x07, 0xfc, 0x31, 0x92, 0x94, 0x3d, 0xb5, 0x60, 0x50,
    0xa3, 0x73, 0x29, 0xcb, 0xb4, 0xa0, 0x99, 0xed, 0x81, 0x93, 0xe0, 0x75, 0x77, 0x67, 0xa1, 0x3d,
    0xd5, 0x23, 0x12, 0xab, 0x4b, 0x03, 0x31, 0x0d, 0xcd, 0x7f, 0x48, 0xa9, 0xda, 0x04, 0xfd, 0x50,
    0xe8, 0x08, 0x39, 0x69, 0xed, 0xb7, 0x67, 0xb0, 0xcf, 0x60, 0x95, 0x17, 0x9a, 0x16, 0x3a, 0xb3,
    0x66, 0x1a, 0x05, 0xfb, 0xd5, 0xfa, 0xaa, 0xe8, 0x29, 0x18, 0xa9, 0x96, 0x2f, 0x0b, 0x93, 0xb8,
    0x55, 0xf9, 0x79, 0x93, 0xec, 0x97, 0x5e, 0xea, 0xa8, 0x0d, 0x74, 0x0a, 0xdb, 0xf4, 0xff, 0x74,
    0x73, 0x59, 0xd0, 0x41, 0xd5, 0xc3, 0x3e, 0xa7, 0x1d, 0x28, 0x1e, 0x44, 0x6b, 0x14, 0x77, 0x3b,
    0xca, 0x97, 0xb4, 0x3a, 0x23, 0xfb, 0x80, 0x16, 0x76, 0xbd, 0x20, 0x7a, 0x43, 0x6c, 0x64, 0x81,
    0xf1, 0xd2, 0xb9, 0x07, 0x87, 0x17, 0x46, 0x1a, 0x5b, 0x9d, 0x32, 0xe6, 0x88, 0xf8, 0x77, 0x48,
    0x54, 0x45, 0x23, 0xb5, 0x24, 0xb0, 0xd5, 0x7d, 0x5e, 0xa7, 0x7a, 0x27, 0x75, 0xd2, 0xec, 0xfa,
    0x03, 0x2c, 0xfb, 0xdb, 0xf5, 0x2f, 0xb3, 0x78, 0x61, 0x60, 0x27, 0x90, 0x04, 0xe5, 0x7a, 0xe6,
    0xaf, 0x87, 0x4e, 0x73, 0x03, 0xce, 0x53, 0x29, 0x9c, 0xcc, 0x04, 0x1c, 0x7b, 0xc3, 0x08, 0xd8,
    0x2a, 0x56, 0x98, 0xf3, 0xa8, 0xd0, 0xc3, 0x82, 0x71, 0xae, 0x35, 0xf8, 0xe9, 0xdb, 0xfb, 0xb6,
    0x94, 0xb5, 0xc8, 0x03, 0xd8, 0x9f, 0x7a, 0xe4, 0x35, 0xde, 0x23, 0x6d, 0x52, 0x5f, 0x54, 0x75,
    0x9b, 0x65, 0xe3, 0x72, 0xfc, 0xd6, 0x8e, 0xf2, 0x0f, 0xa7, 0x11, 0x1f, 0x9e, 0x4a, 0xff, 0x73,
];

/// SRP error types.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SrpError {
    /// The peer's public value is zero modulo N, too long, or gives `u = 0`.
    #[error("Illegal SRP parameter: {0}")]
    IllegalParameter(&'static str),

    #[error("Random number generation failed")]
    RandomFailure,
}

fn modulus() -> U2048 {
    U2048::from_be_slice(&N_BYTES)
}

fn generator() -> U2048 {
    U2048::from_be_slice(&[GENERATOR])
}

fn hash(parts: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

fn hash_to_int(parts: &[&[u8]]) -> U2048 {
    U2048::from_be_slice(&hash(parts))
}

/// Big-endian encoding left-padded to [`PAD_LEN`] bytes.
fn pad(value: &U2048) -> Vec<u8> {
    value.to_be_bytes::<PAD_LEN>().to_vec()
}

fn multiplier() -> U2048 {
    hash_to_int(&[&N_BYTES, &pad(&generator())])
}

fn private_key(username: &str, password: &[u8], salt: &[u8]) -> U2048 {
    let inner = hash(&[username.as_bytes(), b":", password]);
    hash_to_int(&[salt, &inner])
}

fn scrambler(client_public: &[u8], server_public: &[u8]) -> U2048 {
    hash_to_int(&[client_public, server_public])
}

fn client_proof(
    username: &str,
    salt: &[u8],
    client_public: &[u8],
    server_public: &[u8],
    key: &[u8; HASH_LEN],
) -> [u8; HASH_LEN] {
    let hn = hash(&[&N_BYTES]);
    let hg = hash(&[&[GENERATOR]]);
    let mut group_hash = [0u8; HASH_LEN];
    for (out, (n, g)) in group_hash.iter_mut().zip(hn.iter().zip(hg.iter())) {
        *out = n ^ g;
    }
    hash(&[
        &group_hash,
        &hash(&[username.as_bytes()]),
        salt,
        client_public,
        server_public,
        key,
    ])
}

fn server_proof(client_public: &[u8], m1: &[u8; HASH_LEN], key: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    hash(&[client_public, m1, key])
}

/// Compares two byte strings without an early exit on the first difference.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn random_ephemeral() -> Result<Zeroizing<Vec<u8>>, SrpError> {
    let mut bytes = Zeroizing::new(vec![0u8; EPHEMERAL_LEN]);
    fill_random(&mut bytes).map_err(|_| SrpError::RandomFailure)?;
    Ok(bytes)
}

/// Reads a big-endian integer, keeping the low [`PAD_LEN`] bytes.
fn from_be_truncated(bytes: &[u8]) -> U2048 {
    let start = bytes.len().saturating_sub(PAD_LEN);
    U2048::from_be_slice(&bytes[start..])
}

/// Parses a peer public value, reduced mod N, and rejects zero.
fn parse_public(bytes: &[u8], n: U2048) -> Result<U2048, SrpError> {
    if bytes.len() > PAD_LEN {
        return Err(SrpError::IllegalParameter("public value longer than N"));
    }
    let value = U2048::from_be_slice(bytes).reduce_mod(n);
    if value.is_zero() {
        return Err(SrpError::IllegalParameter("public value is zero mod N"));
    }
    Ok(value)
}

/// Computes the padded verifier `v = g^x mod N` stored by the server.
pub fn compute_verifier(username: &str, password: &[u8], salt: &[u8]) -> Vec<u8> {
    let x = private_key(username, password, salt);
    pad(&generator().pow_mod(x, modulus()))
}

/// Client half of one SRP exchange.
pub struct SrpClient {
    a: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for SrpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpClient").finish_non_exhaustive()
    }
}

impl SrpClient {
    /// Creates a client with a fresh random private ephemeral.
    pub fn new() -> Result<Self, SrpError> {
        Ok(SrpClient {
            a: random_ephemeral()?,
        })
    }

    /// Creates a client with a fixed private ephemeral, for test vectors.
    pub fn with_private_ephemeral(a: &[u8]) -> Self {
        SrpClient {
            a: Zeroizing::new(a.to_vec()),
        }
    }

    /// The padded client public value `A`.
    pub fn public_ephemeral(&self) -> Vec<u8> {
        let a = from_be_truncated(&self.a);
        pad(&generator().pow_mod(a, modulus()))
    }

    /// Computes the shared key and both proofs from the server's challenge.
    pub fn process_challenge(
        &self,
        username: &str,
        password: &[u8],
        salt: &[u8],
        server_public: &[u8],
    ) -> Result<SrpVerifier, SrpError> {
        let n = modulus();
        let g = generator();
        let b_pub = parse_public(server_public, n)?;

        let a_pad = self.public_ephemeral();
        let b_pad = pad(&b_pub);
        let u = scrambler(&a_pad, &b_pad);
        if u.is_zero() {
            return Err(SrpError::IllegalParameter("scrambling parameter is zero"));
        }

        let x = private_key(username, password, salt);
        let a = from_be_truncated(&self.a);
        let kv = multiplier().mul_mod(g.pow_mod(x, n), n);
        let base = if b_pub >= kv { b_pub - kv } else { b_pub + (n - kv) };
        let s = base.pow_mod(a + u * x, n);

        let key = hash(&[&pad(&s)]);
        let m1 = client_proof(username, salt, &a_pad, &b_pad, &key);
        let expected_m2 = server_proof(&a_pad, &m1, &key);

        Ok(SrpVerifier {
            client_public: a_pad,
            m1,
            expected_m2,
            key: Zeroizing::new(key),
        })
    }
}

/// Result of processing a challenge: what to send and what to expect back.
pub struct SrpVerifier {
    client_public: Vec<u8>,
    m1: [u8; HASH_LEN],
    expected_m2: [u8; HASH_LEN],
    key: Zeroizing<[u8; HASH_LEN]>,
}

impl std::fmt::Debug for SrpVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpVerifier")
            .field("m1", &hex::encode(self.m1))
            .finish_non_exhaustive()
    }
}

impl SrpVerifier {
    pub fn client_public(&self) -> &[u8] {
        &self.client_public
    }

    /// The client proof `M1`.
    pub fn proof(&self) -> &[u8; HASH_LEN] {
        &self.m1
    }

    /// The shared session key `K`.
    pub fn key(&self) -> &[u8; HASH_LEN] {
        &self.key
    }

    /// Checks the server proof `M2` in constant time.
    pub fn verify_server(&self, m2: &[u8]) -> bool {
        constant_time_eq(&self.expected_m2, m2)
    }
}

/// Server half of one SRP exchange.
pub struct SrpServer {
    username: String,
    salt: Vec<u8>,
    verifier: U2048,
    b: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for SrpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpServer")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl SrpServer {
    pub fn new(username: &str, salt: &[u8], verifier: &[u8]) -> Result<Self, SrpError> {
        let b = random_ephemeral()?;
        Ok(Self::with_private_ephemeral(username, salt, verifier, &b))
    }

    pub fn with_private_ephemeral(username: &str, salt: &[u8], verifier: &[u8], b: &[u8]) -> Self {
        SrpServer {
            username: username.to_string(),
            salt: salt.to_vec(),
            verifier: from_be_truncated(verifier),
            b: Zeroizing::new(b.to_vec()),
        }
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The padded server public value `B = k*v + g^b mod N`.
    pub fn public_ephemeral(&self) -> Vec<u8> {
        let n = modulus();
        let b = from_be_truncated(&self.b);
        let kv = multiplier().mul_mod(self.verifier, n);
        let value = kv.add_mod(generator().pow_mod(b, n), n);
        pad(&value)
    }

    /// Verifies the client proof. Returns `M2` on success, `None` on mismatch.
    pub fn verify_client(
        &self,
        client_public: &[u8],
        m1: &[u8],
    ) -> Result<Option<[u8; HASH_LEN]>, SrpError> {
        let n = modulus();
        let a_pub = parse_public(client_public, n)?;
        let a_pad = pad(&a_pub);
        let b_pad = self.public_ephemeral();
        let u = scrambler(&a_pad, &b_pad);
        if u.is_zero() {
            return Err(SrpError::IllegalParameter("scrambling parameter is zero"));
        }

        let b = from_be_truncated(&self.b);
        let s = a_pub.mul_mod(self.verifier.pow_mod(u, n), n).pow_mod(b, n);
        let key = hash(&[&pad(&s)]);
        let expected = client_proof(&self.username, &self.salt, &a_pad, &b_pad, &key);

        if constant_time_eq(&expected, m1) {
            Ok(Some(server_proof(&a_pad, &expected, &key)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_and_server_agree() {
        let salt = [7u8; 16];
        let verifier = compute_verifier("bob", b"secret", &salt);
        let server = SrpServer::new("bob", &salt, &verifier).unwrap();
        let client = SrpClient::new().unwrap();

        let session = client
            .process_challenge("bob", b"secret", &salt, &server.public_ephemeral())
            .unwrap();
        let m2 = server
            .verify_client(session.client_public(), session.proof())
            .unwrap()
            .unwrap();
        assert!(session.verify_server(&m2));
    }

    #[test]
    fn test_wrong_password_is_rejected_by_server() {
        let salt = [7u8; 16];
        let verifier = compute_verifier("bob", b"secret", &salt);
        let server = SrpServer::new("bob", &salt, &verifier).unwrap();
        let client = SrpClient::new().unwrap();

        let session = client
            .process_challenge("bob", b"Secret", &salt, &server.public_ephemeral())
            .unwrap();
        assert_eq!(
            server.verify_client(session.client_public(), session.proof()),
            Ok(None)
        );
    }

    #[test]
    fn test_zero_server_public_rejected() {
        let client = SrpClient::new().unwrap();
        assert!(matches!(
            client.process_challenge("bob", b"secret", &[1], &[0u8; PAD_LEN]),
            Err(SrpError::IllegalParameter(_))
        ));
        assert!(matches!(
            client.process_challenge("bob", b"secret", &[1], &N_BYTES),
            Err(SrpError::IllegalParameter(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
