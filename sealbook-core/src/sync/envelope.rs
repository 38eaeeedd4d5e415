// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Envelope
//!
//! Logical content of a sync request and its response, and the
//! [`EnvelopeCodec`] that turns them into the opaque bytes the transport
//! carries. The byte layout belongs to the codec; deployments talking to a
//! service with its own layout plug in their own codec.
//!
//! [`BincodeCodec`] is the default: a version byte followed by the
//! DEFLATE-compressed bincode encoding of the value.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::RecordKind;
use super::restrictions::Restrictions;

/// Envelope error types.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Envelope encoding failed: {0}")]
    Encode(String),

    #[error("Envelope decoding failed: {0}")]
    Decode(String),

    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    #[error("Empty envelope")]
    Empty,
}

/// Opaque server cursor handed back on the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAnchor(pub Vec<u8>);

/// A dirty record as it goes out. Payload fields are already encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingRecord {
    pub kind: RecordKind,
    pub local_id: String,
    pub server_id: Option<String>,
    pub version: u64,
    pub deleted: bool,
    pub data: Vec<u8>,
    pub photo: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub client_id: Option<String>,
    pub anchor: Option<SyncAnchor>,
    pub app_version: String,
    pub records: Vec<OutgoingRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaChange {
    /// New or changed content, encrypted under the account key.
    Upsert {
        data: Vec<u8>,
        photo: Option<Vec<u8>>,
    },
    Deleted,
}

/// A change the server has that the client has not seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDelta {
    pub kind: RecordKind,
    pub server_id: String,
    pub change: DeltaChange,
}

/// Server id assigned to a record the client sent as new.
///
/// `None` or an empty id means the server did not accept the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIdEntry {
    pub local_id: String,
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    pub new_client_id: Option<String>,
    pub new_anchor: Option<SyncAnchor>,
    pub deltas: Vec<ServerDelta>,
    pub new_ids: Vec<NewIdEntry>,
    /// Entries the server skipped.
    pub skipped_count: u32,
}

/// Converts envelopes to and from wire bytes.
pub trait EnvelopeCodec: Send + Sync {
    fn encode_request(&self, request: &SyncRequest) -> Result<Vec<u8>, EnvelopeError>;

    fn decode_response(&self, bytes: &[u8]) -> Result<SyncResponse, EnvelopeError>;

    fn decode_restrictions(&self, bytes: &[u8]) -> Result<Restrictions, EnvelopeError>;
}

/// Current version byte of the default layout.
pub const ENVELOPE_VERSION: u8 = 1;

/// Version byte plus DEFLATE-compressed bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
        let raw = bincode::serialize(value).map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        let mut encoder = DeflateEncoder::new(vec![ENVELOPE_VERSION], Compression::default());
        encoder
            .write_all(&raw)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| EnvelopeError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
        let (&version, body) = bytes.split_first().ok_or(EnvelopeError::Empty)?;
        if version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(version));
        }
        let mut raw = Vec::new();
        DeflateDecoder::new(body)
            .read_to_end(&mut raw)
            .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
        bincode::deserialize(&raw).map_err(|e| EnvelopeError::Decode(e.to_string()))
    }

    /// Server side of [`EnvelopeCodec::encode_request`].
    pub fn decode_request(&self, bytes: &[u8]) -> Result<SyncRequest, EnvelopeError> {
        Self::decode(bytes)
    }

    /// Server side of [`EnvelopeCodec::decode_response`].
    pub fn encode_response(&self, response: &SyncResponse) -> Result<Vec<u8>, EnvelopeError> {
        Self::encode(response)
    }

    /// Server side of [`EnvelopeCodec::decode_restrictions`].
    pub fn encode_restrictions(&self, restrictions: &Restrictions) -> Result<Vec<u8>, EnvelopeError> {
        Self::encode(restrictions)
    }
}

impl EnvelopeCodec for BincodeCodec {
    fn encode_request(&self, request: &SyncRequest) -> Result<Vec<u8>, EnvelopeError> {
        Self::encode(request)
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<SyncResponse, EnvelopeError> {
        Self::decode(bytes)
    }

    fn decode_restrictions(&self, bytes: &[u8]) -> Result<Restrictions, EnvelopeError> {
        Self::decode(bytes)
    }
}
