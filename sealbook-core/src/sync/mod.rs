// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Module
//!
//! Everything one synchronization round needs below the orchestrator: the
//! record model, quota restrictions, store batches, the wire envelope and
//! the reconciler that ties them to the local store.

pub mod batch;
mod cancel;
pub mod envelope;
mod guard;
mod reconciler;
pub mod record;
mod restrictions;

pub use batch::{chunk_records, BatchLimits, StoreBatch, StoreMutation};
pub use cancel::CancellationToken;
pub use envelope::{
    BincodeCodec, DeltaChange, EnvelopeCodec, EnvelopeError, NewIdEntry, OutgoingRecord,
    ServerDelta, SyncAnchor, SyncRequest, SyncResponse,
};
pub use guard::{SingleFlight, SingleFlightGuard};
pub use reconciler::{CollectedBatch, ReconcileError, SyncReconciler};
pub use record::{LocalRecord, QuotaRejection, RecordKind, SentRecord};
pub use restrictions::{CachedRestrictions, Restrictions};
