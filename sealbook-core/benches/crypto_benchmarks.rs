// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Performance Benchmarks for Crypto, Envelope and Storage Operations
//!
//! Run with: cargo bench -p sealbook-core

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

// =============================================================================
// PAYLOAD ENCRYPTION BENCHMARKS
// =============================================================================

fn bench_payload_encryption(c: &mut Criterion) {
    use sealbook_core::crypto::{decrypt, encrypt, SymmetricKey};

    let key = SymmetricKey::generate().unwrap();

    let mut group = c.benchmark_group("payload_encryption");

    // Typical contact record
    let record = vec![b'x'; 1024];
    group.throughput(Throughput::Bytes(1024));
    group.bench_function("encrypt_record_1KB", |b| {
        b.iter(|| encrypt(black_box(&key), black_box(&record)))
    });

    // Contact photo
    let photo = vec![b'x'; 64 * 1024];
    group.throughput(Throughput::Bytes(64 * 1024));
    group.bench_function("encrypt_photo_64KB", |b| {
        b.iter(|| encrypt(black_box(&key), black_box(&photo)))
    });

    let sealed = encrypt(&key, &record).unwrap();
    group.throughput(Throughput::Bytes(1024));
    group.bench_function("decrypt_record_1KB", |b| {
        b.iter(|| decrypt(black_box(&key), black_box(&sealed)))
    });

    group.finish();
}

// =============================================================================
// KEY DERIVATION BENCHMARKS
// =============================================================================

fn bench_key_derivation(c: &mut Criterion) {
    use sealbook_core::auth::DerivedPassword;
    use sealbook_core::crypto::KdfParams;
    use sealbook_core::keys::KeyManager;

    let mut group = c.benchmark_group("key_derivation");
    group.sample_size(10);

    let params = KdfParams::default();
    let km = KeyManager::new(params);
    let salt = [7u8; 16];

    group.bench_function("argon2id_default", |b| {
        b.iter(|| km.derive_key(black_box("correct-horse-battery-staple"), black_box(&salt)))
    });

    group.bench_function("pbkdf2_srp_password", |b| {
        b.iter(|| {
            DerivedPassword::derive(
                black_box("correct-horse-battery-staple"),
                black_box(&salt),
                &params,
            )
        })
    });

    let key = km.derive_key("correct-horse-battery-staple", &salt).unwrap();
    let blob = km.create_password_check(&key).unwrap();
    group.bench_function("validate_password_check", |b| {
        b.iter(|| km.validate_password_check(black_box(&blob), black_box(&key)))
    });

    group.finish();
}

// =============================================================================
// SRP BENCHMARKS
// =============================================================================

fn bench_srp(c: &mut Criterion) {
    use sealbook_core::auth::{compute_verifier, SrpClient, SrpServer};

    let mut group = c.benchmark_group("srp");
    group.sample_size(20);

    let salt = [3u8; 16];
    let password = [9u8; 32];
    let verifier = compute_verifier("bench@example.com", &password, &salt);
    let server = SrpServer::new("bench@example.com", &salt, &verifier).unwrap();
    let server_public = server.public_ephemeral();

    group.bench_function("client_process_challenge", |b| {
        b.iter(|| {
            let client = SrpClient::new().unwrap();
            client.process_challenge(
                black_box("bench@example.com"),
                black_box(&password),
                &salt,
                black_box(&server_public),
            )
        })
    });

    group.finish();
}

// =============================================================================
// ENVELOPE BENCHMARKS
// =============================================================================

fn bench_envelope(c: &mut Criterion) {
    use sealbook_core::sync::{
        BincodeCodec, EnvelopeCodec, OutgoingRecord, RecordKind, SyncAnchor, SyncRequest,
    };

    let mut group = c.benchmark_group("envelope");

    let request = SyncRequest {
        client_id: Some("client-1".into()),
        anchor: Some(SyncAnchor(vec![0u8; 32])),
        app_version: "1.0.0".into(),
        records: (0..50)
            .map(|i| OutgoingRecord {
                kind: RecordKind::Contact,
                local_id: format!("local-{}", i),
                server_id: Some(format!("srv-{}", i)),
                version: 1,
                deleted: false,
                data: vec![0x42; 512],
                photo: None,
            })
            .collect(),
    };
    let codec = BincodeCodec;
    let encoded = codec.encode_request(&request).unwrap();

    group.bench_function("encode_request_50", |b| {
        b.iter(|| codec.encode_request(black_box(&request)))
    });
    group.bench_function("decode_request_50", |b| {
        b.iter(|| codec.decode_request(black_box(&encoded)))
    });

    group.finish();
}

// =============================================================================
// STORAGE BENCHMARKS
// =============================================================================

fn bench_storage(c: &mut Criterion) {
    use sealbook_core::storage::{LocalStore, Storage};
    use sealbook_core::sync::RecordKind;

    let mut group = c.benchmark_group("storage");

    group.bench_function("create_record", |b| {
        b.iter_batched(
            || Storage::in_memory().unwrap(),
            |storage| storage.create_record("bench", RecordKind::Contact, black_box(b"card"), None),
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("dirty_records_100", |b| {
        b.iter_batched(
            || {
                let storage = Storage::in_memory().unwrap();
                for _ in 0..100 {
                    storage
                        .create_record("bench", RecordKind::Contact, b"card", None)
                        .unwrap();
                }
                storage
            },
            |storage| storage.dirty_records("bench", RecordKind::Contact),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// =============================================================================
// MAIN
// =============================================================================

criterion_group!(
    benches,
    bench_payload_encryption,
    bench_key_derivation,
    bench_srp,
    bench_envelope,
    bench_storage,
);

criterion_main!(benches);
