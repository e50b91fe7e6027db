//! h2c client codec benchmarks
//!
//! This benchmark suite measures:
//! - Tuning settings serialization and base64url encoding
//! - Upgrade request construction and wire encoding
//! - SETTINGS, HEADERS and DATA frame encoding
//! - Request header block compression
//!
//! Run with: cargo bench --bench h2c_codec

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2c_client::h2c::{upgrade, TuningSettings};
use h2c_client::http::h2::codec::FrameCodec;
use h2c_client::http::h2::frames::{DataFrame, FrameFlags, FrameType, HeadersFrame};
use h2c_client::http::h2::{H2Request, DEFAULT_MAX_FRAME_SIZE};
use std::time::Duration;

fn bench_settings(c: &mut Criterion) {
    let mut group = c.benchmark_group("tuning_settings");
    let mut settings = TuningSettings::new();
    settings.apply("maxStream", "1000").unwrap();

    group.bench_function("serialize", |b| {
        b.iter(|| black_box(black_box(&settings).serialize()));
    });

    group.bench_function("encoded", |b| {
        b.iter(|| black_box(black_box(&settings).encoded()));
    });

    group.bench_function("apply", |b| {
        b.iter(|| {
            let mut s = TuningSettings::new();
            black_box(s.apply(black_box("windowSize"), black_box("1048576")).unwrap());
        });
    });

    group.bench_function("settings_frame", |b| {
        let payload = settings.serialize();
        b.iter(|| black_box(FrameCodec::encode_settings_payload(black_box(&payload))));
    });

    group.finish();
}

fn bench_upgrade_request(c: &mut Criterion) {
    let settings = TuningSettings::new();

    c.bench_function("upgrade_request_to_wire", |b| {
        b.iter(|| {
            let request = upgrade::build_request(black_box("example.test:8080"), &settings);
            black_box(request.to_wire());
        });
    });
}

fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    group.bench_function("header", |b| {
        b.iter(|| {
            black_box(FrameCodec::encode_header(
                black_box(FrameType::Headers),
                black_box(FrameFlags::from_u8(FrameFlags::END_HEADERS)),
                black_box(3),
                black_box(128),
            ))
        });
    });

    group.bench_function("headers_frame", |b| {
        let block = Bytes::from(vec![0x82u8; 64]);
        b.iter(|| {
            let frame = HeadersFrame::new(3, block.clone(), true, true);
            black_box(FrameCodec::encode_headers_frame(&frame));
        });
    });

    for size in [1024usize, DEFAULT_MAX_FRAME_SIZE as usize] {
        let data = Bytes::from(vec![0u8; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("data_frame", size), &data, |b, data| {
            b.iter(|| {
                let frame = DataFrame::new(3, data.clone(), false);
                black_box(FrameCodec::encode_data_frame(&frame));
            });
        });
    }

    group.finish();
}

fn bench_header_block(c: &mut Criterion) {
    let request = H2Request::get("example.test:8080", "/index.html").header("accept", "*/*");

    c.bench_function("hpack_request_block", |b| {
        b.iter(|| {
            let mut encoder = hpack::Encoder::new();
            let fields = black_box(&request).header_fields();
            black_box(encoder.encode(fields.iter().map(|(n, v)| (n.as_bytes(), v.as_bytes()))));
        });
    });
}

criterion_group! {
    name = codec;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(500);
    targets =
        bench_settings,
        bench_upgrade_request,
        bench_frame_encoding,
        bench_header_block
}

criterion_main!(codec);
