//! Benchmarks for whole-image parsing.
//!
//! - A minimal image (headers, metadata root, one `Module` row)
//! - The sample image with method bodies, field data, resources and an embedded PDB
//! - A large image with a thousand method bodies
//! - Coverage verification of a parsed tree

extern crate dotlayout;

#[path = "../src/test/image.rs"]
#[allow(dead_code)]
mod image;

use criterion::{criterion_group, criterion_main, Criterion};
use dotlayout::{ByteBuffer, ParseConfig};
use image::ImageBuilder;
use std::hint::black_box;

fn large_image() -> Vec<u8> {
    (0..1000)
        .fold(ImageBuilder::new(), |builder, index| {
            builder.tiny_method(&format!("M{index:04}"), &[0x00, 0x00, 0x2A])
        })
        .build()
}

/// Benchmark parsing the smallest complete image.
fn bench_parse_minimal(c: &mut Criterion) {
    let data = ImageBuilder::new().build();

    c.bench_function("parse_minimal", |b| {
        b.iter(|| {
            let tree = dotlayout::parse(ByteBuffer::from_mem(black_box(data.clone()))).unwrap();
            black_box(tree)
        });
    });
}

/// Benchmark parsing an image that exercises every decoder.
fn bench_parse_sample(c: &mut Criterion) {
    let data = ImageBuilder::sample().build();

    c.bench_function("parse_sample", |b| {
        b.iter(|| {
            let tree = dotlayout::parse(ByteBuffer::from_mem(black_box(data.clone()))).unwrap();
            black_box(tree)
        });
    });
}

/// Benchmark parsing many cross-referenced method bodies.
fn bench_parse_large(c: &mut Criterion) {
    let data = large_image();

    c.bench_function("parse_large", |b| {
        b.iter(|| {
            let tree = dotlayout::parse(ByteBuffer::from_mem(black_box(data.clone()))).unwrap();
            black_box(tree)
        });
    });

    c.bench_function("parse_large_headers_only", |b| {
        b.iter(|| {
            let tree = dotlayout::parse_with(
                ByteBuffer::from_mem(black_box(data.clone())),
                ParseConfig::headers_only(),
            )
            .unwrap();
            black_box(tree)
        });
    });
}

/// Benchmark the leaf coverage check.
fn bench_check_coverage(c: &mut Criterion) {
    let tree = dotlayout::parse(ByteBuffer::from_mem(large_image())).unwrap();

    c.bench_function("check_coverage_large", |b| {
        b.iter(|| black_box(tree.check_coverage()));
    });
}

criterion_group!(
    benches,
    bench_parse_minimal,
    bench_parse_sample,
    bench_parse_large,
    bench_check_coverage
);
criterion_main!(benches);
