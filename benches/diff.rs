//! Benchmarks for the difference engine and the sequence alignments it is built on.

extern crate dotlayout;

#[path = "../src/test/image.rs"]
#[allow(dead_code)]
mod image;

use criterion::{criterion_group, criterion_main, Criterion};
use dotlayout::{
    diff::{list_diff, sorted_diff},
    ByteBuffer, Tree,
};
use image::ImageBuilder;
use std::hint::black_box;

fn image(methods: usize) -> Tree {
    let data = (0..methods)
        .fold(ImageBuilder::sample(), |builder, index| {
            builder.tiny_method(&format!("M{index:04}"), &[0x00, 0x2A])
        })
        .build();
    dotlayout::parse(ByteBuffer::from_mem(data)).unwrap()
}

/// Benchmark diffing a tree against an identical copy.
fn bench_diff_identical(c: &mut Criterion) {
    let left = image(500);
    let right = image(500);

    c.bench_function("diff_identical", |b| {
        b.iter(|| black_box(dotlayout::diff(black_box(&left), black_box(&right))));
    });
}

/// Benchmark diffing trees where one method was inserted, shifting everything after it.
fn bench_diff_inserted_method(c: &mut Criterion) {
    let left = image(500);
    let right = image(501);

    c.bench_function("diff_inserted_method", |b| {
        b.iter(|| black_box(dotlayout::diff(black_box(&left), black_box(&right))));
    });
}

/// Benchmark the LCS alignment with a scattered middle part.
fn bench_list_diff(c: &mut Criterion) {
    let source: Vec<u32> = (0..2000).collect();
    let destination: Vec<u32> = (0..2000).filter(|v| v % 7 != 3).chain(5000..5100).collect();

    c.bench_function("list_diff_2000", |b| {
        b.iter(|| {
            black_box(list_diff(
                black_box(&source),
                black_box(&destination),
                |l, r| l == r,
                usize::MAX,
            ))
        });
    });
}

/// Benchmark the two-pointer merge.
fn bench_sorted_diff(c: &mut Criterion) {
    let left: Vec<u32> = (0..100_000).step_by(2).collect();
    let right: Vec<u32> = (0..100_000).step_by(3).collect();

    c.bench_function("sorted_diff_100k", |b| {
        b.iter(|| black_box(sorted_diff(&left, &right, |l, r| l.cmp(r)).count()));
    });
}

criterion_group!(
    benches,
    bench_diff_identical,
    bench_diff_inserted_method,
    bench_list_diff,
    bench_sorted_diff
);
criterion_main!(benches);
