//! Benchmark suite for frame and RS block decoding
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml
//!
//! For flamegraph profiling:
//! cargo bench --manifest-path benches/Cargo.toml -- --profile-time=5

use cimbar_benches::{corrupted_codeword, rendered_frame};
use cimbar_codec::frame::{FrameSize, decode_frame, rs_decode_frame};
use cimbar_codec::rs;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Benchmark RS block decode, clean and at increasing error counts
fn bench_rs_decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("rs_decode");
	group.throughput(Throughput::Bytes(rs::BLOCK_TOTAL as u64));

	for errors in [0usize, 8, 32] {
		let codeword = corrupted_codeword(errors);
		group.bench_with_input(BenchmarkId::new("errors", errors), &codeword, |b, codeword| {
			b.iter(|| {
				let mut word = codeword.clone();
				let result = rs::decode(black_box(&mut word));
				black_box(result)
			});
		});
	}

	group.finish();
}

/// Benchmark the pixel-perfect cell raster decode per frame size
fn bench_frame_decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("frame_decode");

	for size in FrameSize::ALL {
		let frame = rendered_frame(size);
		group.throughput(Throughput::Elements(size.usable_cells() as u64));
		group.bench_with_input(
			BenchmarkId::new("cells", size.pixels()),
			&frame,
			|b, frame| {
				b.iter(|| {
					let raw = decode_frame(black_box(frame), size).unwrap();
					black_box(raw)
				});
			},
		);
	}

	group.finish();
}

/// Benchmark the full raw-to-data path: de-interleave plus RS
fn bench_rs_decode_frame(c: &mut Criterion) {
	let mut group = c.benchmark_group("rs_decode_frame");

	for size in [FrameSize::S128, FrameSize::S256] {
		let frame = rendered_frame(size);
		let raw = decode_frame(&frame, size).unwrap();
		group.throughput(Throughput::Bytes(size.raw_bytes() as u64));
		group.bench_with_input(BenchmarkId::new("raw", size.pixels()), &raw, |b, raw| {
			b.iter(|| {
				let data = rs_decode_frame(black_box(raw), size);
				black_box(data)
			});
		});
	}

	group.finish();
}

criterion_group!(benches, bench_rs_decode, bench_frame_decode, bench_rs_decode_frame);
criterion_main!(benches);
