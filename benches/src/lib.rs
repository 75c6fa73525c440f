//! Benchmark helper utilities for cimbar-rs
//!
//! Synthetic workloads only: a rendered frame is deterministic from its
//! payload, so there is no test-data directory to keep in sync.

use cimbar_codec::frame::{FrameSize, render_frame};
use cimbar_codec::{Bitmap, rs};

/// Deterministic pseudo-payload filling one frame.
pub fn frame_payload(size: FrameSize) -> Vec<u8> {
	(0..size.data_bytes()).map(|i| ((i * 131 + 17) % 256) as u8).collect()
}

/// Renders a full frame for decode benchmarks.
pub fn rendered_frame(size: FrameSize) -> Bitmap {
	render_frame(&frame_payload(size), size)
}

/// A full RS codeword with the given number of byte errors sprinkled at
/// fixed positions.
pub fn corrupted_codeword(errors: usize) -> Vec<u8> {
	let message: Vec<u8> = (0..rs::BLOCK_DATA).map(|i| (i * 7) as u8).collect();
	let mut codeword = rs::encode(&message);
	for k in 0..errors {
		// Spread positions over the whole block, co-prime stride.
		let position = (k * 53 + 11) % codeword.len();
		codeword[position] ^= 0x3C;
	}
	codeword
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_corrupted_codeword_is_repairable() {
		let mut codeword = corrupted_codeword(16);
		assert_eq!(rs::decode(&mut codeword).unwrap(), 16);
	}

	#[test]
	fn test_rendered_frame_dimensions() {
		let frame = rendered_frame(FrameSize::S256);
		assert_eq!(frame.width(), 256);
	}
}
