//! Average-hash symbol detection with drift tracking.
//!
//! Every symbol renders to a distinctive dot arrangement; binarizing an
//! 8x8 luma patch against its own mean gives a 64-bit fingerprint that is
//! invariant to the foreground color and to uniform lighting changes.
//! During a scan, the best-matching sample position of each cell feeds a
//! running drift vector that tracks the slow positional error a perspective
//! warp leaves behind.

use std::sync::OnceLock;

use crate::bitmap::Bitmap;
use crate::frame::{CELL_SIZE, symbol_tile};

/// Maximum Hamming distance a match may have and still be trusted.
pub(crate) const NOISE_TOLERANCE: u32 = 20;

/// Required Hamming gap between the best and second-best symbol before a
/// drift candidate is adopted.
pub(crate) const MATCH_MARGIN: u32 = 2;

/// Drift clamp per axis, in pixels.
pub(crate) const DRIFT_LIMIT: i32 = 15;

/// Accumulated sample-point offset, updated cell by cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Drift {
	pub x: i32,
	pub y: i32,
}

impl Drift {
	/// Shifts the drift by a per-cell correction, clamped to the limit.
	pub fn nudge(self, dx: i32, dy: i32) -> Drift {
		Drift {
			x: (self.x + dx).clamp(-DRIFT_LIMIT, DRIFT_LIMIT),
			y: (self.y + dy).clamp(-DRIFT_LIMIT, DRIFT_LIMIT),
		}
	}
}

/// The 16 reference hashes, one per symbol.
#[derive(Debug)]
pub(crate) struct SymbolHashes {
	refs: [u64; 16],
}

/// The process-wide reference set; rendered once, immutable afterwards.
pub(crate) fn reference_hashes() -> &'static SymbolHashes {
	static HASHES: OnceLock<SymbolHashes> = OnceLock::new();
	HASHES.get_or_init(SymbolHashes::new)
}

impl SymbolHashes {
	/// Renders each symbol tile and hashes it.
	fn new() -> Self {
		let refs = std::array::from_fn(|symbol| {
			let tile = symbol_tile(symbol as u8);
			tile_hash(&tile, 0, 0)
		});
		Self {
			refs,
		}
	}

	/// Best and second-best symbol for a cell hash, by Hamming distance.
	pub fn classify(&self, hash: u64) -> HashMatch {
		let mut best = 0u8;
		let mut best_dist = u32::MAX;
		let mut second_dist = u32::MAX;
		for (symbol, &reference) in self.refs.iter().enumerate() {
			let dist = (hash ^ reference).count_ones();
			if dist < best_dist {
				second_dist = best_dist;
				best_dist = dist;
				best = symbol as u8;
			} else if dist < second_dist {
				second_dist = dist;
			}
		}
		HashMatch {
			symbol: best,
			distance: best_dist,
			margin: second_dist - best_dist,
		}
	}
}

/// Outcome of matching one cell hash against the reference set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HashMatch {
	pub symbol: u8,
	pub distance: u32,
	pub margin: u32,
}

/// Average hash of the 8x8 luma patch at `(x0, y0)`.
///
/// Bits are row-major from the most significant end; a bit is set when its
/// pixel is at least as bright as the patch mean, so a flat patch hashes
/// to all ones just like the dotless reference tile.
pub(crate) fn tile_hash(bmp: &Bitmap, x0: i32, y0: i32) -> u64 {
	let mut luma = [0u32; CELL_SIZE * CELL_SIZE];
	let mut sum = 0u32;
	for dy in 0..CELL_SIZE {
		for dx in 0..CELL_SIZE {
			let x = x0 + dx as i32;
			let y = y0 + dy as i32;
			let l = if bmp.contains(i64::from(x), i64::from(y)) {
				u32::from(bmp.luma(x as usize, y as usize))
			} else {
				0
			};
			luma[dy * CELL_SIZE + dx] = l;
			sum += l;
		}
	}

	let mean = sum / (CELL_SIZE * CELL_SIZE) as u32;
	let mut hash = 0u64;
	for &l in &luma {
		hash = (hash << 1) | u64::from(l >= mean);
	}
	hash
}
