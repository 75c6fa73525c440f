//! Camera decode pipeline: strategy chain, two-pass cell sampling, quality
//! gate.
//!
//! A located photo runs through a closed chain of rectification strategies
//! (4-point warp, 2-point warp, crop + resize). Each canonical image is
//! white-balanced, sampled cell by cell and RS-decoded; a frame whose
//! leading data bytes are all zero failed every leading RS block and is
//! rejected by the quality gate, advancing the chain. When the whole chain
//! fails in the configured color mode, it runs once more with CIELAB
//! matching before giving up.

mod color;
mod hash;
mod white_balance;

pub use color::ColorMode;
pub(crate) use color::match_color;

use log::debug;

use crate::bitmap::Bitmap;
use crate::config::Tuning;
use crate::error::CimbarError;
use crate::frame::{
	CELL_SIZE, FrameSize, LENGTH_PREFIX, WIRE_MAGIC, raw_from_cells, rs_decode_frame,
	usable_cells,
};
use crate::locate::{Corners, LocateResult, locate};
use crate::warp::{Homography, resize_nearest};

use hash::{Drift, MATCH_MARGIN, NOISE_TOLERANCE, reference_hashes, tile_hash};
use white_balance::apply_white_balance;

/// Width of the quality-gate window: decoded frames whose first 64 data
/// bytes are all zero are rejected.
const GATE_WINDOW: usize = 64;

/// Closed set of rectification strategies, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
	/// Full homography from all four finder centers.
	FourPointWarp,
	/// Similarity transform from the TL and BR centers alone.
	TwoPointWarp,
	/// No geometry at all: resize the located crop.
	CropResize,
}

impl Strategy {
	const CHAIN: [Strategy; 3] =
		[Strategy::FourPointWarp, Strategy::TwoPointWarp, Strategy::CropResize];

	/// Produces the canonical square for this strategy, or `None` when the
	/// required finders are missing or the geometry is degenerate.
	fn attempt(self, bmp: &Bitmap, located: &LocateResult, size: FrameSize) -> Option<Bitmap> {
		match self {
			Strategy::FourPointWarp => {
				let Some(Corners {
					tl,
					tr: Some(tr),
					bl: Some(bl),
					br,
				}) = located.corners
				else {
					return None;
				};
				let h = Homography::four_point(tl, tr, bl, br, size).ok()?;
				Some(h.warp(bmp, size.pixels()))
			}
			Strategy::TwoPointWarp => {
				let corners = located.corners?;
				let h = Homography::two_point(corners.tl, corners.br, size).ok()?;
				Some(h.warp(bmp, size.pixels()))
			}
			Strategy::CropResize => Some(resize_nearest(&located.cropped, size.pixels())),
		}
	}
}

/// Decodes a single-frame photo into its encrypted payload.
///
/// Tries every frame size; on the first frame that passes the quality
/// gate, validates the length prefix and wire magic and slices the payload
/// out of the RS output.
pub fn decode_photo(bmp: &Bitmap, tuning: &Tuning) -> Result<Vec<u8>, CimbarError> {
	let located = locate(bmp);

	let mut attempts = 0usize;
	for size in FrameSize::ALL {
		attempts += 1;
		let Ok(data) = decode_camera_frame(bmp, &located, tuning, size) else {
			continue;
		};

		let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
		let capacity = (size.data_bytes() - LENGTH_PREFIX) as u32;
		if length < 32 || length > capacity || data[4..8] != WIRE_MAGIC {
			debug!("{size}: frame decoded but prefix invalid (len {length})");
			return Err(CimbarError::BadLengthPrefix {
				length,
			});
		}
		let end = LENGTH_PREFIX + length as usize;
		return Ok(data[LENGTH_PREFIX..end].to_vec());
	}

	// Without a confirmed finder pair the failure is localization, not
	// decoding.
	if located.corners.is_none() {
		return Err(CimbarError::FinderNotFound {
			found: located.finders_found,
		});
	}
	Err(CimbarError::AllStrategiesFailed {
		attempts,
	})
}

/// Runs the strategy chain for one candidate frame size and returns the
/// RS-decoded frame data (`size.data_bytes()` bytes).
pub(crate) fn decode_camera_frame(
	bmp: &Bitmap,
	located: &LocateResult,
	tuning: &Tuning,
	size: FrameSize,
) -> Result<Vec<u8>, CimbarError> {
	let primary = if tuning.use_lab_color {
		ColorMode::Lab
	} else if tuning.use_relative_color {
		ColorMode::Relative
	} else {
		ColorMode::Rgb
	};

	let mut modes = vec![primary];
	if primary != ColorMode::Lab {
		modes.push(ColorMode::Lab);
	}

	for mode in modes {
		for strategy in Strategy::CHAIN {
			let Some(mut canonical) = strategy.attempt(bmp, located, size) else {
				continue;
			};
			if tuning.enable_white_balance {
				apply_white_balance(&mut canonical, size);
			}

			let values = sample_cells(&canonical, size, tuning, mode);
			let raw = raw_from_cells(&values, size);
			let data = rs_decode_frame(&raw, size);

			let window = GATE_WINDOW.min(data.len());
			if data[..window].iter().all(|&b| b == 0) {
				debug!("{size}/{strategy:?}/{mode:?}: quality gate failed");
				continue;
			}

			debug!("{size}/{strategy:?}/{mode:?}: frame decoded");
			return Ok(data);
		}
	}

	Err(CimbarError::QualityGateFailure)
}

/// Samples every data cell of a canonical frame into 7-bit values.
fn sample_cells(canonical: &Bitmap, size: FrameSize, tuning: &Tuning, mode: ColorMode) -> Vec<u8> {
	if tuning.use_hash_detection {
		sample_cells_two_pass(canonical, size, mode)
	} else {
		sample_cells_single_pass(canonical, size, tuning, mode)
	}
}

/// Two-pass sampling: hash symbols with drift first, then colors at the
/// drift-corrected centers.
fn sample_cells_two_pass(canonical: &Bitmap, size: FrameSize, mode: ColorMode) -> Vec<u8> {
	let hashes = reference_hashes();

	// Pass 1: symbols. Nine candidate positions per cell; adopting one
	// shifts the running drift for everything that follows.
	const NEIGHBORS: [(i32, i32); 9] =
		[(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (1, -1), (-1, 1), (1, 1)];

	let mut drift = Drift::default();
	let mut symbols = Vec::with_capacity(size.usable_cells());
	let mut positions = Vec::with_capacity(size.usable_cells());
	for (cx, cy) in usable_cells(size) {
		let base_x = (cx * CELL_SIZE) as i32;
		let base_y = (cy * CELL_SIZE) as i32;

		// The un-nudged position goes first so ties never move the drift.
		let mut best_offset = (0i32, 0i32);
		let mut best =
			hashes.classify(tile_hash(canonical, base_x + drift.x, base_y + drift.y));
		for (ox, oy) in NEIGHBORS.into_iter().skip(1) {
			let x = base_x + drift.x + ox;
			let y = base_y + drift.y + oy;
			let matched = hashes.classify(tile_hash(canonical, x, y));
			if matched.distance < best.distance {
				best = matched;
				best_offset = (ox, oy);
			}
		}

		if best.distance <= NOISE_TOLERANCE && best.margin >= MATCH_MARGIN {
			drift = drift.nudge(best_offset.0, best_offset.1);
		}
		symbols.push(best.symbol);
		positions.push(drift);
	}

	// Pass 2: colors at the drift-corrected cell centers.
	let mut values = Vec::with_capacity(symbols.len());
	let center = (CELL_SIZE / 2) as i32;
	for (((cx, cy), symbol), cell_drift) in
		usable_cells(size).zip(symbols.iter()).zip(positions.iter())
	{
		let x = (cx * CELL_SIZE) as i32 + cell_drift.x + center;
		let y = (cy * CELL_SIZE) as i32 + cell_drift.y + center;
		let color_index = sample_color(canonical, x, y, mode);
		values.push((color_index << 4) | symbol);
	}
	values
}

/// Single-pass sampling at fixed cell centers, using the camera symbol
/// threshold.
fn sample_cells_single_pass(
	canonical: &Bitmap,
	size: FrameSize,
	tuning: &Tuning,
	mode: ColorMode,
) -> Vec<u8> {
	let inset = ((CELL_SIZE as f32 * tuning.quadrant_offset) as i32).max(1);
	let far = CELL_SIZE as i32 - 1 - inset;
	let corners = [(inset, inset), (far, inset), (inset, far), (far, far)];
	let center = (CELL_SIZE / 2) as i32;

	let mut values = Vec::with_capacity(size.usable_cells());
	for (cx, cy) in usable_cells(size) {
		let base_x = (cx * CELL_SIZE) as i32;
		let base_y = (cy * CELL_SIZE) as i32;

		let color_index = sample_color(canonical, base_x + center, base_y + center, mode);
		let center_luma = f32::from(luma_at(canonical, base_x + center, base_y + center));
		let threshold = center_luma * tuning.symbol_threshold;

		let mut symbol = 0u8;
		for (bit, &(dx, dy)) in corners.iter().enumerate() {
			if f32::from(luma_at(canonical, base_x + dx, base_y + dy)) > threshold {
				symbol |= 1 << (3 - bit);
			}
		}
		values.push((color_index << 4) | symbol);
	}
	values
}

fn luma_at(bmp: &Bitmap, x: i32, y: i32) -> u8 {
	if bmp.contains(i64::from(x), i64::from(y)) { bmp.luma(x as usize, y as usize) } else { 0 }
}

fn sample_color(bmp: &Bitmap, x: i32, y: i32, mode: ColorMode) -> u8 {
	let (x, y) = (
		(x.max(0) as usize).min(bmp.width() - 1),
		(y.max(0) as usize).min(bmp.height() - 1),
	);
	let [r, g, b] = bmp.rgb(x, y);
	match_color(mode, r, g, b)
}
