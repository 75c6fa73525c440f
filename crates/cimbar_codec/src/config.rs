//! Tuning options for the camera decode paths.
//!
//! The lossless (pixel-perfect) decode path ignores all of these; they only
//! shape how a noisy photographic capture is sampled and matched.

use serde::{Deserialize, Serialize};

/// Immutable tuning configuration consumed by the camera decode pipeline.
///
/// A `Tuning` is built once per session and never mutated afterwards. The
/// defaults are the values the pipeline was calibrated with; overriding them
/// is only useful when diagnosing a specific capture setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
	/// Camera-path symbol detection threshold: a corner sample reads as a
	/// set bit when its luma exceeds `center_luma * symbol_threshold`.
	///
	/// The lossless path does not use this; it keeps the legacy
	/// `center / 2 + 20` rule so dark foreground colors still round-trip.
	pub symbol_threshold: f32,

	/// Apply Von Kries adaptation from the finder white samples before
	/// color matching.
	pub enable_white_balance: bool,

	/// Match colors by channel differences of a brightness-normalized
	/// triple instead of raw weighted RGB distance.
	pub use_relative_color: bool,

	/// Sample-point position inside a cell, as a fraction of the cell size.
	pub quadrant_offset: f32,

	/// Enable the two-pass decode: average-hash symbol detection with
	/// drift tracking, then colors at drift-corrected centers.
	pub use_hash_detection: bool,

	/// Use CIELAB distance as the primary color match. The pipeline retries
	/// with LAB on quality-gate failure regardless of this flag; setting it
	/// just skips the first pass in the configured mode.
	pub use_lab_color: bool,
}

impl Default for Tuning {
	fn default() -> Self {
		Self {
			symbol_threshold: 0.85,
			enable_white_balance: true,
			use_relative_color: true,
			quadrant_offset: 0.28,
			use_hash_detection: true,
			use_lab_color: false,
		}
	}
}
