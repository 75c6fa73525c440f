//! Color matching modes for camera captures.
//!
//! Raw weighted RGB distance is the baseline. Relative matching compares
//! brightness-normalized channel differences, which survives uneven
//! exposure much better. CIELAB is the expensive last resort the strategy
//! chain falls back to when a whole frame fails the quality gate.

use std::sync::OnceLock;

use crate::frame::palette::{COLOR_COUNT, PALETTE};

use crate::frame::nearest_palette_index;

/// Closed set of color matching modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
	/// Weighted squared distance on raw RGB.
	Rgb,
	/// Channel differences of a brightness-normalized triple.
	Relative,
	/// CIE ΔE76 distance in LAB space.
	Lab,
}

/// Matches a sampled pixel to the nearest palette index under the given
/// mode.
pub fn match_color(mode: ColorMode, r: u8, g: u8, b: u8) -> u8 {
	match mode {
		ColorMode::Rgb => nearest_palette_index(r, g, b),
		ColorMode::Relative => relative_match(r, g, b),
		ColorMode::Lab => lab_match(r, g, b),
	}
}

/// Channel-difference triple of a brightness-normalized color.
///
/// The denominator is clamped below by 48 so near-black pixels do not
/// explode the differences, and by 1 so a perfectly gray pixel stays
/// finite (its differences are all zero anyway).
fn relative_triple(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
	let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
	let max = r.max(g).max(b);
	let min = r.min(g).min(b);
	let range = (max.max(48.0) - min).max(1.0);
	((r - g) / range, (g - b) / range, (b - r) / range)
}

fn relative_match(r: u8, g: u8, b: u8) -> u8 {
	static REFERENCE: OnceLock<[(f32, f32, f32); COLOR_COUNT]> = OnceLock::new();
	let reference = REFERENCE.get_or_init(|| {
		std::array::from_fn(|i| {
			let c = PALETTE[i];
			relative_triple(c.r, c.g, c.b)
		})
	});

	let probe = relative_triple(r, g, b);
	let mut best = 0u8;
	let mut best_dist = f32::MAX;
	for (i, refc) in reference.iter().enumerate() {
		let d0 = probe.0 - refc.0;
		let d1 = probe.1 - refc.1;
		let d2 = probe.2 - refc.2;
		let dist = d0 * d0 + d1 * d1 + d2 * d2;
		if dist < best_dist {
			best_dist = dist;
			best = i as u8;
		}
	}
	best
}

/// sRGB to CIELAB, D65 white point.
pub(crate) fn rgb_to_lab(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
	fn linearize(c: u8) -> f32 {
		let c = f32::from(c) / 255.0;
		if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
	}

	let rl = linearize(r);
	let gl = linearize(g);
	let bl = linearize(b);

	// sRGB -> XYZ, scaled to the D65 reference white.
	let x = (0.4124 * rl + 0.3576 * gl + 0.1805 * bl) / 0.95047;
	let y = 0.2126 * rl + 0.7152 * gl + 0.0722 * bl;
	let z = (0.0193 * rl + 0.1192 * gl + 0.9505 * bl) / 1.08883;

	fn f(t: f32) -> f32 {
		if t > 0.008856 { t.cbrt() } else { 7.787 * t + 16.0 / 116.0 }
	}

	let fx = f(x);
	let fy = f(y);
	let fz = f(z);
	(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn lab_match(r: u8, g: u8, b: u8) -> u8 {
	static REFERENCE: OnceLock<[(f32, f32, f32); COLOR_COUNT]> = OnceLock::new();
	let reference = REFERENCE.get_or_init(|| {
		std::array::from_fn(|i| {
			let c = PALETTE[i];
			rgb_to_lab(c.r, c.g, c.b)
		})
	});

	let probe = rgb_to_lab(r, g, b);
	let mut best = 0u8;
	let mut best_dist = f32::MAX;
	for (i, refc) in reference.iter().enumerate() {
		let dl = probe.0 - refc.0;
		let da = probe.1 - refc.1;
		let db = probe.2 - refc.2;
		let dist = dl * dl + da * da + db * db;
		if dist < best_dist {
			best_dist = dist;
			best = i as u8;
		}
	}
	best
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_each_mode_self_maps_palette() {
		for mode in [ColorMode::Rgb, ColorMode::Relative, ColorMode::Lab] {
			for (i, c) in PALETTE.iter().enumerate() {
				assert_eq!(
					match_color(mode, c.r, c.g, c.b),
					i as u8,
					"mode {mode:?} palette {i}"
				);
			}
		}
	}

	#[test]
	fn test_relative_survives_dimming() {
		// Uniform dimming keeps channel ratios; relative matching should
		// still find the right entry where raw RGB drifts.
		for (i, c) in PALETTE.iter().enumerate() {
			let dim = |v: u8| (u32::from(v) * 60 / 100) as u8;
			assert_eq!(
				match_color(ColorMode::Relative, dim(c.r), dim(c.g), dim(c.b)),
				i as u8,
				"palette {i}"
			);
		}
	}

	#[test]
	fn test_lab_white_point() {
		let (l, a, b) = rgb_to_lab(255, 255, 255);
		assert!((l - 100.0).abs() < 0.5, "L={l}");
		assert!(a.abs() < 0.5 && b.abs() < 0.5, "a={a} b={b}");

		let (l, _, _) = rgb_to_lab(0, 0, 0);
		assert!(l.abs() < 0.5, "L={l}");
	}
}
