//! Perspective correction: maps a detected quadrilateral onto the
//! canonical frame square.
//!
//! Homographies are built in the destination-to-source direction so the
//! sampling loop needs no matrix inversion. Sampling is nearest neighbor
//! with `floor()`; rounding would bias every sample by half a pixel and
//! misalign the 8-pixel cell grid, and bilinear filtering would blur the
//! cell boundaries the symbol detector depends on.

use crate::bitmap::Bitmap;
use crate::error::CimbarError;
use crate::frame::{CELL_SIZE, FINDER_SPAN, FrameSize};

/// A point in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
	/// Horizontal coordinate in pixels.
	pub x: f64,
	/// Vertical coordinate in pixels.
	pub y: f64,
}

impl Point {
	/// Creates a point.
	pub const fn new(x: f64, y: f64) -> Self {
		Self {
			x,
			y,
		}
	}

	fn add(self, other: Point) -> Point {
		Point::new(self.x + other.x, self.y + other.y)
	}

	fn sub(self, other: Point) -> Point {
		Point::new(self.x - other.x, self.y - other.y)
	}

	fn scale(self, s: f64) -> Point {
		Point::new(self.x * s, self.y * s)
	}
}

/// A 3x3 projective map from canonical frame coordinates to source-image
/// coordinates.
#[derive(Debug, Clone)]
pub struct Homography {
	m: [f64; 9],
}

impl Homography {
	/// Builds the map sending each destination corner to the matching
	/// source corner.
	pub fn quad_to_quad(dst: [Point; 4], src: [Point; 4]) -> Result<Self, CimbarError> {
		// Direct linear transform with h33 fixed to 1: two equations per
		// correspondence, eight unknowns.
		let mut system = [[0f64; 9]; 8];
		for (i, (d, s)) in dst.iter().zip(src.iter()).enumerate() {
			system[2 * i] = [d.x, d.y, 1.0, 0.0, 0.0, 0.0, -s.x * d.x, -s.x * d.y, s.x];
			system[2 * i + 1] = [0.0, 0.0, 0.0, d.x, d.y, 1.0, -s.y * d.x, -s.y * d.y, s.y];
		}

		let h = solve8(&mut system)?;
		Ok(Self {
			m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
		})
	}

	/// Builds the 4-point map for a frame whose four finder centers are
	/// known.
	///
	/// The finder centers sit 1.5 cells inside the frame edges; the outer
	/// frame corners are extrapolated along the TL->TR and TL->BL axes
	/// before solving, so the canonical square maps edge to edge.
	pub fn four_point(
		tl: Point,
		tr: Point,
		bl: Point,
		br: Point,
		size: FrameSize,
	) -> Result<Self, CimbarError> {
		// Finder centers are (cols - 3) cells apart along each axis.
		let cells_between = (size.cols() - FINDER_SPAN) as f64;
		let half_span = FINDER_SPAN as f64 / 2.0;

		let x_axis = tr.sub(tl).scale(1.0 / cells_between);
		let y_axis = bl.sub(tl).scale(1.0 / cells_between);
		let out = |p: Point, sx: f64, sy: f64| {
			p.add(x_axis.scale(sx * half_span)).add(y_axis.scale(sy * half_span))
		};

		let pixels = size.pixels() as f64;
		let dst = [
			Point::new(0.0, 0.0),
			Point::new(pixels, 0.0),
			Point::new(0.0, pixels),
			Point::new(pixels, pixels),
		];
		let src = [out(tl, -1.0, -1.0), out(tr, 1.0, -1.0), out(bl, -1.0, 1.0), out(br, 1.0, 1.0)];
		Self::quad_to_quad(dst, src)
	}

	/// Builds the 2-point fallback map from the TL and BR finder centers
	/// alone, assuming a square, unsheared barcode.
	pub fn two_point(tl: Point, br: Point, size: FrameSize) -> Result<Self, CimbarError> {
		let diag = br.sub(tl);
		let len = (diag.x * diag.x + diag.y * diag.y).sqrt();
		if len < f64::EPSILON {
			return Err(CimbarError::WarpDegenerate);
		}

		// Unit axes of the barcode: the diagonal rotated by +-45 degrees.
		let norm = len / std::f64::consts::SQRT_2;
		let u_x = Point::new((diag.x + diag.y) / (2.0 * norm), (diag.y - diag.x) / (2.0 * norm));
		let u_y = Point::new(-(diag.y - diag.x) / (2.0 * norm), (diag.x + diag.y) / (2.0 * norm));

		// Source pixels per canonical pixel.
		let cells_between = (size.cols() - FINDER_SPAN) as f64;
		let cell_src = norm / cells_between;
		let scale = cell_src / CELL_SIZE as f64;

		// Canonical position of the TL finder center.
		let anchor = (FINDER_SPAN as f64 / 2.0) * CELL_SIZE as f64;

		// Affine map: src = tl + u_x * (dx - anchor) * scale
		//                     + u_y * (dy - anchor) * scale.
		let a = u_x.scale(scale);
		let b = u_y.scale(scale);
		let origin = tl.sub(a.scale(anchor)).sub(b.scale(anchor));
		Ok(Self {
			m: [a.x, b.x, origin.x, a.y, b.y, origin.y, 0.0, 0.0, 1.0],
		})
	}

	/// Maps a destination point to source coordinates.
	pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
		let m = &self.m;
		let w = m[6] * x + m[7] * y + m[8];
		let sx = (m[0] * x + m[1] * y + m[2]) / w;
		let sy = (m[3] * x + m[4] * y + m[5]) / w;
		(sx, sy)
	}

	/// Resamples the source bitmap onto a `pixels x pixels` canonical
	/// square.
	pub fn warp(&self, src: &Bitmap, pixels: usize) -> Bitmap {
		let mut out = Bitmap::filled(pixels, pixels, [0, 0, 0]);
		for y in 0..pixels {
			for x in 0..pixels {
				// Sample at the pixel center so floor() lands inside the
				// matching source pixel instead of one to its upper left.
				let (sx, sy) = self.apply(x as f64 + 0.5, y as f64 + 0.5);
				let (ix, iy) = (sx.floor() as i64, sy.floor() as i64);
				if src.contains(ix, iy) {
					out.set_rgb(x, y, src.rgb(ix as usize, iy as usize));
				}
			}
		}
		out
	}
}

/// Gaussian elimination with partial pivoting on an 8x9 augmented system.
fn solve8(system: &mut [[f64; 9]; 8]) -> Result<[f64; 8], CimbarError> {
	const EPS: f64 = 1e-9;

	for col in 0..8 {
		let pivot = (col..8)
			.max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
			.unwrap_or(col);
		if system[pivot][col].abs() < EPS {
			return Err(CimbarError::WarpDegenerate);
		}
		system.swap(col, pivot);

		let lead = system[col][col];
		for k in col..9 {
			system[col][k] /= lead;
		}
		for row in 0..8 {
			if row == col {
				continue;
			}
			let factor = system[row][col];
			if factor == 0.0 {
				continue;
			}
			for k in col..9 {
				system[row][k] -= factor * system[col][k];
			}
		}
	}

	let mut solution = [0f64; 8];
	for (i, row) in system.iter().enumerate() {
		solution[i] = row[8];
	}
	Ok(solution)
}

/// Nearest-neighbor resize onto the canonical square, for the no-warp
/// fallback strategy.
pub fn resize_nearest(src: &Bitmap, pixels: usize) -> Bitmap {
	let mut out = Bitmap::filled(pixels, pixels, [0, 0, 0]);
	let sx = src.width() as f64 / pixels as f64;
	let sy = src.height() as f64 / pixels as f64;
	for y in 0..pixels {
		for x in 0..pixels {
			let ix = ((x as f64 + 0.5) * sx).floor() as usize;
			let iy = ((y as f64 + 0.5) * sy).floor() as usize;
			out.set_rgb(x, y, src.rgb(ix.min(src.width() - 1), iy.min(src.height() - 1)));
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_identity_quad() {
		let quad = [
			Point::new(0.0, 0.0),
			Point::new(100.0, 0.0),
			Point::new(0.0, 100.0),
			Point::new(100.0, 100.0),
		];
		let h = Homography::quad_to_quad(quad, quad).unwrap();
		let (x, y) = h.apply(37.0, 59.0);
		assert!((x - 37.0).abs() < 1e-6);
		assert!((y - 59.0).abs() < 1e-6);
	}

	#[test]
	fn test_translation_quad() {
		let dst = [
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
			Point::new(0.0, 10.0),
			Point::new(10.0, 10.0),
		];
		let src = [
			Point::new(5.0, 7.0),
			Point::new(15.0, 7.0),
			Point::new(5.0, 17.0),
			Point::new(15.0, 17.0),
		];
		let h = Homography::quad_to_quad(dst, src).unwrap();
		let (x, y) = h.apply(2.0, 3.0);
		assert!((x - 7.0).abs() < 1e-6);
		assert!((y - 10.0).abs() < 1e-6);
	}

	#[test]
	fn test_degenerate_quad_rejected() {
		// All four source points collinear: the system is singular.
		let dst = [
			Point::new(0.0, 0.0),
			Point::new(10.0, 0.0),
			Point::new(0.0, 10.0),
			Point::new(10.0, 10.0),
		];
		let src = [
			Point::new(0.0, 0.0),
			Point::new(1.0, 1.0),
			Point::new(2.0, 2.0),
			Point::new(3.0, 3.0),
		];
		assert!(Homography::quad_to_quad(dst, src).is_err());
	}

	#[test]
	fn test_four_point_identity_on_canonical_frame() {
		// Finder centers of an unwarped 256 frame map the canonical square
		// onto itself.
		let size = FrameSize::S256;
		let c = 12.0;
		let far = 256.0 - 12.0;
		let h = Homography::four_point(
			Point::new(c, c),
			Point::new(far, c),
			Point::new(c, far),
			Point::new(far, far),
			size,
		)
		.unwrap();

		for (x, y) in [(0.0, 0.0), (128.0, 64.0), (255.0, 255.0)] {
			let (sx, sy) = h.apply(x, y);
			assert!((sx - x).abs() < 1e-6, "x: {sx} vs {x}");
			assert!((sy - y).abs() < 1e-6, "y: {sy} vs {y}");
		}
	}

	#[test]
	fn test_two_point_identity_on_canonical_frame() {
		let size = FrameSize::S256;
		let h =
			Homography::two_point(Point::new(12.0, 12.0), Point::new(244.0, 244.0), size).unwrap();

		for (x, y) in [(12.0, 12.0), (244.0, 244.0), (0.0, 0.0), (100.0, 30.0)] {
			let (sx, sy) = h.apply(x, y);
			assert!((sx - x).abs() < 1e-6, "x: {sx} vs {x}");
			assert!((sy - y).abs() < 1e-6, "y: {sy} vs {y}");
		}
	}

	#[test]
	fn test_warp_identity_preserves_cell_grid() {
		// floor() sampling through an identity homography must return the
		// source image byte for byte; any half-pixel bias would shift it.
		let mut src = Bitmap::filled(64, 64, [0, 0, 0]);
		for y in 0..64 {
			for x in 0..64 {
				if (x / 8 + y / 8) % 2 == 0 {
					src.set_rgb(x, y, [200, 10, 10]);
				}
			}
		}

		let quad = [
			Point::new(0.0, 0.0),
			Point::new(64.0, 0.0),
			Point::new(0.0, 64.0),
			Point::new(64.0, 64.0),
		];
		let h = Homography::quad_to_quad(quad, quad).unwrap();
		let out = h.warp(&src, 64);
		assert_eq!(out, src);
	}

	#[test]
	fn test_warp_out_of_bounds_is_black() {
		let src = Bitmap::filled(8, 8, [255, 255, 255]);
		let h = Homography::two_point(Point::new(100.0, 100.0), Point::new(200.0, 200.0), FrameSize::S128)
			.unwrap();
		let out = h.warp(&src, 128);
		assert_eq!(out.rgb(64, 64), [0, 0, 0]);
	}

	#[test]
	fn test_resize_nearest_halves() {
		let mut src = Bitmap::filled(16, 16, [0, 0, 0]);
		src.fill_rect(8, 0, 8, 16, [255, 255, 255]);
		let out = resize_nearest(&src, 8);
		assert_eq!(out.rgb(0, 0), [0, 0, 0]);
		assert_eq!(out.rgb(7, 7), [255, 255, 255]);
	}
}
