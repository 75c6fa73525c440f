//! Symbol and finder rendering, plus the shared sample-point geometry.
//!
//! A symbol is the 4-bit half of a cell value, drawn as black corner dots
//! on the foreground fill: bit 3 = top-left, 2 = top-right, 1 = bottom-left,
//! 0 = bottom-right, and a dot marks a *zero* bit. The center pixel is
//! never overwritten; it carries the foreground color for the color
//! detector.

use crate::bitmap::Bitmap;

use super::palette::{Color, FINDER_GRAY, FINDER_WHITE, PALETTE};
use super::{CELL_SIZE, FINDER_SPAN, FrameSize};

/// Dot-center inset from the cell border, for a given cell size.
pub(crate) const fn dot_inset(size: usize) -> usize {
	let q = size * 28 / 100;
	if q == 0 { 1 } else { q }
}

/// Dot half-side for a given cell size.
pub(crate) const fn dot_half(size: usize) -> usize {
	let h = dot_inset(size) * 3 / 4;
	if h == 0 { 1 } else { h }
}

/// Corner sample points of a cell, in symbol bit order (TL, TR, BL, BR).
///
/// Each point falls inside the respective dot when the dot is drawn.
pub(crate) const fn corner_points(size: usize) -> [(usize, usize); 4] {
	let q = dot_inset(size);
	let far = size - 1 - q;
	[(q, q), (far, q), (q, far), (far, far)]
}

/// Draws one data cell: foreground fill, then a dot per zero symbol bit.
pub(crate) fn draw_cell(bmp: &mut Bitmap, x0: usize, y0: usize, color_index: u8, symbol: u8) {
	let fg = PALETTE[(color_index & 7) as usize];
	draw_symbol_tile(bmp, x0, y0, CELL_SIZE, fg, symbol);
}

/// Draws a symbol at an arbitrary tile size with an explicit foreground.
pub(crate) fn draw_symbol_tile(
	bmp: &mut Bitmap,
	x0: usize,
	y0: usize,
	size: usize,
	fg: Color,
	symbol: u8,
) {
	bmp.fill_rect(x0, y0, size, size, fg.to_array());

	let q = dot_inset(size);
	let h = dot_half(size);
	let side = 2 * h;
	let near = q - h;
	let far = size - q - h;

	let corners = [(near, near), (far, near), (near, far), (far, far)];
	for (bit, &(dx, dy)) in corners.iter().enumerate() {
		if symbol & (1 << (3 - bit)) == 0 {
			bmp.fill_rect(x0 + dx, y0 + dy, side, side, [0, 0, 0]);
		}
	}
}

/// Renders a standalone 8x8 white-foreground symbol tile.
///
/// These tiles seed the camera path's reference average hashes; using white
/// keeps the binarization color-agnostic.
pub(crate) fn symbol_tile(symbol: u8) -> Bitmap {
	let mut tile = Bitmap::filled(CELL_SIZE, CELL_SIZE, [0, 0, 0]);
	draw_symbol_tile(&mut tile, 0, 0, CELL_SIZE, FINDER_WHITE, symbol);
	tile
}

/// Draws a 3x3-cell finder pattern whose top-left cell starts at grid cell
/// `(cx, cy)`.
///
/// The outer ring is white and the center cell dark gray. All finders
/// except the top-left one carry a centered white inner dot; the missing
/// dot is what makes orientation recoverable.
pub(crate) fn draw_finder(bmp: &mut Bitmap, cx: usize, cy: usize, inner_dot: bool) {
	let x0 = cx * CELL_SIZE;
	let y0 = cy * CELL_SIZE;
	let span = FINDER_SPAN * CELL_SIZE;
	bmp.fill_rect(x0, y0, span, span, FINDER_WHITE.to_array());

	let gx = x0 + CELL_SIZE;
	let gy = y0 + CELL_SIZE;
	bmp.fill_rect(gx, gy, CELL_SIZE, CELL_SIZE, FINDER_GRAY.to_array());

	if inner_dot {
		let dot = CELL_SIZE / 2;
		let off = (CELL_SIZE - dot) / 2;
		bmp.fill_rect(gx + off, gy + off, dot, dot, FINDER_WHITE.to_array());
	}
}

/// Draws all four finders of a frame. Only the top-left one lacks the
/// inner dot.
pub(crate) fn draw_finders(bmp: &mut Bitmap, size: FrameSize) {
	let far = size.cols() - FINDER_SPAN;
	draw_finder(bmp, 0, 0, false);
	draw_finder(bmp, far, 0, true);
	draw_finder(bmp, 0, far, true);
	draw_finder(bmp, far, far, true);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dot_geometry_at_cell_size() {
		assert_eq!(dot_inset(8), 2);
		assert_eq!(dot_half(8), 1);
		assert_eq!(corner_points(8), [(2, 2), (5, 2), (2, 5), (5, 5)]);
	}

	#[test]
	fn test_center_pixel_keeps_foreground() {
		for symbol in 0..16 {
			let mut bmp = Bitmap::filled(8, 8, [9, 9, 9]);
			draw_cell(&mut bmp, 0, 0, 1, symbol);
			let fg = PALETTE[1];
			assert_eq!(bmp.rgb(4, 4), fg.to_array(), "symbol {symbol}");
		}
	}

	#[test]
	fn test_dots_mark_zero_bits() {
		let mut bmp = Bitmap::filled(8, 8, [9, 9, 9]);
		// Symbol 0b1010: TL set, TR zero, BL set, BR zero.
		draw_cell(&mut bmp, 0, 0, 0, 0b1010);
		let [tl, tr, bl, br] = corner_points(8);
		assert_ne!(bmp.rgb(tl.0, tl.1), [0, 0, 0]);
		assert_eq!(bmp.rgb(tr.0, tr.1), [0, 0, 0]);
		assert_ne!(bmp.rgb(bl.0, bl.1), [0, 0, 0]);
		assert_eq!(bmp.rgb(br.0, br.1), [0, 0, 0]);
	}

	#[test]
	fn test_symbol_15_is_clean_fill() {
		let tile = symbol_tile(15);
		for y in 0..8 {
			for x in 0..8 {
				assert_eq!(tile.rgb(x, y), [255, 255, 255]);
			}
		}
	}

	#[test]
	fn test_finder_center_luma() {
		let mut bmp = Bitmap::filled(64, 64, [0, 0, 0]);
		draw_finder(&mut bmp, 0, 0, false);
		// Center of the middle cell: bare gray.
		assert_eq!(bmp.rgb(12, 12), FINDER_GRAY.to_array());

		draw_finder(&mut bmp, 4, 0, true);
		// With the inner dot the very center turns white again.
		assert_eq!(bmp.rgb(44, 12), FINDER_WHITE.to_array());
		// But the cell corners stay gray.
		assert_eq!(bmp.rgb(41, 9), FINDER_GRAY.to_array());
	}
}
