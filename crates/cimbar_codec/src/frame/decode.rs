//! Lossless frame decoding and the shared RS de-interleave stage.
//!
//! [`decode_frame`] is the pixel-perfect path for frames that arrived over
//! a lossless channel (an animated-image stream): one color sample at the
//! cell center, one symbol read from the corner points. The camera path
//! has its own sampling; both funnel into [`rs_decode_frame`].

use log::warn;

use crate::bitmap::Bitmap;
use crate::error::CimbarError;
use crate::frame::palette::PALETTE;
use crate::rs;

use super::symbol::corner_points;
use super::{CELL_SIZE, FrameSize, deinterleave, raw_from_cells, usable_cells};

/// Nearest palette index by weighted squared RGB distance.
///
/// Green dominates perceived brightness, so its channel counts four-fold
/// and red double against blue.
pub(crate) fn nearest_palette_index(r: u8, g: u8, b: u8) -> u8 {
	let mut best = 0u8;
	let mut best_dist = u32::MAX;
	for (i, color) in PALETTE.iter().enumerate() {
		let dr = i32::from(r) - i32::from(color.r);
		let dg = i32::from(g) - i32::from(color.g);
		let db = i32::from(b) - i32::from(color.b);
		let dist = (2 * dr * dr + 4 * dg * dg + db * db) as u32;
		if dist < best_dist {
			best_dist = dist;
			best = i as u8;
		}
	}
	best
}

/// Reads one cell on the lossless path.
///
/// The symbol threshold is the legacy additive rule `center / 2 + 20`,
/// which keeps dark foreground colors (palette index 7) from misreading
/// their own fill as a dot.
fn read_cell(bmp: &Bitmap, x0: usize, y0: usize) -> (u8, u8) {
	let center = bmp.rgb(x0 + CELL_SIZE / 2, y0 + CELL_SIZE / 2);
	let color_index = nearest_palette_index(center[0], center[1], center[2]);

	let center_luma = u32::from(bmp.luma(x0 + CELL_SIZE / 2, y0 + CELL_SIZE / 2));
	let threshold = center_luma / 2 + 20;

	let mut symbol = 0u8;
	for (bit, &(dx, dy)) in corner_points(CELL_SIZE).iter().enumerate() {
		if u32::from(bmp.luma(x0 + dx, y0 + dy)) > threshold {
			symbol |= 1 << (3 - bit);
		}
	}
	(color_index, symbol)
}

/// Decodes a pixel-perfect frame bitmap into its raw (pre-RS) bytes.
pub fn decode_frame(bmp: &Bitmap, size: FrameSize) -> Result<Vec<u8>, CimbarError> {
	let expected = size.pixels();
	if bmp.width() != expected || bmp.height() != expected {
		return Err(CimbarError::UnsupportedFrameSize {
			size: bmp.width() as u32,
		});
	}

	let mut values = Vec::with_capacity(size.usable_cells());
	for (cx, cy) in usable_cells(size) {
		let (color_index, symbol) = read_cell(bmp, cx * CELL_SIZE, cy * CELL_SIZE);
		values.push((color_index << 4) | symbol);
	}
	Ok(raw_from_cells(&values, size))
}

/// De-interleaves and RS-decodes one frame's raw bytes.
///
/// Always returns exactly `size.data_bytes()` bytes. A block that RS cannot
/// repair contributes zeros; the camera path's quality gate catches frames
/// where that happened to the leading blocks.
pub fn rs_decode_frame(raw: &[u8], size: FrameSize) -> Vec<u8> {
	debug_assert_eq!(raw.len(), size.raw_bytes());

	let sizes = size.block_sizes();
	let mut out = Vec::with_capacity(size.data_bytes());
	for (index, mut block) in deinterleave(raw, &sizes).into_iter().enumerate() {
		let data_len = block.len() - rs::ECC_LEN;
		match rs::decode(&mut block) {
			Ok(_) => out.extend_from_slice(&block[..data_len]),
			Err(err) => {
				warn!("frame block {index}/{} failed: {err}", sizes.len());
				out.resize(out.len() + data_len, 0);
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::super::{encode, render_frame};
	use super::*;

	#[test]
	fn test_symbol_color_exhaustive() {
		// All 128 (color, symbol) pairs drawn at an offset inside a larger
		// canvas must detect back exactly.
		let mut bmp = Bitmap::filled(256, 256, [0, 0, 0]);
		for color in 0..8u8 {
			for symbol in 0..16u8 {
				super::super::symbol::draw_cell(&mut bmp, 64, 64, color, symbol);
				let (c, s) = read_cell(&bmp, 64, 64);
				assert_eq!((c, s), (color, symbol), "color={color} symbol={symbol}");
			}
		}
	}

	#[test]
	fn test_frame_roundtrip_pixel_perfect() {
		for size in [FrameSize::S128, FrameSize::S256] {
			let data: Vec<u8> =
				(0..size.data_bytes()).map(|i| ((i * 7 + 13) % 256) as u8).collect();
			let bmp = render_frame(&data, size);
			let raw = decode_frame(&bmp, size).unwrap();
			assert_eq!(raw.len(), size.raw_bytes(), "{size}");
			assert_eq!(rs_decode_frame(&raw, size), data, "{size}");
		}
	}

	#[test]
	fn test_raw_roundtrip_without_rs() {
		// The cell raster itself is lossless: rendering raw bytes and
		// re-reading them must be the identity before RS even runs.
		let size = FrameSize::S192;
		let data: Vec<u8> = (0..size.data_bytes()).map(|i| (i % 251) as u8).collect();
		let bmp = render_frame(&data, size);

		let raw = decode_frame(&bmp, size).unwrap();
		let mut blocks = Vec::new();
		let mut offset = 0;
		for block_len in size.block_sizes() {
			let data_len = block_len - rs::ECC_LEN;
			blocks.push(crate::rs::encode(&data[offset..offset + data_len]));
			offset += data_len;
		}
		assert_eq!(raw, super::super::interleave(&blocks));
	}

	#[test]
	fn test_rejects_wrong_dimensions() {
		let bmp = Bitmap::filled(100, 100, [0, 0, 0]);
		assert!(decode_frame(&bmp, FrameSize::S128).is_err());
	}

	#[test]
	fn test_failed_blocks_zero_filled() {
		let size = FrameSize::S128;
		let data = vec![0x5Au8; size.data_bytes()];
		let bmp = render_frame(&data, size);
		let mut raw = decode_frame(&bmp, size).unwrap();

		// Destroy far more than 32 bytes of the single block.
		for byte in raw.iter_mut().take(120) {
			*byte ^= 0xFF;
		}
		let decoded = rs_decode_frame(&raw, size);
		assert_eq!(decoded, vec![0u8; size.data_bytes()]);
	}

	#[test]
	fn test_multi_frame_encode_decode() {
		let size = FrameSize::S128;
		let payload: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
		let frames = encode(&payload, size).unwrap();

		let mut stream = Vec::new();
		for frame in &frames {
			let raw = decode_frame(frame, size).unwrap();
			stream.extend_from_slice(&rs_decode_frame(&raw, size));
		}

		let len = u32::from_be_bytes([stream[0], stream[1], stream[2], stream[3]]) as usize;
		assert_eq!(len, payload.len());
		assert_eq!(&stream[4..4 + len], &payload[..]);
	}
}
