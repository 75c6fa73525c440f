//! Payload-to-frames encoding.
//!
//! The encrypted payload is prefixed with its 4-byte big-endian length,
//! split into dpf-sized chunks (the last one zero-padded), and each chunk
//! becomes one rendered frame: RS blocks, byte-stride interleave, 7-bit
//! cell raster, symbols and finders.

use log::debug;

use crate::bitmap::Bitmap;
use crate::error::CimbarError;
use crate::rs;

use super::symbol::{draw_cell, draw_finders};
use super::{CELL_SIZE, FrameSize, LENGTH_PREFIX, cells_from_raw, interleave, usable_cells};

/// Maximum number of frames a payload may occupy; the live-scan chain
/// cannot address more.
pub(crate) const MAX_FRAMES: usize = 255;

/// Encodes an encrypted payload into a sequence of frame bitmaps.
pub fn encode(payload: &[u8], size: FrameSize) -> Result<Vec<Bitmap>, CimbarError> {
	let dpf = size.data_bytes();
	let total = LENGTH_PREFIX + payload.len();
	let frames = total.div_ceil(dpf);
	if frames > MAX_FRAMES {
		return Err(CimbarError::PayloadTooLarge {
			frames,
		});
	}

	let mut stream = Vec::with_capacity(frames * dpf);
	stream.extend_from_slice(&(payload.len() as u32).to_be_bytes());
	stream.extend_from_slice(payload);
	stream.resize(frames * dpf, 0);

	debug!("encoding {} payload bytes into {} {} frame(s)", payload.len(), frames, size);

	Ok(stream.chunks(dpf).map(|chunk| render_frame(chunk, size)).collect())
}

/// Renders one frame from exactly `size.data_bytes()` bytes.
pub fn render_frame(data: &[u8], size: FrameSize) -> Bitmap {
	debug_assert_eq!(data.len(), size.data_bytes());

	// RS-encode each block over its slice of the chunk, then interleave.
	let mut blocks = Vec::new();
	let mut offset = 0;
	for block_len in size.block_sizes() {
		let data_len = block_len - rs::ECC_LEN;
		blocks.push(rs::encode(&data[offset..offset + data_len]));
		offset += data_len;
	}
	let raw = interleave(&blocks);

	let values = cells_from_raw(&raw, size);
	let mut bmp = Bitmap::filled(size.pixels(), size.pixels(), [0, 0, 0]);
	for ((cx, cy), &value) in usable_cells(size).zip(values.iter()) {
		let color_index = value >> 4;
		let symbol = value & 0x0F;
		draw_cell(&mut bmp, cx * CELL_SIZE, cy * CELL_SIZE, color_index, symbol);
	}
	draw_finders(&mut bmp, size);
	bmp
}
