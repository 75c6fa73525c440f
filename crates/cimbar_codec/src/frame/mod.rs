//! Frame geometry and the cell-grid codec.
//!
//! A frame is a square bitmap whose side is one of the four wire-format
//! sizes. The grid is made of 8x8-pixel cells; four 3x3-cell finder
//! patterns occupy the corners and every remaining cell carries 7 bits
//! (3 color bits, 4 symbol bits). Raw frame bytes pass through the
//! Reed-Solomon layer and a byte-stride interleave before they reach the
//! cell raster.

pub mod palette;

mod decode;
mod encode;
mod interleave;
mod layout;
mod symbol;

pub use decode::{decode_frame, rs_decode_frame};
pub(crate) use decode::nearest_palette_index;
pub use encode::{encode, render_frame};
pub(crate) use encode::MAX_FRAMES;
pub use interleave::{deinterleave, interleave};
pub(crate) use layout::{cells_from_raw, raw_from_cells, usable_cells};
pub(crate) use symbol::symbol_tile;

use crate::error::CimbarError;
use crate::rs::ECC_LEN;

/// Side of one cell in pixels.
pub const CELL_SIZE: usize = 8;

/// Side of a finder pattern in cells.
pub const FINDER_SPAN: usize = 3;

/// Bits carried by one data cell.
pub const BITS_PER_CELL: usize = 7;

/// Length of the big-endian payload length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Leading magic of the encrypted wire format. The codec never produces or
/// consumes it itself, but a live scan validates it to recognize frame
/// zero.
pub const WIRE_MAGIC: [u8; 4] = [0xCB, 0x42, 0x01, 0x00];

/// The wire-format set of frame sizes.
///
/// Everything else about a frame (grid dimensions, RS block layout, bytes
/// per frame) derives from the size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSize {
	/// 128x128 pixels, 16x16 cells
	S128,
	/// 192x192 pixels, 24x24 cells
	S192,
	/// 256x256 pixels, 32x32 cells
	S256,
	/// 384x384 pixels, 48x48 cells
	S384,
}

impl FrameSize {
	/// All sizes, in the order the camera pipeline probes them.
	pub const ALL: [FrameSize; 4] =
		[FrameSize::S256, FrameSize::S384, FrameSize::S192, FrameSize::S128];

	/// Side length in pixels.
	pub const fn pixels(self) -> usize {
		match self {
			FrameSize::S128 => 128,
			FrameSize::S192 => 192,
			FrameSize::S256 => 256,
			FrameSize::S384 => 384,
		}
	}

	/// Cells per row (and per column).
	pub const fn cols(self) -> usize {
		self.pixels() / CELL_SIZE
	}

	/// Number of data-carrying cells: the grid minus the four finders.
	pub const fn usable_cells(self) -> usize {
		self.cols() * self.cols() - 4 * FINDER_SPAN * FINDER_SPAN
	}

	/// Raw bytes per frame, before RS overhead.
	///
	/// This is the floor of the cell bit capacity; the decoder's bit-unpack
	/// produces the ceiling and truncates to this same constant.
	pub const fn raw_bytes(self) -> usize {
		self.usable_cells() * BITS_PER_CELL / 8
	}

	/// Sizes of the RS blocks packed into one frame, parity included.
	pub fn block_sizes(self) -> Vec<usize> {
		let mut sizes = Vec::new();
		let mut remaining = self.raw_bytes();
		while remaining > ECC_LEN {
			let block = remaining.min(crate::rs::BLOCK_TOTAL);
			sizes.push(block);
			remaining -= block;
		}
		sizes
	}

	/// Effective data bytes per frame, after RS overhead ("dpf").
	pub fn data_bytes(self) -> usize {
		self.block_sizes().iter().map(|len| len - ECC_LEN).sum()
	}
}

impl TryFrom<u32> for FrameSize {
	type Error = CimbarError;

	fn try_from(size: u32) -> Result<Self, Self::Error> {
		match size {
			128 => Ok(FrameSize::S128),
			192 => Ok(FrameSize::S192),
			256 => Ok(FrameSize::S256),
			384 => Ok(FrameSize::S384),
			other => Err(CimbarError::UnsupportedFrameSize {
				size: other,
			}),
		}
	}
}

impl std::fmt::Display for FrameSize {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}", self.pixels(), self.pixels())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_geometry_table() {
		let expect = [
			(FrameSize::S128, 16, 220, 192, vec![192], 128),
			(FrameSize::S192, 24, 540, 472, vec![255, 217], 344),
			(FrameSize::S256, 32, 988, 864, vec![255, 255, 255, 99], 608),
			(FrameSize::S384, 48, 2268, 1984, vec![255, 255, 255, 255, 255, 255, 255, 199], 1472),
		];

		for (size, cols, usable, raw, blocks, dpf) in expect {
			assert_eq!(size.cols(), cols, "{size}");
			assert_eq!(size.usable_cells(), usable, "{size}");
			assert_eq!(size.raw_bytes(), raw, "{size}");
			assert_eq!(size.block_sizes(), blocks, "{size}");
			assert_eq!(size.data_bytes(), dpf, "{size}");
		}
	}

	#[test]
	fn test_block_sizes_cover_raw_bytes() {
		for size in FrameSize::ALL {
			let total: usize = size.block_sizes().iter().sum();
			assert_eq!(total, size.raw_bytes(), "{size}");
			for block in size.block_sizes() {
				assert!(block > ECC_LEN, "{size}: block {block} has no data");
			}
		}
	}

	#[test]
	fn test_try_from_rejects_unknown_sizes() {
		assert!(FrameSize::try_from(256).is_ok());
		for bad in [0u32, 64, 200, 512] {
			assert!(FrameSize::try_from(bad).is_err(), "{bad}");
		}
	}
}
