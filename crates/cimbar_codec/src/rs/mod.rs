//! Reed-Solomon RS(255,191) block codec over GF(256).
//!
//! Each frame packs its raw bytes into one or more RS blocks. A full block
//! is 255 bytes: 191 data bytes followed by 64 parity bytes. The last block
//! of a frame may be shortened; the parity length never changes, only the
//! data portion shrinks (the codec behaves as if the missing data bytes
//! were leading zeros).
//!
//! Up to 32 byte errors per block are corrected. Beyond that the decoder
//! usually reports failure, but a sufficiently unlucky error pattern can be
//! silently miscorrected, so callers must treat decoded output as
//! unauthenticated.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::{encode, parity};

/// Total bytes in a full RS block.
pub const BLOCK_TOTAL: usize = 255;

/// Parity bytes per block.
pub const ECC_LEN: usize = 64;

/// Data bytes in a full block.
pub const BLOCK_DATA: usize = BLOCK_TOTAL - ECC_LEN;
