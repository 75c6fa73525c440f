//! Core codec for the `cimbar-rs` project: byte payloads rendered as grids
//! of colored, dotted cells, and recovered from lossless frame streams or
//! noisy photographic captures.
//!
//! # Pipeline
//!
//! - **Encode**: `length prefix || payload` is split into per-frame
//!   chunks; each chunk is Reed-Solomon coded, byte-stride interleaved and
//!   rendered as one [`Bitmap`] frame.
//! - **Photo decode**: finder patterns are located, the image is warped
//!   onto the canonical square, cells are sampled and RS-decoded.
//! - **Live scan**: a [`LiveSession`] deduplicates decoded frames by
//!   content hash and reorders them through an adjacency chain; no frame
//!   index exists on the wire.
//!
//! # Examples
//!
//! ```rust
//! use cimbar_codec::{FrameSize, encode};
//!
//! // Encrypted wire bytes (magic, salt, IV, ciphertext) in, frames out.
//! let payload = [0xCB, 0x42, 0x01, 0x00, 7, 7, 7, 7];
//! let frames = encode(&payload, FrameSize::S128).unwrap();
//! assert_eq!(frames[0].width(), 128);
//! ```

pub mod bitmap;
pub mod camera;
pub mod config;
pub mod frame;
pub mod gf256;
pub mod locate;
pub mod prelude;
pub mod rs;
pub mod scan;
pub mod warp;

mod error;

// Re-export the types most callers need at the crate root.
pub use bitmap::Bitmap;
pub use camera::{ColorMode, decode_photo};
pub use config::Tuning;
pub use error::CimbarError;
pub use frame::{FrameSize, encode};
pub use scan::{LiveSession, ScanWorker};
