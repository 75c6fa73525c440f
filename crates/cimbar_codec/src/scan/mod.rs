//! Live-scan assembly: dedup, frame-zero recognition, adjacency-chain
//! ordering.
//!
//! Frames carry no index. The assembler keys every decoded frame by the
//! FNV-1a hash of its leading bytes, remembers which frame was decoded
//! immediately after which (`adjacency`), and recognizes frame zero by its
//! length prefix and wire magic. When walking the adjacency chain from
//! frame zero visits as many distinct frames as the length prefix
//! requires, the payload is reassembled in walk order regardless of the
//! order the camera saw the frames in.

mod worker;

pub use worker::ScanWorker;

use std::collections::HashMap;

use log::{debug, info};

use crate::bitmap::Bitmap;
use crate::config::Tuning;
use crate::error::CimbarError;
use crate::frame::{FrameSize, LENGTH_PREFIX, WIRE_MAGIC};
use crate::locate::locate;

/// Bytes of each decoded frame that feed the dedup hash.
const HASH_WINDOW: usize = 64;

/// FNV-1a 64-bit hash.
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
	let mut hash = 0xCBF2_9CE4_8422_2325u64;
	for &byte in bytes {
		hash ^= u64::from(byte);
		hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
	}
	hash
}

/// Content-addressed frame store with adjacency ordering.
#[derive(Debug, Default)]
pub(crate) struct Assembler {
	frames_by_hash: HashMap<u64, Vec<u8>>,
	adjacency: HashMap<u64, u64>,
	prev_hash: Option<u64>,
	frame_zero_hash: Option<u64>,
	payload_len: Option<u32>,
	total_frames: Option<usize>,
}

impl Assembler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Feeds one decoded frame. Returns the reassembled payload once the
	/// chain from frame zero is complete.
	///
	/// Duplicates are not stored again, but they still refresh the
	/// adjacency link from the previously decoded frame: a scan that
	/// started mid-loop only learns the links it missed when the display
	/// cycles back around. Links overwrite (last wins) so a link recorded
	/// across a dropped capture heals on a later pass. Seeing the same
	/// frame twice in a row changes nothing.
	pub fn observe(&mut self, frame: Vec<u8>, size: FrameSize) -> Option<Vec<u8>> {
		let hash = fnv1a64(&frame[..HASH_WINDOW.min(frame.len())]);

		if let Some(prev) = self.prev_hash
			&& prev != hash
		{
			self.adjacency.insert(prev, hash);
		}
		self.prev_hash = Some(hash);

		if self.frames_by_hash.contains_key(&hash) {
			debug!("frame {hash:016x} already seen");
			return self.try_complete();
		}

		if self.frame_zero_hash.is_none() {
			match frame_zero_length(&frame, size) {
				Ok(length) => {
					let total = (LENGTH_PREFIX + length as usize).div_ceil(size.data_bytes());
					info!(
						"frame zero found: payload {length} bytes over {total} frame(s)"
					);
					self.frame_zero_hash = Some(hash);
					self.payload_len = Some(length);
					self.total_frames = Some(total);
				}
				Err(err) => debug!("not frame zero: {err}"),
			}
		}

		self.frames_by_hash.insert(hash, frame);
		debug!("{} frame(s) collected", self.frames_by_hash.len());
		self.try_complete()
	}

	/// Walks the adjacency chain from frame zero; on full coverage,
	/// concatenates and slices the payload.
	fn try_complete(&self) -> Option<Vec<u8>> {
		let zero = self.frame_zero_hash?;
		let total = self.total_frames?;
		let length = self.payload_len? as usize;

		let mut chain = Vec::with_capacity(total);
		let mut seen = std::collections::HashSet::new();
		let mut cursor = zero;
		while seen.insert(cursor) && self.frames_by_hash.contains_key(&cursor) {
			chain.push(cursor);
			if chain.len() == total {
				break;
			}
			match self.adjacency.get(&cursor) {
				Some(&next) => cursor = next,
				None => break,
			}
		}

		if chain.len() < total {
			debug!("{}", CimbarError::IncompleteChain {
				have: chain.len(),
				need: total,
			});
			return None;
		}

		let mut stream = Vec::with_capacity(total * self.frames_by_hash[&zero].len());
		for hash in &chain {
			stream.extend_from_slice(&self.frames_by_hash[hash]);
		}
		Some(stream[LENGTH_PREFIX..LENGTH_PREFIX + length].to_vec())
	}
}

/// Validates a candidate frame zero: length prefix in range and wire magic
/// in place.
fn frame_zero_length(frame: &[u8], size: FrameSize) -> Result<u32, CimbarError> {
	let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
	let dpf = size.data_bytes();

	let frames_needed = (LENGTH_PREFIX + length as usize).div_ceil(dpf);
	if length < 32 || frames_needed > crate::frame::MAX_FRAMES {
		return Err(CimbarError::BadLengthPrefix {
			length,
		});
	}
	if frame[4..8] != WIRE_MAGIC {
		return Err(CimbarError::BadLengthPrefix {
			length,
		});
	}
	Ok(length)
}

/// A multi-frame scanning session.
///
/// Feed captured bitmaps through [`LiveSession::submit`] until it returns
/// the payload. Per-frame decode failures are logged and swallowed; the
/// session only ever completes on success.
#[derive(Debug)]
pub struct LiveSession {
	tuning: Tuning,
	assembler: Assembler,
	probed_size: Option<FrameSize>,
	completed: Option<Vec<u8>>,
	cancelled: bool,
}

impl LiveSession {
	/// Creates a session with the given tuning.
	pub fn new(tuning: Tuning) -> Self {
		Self {
			tuning,
			assembler: Assembler::new(),
			probed_size: None,
			completed: None,
			cancelled: false,
		}
	}

	/// Decodes one captured bitmap and feeds it to the assembler.
	///
	/// Returns the payload once the session is complete, and keeps
	/// returning it on further submissions. A cancelled session ignores
	/// everything until [`LiveSession::reset`].
	pub fn submit(&mut self, bmp: &Bitmap) -> Option<Vec<u8>> {
		if self.cancelled {
			return None;
		}
		if let Some(done) = &self.completed {
			return Some(done.clone());
		}

		let located = locate(bmp);
		let sizes: &[FrameSize] = match &self.probed_size {
			Some(size) => std::slice::from_ref(size),
			None => &FrameSize::ALL,
		};

		for &size in sizes {
			match crate::camera::decode_camera_frame(bmp, &located, &self.tuning, size) {
				Ok(data) => {
					// The first success pins the frame size for the rest
					// of the session.
					self.probed_size = Some(size);
					if let Some(payload) = self.assembler.observe(data, size) {
						info!("scan complete: {} payload bytes", payload.len());
						self.completed = Some(payload.clone());
						return Some(payload);
					}
					return None;
				}
				Err(err) => debug!("{size}: {err}"),
			}
		}
		None
	}

	/// Clears all session state, keeping the tuning.
	pub fn reset(&mut self) {
		self.assembler.reset();
		self.probed_size = None;
		self.completed = None;
		self.cancelled = false;
	}

	/// Stops the session; further submissions are ignored until a reset.
	pub fn cancel(&mut self) {
		self.cancelled = true;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::frame::WIRE_MAGIC;
	use test_log::test;

	fn frame_bytes(size: FrameSize, index: usize, total_payload: usize) -> Vec<u8> {
		// Slice the canonical stream for one frame.
		let dpf = size.data_bytes();
		let mut stream = Vec::new();
		stream.extend_from_slice(&(total_payload as u32).to_be_bytes());
		stream.extend(payload(total_payload));
		let frames = stream.len().div_ceil(dpf);
		stream.resize(frames * dpf, 0);
		stream[index * dpf..(index + 1) * dpf].to_vec()
	}

	fn payload(len: usize) -> Vec<u8> {
		// Ciphertext-like bytes: a multiplicative hash never repeats with
		// the frame period, so no two frames collide in the dedup hash the
		// way a short linear pattern would.
		let mut bytes = WIRE_MAGIC.to_vec();
		bytes.extend((4..len).map(|i| ((i as u32).wrapping_mul(2_654_435_761) >> 16) as u8));
		bytes
	}

	#[test]
	fn test_fnv1a64_vectors() {
		// Standard FNV-1a test vectors.
		assert_eq!(fnv1a64(b""), 0xCBF2_9CE4_8422_2325);
		assert_eq!(fnv1a64(b"a"), 0xAF63_DC4C_8601_EC8C);
		assert_eq!(fnv1a64(b"foobar"), 0x85944171F73967E8);
	}

	#[test]
	fn test_single_frame_completes_immediately() {
		let size = FrameSize::S128;
		let mut assembler = Assembler::new();
		let result = assembler.observe(frame_bytes(size, 0, 100), size);
		assert_eq!(result.expect("complete"), payload(100));
	}

	#[test]
	fn test_in_order_assembly() {
		let size = FrameSize::S128;
		let total = 3 * size.data_bytes() - 40;
		let mut assembler = Assembler::new();

		assert!(assembler.observe(frame_bytes(size, 0, total), size).is_none());
		assert!(assembler.observe(frame_bytes(size, 1, total), size).is_none());
		let result = assembler.observe(frame_bytes(size, 2, total), size);
		assert_eq!(result.expect("complete"), payload(total));
	}

	#[test]
	fn test_out_of_order_assembly() {
		// First-seen order 3, 1, 2, 0; the display then cycles 1, 2, 3 so
		// the missing links (0->1, 2->3) and the stale one (2->0) heal.
		let size = FrameSize::S128;
		let total = 4 * size.data_bytes() - 100;
		let mut assembler = Assembler::new();

		for index in [3usize, 1, 2, 0, 1, 2] {
			assert!(assembler.observe(frame_bytes(size, index, total), size).is_none());
		}
		let result = assembler.observe(frame_bytes(size, 3, total), size);
		assert_eq!(result.expect("complete"), payload(total));
	}

	#[test]
	fn test_duplicate_frames_are_idempotent() {
		let size = FrameSize::S128;
		let total = 2 * size.data_bytes() - 30;
		let mut assembler = Assembler::new();

		for _ in 0..3 {
			assert!(assembler.observe(frame_bytes(size, 1, total), size).is_none());
		}
		assert_eq!(assembler.frames_by_hash.len(), 1);

		let result = assembler.observe(frame_bytes(size, 0, total), size);
		// 0 arrived after 1, so adjacency is 1 -> 0; the walk from 0
		// stalls until 1 is seen following 0.
		assert!(result.is_none());
		let result = assembler.observe(frame_bytes(size, 1, total), size);
		assert_eq!(result.expect("complete"), payload(total));
	}

	#[test]
	fn test_bad_length_prefix_not_frame_zero() {
		let size = FrameSize::S128;
		let mut junk = vec![0u8; size.data_bytes()];
		// Length prefix of 16: below the 32-byte wire minimum.
		junk[3] = 16;

		let mut assembler = Assembler::new();
		assert!(assembler.observe(junk, size).is_none());
		assert!(assembler.frame_zero_hash.is_none());

		// Valid length but wrong magic.
		let mut junk = vec![0u8; size.data_bytes()];
		junk[3] = 64;
		junk[4] = 0xAA;
		assert!(assembler.observe(junk, size).is_none());
		assert!(assembler.frame_zero_hash.is_none());
	}

	#[test]
	fn test_max_chain_converges() {
		// 255 frames, delivered in an order that links every pair.
		let size = FrameSize::S128;
		let dpf = size.data_bytes();
		let total = 255 * dpf - LENGTH_PREFIX;
		let mut assembler = Assembler::new();

		let mut result = None;
		for index in 0..255usize {
			result = assembler.observe(frame_bytes(size, index, total), size);
		}
		assert_eq!(result.expect("complete"), payload(total));
	}

	#[test]
	fn test_live_session_single_frame() {
		let size = FrameSize::S128;
		let frames = crate::frame::encode(&payload(100), size).unwrap();

		let mut session = LiveSession::new(Tuning::default());
		let recovered = session.submit(&frames[0]).expect("complete");
		assert_eq!(recovered, payload(100));

		// Completed sessions keep answering.
		assert_eq!(session.submit(&frames[0]).expect("cached"), payload(100));
	}

	#[test]
	fn test_cancelled_session_ignores_submissions() {
		let size = FrameSize::S128;
		let frames = crate::frame::encode(&payload(100), size).unwrap();

		let mut session = LiveSession::new(Tuning::default());
		session.cancel();
		assert!(session.submit(&frames[0]).is_none());

		// Reset re-arms the session.
		session.reset();
		assert_eq!(session.submit(&frames[0]).expect("complete"), payload(100));
	}

	#[test]
	fn test_reset_clears_state() {
		let size = FrameSize::S128;
		let mut assembler = Assembler::new();
		assembler.observe(frame_bytes(size, 0, 100), size);

		assembler.reset();
		assert!(assembler.frames_by_hash.is_empty());
		assert!(assembler.frame_zero_hash.is_none());
	}
}
