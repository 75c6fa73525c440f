//! Error types for the frame codec and the camera recovery pipeline.

use thiserror::Error;

/// Errors that can occur while encoding or decoding cimbar frames.
///
/// Every variant is a value surfaced through `Result`; nothing in the codec
/// panics across its public boundary. Per-frame failures during a live scan
/// are swallowed by the session after logging.
#[derive(Debug, Error)]
pub enum CimbarError {
	/// Frame size is not one of the wire-format constants
	#[error("Unsupported frame size: {size} (expected 128, 192, 256 or 384)")]
	UnsupportedFrameSize {
		/// The rejected frame size in pixels
		size: u32,
	},

	/// A Reed-Solomon block had more errors than one RS pass can correct
	#[error(
		"Reed-Solomon block unrecoverable: locator degree {degree}, {roots} error locations found"
	)]
	RsBlockFailure {
		/// Degree of the error-locator polynomial
		degree: usize,
		/// Number of roots the Chien search located
		roots: usize,
	},

	/// The first 64 data bytes of a decoded frame are all zero, meaning
	/// every leading RS block failed and was zero-filled
	#[error("Quality gate rejected frame: leading data bytes are all zero")]
	QualityGateFailure,

	/// Fewer than two finder patterns were detected in a photo
	#[error("Finder patterns not found: {found} candidate(s) located")]
	FinderNotFound {
		/// Number of finder candidates that survived confirmation
		found: usize,
	},

	/// The perspective system was singular and no homography exists
	#[error("Degenerate warp: finder geometry does not span a quadrilateral")]
	WarpDegenerate,

	/// A length prefix failed validation against the frame capacity
	#[error("Bad length prefix: {length} bytes is outside the valid payload range")]
	BadLengthPrefix {
		/// The rejected payload length
		length: u32,
	},

	/// The adjacency chain does not yet cover every frame of the payload
	#[error("Incomplete frame chain: {have} of {need} frames linked")]
	IncompleteChain {
		/// Frames reachable from frame zero
		have: usize,
		/// Total frames the length prefix requires
		need: usize,
	},

	/// Every decode strategy failed for a photo
	#[error("All decode strategies failed after {attempts} attempt(s)")]
	AllStrategiesFailed {
		/// Number of strategy/frame-size combinations tried
		attempts: usize,
	},

	/// The payload would need more frames than the chain can address
	#[error("Payload too large: {frames} frames needed, at most 255 allowed")]
	PayloadTooLarge {
		/// Number of frames the payload would occupy
		frames: usize,
	},

	/// A pixel buffer does not match its declared dimensions
	#[error("Bad bitmap dimensions: {width}x{height} needs {expected} bytes, got {actual}")]
	BadDimensions {
		/// Declared width in pixels
		width: usize,
		/// Declared height in pixels
		height: usize,
		/// Expected buffer length in bytes
		expected: usize,
		/// Actual buffer length in bytes
		actual: usize,
	},
}
