//! Prelude module for `cimbar_codec`.
//!
//! # Examples
//!
//! ```no_run
//! use cimbar_codec::prelude::*;
//!
//! let tuning = Tuning::default();
//! let mut session = LiveSession::new(tuning);
//! ```

#[doc(inline)]
pub use crate::{
	// Pixel container
	Bitmap,

	// Errors
	CimbarError,
	ColorMode,

	// Geometry
	FrameSize,
	LiveSession,

	// Scanning
	ScanWorker,

	// Camera configuration
	Tuning,
	decode_photo,

	// Entry points
	encode,
};

#[doc(inline)]
pub use crate::frame::{decode_frame, render_frame, rs_decode_frame};

#[doc(inline)]
pub use crate::frame::palette::{Color, PALETTE};

#[doc(inline)]
pub use crate::locate::{LocateResult, locate};
