//! Internal crate for `cimbar-rs`.
//!
//! This module is separated into its own crate to keep the root crate a
//! thin facade, and should not be used directly.
//!
//! # Examples
//!
//! ```rust
//! use cimbar_internal::prelude::*;
//!
//! // All commonly used types are available
//! let tuning = Tuning::default();
//! let session = LiveSession::new(tuning);
//! ```

/// `use cimbar_internal::prelude::*;` to import commonly used items.
pub mod prelude;

// Re-export cimbar_codec for convenience
pub use cimbar_codec;
