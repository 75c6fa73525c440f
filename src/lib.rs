#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! `cimbar-rs` is a visual data codec: it renders an opaque byte payload as
//! one or more grids of colored, dotted cells, and recovers the payload
//! from a lossless frame stream or a photographic capture.
//!
pub use cimbar_internal::*;
