//! Prelude module for `cimbar_internal`.

#[doc(inline)]
pub use cimbar_codec::prelude::*;
