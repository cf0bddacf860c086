//! Page-level PDF edits and a saturating integer cast.
//!
//! - [`pages`]: hide pages and move them within the page tree of a
//!   [`lopdf::Document`].
//! - [`info`]: a short summary of a document for display.
//! - [`numerics`]: `saturated_cast` with an `ssat`/`usat` fast path on ARM.

pub mod info;
pub mod numerics;
pub mod pages;
