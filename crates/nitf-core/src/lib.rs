//! # nitf-core
//!
//! Core types for NITF metadata handling.
//!
//! This crate provides the foundational types used throughout the nitf-rs workspace:
//!
//! - [`Field`] - Fixed-width typed header value (BCS-A, BCS-N, binary)
//! - [`FromField`], [`ToField`] - Conversions into and out of fields
//! - [`Error`], [`Result`] - Shared error type
//! - Format limits such as [`ILOC_MAX`] and [`NUM_BYTES_MAX`]
//!
//! ## Crate Structure
//!
//! This crate has no internal dependencies. The other crates build on it:
//!
//! ```text
//! nitf-core (this crate)
//!    ^
//!    |
//!    +-- nitf-tre (descriptor tables, cursor, TRE instances)
//!         ^
//!         |
//!         +-- nitf-record (segments, record container, planner, I/O)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod constants;
pub mod error;
pub mod field;

// Re-exports for convenience
pub use constants::*;
pub use error::*;
pub use field::*;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use nitf_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::field::{Field, FieldKind, FromField, Justification, RealFormat, ToField};
}
