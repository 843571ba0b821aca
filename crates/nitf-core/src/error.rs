//! Error types for nitf-rs operations.
//!
//! This module provides a single error enum shared by every layer of the
//! metadata engine: fixed-width fields, the tagged-record interpreter, the
//! segment container and the segmentation planner.
//!
//! # Overview
//!
//! The [`Error`] enum covers all failure modes that can occur during:
//! - Field conversions (text/number/date/binary)
//! - Schema expansion and dynamic key lookup
//! - Segment creation, removal and reordering
//! - Segmentation planning
//! - Parsing and writing headers over a byte stream
//!
//! Every failing operation leaves the structure it was called on unchanged,
//! so any error here is recoverable at the granularity of the call.
//!
//! # Usage
//!
//! ```rust
//! use nitf_core::{Error, Result};
//!
//! fn check_index(index: usize, count: usize) -> Result<()> {
//!     if index >= count {
//!         return Err(Error::Index {
//!             kind: "image",
//!             index,
//!             count,
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_index(3, 2).unwrap_err().is_index());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation
//!
//! # Used By
//!
//! - [`crate::field::Field`] - Conversion and range failures
//! - `nitf-tre` - Schema failures, TRE parsing
//! - `nitf-record` - Index and planner failures, record I/O

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating NITF metadata.
///
/// # Categories
///
/// - **Field errors**: [`Conversion`](Error::Conversion), [`Range`](Error::Range)
/// - **Structure errors**: [`Schema`](Error::Schema), [`Index`](Error::Index)
/// - **Planning errors**: [`Config`](Error::Config)
/// - **Resource errors**: [`OutOfMemory`](Error::OutOfMemory)
/// - **Stream errors**: [`Io`](Error::Io), [`Parse`](Error::Parse)
#[derive(Debug, Error)]
pub enum Error {
    /// Field content cannot represent the requested type.
    ///
    /// Returned when e.g. non-digit bytes are read as an unsigned integer,
    /// or when text outside the field's character set is stored.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Value does not fit in the declared field width.
    #[error("range error: {0}")]
    Range(String),

    /// A dynamic key is unreachable under the current structural fields, or a
    /// structural reference (loop count, condition, computed length) is
    /// unresolved or malformed.
    #[error("schema error: {0}")]
    Schema(String),

    /// Segment index out of bounds.
    #[error("{kind} segment index {index} out of range (count {count})")]
    Index {
        /// Segment kind name
        kind: &'static str,
        /// Offending index
        index: usize,
        /// Number of segments of that kind
        count: usize,
    },

    /// Segmentation constraints cannot be satisfied.
    #[error("segmentation config error: {0}")]
    Config(String),

    /// An allocation sized from stream data failed.
    #[error("failed to allocate {requested} bytes")]
    OutOfMemory {
        /// Bytes requested
        requested: usize,
    },

    /// Underlying stream error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Byte stream does not match the expected layout.
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Creates a conversion error from any displayable message.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::Conversion(msg.into())
    }

    /// Creates a range error from any displayable message.
    pub fn range(msg: impl Into<String>) -> Self {
        Error::Range(msg.into())
    }

    /// Creates a schema error from any displayable message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Creates a planner configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Returns `true` for [`Error::Conversion`].
    #[inline]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion(_))
    }

    /// Returns `true` for [`Error::Range`].
    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, Error::Range(_))
    }

    /// Returns `true` for [`Error::Schema`].
    #[inline]
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema(_))
    }

    /// Returns `true` for [`Error::Index`].
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Error::Index { .. })
    }

    /// Returns `true` for [`Error::Config`].
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Returns `true` for [`Error::Parse`].
    #[inline]
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

/// Reserves exactly `len` bytes in a fresh buffer, reporting allocation
/// failure as [`Error::OutOfMemory`] instead of aborting.
///
/// Used wherever a length comes from untrusted stream data.
pub fn try_alloc(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Index {
            kind: "image",
            index: 4,
            count: 2,
        };
        assert_eq!(err.to_string(), "image segment index 4 out of range (count 2)");

        let err = Error::schema("key FOO[3] not reachable");
        assert!(err.to_string().contains("FOO[3]"));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::conversion("x").is_conversion());
        assert!(Error::range("x").is_range());
        assert!(Error::config("x").is_config());
        assert!(!Error::parse("x").is_schema());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_try_alloc() {
        let buf = try_alloc(16).unwrap();
        assert_eq!(buf.len(), 16);
        assert!(matches!(
            try_alloc(usize::MAX),
            Err(Error::OutOfMemory { .. })
        ));
    }
}
