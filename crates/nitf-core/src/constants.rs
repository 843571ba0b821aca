//! Numeric limits and fixed widths of the NITF 2.1 container format.
//!
//! These are the hard ceilings that the segmentation planner and the
//! record container enforce. They come from the number of decimal digits
//! that the corresponding header fields reserve.

/// Maximum row offset representable in the row half of an ILOC field
/// (five decimal digits).
pub const ILOC_MAX: usize = 99_999;

/// Maximum number of bytes an image segment may declare (the `LI` field is
/// ten digits wide; the all-nines value is reserved).
pub const NUM_BYTES_MAX: u64 = 9_999_999_998;

/// Maximum number of segments of a single kind in one file (three digit
/// count fields).
pub const MAX_SEGMENTS_PER_KIND: usize = 999;

/// Width of the tag of a tagged record extension.
pub const TRE_TAG_SIZE: usize = 6;

/// Width of the length prefix of a tagged record extension.
pub const TRE_LENGTH_SIZE: usize = 5;

/// Largest body a tagged record extension can declare.
pub const TRE_MAX_LENGTH: usize = 99_999;

/// Width of the overflow-pointer field (`UDHOFL`, `XHDLOFL`, ...) that
/// precedes user-defined and extended header data.
pub const OVERFLOW_FIELD_SIZE: usize = 3;

/// File profile name written at the start of every file.
pub const FILE_PROFILE: &str = "NITF";

/// File version written after the profile name.
pub const FILE_VERSION: &str = "02.10";

/// Date-time layout used by `FDT`, `IDATIM` and similar fields
/// (`CCYYMMDDhhmmss`).
pub const DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
