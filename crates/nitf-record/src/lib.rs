//! # nitf-record
//!
//! The NITF record container and the image segmentation planner.
//!
//! - [`Record`] - File header plus ordered segment lists per kind, edited only
//!   through transactional create/remove/move operations
//! - [`Segment`], [`SegmentKind`] - One content segment and its subheader
//! - [`header`] - Header and subheader layouts as descriptor tables
//! - [`planner`] - Splitting an oversized image into chained image segments
//! - [`io`] - Reading and writing records over `Read`/`Write`/`Seek` streams
//!
//! ## Invariants
//!
//! For every kind, the header count field (`NUMI`, `NUMS`, ...) equals the
//! number of segments, the component-info entries follow the segments in
//! order, and segment sequence numbers run `0..count`. A failed operation
//! leaves the record as it was.
//!
//! ```rust
//! use nitf_record::planner::{plan_segments, PlanParams};
//! use nitf_record::{Record, SegmentKind};
//!
//! let params = PlanParams::new(120_000, 4096, 2).with_max_bytes(500_000_000);
//! let plan = plan_segments(&params).unwrap();
//! assert_eq!(plan.segments.len(), 2);
//!
//! let mut record = Record::new().unwrap();
//! for seg in &plan.segments {
//!     let i = record.new_segment(SegmentKind::Image, None).unwrap();
//!     let image = record.segment_mut(SegmentKind::Image, i).unwrap();
//!     image.subheader_mut().set_field("NROWS", &seg.num_rows).unwrap();
//!     image.subheader_mut().set_field("ILOC", seg.iloc().as_str()).unwrap();
//! }
//! assert_eq!(record.count(SegmentKind::Image), plan.segments.len());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - `Serialize`/`Deserialize` for [`SegmentKind`] and the planner types

#![warn(missing_docs)]

pub mod header;
pub mod io;
pub mod kind;
pub mod planner;
pub mod record;
pub mod segment;

pub use io::{BufferSource, ReadOptions, SegmentSource};
pub use kind::{InfoWidths, SegmentKind};
pub use planner::{plan_segments, PlanParams, PlannedSegment, SegmentPlan};
pub use record::Record;
pub use segment::Segment;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use nitf_record::prelude::*;
/// ```
pub mod prelude {
    pub use crate::io::{BufferSource, ReadOptions, SegmentSource};
    pub use crate::kind::SegmentKind;
    pub use crate::planner::{plan_segments, PlanParams, PlannedSegment, SegmentPlan};
    pub use crate::record::Record;
    pub use crate::segment::Segment;
    pub use nitf_core::{Error, Result};
    pub use nitf_tre::{Extensions, Tre, TreCatalog};
}
