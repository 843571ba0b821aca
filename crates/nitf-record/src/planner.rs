//! Image segmentation planning.
//!
//! An image larger than one image segment can hold is split in the row
//! direction into segments chained through `ILOC`. Each segment is limited
//! by the byte budget and, once there is more than one segment, by the five
//! row digits of `ILOC`. Blocked images always store full blocks, so both
//! limits are applied to padded dimensions.
//!
//! # Example
//!
//! ```rust
//! use nitf_record::planner::{plan_segments, PlanParams};
//!
//! let params = PlanParams::new(100_000, 100, 2).with_max_bytes(10_000_000);
//! let plan = plan_segments(&params).unwrap();
//!
//! assert_eq!(plan.segments.len(), 2);
//! assert_eq!(plan.segments[1].first_row, 50_000);
//! assert_eq!(plan.segments[1].iloc(), "5000000000");
//! ```

use nitf_core::{Error, Result, ILOC_MAX, NUM_BYTES_MAX};
use tracing::debug;

/// Planner inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanParams {
    /// Rows in the image.
    pub num_rows: usize,
    /// Columns in the image.
    pub num_cols: usize,
    /// Bytes per pixel.
    pub bytes_per_pixel: usize,
    /// Rows per block, 0 when unblocked.
    pub rows_per_block: usize,
    /// Columns per block, 0 when unblocked.
    pub cols_per_block: usize,
    /// Row limit per segment when there is more than one segment.
    pub max_rows: usize,
    /// Byte budget per segment.
    pub max_bytes: u64,
}

impl PlanParams {
    /// Unblocked image with the format's default limits.
    pub fn new(num_rows: usize, num_cols: usize, bytes_per_pixel: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            bytes_per_pixel,
            rows_per_block: 0,
            cols_per_block: 0,
            max_rows: ILOC_MAX,
            max_bytes: NUM_BYTES_MAX,
        }
    }

    /// Sets the block size.
    pub fn with_blocking(mut self, rows_per_block: usize, cols_per_block: usize) -> Self {
        self.rows_per_block = rows_per_block;
        self.cols_per_block = cols_per_block;
        self
    }

    /// Sets the row limit. Values above [`ILOC_MAX`] are clamped when planning.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Sets the byte budget per segment.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

/// One planned image segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannedSegment {
    /// First global row.
    pub first_row: usize,
    /// Rows in the segment.
    pub num_rows: usize,
    /// Row part of `ILOC`, relative to the segment this one attaches to.
    pub row_offset: usize,
}

impl PlannedSegment {
    /// Global end row, exclusive.
    #[inline]
    pub fn end_row(&self) -> usize {
        self.first_row + self.num_rows
    }

    /// `ILOC` value: five row digits then five column digits.
    pub fn iloc(&self) -> String {
        format!("{:05}00000", self.row_offset)
    }

    /// Part of the global row range `[start, start + rows)` that falls inside
    /// this segment, as `(first global row, row count)`.
    pub fn overlap(&self, start: usize, rows: usize) -> Option<(usize, usize)> {
        let begin = start.max(self.first_row);
        let end = start.saturating_add(rows).min(self.end_row());
        if begin < end {
            Some((begin, end - begin))
        } else {
            None
        }
    }
}

/// Planner output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentPlan {
    /// Segments ordered by first row.
    pub segments: Vec<PlannedSegment>,
    /// Row limit applied to each segment of a multi-segment plan.
    pub num_rows_limit: usize,
    /// Bytes of image data.
    pub num_bytes_total: u64,
    /// Byte budget each segment was held to.
    pub max_bytes_per_segment: u64,
}

impl SegmentPlan {
    /// Number of planned segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no segment is planned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments overlapping the global row range `[start, start + rows)`, with
    /// their index and overlap.
    pub fn segments_for_rows(&self, start: usize, rows: usize) -> Vec<(usize, usize, usize)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, seg)| seg.overlap(start, rows).map(|(first, n)| (i, first, n)))
            .collect()
    }
}

fn round_up(value: usize, block: usize) -> usize {
    if block == 0 {
        value
    } else {
        value.div_ceil(block) * block
    }
}

fn round_down(value: usize, block: usize) -> usize {
    if block == 0 { value } else { value / block * block }
}

/// Splits an image into segments.
///
/// A single segment is planned whenever all rows fit in the byte budget;
/// the row limit only applies to multi-segment plans. Continuation segments
/// record the row limit as their row offset.
pub fn plan_segments(params: &PlanParams) -> Result<SegmentPlan> {
    if params.num_rows == 0 || params.num_cols == 0 || params.bytes_per_pixel == 0 {
        return Err(Error::config(format!(
            "image of {}x{} pixels at {} bytes per pixel is empty",
            params.num_rows, params.num_cols, params.bytes_per_pixel
        )));
    }
    if params.max_rows == 0 {
        return Err(Error::config("row limit is zero"));
    }
    if params.max_bytes > NUM_BYTES_MAX {
        return Err(Error::config(format!(
            "byte budget {} exceeds the format limit {}",
            params.max_bytes, NUM_BYTES_MAX
        )));
    }
    let max_rows = params.max_rows.min(ILOC_MAX);

    let cols_padded = round_up(params.num_cols, params.cols_per_block);
    let bytes_per_row = (params.bytes_per_pixel as u64)
        .checked_mul(cols_padded as u64)
        .ok_or_else(|| Error::config("row size overflows"))?;

    let fit = params.max_bytes / bytes_per_row;
    if fit == 0 {
        return Err(Error::config(format!(
            "one row of {} bytes exceeds the budget of {}",
            bytes_per_row, params.max_bytes
        )));
    }
    let fit = round_down(usize::try_from(fit).unwrap_or(usize::MAX), params.rows_per_block);
    if fit == 0 {
        return Err(Error::config(format!(
            "one block row of {} rows exceeds the budget of {} bytes",
            params.rows_per_block, params.max_bytes
        )));
    }

    let limit = round_down(max_rows.min(fit), params.rows_per_block);
    if limit == 0 {
        return Err(Error::config(format!(
            "row limit {} is smaller than one block of {} rows",
            max_rows, params.rows_per_block
        )));
    }

    let total = (params.num_rows as u64)
        .checked_mul(bytes_per_row)
        .ok_or_else(|| Error::config("image size overflows"))?;

    let segments = if total <= params.max_bytes {
        vec![PlannedSegment {
            first_row: 0,
            num_rows: params.num_rows,
            row_offset: 0,
        }]
    } else {
        let count = params.num_rows.div_ceil(limit);
        (0..count)
            .map(|k| {
                let first_row = k * limit;
                PlannedSegment {
                    first_row,
                    num_rows: limit.min(params.num_rows - first_row),
                    row_offset: if k == 0 { 0 } else { limit },
                }
            })
            .collect()
    };

    debug!(
        rows = params.num_rows,
        bytes_per_row,
        limit,
        segments = segments.len(),
        "planned image segments"
    );
    Ok(SegmentPlan {
        segments,
        num_rows_limit: limit,
        num_bytes_total: total,
        max_bytes_per_segment: params.max_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_segments() {
        let params = PlanParams::new(100_000, 100, 2)
            .with_max_rows(1_000_000)
            .with_max_bytes(10_000_000);
        let plan = plan_segments(&params).unwrap();
        assert_eq!(
            plan.segments,
            vec![
                PlannedSegment { first_row: 0, num_rows: 50_000, row_offset: 0 },
                PlannedSegment { first_row: 50_000, num_rows: 50_000, row_offset: 50_000 },
            ]
        );
        assert_eq!(plan.num_rows_limit, 50_000);
        assert_eq!(plan.num_bytes_total, 20_000_000);
    }

    #[test]
    fn test_single_segment_ignores_row_limit() {
        let params = PlanParams::new(200_000, 10, 1);
        let plan = plan_segments(&params).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.segments[0].num_rows, 200_000);
        assert_eq!(plan.segments[0].iloc(), "0000000000");
    }

    #[test]
    fn test_short_last_segment_keeps_limit_offset() {
        let params = PlanParams::new(250, 10, 1).with_max_bytes(1000);
        let plan = plan_segments(&params).unwrap();
        let rows: Vec<_> = plan.segments.iter().map(|s| s.num_rows).collect();
        assert_eq!(rows, [100, 100, 50]);
        assert_eq!(plan.segments[2].row_offset, 100);
        assert_eq!(plan.segments[2].iloc(), "0010000000");
    }

    #[test]
    fn test_blocking_pads_and_truncates() {
        // 10 columns pad to 16; 1000 / 16 = 62 rows, truncated to 60.
        let params = PlanParams::new(200, 10, 1)
            .with_blocking(20, 16)
            .with_max_bytes(1000);
        let plan = plan_segments(&params).unwrap();
        assert_eq!(plan.num_rows_limit, 60);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.segments[3].num_rows, 20);
    }

    #[test]
    fn test_row_limit_truncated_to_blocks() {
        let params = PlanParams::new(1000, 10, 1)
            .with_blocking(16, 0)
            .with_max_rows(50)
            .with_max_bytes(2000);
        assert_eq!(plan_segments(&params).unwrap().num_rows_limit, 48);

        let tiny = params.with_max_rows(10);
        assert!(plan_segments(&tiny).unwrap_err().is_config());
    }

    #[test]
    fn test_config_errors() {
        let row_too_big = PlanParams::new(10, 100, 2).with_max_bytes(100);
        assert!(plan_segments(&row_too_big).unwrap_err().is_config());

        let block_too_big = PlanParams::new(100, 10, 1)
            .with_blocking(64, 0)
            .with_max_bytes(500);
        assert!(plan_segments(&block_too_big).unwrap_err().is_config());

        let over_ceiling = PlanParams::new(10, 10, 1).with_max_bytes(NUM_BYTES_MAX + 1);
        assert!(plan_segments(&over_ceiling).unwrap_err().is_config());

        assert!(plan_segments(&PlanParams::new(0, 10, 1)).unwrap_err().is_config());
        assert!(plan_segments(&PlanParams::new(10, 10, 1).with_max_rows(0)).unwrap_err().is_config());
    }

    #[test]
    fn test_overlap() {
        let seg = PlannedSegment { first_row: 100, num_rows: 50, row_offset: 100 };
        assert_eq!(seg.overlap(0, 120), Some((100, 20)));
        assert_eq!(seg.overlap(120, 10), Some((120, 10)));
        assert_eq!(seg.overlap(140, 100), Some((140, 10)));
        assert_eq!(seg.overlap(0, 100), None);
        assert_eq!(seg.overlap(150, 5), None);
    }

    #[test]
    fn test_segments_for_rows() {
        let plan = plan_segments(&PlanParams::new(250, 10, 1).with_max_bytes(1000)).unwrap();
        assert_eq!(plan.segments_for_rows(90, 20), vec![(0, 90, 10), (1, 100, 10)]);
    }
}
