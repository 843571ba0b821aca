//! The record container: file header plus ordered segment lists.
//!
//! Every structural edit goes through [`Record::new_segment`],
//! [`Record::remove_segment`] or [`Record::move_segment`]. Each of them
//! prepares the new header on a copy and commits only when every field update
//! succeeded, so for every kind the header count always equals the number of
//! segments and sequence numbers run `0..count` in list order.
//!
//! # Example
//!
//! ```rust
//! use nitf_record::{Record, SegmentKind};
//!
//! let mut record = Record::new().unwrap();
//! record.new_segment(SegmentKind::Image, None).unwrap();
//! record.new_segment(SegmentKind::Image, None).unwrap();
//! record.remove_segment(SegmentKind::Image, 0).unwrap();
//!
//! assert_eq!(record.count(SegmentKind::Image), 1);
//! assert_eq!(record.segment(SegmentKind::Image, 0).unwrap().sequence(), 0);
//! ```

use crate::header::{new_file_header, store_extensions};
use crate::kind::SegmentKind;
use crate::segment::Segment;
use nitf_core::{Error, Result, ToField, MAX_SEGMENTS_PER_KIND};
use nitf_tre::{dynamic_key, Extensions, Tre};
use std::ops::Range;
use tracing::debug;

/// File header fields of the user-defined header data block.
pub const USER_DEFINED_HEADER_FIELDS: (&str, &str, &str) = ("UDHDL", "UDHOFL", "UDHD");

/// File header fields of the extended header data block.
pub const EXTENDED_HEADER_FIELDS: (&str, &str, &str) = ("XHDL", "XHDLOFL", "XHD");

/// Component-info values of one segment as stored in the header.
type InfoEntry = (Vec<u8>, Vec<u8>);

/// A NITF record: header, header extensions and segments of every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    header: Tre,
    user_defined: Extensions,
    extended: Extensions,
    segments: [Vec<Segment>; 6],
    stream_offset: u64,
}

impl Record {
    /// Creates an empty record with a default file header.
    pub fn new() -> Result<Self> {
        Ok(Self::from_parts(new_file_header()?, Extensions::new(), Extensions::new()))
    }

    pub(crate) fn from_parts(header: Tre, user_defined: Extensions, extended: Extensions) -> Self {
        Self {
            header,
            user_defined,
            extended,
            segments: Default::default(),
            stream_offset: 0,
        }
    }

    pub(crate) fn set_stream_offset(&mut self, offset: u64) {
        self.stream_offset = offset;
    }

    pub(crate) fn push_parsed(&mut self, segment: Segment) {
        self.segments[segment.kind().index()].push(segment);
    }

    /// File header fields.
    #[inline]
    pub fn header(&self) -> &Tre {
        &self.header
    }

    /// Sets a file header field.
    ///
    /// Count and component-info fields are owned by the container and
    /// cannot be set this way.
    pub fn set_header_field<T: ToField + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        if is_structural(key) {
            return Err(Error::schema(format!(
                "header field {} is maintained by the record",
                key
            )));
        }
        self.header.set_field(key, value)
    }

    /// User-defined header extensions.
    #[inline]
    pub fn user_defined(&self) -> &Extensions {
        &self.user_defined
    }

    /// Mutable user-defined header extensions.
    #[inline]
    pub fn user_defined_mut(&mut self) -> &mut Extensions {
        &mut self.user_defined
    }

    /// Extended header extensions.
    #[inline]
    pub fn extended(&self) -> &Extensions {
        &self.extended
    }

    /// Mutable extended header extensions.
    #[inline]
    pub fn extended_mut(&mut self) -> &mut Extensions {
        &mut self.extended
    }

    /// Number of segments of `kind`.
    #[inline]
    pub fn count(&self, kind: SegmentKind) -> usize {
        self.segments[kind.index()].len()
    }

    /// Count recorded in the header for `kind`.
    pub fn header_count(&self, kind: SegmentKind) -> Result<usize> {
        self.header.get(kind.count_field())
    }

    /// Segments of `kind` in order.
    #[inline]
    pub fn segments(&self, kind: SegmentKind) -> &[Segment] {
        &self.segments[kind.index()]
    }

    /// All segments in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().flatten()
    }

    /// Segment `index` of `kind`.
    pub fn segment(&self, kind: SegmentKind, index: usize) -> Result<&Segment> {
        let list = &self.segments[kind.index()];
        list.get(index).ok_or(Error::Index {
            kind: kind.name(),
            index,
            count: list.len(),
        })
    }

    /// Mutable segment `index` of `kind`.
    pub fn segment_mut(&mut self, kind: SegmentKind, index: usize) -> Result<&mut Segment> {
        let list = &mut self.segments[kind.index()];
        let count = list.len();
        list.get_mut(index).ok_or(Error::Index {
            kind: kind.name(),
            index,
            count,
        })
    }

    /// Adds a default segment of `kind` and returns its index.
    ///
    /// The segment is appended, or inserted at `at` when given. Fails with a
    /// range error when the kind already holds the maximum number of
    /// segments and with an index error when `at` is past the end.
    pub fn new_segment(&mut self, kind: SegmentKind, at: Option<usize>) -> Result<usize> {
        let count = self.count(kind);
        if count >= MAX_SEGMENTS_PER_KIND {
            return Err(Error::range(format!(
                "record already holds {} {} segments",
                count, kind
            )));
        }
        let target = at.unwrap_or(count);
        if target > count {
            return Err(Error::Index {
                kind: kind.name(),
                index: target,
                count,
            });
        }

        let segment = Segment::new(kind, count)?;
        let mut header = self.header.clone();
        let mut info = read_info(&header, kind, target..count)?;
        info.insert(0, blank_info(kind));
        header.set_field(kind.count_field(), &(count + 1))?;
        write_info(&mut header, kind, target, &info)?;

        self.header = header;
        self.segments[kind.index()].insert(target, segment);
        self.relabel(kind);
        debug!(%kind, index = target, count = count + 1, "new segment");
        Ok(target)
    }

    /// Removes segment `index` of `kind`.
    ///
    /// Later segments move down by one and are relabeled.
    pub fn remove_segment(&mut self, kind: SegmentKind, index: usize) -> Result<()> {
        let count = self.count(kind);
        self.check_index(kind, index)?;

        let mut header = self.header.clone();
        let info = read_info(&header, kind, index + 1..count)?;
        header.set_field(kind.count_field(), &(count - 1))?;
        write_info(&mut header, kind, index, &info)?;

        self.header = header;
        self.segments[kind.index()].remove(index);
        self.relabel(kind);
        debug!(%kind, index, count = count - 1, "removed segment");
        Ok(())
    }

    /// Moves segment `from` of `kind` to position `to`.
    ///
    /// Segments in between shift by one and are relabeled.
    pub fn move_segment(&mut self, kind: SegmentKind, from: usize, to: usize) -> Result<()> {
        self.check_index(kind, from)?;
        self.check_index(kind, to)?;
        if from == to {
            return Ok(());
        }

        let mut header = self.header.clone();
        let (lo, hi) = (from.min(to), from.max(to));
        let mut info = read_info(&header, kind, lo..hi + 1)?;
        if from < to {
            info.rotate_left(1);
        } else {
            info.rotate_right(1);
        }
        write_info(&mut header, kind, lo, &info)?;

        self.header = header;
        let list = &mut self.segments[kind.index()];
        let segment = list.remove(from);
        list.insert(to, segment);
        self.relabel(kind);
        debug!(%kind, from, to, "moved segment");
        Ok(())
    }

    fn check_index(&self, kind: SegmentKind, index: usize) -> Result<()> {
        let count = self.count(kind);
        if index >= count {
            return Err(Error::Index {
                kind: kind.name(),
                index,
                count,
            });
        }
        Ok(())
    }

    fn relabel(&mut self, kind: SegmentKind) {
        for (i, segment) in self.segments[kind.index()].iter_mut().enumerate() {
            segment.set_sequence(i);
        }
    }

    /// Brings every derived header field up to date.
    ///
    /// Stores the attached extensions into their header blocks, then
    /// recomputes the component-info lengths, `HL`, `FL` and each segment's
    /// data offset. Offsets count from the first byte of the record.
    pub fn finalize(&mut self) -> Result<()> {
        let mut header = self.header.clone();
        let mut segments = self.segments.clone();
        store_extensions(&mut header, USER_DEFINED_HEADER_FIELDS, &self.user_defined)?;
        store_extensions(&mut header, EXTENDED_HEADER_FIELDS, &self.extended)?;

        let mut layout = Vec::new();
        for kind in SegmentKind::ALL {
            let (sub_name, data_name) = kind.info_fields();
            for (j, segment) in segments[kind.index()].iter_mut().enumerate() {
                segment.sync_extensions()?;
                let sub_len = segment.subheader().current_size()? as u64;
                let data_len = segment.data_length();
                if data_len > kind.max_data_length() {
                    return Err(Error::range(format!(
                        "{} segment {} data of {} bytes exceeds {}",
                        kind,
                        j,
                        data_len,
                        kind.max_data_length()
                    )));
                }
                header.set_field(&dynamic_key(sub_name, &[j]), &sub_len)?;
                header.set_field(&dynamic_key(data_name, &[j]), &data_len)?;
                layout.push((sub_len, data_len));
            }
        }

        let header_len = header.current_size()?;
        header.set_field("HL", &header_len)?;
        let mut offset = header_len as u64;
        for (segment, (sub_len, data_len)) in segments.iter_mut().flatten().zip(layout) {
            offset += sub_len;
            segment.set_data_offset(offset);
            offset += data_len;
        }
        header.set_field("FL", &offset)?;

        self.header = header;
        self.segments = segments;
        self.stream_offset = 0;
        debug!(header_len, file_len = offset, "finalized record");
        Ok(())
    }

    /// File length as of the last finalize or read.
    pub fn file_length(&self) -> Result<u64> {
        self.header.get("FL")
    }

    /// Header length as of the last finalize or read.
    pub fn header_length(&self) -> Result<u64> {
        self.header.get("HL")
    }

    /// Stream position of the record's first byte.
    ///
    /// Set when the record is read and reset to 0 by [`Record::finalize`].
    /// Segment data offsets count from this position.
    #[inline]
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }
}

fn is_structural(key: &str) -> bool {
    let name = key.split('[').next().unwrap_or(key);
    SegmentKind::ALL.iter().any(|kind| {
        let (sub, data) = kind.info_fields();
        name == kind.count_field() || name == sub || name == data
    })
}

fn blank_info(kind: SegmentKind) -> InfoEntry {
    let widths = kind.info_widths();
    (vec![b'0'; widths.subheader], vec![b'0'; widths.data])
}

/// Component-info entries `range` of `kind`; every index must be below the
/// header count.
fn read_info(header: &Tre, kind: SegmentKind, range: Range<usize>) -> Result<Vec<InfoEntry>> {
    let (sub, data) = kind.info_fields();
    let stored = |name: &str, i: usize| -> Result<Vec<u8>> {
        let key = dynamic_key(name, &[i]);
        header
            .storage()
            .get(&key)
            .map(|field| field.raw().to_vec())
            .ok_or_else(|| Error::schema(format!("header has no {}", key)))
    };
    range.map(|i| Ok((stored(sub, i)?, stored(data, i)?))).collect()
}

/// Writes `info` into the component-info entries starting at `first`.
fn write_info(header: &mut Tre, kind: SegmentKind, first: usize, info: &[InfoEntry]) -> Result<()> {
    let (sub, data) = kind.info_fields();
    for (i, (sub_raw, data_raw)) in info.iter().enumerate() {
        header.set_raw_field(&dynamic_key(sub, &[first + i]), sub_raw)?;
        header.set_raw_field(&dynamic_key(data, &[first + i]), data_raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(record: &Record) {
        for kind in SegmentKind::ALL {
            assert_eq!(record.header_count(kind).unwrap(), record.count(kind));
            for (i, seg) in record.segments(kind).iter().enumerate() {
                assert_eq!(seg.sequence(), i);
                assert_eq!(seg.kind(), kind);
            }
        }
    }

    fn tag_text(record: &mut Record, index: usize, id: &str) {
        record
            .segment_mut(SegmentKind::Text, index)
            .unwrap()
            .subheader_mut()
            .set_field("TEXTID", id)
            .unwrap();
    }

    fn text_ids(record: &Record) -> Vec<String> {
        record
            .segments(SegmentKind::Text)
            .iter()
            .map(|s| s.subheader().get_field("TEXTID").unwrap().trimmed().unwrap())
            .collect()
    }

    #[test]
    fn test_new_and_remove() {
        let mut record = Record::new().unwrap();
        assert_eq!(record.new_segment(SegmentKind::Image, None).unwrap(), 0);
        assert_eq!(record.new_segment(SegmentKind::Image, None).unwrap(), 1);
        record.remove_segment(SegmentKind::Image, 0).unwrap();
        assert_eq!(record.count(SegmentKind::Image), 1);
        assert_eq!(record.segment(SegmentKind::Image, 0).unwrap().sequence(), 0);
        assert_consistent(&record);
    }

    #[test]
    fn test_insert_at_index() {
        let mut record = Record::new().unwrap();
        for id in ["A", "B"] {
            let i = record.new_segment(SegmentKind::Text, None).unwrap();
            tag_text(&mut record, i, id);
        }
        let i = record.new_segment(SegmentKind::Text, Some(1)).unwrap();
        tag_text(&mut record, i, "C");
        assert_eq!(text_ids(&record), ["A", "C", "B"]);
        assert_consistent(&record);
    }

    #[test]
    fn test_move_relabels() {
        let mut record = Record::new().unwrap();
        for id in ["A", "B", "C", "D"] {
            let i = record.new_segment(SegmentKind::Text, None).unwrap();
            tag_text(&mut record, i, id);
        }
        record.move_segment(SegmentKind::Text, 0, 3).unwrap();
        assert_eq!(text_ids(&record), ["B", "C", "D", "A"]);
        record.move_segment(SegmentKind::Text, 2, 1).unwrap();
        assert_eq!(text_ids(&record), ["B", "D", "C", "A"]);
        assert_consistent(&record);
    }

    #[test]
    fn test_index_errors_leave_record_unchanged() {
        let mut record = Record::new().unwrap();
        record.new_segment(SegmentKind::Graphic, None).unwrap();
        let before = record.clone();

        assert!(record.remove_segment(SegmentKind::Graphic, 1).unwrap_err().is_index());
        assert!(record.remove_segment(SegmentKind::Label, 0).unwrap_err().is_index());
        assert!(record.move_segment(SegmentKind::Graphic, 0, 1).unwrap_err().is_index());
        assert!(record.new_segment(SegmentKind::Graphic, Some(2)).unwrap_err().is_index());
        assert_eq!(record, before);
    }

    #[test]
    fn test_info_entries_follow_segments() {
        let mut record = Record::new().unwrap();
        for len in [10u64, 20, 30] {
            let i = record.new_segment(SegmentKind::Text, None).unwrap();
            record.segment_mut(SegmentKind::Text, i).unwrap().set_data_length(len).unwrap();
        }
        record.finalize().unwrap();
        record.move_segment(SegmentKind::Text, 2, 0).unwrap();
        let lengths: Vec<u64> = (0..3)
            .map(|i| record.header().get(&format!("LT[{i}]")).unwrap())
            .collect();
        assert_eq!(lengths, [30, 10, 20]);

        record.remove_segment(SegmentKind::Text, 1).unwrap();
        assert_eq!(record.header().get::<u64>("LT[1]").unwrap(), 20);
        assert!(record.header().get_field("LT[2]").unwrap_err().is_schema());
    }

    #[test]
    fn test_reused_slot_starts_blank() {
        let mut record = Record::new().unwrap();
        for _ in 0..2 {
            let i = record.new_segment(SegmentKind::Label, None).unwrap();
            record.segment_mut(SegmentKind::Label, i).unwrap().set_data_length(7).unwrap();
        }
        record.finalize().unwrap();
        record.remove_segment(SegmentKind::Label, 1).unwrap();
        record.new_segment(SegmentKind::Label, None).unwrap();
        assert_eq!(record.header().get::<u64>("LL[1]").unwrap(), 0);
    }

    #[test]
    fn test_segment_limit() {
        let mut record = Record::new().unwrap();
        for _ in 0..MAX_SEGMENTS_PER_KIND {
            record.new_segment(SegmentKind::ReservedExtension, None).unwrap();
        }
        let err = record.new_segment(SegmentKind::ReservedExtension, None).unwrap_err();
        assert!(err.is_range());
        assert_eq!(record.header_count(SegmentKind::ReservedExtension).unwrap(), 999);
    }

    #[test]
    fn test_structural_header_fields_protected() {
        let mut record = Record::new().unwrap();
        assert!(record.set_header_field("NUMI", &3u8).unwrap_err().is_schema());
        record.new_segment(SegmentKind::Image, None).unwrap();
        assert!(record.set_header_field("LI[0]", &3u8).unwrap_err().is_schema());
        record.set_header_field("FTITLE", "survey").unwrap();
        assert_eq!(record.header().get_field("FTITLE").unwrap().trimmed().unwrap(), "survey");
    }

    #[test]
    fn test_finalize_layout() {
        let mut record = Record::new().unwrap();
        record.new_segment(SegmentKind::Image, None).unwrap();
        record.new_segment(SegmentKind::Text, None).unwrap();
        record.segment_mut(SegmentKind::Image, 0).unwrap().set_data_length(100).unwrap();
        record.segment_mut(SegmentKind::Text, 0).unwrap().set_data_length(5).unwrap();
        record.finalize().unwrap();

        let hl = record.header_length().unwrap();
        assert_eq!(hl, record.header().current_size().unwrap() as u64);
        let image = record.segment(SegmentKind::Image, 0).unwrap();
        let image_sub = image.subheader_length().unwrap() as u64;
        assert_eq!(image.data_offset(), hl + image_sub);
        let text = record.segment(SegmentKind::Text, 0).unwrap();
        assert_eq!(text.data_offset(), hl + image_sub + 100 + 282);
        assert_eq!(record.file_length().unwrap(), text.data_offset() + 5);
    }

    #[test]
    fn test_finalize_stores_header_extensions() {
        let mut record = Record::new().unwrap();
        let base = record.header().current_size().unwrap();
        record.extended_mut().append(Tre::opaque("PIAIMC", b"0123456789"));
        record.finalize().unwrap();
        assert_eq!(record.header().get::<usize>("XHDL").unwrap(), 3 + 11 + 10);
        assert_eq!(record.header_length().unwrap() as usize, base + 3 + 11 + 10);
    }
}
