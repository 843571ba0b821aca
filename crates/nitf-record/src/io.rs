//! Reading and writing records over byte streams.
//!
//! Only headers are interpreted. Reading records where each segment's data
//! lies and skips over it; writing pulls segment data from a
//! [`SegmentSource`] supplied by the caller.
//!
//! # Example
//!
//! ```rust
//! use nitf_record::io::{BufferSource, ReadOptions};
//! use nitf_record::{Record, SegmentKind};
//! use nitf_tre::TreCatalog;
//! use std::io::Cursor;
//!
//! let mut record = Record::new().unwrap();
//! record.new_segment(SegmentKind::Text, None).unwrap();
//! record.segment_mut(SegmentKind::Text, 0).unwrap().set_data_length(5).unwrap();
//!
//! let mut source = BufferSource::new();
//! source.insert(SegmentKind::Text, 0, b"hello".to_vec());
//!
//! let mut bytes = Vec::new();
//! record.write_to(&mut bytes, &mut source).unwrap();
//!
//! let catalog = TreCatalog::with_builtins();
//! let mut cursor = Cursor::new(bytes);
//! let back = Record::read_from(&mut cursor, &catalog, &ReadOptions::default()).unwrap();
//! assert_eq!(back.count(SegmentKind::Text), 1);
//! assert_eq!(back.read_segment_data(&mut cursor, SegmentKind::Text, 0).unwrap(), b"hello");
//! ```

use crate::header::{file_header_table, load_extensions, subheader_table, FILE_HEADER_TAG};
use crate::kind::SegmentKind;
use crate::record::{Record, EXTENDED_HEADER_FIELDS, USER_DEFINED_HEADER_FIELDS};
use crate::segment::Segment;
use nitf_core::{Error, Result, FILE_PROFILE};
use nitf_tre::{dynamic_key, Extensions, Tre, TreCatalog};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Options for reading records.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Fail on an extension whose body does not match its catalog table
    /// instead of keeping it opaque.
    pub strict_extensions: bool,
}

/// Supplies segment data while a record is written.
pub trait SegmentSource {
    /// Writes the data of segment `index` of `kind` and returns the number
    /// of bytes written.
    fn write_segment(&mut self, kind: SegmentKind, index: usize, out: &mut dyn Write) -> Result<u64>;
}

/// In-memory segment data keyed by kind and index.
#[derive(Debug, Clone, Default)]
pub struct BufferSource {
    buffers: HashMap<(SegmentKind, usize), Vec<u8>>,
}

impl BufferSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data of segment `index` of `kind`.
    pub fn insert(&mut self, kind: SegmentKind, index: usize, data: Vec<u8>) {
        self.buffers.insert((kind, index), data);
    }
}

impl SegmentSource for BufferSource {
    fn write_segment(&mut self, kind: SegmentKind, index: usize, out: &mut dyn Write) -> Result<u64> {
        match self.buffers.get(&(kind, index)) {
            Some(data) => {
                out.write_all(data)?;
                Ok(data.len() as u64)
            }
            None => Ok(0),
        }
    }
}

fn position<S: Seek>(stream: &mut S) -> Result<u64> {
    Ok(stream.stream_position()?)
}

impl Record {
    /// Reads headers and subheaders from a stream positioned at the start of
    /// a record.
    ///
    /// Segment data is skipped; its offset and length are recorded on each
    /// segment, counted from the start of the record. The start position is
    /// kept as [`Record::stream_offset`].
    pub fn read_from<R: Read + Seek>(
        reader: &mut R,
        catalog: &TreCatalog,
        options: &ReadOptions,
    ) -> Result<Self> {
        let start = position(reader)?;
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::parse("stream ends before the file profile"),
            _ => Error::Io(e),
        })?;
        if magic != FILE_PROFILE.as_bytes() {
            return Err(Error::parse(format!(
                "not a {} file (found '{}')",
                FILE_PROFILE,
                magic.escape_ascii()
            )));
        }
        reader.seek(SeekFrom::Start(start))?;

        let header = Tre::read_from(FILE_HEADER_TAG, file_header_table(), reader)?;
        let header_len: u64 = header.get("HL")?;
        let consumed = position(reader)? - start;
        if consumed != header_len {
            return Err(Error::parse(format!(
                "header declares {} bytes, layout has {}",
                header_len, consumed
            )));
        }

        let strict = options.strict_extensions;
        let user_defined = load_extensions(&header, USER_DEFINED_HEADER_FIELDS, catalog, strict)?;
        let extended = load_extensions(&header, EXTENDED_HEADER_FIELDS, catalog, strict)?;

        let mut segments = Vec::new();
        let mut offset = header_len;
        for kind in SegmentKind::ALL {
            let count: usize = header.get(kind.count_field())?;
            let (sub_name, data_name) = kind.info_fields();
            for j in 0..count {
                let sub_len: u64 = header.get(&dynamic_key(sub_name, &[j]))?;
                let data_len: u64 = header.get(&dynamic_key(data_name, &[j]))?;
                reader.seek(SeekFrom::Start(start + offset))?;
                let mut segment = read_segment(reader, kind, j, sub_len, catalog, strict)?;
                segment.set_data_length(data_len)?;
                segment.set_data_offset(offset + sub_len);
                segments.push(segment);
                offset += sub_len + data_len;
            }
        }

        let file_len: u64 = header.get("FL")?;
        if file_len != offset {
            warn!(declared = file_len, computed = offset, "file length does not match segment layout");
        }

        let mut record = Record::from_parts(header, user_defined, extended);
        record.set_stream_offset(start);
        for segment in segments {
            record.push_parsed(segment);
        }
        reader.seek(SeekFrom::Start(start + offset))?;
        debug!(header_len, file_len = offset, segments = record.iter().count(), "read record");
        Ok(record)
    }

    /// Opens and reads the record in the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, catalog: &TreCatalog, options: &ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, catalog, options)
    }

    /// Reads the data of segment `index` of `kind` from the stream the record
    /// was read from, or one holding the same bytes at the same positions.
    pub fn read_segment_data<R: Read + Seek>(
        &self,
        reader: &mut R,
        kind: SegmentKind,
        index: usize,
    ) -> Result<Vec<u8>> {
        let segment = self.segment(kind, index)?;
        let length = usize::try_from(segment.data_length())
            .map_err(|_| Error::OutOfMemory { requested: usize::MAX })?;
        let mut data = nitf_core::try_alloc(length)?;
        reader.seek(SeekFrom::Start(self.stream_offset() + segment.data_offset()))?;
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Finalizes the record and writes it.
    ///
    /// Each segment's data comes from `source` and must match the declared
    /// data length. Returns the number of bytes written.
    pub fn write_to<W: Write>(&mut self, writer: &mut W, source: &mut dyn SegmentSource) -> Result<u64> {
        self.finalize()?;
        let header = self.header().to_bytes()?;
        writer.write_all(&header)?;
        let mut written = header.len() as u64;

        for segment in self.iter() {
            let subheader = segment.subheader().to_bytes()?;
            writer.write_all(&subheader)?;
            written += subheader.len() as u64;

            let data_len = source.write_segment(segment.kind(), segment.sequence(), writer)?;
            if data_len != segment.data_length() {
                return Err(Error::parse(format!(
                    "{} segment {} declares {} bytes of data, source wrote {}",
                    segment.kind(),
                    segment.sequence(),
                    segment.data_length(),
                    data_len
                )));
            }
            written += data_len;
        }
        debug!(bytes = written, "wrote record");
        Ok(written)
    }

    /// Finalizes the record and writes it to the file at `path`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, source: &mut dyn SegmentSource) -> Result<u64> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        let written = self.write_to(&mut writer, source)?;
        writer.flush()?;
        Ok(written)
    }
}

/// Reads one subheader starting at the current stream position.
fn read_segment<R: Read + Seek>(
    reader: &mut R,
    kind: SegmentKind,
    index: usize,
    declared: u64,
    catalog: &TreCatalog,
    strict: bool,
) -> Result<Segment> {
    let begin = position(reader)?;
    let subheader = Tre::read_from(kind.marker(), subheader_table(kind), reader)?;
    let marker: String = subheader.get(kind.marker())?;
    if marker != kind.marker() {
        return Err(Error::parse(format!(
            "{} segment {} starts with '{}', expected '{}'",
            kind,
            index,
            marker,
            kind.marker()
        )));
    }
    let used = position(reader)? - begin;
    if used != declared {
        return Err(Error::parse(format!(
            "{} subheader {} declares {} bytes, layout has {}",
            kind, index, declared, used
        )));
    }

    let user_defined = match kind.user_defined_fields() {
        Some(fields) => load_extensions(&subheader, fields, catalog, strict)?,
        None => Extensions::new(),
    };
    let extended = match kind.extended_fields() {
        Some(fields) => load_extensions(&subheader, fields, catalog, strict)?,
        None => Extensions::new(),
    };
    Ok(Segment::from_parts(kind, index, subheader, user_defined, extended))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> (Record, BufferSource) {
        let mut record = Record::new().unwrap();
        let mut source = BufferSource::new();
        record.new_segment(SegmentKind::Image, None).unwrap();
        record.new_segment(SegmentKind::DataExtension, None).unwrap();
        record.segment_mut(SegmentKind::Image, 0).unwrap().set_data_length(16).unwrap();
        record
            .segment_mut(SegmentKind::DataExtension, 0)
            .unwrap()
            .set_data_length(4)
            .unwrap();
        source.insert(SegmentKind::Image, 0, (0u8..16).collect());
        source.insert(SegmentKind::DataExtension, 0, b"DATA".to_vec());
        (record, source)
    }

    #[test]
    fn test_write_then_read() {
        let (mut record, mut source) = sample();
        let mut bytes = Vec::new();
        let written = record.write_to(&mut bytes, &mut source).unwrap();
        assert_eq!(written, bytes.len() as u64);
        assert_eq!(record.file_length().unwrap(), written);

        let catalog = TreCatalog::with_builtins();
        let mut cursor = Cursor::new(bytes);
        let back = Record::read_from(&mut cursor, &catalog, &ReadOptions::default()).unwrap();
        assert_eq!(back.header().to_bytes().unwrap(), record.header().to_bytes().unwrap());
        let image = back.segment(SegmentKind::Image, 0).unwrap();
        assert_eq!(image.data_offset(), record.segment(SegmentKind::Image, 0).unwrap().data_offset());
        assert_eq!(
            back.read_segment_data(&mut cursor, SegmentKind::DataExtension, 0).unwrap(),
            b"DATA"
        );
    }

    #[test]
    fn test_read_embedded_record() {
        let mut record = Record::new().unwrap();
        record.new_segment(SegmentKind::Text, None).unwrap();
        record.segment_mut(SegmentKind::Text, 0).unwrap().set_data_length(5).unwrap();
        let mut source = BufferSource::new();
        source.insert(SegmentKind::Text, 0, b"hello".to_vec());

        let mut bytes = b"PREFIX....".to_vec();
        record.write_to(&mut bytes, &mut source).unwrap();
        let record_len = bytes.len() as u64 - 10;
        bytes.extend_from_slice(b"TRAILER");

        let catalog = TreCatalog::with_builtins();
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(10);
        let back = Record::read_from(&mut cursor, &catalog, &ReadOptions::default()).unwrap();
        assert_eq!(back.stream_offset(), 10);
        assert_eq!(cursor.position(), 10 + record_len);
        assert_eq!(
            back.segment(SegmentKind::Text, 0).unwrap().data_offset(),
            record.segment(SegmentKind::Text, 0).unwrap().data_offset()
        );
        assert_eq!(back.read_segment_data(&mut cursor, SegmentKind::Text, 0).unwrap(), b"hello");

        let mut rewritten = back.clone();
        rewritten.finalize().unwrap();
        assert_eq!(rewritten.stream_offset(), 0);
    }

    #[test]
    fn test_short_source_is_an_error() {
        let (mut record, mut source) = sample();
        source.insert(SegmentKind::Image, 0, vec![0; 15]);
        let err = record.write_to(&mut Vec::new(), &mut source).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_rejects_foreign_data() {
        let catalog = TreCatalog::new();
        let mut cursor = Cursor::new(vec![b'X'; 512]);
        let err = Record::read_from(&mut cursor, &catalog, &ReadOptions::default()).unwrap_err();
        assert!(err.is_parse());

        let mut short = Cursor::new(b"NITF02.10".to_vec());
        let err = Record::read_from(&mut short, &catalog, &ReadOptions::default()).unwrap_err();
        assert!(err.is_parse());
    }
}
