//! Content segments.

use crate::header::{new_subheader, store_extensions};
use crate::kind::SegmentKind;
use nitf_core::{Error, Result};
use nitf_tre::{Extensions, Tre};

/// One segment of a record: its subheader, attached extensions and the
/// location of its data.
///
/// Segments exist only inside a [`Record`](crate::Record); the record assigns
/// sequence numbers and keeps them contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    kind: SegmentKind,
    sequence: usize,
    subheader: Tre,
    user_defined: Extensions,
    extended: Extensions,
    data_offset: u64,
    data_length: u64,
}

impl Segment {
    pub(crate) fn new(kind: SegmentKind, sequence: usize) -> Result<Self> {
        Ok(Self {
            kind,
            sequence,
            subheader: new_subheader(kind)?,
            user_defined: Extensions::new(),
            extended: Extensions::new(),
            data_offset: 0,
            data_length: 0,
        })
    }

    pub(crate) fn from_parts(
        kind: SegmentKind,
        sequence: usize,
        subheader: Tre,
        user_defined: Extensions,
        extended: Extensions,
    ) -> Self {
        Self {
            kind,
            sequence,
            subheader,
            user_defined,
            extended,
            data_offset: 0,
            data_length: 0,
        }
    }

    /// Segment kind.
    #[inline]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Position of the segment among segments of its kind.
    #[inline]
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: usize) {
        self.sequence = sequence;
    }

    /// Subheader fields.
    #[inline]
    pub fn subheader(&self) -> &Tre {
        &self.subheader
    }

    /// Mutable subheader fields.
    #[inline]
    pub fn subheader_mut(&mut self) -> &mut Tre {
        &mut self.subheader
    }

    /// User-defined extensions (image segments only).
    #[inline]
    pub fn user_defined(&self) -> &Extensions {
        &self.user_defined
    }

    /// Mutable user-defined extensions.
    ///
    /// Fails for kinds without a user-defined block.
    pub fn user_defined_mut(&mut self) -> Result<&mut Extensions> {
        if self.kind.user_defined_fields().is_none() {
            return Err(Error::schema(format!("{} segments have no user-defined data", self.kind)));
        }
        Ok(&mut self.user_defined)
    }

    /// Extended subheader extensions.
    #[inline]
    pub fn extended(&self) -> &Extensions {
        &self.extended
    }

    /// Mutable extended subheader extensions.
    ///
    /// Fails for kinds without an extended block.
    pub fn extended_mut(&mut self) -> Result<&mut Extensions> {
        if self.kind.extended_fields().is_none() {
            return Err(Error::schema(format!("{} segments have no extended subheader", self.kind)));
        }
        Ok(&mut self.extended)
    }

    /// Offset of the segment data in the file, valid after finalizing or
    /// reading.
    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub(crate) fn set_data_offset(&mut self, offset: u64) {
        self.data_offset = offset;
    }

    /// Declared data length in bytes.
    #[inline]
    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Declares the data length.
    ///
    /// Fails with a range error if the header field cannot hold it.
    pub fn set_data_length(&mut self, length: u64) -> Result<()> {
        let max = self.kind.max_data_length();
        if length > max {
            return Err(Error::range(format!(
                "{} segment data of {} bytes exceeds {}",
                self.kind, length, max
            )));
        }
        self.data_length = length;
        Ok(())
    }

    /// Copies the extension lists into the subheader fields.
    pub(crate) fn sync_extensions(&mut self) -> Result<()> {
        let mut subheader = self.subheader.clone();
        if let Some(fields) = self.kind.user_defined_fields() {
            store_extensions(&mut subheader, fields, &self.user_defined)?;
        }
        if let Some(fields) = self.kind.extended_fields() {
            store_extensions(&mut subheader, fields, &self.extended)?;
        }
        self.subheader = subheader;
        Ok(())
    }

    /// Encoded subheader length, including attached extensions.
    pub fn subheader_length(&self) -> Result<usize> {
        let mut copy = self.clone();
        copy.sync_extensions()?;
        copy.subheader.current_size()
    }
}
