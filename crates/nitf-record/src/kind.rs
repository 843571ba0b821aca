//! Segment kinds and the header fields that describe each of them.

use std::fmt;

/// Width of a component-info length field pair: (subheader, data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoWidths {
    /// Digits of the subheader length field.
    pub subheader: usize,
    /// Digits of the data length field.
    pub data: usize,
}

/// Kind of content segment.
///
/// Variants are listed in file order: segments of a kind are stored after
/// all segments of the kinds before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentKind {
    /// Image segment (`IM`).
    Image,
    /// Graphic segment (`SY`).
    Graphic,
    /// Label segment (`LA`).
    Label,
    /// Text segment (`TE`).
    Text,
    /// Data extension segment (`DE`).
    DataExtension,
    /// Reserved extension segment (`RE`).
    ReservedExtension,
}

impl SegmentKind {
    /// All kinds in file order.
    pub const ALL: [SegmentKind; 6] = [
        SegmentKind::Image,
        SegmentKind::Graphic,
        SegmentKind::Label,
        SegmentKind::Text,
        SegmentKind::DataExtension,
        SegmentKind::ReservedExtension,
    ];

    /// Position in [`ALL`](Self::ALL).
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            SegmentKind::Image => "image",
            SegmentKind::Graphic => "graphic",
            SegmentKind::Label => "label",
            SegmentKind::Text => "text",
            SegmentKind::DataExtension => "data extension",
            SegmentKind::ReservedExtension => "reserved extension",
        }
    }

    /// Two character subheader marker (`IM`, `SY`, ...).
    pub fn marker(&self) -> &'static str {
        match self {
            SegmentKind::Image => "IM",
            SegmentKind::Graphic => "SY",
            SegmentKind::Label => "LA",
            SegmentKind::Text => "TE",
            SegmentKind::DataExtension => "DE",
            SegmentKind::ReservedExtension => "RE",
        }
    }

    /// File header field holding the number of segments of this kind.
    pub fn count_field(&self) -> &'static str {
        match self {
            SegmentKind::Image => "NUMI",
            SegmentKind::Graphic => "NUMS",
            SegmentKind::Label => "NUMX",
            SegmentKind::Text => "NUMT",
            SegmentKind::DataExtension => "NUMDES",
            SegmentKind::ReservedExtension => "NUMRES",
        }
    }

    /// File header fields holding the per-segment (subheader, data) lengths.
    pub fn info_fields(&self) -> (&'static str, &'static str) {
        match self {
            SegmentKind::Image => ("LISH", "LI"),
            SegmentKind::Graphic => ("LSSH", "LS"),
            SegmentKind::Label => ("LLSH", "LL"),
            SegmentKind::Text => ("LTSH", "LT"),
            SegmentKind::DataExtension => ("LDSH", "LD"),
            SegmentKind::ReservedExtension => ("LRESH", "LRE"),
        }
    }

    /// Widths of the component-info fields.
    pub fn info_widths(&self) -> InfoWidths {
        let (subheader, data) = match self {
            SegmentKind::Image => (6, 10),
            SegmentKind::Graphic => (4, 6),
            SegmentKind::Label => (4, 3),
            SegmentKind::Text => (4, 5),
            SegmentKind::DataExtension => (4, 9),
            SegmentKind::ReservedExtension => (4, 7),
        };
        InfoWidths { subheader, data }
    }

    /// Largest data length the header can record for one segment.
    pub fn max_data_length(&self) -> u64 {
        match self {
            SegmentKind::Image => nitf_core::NUM_BYTES_MAX,
            _ => 10u64.pow(self.info_widths().data as u32) - 1,
        }
    }

    /// Subheader fields `(length, overflow, data)` of the user-defined
    /// extension block, for kinds that have one.
    pub fn user_defined_fields(&self) -> Option<(&'static str, &'static str, &'static str)> {
        match self {
            SegmentKind::Image => Some(("UDIDL", "UDOFL", "UDID")),
            _ => None,
        }
    }

    /// Subheader fields `(length, overflow, data)` of the extended extension
    /// block, for kinds that have one.
    pub fn extended_fields(&self) -> Option<(&'static str, &'static str, &'static str)> {
        match self {
            SegmentKind::Image => Some(("IXSHDL", "IXSOFL", "IXSHD")),
            SegmentKind::Graphic => Some(("SXSHDL", "SXSOFL", "SXSHD")),
            SegmentKind::Label => Some(("LXSHDL", "LXSOFL", "LXSHD")),
            SegmentKind::Text => Some(("TXSHDL", "TXSOFL", "TXSHD")),
            SegmentKind::DataExtension | SegmentKind::ReservedExtension => None,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_order() {
        for (i, kind) in SegmentKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert!(SegmentKind::Image < SegmentKind::ReservedExtension);
    }

    #[test]
    fn test_max_data_length() {
        assert_eq!(SegmentKind::Image.max_data_length(), 9_999_999_998);
        assert_eq!(SegmentKind::Text.max_data_length(), 99_999);
        assert_eq!(SegmentKind::Label.max_data_length(), 999);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(SegmentKind::Label.count_field(), "NUMX");
        assert_eq!(SegmentKind::ReservedExtension.info_fields(), ("LRESH", "LRE"));
        assert!(SegmentKind::DataExtension.extended_fields().is_none());
        assert_eq!(SegmentKind::Text.to_string(), "text");
    }
}
