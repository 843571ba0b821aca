//! Descriptor tables: the data form of a TRE layout.
//!
//! A [`DescriptorTable`] is an ordered list of [`Entry`] values. Each entry is
//! a plain field, a conditional group, or a looped group. Tables are data, so
//! new TRE layouts are added by building a table, not by writing a parser.
//!
//! # Example
//!
//! ```rust
//! use nitf_core::FieldKind;
//! use nitf_tre::descriptor::{Count, DescriptorTable};
//!
//! // COUNT, then COUNT groups of (X, Y)
//! let table = DescriptorTable::new()
//!     .field("COUNT", "Number of points", FieldKind::Numeric, 2)
//!     .repeat(
//!         Count::field("COUNT"),
//!         DescriptorTable::new()
//!             .field("X", "X coordinate", FieldKind::Numeric, 3)
//!             .field("Y", "Y coordinate", FieldKind::Numeric, 3),
//!     );
//!
//! assert_eq!(table.len(), 2);
//! ```
//!
//! Tables are cheap to clone; the entries live behind an [`Arc`].

use nitf_core::FieldKind;
use std::sync::Arc;

pub use crate::expr::{ArithOp, CmpOp, Condition, Count};

/// Width of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Length {
    /// Fixed number of bytes.
    Fixed(usize),
    /// Postfix expression over other fields, e.g. `"ENGDATC ENGDTS *"`.
    ///
    /// A computed width of zero omits the field.
    Computed(String),
    /// All remaining bytes of the TRE body.
    Remainder,
}

/// A single field row of a descriptor table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Short name used to build dynamic keys.
    pub name: String,
    /// Human readable description.
    pub label: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Width rule.
    pub length: Length,
    /// Allowed numeric range, inclusive.
    pub range: Option<(f64, f64)>,
}

impl FieldSpec {
    /// Creates a fixed-width field spec.
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind, length: usize) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            length: Length::Fixed(length),
            range: None,
        }
    }
}

/// One row of a descriptor table.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A single field.
    Field(Arc<FieldSpec>),
    /// A group present only when the condition holds.
    If {
        /// Presence test.
        condition: Condition,
        /// Entries of the group.
        body: DescriptorTable,
    },
    /// A group repeated `count` times.
    Loop {
        /// Trip count.
        count: Count,
        /// Entries repeated per iteration.
        body: DescriptorTable,
    },
}

/// Ordered TRE layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorTable {
    entries: Arc<Vec<Entry>>,
}

impl DescriptorTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout used for TREs without a known table: one `raw_data` field that
    /// takes the whole body.
    pub fn opaque() -> Self {
        Self::new().remainder(crate::OPAQUE_FIELD, "Raw data", FieldKind::Binary)
    }

    /// Entries in order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of top level entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry.
    pub fn push(mut self, entry: Entry) -> Self {
        Arc::make_mut(&mut self.entries).push(entry);
        self
    }

    /// Appends every entry of `other`.
    pub fn extend(mut self, other: DescriptorTable) -> Self {
        Arc::make_mut(&mut self.entries).extend(other.entries.iter().cloned());
        self
    }

    /// Appends a fixed-width field.
    pub fn field(self, name: &str, label: &str, kind: FieldKind, length: usize) -> Self {
        self.push(Entry::Field(Arc::new(FieldSpec::new(name, label, kind, length))))
    }

    /// Appends a fixed-width numeric field with an inclusive value range.
    pub fn ranged(self, name: &str, label: &str, length: usize, min: f64, max: f64) -> Self {
        let mut spec = FieldSpec::new(name, label, FieldKind::Numeric, length);
        spec.range = Some((min, max));
        self.push(Entry::Field(Arc::new(spec)))
    }

    /// Appends a field whose width is a postfix expression over other fields.
    pub fn computed(self, name: &str, label: &str, kind: FieldKind, expr: &str) -> Self {
        let mut spec = FieldSpec::new(name, label, kind, 0);
        spec.length = Length::Computed(expr.to_string());
        self.push(Entry::Field(Arc::new(spec)))
    }

    /// Appends a field that takes the rest of the TRE body.
    pub fn remainder(self, name: &str, label: &str, kind: FieldKind) -> Self {
        let mut spec = FieldSpec::new(name, label, kind, 0);
        spec.length = Length::Remainder;
        self.push(Entry::Field(Arc::new(spec)))
    }

    /// Appends a conditional group.
    pub fn when(self, condition: Condition, body: DescriptorTable) -> Self {
        self.push(Entry::If { condition, body })
    }

    /// Appends a looped group.
    pub fn repeat(self, count: Count, body: DescriptorTable) -> Self {
        self.push(Entry::Loop { count, body })
    }

    /// Finds a field spec by name anywhere in the table.
    pub fn find(&self, name: &str) -> Option<&FieldSpec> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Field(spec) if spec.name == name => Some(spec.as_ref()),
            Entry::Field(_) => None,
            Entry::If { body, .. } | Entry::Loop { body, .. } => body.find(name),
        })
    }

    /// Returns `true` if the table contains a remainder-width field.
    pub fn has_remainder(&self) -> bool {
        self.entries.iter().any(|entry| match entry {
            Entry::Field(spec) => spec.length == Length::Remainder,
            Entry::If { body, .. } | Entry::Loop { body, .. } => body.has_remainder(),
        })
    }
}
