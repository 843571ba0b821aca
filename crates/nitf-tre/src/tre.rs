//! Tagged record extension instances.
//!
//! A [`Tre`] pairs a descriptor table with the field values set so far. The
//! table decides which keys exist: every accessor re-expands the table
//! against the current values, so lowering a loop count makes the trailing
//! groups unreachable even though their bytes stay in storage.
//!
//! # Example
//!
//! ```rust
//! use nitf_core::FieldKind;
//! use nitf_tre::{Count, DescriptorTable, Tre};
//!
//! let table = DescriptorTable::new()
//!     .field("COUNT", "count", FieldKind::Numeric, 2)
//!     .repeat(
//!         Count::field("COUNT"),
//!         DescriptorTable::new()
//!             .field("X", "x", FieldKind::Numeric, 3)
//!             .field("Y", "y", FieldKind::Numeric, 3),
//!     );
//!
//! let mut tre = Tre::new("POINTS", table).unwrap();
//! tre.set_field("COUNT", &3u32).unwrap();
//! tre.set_field("X[2]", &125u32).unwrap();
//! assert_eq!(tre.current_size().unwrap(), 20);
//!
//! tre.set_field("COUNT", &1u32).unwrap();
//! assert!(tre.get_field("X[2]").unwrap_err().is_schema());
//! ```

use crate::cursor::{expand, Slot, TreCursor};
use crate::descriptor::{DescriptorTable, FieldSpec};
use crate::expr::FieldResolver;
use crate::OPAQUE_FIELD;
use nitf_core::{Error, Field, FieldKind, FromField, Result, ToField};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use tracing::{debug, trace};

/// Ordered field storage keyed by dynamic key.
///
/// Keys keep their first insertion position. Entries are never removed by
/// structural changes; reachability is decided by expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Field)>,
    index: HashMap<String, usize>,
}

impl FieldMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, reachable or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` has stored bytes.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Stored field for `key`.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Stores `field` under `key`, replacing any previous value in place.
    pub fn insert(&mut self, key: String, field: Field) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = field,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, field));
            }
        }
    }

    /// Stored entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f))
    }
}

impl FieldResolver for FieldMap {
    fn resolve(&self, key: &str) -> Option<&Field> {
        self.get(key)
    }
}

/// A tagged record extension.
#[derive(Clone, PartialEq)]
pub struct Tre {
    tag: String,
    id: Option<String>,
    table: DescriptorTable,
    fields: FieldMap,
}

fn default_field(spec: &FieldSpec, length: usize) -> Field {
    Field::new(spec.kind, length)
}

impl Tre {
    /// Creates a TRE with every reachable field at its default value.
    ///
    /// Defaults are zeros for BCS-N, spaces for BCS-A and NULs for binary
    /// fields; remainder-width fields start empty.
    pub fn new(tag: &str, table: DescriptorTable) -> Result<Self> {
        let mut tre = Self {
            tag: tag.to_string(),
            id: None,
            table,
            fields: FieldMap::new(),
        };
        tre.fill_defaults()?;
        Ok(tre)
    }

    /// Creates an opaque TRE holding `data` verbatim.
    pub fn opaque(tag: &str, data: &[u8]) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(
            OPAQUE_FIELD.to_string(),
            Field::from_raw(FieldKind::Binary, data.to_vec()),
        );
        Self {
            tag: tag.to_string(),
            id: None,
            table: DescriptorTable::opaque(),
            fields,
        }
    }

    /// Sets the layout discriminator.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Six character tag.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Layout discriminator, if any.
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Descriptor table in use.
    #[inline]
    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Raw field storage, including unreachable entries.
    #[inline]
    pub fn storage(&self) -> &FieldMap {
        &self.fields
    }

    /// Returns `true` if the TRE uses the opaque one-field layout.
    pub fn is_opaque(&self) -> bool {
        self.table.len() == 1 && self.table.find(OPAQUE_FIELD).is_some()
    }

    /// Starts a cursor over the current expansion.
    pub fn begin(&self) -> TreCursor {
        TreCursor::begin(&self.table)
    }

    /// Current expansion of the table.
    pub fn slots(&self) -> Result<Vec<Slot>> {
        expand(&self.table, &self.fields)
    }

    /// Returns `true` if `key` is produced by the current expansion.
    pub fn is_reachable(&self, key: &str) -> Result<bool> {
        Ok(self.find_slot(key)?.is_some())
    }

    fn find_slot(&self, key: &str) -> Result<Option<Slot>> {
        let mut cursor = self.begin();
        while let Some(slot) = cursor.iterate(&self.fields)? {
            if slot.key == key {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn unreachable(&self, key: &str) -> Error {
        Error::schema(format!("{} has no reachable field {}", self.tag, key))
    }

    /// Returns the field stored under a reachable key.
    pub fn get_field(&self, key: &str) -> Result<&Field> {
        if self.find_slot(key)?.is_none() {
            return Err(self.unreachable(key));
        }
        self.fields.get(key).ok_or_else(|| self.unreachable(key))
    }

    /// Reads a reachable field as `T`.
    pub fn get<T: FromField>(&self, key: &str) -> Result<T> {
        self.get_field(key)?.get()
    }

    /// Formats `value` into a reachable field.
    ///
    /// The key must be reachable under the current values. On success any
    /// fields that become reachable (e.g. after raising a loop count) are
    /// created with defaults. On failure the TRE is unchanged.
    ///
    /// A remainder-width field keeps its stored width here, which is zero on
    /// a new TRE; give it a new width with [`Tre::set_raw_field`].
    pub fn set_field<T: ToField + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let slot = self.find_slot(key)?.ok_or_else(|| self.unreachable(key))?;
        let mut field = self.slot_field(&slot);
        if let Err(e) = field.set(value) {
            if slot.length.is_none() && e.is_range() {
                return Err(Error::range(format!(
                    "{} is remainder-width with {} bytes stored, set it with raw bytes: {}",
                    key,
                    field.len(),
                    e
                )));
            }
            return Err(e);
        }
        self.commit(key, field)
    }

    /// Copies raw bytes into a reachable field.
    ///
    /// A remainder-width field takes the length of `data`; other fields pad or
    /// reject per [`Field::set_raw`].
    pub fn set_raw_field(&mut self, key: &str, data: &[u8]) -> Result<()> {
        let slot = self.find_slot(key)?.ok_or_else(|| self.unreachable(key))?;
        let field = match slot.length {
            None => Field::from_raw(slot.spec.kind, data.to_vec()),
            Some(_) => {
                let mut field = self.slot_field(&slot);
                field.set_raw(data)?;
                field
            }
        };
        self.commit(key, field)
    }

    /// Current field for `slot`, or a default one of the slot width.
    fn slot_field(&self, slot: &Slot) -> Field {
        match (self.fields.get(&slot.key), slot.length) {
            (Some(existing), None) => existing.clone(),
            (Some(existing), Some(n)) if existing.len() == n => existing.clone(),
            (_, Some(n)) => default_field(&slot.spec, n),
            (None, None) => default_field(&slot.spec, 0),
        }
    }

    fn commit(&mut self, key: &str, field: Field) -> Result<()> {
        let snapshot = self.fields.clone();
        self.fields.insert(key.to_string(), field);
        if let Err(e) = self.fill_defaults() {
            self.fields = snapshot;
            return Err(e);
        }
        trace!(tag = %self.tag, key, "set field");
        Ok(())
    }

    /// Gives every reachable slot a stored field of the slot width.
    fn fill_defaults(&mut self) -> Result<()> {
        let mut cursor = TreCursor::begin(&self.table);
        while let Some(slot) = cursor.iterate(&self.fields)? {
            let replace = match (self.fields.get(&slot.key), slot.length) {
                (None, _) => true,
                (Some(existing), Some(n)) => existing.len() != n,
                (Some(_), None) => false,
            };
            if replace {
                let field = match (self.fields.get(&slot.key), slot.length) {
                    (Some(existing), Some(n)) => {
                        let mut resized = existing.clone();
                        resized.resize(n);
                        resized
                    }
                    (_, length) => default_field(&slot.spec, length.unwrap_or(0)),
                };
                self.fields.insert(slot.key, field);
            }
        }
        Ok(())
    }

    /// Reachable fields in expansion order.
    pub fn fields(&self) -> Result<Vec<(String, &Field)>> {
        self.slots()?
            .into_iter()
            .map(|slot| {
                let field = self.fields.get(&slot.key).ok_or_else(|| self.unreachable(&slot.key))?;
                Ok((slot.key, field))
            })
            .collect()
    }

    /// Serialized body length: the sum of the widths of the reachable fields.
    ///
    /// A remainder-width field counts its stored length.
    pub fn current_size(&self) -> Result<usize> {
        let mut size = 0usize;
        let mut cursor = self.begin();
        while let Some(slot) = cursor.iterate(&self.fields)? {
            size += match slot.length {
                Some(n) => n,
                None => self.fields.get(&slot.key).map_or(0, Field::len),
            };
        }
        Ok(size)
    }

    /// Returns `true` if every reachable key has a field of the right width.
    pub fn is_sane(&self) -> bool {
        let Ok(slots) = self.slots() else {
            return false;
        };
        slots.iter().all(|slot| match (self.fields.get(&slot.key), slot.length) {
            (Some(field), Some(n)) => field.len() == n,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Checks sanity and the declared value ranges of numeric fields.
    pub fn validate(&self) -> Result<()> {
        for slot in self.slots()? {
            let field = self.fields.get(&slot.key).ok_or_else(|| self.unreachable(&slot.key))?;
            if slot.length.is_some_and(|n| n != field.len()) {
                return Err(Error::schema(format!(
                    "{} field {} has width {}, expected {}",
                    self.tag,
                    slot.key,
                    field.len(),
                    slot.length.unwrap_or_default()
                )));
            }
            if let Some((min, max)) = slot.spec.range {
                let value: f64 = field.get()?;
                if value < min || value > max {
                    return Err(Error::range(format!(
                        "{} field {} value {} outside [{}, {}]",
                        self.tag, slot.key, value, min, max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parses a TRE body.
    ///
    /// Fields are read in expansion order; counts and conditions see the
    /// values parsed before them. A body that ends early or has bytes left
    /// over is a parse error.
    pub fn parse(tag: &str, id: Option<&str>, table: DescriptorTable, data: &[u8]) -> Result<Self> {
        let mut fields = FieldMap::new();
        let mut cursor = TreCursor::begin(&table);
        let mut offset = 0usize;
        while let Some(slot) = cursor.iterate(&fields)? {
            let remaining = data.len() - offset;
            let length = slot.length.unwrap_or(remaining);
            if length > remaining {
                return Err(Error::parse(format!(
                    "{} data ends inside {}: need {} bytes, {} left",
                    tag, slot.key, length, remaining
                )));
            }
            let mut raw = nitf_core::try_alloc(length)?;
            raw.copy_from_slice(&data[offset..offset + length]);
            offset += length;
            fields.insert(slot.key, Field::from_raw(slot.spec.kind, raw));
        }
        if offset != data.len() {
            return Err(Error::parse(format!(
                "{} data is longer than it should be ({} of {} bytes used)",
                tag,
                offset,
                data.len()
            )));
        }
        debug!(tag, fields = fields.len(), bytes = data.len(), "parsed TRE");
        Ok(Self {
            tag: tag.to_string(),
            id: id.map(str::to_string),
            table,
            fields,
        })
    }

    /// Reads fields from a stream, pulling exactly as many bytes as the
    /// expansion asks for.
    ///
    /// Used for headers, whose total length is only known once they have
    /// been read. Remainder-width fields cannot be read this way.
    pub fn read_from<R: Read + ?Sized>(tag: &str, table: DescriptorTable, reader: &mut R) -> Result<Self> {
        let mut fields = FieldMap::new();
        let mut cursor = TreCursor::begin(&table);
        let mut consumed = 0usize;
        while let Some(slot) = cursor.iterate(&fields)? {
            let length = slot.length.ok_or_else(|| {
                Error::parse(format!("{} field {} has no fixed width in a stream", tag, slot.key))
            })?;
            let mut raw = nitf_core::try_alloc(length)?;
            reader.read_exact(&mut raw).map_err(|e| {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    Error::parse(format!("{} ends inside {} at byte {}", tag, slot.key, consumed))
                } else {
                    Error::Io(e)
                }
            })?;
            consumed += length;
            fields.insert(slot.key, Field::from_raw(slot.spec.kind, raw));
        }
        trace!(tag, bytes = consumed, "read fields from stream");
        Ok(Self {
            tag: tag.to_string(),
            id: None,
            table,
            fields,
        })
    }

    /// Serializes the reachable fields in expansion order.
    ///
    /// The output length equals [`current_size`](Self::current_size).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.current_size()?);
        for (_, field) in self.fields()? {
            out.extend_from_slice(field.raw());
        }
        Ok(out)
    }

    /// Body of an opaque TRE.
    pub fn raw_data(&self) -> Option<&[u8]> {
        if self.is_opaque() {
            self.fields.get(OPAQUE_FIELD).map(Field::raw)
        } else {
            None
        }
    }
}

impl fmt::Debug for Tre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tre")
            .field("tag", &self.tag)
            .field("id", &self.id)
            .field("fields", &self.fields.len())
            .finish()
    }
}
