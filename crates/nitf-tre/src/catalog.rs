//! Registry of known TRE layouts.
//!
//! The catalog maps a tag, and optionally a layout id, to a
//! [`DescriptorTable`]. It is a plain value owned by the caller and passed to
//! whatever needs to parse extensions; there is no process-wide instance.
//!
//! # Example
//!
//! ```rust
//! use nitf_tre::TreCatalog;
//!
//! let catalog = TreCatalog::with_builtins();
//! assert!(catalog.contains("ENGRDA"));
//!
//! let tre = catalog.create("ENGRDA").unwrap();
//! assert_eq!(tre.get::<u32>("RECNT").unwrap(), 0);
//!
//! // Unknown tags are not an error at this level
//! assert!(catalog.lookup("NOSUCH", None).is_none());
//! ```

use crate::builtin;
use crate::descriptor::DescriptorTable;
use crate::tre::Tre;
use nitf_core::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CatalogKey {
    tag: String,
    id: Option<String>,
}

/// Table lookup by `(tag, id)`.
#[derive(Debug, Clone, Default)]
pub struct TreCatalog {
    tables: HashMap<CatalogKey, DescriptorTable>,
}

impl TreCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in tables.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for (tag, table) in builtin::tables() {
            catalog.register(tag, None, table);
        }
        debug!(count = catalog.len(), "registered built-in TREs");
        catalog
    }

    /// Registers `table` for `tag` (and `id`, if the tag has variants).
    ///
    /// Replaces an earlier registration of the same key.
    pub fn register(&mut self, tag: &str, id: Option<&str>, table: DescriptorTable) {
        let key = CatalogKey {
            tag: tag.to_string(),
            id: id.map(str::to_string),
        };
        if self.tables.insert(key, table).is_some() {
            warn!(tag, ?id, "replaced TRE table");
        }
    }

    /// Number of registered tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns `true` if any table is registered for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.tables.keys().any(|k| k.tag == tag)
    }

    /// Finds the table for `(tag, id)`.
    ///
    /// With an id, an exact match wins and the id-less table of the tag is the
    /// fallback.
    pub fn lookup(&self, tag: &str, id: Option<&str>) -> Option<&DescriptorTable> {
        let exact = CatalogKey {
            tag: tag.to_string(),
            id: id.map(str::to_string),
        };
        self.tables.get(&exact).or_else(|| {
            id?;
            self.tables.get(&CatalogKey {
                tag: tag.to_string(),
                id: None,
            })
        })
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tables.keys().map(|k| k.tag.as_str()).collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    /// Creates a default-filled TRE of a registered tag.
    pub fn create(&self, tag: &str) -> Result<Tre> {
        self.create_with_id(tag, None)
    }

    /// Creates a default-filled TRE of a registered `(tag, id)`.
    pub fn create_with_id(&self, tag: &str, id: Option<&str>) -> Result<Tre> {
        let table = self
            .lookup(tag, id)
            .ok_or_else(|| Error::schema(format!("no TRE table registered for {}", tag)))?;
        let tre = Tre::new(tag, table.clone())?;
        Ok(match id {
            Some(id) => tre.with_id(id),
            None => tre,
        })
    }

    /// Parses a TRE body with the registered table, or `None` if the tag is
    /// unknown.
    pub fn parse(&self, tag: &str, id: Option<&str>, data: &[u8]) -> Option<Result<Tre>> {
        let table = self.lookup(tag, id)?;
        Some(Tre::parse(tag, id, table.clone(), data))
    }
}
