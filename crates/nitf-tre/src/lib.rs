//! # nitf-tre
//!
//! Tagged record extensions (TREs) driven by data-form layouts.
//!
//! - [`DescriptorTable`] - Ordered layout: fields, conditional groups, loops
//! - [`TreCursor`], [`expand`] - Lazy and eager expansion against field values
//! - [`Tre`] - A TRE instance with reachability-checked get/set
//! - [`TreCatalog`] - Explicit `(tag, id) -> table` registry
//! - [`Extensions`] - Ordered TRE list and its `TAG LENGTH BODY` encoding
//!
//! ## Dynamic keys
//!
//! A field inside loops is addressed by its name followed by one bracketed
//! zero-based index per enclosing loop: `LAT[0][1]` is `LAT` of point 1 of
//! region 0. Which keys exist depends on the current values of the count and
//! condition fields, and is recomputed on every access.
//!
//! ```rust
//! use nitf_tre::TreCatalog;
//!
//! let catalog = TreCatalog::with_builtins();
//! let mut tre = catalog.create("ACCHZB").unwrap();
//! tre.set_field("NUMACHZ", &1u8).unwrap();
//! tre.set_field("NUMPTS[0]", &2u8).unwrap();
//! tre.set_field("LAT[0][1]", "+45.0").unwrap();
//! assert!(tre.get_field("LAT[0][2]").unwrap_err().is_schema());
//! ```

#![warn(missing_docs)]

pub mod builtin;
pub mod catalog;
pub mod cursor;
pub mod descriptor;
pub mod expr;
pub mod extensions;
pub mod tre;

pub use catalog::TreCatalog;
pub use cursor::{expand, LoopIndices, Slot, TreCursor};
pub use descriptor::{DescriptorTable, Entry, FieldSpec, Length};
pub use expr::{dynamic_key, ArithOp, CmpOp, Condition, Count, FieldResolver, Test};
pub use extensions::{encode_tre, Extensions};
pub use tre::{FieldMap, Tre};

/// Name of the single field of an opaque TRE.
pub const OPAQUE_FIELD: &str = "raw_data";
