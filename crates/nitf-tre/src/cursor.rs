//! Lazy expansion of a descriptor table.
//!
//! [`TreCursor`] walks a [`DescriptorTable`] one field at a time. Loop counts,
//! conditions and computed widths are evaluated when the walk reaches them,
//! against the resolver passed to that call of [`TreCursor::iterate`]. A caller
//! can therefore set a count field while iterating and the loop it controls,
//! reached later, repeats the new number of times.
//!
//! [`expand`] runs a cursor to completion.

use crate::descriptor::{DescriptorTable, Entry, FieldSpec, Length};
use crate::expr::{dynamic_key, eval_length, FieldResolver};
use nitf_core::Result;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

/// Loop indices of the current position, outermost first.
pub type LoopIndices = SmallVec<[usize; 4]>;

/// One expanded field position.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Dynamic key, e.g. `X[2]`.
    pub key: String,
    /// Descriptor row that produced the slot.
    pub spec: Arc<FieldSpec>,
    /// Resolved width. `None` for a remainder-width field.
    pub length: Option<usize>,
}

#[derive(Debug, Clone)]
enum FrameKind {
    Plain,
    Loop { index: usize, count: usize },
}

#[derive(Debug, Clone)]
struct Frame {
    table: DescriptorTable,
    pos: usize,
    kind: FrameKind,
}

/// Cursor over the expansion of a descriptor table.
#[derive(Debug, Clone)]
pub struct TreCursor {
    stack: Vec<Frame>,
    visited: usize,
}

impl TreCursor {
    /// Positions a cursor before the first field of `table`.
    pub fn begin(table: &DescriptorTable) -> Self {
        Self {
            stack: vec![Frame {
                table: table.clone(),
                pos: 0,
                kind: FrameKind::Plain,
            }],
            visited: 0,
        }
    }

    /// Number of slots returned so far.
    #[inline]
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Returns `true` if no further slot would be produced.
    ///
    /// Looks ahead on a copy of the cursor. A lookahead that fails counts as
    /// not done; the error surfaces from the next [`iterate`](Self::iterate).
    pub fn is_done<R: FieldResolver + ?Sized>(&self, resolver: &R) -> bool {
        let mut lookahead = self.clone();
        matches!(lookahead.iterate(resolver), Ok(None))
    }

    fn indices(&self) -> LoopIndices {
        self.stack
            .iter()
            .filter_map(|frame| match frame.kind {
                FrameKind::Loop { index, .. } => Some(index),
                FrameKind::Plain => None,
            })
            .collect()
    }

    /// Advances to the next field and returns it, or `None` at the end.
    ///
    /// Fails with a schema error if a loop count, condition or width refers to
    /// a field `resolver` does not have. The cursor does not advance past a
    /// failing entry.
    pub fn iterate<R: FieldResolver + ?Sized>(&mut self, resolver: &R) -> Result<Option<Slot>> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            if frame.pos >= frame.table.len() {
                if let FrameKind::Loop { index, count } = &mut frame.kind {
                    if *index + 1 < *count {
                        *index += 1;
                        frame.pos = 0;
                        continue;
                    }
                }
                self.stack.pop();
                continue;
            }

            let table = frame.table.clone();
            let pos = frame.pos;
            let indices = self.indices();

            match &table.entries()[pos] {
                Entry::Field(spec) => {
                    let length = match &spec.length {
                        Length::Fixed(n) => Some(*n),
                        Length::Computed(expr) => Some(eval_length(expr, resolver, &indices)?),
                        Length::Remainder => None,
                    };
                    self.advance();
                    if matches!(spec.length, Length::Computed(_)) && length == Some(0) {
                        continue;
                    }
                    self.visited += 1;
                    return Ok(Some(Slot {
                        key: dynamic_key(&spec.name, &indices),
                        spec: Arc::clone(spec),
                        length,
                    }));
                }
                Entry::If { condition, body } => {
                    let present = condition.eval(resolver, &indices)?;
                    self.advance();
                    if present && !body.is_empty() {
                        self.stack.push(Frame {
                            table: body.clone(),
                            pos: 0,
                            kind: FrameKind::Plain,
                        });
                    }
                }
                Entry::Loop { count, body } => {
                    let count = count.eval(resolver, &indices)?;
                    self.advance();
                    trace!(count, depth = indices.len(), "enter loop");
                    if count > 0 && !body.is_empty() {
                        self.stack.push(Frame {
                            table: body.clone(),
                            pos: 0,
                            kind: FrameKind::Loop { index: 0, count },
                        });
                    }
                }
            }
        }
    }

    fn advance(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.pos += 1;
        }
    }
}

/// Expands `table` against `resolver` into the ordered list of field slots.
pub fn expand<R: FieldResolver + ?Sized>(table: &DescriptorTable, resolver: &R) -> Result<Vec<Slot>> {
    let mut cursor = TreCursor::begin(table);
    let mut slots = Vec::new();
    while let Some(slot) = cursor.iterate(resolver)? {
        slots.push(slot);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Condition, Count};
    use nitf_core::{Field, FieldKind};
    use std::collections::HashMap;

    fn points_table() -> DescriptorTable {
        DescriptorTable::new()
            .field("COUNT", "count", FieldKind::Numeric, 2)
            .repeat(
                Count::field("COUNT"),
                DescriptorTable::new()
                    .field("X", "x", FieldKind::Numeric, 3)
                    .field("Y", "y", FieldKind::Numeric, 3),
            )
    }

    fn set_num(store: &mut HashMap<String, Field>, key: &str, width: usize, value: i64) {
        let mut f = Field::numeric(width);
        f.set(&value).unwrap();
        store.insert(key.to_string(), f);
    }

    #[test]
    fn test_expand_loop_keys() {
        let mut store = HashMap::new();
        set_num(&mut store, "COUNT", 2, 3);
        let slots = expand(&points_table(), &store).unwrap();
        let keys: Vec<_> = slots.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["COUNT", "X[0]", "Y[0]", "X[1]", "Y[1]", "X[2]", "Y[2]"]);
        let total: usize = slots.iter().filter_map(|s| s.length).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_missing_count_is_schema_error() {
        let store: HashMap<String, Field> = HashMap::new();
        let err = expand(&points_table(), &store).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_count_set_during_iteration() {
        let table = points_table();
        let mut store = HashMap::new();
        let mut cursor = TreCursor::begin(&table);

        let first = cursor.iterate(&store).unwrap().unwrap();
        assert_eq!(first.key, "COUNT");
        set_num(&mut store, "COUNT", 2, 2);

        let mut rest = Vec::new();
        while !cursor.is_done(&store) {
            rest.push(cursor.iterate(&store).unwrap().unwrap().key);
        }
        assert_eq!(rest, ["X[0]", "Y[0]", "X[1]", "Y[1]"]);
        assert_eq!(cursor.visited(), 5);
    }

    #[test]
    fn test_nested_loops_and_conditions() {
        let table = DescriptorTable::new()
            .field("N", "outer", FieldKind::Numeric, 1)
            .repeat(
                Count::field("N"),
                DescriptorTable::new()
                    .field("U", "unit", FieldKind::Alphanumeric, 1)
                    .when(
                        Condition::text_ne("U", ""),
                        DescriptorTable::new().field("V", "value", FieldKind::Numeric, 2),
                    )
                    .field("M", "inner", FieldKind::Numeric, 1)
                    .repeat(
                        Count::field("M"),
                        DescriptorTable::new().field("P", "point", FieldKind::Numeric, 1),
                    ),
            );
        let mut store = HashMap::new();
        set_num(&mut store, "N", 1, 2);
        let mut u0 = Field::alphanumeric(1);
        u0.set("m").unwrap();
        store.insert("U[0]".into(), u0);
        store.insert("U[1]".into(), Field::alphanumeric(1));
        set_num(&mut store, "M[0]", 1, 2);
        set_num(&mut store, "M[1]", 1, 1);

        let keys: Vec<_> = expand(&table, &store).unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            ["N", "U[0]", "V[0]", "M[0]", "P[0][0]", "P[0][1]", "U[1]", "M[1]", "P[1][0]"]
        );
    }

    #[test]
    fn test_computed_width_zero_skips_field() {
        let table = DescriptorTable::new()
            .field("L", "length", FieldKind::Numeric, 2)
            .computed("T", "text", FieldKind::Alphanumeric, "L")
            .remainder("REST", "rest", FieldKind::Binary);
        let mut store = HashMap::new();
        set_num(&mut store, "L", 2, 0);
        let slots = expand(&table, &store).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].key, "REST");
        assert_eq!(slots[1].length, None);

        set_num(&mut store, "L", 2, 5);
        let slots = expand(&table, &store).unwrap();
        assert_eq!(slots[1].length, Some(5));
    }
}
