//! Structural expressions: loop counts, presence conditions, computed widths.
//!
//! All three look up other fields through a [`FieldResolver`]. A reference
//! made from inside a loop resolves the plain name first, then the name
//! qualified with the enclosing loop indices one level at a time
//! (`NAME`, `NAME[i]`, `NAME[i][j]`, ...). This lets a group refer both to
//! header fields outside the loop and to its own siblings.

use nitf_core::{Error, Field, FieldKind, Result};
use std::collections::HashMap;
use std::fmt;

/// Lookup of already-set field values by dynamic key.
pub trait FieldResolver {
    /// Returns the field stored under `key`, if any.
    fn resolve(&self, key: &str) -> Option<&Field>;
}

impl FieldResolver for HashMap<String, Field> {
    fn resolve(&self, key: &str) -> Option<&Field> {
        self.get(key)
    }
}

/// Builds the dynamic key `name[i][j]...`.
pub fn dynamic_key(name: &str, indices: &[usize]) -> String {
    let mut key = String::with_capacity(name.len() + indices.len() * 4);
    key.push_str(name);
    for index in indices {
        key.push('[');
        key.push_str(&index.to_string());
        key.push(']');
    }
    key
}

/// Resolves a reference from a loop context of `indices`.
pub fn resolve_ref<'a, R: FieldResolver + ?Sized>(
    resolver: &'a R,
    name: &str,
    indices: &[usize],
) -> Option<&'a Field> {
    (0..=indices.len()).find_map(|depth| resolver.resolve(&dynamic_key(name, &indices[..depth])))
}

fn require_ref<'a, R: FieldResolver + ?Sized>(
    resolver: &'a R,
    name: &str,
    indices: &[usize],
) -> Result<&'a Field> {
    resolve_ref(resolver, name, indices).ok_or_else(|| {
        Error::schema(format!(
            "reference {} is not set",
            dynamic_key(name, indices)
        ))
    })
}

// === Arithmetic ===

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl ArithOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            "%" => Some(ArithOp::Rem),
            _ => None,
        }
    }

    /// Applies the operator. Division or remainder by zero is a schema error.
    pub fn apply(&self, lhs: i64, rhs: i64) -> Result<i64> {
        let value = match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
            ArithOp::Div | ArithOp::Rem if rhs == 0 => {
                return Err(Error::schema("division by zero in structural expression"));
            }
            ArithOp::Div => lhs.checked_div(rhs),
            ArithOp::Rem => lhs.checked_rem(rhs),
        };
        value.ok_or_else(|| Error::schema("overflow in structural expression"))
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        };
        f.write_str(s)
    }
}

fn integer_value(field: &Field, name: &str) -> Result<i64> {
    field.get::<i64>().map_err(|e| {
        Error::schema(format!("structural field {} is not an integer: {}", name, e))
    })
}

// === Loop counts ===

/// Trip count of a looped group.
#[derive(Debug, Clone, PartialEq)]
pub enum Count {
    /// Fixed number of iterations.
    Constant(usize),
    /// Value of another field, optionally adjusted by one operation.
    Field {
        /// Referenced field name.
        name: String,
        /// Adjustment applied to the field value, e.g. `(Div, 2)`.
        modifier: Option<(ArithOp, i64)>,
    },
}

impl Count {
    /// Count taken from the field `name`.
    pub fn field(name: &str) -> Self {
        Count::Field {
            name: name.to_string(),
            modifier: None,
        }
    }

    /// Count taken from `name` and adjusted, e.g. `Count::modified("N", ArithOp::Add, 1)`.
    pub fn modified(name: &str, op: ArithOp, operand: i64) -> Self {
        Count::Field {
            name: name.to_string(),
            modifier: Some((op, operand)),
        }
    }

    /// Parses a field reference and an optional modifier such as `"/ 2"`.
    pub fn parse(name: &str, modifier: &str) -> Result<Self> {
        let modifier = modifier.trim();
        if modifier.is_empty() {
            return Ok(Count::field(name));
        }
        let (op, operand) = modifier.split_at(1);
        let op = ArithOp::from_token(op)
            .ok_or_else(|| Error::schema(format!("invalid loop count modifier '{}'", modifier)))?;
        let operand: i64 = operand
            .trim()
            .parse()
            .map_err(|_| Error::schema(format!("invalid loop count modifier '{}'", modifier)))?;
        Ok(Count::modified(name, op, operand))
    }

    /// Evaluates the count. Negative results clamp to zero.
    pub fn eval<R: FieldResolver + ?Sized>(&self, resolver: &R, indices: &[usize]) -> Result<usize> {
        match self {
            Count::Constant(n) => Ok(*n),
            Count::Field { name, modifier } => {
                let field = require_ref(resolver, name, indices)?;
                let mut value = integer_value(field, name)?;
                if let Some((op, operand)) = modifier {
                    value = op.apply(value, *operand)?;
                }
                Ok(usize::try_from(value.max(0)).unwrap_or(usize::MAX))
            }
        }
    }
}

// === Conditions ===

/// Comparison operator for numeric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl CmpOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(CmpOp::Lt),
            ">" => Some(CmpOp::Gt),
            "<=" => Some(CmpOp::Le),
            ">=" => Some(CmpOp::Ge),
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            _ => None,
        }
    }

    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

/// The test a condition applies to its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Text equality, for BCS-A fields. Padding is ignored.
    TextEq(String),
    /// Text inequality, for BCS-A fields. Padding is ignored.
    TextNe(String),
    /// Numeric comparison, for BCS-N fields.
    Compare(CmpOp, f64),
    /// Any of the mask bits set, for binary fields.
    Mask(u64),
}

/// Presence test of a conditional group.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Referenced field name.
    pub field: String,
    /// Test applied to the field value.
    pub test: Test,
}

impl Condition {
    /// `field` equals `value`.
    pub fn text_eq(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            test: Test::TextEq(value.to_string()),
        }
    }

    /// `field` differs from `value`.
    pub fn text_ne(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            test: Test::TextNe(value.to_string()),
        }
    }

    /// Numeric comparison of `field` against `value`.
    pub fn compare(field: &str, op: CmpOp, value: f64) -> Self {
        Self {
            field: field.to_string(),
            test: Test::Compare(op, value),
        }
    }

    /// Bit test of a binary `field` against `mask`.
    pub fn mask(field: &str, mask: u64) -> Self {
        Self {
            field: field.to_string(),
            test: Test::Mask(mask),
        }
    }

    /// Parses the textual form `"<op> <operand>"`.
    ///
    /// Operators are `eq`/`ne` (text), `< > <= >= == !=` (numeric) and `&`
    /// (bit mask, decimal or `0x` hex operand).
    pub fn parse(field: &str, expr: &str) -> Result<Self> {
        let invalid = || Error::schema(format!("invalid condition '{}' on {}", expr, field));
        let (op, operand) = match expr.split_once(' ') {
            Some((op, rest)) => (op, rest),
            None => (expr, ""),
        };
        let test = match op {
            "eq" => Test::TextEq(operand.to_string()),
            "ne" => Test::TextNe(operand.to_string()),
            "&" => {
                let operand = operand.trim();
                let mask = match operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => operand.parse(),
                };
                Test::Mask(mask.map_err(|_| invalid())?)
            }
            _ => {
                let cmp = CmpOp::from_token(op).ok_or_else(invalid)?;
                let value: f64 = operand.trim().parse().map_err(|_| invalid())?;
                Test::Compare(cmp, value)
            }
        };
        Ok(Self {
            field: field.to_string(),
            test,
        })
    }

    /// Evaluates the condition.
    ///
    /// An unset reference or an operator that does not match the field kind
    /// is a schema error.
    pub fn eval<R: FieldResolver + ?Sized>(&self, resolver: &R, indices: &[usize]) -> Result<bool> {
        let field = require_ref(resolver, &self.field, indices)?;
        let wrong_kind = |family: &str| {
            Error::schema(format!(
                "{} condition on {} field {}",
                family,
                field.kind().name(),
                self.field
            ))
        };
        match &self.test {
            Test::TextEq(value) | Test::TextNe(value) => {
                if field.kind() == FieldKind::Numeric {
                    return Err(wrong_kind("text"));
                }
                let text = String::from_utf8_lossy(field.raw());
                let equal = text.trim() == value.trim();
                Ok(matches!(self.test, Test::TextEq(_)) == equal)
            }
            Test::Compare(op, value) => {
                if field.kind() != FieldKind::Numeric {
                    return Err(wrong_kind("numeric"));
                }
                let lhs = field.get::<f64>().map_err(|e| {
                    Error::schema(format!("condition field {} is not a number: {}", self.field, e))
                })?;
                Ok(op.holds(lhs, *value))
            }
            Test::Mask(mask) => {
                if field.kind() != FieldKind::Binary {
                    return Err(wrong_kind("mask"));
                }
                let bits = field.get::<u64>().map_err(|e| {
                    Error::schema(format!("mask field {} is not an integer: {}", self.field, e))
                })?;
                Ok(bits & mask != 0)
            }
        }
    }
}

// === Computed widths ===

/// Evaluates a postfix width expression such as `"ENGDATC ENGDTS *"`.
///
/// Tokens are integers, field references and the operators `+ - * / %`.
/// Negative results clamp to zero.
pub fn eval_length<R: FieldResolver + ?Sized>(
    expr: &str,
    resolver: &R,
    indices: &[usize],
) -> Result<usize> {
    let mut stack: Vec<i64> = Vec::with_capacity(4);
    for token in expr.split_whitespace() {
        if let Some(op) = ArithOp::from_token(token) {
            let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
                return Err(Error::schema(format!("malformed width expression '{}'", expr)));
            };
            stack.push(op.apply(lhs, rhs)?);
        } else if let Ok(value) = token.parse::<i64>() {
            stack.push(value);
        } else {
            let field = require_ref(resolver, token, indices)?;
            stack.push(integer_value(field, token)?);
        }
    }
    match stack.as_slice() {
        [value] => Ok(usize::try_from((*value).max(0)).unwrap_or(usize::MAX)),
        _ => Err(Error::schema(format!("malformed width expression '{}'", expr))),
    }
}
