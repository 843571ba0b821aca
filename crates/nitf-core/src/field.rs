//! Fixed-width header fields.
//!
//! Every value in a NITF header, subheader or tagged record extension is a
//! [`Field`]: a byte string of a declared width with a kind that decides how
//! values are formatted into it and parsed out of it.
//!
//! # Kinds
//!
//! | Kind | Charset | Justification | Pad |
//! |------|---------|---------------|-----|
//! | [`FieldKind::Alphanumeric`] (BCS-A) | `0x20..=0x7E` | left | space |
//! | [`FieldKind::Numeric`] (BCS-N) | digits, sign, `.`, `-`, `/` | right | `0` |
//! | [`FieldKind::Binary`] | any | left | NUL |
//!
//! # Invariant
//!
//! `field.raw().len() == field.len()` at all times. Setters format the
//! complete new byte string first and commit it only if it fits, so a failed
//! set never leaves a partially written field. Width changes happen only
//! through [`Field::resize`].
//!
//! # Usage
//!
//! ```rust
//! use nitf_core::{Field, FieldKind};
//!
//! let mut count = Field::numeric(3);
//! count.set(&7u32).unwrap();
//! assert_eq!(count.raw(), b"007");
//! assert_eq!(count.get::<u32>().unwrap(), 7);
//!
//! // Too wide for the field
//! assert!(count.set(&1234u32).unwrap_err().is_range());
//!
//! let mut title = Field::alphanumeric(8);
//! title.set("abc").unwrap();
//! assert_eq!(title.raw(), b"abc     ");
//! assert_eq!(title.kind(), FieldKind::Alphanumeric);
//! ```

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use chrono::NaiveDateTime;
use std::fmt;

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Basic character set, alphanumeric (BCS-A).
    Alphanumeric,
    /// Basic character set, numeric (BCS-N).
    Numeric,
    /// Raw bytes; integers are big-endian.
    Binary,
}

impl FieldKind {
    /// Returns the default justification for this kind.
    #[inline]
    pub fn justification(&self) -> Justification {
        match self {
            FieldKind::Numeric => Justification::Right,
            FieldKind::Alphanumeric | FieldKind::Binary => Justification::Left,
        }
    }

    /// Returns the default pad byte for this kind.
    #[inline]
    pub fn pad_byte(&self) -> u8 {
        match self {
            FieldKind::Alphanumeric => b' ',
            FieldKind::Numeric => b'0',
            FieldKind::Binary => 0,
        }
    }

    /// Short name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Alphanumeric => "BCS-A",
            FieldKind::Numeric => "BCS-N",
            FieldKind::Binary => "binary",
        }
    }
}

/// Side of the field that keeps the value when padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Justification {
    /// Value first, padding after.
    Left,
    /// Padding first, value after.
    Right,
}

/// Text layout for [`Field::set_real`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealFormat {
    /// Plain decimal, e.g. `12.3450`.
    #[default]
    Fixed,
    /// Exponent with lowercase marker, e.g. `1.2345e+01`.
    Exponential,
    /// Exponent with uppercase marker, e.g. `1.2345E+01`.
    ExponentialUpper,
}

/// A fixed-width header value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Field {
    raw: Vec<u8>,
    kind: FieldKind,
    justification: Justification,
    pad: u8,
}

impl Field {
    /// Creates a field of `length` bytes filled with the kind's pad byte.
    pub fn new(kind: FieldKind, length: usize) -> Self {
        Self {
            raw: vec![kind.pad_byte(); length],
            kind,
            justification: kind.justification(),
            pad: kind.pad_byte(),
        }
    }

    /// Creates a BCS-A field.
    #[inline]
    pub fn alphanumeric(length: usize) -> Self {
        Self::new(FieldKind::Alphanumeric, length)
    }

    /// Creates a BCS-N field.
    #[inline]
    pub fn numeric(length: usize) -> Self {
        Self::new(FieldKind::Numeric, length)
    }

    /// Creates a binary field.
    #[inline]
    pub fn binary(length: usize) -> Self {
        Self::new(FieldKind::Binary, length)
    }

    /// Wraps bytes read from a stream. The field width is `raw.len()`.
    pub fn from_raw(kind: FieldKind, raw: Vec<u8>) -> Self {
        Self {
            raw,
            kind,
            justification: kind.justification(),
            pad: kind.pad_byte(),
        }
    }

    /// Overrides the justification and pad byte.
    pub fn with_justification(mut self, justification: Justification, pad: u8) -> Self {
        self.justification = justification;
        self.pad = pad;
        self
    }

    /// Declared width in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` for a zero-width field.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Field kind.
    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Justification used when padding.
    #[inline]
    pub fn justification(&self) -> Justification {
        self.justification
    }

    /// Pad byte used when padding.
    #[inline]
    pub fn pad_char(&self) -> u8 {
        self.pad
    }

    /// Raw bytes, exactly [`len`](Self::len) long.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the content as text with padding spaces removed.
    pub fn trimmed(&self) -> Result<String> {
        let text = std::str::from_utf8(&self.raw)
            .map_err(|_| Error::conversion(format!("{} field is not valid text", self.kind.name())))?;
        Ok(text.trim().to_string())
    }

    /// Reads the value as `T`.
    ///
    /// Fails with [`Error::Conversion`] when the content cannot represent `T`.
    #[inline]
    pub fn get<T: FromField>(&self) -> Result<T> {
        T::from_field(self)
    }

    /// Formats `value` into the field.
    ///
    /// Fails with [`Error::Range`] if the formatted value is wider than the
    /// field and with [`Error::Conversion`] if it contains characters the
    /// field kind does not allow. The field is untouched on failure.
    pub fn set<T: ToField + ?Sized>(&mut self, value: &T) -> Result<()> {
        let bytes = value.to_field_bytes(self)?;
        self.commit(bytes);
        Ok(())
    }

    /// Copies raw bytes into the field.
    ///
    /// Data of exactly the field width is copied verbatim. Shorter text is
    /// padded per the field's justification; shorter binary data and longer
    /// data of any kind are rejected with [`Error::Range`].
    pub fn set_raw(&mut self, data: &[u8]) -> Result<()> {
        if data.len() == self.len() {
            self.raw.copy_from_slice(data);
            return Ok(());
        }
        if self.kind == FieldKind::Binary && data.len() < self.len() {
            return Err(Error::range(format!(
                "binary field of length {} given {} bytes",
                self.len(),
                data.len()
            )));
        }
        let bytes = self.pad_to_width(data)?;
        self.commit(bytes);
        Ok(())
    }

    /// Changes the declared width.
    ///
    /// Left-justified fields keep their leading bytes, right-justified fields
    /// keep their trailing bytes; new space is filled with the pad byte.
    pub fn resize(&mut self, new_length: usize) {
        let old = self.raw.len();
        if new_length == old {
            return;
        }
        match self.justification {
            Justification::Left => self.raw.resize(new_length, self.pad),
            Justification::Right => {
                if new_length < old {
                    self.raw.drain(..old - new_length);
                } else {
                    let mut bytes = vec![self.pad; new_length - old];
                    bytes.extend_from_slice(&self.raw);
                    self.raw = bytes;
                }
            }
        }
    }

    /// Stores a floating value, dropping decimal places until it fits.
    ///
    /// `plus` forces a leading `+` on non-negative values. Fails with
    /// [`Error::Range`] if the integral part alone is wider than the field.
    pub fn set_real(&mut self, value: f64, format: RealFormat, plus: bool) -> Result<()> {
        if self.kind == FieldKind::Binary {
            return Err(Error::conversion("real value set on binary field"));
        }
        if !value.is_finite() {
            return Err(Error::conversion(format!("cannot store {} in a text field", value)));
        }
        let width = self.len();
        let mut precision = width;
        let mut text = format_real(value, format, precision, plus);
        if text.len() > width {
            precision = precision.saturating_sub(text.len() - width);
            text = format_real(value, format, precision, plus);
        }
        if text.len() > width {
            return Err(Error::range(format!(
                "{} does not fit in {} characters",
                text, width
            )));
        }
        let bytes = self.pad_to_width(text.as_bytes())?;
        self.commit(bytes);
        Ok(())
    }

    /// Stores a date-time formatted with a `chrono` format string.
    pub fn set_date_time(&mut self, value: &NaiveDateTime, format: &str) -> Result<()> {
        if self.kind == FieldKind::Binary {
            return Err(Error::conversion("date set on binary field"));
        }
        let text = value.format(format).to_string();
        if text.len() > self.len() {
            return Err(Error::range(format!(
                "date '{}' does not fit in {} characters",
                text,
                self.len()
            )));
        }
        let bytes = self.pad_to_width(text.as_bytes())?;
        self.commit(bytes);
        Ok(())
    }

    /// Parses the content as a date-time with a `chrono` format string.
    pub fn date_time(&self, format: &str) -> Result<NaiveDateTime> {
        if self.kind == FieldKind::Binary {
            return Err(Error::conversion("date read from binary field"));
        }
        let text = self.trimmed()?;
        NaiveDateTime::parse_from_str(&text, format)
            .map_err(|e| Error::conversion(format!("'{}' is not a date ({}): {}", text, format, e)))
    }

    /// Builds the full-width representation of `data` without committing it.
    fn pad_to_width(&self, data: &[u8]) -> Result<Vec<u8>> {
        let width = self.len();
        if data.len() > width {
            return Err(Error::range(format!(
                "value of {} bytes is too long for {} field of length {}",
                data.len(),
                self.kind.name(),
                width
            )));
        }
        let fill = width - data.len();
        let mut bytes = Vec::with_capacity(width);
        match self.justification {
            Justification::Left => {
                bytes.extend_from_slice(data);
                bytes.resize(width, self.pad);
            }
            Justification::Right => {
                // A sign stays in front of zero padding: "-5" -> "-005".
                let signed = self.pad == b'0'
                    && matches!(data.first(), Some(b'+') | Some(b'-'));
                if signed {
                    bytes.push(data[0]);
                    bytes.resize(1 + fill, self.pad);
                    bytes.extend_from_slice(&data[1..]);
                } else {
                    bytes.resize(fill, self.pad);
                    bytes.extend_from_slice(data);
                }
            }
        }
        Ok(bytes)
    }

    fn commit(&mut self, bytes: Vec<u8>) {
        debug_assert_eq!(bytes.len(), self.raw.len());
        self.raw = bytes;
    }

    /// Validates text against the field's character set.
    fn check_charset(&self, text: &[u8]) -> Result<()> {
        match self.kind {
            FieldKind::Alphanumeric => {
                if let Some(&bad) = text.iter().find(|&&c| !(0x20..=0x7e).contains(&c)) {
                    return Err(Error::conversion(format!(
                        "invalid character 0x{:02X} in BCS-A value",
                        bad
                    )));
                }
            }
            FieldKind::Numeric => {
                let body = match text.first() {
                    Some(b'+') | Some(b'-') => &text[1..],
                    _ => text,
                };
                let mut seen_point = false;
                for &c in body {
                    match c {
                        b'.' if seen_point => {
                            return Err(Error::conversion(
                                "BCS-N value can only contain one decimal point",
                            ));
                        }
                        b'.' => seen_point = true,
                        b'0'..=b'9' | b'-' | b'/' => {}
                        _ => {
                            return Err(Error::conversion(format!(
                                "invalid character '{}' in BCS-N value",
                                c.escape_ascii()
                            )));
                        }
                    }
                }
            }
            FieldKind::Binary => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("raw", &self.raw.escape_ascii().to_string())
            .finish()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldKind::Binary => write!(f, "<{} bytes>", self.raw.len()),
            _ => write!(f, "{}", String::from_utf8_lossy(&self.raw)),
        }
    }
}

fn format_real(value: f64, format: RealFormat, precision: usize, plus: bool) -> String {
    let body = match format {
        RealFormat::Fixed => format!("{:.*}", precision, value),
        RealFormat::Exponential => c_exponent(value, precision, 'e'),
        RealFormat::ExponentialUpper => c_exponent(value, precision, 'E'),
    };
    if plus && !body.starts_with('-') {
        format!("+{}", body)
    } else {
        body
    }
}

/// Exponent notation with a signed, at least two digit exponent (`1.5e+03`).
fn c_exponent(value: f64, precision: usize, marker: char) -> String {
    let text = format!("{:.*e}", precision, value);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}{}{}{:02}", mantissa, marker, sign, exp.unsigned_abs())
        }
        None => text,
    }
}

// === Conversions ===

/// Types that can be read out of a [`Field`].
pub trait FromField: Sized {
    /// Converts the field content, failing with [`Error::Conversion`].
    fn from_field(field: &Field) -> Result<Self>;
}

/// Types that can be formatted into a [`Field`].
pub trait ToField {
    /// Produces the complete new content for `field` without modifying it.
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>>;
}

fn text_of(field: &Field) -> Result<&str> {
    let text = std::str::from_utf8(field.raw())
        .map_err(|_| Error::conversion(format!("{} field is not valid text", field.kind().name())))?;
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() {
        return Err(Error::conversion("field is blank"));
    }
    Ok(text)
}

fn binary_width(field: &Field) -> Result<usize> {
    match field.len() {
        1..=8 => Ok(field.len()),
        n => Err(Error::conversion(format!(
            "binary field of length {} is not an integer",
            n
        ))),
    }
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            fn from_field(field: &Field) -> Result<Self> {
                if field.kind() == FieldKind::Binary {
                    let width = binary_width(field)?;
                    let value = BigEndian::read_uint(field.raw(), width);
                    return <$t>::try_from(value).map_err(|_| {
                        Error::conversion(format!("{} does not fit in {}", value, stringify!($t)))
                    });
                }
                let text = text_of(field)?;
                text.parse::<$t>().map_err(|_| {
                    Error::conversion(format!("'{}' is not a valid {}", text, stringify!($t)))
                })
            }
        }

        impl ToField for $t {
            fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
                if field.kind() == FieldKind::Binary {
                    let width = binary_width(field)
                        .map_err(|_| Error::range(format!("binary field of length {} cannot hold an integer", field.len())))?;
                    let value = *self as u64;
                    if width < 8 && value >> (8 * width) != 0 {
                        return Err(Error::range(format!("{} does not fit in {} bytes", value, width)));
                    }
                    let mut bytes = vec![0u8; width];
                    BigEndian::write_uint(&mut bytes, value, width);
                    return Ok(bytes);
                }
                field.pad_to_width(self.to_string().as_bytes())
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            fn from_field(field: &Field) -> Result<Self> {
                if field.kind() == FieldKind::Binary {
                    let width = binary_width(field)?;
                    let value = BigEndian::read_int(field.raw(), width);
                    return <$t>::try_from(value).map_err(|_| {
                        Error::conversion(format!("{} does not fit in {}", value, stringify!($t)))
                    });
                }
                let text = text_of(field)?;
                text.parse::<$t>().map_err(|_| {
                    Error::conversion(format!("'{}' is not a valid {}", text, stringify!($t)))
                })
            }
        }

        impl ToField for $t {
            fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
                if field.kind() == FieldKind::Binary {
                    let width = binary_width(field)
                        .map_err(|_| Error::range(format!("binary field of length {} cannot hold an integer", field.len())))?;
                    let value = *self as i64;
                    if width < 8 {
                        let limit = 1i64 << (8 * width - 1);
                        if value < -limit || value >= limit {
                            return Err(Error::range(format!("{} does not fit in {} bytes", value, width)));
                        }
                    }
                    let mut bytes = vec![0u8; width];
                    BigEndian::write_int(&mut bytes, value, width);
                    return Ok(bytes);
                }
                field.pad_to_width(self.to_string().as_bytes())
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8, i16, i32, i64);

impl FromField for f64 {
    fn from_field(field: &Field) -> Result<Self> {
        if field.kind() == FieldKind::Binary {
            return match field.len() {
                4 => Ok(BigEndian::read_f32(field.raw()) as f64),
                8 => Ok(BigEndian::read_f64(field.raw())),
                n => Err(Error::conversion(format!(
                    "binary field of length {} is not a float",
                    n
                ))),
            };
        }
        let text = text_of(field)?;
        text.parse::<f64>()
            .map_err(|_| Error::conversion(format!("'{}' is not a valid real", text)))
    }
}

impl FromField for f32 {
    fn from_field(field: &Field) -> Result<Self> {
        if field.kind() == FieldKind::Binary && field.len() == 4 {
            return Ok(BigEndian::read_f32(field.raw()));
        }
        f64::from_field(field).map(|v| v as f32)
    }
}

impl ToField for f64 {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        match field.kind() {
            FieldKind::Binary => match field.len() {
                4 => {
                    let mut bytes = vec![0u8; 4];
                    BigEndian::write_f32(&mut bytes, *self as f32);
                    Ok(bytes)
                }
                8 => {
                    let mut bytes = vec![0u8; 8];
                    BigEndian::write_f64(&mut bytes, *self);
                    Ok(bytes)
                }
                n => Err(Error::range(format!(
                    "binary field of length {} cannot hold a float",
                    n
                ))),
            },
            _ => {
                let text = self.to_string();
                field.check_charset(text.as_bytes())?;
                field.pad_to_width(text.as_bytes())
            }
        }
    }
}

impl ToField for f32 {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        if field.kind() == FieldKind::Binary && field.len() == 4 {
            let mut bytes = vec![0u8; 4];
            BigEndian::write_f32(&mut bytes, *self);
            return Ok(bytes);
        }
        (*self as f64).to_field_bytes(field)
    }
}

impl FromField for String {
    fn from_field(field: &Field) -> Result<Self> {
        String::from_utf8(field.raw().to_vec())
            .map_err(|_| Error::conversion(format!("{} field is not valid text", field.kind().name())))
    }
}

impl FromField for Vec<u8> {
    fn from_field(field: &Field) -> Result<Self> {
        Ok(field.raw().to_vec())
    }
}

impl ToField for str {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        if field.kind() == FieldKind::Binary {
            return self.as_bytes().to_field_bytes(field);
        }
        field.check_charset(self.as_bytes())?;
        field.pad_to_width(self.as_bytes())
    }
}

impl ToField for String {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        self.as_str().to_field_bytes(field)
    }
}

impl ToField for [u8] {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        if self.len() == field.len() {
            return Ok(self.to_vec());
        }
        if field.kind() == FieldKind::Binary && self.len() < field.len() {
            return Err(Error::range(format!(
                "binary field of length {} given {} bytes",
                field.len(),
                self.len()
            )));
        }
        field.pad_to_width(self)
    }
}

impl ToField for Vec<u8> {
    fn to_field_bytes(&self, field: &Field) -> Result<Vec<u8>> {
        self.as_slice().to_field_bytes(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_numeric_padding() {
        let mut f = Field::numeric(5);
        assert_eq!(f.raw(), b"00000");
        f.set(&42u32).unwrap();
        assert_eq!(f.raw(), b"00042");
        f.set(&-7i32).unwrap();
        assert_eq!(f.raw(), b"-0007");
        assert_eq!(f.get::<i32>().unwrap(), -7);
    }

    #[test]
    fn test_alphanumeric_padding() {
        let mut f = Field::alphanumeric(6);
        f.set("ab").unwrap();
        assert_eq!(f.raw(), b"ab    ");
        assert_eq!(f.trimmed().unwrap(), "ab");
        assert_eq!(f.get::<String>().unwrap(), "ab    ");
    }

    #[test]
    fn test_set_too_wide_leaves_field_untouched() {
        let mut f = Field::numeric(2);
        f.set(&12u8).unwrap();
        let err = f.set(&123u32).unwrap_err();
        assert!(err.is_range());
        assert_eq!(f.raw(), b"12");
    }

    #[test]
    fn test_non_digit_is_conversion_error() {
        let mut f = Field::alphanumeric(3);
        f.set("1x3").unwrap();
        assert!(f.get::<u32>().unwrap_err().is_conversion());

        let blank = Field::alphanumeric(3);
        assert!(blank.get::<u32>().unwrap_err().is_conversion());
    }

    #[test]
    fn test_charset_validation() {
        let mut a = Field::alphanumeric(4);
        assert!(a.set("a\tb").unwrap_err().is_conversion());
        let mut n = Field::numeric(4);
        assert!(n.set("1.2.3").unwrap_err().is_conversion());
        assert!(n.set("12a").unwrap_err().is_conversion());
        n.set("-1.5").unwrap();
        assert_eq!(n.raw(), b"-1.5");
    }

    #[test]
    fn test_non_finite_float_rejected_in_numeric_field() {
        let mut n = Field::numeric(8);
        n.set(&2.5f64).unwrap();
        assert!(n.set(&f64::NAN).unwrap_err().is_conversion());
        assert!(n.set(&f64::INFINITY).unwrap_err().is_conversion());
        assert!(n.set(&f32::NEG_INFINITY).unwrap_err().is_conversion());
        assert_eq!(n.get::<f64>().unwrap(), 2.5);
    }

    #[test]
    fn test_binary_integers() {
        let mut f = Field::binary(4);
        f.set(&0x0102_0304u32).unwrap();
        assert_eq!(f.raw(), &[1, 2, 3, 4]);
        assert_eq!(f.get::<u32>().unwrap(), 0x0102_0304);

        let mut small = Field::binary(2);
        assert!(small.set(&70_000u32).unwrap_err().is_range());
        small.set(&-2i16).unwrap();
        assert_eq!(small.raw(), &[0xFF, 0xFE]);
        assert_eq!(small.get::<i16>().unwrap(), -2);
        assert!(small.get::<u8>().unwrap_err().is_conversion());
    }

    #[test]
    fn test_binary_floats() {
        let mut f = Field::binary(4);
        f.set(&1.5f32).unwrap();
        assert_relative_eq!(f.get::<f32>().unwrap(), 1.5);
        assert_relative_eq!(f.get::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn test_set_raw() {
        let mut f = Field::alphanumeric(4);
        f.set_raw(b"ab").unwrap();
        assert_eq!(f.raw(), b"ab  ");
        assert!(f.set_raw(b"abcde").unwrap_err().is_range());

        let mut n = Field::numeric(4);
        n.set_raw(b"12").unwrap();
        assert_eq!(n.raw(), b"0012");

        let mut b = Field::binary(4);
        assert!(b.set_raw(&[1, 2]).unwrap_err().is_range());
        b.set_raw(&[1, 2, 3, 4]).unwrap();
    }

    #[test]
    fn test_resize() {
        let mut a = Field::alphanumeric(4);
        a.set("abcd").unwrap();
        a.resize(2);
        assert_eq!(a.raw(), b"ab");
        a.resize(4);
        assert_eq!(a.raw(), b"ab  ");

        let mut n = Field::numeric(4);
        n.set(&1234u32).unwrap();
        n.resize(2);
        assert_eq!(n.raw(), b"34");
        n.resize(5);
        assert_eq!(n.raw(), b"00034");
    }

    #[test]
    fn test_set_real_reduces_precision() {
        let mut f = Field::numeric(7);
        f.set_real(3.14159265, RealFormat::Fixed, false).unwrap();
        assert_eq!(f.raw(), b"3.14159");
        assert_relative_eq!(f.get::<f64>().unwrap(), 3.14159);

        let mut signed = Field::alphanumeric(6);
        signed.set_real(2.5, RealFormat::Fixed, true).unwrap();
        assert_eq!(signed.raw(), b"+2.500");

        let mut exp = Field::alphanumeric(10);
        exp.set_real(1234.5, RealFormat::ExponentialUpper, false).unwrap();
        assert_eq!(exp.raw(), b"1.2345E+03");

        let mut tiny = Field::numeric(2);
        assert!(tiny.set_real(12345.0, RealFormat::Fixed, false).unwrap_err().is_range());
    }

    #[test]
    fn test_date_time() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 30)
            .unwrap();
        let mut f = Field::numeric(14);
        f.set_date_time(&dt, crate::DATE_TIME_FORMAT).unwrap();
        assert_eq!(f.raw(), b"20240309140530");
        assert_eq!(f.date_time(crate::DATE_TIME_FORMAT).unwrap(), dt);

        let mut short = Field::numeric(8);
        assert!(short.set_date_time(&dt, crate::DATE_TIME_FORMAT).unwrap_err().is_range());

        let junk = Field::from_raw(FieldKind::Alphanumeric, b"not a date    ".to_vec());
        assert!(junk.date_time(crate::DATE_TIME_FORMAT).unwrap_err().is_conversion());
    }

    #[test]
    fn test_display() {
        let mut f = Field::alphanumeric(3);
        f.set("hi").unwrap();
        assert_eq!(f.to_string(), "hi ");
        assert_eq!(Field::binary(4).to_string(), "<4 bytes>");
    }
}
