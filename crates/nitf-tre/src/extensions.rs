//! Ordered TRE lists attached to headers.
//!
//! On the wire an extension block is a concatenation of
//! `TAG(6) LENGTH(5) BODY(LENGTH)` records. [`Extensions::decode`] parses each
//! body with the catalog table for its tag; unknown tags, and known tags whose
//! body does not match the table (unless `strict`), are kept as opaque TREs
//! so that the block still round-trips byte for byte.

use crate::catalog::TreCatalog;
use crate::tre::Tre;
use nitf_core::{Error, Result, TRE_LENGTH_SIZE, TRE_MAX_LENGTH, TRE_TAG_SIZE};
use tracing::{debug, warn};

/// Ordered list of TREs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    tres: Vec<Tre>,
}

impl Extensions {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of TREs.
    #[inline]
    pub fn len(&self) -> usize {
        self.tres.len()
    }

    /// Returns `true` if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tres.is_empty()
    }

    /// Appends a TRE.
    pub fn append(&mut self, tre: Tre) {
        self.tres.push(tre);
    }

    /// TREs in order.
    pub fn iter(&self) -> impl Iterator<Item = &Tre> {
        self.tres.iter()
    }

    /// Mutable TREs in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tre> {
        self.tres.iter_mut()
    }

    /// All TREs with `tag`.
    pub fn find<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Tre> + 'a {
        self.tres.iter().filter(move |t| t.tag() == tag)
    }

    /// First TRE with `tag`.
    pub fn first(&self, tag: &str) -> Option<&Tre> {
        self.tres.iter().find(|t| t.tag() == tag)
    }

    /// Returns `true` if any TRE has `tag`.
    pub fn exists(&self, tag: &str) -> bool {
        self.first(tag).is_some()
    }

    /// Removes every TRE with `tag` and returns how many were removed.
    pub fn remove_all(&mut self, tag: &str) -> usize {
        let before = self.tres.len();
        self.tres.retain(|t| t.tag() != tag);
        before - self.tres.len()
    }

    /// Encoded length of the whole block.
    pub fn encoded_len(&self) -> Result<usize> {
        self.tres.iter().try_fold(0usize, |acc, tre| {
            Ok(acc + TRE_TAG_SIZE + TRE_LENGTH_SIZE + tre.current_size()?)
        })
    }

    /// Encodes the block as `TAG LENGTH BODY` records.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len()?);
        for tre in &self.tres {
            out.extend_from_slice(&encode_tre(tre)?);
        }
        Ok(out)
    }

    /// Decodes a block.
    ///
    /// With `strict`, a body that does not match its catalog table is an
    /// error; otherwise the TRE is kept opaque and a warning is logged.
    pub fn decode(data: &[u8], catalog: &TreCatalog, strict: bool) -> Result<Self> {
        let mut tres = Vec::new();
        let mut offset = 0usize;
        let header = TRE_TAG_SIZE + TRE_LENGTH_SIZE;
        while offset < data.len() {
            if data.len() - offset < header {
                return Err(Error::parse(format!(
                    "truncated TRE header at offset {} ({} bytes left)",
                    offset,
                    data.len() - offset
                )));
            }
            let tag = std::str::from_utf8(&data[offset..offset + TRE_TAG_SIZE])
                .map_err(|_| Error::parse(format!("TRE tag at offset {} is not text", offset)))?
                .trim_end()
                .to_string();
            let len_text = &data[offset + TRE_TAG_SIZE..offset + header];
            let length: usize = std::str::from_utf8(len_text)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    Error::parse(format!(
                        "TRE {} has invalid length '{}'",
                        tag,
                        len_text.escape_ascii()
                    ))
                })?;
            offset += header;
            if data.len() - offset < length {
                return Err(Error::parse(format!(
                    "TRE {} declares {} bytes, {} left",
                    tag,
                    length,
                    data.len() - offset
                )));
            }
            let body = &data[offset..offset + length];
            offset += length;

            let tre = match catalog.parse(&tag, None, body) {
                Some(Ok(tre)) => tre,
                Some(Err(e)) if strict => return Err(e),
                Some(Err(e)) => {
                    warn!(tag = %tag, error = %e, "keeping TRE as raw data");
                    Tre::opaque(&tag, body)
                }
                None => {
                    debug!(tag = %tag, length, "unknown TRE kept as raw data");
                    Tre::opaque(&tag, body)
                }
            };
            tres.push(tre);
        }
        Ok(Self { tres })
    }
}

impl FromIterator<Tre> for Extensions {
    fn from_iter<I: IntoIterator<Item = Tre>>(iter: I) -> Self {
        Self {
            tres: iter.into_iter().collect(),
        }
    }
}

/// Encodes one TRE as `TAG LENGTH BODY`.
pub fn encode_tre(tre: &Tre) -> Result<Vec<u8>> {
    if tre.tag().is_empty() || tre.tag().len() > TRE_TAG_SIZE || !tre.tag().is_ascii() {
        return Err(Error::range(format!("invalid TRE tag '{}'", tre.tag())));
    }
    let body = tre.to_bytes()?;
    if body.len() > TRE_MAX_LENGTH {
        return Err(Error::range(format!(
            "TRE {} body of {} bytes exceeds {}",
            tre.tag(),
            body.len(),
            TRE_MAX_LENGTH
        )));
    }
    let mut out = Vec::with_capacity(TRE_TAG_SIZE + TRE_LENGTH_SIZE + body.len());
    out.extend_from_slice(format!("{:<width$}", tre.tag(), width = TRE_TAG_SIZE).as_bytes());
    out.extend_from_slice(format!("{:0width$}", body.len(), width = TRE_LENGTH_SIZE).as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> Tre {
        let mut tre = TreCatalog::with_builtins().create("JITCID").unwrap();
        tre.set_raw_field("FILCMT", text.as_bytes()).unwrap();
        tre
    }

    #[test]
    fn test_encode_layout() {
        let ext: Extensions = [comment("hello")].into_iter().collect();
        assert_eq!(ext.encode().unwrap(), b"JITCID00005hello");
        assert_eq!(ext.encoded_len().unwrap(), 16);
    }

    #[test]
    fn test_decode_known_and_unknown() {
        let catalog = TreCatalog::with_builtins();
        let data = b"JITCID00002hiMYTAG 00003\x01\x02\x03";
        let ext = Extensions::decode(data, &catalog, true).unwrap();
        assert_eq!(ext.len(), 2);
        assert!(!ext.first("JITCID").unwrap().is_opaque());
        let unknown = ext.first("MYTAG").unwrap();
        assert_eq!(unknown.raw_data(), Some(&[1u8, 2, 3][..]));
        assert_eq!(ext.encode().unwrap(), data);
    }

    #[test]
    fn test_malformed_known_tre() {
        let catalog = TreCatalog::with_builtins();
        // ENGRDA needs at least 23 bytes
        let data = b"ENGRDA00004abcd";
        assert!(Extensions::decode(data, &catalog, true).unwrap_err().is_parse());
        let ext = Extensions::decode(data, &catalog, false).unwrap();
        assert!(ext.first("ENGRDA").unwrap().is_opaque());
        assert_eq!(ext.encode().unwrap(), data);
    }

    #[test]
    fn test_truncated_block() {
        let catalog = TreCatalog::new();
        assert!(Extensions::decode(b"JITC", &catalog, false).unwrap_err().is_parse());
        assert!(Extensions::decode(b"JITCID00009abc", &catalog, false).unwrap_err().is_parse());
        assert!(Extensions::decode(b"JITCID0x002ab", &catalog, false).unwrap_err().is_parse());
    }

    #[test]
    fn test_remove_all() {
        let mut ext = Extensions::new();
        ext.append(comment("a"));
        ext.append(Tre::opaque("OTHER", b"x"));
        ext.append(comment("b"));
        assert_eq!(ext.find("JITCID").count(), 2);
        assert_eq!(ext.remove_all("JITCID"), 2);
        assert_eq!(ext.len(), 1);
        assert!(!ext.exists("JITCID"));
    }
}
