//! DER header parsing and writing.
//!
//! A header is one identifier octet followed by a definite length in short
//! form (`0x00..=0x7f`) or long form (`0x81..=0x84` plus up to four big-endian
//! length octets). The indefinite form and non-minimal long forms are rejected
//! because DER forbids them.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    errors::{Result, TranscodeError},
    tags,
};

/// Longest length field we accept, in octets after the initial one
const MAX_LENGTH_OCTETS: usize = 4;

/// Parsed DER header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Identifier octet
    pub tag: u8,
    /// Number of content bytes following the header
    pub content_length: usize,
    /// Number of bytes taken by identifier and length octets
    pub header_length: usize,
}

impl Header {
    /// Header plus content, i.e. the bytes one complete value occupies.
    ///
    /// `None` if the sum overflows `usize`.
    pub fn total_length(&self) -> Option<usize> {
        self.header_length.checked_add(self.content_length)
    }
}

/// Parse the header at the start of `data`.
///
/// Only the header itself needs to be present; the content may be truncated.
/// Callers walking a buffer check [`Header::total_length`] against what is left
/// (see [`split_value`]).
pub fn parse_header(data: &[u8]) -> Result<Header> {
    let (&tag, rest) =
        data.split_first().ok_or(TranscodeError::Truncated { needed: 2, available: 0 })?;
    if tags::is_high_tag_number(tag) {
        return Err(TranscodeError::HighTagNumber(tag));
    }

    let &first =
        rest.first().ok_or(TranscodeError::Truncated { needed: 2, available: data.len() })?;

    if first < 0x80 {
        return Ok(Header { tag, content_length: usize::from(first), header_length: 2 });
    }
    if first == 0x80 {
        return Err(TranscodeError::IndefiniteLength);
    }

    let octets = usize::from(first & 0x7f);
    if octets > MAX_LENGTH_OCTETS {
        return Err(TranscodeError::LengthOverflow { octets });
    }
    let header_length = 2 + octets;
    let length_bytes = rest
        .get(1..=octets)
        .ok_or(TranscodeError::Truncated { needed: header_length, available: data.len() })?;

    // DER requires the shortest encoding: no leading zero octet, and long
    // form only for lengths that do not fit the short form.
    if length_bytes[0] == 0 {
        return Err(TranscodeError::NonCanonicalLength);
    }
    let content_length =
        length_bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    if content_length < 0x80 {
        return Err(TranscodeError::NonCanonicalLength);
    }

    Ok(Header { tag, content_length, header_length })
}

/// Append a minimal DER header for `tag` and `content_length` to `buf`.
pub fn write_header(tag: u8, content_length: usize, buf: &mut BytesMut) {
    buf.put_u8(tag);
    if content_length < 0x80 {
        buf.put_u8(content_length as u8);
        return;
    }

    let be = content_length.to_be_bytes();
    let skip = be.iter().take_while(|&&b| b == 0).count();
    let significant = &be[skip..];
    buf.put_u8(0x80 | significant.len() as u8);
    buf.put_slice(significant);
}

/// Wrap `content` in a header with the given tag.
pub fn prefix_header(tag: u8, content: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(content.len() + 2 + MAX_LENGTH_OCTETS);
    write_header(tag, content.len(), &mut buf);
    buf.put_slice(content);
    buf.freeze()
}

/// Split the first complete value (header included) off `data`.
///
/// Returns the header, the value, and the remainder. The value and remainder
/// share `data`'s buffer.
pub fn split_value(data: &Bytes) -> Result<(Header, Bytes, Bytes)> {
    let header = parse_header(data)?;
    let total = header
        .total_length()
        .ok_or(TranscodeError::LengthOverflow { octets: header.header_length - 2 })?;
    if total > data.len() {
        return Err(TranscodeError::Truncated { needed: total, available: data.len() });
    }
    Ok((header, data.slice(..total), data.slice(total..)))
}

/// Iterator over the complete values in a concatenation of DER values.
///
/// Every value must line up to a neat whole; the first error ends the
/// iteration.
#[derive(Debug, Clone)]
pub struct Values {
    rest: Bytes,
    failed: bool,
}

impl Values {
    /// Iterate over the values in `data`.
    pub fn new(data: Bytes) -> Self {
        Self { rest: data, failed: false }
    }

    /// Bytes not yet consumed
    pub fn remainder(&self) -> &Bytes {
        &self.rest
    }
}

impl Iterator for Values {
    type Item = Result<(Header, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        match split_value(&self.rest) {
            Ok((header, value, rest)) => {
                self.rest = rest;
                Some(Ok((header, value)))
            },
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            },
        }
    }
}
