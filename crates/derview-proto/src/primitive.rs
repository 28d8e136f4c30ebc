//! Content encodings of the primitive ASN.1 types.
//!
//! These work on content octets only (no header), which is what a cursor
//! holds after decoding.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::errors::{Result, TranscodeError};

/// Minimal two's complement big-endian encoding of an INTEGER.
pub fn format_integer(value: i64) -> Bytes {
    let be = value.to_be_bytes();
    let mut start = 0;
    // Drop leading octets that only repeat the sign bit of the next one.
    while start < be.len() - 1 {
        let redundant = (be[start] == 0x00 && be[start + 1] & 0x80 == 0)
            || (be[start] == 0xff && be[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    Bytes::copy_from_slice(&be[start..])
}

/// Parse INTEGER content into an `i64`.
pub fn parse_integer(content: &[u8]) -> Result<i64> {
    const KIND: &str = "INTEGER";
    let Some(&first) = content.first() else {
        return Err(TranscodeError::InvalidPrimitive { kind: KIND, reason: "empty content" });
    };
    if content.len() > 8 {
        return Err(TranscodeError::InvalidPrimitive { kind: KIND, reason: "exceeds 64 bits" });
    }
    if let Some(&second) = content.get(1)
        && ((first == 0x00 && second & 0x80 == 0) || (first == 0xff && second & 0x80 != 0))
    {
        return Err(TranscodeError::InvalidPrimitive { kind: KIND, reason: "non-minimal encoding" });
    }
    let seed: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    Ok(content.iter().fold(seed, |acc, &b| (acc << 8) | i64::from(b)))
}

/// DER BOOLEAN content: `0xff` for true, `0x00` for false.
pub fn format_boolean(value: bool) -> Bytes {
    Bytes::copy_from_slice(&[if value { 0xff } else { 0x00 }])
}

/// Parse BOOLEAN content; DER allows only `0x00` and `0xff`.
pub fn parse_boolean(content: &[u8]) -> Result<bool> {
    match content {
        [0x00] => Ok(false),
        [0xff] => Ok(true),
        [_] => Err(TranscodeError::InvalidPrimitive {
            kind: "BOOLEAN",
            reason: "DER requires 0x00 or 0xff",
        }),
        _ => Err(TranscodeError::InvalidPrimitive { kind: "BOOLEAN", reason: "length must be 1" }),
    }
}

/// Encode a dotted OBJECT IDENTIFIER such as `2.5.29.19`.
pub fn format_oid(dotted: &str) -> Result<Bytes> {
    const KIND: &str = "OBJECT IDENTIFIER";
    let arcs = dotted
        .split('.')
        .map(str::parse::<u64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| TranscodeError::InvalidPrimitive { kind: KIND, reason: "non-numeric arc" })?;

    let [first, second, rest @ ..] = arcs.as_slice() else {
        return Err(TranscodeError::InvalidPrimitive { kind: KIND, reason: "needs two arcs" });
    };
    if *first > 2 || (*first < 2 && *second > 39) {
        return Err(TranscodeError::InvalidPrimitive { kind: KIND, reason: "invalid root arcs" });
    }
    let head = (first * 40)
        .checked_add(*second)
        .ok_or(TranscodeError::InvalidPrimitive { kind: KIND, reason: "arc overflow" })?;

    let mut buf = BytesMut::new();
    put_base128(head, &mut buf);
    for &arc in rest {
        put_base128(arc, &mut buf);
    }
    Ok(buf.freeze())
}

/// Decode OBJECT IDENTIFIER content into dotted notation.
pub fn parse_oid(content: &[u8]) -> Result<String> {
    let arcs = parse_arcs("OBJECT IDENTIFIER", content)?;
    let Some((&head, rest)) = arcs.split_first() else {
        return Err(TranscodeError::InvalidPrimitive {
            kind: "OBJECT IDENTIFIER",
            reason: "empty content",
        });
    };
    let (first, second) = match head {
        0..=39 => (0, head),
        40..=79 => (1, head - 40),
        _ => (2, head - 80),
    };
    Ok([first, second].iter().chain(rest).map(u64::to_string).collect::<Vec<_>>().join("."))
}

/// Encode a dotted RELATIVE-OID such as `8571.3.2`.
pub fn format_relative_oid(dotted: &str) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    for arc in dotted.split('.') {
        let arc = arc.parse::<u64>().map_err(|_| TranscodeError::InvalidPrimitive {
            kind: "RELATIVE-OID",
            reason: "non-numeric arc",
        })?;
        put_base128(arc, &mut buf);
    }
    Ok(buf.freeze())
}

/// Decode RELATIVE-OID content into dotted notation.
pub fn parse_relative_oid(content: &[u8]) -> Result<String> {
    let arcs = parse_arcs("RELATIVE-OID", content)?;
    Ok(arcs.iter().map(u64::to_string).collect::<Vec<_>>().join("."))
}

/// Split content into base-128 subidentifiers. Never returns an empty list.
fn parse_arcs(kind: &'static str, content: &[u8]) -> Result<Vec<u64>> {
    let invalid = |reason| TranscodeError::InvalidPrimitive { kind, reason };
    if content.is_empty() {
        return Err(invalid("empty content"));
    }

    let mut arcs = Vec::new();
    let mut acc: u64 = 0;
    let mut fresh = true;
    for &b in content {
        if fresh && b == 0x80 {
            return Err(invalid("non-minimal subidentifier"));
        }
        if acc > u64::MAX >> 7 {
            return Err(invalid("arc overflow"));
        }
        acc = (acc << 7) | u64::from(b & 0x7f);
        fresh = b & 0x80 == 0;
        if fresh {
            arcs.push(acc);
            acc = 0;
        }
    }
    if !fresh {
        return Err(invalid("unterminated subidentifier"));
    }
    Ok(arcs)
}

/// A BIT STRING value: `len` bits stored most significant bit first.
///
/// Bits past `len` in the last octet are always zero, which is what DER
/// requires of the padding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    data: Vec<u8>,
    len: usize,
}

impl BitString {
    /// Empty bit string
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no bits
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Data octets, padding included
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whether `bit` is set. Bits past the end read as clear.
    pub fn test(&self, bit: usize) -> bool {
        bit < self.len && self.data[bit / 8] & mask(bit) != 0
    }

    /// Set `bit`, growing the string if needed.
    pub fn set(&mut self, bit: usize) {
        if bit >= self.len {
            self.len = bit + 1;
            self.data.resize(self.len.div_ceil(8), 0);
        }
        self.data[bit / 8] |= mask(bit);
    }

    /// Clear `bit`. The length does not change.
    pub fn clear(&mut self, bit: usize) {
        if bit < self.len {
            self.data[bit / 8] &= !mask(bit);
        }
    }

    /// Indices of the set bits, in order
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&bit| self.test(bit))
    }
}

const fn mask(bit: usize) -> u8 {
    0x80 >> (bit % 8)
}

/// Encode BIT STRING content: the unused-bits octet, then the data.
pub fn format_bit_string(bits: &BitString) -> Bytes {
    let unused = bits.data.len() * 8 - bits.len;
    let mut buf = BytesMut::with_capacity(bits.data.len() + 1);
    buf.put_u8(unused as u8);
    buf.put_slice(&bits.data);
    buf.freeze()
}

/// Parse BIT STRING content, enforcing DER's zero padding.
pub fn parse_bit_string(content: &[u8]) -> Result<BitString> {
    let invalid = |reason| TranscodeError::InvalidPrimitive { kind: "BIT STRING", reason };
    let Some((&unused, data)) = content.split_first() else {
        return Err(invalid("empty content"));
    };
    if unused > 7 {
        return Err(invalid("more than 7 unused bits"));
    }
    let padding = (1u8 << unused) - 1;
    match data.last() {
        None if unused != 0 => return Err(invalid("unused bits without data")),
        Some(&last) if last & padding != 0 => return Err(invalid("non-zero padding bits")),
        _ => {},
    }
    Ok(BitString { data: data.to_vec(), len: data.len() * 8 - usize::from(unused) })
}

/// Encode UTCTime content as `YYMMDDHHMMSSZ`. Only 1950 through 2049 fit.
pub fn format_utc_time(time: &DateTime<Utc>) -> Result<Bytes> {
    if !(1950..2050).contains(&time.year()) {
        return Err(TranscodeError::InvalidPrimitive {
            kind: "UTCTime",
            reason: "year outside 1950..2049",
        });
    }
    Ok(Bytes::from(time.format("%y%m%d%H%M%SZ").to_string()))
}

/// Parse UTCTime content. Two-digit years from 50 up are 19xx, the rest 20xx.
pub fn parse_utc_time(content: &[u8]) -> Result<DateTime<Utc>> {
    const KIND: &str = "UTCTime";
    if content.len() != 13 {
        return Err(TranscodeError::InvalidPrimitive {
            kind: KIND,
            reason: "expected YYMMDDHHMMSSZ",
        });
    }
    let (year, rest) = content.split_at(2);
    let year = decimal(year)
        .ok_or(TranscodeError::InvalidPrimitive { kind: KIND, reason: "non-digit character" })?;
    let year = if year >= 50 { 1900 + year } else { 2000 + year };
    parse_time_of_year(KIND, year, rest)
}

/// Encode GeneralizedTime content as `YYYYMMDDHHMMSSZ`.
pub fn format_generalized_time(time: &DateTime<Utc>) -> Result<Bytes> {
    if !(0..=9999).contains(&time.year()) {
        return Err(TranscodeError::InvalidPrimitive {
            kind: "GeneralizedTime",
            reason: "year outside 0..9999",
        });
    }
    Ok(Bytes::from(time.format("%Y%m%d%H%M%SZ").to_string()))
}

/// Parse GeneralizedTime content in the DER form without fractional seconds.
pub fn parse_generalized_time(content: &[u8]) -> Result<DateTime<Utc>> {
    const KIND: &str = "GeneralizedTime";
    if content.len() != 15 {
        return Err(TranscodeError::InvalidPrimitive {
            kind: KIND,
            reason: "expected YYYYMMDDHHMMSSZ",
        });
    }
    let (year, rest) = content.split_at(4);
    let year = decimal(year)
        .ok_or(TranscodeError::InvalidPrimitive { kind: KIND, reason: "non-digit character" })?;
    parse_time_of_year(KIND, year, rest)
}

/// `MMDDHHMMSSZ` following the year.
fn parse_time_of_year(kind: &'static str, year: u32, rest: &[u8]) -> Result<DateTime<Utc>> {
    let invalid = |reason| TranscodeError::InvalidPrimitive { kind, reason };
    let [fields @ .., b'Z'] = rest else {
        return Err(invalid("must end in Z"));
    };
    let parts = fields
        .chunks(2)
        .map(decimal)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("non-digit character"))?;
    let &[month, day, hour, minute, second] = parts.as_slice() else {
        return Err(invalid("wrong number of fields"));
    };
    let year = i32::try_from(year).map_err(|_| invalid("year out of range"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|time| time.and_utc())
        .ok_or_else(|| invalid("field out of range"))
}

/// Value of a run of ASCII digits.
fn decimal(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}

/// View string content as UTF-8.
pub fn parse_utf8(content: &[u8]) -> Result<&str> {
    std::str::from_utf8(content).map_err(|_| TranscodeError::InvalidPrimitive {
        kind: "UTF8String",
        reason: "invalid UTF-8",
    })
}

fn put_base128(mut value: u64, buf: &mut BytesMut) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let more = if i > 0 { 0x80 } else { 0 };
        buf.put_u8(groups[i] | more);
    }
}
