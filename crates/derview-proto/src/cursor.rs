//! Cursor: the content of one stored DER value, or its absence.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    errors::Result,
    primitive::{self, BitString},
};

/// One decoded field.
///
/// `Present` holds the value's content octets (header stripped), or the whole
/// TLV for fields stored with ANY. `Absent` is the tombstone for OPTIONAL
/// values that are not there; it is distinct from an empty `Present`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// No value
    #[default]
    Absent,
    /// Value content
    Present(Bytes),
}

impl Cursor {
    /// Whether this is the tombstone
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether a value is present
    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// Content bytes, if present
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Absent => None,
            Self::Present(b) => Some(b),
        }
    }

    /// Content as a shared buffer, if present
    pub fn bytes(&self) -> Option<Bytes> {
        match self {
            Self::Absent => None,
            Self::Present(b) => Some(b.clone()),
        }
    }

    /// Content length; zero for absent cursors
    pub fn len(&self) -> usize {
        self.as_bytes().map_or(0, <[u8]>::len)
    }

    /// True for absent cursors and for present cursors with no content
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// INTEGER cursor
    pub fn integer(value: i64) -> Self {
        Self::Present(primitive::format_integer(value))
    }

    /// BOOLEAN cursor
    pub fn boolean(value: bool) -> Self {
        Self::Present(primitive::format_boolean(value))
    }

    /// OBJECT IDENTIFIER cursor from dotted notation
    pub fn oid(dotted: &str) -> Result<Self> {
        primitive::format_oid(dotted).map(Self::Present)
    }

    /// ENUMERATED cursor
    pub fn enumerated(value: i64) -> Self {
        Self::integer(value)
    }

    /// RELATIVE-OID cursor from dotted notation
    pub fn relative_oid(dotted: &str) -> Result<Self> {
        primitive::format_relative_oid(dotted).map(Self::Present)
    }

    /// BIT STRING cursor
    pub fn bit_string(bits: &BitString) -> Self {
        Self::Present(primitive::format_bit_string(bits))
    }

    /// UTCTime cursor
    pub fn utc_time(time: &DateTime<Utc>) -> Result<Self> {
        primitive::format_utc_time(time).map(Self::Present)
    }

    /// GeneralizedTime cursor
    pub fn generalized_time(time: &DateTime<Utc>) -> Result<Self> {
        primitive::format_generalized_time(time).map(Self::Present)
    }

    /// Interpret as INTEGER
    pub fn to_integer(&self) -> Result<Option<i64>> {
        self.as_bytes().map(primitive::parse_integer).transpose()
    }

    /// Interpret as BOOLEAN
    pub fn to_boolean(&self) -> Result<Option<bool>> {
        self.as_bytes().map(primitive::parse_boolean).transpose()
    }

    /// Interpret as OBJECT IDENTIFIER in dotted notation
    pub fn to_oid(&self) -> Result<Option<String>> {
        self.as_bytes().map(primitive::parse_oid).transpose()
    }

    /// Interpret as ENUMERATED
    pub fn to_enumerated(&self) -> Result<Option<i64>> {
        self.to_integer()
    }

    /// Interpret as RELATIVE-OID in dotted notation
    pub fn to_relative_oid(&self) -> Result<Option<String>> {
        self.as_bytes().map(primitive::parse_relative_oid).transpose()
    }

    /// Interpret as BIT STRING
    pub fn to_bit_string(&self) -> Result<Option<BitString>> {
        self.as_bytes().map(primitive::parse_bit_string).transpose()
    }

    /// Interpret as UTCTime
    pub fn to_utc_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.as_bytes().map(primitive::parse_utc_time).transpose()
    }

    /// Interpret as GeneralizedTime
    pub fn to_generalized_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.as_bytes().map(primitive::parse_generalized_time).transpose()
    }

    /// Interpret as UTF8String (or any string type carrying UTF-8)
    pub fn to_utf8(&self) -> Result<Option<&str>> {
        self.as_bytes().map(primitive::parse_utf8).transpose()
    }
}

impl From<Bytes> for Cursor {
    fn from(value: Bytes) -> Self {
        Self::Present(value)
    }
}

impl From<Vec<u8>> for Cursor {
    fn from(value: Vec<u8>) -> Self {
        Self::Present(Bytes::from(value))
    }
}

impl From<&[u8]> for Cursor {
    fn from(value: &[u8]) -> Self {
        Self::Present(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<&[u8; N]> for Cursor {
    fn from(value: &[u8; N]) -> Self {
        Self::Present(Bytes::copy_from_slice(value))
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self::Present(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self::Present(Bytes::from(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for Cursor {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl PartialEq<&str> for Cursor {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == Some(other.as_bytes())
    }
}

impl PartialEq<&[u8]> for Cursor {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == Some(*other)
    }
}

/// Hex notation used in ASN.1 value listings: `'0a1b'H`, or `None`.
impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("None"),
            Self::Present(b) => write!(f, "'{}'H", hex::encode(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn absent_differs_from_empty() {
        let empty = Cursor::from(&b""[..]);
        assert!(empty.is_present());
        assert!(empty.is_empty());
        assert_ne!(empty, Cursor::Absent);
        assert!(Cursor::Absent.is_empty());
    }

    #[test]
    fn compares_with_strings() {
        assert_eq!(Cursor::from("Wereld"), "Wereld");
        assert_ne!(Cursor::Absent, "");
    }

    #[test]
    fn optional_conversion() {
        assert_eq!(Cursor::from(None::<&str>), Cursor::Absent);
        assert_eq!(Cursor::from(Some("x")), "x");
    }

    #[test]
    fn typed_helpers() {
        assert_eq!(Cursor::integer(-129).to_integer().unwrap(), Some(-129));
        assert_eq!(Cursor::boolean(true).to_boolean().unwrap(), Some(true));
        assert_eq!(Cursor::Absent.to_integer().unwrap(), None);
        assert_eq!(Cursor::from("hallo").to_utf8().unwrap(), Some("hallo"));
    }

    #[test]
    fn atom_helpers() {
        assert_eq!(Cursor::enumerated(3).to_enumerated().unwrap(), Some(3));
        let relative = Cursor::relative_oid("8571.3").unwrap();
        assert_eq!(relative.to_relative_oid().unwrap().as_deref(), Some("8571.3"));

        let mut bits = BitString::new();
        bits.set(5);
        let cursor = Cursor::bit_string(&bits);
        assert_eq!(cursor.as_bytes(), Some(&[0x02, 0x04][..]));
        assert!(cursor.to_bit_string().unwrap().unwrap().test(5));
        assert_eq!(Cursor::Absent.to_bit_string().unwrap(), None);

        let time = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Cursor::utc_time(&time).unwrap(), "270101000000Z");
        assert_eq!(Cursor::generalized_time(&time).unwrap(), "20270101000000Z");
        assert_eq!(Cursor::from("270101000000Z").to_utc_time().unwrap(), Some(time));
        assert_eq!(Cursor::from("20270101000000Z").to_generalized_time().unwrap(), Some(time));
        assert!(Cursor::from("2027").to_utc_time().is_err());
    }

    #[test]
    fn display_as_hex() {
        assert_eq!(Cursor::from(&[0x0a_u8, 0x1b]).to_string(), "'0a1b'H");
        assert_eq!(Cursor::Absent.to_string(), "None");
    }
}
