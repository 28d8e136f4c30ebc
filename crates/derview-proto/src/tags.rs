//! Identifier octets for the universal ASN.1 types.
//!
//! Only the low-tag-number form is supported, so every tag fits one byte:
//! two class bits, the constructed bit, and a five-bit tag number.

/// Constructed bit of an identifier octet
pub const CONSTRUCTED: u8 = 0x20;

/// Class bits for context-specific tags
pub const CONTEXT: u8 = 0x80;

/// Class bits for application tags
pub const APPLICATION: u8 = 0x40;

/// Tag number bits; all ones marks the high-tag-number form
pub const NUMBER_MASK: u8 = 0x1f;

/// BOOLEAN
pub const BOOLEAN: u8 = 0x01;
/// INTEGER
pub const INTEGER: u8 = 0x02;
/// BIT STRING
pub const BIT_STRING: u8 = 0x03;
/// OCTET STRING
pub const OCTET_STRING: u8 = 0x04;
/// NULL
pub const NULL: u8 = 0x05;
/// OBJECT IDENTIFIER
pub const OID: u8 = 0x06;
/// ENUMERATED
pub const ENUMERATED: u8 = 0x0a;
/// UTF8String
pub const UTF8_STRING: u8 = 0x0c;
/// RELATIVE-OID
pub const RELATIVE_OID: u8 = 0x0d;
/// PrintableString
pub const PRINTABLE_STRING: u8 = 0x13;
/// IA5String
pub const IA5_STRING: u8 = 0x16;
/// UTCTime
pub const UTC_TIME: u8 = 0x17;
/// GeneralizedTime
pub const GENERALIZED_TIME: u8 = 0x18;
/// SEQUENCE and SEQUENCE OF (constructed)
pub const SEQUENCE: u8 = 0x30;
/// SET and SET OF (constructed)
pub const SET: u8 = 0x31;

/// Context-specific tag `[number]`, e.g. `context(0, true)` is `0xa0`.
///
/// Returns `None` when `number` needs the high-tag-number form.
pub const fn context(number: u8, constructed: bool) -> Option<u8> {
    if number >= NUMBER_MASK {
        return None;
    }
    Some(CONTEXT | if constructed { CONSTRUCTED } else { 0 } | number)
}

/// Whether the identifier octet has the constructed bit set
pub const fn is_constructed(tag: u8) -> bool {
    tag & CONSTRUCTED != 0
}

/// Whether the identifier octet announces a multi-byte tag number
pub const fn is_high_tag_number(tag: u8) -> bool {
    tag & NUMBER_MASK == NUMBER_MASK
}
