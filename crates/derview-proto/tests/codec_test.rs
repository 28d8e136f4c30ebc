//! Property tests for the DER codec.
//!
//! These run the reference codec against generated cursor lists and arbitrary
//! input bytes, checking the laws the view layer relies on rather than fixed
//! byte strings.

use bytes::{Bytes, BytesMut};
use derview_proto::{
    Codec, Cursor, DerCodec, PackerBuilder, PackerDescriptor, TranscodeError, Values,
    parse_header, prefix_header, tags, write_header,
};
use hex_literal::hex;
use proptest::prelude::*;

// Extension ::= SEQUENCE {
//     extnID     OBJECT IDENTIFIER,
//     critical   BOOLEAN OPTIONAL,
//     extnValue  OCTET STRING,
//     extra  [0] SEQUENCE { note UTF8String, level INTEGER OPTIONAL } OPTIONAL }
fn extension_packer() -> PackerDescriptor {
    PackerBuilder::new()
        .enter(tags::SEQUENCE)
        .store(tags::OID)
        .optional()
        .store(tags::BOOLEAN)
        .store(tags::OCTET_STRING)
        .optional()
        .enter(tags::context(0, true).unwrap())
        .store(tags::UTF8_STRING)
        .optional()
        .store(tags::INTEGER)
        .leave()
        .leave()
        .build()
        .unwrap()
}

fn content() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..300).prop_map(Bytes::from)
}

fn optional_content() -> impl Strategy<Value = Cursor> {
    prop::option::of(content()).prop_map(Cursor::from)
}

/// Cursor lists the extension packer can encode: required fields present, and
/// the optional `[0]` group either fully absent or carrying its `note`.
fn extension_cursors() -> impl Strategy<Value = Vec<Cursor>> {
    (
        content(),
        optional_content(),
        content(),
        prop::option::of((content(), optional_content())),
    )
        .prop_map(|(oid, critical, value, extra)| {
            let (note, level) = match extra {
                Some((note, level)) => (Cursor::from(note), level),
                None => (Cursor::Absent, Cursor::Absent),
            };
            vec![oid.into(), critical, value.into(), note, level]
        })
}

proptest! {
    #[test]
    fn decode_inverts_encode(cursors in extension_cursors()) {
        let codec = DerCodec::new();
        let packer = extension_packer();

        let der = codec.encode(&packer, &cursors).unwrap();
        let decoded = codec.decode(&packer, &der, packer.cursor_count()).unwrap();
        prop_assert_eq!(decoded, cursors);
    }

    #[test]
    fn decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let codec = DerCodec::new();
        let packer = extension_packer();
        let data = Bytes::from(data);
        if let Ok(cursors) = codec.decode(&packer, &data, packer.cursor_count()) {
            prop_assert_eq!(cursors.len(), packer.cursor_count());
        }
    }

    #[test]
    fn header_length_roundtrip(tag in 0u8..0x1f, length in 0usize..=u32::MAX as usize) {
        let mut buf = BytesMut::new();
        write_header(tag, length, &mut buf);
        let header = parse_header(&buf).unwrap();
        prop_assert_eq!(header.tag, tag);
        prop_assert_eq!(header.content_length, length);
        prop_assert_eq!(header.header_length, buf.len());
    }

    #[test]
    fn values_split_concatenation(parts in prop::collection::vec(content(), 0..16)) {
        let mut joined = BytesMut::new();
        for part in &parts {
            joined.extend_from_slice(&prefix_header(tags::OCTET_STRING, part));
        }

        let split: Vec<Bytes> = Values::new(joined.freeze())
            .map(|value| {
                let (header, value) = value.unwrap();
                value.slice(header.header_length..)
            })
            .collect();
        prop_assert_eq!(split, parts);
    }
}

#[test]
fn single_value_is_consumed_exactly() {
    let data = hex!("30 04 04 00 04 00");
    let header = parse_header(&data).unwrap();
    assert_eq!((header.tag, header.content_length, header.header_length), (0x30, 4, 2));

    let rest = &data[header.header_length + header.content_length..];
    assert!(rest.is_empty());
}

#[test]
fn walk_sequence_content_by_headers() {
    let codec = DerCodec::new();
    let packer = PackerBuilder::new()
        .enter(tags::SEQUENCE)
        .store(tags::OCTET_STRING)
        .store(tags::OCTET_STRING)
        .leave()
        .build()
        .unwrap();
    let der = codec.encode(&packer, &["Hoi".into(), "Wereld".into()]).unwrap();

    let outer = codec.parse_header(&der).unwrap();
    let mut rest = &der[outer.header_length..];
    let mut seen = Vec::new();
    while !rest.is_empty() {
        let header = codec.parse_header(rest).unwrap();
        let total = header.header_length + header.content_length;
        seen.push(rest[header.header_length..total].to_vec());
        rest = &rest[total..];
    }
    assert_eq!(seen, vec![b"Hoi".to_vec(), b"Wereld".to_vec()]);
}

#[test]
fn required_field_missing_from_input() {
    let codec = DerCodec::new();
    let packer = extension_packer();
    // SEQUENCE { OID 2.5.29.19 } without the required extnValue
    let der = Bytes::copy_from_slice(&hex!("30 05 06 03 55 1d 13"));
    assert_eq!(
        codec.decode(&packer, &der, packer.cursor_count()),
        Err(TranscodeError::MissingRequired { cursor: 2 })
    );
}
