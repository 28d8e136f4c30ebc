//! Shared schema for the integration tests: a cut-down X.509 certificate,
//! plus a few small types for name handling and inline nesting.
#![allow(dead_code)]

use bytes::Bytes;
use derview_core::{LayoutTemplate, MessageType, TypeRegistry, ViewFactory};
use derview_proto::{Cursor, DerCodec, PackerBuilder, PackerDescriptor, tags};
use hex_literal::hex;

pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
pub const BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const KEY_USAGE: &str = "2.5.29.15";
pub const SUBJECT_KEY_ID: &str = "2.5.29.14";

// AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }
fn algorithm_identifier(b: PackerBuilder) -> PackerBuilder {
    b.enter(tags::SEQUENCE).store(tags::OID).optional().any().leave()
}

// Validity ::= SEQUENCE { notBefore UTCTime, notAfter UTCTime }
fn validity(b: PackerBuilder) -> PackerBuilder {
    b.enter(tags::SEQUENCE).store(tags::UTC_TIME).store(tags::UTC_TIME).leave()
}

// Extension ::= SEQUENCE { extnID OID, critical BOOLEAN OPTIONAL, extnValue OCTET STRING }
fn extension(b: PackerBuilder) -> PackerBuilder {
    b.enter(tags::SEQUENCE)
        .store(tags::OID)
        .optional()
        .store(tags::BOOLEAN)
        .store(tags::OCTET_STRING)
        .leave()
}

// TBSCertificate ::= SEQUENCE {
//     version         [0] EXPLICIT INTEGER OPTIONAL,
//     serialNumber    INTEGER,
//     signature       AlgorithmIdentifier,
//     subject         UTF8String,
//     validity        Validity,
//     extensions      [3] EXPLICIT SEQUENCE OF Extension OPTIONAL }
fn tbs_certificate(b: PackerBuilder) -> PackerBuilder {
    let b = b
        .enter(tags::SEQUENCE)
        .optional()
        .enter(tags::context(0, true).unwrap())
        .store(tags::INTEGER)
        .leave()
        .store(tags::INTEGER);
    let b = algorithm_identifier(b).store(tags::UTF8_STRING);
    validity(b)
        .optional()
        .enter(tags::context(3, true).unwrap())
        .store(tags::SEQUENCE)
        .leave()
        .leave()
}

// Certificate ::= SEQUENCE {
//     tbsCertificate      TBSCertificate,
//     signatureAlgorithm  AlgorithmIdentifier,
//     signature           BIT STRING }
fn certificate(b: PackerBuilder) -> PackerBuilder {
    algorithm_identifier(tbs_certificate(b.enter(tags::SEQUENCE))).store(tags::BIT_STRING).leave()
}

fn packer(program: fn(PackerBuilder) -> PackerBuilder) -> PackerDescriptor {
    program(PackerBuilder::new()).build().unwrap()
}

fn pair_packer() -> PackerDescriptor {
    PackerBuilder::new()
        .enter(tags::SEQUENCE)
        .store(tags::OCTET_STRING)
        .store(tags::OCTET_STRING)
        .leave()
        .build()
        .unwrap()
}

// Span ::= SEQUENCE { start INTEGER, bounds SEQUENCE { low INTEGER, high INTEGER } }
fn span_packer() -> PackerDescriptor {
    PackerBuilder::new()
        .enter(tags::SEQUENCE)
        .store(tags::INTEGER)
        .enter(tags::SEQUENCE)
        .store(tags::INTEGER)
        .store(tags::INTEGER)
        .leave()
        .leave()
        .build()
        .unwrap()
}

pub fn registry() -> TypeRegistry {
    let types = [
        MessageType::new(
            "AlgorithmIdentifier",
            packer(algorithm_identifier),
            LayoutTemplate::new().index("algorithm", 0).index("parameters", 1),
        ),
        MessageType::new(
            "Validity",
            packer(validity),
            LayoutTemplate::new().index("notBefore", 0).index("notAfter", 1),
        ),
        MessageType::new(
            "Extension",
            packer(extension),
            LayoutTemplate::new().index("extnID", 0).index("critical", 1).index("extnValue", 2),
        ),
        MessageType::new(
            "TBSCertificate",
            packer(tbs_certificate),
            LayoutTemplate::new()
                .index("version", 0)
                .index("serialNumber", 1)
                .type_ref("signature", "AlgorithmIdentifier", 2)
                .index("subject", 4)
                .type_ref("validity", "Validity", 5)
                .index("extensions", 7),
        ),
        MessageType::new(
            "Certificate",
            packer(certificate),
            LayoutTemplate::new()
                .type_ref("tbsCertificate", "TBSCertificate", 0)
                .type_ref("signatureAlgorithm", "AlgorithmIdentifier", 8)
                .index("signature", 10),
        ),
        MessageType::new(
            "Greeting",
            pair_packer(),
            LayoutTemplate::new().index("hello", 0).index("world", 1),
        ),
        MessageType::new(
            "Record",
            pair_packer(),
            LayoutTemplate::new().index("foo-bar", 0).index("type", 1),
        ),
        MessageType::new(
            "Span",
            span_packer(),
            LayoutTemplate::new()
                .index("start", 0)
                .nested("bounds", LayoutTemplate::new().index("low", 1).index("high", 2)),
        ),
    ];

    let mut registry = TypeRegistry::new();
    for ty in types {
        registry.register(ty).unwrap();
    }
    registry
}

// DER of one Extension.
pub fn extension_der(
    factory: &ViewFactory<'_, &DerCodec>,
    oid: &str,
    critical: Option<bool>,
    value: &[u8],
) -> Bytes {
    let ext = factory.empty("Extension").unwrap();
    ext.set("extnID", Cursor::oid(oid).unwrap()).unwrap();
    ext.set("critical", critical.map(Cursor::boolean)).unwrap();
    ext.set("extnValue", value).unwrap();
    ext.pack(factory.codec()).unwrap()
}

// DER of a complete certificate with two extensions.
pub fn certificate_der(factory: &ViewFactory<'_, &DerCodec>) -> Bytes {
    let cert = factory.empty("Certificate").unwrap();
    let tbs = cert.view("tbsCertificate").unwrap();

    tbs.set("version", Cursor::integer(2)).unwrap();
    tbs.set("serialNumber", Cursor::integer(0x1234)).unwrap();
    for alg in [tbs.view("signature").unwrap(), cert.view("signatureAlgorithm").unwrap()] {
        alg.set("algorithm", Cursor::oid(SHA256_WITH_RSA).unwrap()).unwrap();
        alg.set("parameters", &hex!("05 00")).unwrap();
    }
    tbs.set("subject", "derview test").unwrap();

    let validity = tbs.view("validity").unwrap();
    validity.set("notBefore", "260101000000Z").unwrap();
    validity.set("notAfter", "270101000000Z").unwrap();

    let mut extensions =
        extension_der(factory, BASIC_CONSTRAINTS, Some(true), &hex!("30 00")).to_vec();
    extensions.extend_from_slice(&extension_der(factory, KEY_USAGE, None, &hex!("03 02 05 a0")));
    tbs.set("extensions", extensions).unwrap();

    cert.set("signature", &hex!("00 de ad be ef")).unwrap();
    cert.pack(factory.codec()).unwrap()
}
