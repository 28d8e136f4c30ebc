//! Packer descriptors: the byte programs that describe a message type.
//!
//! ```text
//! 0x00 END           last byte of every descriptor
//! 0x01 ENTER tag     descend into a constructed value (no cursor)
//! 0x02 STORE tag     store the content of a value (one cursor)
//! 0x03 LEAVE         close the innermost ENTER
//! 0x04 OPTIONAL      the next ENTER, STORE or ANY may be absent
//! 0x05 ANY           store one complete value, header included (one cursor)
//! ```
//!
//! A SEQUENCE of two OCTET STRINGs is `01 30 02 04 02 04 03 00` and stores two
//! cursors. Descriptors are validated once, when parsed, and kept as a tree so
//! the codec never re-checks them.

use std::{fmt, sync::Arc};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    errors::{Result, TranscodeError},
    tags,
};

/// Deepest ENTER nesting a descriptor may use
pub const MAX_PACKER_DEPTH: usize = 64;

/// Packer instruction opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Terminates the descriptor
    End = 0x00,
    /// Descend into a constructed value
    Enter = 0x01,
    /// Store value content into a cursor
    Store = 0x02,
    /// Close the innermost ENTER
    Leave = 0x03,
    /// Prefix marking the next element as OPTIONAL
    Optional = 0x04,
    /// Store a complete value of any tag
    Any = 0x05,
}

impl Opcode {
    /// Convert from u8, returning `None` for unknown opcodes
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::End),
            0x01 => Some(Self::Enter),
            0x02 => Some(Self::Store),
            0x03 => Some(Self::Leave),
            0x04 => Some(Self::Optional),
            0x05 => Some(Self::Any),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether the opcode is followed by a tag byte
    pub fn takes_tag(self) -> bool {
        matches!(self, Self::Enter | Self::Store)
    }
}

/// One validated element of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Store { tag: u8, optional: bool },
    Any { optional: bool },
    Enter { tag: u8, optional: bool, children: Vec<Node>, cursors: usize },
}

impl Node {
    pub(crate) fn cursors(&self) -> usize {
        match self {
            Self::Store { .. } | Self::Any { .. } => 1,
            Self::Enter { cursors, .. } => *cursors,
        }
    }
}

/// Validated packer descriptor.
///
/// Cloning is cheap: the raw bytes and the parsed tree are both shared.
#[derive(Clone, PartialEq, Eq)]
pub struct PackerDescriptor {
    raw: Bytes,
    nodes: Arc<[Node]>,
    cursor_count: usize,
}

impl PackerDescriptor {
    /// Parse and validate a descriptor.
    pub fn parse(raw: impl Into<Bytes>) -> Result<Self> {
        let raw = raw.into();
        let nodes = parse_nodes(&raw)?;
        let cursor_count = nodes.iter().map(Node::cursors).sum();
        Ok(Self { raw, nodes: nodes.into(), cursor_count })
    }

    /// Raw descriptor bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Number of cursors a decode yields and an encode consumes
    pub fn cursor_count(&self) -> usize {
        self.cursor_count
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl fmt::Debug for PackerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackerDescriptor")
            .field("raw", &hex::encode(&self.raw))
            .field("cursor_count", &self.cursor_count)
            .finish()
    }
}

fn read_tag(raw: &[u8], offset: usize) -> Result<u8> {
    let &tag = raw
        .get(offset)
        .ok_or(TranscodeError::MalformedPacker { offset, reason: "missing tag byte" })?;
    if tags::is_high_tag_number(tag) {
        return Err(TranscodeError::MalformedPacker { offset, reason: "high tag number form" });
    }
    Ok(tag)
}

fn parse_nodes(raw: &[u8]) -> Result<Vec<Node>> {
    struct Scope {
        tag: u8,
        optional: bool,
        parent: Vec<Node>,
    }

    let mut stack: Vec<Scope> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut optional_at: Option<usize> = None;
    let mut offset = 0;

    loop {
        let &byte = raw
            .get(offset)
            .ok_or(TranscodeError::MalformedPacker { offset, reason: "missing END" })?;
        let opcode = Opcode::from_u8(byte)
            .ok_or(TranscodeError::MalformedPacker { offset, reason: "unknown opcode" })?;

        match opcode {
            Opcode::End => {
                if optional_at.is_some() {
                    return Err(TranscodeError::MalformedPacker {
                        offset,
                        reason: "OPTIONAL not followed by an element",
                    });
                }
                if !stack.is_empty() {
                    return Err(TranscodeError::MalformedPacker {
                        offset,
                        reason: "ENTER without LEAVE",
                    });
                }
                if offset + 1 != raw.len() {
                    return Err(TranscodeError::MalformedPacker {
                        offset: offset + 1,
                        reason: "bytes after END",
                    });
                }
                return Ok(current);
            },
            Opcode::Optional => {
                if optional_at.is_some() {
                    return Err(TranscodeError::MalformedPacker {
                        offset,
                        reason: "repeated OPTIONAL",
                    });
                }
                optional_at = Some(offset);
                offset += 1;
            },
            Opcode::Store => {
                let tag = read_tag(raw, offset + 1)?;
                current.push(Node::Store { tag, optional: optional_at.take().is_some() });
                offset += 2;
            },
            Opcode::Any => {
                current.push(Node::Any { optional: optional_at.take().is_some() });
                offset += 1;
            },
            Opcode::Enter => {
                let tag = read_tag(raw, offset + 1)?;
                if !tags::is_constructed(tag) {
                    return Err(TranscodeError::MalformedPacker {
                        offset: offset + 1,
                        reason: "ENTER needs a constructed tag",
                    });
                }
                if stack.len() == MAX_PACKER_DEPTH {
                    return Err(TranscodeError::MalformedPacker {
                        offset,
                        reason: "ENTER nesting too deep",
                    });
                }
                stack.push(Scope {
                    tag,
                    optional: optional_at.take().is_some(),
                    parent: std::mem::take(&mut current),
                });
                offset += 2;
            },
            Opcode::Leave => {
                if optional_at.is_some() {
                    return Err(TranscodeError::MalformedPacker {
                        offset,
                        reason: "OPTIONAL not followed by an element",
                    });
                }
                let scope = stack
                    .pop()
                    .ok_or(TranscodeError::MalformedPacker { offset, reason: "LEAVE without ENTER" })?;
                let children = std::mem::replace(&mut current, scope.parent);
                let cursors = children.iter().map(Node::cursors).sum();
                current.push(Node::Enter {
                    tag: scope.tag,
                    optional: scope.optional,
                    children,
                    cursors,
                });
                offset += 1;
            },
        }
    }
}

/// Incremental construction of a descriptor.
///
/// ```
/// use derview_proto::{PackerBuilder, tags};
///
/// let packer = PackerBuilder::new()
///     .enter(tags::SEQUENCE)
///     .store(tags::OCTET_STRING)
///     .optional()
///     .store(tags::OCTET_STRING)
///     .leave()
///     .build()
///     .unwrap();
/// assert_eq!(packer.cursor_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackerBuilder {
    buf: BytesMut,
}

impl PackerBuilder {
    /// Start an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append ENTER for a constructed tag.
    pub fn enter(mut self, tag: u8) -> Self {
        self.buf.put_slice(&[Opcode::Enter.to_u8(), tag]);
        self
    }

    /// Append STORE for a tag.
    pub fn store(mut self, tag: u8) -> Self {
        self.buf.put_slice(&[Opcode::Store.to_u8(), tag]);
        self
    }

    /// Append ANY.
    pub fn any(mut self) -> Self {
        self.buf.put_u8(Opcode::Any.to_u8());
        self
    }

    /// Append LEAVE.
    pub fn leave(mut self) -> Self {
        self.buf.put_u8(Opcode::Leave.to_u8());
        self
    }

    /// Mark the next element OPTIONAL.
    pub fn optional(mut self) -> Self {
        self.buf.put_u8(Opcode::Optional.to_u8());
        self
    }

    /// Append END and validate.
    pub fn build(mut self) -> Result<PackerDescriptor> {
        self.buf.put_u8(Opcode::End.to_u8());
        PackerDescriptor::parse(self.buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn two_octet_strings() {
        let packer = PackerDescriptor::parse(hex!("01 30 02 04 02 04 03 00").to_vec()).unwrap();
        assert_eq!(packer.cursor_count(), 2);
        assert_eq!(
            packer.nodes(),
            &[Node::Enter {
                tag: 0x30,
                optional: false,
                children: vec![
                    Node::Store { tag: 0x04, optional: false },
                    Node::Store { tag: 0x04, optional: false },
                ],
                cursors: 2,
            }]
        );
    }

    #[test]
    fn builder_matches_raw_bytes() {
        let built = PackerBuilder::new()
            .enter(tags::SEQUENCE)
            .optional()
            .enter(tags::context(0, true).unwrap())
            .store(tags::INTEGER)
            .leave()
            .any()
            .leave()
            .build()
            .unwrap();
        assert_eq!(built.as_bytes(), &hex!("01 30 04 01 a0 02 02 03 05 03 00"));
        assert_eq!(built.cursor_count(), 2);
    }

    #[test]
    fn rejects_malformed_descriptors() {
        let cases: &[(&[u8], &str)] = &[
            (&hex!("02 04"), "missing END"),
            (&hex!("09 00"), "unknown opcode"),
            (&hex!("02"), "missing tag byte"),
            (&hex!("01 04 03 00"), "ENTER needs a constructed tag"),
            (&hex!("01 30 00"), "ENTER without LEAVE"),
            (&hex!("03 00"), "LEAVE without ENTER"),
            (&hex!("04 00"), "OPTIONAL not followed by an element"),
            (&hex!("04 04 02 04 00"), "repeated OPTIONAL"),
            (&hex!("02 1f 00"), "high tag number form"),
            (&hex!("00 00"), "bytes after END"),
        ];
        for (raw, expected) in cases {
            match PackerDescriptor::parse(Bytes::copy_from_slice(raw)) {
                Err(TranscodeError::MalformedPacker { reason, .. }) => {
                    assert_eq!(reason, *expected, "descriptor {}", hex::encode(raw));
                },
                other => panic!("expected MalformedPacker for {}, got {other:?}", hex::encode(raw)),
            }
        }
    }

    #[test]
    fn nesting_limit() {
        let mut raw = Vec::new();
        for _ in 0..=MAX_PACKER_DEPTH {
            raw.extend_from_slice(&[0x01, 0x30]);
        }
        raw.push(0x00);
        assert!(matches!(
            PackerDescriptor::parse(raw),
            Err(TranscodeError::MalformedPacker { reason: "ENTER nesting too deep", .. })
        ));
    }

    #[test]
    fn opcode_roundtrip() {
        for byte in 0u8..=0x05 {
            let opcode = Opcode::from_u8(byte).unwrap();
            assert_eq!(opcode.to_u8(), byte);
        }
        assert!(Opcode::from_u8(0x06).is_none());
        assert!(Opcode::Store.takes_tag());
        assert!(!Opcode::Leave.takes_tag());
    }
}
