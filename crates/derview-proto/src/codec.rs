//! Cursor codec: packer descriptor + DER bytes <-> flat cursor list.
//!
//! [`Codec`] is the boundary the view layer is written against. [`DerCodec`]
//! implements it by walking the validated descriptor tree:
//!
//! - STORE matches the next value's tag and stores its content.
//! - ANY stores the next value whole, header included.
//! - ENTER matches a constructed value and walks its content; the content must
//!   be consumed exactly by the time the matching LEAVE is reached.
//! - OPTIONAL elements that do not match (or have run out of input) decode as
//!   [`Cursor::Absent`]; an absent ENTER yields one `Absent` per cursor inside.
//!
//! Encoding runs the same walk in reverse, omitting absent OPTIONAL elements.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::{
    cursor::Cursor,
    errors::{Result, TranscodeError},
    header::{self, Header, split_value, write_header},
    packer::{Node, PackerDescriptor},
};

/// The binary codec the view layer delegates to.
pub trait Codec {
    /// Decode `data` into exactly `cursor_count` cursors.
    fn decode(
        &self,
        packer: &PackerDescriptor,
        data: &Bytes,
        cursor_count: usize,
    ) -> Result<Vec<Cursor>>;

    /// Encode cursors into DER.
    fn encode(&self, packer: &PackerDescriptor, cursors: &[Cursor]) -> Result<Bytes>;

    /// Parse the header at the start of `data`.
    fn parse_header(&self, data: &[u8]) -> Result<Header>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decode(
        &self,
        packer: &PackerDescriptor,
        data: &Bytes,
        cursor_count: usize,
    ) -> Result<Vec<Cursor>> {
        (**self).decode(packer, data, cursor_count)
    }

    fn encode(&self, packer: &PackerDescriptor, cursors: &[Cursor]) -> Result<Bytes> {
        (**self).encode(packer, cursors)
    }

    fn parse_header(&self, data: &[u8]) -> Result<Header> {
        (**self).parse_header(data)
    }
}

/// Decoder limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest content length accepted for a single value
    pub max_content_length: usize,
    /// Deepest constructed nesting accepted while decoding
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { max_content_length: 16 * 1024 * 1024, max_depth: 64 }
    }
}

/// Reference DER implementation of [`Codec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DerCodec {
    config: CodecConfig,
}

impl DerCodec {
    /// Codec with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with custom limits
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Active limits
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl Codec for DerCodec {
    fn decode(
        &self,
        packer: &PackerDescriptor,
        data: &Bytes,
        cursor_count: usize,
    ) -> Result<Vec<Cursor>> {
        if packer.cursor_count() != cursor_count {
            return Err(TranscodeError::CursorCountMismatch {
                expected: packer.cursor_count(),
                actual: cursor_count,
            });
        }

        let mut decoder = Decoder { config: &self.config, out: Vec::with_capacity(cursor_count) };
        decoder.decode_scope(packer.nodes(), data.clone(), 0)?;
        debug!(bytes = data.len(), cursors = decoder.out.len(), "decoded DER value");
        Ok(decoder.out)
    }

    fn encode(&self, packer: &PackerDescriptor, cursors: &[Cursor]) -> Result<Bytes> {
        if packer.cursor_count() != cursors.len() {
            return Err(TranscodeError::CursorCountMismatch {
                expected: packer.cursor_count(),
                actual: cursors.len(),
            });
        }

        let mut buf = BytesMut::new();
        let mut next = 0;
        encode_nodes(packer.nodes(), cursors, &mut next, &mut buf)?;
        debug!(bytes = buf.len(), cursors = cursors.len(), "encoded DER value");
        Ok(buf.freeze())
    }

    fn parse_header(&self, data: &[u8]) -> Result<Header> {
        header::parse_header(data)
    }
}

struct Decoder<'a> {
    config: &'a CodecConfig,
    out: Vec<Cursor>,
}

impl Decoder<'_> {
    fn decode_scope(&mut self, nodes: &[Node], scope: Bytes, depth: usize) -> Result<()> {
        let mut rest = scope;

        for node in nodes {
            match node {
                Node::Store { tag, optional } => {
                    let cursor = match self.take(&mut rest, Some(*tag), *optional)? {
                        Some((header, value)) => Cursor::Present(value.slice(header.header_length..)),
                        None => Cursor::Absent,
                    };
                    self.out.push(cursor);
                },
                Node::Any { optional } => {
                    let cursor = match self.take(&mut rest, None, *optional)? {
                        Some((_, value)) => Cursor::Present(value),
                        None => Cursor::Absent,
                    };
                    self.out.push(cursor);
                },
                Node::Enter { tag, optional, children, cursors } => {
                    match self.take(&mut rest, Some(*tag), *optional)? {
                        Some((header, value)) => {
                            if depth >= self.config.max_depth {
                                return Err(TranscodeError::DepthLimit {
                                    limit: self.config.max_depth,
                                });
                            }
                            self.decode_scope(
                                children,
                                value.slice(header.header_length..),
                                depth + 1,
                            )?;
                        },
                        None => {
                            trace!(tag, cursors, "optional constructed value absent");
                            self.out.extend(std::iter::repeat_n(Cursor::Absent, *cursors));
                        },
                    }
                },
            }
        }

        if rest.is_empty() {
            Ok(())
        } else {
            Err(TranscodeError::TrailingData { remaining: rest.len() })
        }
    }

    /// Take the next value off `rest` if it matches.
    ///
    /// `Ok(None)` means an OPTIONAL element is absent.
    fn take(
        &self,
        rest: &mut Bytes,
        expected: Option<u8>,
        optional: bool,
    ) -> Result<Option<(Header, Bytes)>> {
        if rest.is_empty() {
            return if optional {
                Ok(None)
            } else {
                Err(TranscodeError::MissingRequired { cursor: self.out.len() })
            };
        }

        let header = header::parse_header(rest)?;
        if let Some(tag) = expected
            && header.tag != tag
        {
            return if optional {
                Ok(None)
            } else {
                Err(TranscodeError::TagMismatch { expected: tag, found: header.tag })
            };
        }
        if header.content_length > self.config.max_content_length {
            return Err(TranscodeError::LengthLimit {
                length: header.content_length,
                limit: self.config.max_content_length,
            });
        }

        let (header, value, remainder) = split_value(rest)?;
        *rest = remainder;
        Ok(Some((header, value)))
    }
}

fn encode_nodes(
    nodes: &[Node],
    cursors: &[Cursor],
    next: &mut usize,
    buf: &mut BytesMut,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Store { tag, optional } => {
                let index = *next;
                *next += 1;
                match &cursors[index] {
                    Cursor::Present(content) => {
                        write_header(*tag, content.len(), buf);
                        buf.put_slice(content);
                    },
                    Cursor::Absent if *optional => {},
                    Cursor::Absent => return Err(TranscodeError::MissingRequired { cursor: index }),
                }
            },
            Node::Any { optional } => {
                let index = *next;
                *next += 1;
                match &cursors[index] {
                    Cursor::Present(value) => {
                        let whole = split_value(value)
                            .is_ok_and(|(_, _, remainder)| remainder.is_empty());
                        if !whole {
                            return Err(TranscodeError::MalformedAny { cursor: index });
                        }
                        buf.put_slice(value);
                    },
                    Cursor::Absent if *optional => {},
                    Cursor::Absent => return Err(TranscodeError::MissingRequired { cursor: index }),
                }
            },
            Node::Enter { tag, optional, children, cursors: width } => {
                let start = *next;
                if *optional && cursors[start..start + width].iter().all(Cursor::is_absent) {
                    *next += width;
                    continue;
                }
                let mut inner = BytesMut::new();
                encode_nodes(children, cursors, next, &mut inner)?;
                write_header(*tag, inner.len(), buf);
                buf.put_slice(&inner);
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::{packer::PackerBuilder, tags};

    fn hello_world() -> PackerDescriptor {
        PackerBuilder::new()
            .enter(tags::SEQUENCE)
            .store(tags::OCTET_STRING)
            .store(tags::OCTET_STRING)
            .leave()
            .build()
            .unwrap()
    }

    #[test]
    fn encode_two_strings() {
        let codec = DerCodec::new();
        let der = codec.encode(&hello_world(), &["Hoi".into(), "Wereld".into()]).unwrap();
        assert_eq!(&der[..], &hex!("30 0d 04 03 48 6f 69 04 06 57 65 72 65 6c 64"));
    }

    #[test]
    fn decode_two_strings() {
        let codec = DerCodec::new();
        let der = Bytes::copy_from_slice(&hex!("30 0d 04 03 48 6f 69 04 06 57 65 72 65 6c 64"));
        let cursors = codec.decode(&hello_world(), &der, 2).unwrap();
        assert_eq!(cursors, vec![Cursor::from("Hoi"), Cursor::from("Wereld")]);
    }

    #[test]
    fn missing_required_on_encode() {
        let codec = DerCodec::new();
        let result = codec.encode(&hello_world(), &[Cursor::Absent, "x".into()]);
        assert_eq!(result, Err(TranscodeError::MissingRequired { cursor: 0 }));
    }

    #[test]
    fn cursor_count_is_checked() {
        let codec = DerCodec::new();
        let der = Bytes::copy_from_slice(&hex!("30 00"));
        assert_eq!(
            codec.decode(&hello_world(), &der, 3),
            Err(TranscodeError::CursorCountMismatch { expected: 2, actual: 3 })
        );
        assert_eq!(
            codec.encode(&hello_world(), &[Cursor::Absent]),
            Err(TranscodeError::CursorCountMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn optional_fields_decode_absent() {
        let packer = PackerBuilder::new()
            .enter(tags::SEQUENCE)
            .optional()
            .store(tags::INTEGER)
            .store(tags::OCTET_STRING)
            .optional()
            .enter(tags::context(0, true).unwrap())
            .store(tags::BOOLEAN)
            .store(tags::INTEGER)
            .leave()
            .leave()
            .build()
            .unwrap();
        let codec = DerCodec::new();

        let der = Bytes::copy_from_slice(&hex!("30 03 04 01 aa"));
        let cursors = codec.decode(&packer, &der, 4).unwrap();
        assert_eq!(cursors[0], Cursor::Absent);
        assert_eq!(cursors[1], Cursor::from(&[0xaa_u8]));
        assert_eq!(cursors[2], Cursor::Absent);
        assert_eq!(cursors[3], Cursor::Absent);

        // Absent optional parts are omitted again on encode
        assert_eq!(codec.encode(&packer, &cursors).unwrap(), der);
    }

    #[test]
    fn tag_mismatch_and_trailing_data() {
        let codec = DerCodec::new();
        let der = Bytes::copy_from_slice(&hex!("31 00"));
        assert_eq!(
            codec.decode(&hello_world(), &der, 2),
            Err(TranscodeError::TagMismatch { expected: 0x30, found: 0x31 })
        );

        let der = Bytes::copy_from_slice(&hex!("30 06 04 00 04 00 05 00"));
        assert_eq!(
            codec.decode(&hello_world(), &der, 2),
            Err(TranscodeError::TrailingData { remaining: 2 })
        );

        let der = Bytes::copy_from_slice(&hex!("30 04 04 00 04 00 00"));
        assert_eq!(
            codec.decode(&hello_world(), &der, 2),
            Err(TranscodeError::TrailingData { remaining: 1 })
        );
    }

    #[test]
    fn any_keeps_the_header() {
        let packer = PackerBuilder::new().enter(tags::SEQUENCE).any().leave().build().unwrap();
        let codec = DerCodec::new();
        let der = Bytes::copy_from_slice(&hex!("30 03 02 01 07"));
        let cursors = codec.decode(&packer, &der, 1).unwrap();
        assert_eq!(cursors[0], Cursor::from(&hex!("02 01 07")));
        assert_eq!(codec.encode(&packer, &cursors).unwrap(), der);

        let ragged = [Cursor::from(&hex!("02 01 07 00"))];
        assert_eq!(codec.encode(&packer, &ragged), Err(TranscodeError::MalformedAny { cursor: 0 }));
    }

    #[test]
    fn limits_are_enforced() {
        let codec = DerCodec::with_config(CodecConfig { max_content_length: 4, max_depth: 1 });

        let der = Bytes::copy_from_slice(&hex!("30 05 04 03 00 00 00"));
        assert_eq!(
            codec.decode(&hello_world(), &der, 2),
            Err(TranscodeError::LengthLimit { length: 5, limit: 4 })
        );

        let nested = PackerBuilder::new()
            .enter(tags::SEQUENCE)
            .enter(tags::SEQUENCE)
            .store(tags::NULL)
            .leave()
            .leave()
            .build()
            .unwrap();
        let der = Bytes::copy_from_slice(&hex!("30 04 30 02 05 00"));
        assert_eq!(codec.decode(&nested, &der, 1), Err(TranscodeError::DepthLimit { limit: 1 }));
        assert!(DerCodec::new().decode(&nested, &der, 1).is_ok());
    }

    #[test]
    fn codec_by_reference() {
        fn header_via<C: Codec>(codec: C) -> Header {
            codec.parse_header(&hex!("30 04")).unwrap()
        }
        let codec = DerCodec::new();
        assert_eq!(header_via(&codec).content_length, 4);
    }
}
