//! Wire side of the derview workspace.
//!
//! DER values are tag-length-value triples. A message type is described by a
//! packer descriptor: a short byte program that says which values to enter and
//! which to store. Decoding runs the program over DER input and yields a flat
//! list of cursors, one per stored value, with OPTIONAL values that were not
//! present represented as [`Cursor::Absent`]. Encoding runs the same program
//! the other way.
//!
//! The view layer in `derview-core` only talks to the [`Codec`] trait, so this
//! crate's [`DerCodec`] is one implementation of that boundary rather than a
//! hard dependency of the structural logic.
//!
//! # Security
//!
//! Content lengths are bounded by [`CodecConfig::max_content_length`] (16 MiB
//! by default) and constructed nesting by [`CodecConfig::max_depth`]. Decoded
//! cursors are zero-copy slices of the input buffer.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod cursor;
pub mod errors;
pub mod header;
pub mod packer;
pub mod primitive;
pub mod tags;

pub use codec::{Codec, CodecConfig, DerCodec};
pub use cursor::Cursor;
pub use errors::{Result, TranscodeError};
pub use header::{Header, Values, parse_header, prefix_header, split_value, write_header};
pub use packer::{Opcode, PackerBuilder, PackerDescriptor};
pub use primitive::BitString;
