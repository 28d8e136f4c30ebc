//! Error types for DER transcoding.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Errors raised while parsing headers, validating packer descriptors, or
/// encoding and decoding cursors.
///
/// The view layer propagates these unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    /// Input ended before a complete header or value could be read
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to continue
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Identifier octet uses the high-tag-number form
    #[error("high tag number form is not supported (identifier {0:#04x})")]
    HighTagNumber(u8),

    /// Length octet `0x80` (indefinite form) is not allowed in DER
    #[error("indefinite length is not allowed in DER")]
    IndefiniteLength,

    /// Long-form length that is not minimally encoded
    #[error("non-canonical length encoding")]
    NonCanonicalLength,

    /// Length does not fit the supported range
    #[error("length field of {octets} octets exceeds supported size")]
    LengthOverflow {
        /// Number of length octets announced
        octets: usize,
    },

    /// Content length exceeds the configured maximum
    #[error("content length {length} exceeds limit {limit}")]
    LengthLimit {
        /// Announced content length
        length: usize,
        /// Configured limit
        limit: usize,
    },

    /// Constructed values nest deeper than the configured maximum
    #[error("nesting depth exceeds limit {limit}")]
    DepthLimit {
        /// Configured limit
        limit: usize,
    },

    /// Value tag does not match what the packer expects
    #[error("tag mismatch: expected {expected:#04x}, found {found:#04x}")]
    TagMismatch {
        /// Tag named by the packer
        expected: u8,
        /// Tag found in the input
        found: u8,
    },

    /// A non-optional element is missing from the input or the cursors
    #[error("required value missing at cursor {cursor}")]
    MissingRequired {
        /// Cursor index the value belongs to
        cursor: usize,
    },

    /// Bytes left over after a constructed scope or the top level
    #[error("{remaining} trailing bytes after value")]
    TrailingData {
        /// Number of unconsumed bytes
        remaining: usize,
    },

    /// Cursor count does not match the packer descriptor
    #[error("cursor count mismatch: packer uses {expected}, got {actual}")]
    CursorCountMismatch {
        /// Cursors the packer stores
        expected: usize,
        /// Cursors supplied or requested
        actual: usize,
    },

    /// An ANY cursor does not hold exactly one complete TLV
    #[error("cursor {cursor} does not hold exactly one DER value")]
    MalformedAny {
        /// Cursor index
        cursor: usize,
    },

    /// Packer descriptor failed validation
    #[error("malformed packer descriptor at byte {offset}: {reason}")]
    MalformedPacker {
        /// Byte offset into the descriptor
        offset: usize,
        /// What went wrong
        reason: &'static str,
    },

    /// Primitive content could not be interpreted as the requested type
    #[error("invalid {kind} content: {reason}")]
    InvalidPrimitive {
        /// ASN.1 type name
        kind: &'static str,
        /// What went wrong
        reason: &'static str,
    },
}
