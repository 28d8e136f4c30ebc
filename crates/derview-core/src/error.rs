//! Error types for layout construction and field access.

use derview_proto::TranscodeError;
use thiserror::Error;

/// Result alias for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Malformed static structure: templates, type references, registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Template key is not a string
    #[error("template keys must be strings, found {found}")]
    TypeMismatch {
        /// CBOR kind of the offending key
        found: &'static str,
    },

    /// Template value is not an index, a nested template, or a type reference
    #[error(
        "field {field}: template values must be an index, a map or [type, suboffset], found {found}"
    )]
    UnsupportedValue {
        /// Field the value belongs to
        field: String,
        /// What was found instead
        found: &'static str,
    },

    /// Two fields share a name after hyphen normalization
    #[error("duplicate field {0}")]
    DuplicateField(String),

    /// Type reference names a type that is not registered
    #[error("unknown type {0}")]
    UnknownType(String),

    /// Type references loop back to a type under construction
    #[error("cyclic type reference: {0}")]
    Cycle(String),

    /// Type references nest deeper than the factory allows
    #[error("type references nest deeper than {limit}")]
    DepthLimit {
        /// Configured limit
        limit: usize,
    },

    /// A type with this name is already registered
    #[error("type {0} is already registered")]
    DuplicateType(String),

    /// A field's cursor index falls outside the shared table
    #[error("field {field} maps to cursor {index}, table holds {len}")]
    IndexOutOfRange {
        /// Field name
        field: String,
        /// Absolute cursor index
        index: usize,
        /// Table length
        len: usize,
    },

    /// A typed view's packed range does not fit the shared table
    #[error("type {type_name} needs cursors up to {needed}, table holds {len}")]
    TableTooShort {
        /// Type name
        type_name: String,
        /// One past the last cursor the type packs
        needed: usize,
        /// Table length
        len: usize,
    },

    /// A template names cursors beyond what its packer stores
    #[error("template of {type_name} spans {span} cursors, packer stores {cursors}")]
    SpanMismatch {
        /// Type name
        type_name: String,
        /// Cursors the template addresses
        span: usize,
        /// Cursors the packer stores
        cursors: usize,
    },

    /// A fresh table would hold more cursors than the factory allows
    #[error("template needs {needed} cursors, limit is {limit}")]
    CursorLimit {
        /// Cursors the template addresses, saturated at `usize::MAX`
        needed: usize,
        /// Configured limit
        limit: usize,
    },

    /// CBOR type bundle could not be read
    #[error("malformed type bundle: {0}")]
    Bundle(String),
}

/// Errors surfaced by views, the factory and the pack adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// Static structure is malformed
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// No field matches the name, even after stripping trailing underscores
    #[error("no field named {0}")]
    FieldNotFound(String),

    /// Scalar operation on a nested structure
    #[error("field {0} is a nested structure, not a scalar")]
    NotAScalarField(String),

    /// Nested-view operation on a scalar field
    #[error("field {0} is a scalar, not a nested structure")]
    NotANestedField(String),

    /// Missing or unusable input
    #[error("invalid argument: {0}")]
    Argument(&'static str),

    /// Failure reported by the codec, unchanged
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}
