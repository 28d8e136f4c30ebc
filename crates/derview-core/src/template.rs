//! Layout templates: the static description of a type's named fields.
//!
//! A template maps field names to one of three things:
//!
//! - a cursor index relative to the view's base offset,
//! - an inline nested template sharing the parent's base offset,
//! - a reference to a registered type plus a sub-offset, which becomes a
//!   nested view with its own packer anchored at `base + suboffset`.
//!
//! Templates are usually generated ahead of time and shipped as CBOR maps.
//! In that form an index is an unsigned integer, a nested template is a map,
//! and a type reference is the two-element array `[type_name, suboffset]`.

use ciborium::Value;

use crate::error::LayoutError;

/// What a template field maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutEntry {
    /// Cursor index relative to the view's base offset
    Index(usize),
    /// Inline nested structure without its own packer
    Nested(LayoutTemplate),
    /// Registered type anchored at `base + suboffset`
    TypeRef {
        /// Name of the referenced type
        type_name: String,
        /// Offset of the referenced type's first cursor
        suboffset: usize,
    },
}

/// Ordered field entries of one structure.
///
/// Names are kept as written. Hyphens become underscores when a view is
/// built from the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutTemplate {
    entries: Vec<(String, LayoutEntry)>,
}

impl LayoutTemplate {
    /// Template without fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field stored at cursor `index`
    pub fn index(self, name: impl Into<String>, index: usize) -> Self {
        self.entry(name, LayoutEntry::Index(index))
    }

    /// Add an inline nested structure
    pub fn nested(self, name: impl Into<String>, template: LayoutTemplate) -> Self {
        self.entry(name, LayoutEntry::Nested(template))
    }

    /// Add a field holding a registered type
    pub fn type_ref(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        suboffset: usize,
    ) -> Self {
        self.entry(name, LayoutEntry::TypeRef { type_name: type_name.into(), suboffset })
    }

    /// Add an arbitrary entry
    pub fn entry(mut self, name: impl Into<String>, entry: LayoutEntry) -> Self {
        self.entries.push((name.into(), entry));
        self
    }

    /// Entries in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &LayoutEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of direct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the template has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a template from a decoded CBOR map.
    pub fn from_cbor(value: &Value) -> Result<Self, LayoutError> {
        let Value::Map(pairs) = value else {
            return Err(LayoutError::UnsupportedValue {
                field: String::new(),
                found: value_kind(value),
            });
        };

        let mut template = Self::new();
        for (key, value) in pairs {
            let Value::Text(name) = key else {
                return Err(LayoutError::TypeMismatch { found: value_kind(key) });
            };
            let entry = entry_from_cbor(name, value)?;
            template.entries.push((name.clone(), entry));
        }
        Ok(template)
    }

    /// Read a template from CBOR bytes.
    pub fn from_cbor_slice(bytes: &[u8]) -> Result<Self, LayoutError> {
        let value: Value =
            ciborium::from_reader(bytes).map_err(|e| LayoutError::Bundle(e.to_string()))?;
        Self::from_cbor(&value)
    }
}

impl TryFrom<&Value> for LayoutTemplate {
    type Error = LayoutError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_cbor(value)
    }
}

fn entry_from_cbor(name: &str, value: &Value) -> Result<LayoutEntry, LayoutError> {
    let unsupported = |found| LayoutError::UnsupportedValue { field: name.to_owned(), found };

    match value {
        Value::Integer(index) => {
            cbor_usize(*index).map(LayoutEntry::Index).ok_or_else(|| unsupported("negative index"))
        },
        Value::Map(_) => LayoutTemplate::from_cbor(value).map(LayoutEntry::Nested),
        Value::Array(items) => match items.as_slice() {
            [Value::Text(type_name), Value::Integer(suboffset)] => {
                let suboffset =
                    cbor_usize(*suboffset).ok_or_else(|| unsupported("negative suboffset"))?;
                Ok(LayoutEntry::TypeRef { type_name: type_name.clone(), suboffset })
            },
            _ => Err(unsupported("array other than [type, suboffset]")),
        },
        other => Err(unsupported(value_kind(other))),
    }
}

fn cbor_usize(value: ciborium::value::Integer) -> Option<usize> {
    u64::try_from(value).ok().and_then(|v| usize::try_from(v).ok())
}

/// Short name of a CBOR value's kind, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(..) => "tag",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown",
    }
}
