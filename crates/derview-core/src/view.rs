//! Named access to a region of a shared cursor table.
//!
//! A [`View`] never owns field data. Reads copy the cursor out of the shared
//! table, writes go straight into it, and every view derived from the same
//! decode sees the result. Nested views are built once, together with their
//! parent, and keep the table alive through their own handle.

use std::{fmt, ops::Range};

use bytes::Bytes;
use derview_proto::{Codec, Cursor, PackerDescriptor};
use tracing::trace;

use crate::{
    error::{LayoutError, Result, ViewError},
    layout::{FieldBinding, FieldLayout, normalize_name},
    pack::PackAdapter,
    table::CursorTable,
};

/// Result of reading a field.
#[derive(Debug, Clone)]
pub enum Field<'v> {
    /// Scalar field: the current cursor
    Value(Cursor),
    /// Structured field: the nested view
    View(&'v View),
}

impl<'v> Field<'v> {
    /// The cursor, if this is a scalar field
    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            Self::Value(cursor) => Some(cursor),
            Self::View(_) => None,
        }
    }

    /// The nested view, if this is a structured field
    pub fn view(&self) -> Option<&'v View> {
        match self {
            Self::Value(_) => None,
            Self::View(view) => Some(view),
        }
    }
}

/// A named, possibly nested view over part of a cursor table.
#[derive(Debug)]
pub struct View {
    type_name: Option<String>,
    packer: Option<PackerDescriptor>,
    layout: FieldLayout,
    table: CursorTable,
    base_offset: usize,
}

impl View {
    pub(crate) fn new(
        type_name: Option<String>,
        packer: Option<PackerDescriptor>,
        layout: FieldLayout,
        table: CursorTable,
        base_offset: usize,
    ) -> Self {
        Self { type_name, packer, layout, table, base_offset }
    }

    /// Registered type this view was built from, if any
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Packer descriptor; `None` for inline nested structures
    pub fn packer(&self) -> Option<&PackerDescriptor> {
        self.packer.as_ref()
    }

    /// The shared table
    pub fn table(&self) -> &CursorTable {
        &self.table
    }

    /// Absolute index this view's region starts at
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Number of direct fields (nested views count once)
    pub fn field_count(&self) -> usize {
        self.layout.len()
    }

    /// The resolved layout
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Direct field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.layout.iter().map(|(name, _)| name)
    }

    /// Table range this view packs, if it has a packer
    pub fn packed_range(&self) -> Option<Range<usize>> {
        self.packer.as_ref().map(|p| self.base_offset..self.base_offset + p.cursor_count())
    }

    /// Find the binding for `name`.
    ///
    /// Hyphens match underscores. A name that is not found is retried with
    /// one trailing underscore removed, so `type_` reaches a field named
    /// `type`.
    pub fn resolve(&self, name: &str) -> Result<&FieldBinding> {
        let normalized = normalize_name(name);
        let mut candidate = normalized.as_str();
        loop {
            if let Some(binding) = self.layout.get(candidate) {
                return Ok(binding);
            }
            match candidate.strip_suffix('_') {
                Some(shorter) => candidate = shorter,
                None => return Err(ViewError::FieldNotFound(name.to_owned())),
            }
        }
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Result<Field<'_>> {
        match self.resolve(name)? {
            FieldBinding::CursorIndex(index) => self.cursor_at(name, *index).map(Field::Value),
            FieldBinding::NestedView(view) => Ok(Field::View(view)),
        }
    }

    /// Read a scalar field.
    pub fn cursor(&self, name: &str) -> Result<Cursor> {
        let index = self.scalar_index(name)?;
        self.cursor_at(name, index)
    }

    /// Borrow a nested view.
    pub fn view(&self, name: &str) -> Result<&View> {
        self.resolve(name)?.view().ok_or_else(|| ViewError::NotANestedField(name.to_owned()))
    }

    /// Read a field through a dotted path such as `tbsCertificate.validity.notAfter`.
    pub fn lookup(&self, path: &str) -> Result<Field<'_>> {
        let Some((parents, field)) = path.rsplit_once('.') else {
            return self.get(path);
        };
        let mut view = self;
        for segment in parents.split('.') {
            view = view.view(segment)?;
        }
        view.get(field)
    }

    /// Write a scalar field. The new value is visible through every view of
    /// the table.
    pub fn set(&self, name: &str, value: impl Into<Cursor>) -> Result<()> {
        let index = self.scalar_index(name)?;
        let value = value.into();
        trace!(field = name, index, present = value.is_present(), "set field");
        self.table.replace(index, value).map(drop).ok_or_else(|| self.out_of_range(name, index))
    }

    /// Mark a scalar field absent.
    pub fn delete(&self, name: &str) -> Result<()> {
        self.set(name, Cursor::Absent)
    }

    /// Cursors this view packs, copied out of the table.
    pub fn cursors(&self) -> Result<Vec<Cursor>> {
        let range = self
            .packed_range()
            .ok_or(ViewError::Argument("view has no packer descriptor; pack its enclosing type"))?;
        let len = self.table.len();
        self.table.slice(range.clone()).ok_or_else(|| {
            LayoutError::TableTooShort {
                type_name: self.type_name.clone().unwrap_or_default(),
                needed: range.end,
                len,
            }
            .into()
        })
    }

    /// Encode this view's region to DER.
    pub fn pack<C: Codec>(&self, codec: C) -> Result<Bytes> {
        PackAdapter::new(codec).pack(self)
    }

    /// Encode and strip the outer header, leaving the content octets.
    pub fn format<C: Codec>(&self, codec: C) -> Result<Bytes> {
        PackAdapter::new(codec).format(self)
    }

    fn scalar_index(&self, name: &str) -> Result<usize> {
        self.resolve(name)?
            .cursor_index()
            .ok_or_else(|| ViewError::NotAScalarField(name.to_owned()))
    }

    fn cursor_at(&self, name: &str, index: usize) -> Result<Cursor> {
        self.table.get(index).ok_or_else(|| self.out_of_range(name, index))
    }

    fn out_of_range(&self, name: &str, index: usize) -> ViewError {
        LayoutError::IndexOutOfRange { field: name.to_owned(), index, len: self.table.len() }.into()
    }
}

/// ASN.1 value notation: present scalars as `'hex'H`, nested views indented,
/// absent fields left out.
impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items = Vec::new();
        for (name, binding) in self.layout.iter() {
            match binding {
                FieldBinding::CursorIndex(index) => {
                    if let Some(cursor) = self.table.get(*index)
                        && cursor.is_present()
                    {
                        items.push(format!("{name} {cursor}"));
                    }
                },
                FieldBinding::NestedView(view) => {
                    items.push(format!("{name} {}", view.to_string().replace('\n', "\n    ")));
                },
            }
        }

        if items.is_empty() {
            return f.write_str("{ }");
        }
        write!(f, "{{\n    {} }}", items.join(",\n    "))
    }
}
