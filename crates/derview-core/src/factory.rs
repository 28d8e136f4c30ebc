//! Building views from registered types.
//!
//! The factory is the only place views come from. It picks or allocates the
//! shared table, then walks the layout template once, resolving type
//! references through the registry and checking every cursor index against
//! the table. Any malformed template is rejected here, so a finished view only
//! fails on field access for names it does not have.

use bytes::Bytes;
use derview_proto::{Codec, Cursor, PackerDescriptor, Values};
use tracing::debug;

use crate::{
    error::{LayoutError, Result, ViewError},
    layout::{FieldBinding, FieldLayout, normalize_name},
    pack::PackAdapter,
    registry::TypeRegistry,
    sequence::SequenceOf,
    table::CursorTable,
    template::{LayoutEntry, LayoutTemplate},
    view::View,
};

/// Where a view's cursors come from.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Anchor at `offset` in an existing table
    Shared {
        /// Table to share
        table: CursorTable,
        /// Absolute index of the view's first cursor
        offset: usize,
    },
    /// Decode DER into a fresh table
    Decode(Bytes),
    /// Fresh table of tombstones
    Empty,
}

/// Factory limits.
#[derive(Debug, Clone, Copy)]
pub struct FactoryConfig {
    /// Maximum nesting of type references
    pub max_type_depth: usize,
    /// Largest fresh table the factory allocates
    pub max_cursors: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self { max_type_depth: 32, max_cursors: 1 << 16 }
    }
}

/// Builds views for the types of one registry.
#[derive(Debug)]
pub struct ViewFactory<'r, C> {
    registry: &'r TypeRegistry,
    codec: C,
    config: FactoryConfig,
}

impl<'r, C: Codec> ViewFactory<'r, C> {
    /// Factory with default limits
    pub fn new(registry: &'r TypeRegistry, codec: C) -> Self {
        Self::with_config(registry, codec, FactoryConfig::default())
    }

    /// Factory with custom limits
    pub fn with_config(registry: &'r TypeRegistry, codec: C, config: FactoryConfig) -> Self {
        Self { registry, codec, config }
    }

    /// The registry type references resolve against
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// The codec used for decoding
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Pack adapter sharing this factory's codec
    pub fn pack_adapter(&self) -> PackAdapter<&C> {
        PackAdapter::new(&self.codec)
    }

    /// Build a view of a registered type.
    pub fn build(&self, type_name: &str, source: TableSource) -> Result<View> {
        let ty = self
            .registry
            .get(type_name)
            .ok_or_else(|| LayoutError::UnknownType(type_name.to_owned()))?;
        self.build_inner(Some(type_name), ty.template(), Some(ty.packer()), source)
    }

    /// View of a registered type over a fresh table with every field absent.
    pub fn empty(&self, type_name: &str) -> Result<View> {
        self.build(type_name, TableSource::Empty)
    }

    /// Decode DER into a view of a registered type.
    pub fn decode(&self, type_name: &str, der: impl Into<Bytes>) -> Result<View> {
        self.build(type_name, TableSource::Decode(der.into()))
    }

    /// View of a registered type anchored in an existing table.
    pub fn shared(&self, type_name: &str, table: CursorTable, offset: usize) -> Result<View> {
        self.build(type_name, TableSource::Shared { table, offset })
    }

    /// Build a view from an unregistered template.
    ///
    /// Without a packer the view cannot be packed or decoded into, and an
    /// empty table is sized to what the template addresses.
    pub fn build_template(
        &self,
        template: &LayoutTemplate,
        packer: Option<&PackerDescriptor>,
        source: TableSource,
    ) -> Result<View> {
        self.build_inner(None, template, packer, source)
    }

    /// Decode the content of a SEQUENCE OF or SET OF field into one view per
    /// element. An absent cursor yields an empty collection.
    pub fn sequence_of(&self, element_type: &str, content: &Cursor) -> Result<SequenceOf> {
        if !self.registry.contains(element_type) {
            return Err(LayoutError::UnknownType(element_type.to_owned()).into());
        }
        let mut sequence = SequenceOf::new(element_type);
        let Some(content) = content.bytes() else {
            return Ok(sequence);
        };

        for value in Values::new(content) {
            let (_, der) = value?;
            sequence.push(self.decode(element_type, der)?)?;
        }
        debug!(element_type, elements = sequence.len(), "decoded SEQUENCE OF");
        Ok(sequence)
    }

    fn build_inner(
        &self,
        type_name: Option<&str>,
        template: &LayoutTemplate,
        packer: Option<&PackerDescriptor>,
        source: TableSource,
    ) -> Result<View> {
        let (table, base) = match source {
            TableSource::Shared { table, offset } => (table, offset),
            TableSource::Decode(der) => {
                if der.is_empty() {
                    return Err(ViewError::Argument("no DER data to decode"));
                }
                let packer =
                    packer.ok_or(ViewError::Argument("decoding needs a packer descriptor"))?;
                let cursors = self.codec.decode(packer, &der, packer.cursor_count())?;
                (CursorTable::new(cursors), 0)
            },
            TableSource::Empty => {
                let len = match packer {
                    Some(packer) => packer.cursor_count(),
                    None => self.span(template)?,
                };
                if len > self.config.max_cursors {
                    return Err(LayoutError::CursorLimit {
                        needed: len,
                        limit: self.config.max_cursors,
                    }
                    .into());
                }
                (CursorTable::absent(len), 0)
            },
        };

        let mut stack: Vec<String> = type_name.map(str::to_owned).into_iter().collect();
        let view = self.instantiate(
            type_name.map(str::to_owned),
            template,
            packer.cloned(),
            &table,
            base,
            &mut stack,
        )?;
        debug!(
            type_name = type_name.unwrap_or_default(),
            base,
            fields = view.field_count(),
            cursors = table.len(),
            "built view"
        );
        Ok(view)
    }

    /// Build one view and, recursively, all of its nested views.
    ///
    /// `stack` holds the registered types currently being built, outermost
    /// first. Offsets saturate: no table reaches `usize::MAX` cursors, so a
    /// saturated index always fails the bounds checks.
    fn instantiate(
        &self,
        type_name: Option<String>,
        template: &LayoutTemplate,
        packer: Option<PackerDescriptor>,
        table: &CursorTable,
        base: usize,
        stack: &mut Vec<String>,
    ) -> Result<View> {
        if let (Some(name), Some(packer)) = (&type_name, &packer) {
            let span = self.span(template)?;
            if span > packer.cursor_count() {
                return Err(LayoutError::SpanMismatch {
                    type_name: name.clone(),
                    span,
                    cursors: packer.cursor_count(),
                }
                .into());
            }
            let needed = base.saturating_add(packer.cursor_count());
            if needed > table.len() {
                return Err(LayoutError::TableTooShort {
                    type_name: name.clone(),
                    needed,
                    len: table.len(),
                }
                .into());
            }
        }

        let mut layout = FieldLayout::default();
        for (raw_name, entry) in template.entries() {
            let name = normalize_name(raw_name);
            let binding = match entry {
                LayoutEntry::Index(index) => {
                    let index = base.saturating_add(*index);
                    if index >= table.len() {
                        return Err(LayoutError::IndexOutOfRange {
                            field: name,
                            index,
                            len: table.len(),
                        }
                        .into());
                    }
                    FieldBinding::CursorIndex(index)
                },
                LayoutEntry::Nested(inner) => {
                    let view = self.instantiate(None, inner, None, table, base, stack)?;
                    FieldBinding::NestedView(Box::new(view))
                },
                LayoutEntry::TypeRef { type_name: target, suboffset } => {
                    let base = base.saturating_add(*suboffset);
                    let view = self.instantiate_ref(target, table, base, stack)?;
                    FieldBinding::NestedView(Box::new(view))
                },
            };
            if !layout.insert(name.clone(), binding) {
                return Err(LayoutError::DuplicateField(name).into());
            }
        }

        Ok(View::new(type_name, packer, layout, table.clone(), base))
    }

    fn instantiate_ref(
        &self,
        target: &str,
        table: &CursorTable,
        base: usize,
        stack: &mut Vec<String>,
    ) -> Result<View> {
        if stack.iter().any(|name| name == target) {
            let mut chain = stack.join(" -> ");
            chain.push_str(" -> ");
            chain.push_str(target);
            return Err(LayoutError::Cycle(chain).into());
        }
        if stack.len() >= self.config.max_type_depth {
            return Err(LayoutError::DepthLimit { limit: self.config.max_type_depth }.into());
        }
        let ty =
            self.registry.get(target).ok_or_else(|| LayoutError::UnknownType(target.to_owned()))?;

        stack.push(target.to_owned());
        let view = self.instantiate(
            Some(target.to_owned()),
            ty.template(),
            Some(ty.packer().clone()),
            table,
            base,
            stack,
        );
        stack.pop();
        view
    }

    /// Number of cursors a template addresses, relative to its base.
    ///
    /// A type reference covers the referenced type's whole packed range.
    /// Saturates at `usize::MAX`.
    fn span(&self, template: &LayoutTemplate) -> Result<usize> {
        let mut span = 0;
        for (_, entry) in template.entries() {
            let end = match entry {
                LayoutEntry::Index(index) => index.saturating_add(1),
                LayoutEntry::Nested(inner) => self.span(inner)?,
                LayoutEntry::TypeRef { type_name, suboffset } => {
                    let ty = self
                        .registry
                        .get(type_name)
                        .ok_or_else(|| LayoutError::UnknownType(type_name.clone()))?;
                    suboffset.saturating_add(ty.cursor_count())
                },
            };
            span = span.max(end);
        }
        Ok(span)
    }
}
