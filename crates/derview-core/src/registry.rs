//! Registered message types.
//!
//! A message type pairs a packer descriptor with the layout template that
//! names its cursors. Type references inside templates are resolved against a
//! [`TypeRegistry`] when a view is built, so one type can be reused at
//! several positions of larger structures.

use std::collections::HashMap;

use ciborium::Value;
use derview_proto::PackerDescriptor;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{LayoutError, Result, ViewError},
    template::{LayoutTemplate, value_kind},
};

/// A named type: how to transcode it and how its cursors are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    name: String,
    packer: PackerDescriptor,
    template: LayoutTemplate,
}

impl MessageType {
    /// Create a message type
    pub fn new(name: impl Into<String>, packer: PackerDescriptor, template: LayoutTemplate) -> Self {
        Self { name: name.into(), packer, template }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Packer descriptor
    pub fn packer(&self) -> &PackerDescriptor {
        &self.packer
    }

    /// Layout template
    pub fn template(&self) -> &LayoutTemplate {
        &self.template
    }

    /// Cursors one instance of this type occupies
    pub fn cursor_count(&self) -> usize {
        self.packer.cursor_count()
    }
}

/// One entry of a CBOR type bundle.
#[derive(Debug, Deserialize)]
struct TypeRecord {
    name: String,
    packer: Value,
    template: Value,
}

/// Message types by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, MessageType>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type. Names are unique.
    pub fn register(&mut self, ty: MessageType) -> std::result::Result<(), LayoutError> {
        if self.types.contains_key(ty.name()) {
            return Err(LayoutError::DuplicateType(ty.name));
        }
        debug!(name = %ty.name, cursors = ty.cursor_count(), "registered message type");
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, ty: MessageType) -> std::result::Result<Self, LayoutError> {
        self.register(ty)?;
        Ok(self)
    }

    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<&MessageType> {
        self.types.get(name)
    }

    /// Whether a type is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered type names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Load types from a CBOR bundle.
    ///
    /// The bundle is an array of maps with keys `name` (text), `packer`
    /// (bytes holding a descriptor) and `template` (a template map).
    pub fn from_cbor_slice(bytes: &[u8]) -> Result<Self> {
        let records: Vec<TypeRecord> =
            ciborium::from_reader(bytes).map_err(|e| LayoutError::Bundle(e.to_string()))?;

        let mut registry = Self::new();
        for record in records {
            let Value::Bytes(packer) = record.packer else {
                return Err(ViewError::Layout(LayoutError::UnsupportedValue {
                    field: format!("{}.packer", record.name),
                    found: value_kind(&record.packer),
                }));
            };
            let packer = PackerDescriptor::parse(packer)?;
            let template = LayoutTemplate::from_cbor(&record.template)?;
            registry.register(MessageType::new(record.name, packer, template))?;
        }
        Ok(registry)
    }
}
