//! Resolved field layouts.

use std::collections::HashMap;

use crate::view::View;

/// What a resolved field name refers to.
#[derive(Debug)]
pub enum FieldBinding {
    /// Absolute index into the shared table
    CursorIndex(usize),
    /// Nested view over the same table
    NestedView(Box<View>),
}

impl FieldBinding {
    /// Absolute cursor index, if this is a scalar field
    pub fn cursor_index(&self) -> Option<usize> {
        match self {
            Self::CursorIndex(index) => Some(*index),
            Self::NestedView(_) => None,
        }
    }

    /// Nested view, if this is a structured field
    pub fn view(&self) -> Option<&View> {
        match self {
            Self::CursorIndex(_) => None,
            Self::NestedView(view) => Some(view),
        }
    }
}

/// Field names of one view, in declaration order.
///
/// Names are stored normalized: hyphens are underscores.
#[derive(Debug, Default)]
pub struct FieldLayout {
    fields: Vec<(String, FieldBinding)>,
    by_name: HashMap<String, usize>,
}

impl FieldLayout {
    /// Add a binding. Returns `false` and leaves the layout unchanged if the
    /// normalized name is taken.
    pub(crate) fn insert(&mut self, name: String, binding: FieldBinding) -> bool {
        if self.by_name.contains_key(&name) {
            return false;
        }
        self.by_name.insert(name.clone(), self.fields.len());
        self.fields.push((name, binding));
        true
    }

    /// Exact lookup of a normalized name
    pub fn get(&self, name: &str) -> Option<&FieldBinding> {
        self.by_name.get(name).and_then(|&i| self.fields.get(i)).map(|(_, binding)| binding)
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldBinding)> {
        self.fields.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Number of direct fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// ASN.1 identifiers use hyphens, field names use underscores.
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}
