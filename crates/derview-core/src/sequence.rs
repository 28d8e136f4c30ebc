//! SEQUENCE OF and SET OF collections.
//!
//! A repeated field is stored as one cursor holding the concatenated DER of
//! its elements. [`SequenceOf`] splits that content into one view per
//! element, each over its own table, and joins them back for writing.

use bytes::{Bytes, BytesMut};
use derview_proto::{Codec, prefix_header};

use crate::{
    error::{Result, ViewError},
    pack::PackAdapter,
    view::View,
};

/// Views of the elements of a repeated field, all of one registered type.
#[derive(Debug)]
pub struct SequenceOf {
    element_type: String,
    elements: Vec<View>,
}

impl SequenceOf {
    /// Empty collection of `element_type` values
    pub fn new(element_type: impl Into<String>) -> Self {
        Self { element_type: element_type.into(), elements: Vec::new() }
    }

    /// Registered type of every element
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&View> {
        self.elements.get(index)
    }

    /// Elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, View> {
        self.elements.iter()
    }

    /// Append an element. It must be a view of the element type.
    pub fn push(&mut self, element: View) -> Result<()> {
        if element.type_name() != Some(self.element_type.as_str()) {
            return Err(ViewError::Argument("element is not a view of the collection's type"));
        }
        self.elements.push(element);
        Ok(())
    }

    /// Remove and return the element at `index`
    pub fn remove(&mut self, index: usize) -> Option<View> {
        (index < self.elements.len()).then(|| self.elements.remove(index))
    }

    /// Concatenated DER of all elements: the content of the repeated field.
    pub fn format<C: Codec>(&self, codec: C) -> Result<Bytes> {
        let adapter = PackAdapter::new(codec);
        let mut content = BytesMut::new();
        for element in &self.elements {
            content.extend_from_slice(&adapter.pack(element)?);
        }
        Ok(content.freeze())
    }

    /// Complete DER of the collection under `tag`, usually
    /// [`SEQUENCE`](derview_proto::tags::SEQUENCE) or
    /// [`SET`](derview_proto::tags::SET).
    pub fn pack<C: Codec>(&self, codec: C, tag: u8) -> Result<Bytes> {
        Ok(prefix_header(tag, &self.format(codec)?))
    }
}

impl<'a> IntoIterator for &'a SequenceOf {
    type Item = &'a View;
    type IntoIter = std::slice::Iter<'a, View>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use derview_proto::{Cursor, DerCodec, PackerBuilder, tags};
    use hex_literal::hex;

    use crate::{LayoutTemplate, MessageType, TypeRegistry, ViewFactory};

    #[test]
    fn splits_and_joins_elements() {
        let packer = PackerBuilder::new().store(tags::INTEGER).build().unwrap();
        let registry = TypeRegistry::new()
            .with(MessageType::new("Number", packer, LayoutTemplate::new().index("n", 0)))
            .unwrap();
        let codec = DerCodec::new();
        let factory = ViewFactory::new(&registry, &codec);

        let content = Cursor::from(&hex!("02 01 01 02 01 02 02 01 03"));
        let mut numbers = factory.sequence_of("Number", &content).unwrap();
        let values: Vec<_> =
            numbers.iter().map(|v| v.cursor("n").unwrap().to_integer().unwrap()).collect();
        assert_eq!(values, [Some(1), Some(2), Some(3)]);

        let removed = numbers.remove(0).unwrap();
        assert_eq!(removed.cursor("n").unwrap(), Cursor::integer(1));
        assert_eq!(&numbers.format(&codec).unwrap()[..], &hex!("02 01 02 02 01 03"));
        assert_eq!(&numbers.pack(&codec, tags::SET).unwrap()[..], &hex!("31 06 02 01 02 02 01 03"));
        assert_eq!((&numbers).into_iter().count(), 2);
    }
}
