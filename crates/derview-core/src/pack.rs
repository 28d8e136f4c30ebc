//! Encoding views back to DER.

use bytes::Bytes;
use derview_proto::Codec;
use tracing::debug;

use crate::{
    error::{Result, ViewError},
    view::View,
};

/// Encodes views through a codec.
///
/// Only views with a packer descriptor can be packed: top-level views and
/// nested views built from a type reference. Inline nested structures are
/// packed as part of their enclosing type.
#[derive(Debug, Clone)]
pub struct PackAdapter<C> {
    codec: C,
}

impl<C: Codec> PackAdapter<C> {
    /// Wrap a codec
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Encode the view's packed region: the cursors from its base offset
    /// through as many as its packer stores.
    pub fn pack(&self, view: &View) -> Result<Bytes> {
        let packer = view
            .packer()
            .ok_or(ViewError::Argument("view has no packer descriptor; pack its enclosing type"))?;
        let cursors = view.cursors()?;
        let der = self.codec.encode(packer, &cursors)?;
        debug!(
            type_name = view.type_name().unwrap_or_default(),
            base = view.base_offset(),
            bytes = der.len(),
            "packed view"
        );
        Ok(der)
    }

    /// Encode, then drop the outer header.
    pub fn format(&self, view: &View) -> Result<Bytes> {
        let der = self.pack(view)?;
        let header = self.codec.parse_header(&der)?;
        Ok(der.slice(header.header_length..))
    }
}
