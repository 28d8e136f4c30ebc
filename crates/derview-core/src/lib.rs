//! Structural views over DER-encoded ASN.1 data.
//!
//! Decoding a message yields one flat table of cursors. This crate puts
//! names on that table: a [`View`] maps field names to cursor indices or to
//! nested views, all of them sharing the same [`CursorTable`]. Assigning a
//! field writes into the table, so the change is visible from every view and
//! is picked up when the message is packed again.
//!
//! ```text
//! Certificate view ──┐
//!   tbsCertificate ──┼──► [ c0 | c1 | c2 | ... | c10 ]  shared cursor table
//!     validity ──────┘
//! ```
//!
//! Types are registered in a [`TypeRegistry`] as a packer descriptor plus a
//! [`LayoutTemplate`]; the [`ViewFactory`] builds views from them by decoding
//! DER, by allocating an empty table, or by anchoring in a table that already
//! exists. Transcoding is delegated to a [`Codec`](derview_proto::Codec).
//!
//! # Example
//!
//! ```
//! use derview_core::{LayoutTemplate, MessageType, TypeRegistry, ViewFactory};
//! use derview_proto::{DerCodec, PackerBuilder, tags};
//!
//! let packer = PackerBuilder::new()
//!     .enter(tags::SEQUENCE)
//!     .store(tags::OCTET_STRING)
//!     .store(tags::OCTET_STRING)
//!     .leave()
//!     .build()?;
//! let template = LayoutTemplate::new().index("hello", 0).index("world", 1);
//! let registry = TypeRegistry::new().with(MessageType::new("Greeting", packer, template))?;
//!
//! let codec = DerCodec::new();
//! let factory = ViewFactory::new(&registry, &codec);
//! let greeting = factory.empty("Greeting")?;
//! greeting.set("hello", "Hoi")?;
//! greeting.set("world", "Wereld")?;
//!
//! let der = greeting.pack(&codec)?;
//! assert_eq!(factory.decode("Greeting", der)?.cursor("world")?, "Wereld");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![forbid(unsafe_code)]

pub mod error;
pub mod factory;
pub mod layout;
pub mod pack;
pub mod registry;
pub mod sequence;
pub mod table;
pub mod template;
pub mod view;

pub use derview_proto::{Cursor, Header, parse_header};
pub use error::{LayoutError, Result, ViewError};
pub use factory::{FactoryConfig, TableSource, ViewFactory};
pub use layout::{FieldBinding, FieldLayout};
pub use pack::PackAdapter;
pub use registry::{MessageType, TypeRegistry};
pub use sequence::SequenceOf;
pub use table::CursorTable;
pub use template::{LayoutEntry, LayoutTemplate};
pub use view::{Field, View};
