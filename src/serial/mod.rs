//! XML serialization.
//!
//! Turns a `Document` tree back into XML text. Encoding the text into the
//! document's declared character set is left to [`crate::encoding`].

pub mod xml;

pub use xml::{serialize, serialize_node, serialize_with_options, SerializeOptions};
