//! Schema-driven DER encoding and decoding
//!
//! This crate decodes DER (ITU-T X.690 Distinguished Encoding Rules) byte
//! buffers into structured [`Value`] trees according to a runtime-supplied
//! ASN.1-style type schema, and encodes such trees back to canonical DER.
//!
//! The layers, bottom up:
//!
//! - [`der`]: the wire codec with tag/length forms, the TLV reader
//!   ([`DerDecoder`]) and writer ([`DerEncoder`]), and the primitive value
//!   decoders.
//! - [`schema`]: the type IR ([`TypeNode`], [`Schema`]) and the structural
//!   walkers [`decode_value`] and [`encode_value`] that interpret a buffer
//!   against it.
//!
//! # Usage Example
//!
//! ```rust
//! use dervish_asn1::{decode_value, Field, Schema, TypeNode, Value};
//!
//! let schema = Schema::new();
//! let node = TypeNode::Sequence(vec![
//!     Field::required("serial", TypeNode::integer()),
//!     Field::optional("comment", TypeNode::utf8_string()),
//! ]);
//! let wire = [0x30, 0x03, 0x02, 0x01, 0x2A];
//! let (value, consumed) = decode_value(&schema, &node, &wire)?;
//! assert_eq!(consumed, wire.len());
//! assert_eq!(value.field("serial").and_then(Value::as_i64), Some(42));
//! # Ok::<(), dervish_asn1::DerError>(())
//! ```

pub mod der;
pub mod schema;

pub use der::{DerDecoder, DerEncoder, Length, Tag, TagClass, Tlv};
pub use schema::{
    BuiltinKind, Constraint, Field, MAX_NESTING_DEPTH, Schema, TagMode, TagSpec, TypeNode,
    decode_value, decode_value_at, encode_value, expect_tag,
};

pub use dervish_core::{DerError, DerResult, Value};
