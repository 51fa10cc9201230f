//! DER (Distinguished Encoding Rules) wire codec
//!
//! DER is the canonical, deterministic subset of ASN.1's BER. Each value is
//! encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! The identifier octets carry the type of the data:
//! - **Class** (2 bits): Universal (00), Application (01),
//!   Context-specific (10), Private (11)
//! - **Constructed/Primitive** (1 bit): 0 = Primitive, 1 = Constructed
//! - **Tag Number**: 0-30 in the low 5 bits, or `11111` followed by
//!   base-128 continuation octets for larger numbers
//!
//! ## Length Encoding
//!
//! - **Short form** (1 byte): lengths 0-127, bit 7 = 0
//! - **Long form**: first byte has bit 7 = 1 and carries the number of
//!   following big-endian length octets
//! - **Indefinite form** (`0x80`): BER only, rejected here with
//!   [`DerError::DerViolation`](dervish_core::DerError)
//!
//! This module knows nothing about schemas; the schema-driven interpretation
//! lives in [`crate::schema`].

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::{DerDecoder, Tlv};
pub use encoder::DerEncoder;
pub use types::{Length, Tag, TagClass};
