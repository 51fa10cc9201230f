//! Schema IR and the structural codec
//!
//! A [`Schema`] holds named [`TypeNode`] definitions describing ASN.1-style
//! types: builtin scalars, references to named types, SEQUENCE/SET records,
//! homogeneous SEQUENCE OF/SET OF collections, CHOICE alternatives, and
//! tag overrides (EXPLICIT or IMPLICIT). The schema is immutable input: the
//! codec never mutates it, and any number of decode calls may share one
//! schema concurrently.
//!
//! [`decode_value`] walks a buffer against a node, consuming one TLV per
//! step and producing a [`Value`](dervish_core::Value) tree mirroring the
//! schema shape. [`encode_value`] is the symmetric direction.

pub mod decode;
pub mod encode;
pub mod types;

pub use decode::{decode_value, decode_value_at, expect_tag};
pub use encode::encode_value;
pub use types::{BuiltinKind, Constraint, Field, Schema, TagMode, TagSpec, TypeNode};

/// Ceiling on combined schema/input nesting depth
///
/// Recursion in the walkers is bounded by the nesting of the input and the
/// schema, so adversarial input could otherwise grow the stack without
/// limit.
pub const MAX_NESTING_DEPTH: usize = 64;
