//! Core types for the dervish DER codec
//!
//! This crate provides the error taxonomy and the dynamically-shaped value
//! tree shared by the schema-driven encoder and decoder in `dervish-asn1`.

pub mod error;
pub mod value;

pub use error::{DerError, DerResult};
pub use value::Value;
