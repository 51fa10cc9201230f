//! Schema-driven structural encoder
//!
//! The symmetric direction of [`crate::schema::decode`]: walks a
//! [`Value`](dervish_core::Value) tree against a schema node and produces
//! canonical DER. Optional fields absent from the record are omitted, as
//! are fields equal to their DEFAULT value.

use crate::der::encoder::{self, DerEncoder};
use crate::der::types::{Tag, TagClass};
use crate::schema::types::{BuiltinKind, Field, Schema, TagMode, TagSpec, TypeNode};
use crate::schema::MAX_NESTING_DEPTH;
use dervish_core::{DerError, DerResult, Value};

const TAG_SEQUENCE: u32 = 16;
const TAG_SET: u32 = 17;

/// Encode a value against a schema node
pub fn encode_value(schema: &Schema, node: &TypeNode, value: &Value) -> DerResult<Vec<u8>> {
    encode_node(schema, node, value, None, 0)
}

/// Pick the outgoing tag: an IMPLICIT override replaces the natural tag
fn outgoing_tag(pending: Option<&TagSpec>, universal: u32, constructed: bool) -> Tag {
    match pending {
        Some(spec) => Tag::new(spec.class, constructed, spec.number),
        None => Tag::new(TagClass::Universal, constructed, universal),
    }
}

fn encode_node(
    schema: &Schema,
    node: &TypeNode,
    value: &Value,
    pending: Option<&TagSpec>,
    depth: usize,
) -> DerResult<Vec<u8>> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DerError::DepthLimit(format!(
            "nesting deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }

    match node {
        TypeNode::Tagged { tag, inner } => match tag.mode {
            TagMode::Explicit => {
                let inner_bytes = encode_node(schema, inner, value, None, depth + 1)?;
                let spec = pending.unwrap_or(tag);
                let mut wrapper = DerEncoder::with_capacity(inner_bytes.len() + 4);
                wrapper.encode_tlv(&Tag::new(spec.class, true, spec.number), &inner_bytes);
                Ok(wrapper.into_bytes())
            }
            TagMode::Implicit => {
                let pending = pending.or(Some(tag));
                encode_node(schema, inner, value, pending, depth + 1)
            }
        },

        TypeNode::Constrained { inner, .. } => encode_node(schema, inner, value, pending, depth + 1),

        TypeNode::TypeRef(name) => {
            let resolved = schema.resolve(name)?;
            encode_node(schema, resolved, value, pending, depth + 1)
        }

        TypeNode::Builtin { kind, values } => {
            let content = builtin_content(*kind, values.as_deref(), value)?;
            let tag = outgoing_tag(pending, kind.universal_tag(), false);
            let mut out = DerEncoder::with_capacity(content.len() + 4);
            out.encode_tlv(&tag, &content);
            Ok(out.into_bytes())
        }

        TypeNode::Sequence(fields) => {
            let body = encode_record_fields(schema, fields, value, depth)?;
            let tag = outgoing_tag(pending, TAG_SEQUENCE, true);
            let mut out = DerEncoder::with_capacity(body.len() + 4);
            out.encode_tlv(&tag, &body);
            Ok(out.into_bytes())
        }

        TypeNode::Set(fields) => {
            // Declared field order; the decoder accepts any order
            let body = encode_record_fields(schema, fields, value, depth)?;
            let tag = outgoing_tag(pending, TAG_SET, true);
            let mut out = DerEncoder::with_capacity(body.len() + 4);
            out.encode_tlv(&tag, &body);
            Ok(out.into_bytes())
        }

        TypeNode::SequenceOf(element) => {
            let body = encode_elements(schema, element, value, depth)?;
            let tag = outgoing_tag(pending, TAG_SEQUENCE, true);
            let mut out = DerEncoder::with_capacity(body.len() + 4);
            out.encode_tlv(&tag, &body);
            Ok(out.into_bytes())
        }

        TypeNode::SetOf(element) => {
            let body = encode_elements(schema, element, value, depth)?;
            let tag = outgoing_tag(pending, TAG_SET, true);
            let mut out = DerEncoder::with_capacity(body.len() + 4);
            out.encode_tlv(&tag, &body);
            Ok(out.into_bytes())
        }

        TypeNode::Choice(alternatives) => {
            let Value::Choice { name, value: inner } = value else {
                return Err(DerError::Encoding(format!(
                    "CHOICE expects a choice value, got {:?}",
                    value
                )));
            };
            let Some((_, alternative)) = alternatives.iter().find(|(alt, _)| alt == name) else {
                return Err(DerError::Encoding(format!(
                    "unknown CHOICE alternative {:?}",
                    name
                )));
            };
            encode_node(schema, alternative, inner, pending, depth + 1)
        }
    }
}

/// Encode SEQUENCE/SET fields in declared order
///
/// Absent optional fields and fields equal to their DEFAULT are omitted;
/// an absent required field without a default is an error.
fn encode_record_fields(
    schema: &Schema,
    fields: &[Field],
    value: &Value,
    depth: usize,
) -> DerResult<Vec<u8>> {
    let entries = match value {
        Value::Record(entries) => entries,
        other => {
            return Err(DerError::Encoding(format!(
                "SEQUENCE/SET expects a record value, got {:?}",
                other
            )));
        }
    };

    let mut body = DerEncoder::new();
    for field in fields {
        let field_value = entries
            .iter()
            .find(|(name, _)| name == &field.name)
            .map(|(_, value)| value);

        match field_value {
            Some(field_value) => {
                if field.default.as_ref() == Some(field_value) {
                    // DER: a value equal to its DEFAULT must be omitted
                    continue;
                }
                body.extend(&encode_node(schema, &field.node, field_value, None, depth + 1)?);
            }
            None => {
                if field.optional || field.default.is_some() {
                    continue;
                }
                return Err(DerError::Encoding(format!(
                    "missing required field {:?}",
                    field.name
                )));
            }
        }
    }
    Ok(body.into_bytes())
}

/// Encode SEQUENCE OF/SET OF elements in list order
fn encode_elements(
    schema: &Schema,
    element: &TypeNode,
    value: &Value,
    depth: usize,
) -> DerResult<Vec<u8>> {
    let items = match value {
        Value::List(items) => items,
        other => {
            return Err(DerError::Encoding(format!(
                "SEQUENCE OF/SET OF expects a list value, got {:?}",
                other
            )));
        }
    };

    let mut body = DerEncoder::new();
    for item in items {
        body.extend(&encode_node(schema, element, item, None, depth + 1)?);
    }
    Ok(body.into_bytes())
}

/// Build the content octets of a builtin kind from a value
fn builtin_content(
    kind: BuiltinKind,
    values: Option<&[(String, i64)]>,
    value: &Value,
) -> DerResult<Vec<u8>> {
    match (kind, value) {
        (BuiltinKind::Boolean, Value::Boolean(flag)) => {
            Ok(encoder::boolean_content(*flag).to_vec())
        }
        (BuiltinKind::Integer, Value::Integer(number)) => Ok(encoder::integer_content(*number)),
        (BuiltinKind::Integer, Value::Enumerated(name)) => {
            let Some((_, number)) = values
                .unwrap_or(&[])
                .iter()
                .find(|(value_name, _)| value_name == name)
            else {
                return Err(DerError::Encoding(format!(
                    "unknown enumeration name {:?}",
                    name
                )));
            };
            Ok(encoder::integer_content(*number))
        }
        (BuiltinKind::BitString, Value::BitString { data, unused_bits }) => {
            encoder::bit_string_content(data, *unused_bits)
        }
        (BuiltinKind::OctetString, Value::Bytes(bytes)) => Ok(bytes.clone()),
        (BuiltinKind::Null, Value::Null) => Ok(Vec::new()),
        (BuiltinKind::ObjectIdentifier, Value::ObjectIdentifier(oid)) => {
            encoder::oid_content(oid)
        }
        (BuiltinKind::Utf8String, Value::Text(text)) => Ok(text.as_bytes().to_vec()),
        (
            BuiltinKind::PrintableString
            | BuiltinKind::Ia5String
            | BuiltinKind::UtcTime
            | BuiltinKind::GeneralizedTime,
            Value::Text(text),
        ) => {
            if !text.is_ascii() {
                return Err(DerError::Encoding(format!(
                    "{} requires ASCII text",
                    kind.name()
                )));
            }
            Ok(text.as_bytes().to_vec())
        }
        (kind, value) => Err(DerError::Encoding(format!(
            "expected a {} value, got {:?}",
            kind.name(),
            value
        ))),
    }
}
