//! Schema-driven structural decoder
//!
//! [`decode_value`] dispatches on the schema node kind, consuming one TLV
//! per step and returning `(value, new_offset)`. The buffer is never
//! copied: every recursion works on a borrowed slice plus an explicit
//! offset.
//!
//! # Error Recovery
//!
//! Errors may be absorbed in exactly three positions: SEQUENCE field
//! fallback (optional/default), SET field matching, and CHOICE alternative
//! selection. All three are scoped to
//! [`DerError::is_recoverable`](dervish_core::DerError::is_recoverable), so
//! malformed DER and schema errors always abort the whole decode.

use crate::der::decoder::{self, DerDecoder, Tlv};
use crate::der::types::{Tag, TagClass};
use crate::schema::types::{BuiltinKind, Field, Schema, TagMode, TagSpec, TypeNode};
use crate::schema::MAX_NESTING_DEPTH;
use dervish_core::{DerError, DerResult, Value};

const TAG_SEQUENCE: u32 = 16;
const TAG_SET: u32 = 17;

/// Decode a value from the start of `buffer`
///
/// # Returns
/// Returns the decoded value and the offset of the first byte after the
/// consumed TLV.
pub fn decode_value(schema: &Schema, node: &TypeNode, buffer: &[u8]) -> DerResult<(Value, usize)> {
    decode_value_at(schema, node, buffer, 0)
}

/// Decode a value from `buffer` starting at `offset`
pub fn decode_value_at(
    schema: &Schema,
    node: &TypeNode,
    buffer: &[u8],
    offset: usize,
) -> DerResult<(Value, usize)> {
    decode_node(schema, node, buffer, offset, None, 0)
}

/// Match an observed tag against the schema's expectation
///
/// With a `wanted` override the class and number must match it; otherwise,
/// with a `universal` tag number, the class must be UNIVERSAL and the
/// number must match; with neither, any tag is accepted. Constructed-ness
/// of EXPLICIT wrappers is checked by the caller, not here.
pub fn expect_tag(observed: &Tag, wanted: Option<&TagSpec>, universal: Option<u32>) -> DerResult<()> {
    if let Some(spec) = wanted {
        if observed.class() == spec.class && observed.number() == spec.number {
            Ok(())
        } else {
            Err(DerError::TagMismatch(format!(
                "expected {:?} tag {}, got {:?}",
                spec.class, spec.number, observed
            )))
        }
    } else if let Some(number) = universal {
        if observed.class() == TagClass::Universal && observed.number() == number {
            Ok(())
        } else {
            Err(DerError::TagMismatch(format!(
                "expected universal tag {}, got {:?}",
                number, observed
            )))
        }
    } else {
        Ok(())
    }
}

fn read_tlv_at<'a>(buffer: &'a [u8], offset: usize) -> DerResult<Tlv<'a>> {
    DerDecoder::at(buffer, offset).decode_tlv()
}

/// The recursive dispatcher
///
/// `pending` is an IMPLICIT override inherited from an enclosing `Tagged`
/// node; it applies to the next TLV actually read. `depth` counts schema
/// plus input nesting.
fn decode_node(
    schema: &Schema,
    node: &TypeNode,
    buffer: &[u8],
    offset: usize,
    pending: Option<&TagSpec>,
    depth: usize,
) -> DerResult<(Value, usize)> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DerError::DepthLimit(format!(
            "nesting deeper than {}",
            MAX_NESTING_DEPTH
        )));
    }

    match node {
        TypeNode::Tagged { tag, inner } => match tag.mode {
            TagMode::Explicit => {
                let tlv = read_tlv_at(buffer, offset)?;
                if !tlv.tag.is_constructed() {
                    return Err(DerError::ExplicitTagNotConstructed(format!(
                        "explicit tag {} uses primitive encoding",
                        tag.number
                    )));
                }
                // An inherited IMPLICIT override retags the wrapper itself
                expect_tag(&tlv.tag, pending.or(Some(tag)), None)?;

                // Contained decode: the wrapper's value is a fresh buffer,
                // and the wrapper's end is the caller-visible offset
                let (value, _) = decode_node(schema, inner, tlv.value, 0, None, depth + 1)?;
                Ok((value, tlv.end_offset))
            }
            TagMode::Implicit => {
                let pending = pending.or(Some(tag));
                decode_node(schema, inner, buffer, offset, pending, depth + 1)
            }
        },

        TypeNode::Constrained { inner, .. } => {
            // Constraints are not validated
            decode_node(schema, inner, buffer, offset, pending, depth + 1)
        }

        TypeNode::TypeRef(name) => {
            // A reference is a transparent alias, not a TLV layer
            let resolved = schema.resolve(name)?;
            decode_node(schema, resolved, buffer, offset, pending, depth + 1)
        }

        TypeNode::Builtin { kind, values } => {
            let tlv = read_tlv_at(buffer, offset)?;
            expect_tag(&tlv.tag, pending, Some(kind.universal_tag()))?;
            let value = decode_builtin(*kind, values.as_deref(), tlv.value)?;
            Ok((value, tlv.end_offset))
        }

        TypeNode::Sequence(fields) => {
            let tlv = read_tlv_at(buffer, offset)?;
            expect_tag(&tlv.tag, pending, Some(TAG_SEQUENCE))?;
            let record = decode_sequence_fields(schema, fields, tlv.value, depth)?;
            Ok((Value::Record(record), tlv.end_offset))
        }

        TypeNode::Set(fields) => {
            let tlv = read_tlv_at(buffer, offset)?;
            expect_tag(&tlv.tag, pending, Some(TAG_SET))?;
            let record = decode_set_fields(schema, fields, tlv.value, depth)?;
            Ok((Value::Record(record), tlv.end_offset))
        }

        TypeNode::SequenceOf(element) => {
            let tlv = read_tlv_at(buffer, offset)?;
            expect_tag(&tlv.tag, pending, Some(TAG_SEQUENCE))?;
            let items = decode_elements(schema, element, tlv.value, depth)?;
            Ok((Value::List(items), tlv.end_offset))
        }

        TypeNode::SetOf(element) => {
            let tlv = read_tlv_at(buffer, offset)?;
            expect_tag(&tlv.tag, pending, Some(TAG_SET))?;
            // Wire order is preserved, no reordering or dedup
            let items = decode_elements(schema, element, tlv.value, depth)?;
            Ok((Value::List(items), tlv.end_offset))
        }

        TypeNode::Choice(alternatives) => {
            for (name, alternative) in alternatives {
                match decode_node(schema, alternative, buffer, offset, pending, depth + 1) {
                    Ok((value, end)) => {
                        return Ok((
                            Value::Choice {
                                name: name.clone(),
                                value: Box::new(value),
                            },
                            end,
                        ));
                    }
                    Err(err) if err.is_recoverable() => {
                        log::trace!("CHOICE alternative {} rejected: {}", name, err);
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(DerError::NoAlternativeMatched(format!(
                "none of {} alternatives decoded at offset {}",
                alternatives.len(),
                offset
            )))
        }
    }
}

/// Dispatch a builtin kind to its primitive value decoder
fn decode_builtin(
    kind: BuiltinKind,
    values: Option<&[(String, i64)]>,
    content: &[u8],
) -> DerResult<Value> {
    match kind {
        BuiltinKind::Boolean => Ok(Value::Boolean(decoder::boolean_from_content(content)?)),
        BuiltinKind::Integer => {
            let number = decoder::integer_from_content(content)?;
            if let Some(values) = values {
                if let Some((name, _)) = values.iter().find(|(_, value)| *value == number) {
                    return Ok(Value::Enumerated(name.clone()));
                }
            }
            Ok(Value::Integer(number))
        }
        BuiltinKind::BitString => {
            let (data, unused_bits) = decoder::bit_string_from_content(content)?;
            Ok(Value::BitString { data, unused_bits })
        }
        BuiltinKind::OctetString => Ok(Value::Bytes(content.to_vec())),
        BuiltinKind::Null => {
            decoder::null_from_content(content)?;
            Ok(Value::Null)
        }
        BuiltinKind::ObjectIdentifier => {
            Ok(Value::ObjectIdentifier(decoder::oid_from_content(content)?))
        }
        BuiltinKind::Utf8String => Ok(Value::Text(decoder::utf8_from_content(content)?)),
        BuiltinKind::PrintableString
        | BuiltinKind::Ia5String
        | BuiltinKind::UtcTime
        | BuiltinKind::GeneralizedTime => Ok(Value::Text(decoder::ascii_from_content(
            content,
            kind.name(),
        )?)),
    }
}

/// Decode SEQUENCE content: strict declared-order field matching
///
/// A field whose decode fails recoverably does not consume the TLV; the
/// same position is retried by the next field. Content left over after the
/// last field is ignored (extension tolerance).
fn decode_sequence_fields(
    schema: &Schema,
    fields: &[Field],
    content: &[u8],
    depth: usize,
) -> DerResult<Vec<(String, Value)>> {
    let mut record = Vec::with_capacity(fields.len());
    let mut cursor = 0;

    for field in fields {
        if cursor >= content.len() {
            resolve_missing_field(field, &mut record);
            continue;
        }

        match decode_node(schema, &field.node, content, cursor, None, depth + 1) {
            Ok((value, end)) => {
                record.push((field.name.clone(), value));
                cursor = end;
            }
            Err(err) if err.is_recoverable() => {
                log::debug!("SEQUENCE field {} did not match: {}", field.name, err);
                resolve_missing_field(field, &mut record);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(record)
}

/// Decode SET content: any-order field matching
///
/// For each content TLV the still-unmatched fields are tried in declared
/// order; the first that decodes claims it. A TLV no field claims is
/// skipped as an unrecognized/extension element.
fn decode_set_fields(
    schema: &Schema,
    fields: &[Field],
    content: &[u8],
    depth: usize,
) -> DerResult<Vec<(String, Value)>> {
    let mut slots: Vec<Option<Value>> = vec![None; fields.len()];
    let mut cursor = 0;

    while cursor < content.len() {
        // Read the child's bounds up front so it can be skipped if
        // unclaimed; a malformed child header aborts the decode
        let child = read_tlv_at(content, cursor)?;

        let mut claimed = false;
        for (index, field) in fields.iter().enumerate() {
            if slots[index].is_some() {
                continue;
            }
            match decode_node(schema, &field.node, content, cursor, None, depth + 1) {
                Ok((value, end)) => {
                    slots[index] = Some(value);
                    cursor = end;
                    claimed = true;
                    break;
                }
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            }
        }

        if !claimed {
            log::debug!("skipping unrecognized SET element {:?}", child.tag);
            cursor = child.end_offset;
        }
    }

    let mut record = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        match slots[index].take() {
            Some(value) => record.push((field.name.clone(), value)),
            None => resolve_missing_field(field, &mut record),
        }
    }
    Ok(record)
}

/// Apply the default/optional/absent policy for a field with no value
fn resolve_missing_field(field: &Field, record: &mut Vec<(String, Value)>) {
    if let Some(default) = &field.default {
        record.push((field.name.clone(), default.clone()));
    } else if !field.optional {
        record.push((field.name.clone(), Value::Null));
    }
}

/// Decode SEQUENCE OF/SET OF content into an ordered element list
fn decode_elements(
    schema: &Schema,
    element: &TypeNode,
    content: &[u8],
    depth: usize,
) -> DerResult<Vec<Value>> {
    let mut items = Vec::new();
    let mut cursor = 0;
    while cursor < content.len() {
        let (value, end) = decode_node(schema, element, content, cursor, None, depth + 1)?;
        items.push(value);
        cursor = end;
    }
    Ok(items)
}
