//! End-to-end schema-driven codec tests

use dervish_asn1::{
    DerEncoder, DerError, Field, Schema, TypeNode, Value, decode_value, decode_value_at,
    encode_value,
};
use hex_literal::hex;

fn empty() -> Schema {
    Schema::new()
}

#[test]
fn sequence_optional_and_default_fields() {
    let node = TypeNode::Sequence(vec![
        Field::required("a", TypeNode::integer()),
        Field::optional("b", TypeNode::utf8_string()),
        Field::with_default("c", TypeNode::integer(), Value::Integer(7)),
    ]);

    // Only field a on the wire
    let wire = hex!("30 03 02 01 05");
    let (value, consumed) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(value.field("a"), Some(&Value::Integer(5)));
    assert_eq!(value.field("b"), None);
    assert_eq!(value.field("c"), Some(&Value::Integer(7)));
}

#[test]
fn sequence_field_mismatch_is_retried_by_next_field() {
    let node = TypeNode::Sequence(vec![
        Field::optional("label", TypeNode::utf8_string()),
        Field::required("count", TypeNode::integer()),
    ]);

    // The INTEGER TLV does not match the optional UTF8String field, so the
    // same TLV is claimed by the next field
    let wire = hex!("30 03 02 01 07");
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(value.field("label"), None);
    assert_eq!(value.field("count"), Some(&Value::Integer(7)));
}

#[test]
fn sequence_missing_required_field_decodes_as_null() {
    let node = TypeNode::Sequence(vec![
        Field::required("a", TypeNode::integer()),
        Field::required("b", TypeNode::utf8_string()),
    ]);

    let wire = hex!("30 03 02 01 01");
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(value.field("a"), Some(&Value::Integer(1)));
    assert_eq!(value.field("b"), Some(&Value::Null));
}

#[test]
fn set_decodes_fields_in_any_order() {
    let node = TypeNode::Set(vec![
        Field::required("x", TypeNode::integer()),
        Field::required("y", TypeNode::utf8_string()),
    ]);

    let x_first = hex!("31 07 02 01 01 0C 02 68 69");
    let y_first = hex!("31 07 0C 02 68 69 02 01 01");

    let (a, _) = decode_value(&empty(), &node, &x_first).unwrap();
    let (b, _) = decode_value(&empty(), &node, &y_first).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.field("x"), Some(&Value::Integer(1)));
    assert_eq!(a.field("y"), Some(&Value::Text("hi".to_string())));
}

#[test]
fn set_skips_unrecognized_elements() {
    let node = TypeNode::Set(vec![Field::required("x", TypeNode::integer())]);

    // An OCTET STRING no field claims, then the integer
    let wire = hex!("31 07 04 02 AA BB 02 01 09");
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(value.field("x"), Some(&Value::Integer(9)));
}

#[test]
fn choice_selects_by_trial_decode() {
    let node = TypeNode::Choice(vec![
        ("intAlt".to_string(), TypeNode::integer()),
        ("stringAlt".to_string(), TypeNode::utf8_string()),
    ]);

    // intAlt is listed first but its decode fails on the UTF8String tag
    let wire = hex!("0C 02 68 69");
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(
        value.choice(),
        Some(("stringAlt", &Value::Text("hi".to_string())))
    );
}

#[test]
fn choice_exhaustion_reports_no_alternative() {
    let node = TypeNode::Choice(vec![
        ("intAlt".to_string(), TypeNode::integer()),
        ("boolAlt".to_string(), TypeNode::boolean()),
    ]);

    let wire = hex!("04 01 00");
    assert!(matches!(
        decode_value(&empty(), &node, &wire),
        Err(DerError::NoAlternativeMatched(_))
    ));
}

#[test]
fn explicit_tag_with_primitive_wrapper_fails() {
    let node = TypeNode::Sequence(vec![Field::required(
        "wrapped",
        TypeNode::explicit(2, TypeNode::integer()),
    )]);

    // [2] with the constructed bit clear; the error is recoverable in
    // isolation but the field fallback records null and the wrapper TLV is
    // never consumed, which this direct decode makes visible
    let wire = hex!("82 03 02 01 05");
    let direct = TypeNode::explicit(2, TypeNode::integer());
    assert!(matches!(
        decode_value(&empty(), &direct, &wire),
        Err(DerError::ExplicitTagNotConstructed(_))
    ));

    let (value, _) = decode_value(&empty(), &node, &hex!("30 05 82 03 02 01 05")).unwrap();
    assert_eq!(value.field("wrapped"), Some(&Value::Null));
}

#[test]
fn truncation_always_reports_truncated() {
    let mut schema = Schema::new();
    schema.define(
        "Entry",
        TypeNode::Sequence(vec![
            Field::required("id", TypeNode::integer()),
            Field::required("data", TypeNode::octet_string()),
        ]),
    );
    let node = TypeNode::sequence_of(TypeNode::reference("Entry"));

    let value = Value::List(vec![Value::Record(vec![
        ("id".to_string(), Value::Integer(7)),
        ("data".to_string(), Value::Bytes(vec![0xAA; 40])),
    ])]);
    let wire = encode_value(&schema, &node, &value).unwrap();

    // Cutting the buffer anywhere before the end must surface as a typed
    // truncation error, never a panic
    for cut in 0..wire.len() {
        let result = decode_value(&schema, &node, &wire[..cut]);
        assert!(
            matches!(result, Err(DerError::Truncated(_))),
            "cut at {} gave {:?}",
            cut,
            result
        );
    }

    let (decoded, consumed) = decode_value(&schema, &node, &wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(decoded, value);
}

#[test]
fn indefinite_length_inside_structure_aborts_decode() {
    let node = TypeNode::Sequence(vec![
        Field::required("n", TypeNode::integer()),
        Field::required("inner", TypeNode::sequence_of(TypeNode::integer())),
    ]);

    // The inner TLV advertises the BER indefinite length; this is not a
    // "field absent" situation and must abort
    let wire = hex!("30 05 02 01 01 30 80");
    assert!(matches!(
        decode_value(&empty(), &node, &wire),
        Err(DerError::DerViolation(_))
    ));
}

#[test]
fn unknown_type_reference_is_never_absorbed() {
    let node = TypeNode::Sequence(vec![Field::optional(
        "ext",
        TypeNode::reference("Undefined"),
    )]);

    let wire = hex!("30 03 02 01 01");
    assert!(matches!(
        decode_value(&empty(), &node, &wire),
        Err(DerError::UnknownTypeRef(_))
    ));
}

#[test]
fn deep_nesting_hits_the_depth_ceiling() {
    let mut schema = Schema::new();
    schema.define("Deep", TypeNode::sequence_of(TypeNode::reference("Deep")));

    let mut wire = vec![0x30, 0x00];
    for _ in 0..80 {
        let mut encoder = DerEncoder::new();
        encoder.encode_sequence(&wire);
        wire = encoder.into_bytes();
    }

    assert!(matches!(
        decode_value(&schema, &TypeNode::reference("Deep"), &wire),
        Err(DerError::DepthLimit(_))
    ));
}

#[test]
fn high_tag_number_round_trip() {
    for number in [31u32, 200] {
        let node = TypeNode::Tagged {
            tag: dervish_asn1::TagSpec::context(number, dervish_asn1::TagMode::Implicit),
            inner: Box::new(TypeNode::integer()),
        };
        let wire = encode_value(&empty(), &node, &Value::Integer(42)).unwrap();
        let (value, consumed) = decode_value(&empty(), &node, &wire).unwrap();
        assert_eq!(value, Value::Integer(42));
        assert_eq!(consumed, wire.len());
    }
}

#[test]
fn application_class_tags_round_trip() {
    use dervish_asn1::{TagMode, TagSpec};

    // [APPLICATION 1] EXPLICIT SEQUENCE { id INTEGER }
    let node = TypeNode::tagged(
        TagSpec::application(1, TagMode::Explicit),
        TypeNode::Sequence(vec![Field::required("id", TypeNode::integer())]),
    );
    let value = Value::Record(vec![("id".to_string(), Value::Integer(9))]);

    let wire = encode_value(&empty(), &node, &value).unwrap();
    assert_eq!(wire, hex!("61 05 30 03 02 01 09"));

    let (decoded, consumed) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(consumed, wire.len());
}

#[test]
fn enumeration_names_round_trip() {
    let node = TypeNode::enumerated([("keyAgreement", 4), ("certSign", 5)]);

    let wire = encode_value(&empty(), &node, &Value::Enumerated("certSign".to_string())).unwrap();
    assert_eq!(wire, hex!("02 01 05"));
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(value, Value::Enumerated("certSign".to_string()));
}

#[test]
fn time_strings_decode_as_text() {
    let node = TypeNode::builtin(dervish_asn1::BuiltinKind::UtcTime);
    let mut wire = vec![0x17, 0x0D];
    wire.extend_from_slice(b"260807120000Z");
    let (value, _) = decode_value(&empty(), &node, &wire).unwrap();
    assert_eq!(value, Value::Text("260807120000Z".to_string()));

    assert_eq!(encode_value(&empty(), &node, &value).unwrap(), wire);
}

#[test]
fn decode_value_at_continues_mid_buffer() {
    let wire = hex!("01 01 FF 02 01 2A");
    let (flag, next) = decode_value(&empty(), &TypeNode::boolean(), &wire).unwrap();
    assert_eq!(flag, Value::Boolean(true));
    let (number, end) = decode_value_at(&empty(), &TypeNode::integer(), &wire, next).unwrap();
    assert_eq!(number, Value::Integer(42));
    assert_eq!(end, wire.len());
}

/// A certificate-shaped schema touching every node kind at once
#[test]
fn certificate_like_round_trip() {
    let mut schema = Schema::new();
    schema.define(
        "AlgorithmIdentifier",
        TypeNode::Sequence(vec![
            Field::required("algorithm", TypeNode::object_identifier()),
            Field::optional("parameters", TypeNode::null()),
        ]),
    );
    schema.define(
        "Extension",
        TypeNode::Sequence(vec![
            Field::required("extnId", TypeNode::object_identifier()),
            Field::with_default("critical", TypeNode::boolean(), Value::Boolean(false)),
            Field::required("extnValue", TypeNode::octet_string()),
        ]),
    );
    schema.define(
        "GeneralName",
        TypeNode::Choice(vec![
            ("directoryName".to_string(), TypeNode::utf8_string()),
            (
                "registeredID".to_string(),
                TypeNode::object_identifier(),
            ),
        ]),
    );

    let node = TypeNode::Sequence(vec![
        Field::with_default(
            "version",
            TypeNode::explicit(0, TypeNode::integer()),
            Value::Integer(1),
        ),
        Field::required("serialNumber", TypeNode::integer()),
        Field::required("signature", TypeNode::reference("AlgorithmIdentifier")),
        Field::required("issuer", TypeNode::reference("GeneralName")),
        Field::required("subjectKey", TypeNode::bit_string()),
        Field::optional(
            "extensions",
            TypeNode::implicit(
                3,
                TypeNode::sequence_of(TypeNode::reference("Extension")),
            ),
        ),
    ]);

    let value = Value::Record(vec![
        ("version".to_string(), Value::Integer(3)),
        ("serialNumber".to_string(), Value::Integer(0x01C8)),
        (
            "signature".to_string(),
            Value::Record(vec![
                (
                    "algorithm".to_string(),
                    Value::ObjectIdentifier("1.2.840.113549".to_string()),
                ),
                ("parameters".to_string(), Value::Null),
            ]),
        ),
        (
            "issuer".to_string(),
            Value::Choice {
                name: "directoryName".to_string(),
                value: Box::new(Value::Text("Example CA".to_string())),
            },
        ),
        (
            "subjectKey".to_string(),
            Value::BitString {
                data: vec![0x6E, 0x5D, 0xC0],
                unused_bits: 5,
            },
        ),
        (
            "extensions".to_string(),
            Value::List(vec![Value::Record(vec![
                (
                    "extnId".to_string(),
                    Value::ObjectIdentifier("2.5.29.15".to_string()),
                ),
                ("critical".to_string(), Value::Boolean(true)),
                (
                    "extnValue".to_string(),
                    Value::Bytes(hex!("03 02 05 A0").to_vec()),
                ),
            ])]),
        ),
    ]);

    let wire = encode_value(&schema, &node, &value).unwrap();
    let (decoded, consumed) = decode_value(&schema, &node, &wire).unwrap();
    assert_eq!(consumed, wire.len());
    assert_eq!(decoded, value);

    // Typed accessors over the decoded tree
    let extensions = decoded.field("extensions").and_then(Value::items).unwrap();
    assert_eq!(extensions.len(), 1);
    assert_eq!(
        extensions[0].field("extnValue").and_then(Value::as_bytes),
        Some(hex!("03 02 05 A0").as_slice())
    );
    assert!(
        decoded
            .field("signature")
            .and_then(|algorithm| algorithm.field("parameters"))
            .is_some_and(Value::is_null)
    );
}
