//! Schema IR: type nodes, fields, tag overrides and the named-type registry

use crate::der::types::TagClass;
use dervish_core::{DerError, DerResult, Value};
use std::collections::HashMap;

/// Builtin scalar kinds with their universal tag numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Utf8String,
    PrintableString,
    Ia5String,
    UtcTime,
    GeneralizedTime,
}

impl BuiltinKind {
    /// The canonical universal tag number of this kind
    pub fn universal_tag(self) -> u32 {
        match self {
            BuiltinKind::Boolean => 1,
            BuiltinKind::Integer => 2,
            BuiltinKind::BitString => 3,
            BuiltinKind::OctetString => 4,
            BuiltinKind::Null => 5,
            BuiltinKind::ObjectIdentifier => 6,
            BuiltinKind::Utf8String => 12,
            BuiltinKind::PrintableString => 19,
            BuiltinKind::Ia5String => 22,
            BuiltinKind::UtcTime => 23,
            BuiltinKind::GeneralizedTime => 24,
        }
    }

    /// The ASN.1 name of this kind, for error messages
    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Boolean => "BOOLEAN",
            BuiltinKind::Integer => "INTEGER",
            BuiltinKind::BitString => "BIT STRING",
            BuiltinKind::OctetString => "OCTET STRING",
            BuiltinKind::Null => "NULL",
            BuiltinKind::ObjectIdentifier => "OBJECT IDENTIFIER",
            BuiltinKind::Utf8String => "UTF8String",
            BuiltinKind::PrintableString => "PrintableString",
            BuiltinKind::Ia5String => "IA5String",
            BuiltinKind::UtcTime => "UTCTime",
            BuiltinKind::GeneralizedTime => "GeneralizedTime",
        }
    }
}

/// How a tag override applies to its inner type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Wrap the inner encoding in an outer constructed TLV
    Explicit,
    /// Replace the inner type's own tag
    Implicit,
}

/// A schema-level tag override, e.g. `[2] IMPLICIT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub class: TagClass,
    pub number: u32,
    pub mode: TagMode,
}

impl TagSpec {
    /// A context-specific override (the common case)
    pub fn context(number: u32, mode: TagMode) -> Self {
        Self {
            class: TagClass::Context,
            number,
            mode,
        }
    }

    /// An application-class override
    pub fn application(number: u32, mode: TagMode) -> Self {
        Self {
            class: TagClass::Application,
            number,
            mode,
        }
    }

    /// A private-class override
    pub fn private(number: u32, mode: TagMode) -> Self {
        Self {
            class: TagClass::Private,
            number,
            mode,
        }
    }
}

/// A value or size constraint attached to a type
///
/// Constraints are carried through the IR but not validated by the codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constraint {
    pub value_range: Option<(i64, i64)>,
    pub size_range: Option<(usize, usize)>,
}

/// One field of a SEQUENCE or SET
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub node: TypeNode,
    pub optional: bool,
    pub default: Option<Value>,
}

impl Field {
    /// A required field
    pub fn required(name: impl Into<String>, node: TypeNode) -> Self {
        Self {
            name: name.into(),
            node,
            optional: false,
            default: None,
        }
    }

    /// An OPTIONAL field
    pub fn optional(name: impl Into<String>, node: TypeNode) -> Self {
        Self {
            name: name.into(),
            node,
            optional: true,
            default: None,
        }
    }

    /// A field with a DEFAULT value
    pub fn with_default(name: impl Into<String>, node: TypeNode, default: Value) -> Self {
        Self {
            name: name.into(),
            node,
            optional: false,
            default: Some(default),
        }
    }
}

/// A schema type description
///
/// The IR is a plain tree; sharing between named types goes through
/// [`TypeNode::TypeRef`] and the [`Schema`] registry.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// A builtin scalar; `values` optionally names integer values
    /// (enumeration support)
    Builtin {
        kind: BuiltinKind,
        values: Option<Vec<(String, i64)>>,
    },
    /// A reference to a named type, resolved through the schema
    TypeRef(String),
    /// SEQUENCE with ordered fields
    Sequence(Vec<Field>),
    /// SET with unordered fields
    Set(Vec<Field>),
    /// SEQUENCE OF a homogeneous element type
    SequenceOf(Box<TypeNode>),
    /// SET OF a homogeneous element type
    SetOf(Box<TypeNode>),
    /// CHOICE between named alternatives, tried in declared order
    Choice(Vec<(String, TypeNode)>),
    /// A tag override around an inner type
    Tagged { tag: TagSpec, inner: Box<TypeNode> },
    /// A constraint annotation around an inner type, ignored by the codec
    Constrained {
        constraint: Constraint,
        inner: Box<TypeNode>,
    },
}

impl TypeNode {
    /// A builtin scalar without named values
    pub fn builtin(kind: BuiltinKind) -> Self {
        TypeNode::Builtin { kind, values: None }
    }

    /// BOOLEAN
    pub fn boolean() -> Self {
        Self::builtin(BuiltinKind::Boolean)
    }

    /// INTEGER
    pub fn integer() -> Self {
        Self::builtin(BuiltinKind::Integer)
    }

    /// INTEGER with named values, e.g. `{ red(0), green(1) }`
    pub fn enumerated(values: impl IntoIterator<Item = (&'static str, i64)>) -> Self {
        TypeNode::Builtin {
            kind: BuiltinKind::Integer,
            values: Some(
                values
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            ),
        }
    }

    /// OCTET STRING
    pub fn octet_string() -> Self {
        Self::builtin(BuiltinKind::OctetString)
    }

    /// BIT STRING
    pub fn bit_string() -> Self {
        Self::builtin(BuiltinKind::BitString)
    }

    /// NULL
    pub fn null() -> Self {
        Self::builtin(BuiltinKind::Null)
    }

    /// OBJECT IDENTIFIER
    pub fn object_identifier() -> Self {
        Self::builtin(BuiltinKind::ObjectIdentifier)
    }

    /// UTF8String
    pub fn utf8_string() -> Self {
        Self::builtin(BuiltinKind::Utf8String)
    }

    /// A reference to a named type
    pub fn reference(name: impl Into<String>) -> Self {
        TypeNode::TypeRef(name.into())
    }

    /// SEQUENCE OF `element`
    pub fn sequence_of(element: TypeNode) -> Self {
        TypeNode::SequenceOf(Box::new(element))
    }

    /// SET OF `element`
    pub fn set_of(element: TypeNode) -> Self {
        TypeNode::SetOf(Box::new(element))
    }

    /// Apply a context-specific EXPLICIT tag, e.g. `[n] EXPLICIT`
    pub fn explicit(number: u32, inner: TypeNode) -> Self {
        TypeNode::Tagged {
            tag: TagSpec::context(number, TagMode::Explicit),
            inner: Box::new(inner),
        }
    }

    /// Apply a context-specific IMPLICIT tag, e.g. `[n] IMPLICIT`
    pub fn implicit(number: u32, inner: TypeNode) -> Self {
        TypeNode::Tagged {
            tag: TagSpec::context(number, TagMode::Implicit),
            inner: Box::new(inner),
        }
    }

    /// Apply an arbitrary tag override
    pub fn tagged(tag: TagSpec, inner: TypeNode) -> Self {
        TypeNode::Tagged {
            tag,
            inner: Box::new(inner),
        }
    }

    /// Attach a constraint annotation
    pub fn constrained(constraint: Constraint, inner: TypeNode) -> Self {
        TypeNode::Constrained {
            constraint,
            inner: Box::new(inner),
        }
    }
}

/// Registry of named type definitions
///
/// Built once by the caller, then shared read-only with every decode and
/// encode call.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, TypeNode>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a named type
    pub fn define(&mut self, name: impl Into<String>, node: TypeNode) {
        self.types.insert(name.into(), node);
    }

    /// Resolve a named type
    ///
    /// # Error Handling
    /// Fails with `UnknownTypeRef` if the name is not defined. This error
    /// is never absorbed by optional-field or CHOICE fallbacks.
    pub fn resolve(&self, name: &str) -> DerResult<&TypeNode> {
        self.types
            .get(name)
            .ok_or_else(|| DerError::UnknownTypeRef(name.to_string()))
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are defined
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
