//! Decoded ASN.1 value tree
//!
//! The shape of a decoded value depends on the schema it was decoded
//! against, so results are represented as a tagged union mirroring the
//! schema node kinds: scalars for builtin leaves, an ordered field map for
//! SEQUENCE/SET, an ordered element list for SEQUENCE OF/SET OF, and a
//! single-entry mapping for CHOICE.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A decoded ASN.1 value
///
/// Values are plain data: they hold no reference to the wire buffer or to
/// the schema they were decoded with. Field maps and element lists preserve
/// wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// ASN.1 NULL, also recorded for required fields with no matching TLV
    Null,
    /// BOOLEAN
    Boolean(bool),
    /// INTEGER (up to 8 content octets)
    Integer(i64),
    /// INTEGER mapped through an enumeration name list
    Enumerated(String),
    /// UTF8String, PrintableString, IA5String, UTCTime or GeneralizedTime
    Text(String),
    /// OCTET STRING payload
    Bytes(Vec<u8>),
    /// BIT STRING payload with the unused-bit count of the final octet
    BitString { data: Vec<u8>, unused_bits: u8 },
    /// OBJECT IDENTIFIER in dotted-decimal form, e.g. `"1.2.840.113549"`
    ObjectIdentifier(String),
    /// SEQUENCE or SET field map in declared field order
    Record(Vec<(String, Value)>),
    /// SEQUENCE OF or SET OF elements in wire order
    List(Vec<Value>),
    /// The selected CHOICE alternative
    Choice { name: String, value: Box<Value> },
}

impl Value {
    /// Whether this is the NULL/absent value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the boolean payload, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer payload, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the textual payload of a string, enumeration name or OID
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enumerated(s) | Value::ObjectIdentifier(s) => Some(s),
            _ => None,
        }
    }

    /// Get the octet string payload, if any
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Look up a field of a record by name
    ///
    /// Returns `None` both when the value is not a record and when the
    /// record has no field of that name (an absent optional field).
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(entries) => entries
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Get the elements of a SEQUENCE OF/SET OF value, if any
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the selected CHOICE alternative as `(name, value)`, if any
    pub fn choice(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Choice { name, value } => Some((name.as_str(), value)),
            _ => None,
        }
    }
}

impl Serialize for Value {
    /// Serialize the tree in its natural shape: records and choices become
    /// maps, lists become sequences, byte payloads go through `serde_bytes`.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Enumerated(s) | Value::Text(s) | Value::ObjectIdentifier(s) => {
                serializer.serialize_str(s)
            }
            Value::Bytes(bytes) => serde_bytes::Bytes::new(bytes).serialize(serializer),
            Value::BitString { data, unused_bits } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("data", serde_bytes::Bytes::new(data))?;
                map.serialize_entry("unused_bits", unused_bits)?;
                map.end()
            }
            Value::Record(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Choice { name, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, value)?;
                map.end()
            }
        }
    }
}
