//! DER TLV writer
//!
//! [`DerEncoder`] accumulates encoded TLVs into a byte buffer. The
//! `*_content` functions build the value octets of the primitive kinds and
//! are shared with the schema-driven encoder in [`crate::schema`].

use crate::der::types::{Length, Tag};
use dervish_core::{DerError, DerResult};

/// DER TLV writer
///
/// Output is canonical DER: minimal length octets and minimal
/// two's-complement integers.
pub struct DerEncoder {
    buffer: Vec<u8>,
}

impl DerEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with an initial buffer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the encoder, returning the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Append one TLV triplet
    ///
    /// This is the single funnel all other encoding goes through: the tag
    /// octets, the minimal length octets, then the value.
    pub fn encode_tlv(&mut self, tag: &Tag, value: &[u8]) {
        self.buffer.extend_from_slice(&tag.encode());
        self.buffer.extend_from_slice(&Length::new(value.len()).encode());
        self.buffer.extend_from_slice(value);
    }

    /// Append raw, already-encoded bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Encode a BOOLEAN
    pub fn encode_boolean(&mut self, value: bool) {
        self.encode_tlv(&Tag::universal(false, 1), &boolean_content(value));
    }

    /// Encode an INTEGER
    pub fn encode_integer(&mut self, value: i64) {
        self.encode_tlv(&Tag::universal(false, 2), &integer_content(value));
    }

    /// Encode a BIT STRING from its payload and unused-bit count
    pub fn encode_bit_string(&mut self, data: &[u8], unused_bits: u8) -> DerResult<()> {
        let content = bit_string_content(data, unused_bits)?;
        self.encode_tlv(&Tag::universal(false, 3), &content);
        Ok(())
    }

    /// Encode an OCTET STRING
    pub fn encode_octet_string(&mut self, value: &[u8]) {
        self.encode_tlv(&Tag::universal(false, 4), value);
    }

    /// Encode a NULL
    pub fn encode_null(&mut self) {
        self.encode_tlv(&Tag::universal(false, 5), &[]);
    }

    /// Encode an OBJECT IDENTIFIER given in dotted-decimal form
    pub fn encode_object_identifier(&mut self, oid: &str) -> DerResult<()> {
        let content = oid_content(oid)?;
        self.encode_tlv(&Tag::universal(false, 6), &content);
        Ok(())
    }

    /// Encode a UTF8String
    pub fn encode_utf8_string(&mut self, value: &str) {
        self.encode_tlv(&Tag::universal(false, 12), value.as_bytes());
    }

    /// Encode a SEQUENCE from its already-encoded content
    pub fn encode_sequence(&mut self, content: &[u8]) {
        self.encode_tlv(&Tag::universal(true, 16), content);
    }

    /// Encode a SET from its already-encoded content
    pub fn encode_set(&mut self, content: &[u8]) {
        self.encode_tlv(&Tag::universal(true, 17), content);
    }
}

impl Default for DerEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build BOOLEAN content (DER canonical: `0xFF` for true)
pub fn boolean_content(value: bool) -> [u8; 1] {
    if value { [0xFF] } else { [0x00] }
}

/// Build minimal two's-complement INTEGER content
pub fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();

    // Drop redundant leading octets: 0x00 before a clear sign bit,
    // 0xFF before a set sign bit
    let mut start = 0;
    while start < bytes.len() - 1 {
        let lead = bytes[start];
        let next_sign = bytes[start + 1] & 0x80;
        if (lead == 0x00 && next_sign == 0) || (lead == 0xFF && next_sign != 0) {
            start += 1;
        } else {
            break;
        }
    }

    bytes[start..].to_vec()
}

/// Build BIT STRING content by prefixing the unused-bit count octet
pub fn bit_string_content(data: &[u8], unused_bits: u8) -> DerResult<Vec<u8>> {
    if unused_bits > 7 {
        return Err(DerError::Encoding(format!(
            "invalid unused bit count {} (must be 0-7)",
            unused_bits
        )));
    }
    if data.is_empty() && unused_bits != 0 {
        return Err(DerError::Encoding(
            "empty BIT STRING with nonzero unused bit count".to_string(),
        ));
    }
    let mut content = Vec::with_capacity(data.len() + 1);
    content.push(unused_bits);
    content.extend_from_slice(data);
    Ok(content)
}

/// Build OBJECT IDENTIFIER content from dotted-decimal form
///
/// The empty string encodes to empty content, mirroring the decoder.
pub fn oid_content(oid: &str) -> DerResult<Vec<u8>> {
    if oid.is_empty() {
        return Ok(Vec::new());
    }

    let arcs = oid
        .split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| DerError::Encoding(format!("invalid OBJECT IDENTIFIER arc {:?}", part)))
        })
        .collect::<DerResult<Vec<u64>>>()?;
    if arcs.len() < 2 {
        return Err(DerError::Encoding(
            "OBJECT IDENTIFIER needs at least two arcs".to_string(),
        ));
    }

    let head = arcs[0]
        .checked_mul(40)
        .and_then(|packed| packed.checked_add(arcs[1]))
        .filter(|packed| *packed <= 0xFF)
        .ok_or_else(|| {
            DerError::Encoding("first two OBJECT IDENTIFIER arcs out of range".to_string())
        })?;

    let mut content = vec![head as u8];
    for &arc in &arcs[2..] {
        push_base128(&mut content, arc);
    }
    Ok(content)
}

/// Append one arc as a base-128 varint, most significant group first
fn push_base128(out: &mut Vec<u8>, mut arc: u64) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    loop {
        groups[count] = (arc & 0x7F) as u8;
        count += 1;
        arc >>= 7;
        if arc == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        if i == 0 {
            out.push(groups[i]);
        } else {
            out.push(groups[i] | 0x80);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::decoder::DerDecoder;
    use hex_literal::hex;

    #[test]
    fn test_integer_content_minimal() {
        assert_eq!(integer_content(0), vec![0x00]);
        assert_eq!(integer_content(127), vec![0x7F]);
        assert_eq!(integer_content(128), vec![0x00, 0x80]);
        assert_eq!(integer_content(-128), vec![0x80]);
        assert_eq!(integer_content(-129), vec![0xFF, 0x7F]);
        assert_eq!(integer_content(-1), vec![0xFF]);
        assert_eq!(integer_content(12345), vec![0x30, 0x39]);
    }

    #[test]
    fn test_encode_integer_tlv() {
        let mut encoder = DerEncoder::new();
        encoder.encode_integer(12345);
        let encoded = encoder.into_bytes();
        assert_eq!(encoded, hex!("02 02 30 39"));

        let mut decoder = DerDecoder::new(&encoded);
        assert_eq!(decoder.decode_integer().unwrap(), 12345);
    }

    #[test]
    fn test_encode_octet_string() {
        let mut encoder = DerEncoder::new();
        encoder.encode_octet_string(b"Hello");
        let encoded = encoder.into_bytes();

        let mut decoder = DerDecoder::new(&encoded);
        assert_eq!(decoder.decode_octet_string().unwrap(), b"Hello");
    }

    #[test]
    fn test_oid_content_round_trip() {
        let content = oid_content("1.2.840.113549").unwrap();
        assert_eq!(content, hex!("2A 86 48 86 F7 0D"));

        assert_eq!(oid_content("").unwrap(), Vec::<u8>::new());
        assert!(matches!(oid_content("1"), Err(DerError::Encoding(_))));
        assert!(matches!(oid_content("1.x"), Err(DerError::Encoding(_))));
    }

    #[test]
    fn test_encode_bit_string() {
        let mut encoder = DerEncoder::new();
        encoder.encode_bit_string(&[0xB0], 4).unwrap();
        assert_eq!(encoder.into_bytes(), hex!("03 02 04 B0"));

        assert!(matches!(
            bit_string_content(&[], 3),
            Err(DerError::Encoding(_))
        ));
    }

    #[test]
    fn test_long_form_length() {
        let payload = vec![0xAB; 200];
        let mut encoder = DerEncoder::new();
        encoder.encode_octet_string(&payload);
        let encoded = encoder.into_bytes();
        assert_eq!(&encoded[..3], &hex!("04 81 C8"));

        let mut decoder = DerDecoder::new(&encoded);
        assert_eq!(decoder.decode_octet_string().unwrap(), payload);
    }

    #[test]
    fn test_typed_tlv_helpers() {
        let mut encoder = DerEncoder::new();
        assert!(encoder.is_empty());
        encoder.encode_null();
        encoder.encode_object_identifier("1.2.840.113549").unwrap();
        encoder.encode_utf8_string("hi");
        assert_eq!(encoder.len(), 14);
        assert_eq!(
            encoder.into_bytes(),
            hex!("05 00 06 06 2A 86 48 86 F7 0D 0C 02 68 69")
        );
    }

    #[test]
    fn test_encode_set() {
        let mut inner = DerEncoder::new();
        inner.encode_integer(1);

        let mut outer = DerEncoder::new();
        outer.encode_set(&inner.into_bytes());
        assert_eq!(outer.into_bytes(), hex!("31 03 02 01 01"));
    }

    #[test]
    fn test_nested_sequence() {
        let mut inner = DerEncoder::new();
        inner.encode_integer(1);
        inner.encode_boolean(true);

        let mut outer = DerEncoder::new();
        outer.encode_sequence(&inner.into_bytes());
        assert_eq!(outer.into_bytes(), hex!("30 06 02 01 01 01 01 FF"));
    }
}
