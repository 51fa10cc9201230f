//! DER TLV reader and primitive value decoders
//!
//! [`DerDecoder`] reads TLV triplets from a byte buffer while tracking a
//! position, which allows sequential decoding of several values from the
//! same buffer. The `*_from_content` functions convert a raw value slice
//! into a scalar and are shared with the schema-driven decoder in
//! [`crate::schema`].

use crate::der::types::{Length, Tag, TagClass};
use dervish_core::{DerError, DerResult};

/// One decoded TLV triplet
///
/// `value` borrows from the decoder's buffer; `end_offset` is the absolute
/// buffer offset of the first byte after the value.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    /// The decoded tag
    pub tag: Tag,
    /// The value octets
    pub value: &'a [u8],
    /// Offset of the first byte after this TLV
    pub end_offset: usize,
}

/// DER TLV reader over a byte buffer
///
/// # Position Tracking
///
/// The decoder maintains a position pointer that advances as data is
/// decoded. `position <= buffer.len()` holds at every step; any read past
/// the end fails with [`DerError::Truncated`] instead of panicking.
pub struct DerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> DerDecoder<'a> {
    /// Create a decoder at the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Create a decoder positioned at `offset` into `buffer`
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self {
            buffer,
            position: offset,
        }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the number of bytes left
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Whether there is more data to decode
    pub fn has_remaining(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// The unread tail of the buffer
    fn tail(&self) -> &'a [u8] {
        self.buffer.get(self.position..).unwrap_or(&[])
    }

    /// Read `count` bytes, advancing the position
    fn read_bytes(&mut self, count: usize) -> DerResult<&'a [u8]> {
        let end = self.position.checked_add(count).ok_or_else(|| {
            DerError::Truncated(format!("value of {} bytes overflows the offset", count))
        })?;
        if end > self.buffer.len() {
            return Err(DerError::Truncated(format!(
                "need {} bytes, have {}",
                count,
                self.remaining()
            )));
        }
        let start = self.position;
        self.position = end;
        Ok(&self.buffer[start..end])
    }

    /// Decode one TLV triplet
    ///
    /// # Decoding Process
    /// 1. Decode the identifier octets
    /// 2. Decode the length octets
    /// 3. Slice the value
    ///
    /// # Error Handling
    /// Fails with `Truncated` if the header or the value extends past the
    /// buffer, and with `DerViolation` for an indefinite length.
    pub fn decode_tlv(&mut self) -> DerResult<Tlv<'a>> {
        let (tag, consumed) = Tag::decode(self.tail())?;
        self.position += consumed;

        let (length, consumed) = Length::decode(self.tail())?;
        self.position += consumed;

        let value = self.read_bytes(length.value())?;
        Ok(Tlv {
            tag,
            value,
            end_offset: self.position,
        })
    }

    /// Skip one TLV, returning the number of bytes skipped
    pub fn skip_tlv(&mut self) -> DerResult<usize> {
        let start = self.position;
        self.decode_tlv()?;
        Ok(self.position - start)
    }

    /// Decode a universal primitive TLV, checking its tag number
    fn decode_universal(&mut self, number: u32, name: &str) -> DerResult<&'a [u8]> {
        let tlv = self.decode_tlv()?;
        if tlv.tag.class() != TagClass::Universal
            || tlv.tag.is_constructed()
            || tlv.tag.number() != number
        {
            return Err(DerError::TagMismatch(format!(
                "expected {} tag, got {:?}",
                name, tlv.tag
            )));
        }
        Ok(tlv.value)
    }

    /// Decode a BOOLEAN
    pub fn decode_boolean(&mut self) -> DerResult<bool> {
        let content = self.decode_universal(1, "BOOLEAN")?;
        boolean_from_content(content)
    }

    /// Decode an INTEGER
    ///
    /// The value is big-endian two's complement with at most 8 content
    /// octets.
    pub fn decode_integer(&mut self) -> DerResult<i64> {
        let content = self.decode_universal(2, "INTEGER")?;
        integer_from_content(content)
    }

    /// Decode a BIT STRING as `(payload, unused_bits)`
    pub fn decode_bit_string(&mut self) -> DerResult<(Vec<u8>, u8)> {
        let content = self.decode_universal(3, "BIT STRING")?;
        bit_string_from_content(content)
    }

    /// Decode an OCTET STRING
    pub fn decode_octet_string(&mut self) -> DerResult<Vec<u8>> {
        let content = self.decode_universal(4, "OCTET STRING")?;
        Ok(content.to_vec())
    }

    /// Decode a NULL
    pub fn decode_null(&mut self) -> DerResult<()> {
        let content = self.decode_universal(5, "NULL")?;
        null_from_content(content)
    }

    /// Decode an OBJECT IDENTIFIER into dotted-decimal form
    pub fn decode_object_identifier(&mut self) -> DerResult<String> {
        let content = self.decode_universal(6, "OBJECT IDENTIFIER")?;
        oid_from_content(content)
    }

    /// Decode a UTF8String
    pub fn decode_utf8_string(&mut self) -> DerResult<String> {
        let content = self.decode_universal(12, "UTF8String")?;
        utf8_from_content(content)
    }
}

/// Decode BOOLEAN content: a single octet, zero for false
pub fn boolean_from_content(content: &[u8]) -> DerResult<bool> {
    match content {
        [] => Err(DerError::Encoding("empty BOOLEAN content".to_string())),
        [byte] => Ok(*byte != 0),
        _ => Err(DerError::Encoding(format!(
            "BOOLEAN content must be a single octet, got {}",
            content.len()
        ))),
    }
}

/// Decode INTEGER content: big-endian two's complement
///
/// An empty slice decodes to 0. Values wider than 8 octets are not
/// representable in `i64` and fail with `Encoding`.
pub fn integer_from_content(content: &[u8]) -> DerResult<i64> {
    if content.is_empty() {
        return Ok(0);
    }
    if content.len() > 8 {
        return Err(DerError::Encoding(format!(
            "INTEGER too wide: {} octets (max 8)",
            content.len()
        )));
    }

    let mut value = 0i64;
    for &byte in content {
        value = (value << 8) | i64::from(byte);
    }

    // Sign extend when the leading octet has the sign bit set
    if content[0] & 0x80 != 0 {
        let shift = 64 - content.len() * 8;
        value = (value << shift) >> shift;
    }

    Ok(value)
}

/// Decode BIT STRING content as `(payload, unused_bits)`
///
/// The leading unused-bit-count octet is stripped from the payload and must
/// be 0-7; an empty payload must carry a count of 0.
pub fn bit_string_from_content(content: &[u8]) -> DerResult<(Vec<u8>, u8)> {
    let Some((&unused_bits, data)) = content.split_first() else {
        return Err(DerError::Encoding("empty BIT STRING content".to_string()));
    };
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
    Ok((data.to_vec(), unused_bits))
}

/// Decode NULL content, which must be empty
pub fn null_from_content(content: &[u8]) -> DerResult<()> {
    if !content.is_empty() {
        return Err(DerError::Encoding(format!(
            "NULL content must be empty, got {} octets",
            content.len()
        )));
    }
    Ok(())
}

/// Decode OBJECT IDENTIFIER content into dotted-decimal form
///
/// The first octet packs the two leading arcs as `40 * first + second`;
/// every following arc is a base-128 varint. An empty slice decodes to the
/// empty string.
pub fn oid_from_content(content: &[u8]) -> DerResult<String> {
    let Some((&head, rest)) = content.split_first() else {
        return Ok(String::new());
    };

    let mut rendered = format!("{}.{}", head / 40, head % 40);
    let mut position = 0;
    while position < rest.len() {
        let mut arc = 0u64;
        loop {
            if position >= rest.len() {
                return Err(DerError::Encoding(
                    "OBJECT IDENTIFIER ends inside an arc".to_string(),
                ));
            }
            let byte = rest[position];
            position += 1;
            arc = arc
                .checked_mul(128)
                .and_then(|a| a.checked_add(u64::from(byte & 0x7F)))
                .ok_or_else(|| DerError::Encoding("OBJECT IDENTIFIER arc overflow".to_string()))?;
            if byte & 0x80 == 0 {
                break;
            }
        }
        rendered.push_str(&format!(".{}", arc));
    }

    Ok(rendered)
}

/// Decode UTF8String content
pub fn utf8_from_content(content: &[u8]) -> DerResult<String> {
    String::from_utf8(content.to_vec())
        .map_err(|_| DerError::Encoding("invalid UTF-8 in UTF8String content".to_string()))
}

/// Decode the content of an ASCII-restricted string kind
/// (PrintableString, IA5String, UTCTime, GeneralizedTime)
pub fn ascii_from_content(content: &[u8], kind: &str) -> DerResult<String> {
    if !content.is_ascii() {
        return Err(DerError::Encoding(format!(
            "{} contains non-ASCII bytes",
            kind
        )));
    }
    std::str::from_utf8(content)
        .map(str::to_string)
        .map_err(|_| DerError::Encoding(format!("{} contains invalid bytes", kind)))
}
