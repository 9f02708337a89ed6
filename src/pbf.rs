//! Low-level protobuf wire-format reader.
//!
//! [`PbfReader`] is a cursor over an immutable byte slice implementing the
//! subset of the protobuf wire format used by the MVT schema: varints,
//! fixed 32/64-bit values, length-delimited fields and packed repeated
//! varints. It has no knowledge of the tile schema itself.
//!
//! The usage pattern is a pull loop: call [`PbfReader::advance`] to move to
//! the next field header, inspect [`PbfReader::tag`], then consume the
//! payload with exactly one read method (or [`PbfReader::skip`]). No field
//! may be read twice without re-reading its header.

use crate::error::TileError;

/// Protobuf wire types supported by this reader.
///
/// Anything outside this set fails with [`TileError::UnsupportedWireType`]
/// when the field header is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// int32/64, uint32/64, sint32/64, bool, enum
    Varint = 0,
    /// double, fixed64, sfixed64
    Fixed64 = 1,
    /// string, bytes, embedded messages, packed repeated fields
    Bytes = 2,
    /// float, fixed32, sfixed32
    Fixed32 = 5,
}

impl WireType {
    fn from_value(value: u64) -> Result<Self, TileError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Bytes),
            5 => Ok(WireType::Fixed32),
            other => Err(TileError::UnsupportedWireType(other)),
        }
    }
}

/// Cursor over a borrowed byte buffer decoding protobuf wire primitives.
pub struct PbfReader<'a> {
    data: &'a [u8],
    pos: usize,
    tag: u64,
    wire_type: WireType,
}

impl<'a> PbfReader<'a> {
    /// Create a reader positioned before the first field of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        PbfReader {
            data,
            pos: 0,
            tag: 0,
            wire_type: WireType::Varint,
        }
    }

    /// Move to the next field header.
    ///
    /// Returns `false` when the end of the buffer has been reached cleanly.
    ///
    /// # Errors
    /// `MalformedInput` if a header runs past the buffer end,
    /// `UnsupportedWireType` for wire types other than 0/1/2/5.
    pub fn advance(&mut self) -> Result<bool, TileError> {
        if self.pos >= self.data.len() {
            return Ok(false);
        }
        let key = self.raw_varint()?;
        self.tag = key >> 3;
        self.wire_type = WireType::from_value(key & 0x07)?;
        Ok(true)
    }

    /// Field number of the current header.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Current cursor offset into the underlying buffer.
    #[inline]
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Wire type of the current header.
    #[inline]
    #[must_use]
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Decode a base-128 varint at the cursor.
    ///
    /// The raw two's-complement bits are returned as `i64`; no zigzag
    /// transform is applied. Callers reading `sint` fields must zigzag-decode
    /// themselves.
    ///
    /// # Errors
    /// `MalformedInput` on truncation or a varint longer than 10 bytes.
    #[inline]
    pub fn varint(&mut self) -> Result<i64, TileError> {
        self.raw_varint().map(|v| v as i64)
    }

    fn raw_varint(&mut self) -> Result<u64, TileError> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(TileError::MalformedInput(format!(
                    "truncated varint at offset {}",
                    self.pos
                )));
            };
            self.pos += 1;
            if shift >= 70 {
                return Err(TileError::MalformedInput(format!(
                    "varint longer than 10 bytes at offset {}",
                    self.pos
                )));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a length-delimited field: a varint length prefix followed by
    /// exactly that many bytes, returned as a sub-slice of the input buffer
    /// (no copy). Used for embedded messages and raw string/bytes fields.
    ///
    /// # Errors
    /// `MalformedInput` if the declared length runs past the buffer end.
    pub fn bytes(&mut self) -> Result<&'a [u8], TileError> {
        let len = self.raw_varint()? as usize;
        self.take(len)
    }

    /// Decode exactly `byte_len` bytes at the cursor as strict UTF-8,
    /// advancing past them.
    ///
    /// # Errors
    /// `MalformedInput` on truncation, `InvalidEncoding` on malformed UTF-8.
    pub fn string(&mut self, byte_len: usize) -> Result<&'a str, TileError> {
        let raw = self.take(byte_len)?;
        Ok(std::str::from_utf8(raw)?)
    }

    /// Read a little-endian IEEE754 single-precision value.
    pub fn float32(&mut self) -> Result<f32, TileError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| TileError::MalformedInput("truncated fixed32 field".to_string()))?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Read a little-endian IEEE754 double-precision value.
    pub fn float64(&mut self) -> Result<f64, TileError> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| TileError::MalformedInput("truncated fixed64 field".to_string()))?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a length-delimited field as a tightly packed run of varints.
    ///
    /// Used for geometry command streams and tag-index pairs, both of which
    /// the MVT schema declares as packed `uint32`.
    ///
    /// # Errors
    /// `MalformedInput` if the payload is truncated or a varint straddles
    /// the declared field end.
    pub fn packed_u32(&mut self) -> Result<Vec<u32>, TileError> {
        let payload = self.bytes()?;
        let mut inner = PbfReader::new(payload);
        // geometry streams dominate; one varint per ~2 bytes is typical
        let mut values = Vec::with_capacity(payload.len() / 2);
        while inner.pos < payload.len() {
            values.push(inner.raw_varint()? as u32);
        }
        Ok(values)
    }

    /// Discard the current field's payload according to its wire type
    /// without interpreting it.
    ///
    /// # Errors
    /// `MalformedInput` if the payload runs past the buffer end.
    pub fn skip(&mut self) -> Result<(), TileError> {
        match self.wire_type {
            WireType::Varint => {
                self.raw_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::Bytes => {
                self.bytes()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], TileError> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            TileError::MalformedInput("length overflows buffer offset".to_string())
        })?;
        if end > self.data.len() {
            return Err(TileError::MalformedInput(format!(
                "field of {} bytes at offset {} exceeds buffer of {} bytes",
                len,
                self.pos,
                self.data.len()
            )));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_varint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn test_varint_roundtrip() {
        let cases: [u64; 9] = [
            0,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            u64::from(u32::MAX),
            i64::MAX as u64,
        ];
        for value in cases {
            let bytes = encode_varint(value);
            let mut reader = PbfReader::new(&bytes);
            assert_eq!(reader.varint().unwrap() as u64, value, "value {value}");
        }
    }

    #[test]
    fn test_varint_truncated() {
        // continuation bit set on the final byte
        let bytes = [0x80u8, 0x80];
        let mut reader = PbfReader::new(&bytes);
        assert!(matches!(
            reader.varint(),
            Err(TileError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_varint_too_long() {
        let bytes = [0xffu8; 11];
        let mut reader = PbfReader::new(&bytes);
        assert!(matches!(
            reader.varint(),
            Err(TileError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_advance_and_tag() {
        // field 1, varint wire type, value 150
        let bytes = [0x08u8, 0x96, 0x01];
        let mut reader = PbfReader::new(&bytes);
        assert!(reader.advance().unwrap());
        assert_eq!(reader.tag(), 1);
        assert_eq!(reader.wire_type(), WireType::Varint);
        assert_eq!(reader.varint().unwrap(), 150);
        assert!(!reader.advance().unwrap());
    }

    #[test]
    fn test_unsupported_wire_type() {
        // field 1, wire type 3 (start-group, unsupported)
        let bytes = [0x0bu8];
        let mut reader = PbfReader::new(&bytes);
        assert!(matches!(
            reader.advance(),
            Err(TileError::UnsupportedWireType(3))
        ));
    }

    #[test]
    fn test_bytes_zero_copy() {
        // field 2, bytes, len 3, "abc"
        let bytes = [0x12u8, 0x03, b'a', b'b', b'c'];
        let mut reader = PbfReader::new(&bytes);
        assert!(reader.advance().unwrap());
        assert_eq!(reader.wire_type(), WireType::Bytes);
        let slice = reader.bytes().unwrap();
        assert_eq!(slice, b"abc");
        // sub-slice of the original buffer, not a copy
        assert_eq!(slice.as_ptr(), bytes[2..].as_ptr());
    }

    #[test]
    fn test_bytes_truncated() {
        let bytes = [0x12u8, 0x05, b'a'];
        let mut reader = PbfReader::new(&bytes);
        assert!(reader.advance().unwrap());
        assert!(matches!(reader.bytes(), Err(TileError::MalformedInput(_))));
    }

    #[test]
    fn test_string_strict_utf8() {
        let bytes = [0xffu8, 0xfe];
        let mut reader = PbfReader::new(&bytes);
        assert!(matches!(
            reader.string(2),
            Err(TileError::InvalidEncoding(_))
        ));

        let bytes = b"hello";
        let mut reader = PbfReader::new(bytes);
        assert_eq!(reader.string(5).unwrap(), "hello");
    }

    #[test]
    fn test_fixed_floats() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-2.25f64).to_le_bytes());
        let mut reader = PbfReader::new(&bytes);
        assert_eq!(reader.float32().unwrap(), 1.5);
        assert_eq!(reader.float64().unwrap(), -2.25);
    }

    #[test]
    fn test_packed_u32() {
        let values = [9u64, 0, 300, 4096];
        let mut payload = Vec::new();
        for v in values {
            payload.extend_from_slice(&encode_varint(v));
        }
        let mut bytes = encode_varint(payload.len() as u64);
        bytes.extend_from_slice(&payload);

        let mut reader = PbfReader::new(&bytes);
        let decoded = reader.packed_u32().unwrap();
        assert_eq!(decoded, vec![9, 0, 300, 4096]);
    }

    #[test]
    fn test_skip_all_wire_types() {
        let mut bytes = Vec::new();
        bytes.push(0x08); // field 1 varint
        bytes.extend_from_slice(&encode_varint(12345));
        bytes.push(0x11); // field 2 fixed64
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.push(0x1a); // field 3 bytes
        bytes.extend_from_slice(&[0x02, 0xaa, 0xbb]);
        bytes.push(0x25); // field 4 fixed32
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.push(0x28); // field 5 varint, value 7
        bytes.push(0x07);

        let mut reader = PbfReader::new(&bytes);
        for expected_tag in 1..=4u64 {
            assert!(reader.advance().unwrap());
            assert_eq!(reader.tag(), expected_tag);
            reader.skip().unwrap();
        }
        assert!(reader.advance().unwrap());
        assert_eq!(reader.tag(), 5);
        assert_eq!(reader.varint().unwrap(), 7);
        assert!(!reader.advance().unwrap());
    }
}
