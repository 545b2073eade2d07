//! Seekable little-endian reader over an in-memory asset.
//!
//! Reads are done with winnow's binary parsers on the remaining slice. Seeking
//! re-slices the full buffer, so the cursor is just two borrowed slices and is
//! cheap to clone when a caller needs to peek without moving its own position.

use thiserror::Error;
use winnow::Parser;
use winnow::binary::{le_f32, le_i16, le_i32, le_u32};
use winnow::error::{ContextError, ErrMode};
use winnow::token::take;

use crate::data::parser_utils::{WResult, parse_fixed_string, parse_vec2, parse_vec3};
use crate::error::ErrorKind;

/// A read ran past the end of the underlying data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("data too short: need {need} bytes at offset 0x{offset:X}, have {have}")]
pub struct Exhausted {
    pub offset: usize,
    pub need: usize,
    pub have: usize,
}

#[derive(Debug, Clone)]
pub struct BinCursor<'a> {
    data: &'a [u8],
    input: &'a [u8],
}

impl<'a> BinCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, input: data }
    }

    /// Absolute offset of the next read.
    pub fn position(&self) -> usize {
        self.data.len() - self.input.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Move to an absolute offset from the start of the data.
    pub fn seek(&mut self, offset: usize) -> Result<(), Exhausted> {
        if offset > self.data.len() {
            return Err(Exhausted {
                offset,
                need: 0,
                have: self.data.len(),
            });
        }
        self.input = &self.data[offset..];
        Ok(())
    }

    fn parse_with<O>(
        &mut self,
        need: usize,
        parser: fn(&mut &'a [u8]) -> WResult<O>,
    ) -> Result<O, Exhausted> {
        let offset = self.position();
        let have = self.data.len();
        parser(&mut self.input).map_err(|_: ErrMode<ContextError>| Exhausted { offset, need, have })
    }

    pub fn read_u32(&mut self) -> Result<u32, Exhausted> {
        self.parse_with(4, le_u32)
    }

    pub fn read_i32(&mut self) -> Result<i32, Exhausted> {
        self.parse_with(4, le_i32)
    }

    pub fn read_i16(&mut self) -> Result<i16, Exhausted> {
        self.parse_with(2, le_i16)
    }

    pub fn read_f32(&mut self) -> Result<f32, Exhausted> {
        self.parse_with(4, le_f32)
    }

    /// Reads an `i32` count, size or offset. Negative values are rejected.
    pub fn read_size(&mut self, field: &'static str) -> Result<usize, ErrorKind> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| ErrorKind::NegativeValue { field, value })
    }

    /// Reads a `u32` count or offset.
    pub fn read_size_u32(&mut self) -> Result<usize, Exhausted> {
        Ok(self.read_u32()? as usize)
    }

    pub fn read_vec2(&mut self) -> Result<[f32; 2], Exhausted> {
        self.parse_with(8, parse_vec2)
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], Exhausted> {
        self.parse_with(12, parse_vec3)
    }

    /// Reads a null-padded string field of exactly `len` bytes.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, Exhausted> {
        let offset = self.position();
        let have = self.data.len();
        let input = &mut self.input;
        parse_fixed_string(input, len).map_err(|_: ErrMode<ContextError>| Exhausted {
            offset,
            need: len,
            have,
        })
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Exhausted> {
        let offset = self.position();
        let have = self.data.len();
        take(len)
            .parse_next(&mut self.input)
            .map_err(|_: ErrMode<ContextError>| Exhausted {
                offset,
                need: len,
                have,
            })
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Exhausted> {
        self.read_bytes(len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x1234_5678u32.to_le_bytes());
        data.extend_from_slice(&(-2i32).to_le_bytes());
        data.extend_from_slice(&(-3i16).to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());

        let mut cursor = BinCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_i32().unwrap(), -2);
        assert_eq!(cursor.read_i16().unwrap(), -3);
        assert_eq!(cursor.read_f32().unwrap(), 1.5);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn exhaustion_reports_offset() {
        let data = [1u8, 2, 3];
        let mut cursor = BinCursor::new(&data);
        cursor.skip(2).unwrap();
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            Exhausted {
                offset: 2,
                need: 4,
                have: 3
            }
        );
    }

    #[test]
    fn negative_size_is_rejected() {
        let mut data = 12i32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-4i32).to_le_bytes());
        let mut cursor = BinCursor::new(&data);
        assert_eq!(cursor.read_size("vertex count").unwrap(), 12);
        assert_eq!(
            cursor.read_size("uv offset").unwrap_err(),
            ErrorKind::NegativeValue {
                field: "uv offset",
                value: -4
            }
        );
        assert!(matches!(
            cursor.read_size("uv offset").unwrap_err(),
            ErrorKind::TruncatedData(_)
        ));
    }

    #[test]
    fn seek_is_absolute() {
        let data: Vec<u8> = (0u8..16).collect();
        let mut cursor = BinCursor::new(&data);
        cursor.seek(8).unwrap();
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[8, 9]);
        cursor.seek(1).unwrap();
        assert_eq!(cursor.read_bytes(1).unwrap(), &[1]);
        assert!(cursor.seek(17).is_err());
        assert!(cursor.seek(16).is_ok());
    }

    #[test]
    fn fixed_string_stops_at_nul() {
        let mut field = [0u8; 8];
        field[..3].copy_from_slice(b"abc");
        field[4] = b'z';
        let mut cursor = BinCursor::new(&field);
        assert_eq!(cursor.read_fixed_string(8).unwrap(), "abc");
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn clone_does_not_move_original() {
        let data = 7u32.to_le_bytes();
        let cursor = BinCursor::new(&data);
        let mut peek = cursor.clone();
        assert_eq!(peek.read_u32().unwrap(), 7);
        assert_eq!(cursor.position(), 0);
    }
}
