//! Byte buffer with a read cursor, the unit every parse pass works on.

use byteorder::{ByteOrder, LittleEndian};

use crate::parser::ParseError;
use crate::types::protocol::config::StatusCode;

/// Marker byte of a compact length which is followed by a full u16 length.
const COMPACT_LENGTH_EXTENDED: u8 = 0xFF;

/// A fixed-capacity configuration buffer plus the cursor of the current parse pass.
///
/// Reads never move the cursor past a token that failed to decode. When a read fails, `offset`
/// still points at the first byte of that token, which is what gets reported to the host.
pub struct ParserBuffer<const N: usize> {
    buffer: [u8; N],
    /// Bytes consumed in the current pass
    offset: usize,
    /// Reads are bounded by this position, `N` unless the parser declared a shorter length
    end: usize,
}

impl<const N: usize> Default for ParserBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ParserBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            offset: 0,
            end: N,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of bytes left before `end`
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.offset)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Start a new pass: rewind the cursor and drop any declared length.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.end = N;
    }

    /// Bound all following reads of this pass to `len` bytes from the start of the buffer.
    pub fn set_end(&mut self, len: usize) -> Result<(), ParseError> {
        if len > N || len < self.offset {
            return Err(ParseError::InvalidLength);
        }
        self.end = len;
        Ok(())
    }

    /// Copy an uploaded chunk into the buffer at `offset`.
    ///
    /// Nothing is written when the chunk doesn't fit. Not reachable from parsers, uploads go
    /// through `UserConfigBuffers::write_staging`.
    pub(crate) fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), StatusCode> {
        let end = offset.checked_add(data.len()).ok_or(StatusCode::OutOfBounds)?;
        if end > N {
            return Err(StatusCode::OutOfBounds);
        }
        self.buffer[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Read `len` bytes at `offset` without touching the cursor.
    pub fn read_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.buffer.get(offset..end)
    }

    /// Move the cursor back to an earlier token, e.g. to report a token that decoded fine but
    /// carries an illegal value.
    pub fn seek(&mut self, offset: usize) -> Result<(), ParseError> {
        if offset > self.end {
            return Err(ParseError::UnexpectedEnd);
        }
        self.offset = offset;
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&[u8], ParseError> {
        if len > self.remaining() {
            return Err(ParseError::UnexpectedEnd);
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.buffer[start..start + len])
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a bool encoded as `0`/`1`, any other value is `InvalidValue`
    pub fn read_bool(&mut self) -> Result<bool, ParseError> {
        let start = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => {
                self.offset = start;
                Err(ParseError::InvalidValue)
            }
        }
    }

    /// Read a compact length: one byte below `0xFF`, or `0xFF` followed by a u16.
    pub fn read_compact_length(&mut self) -> Result<u16, ParseError> {
        let start = self.offset;
        let first = self.read_u8()?;
        if first != COMPACT_LENGTH_EXTENDED {
            return Ok(first as u16);
        }
        match self.read_u16() {
            Ok(len) => Ok(len),
            Err(e) => {
                self.offset = start;
                Err(e)
            }
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], ParseError> {
        self.take(len)
    }

    /// Read a compact length followed by that many bytes, as one token.
    pub fn read_string(&mut self) -> Result<&[u8], ParseError> {
        let start = self.offset;
        let len = self.read_compact_length()? as usize;
        if len > self.remaining() {
            self.offset = start;
            return Err(ParseError::UnexpectedEnd);
        }
        self.take(len)
    }
}
