//! Primitive little-endian reading and writing.
//!
//! All positions handled here are absolute file offsets. A [`Reader`] may
//! wrap a slice that starts somewhere inside a file (its `base`), so that a
//! record cut out of a larger buffer still reports the offsets it had there.

use std::io::Write;

use crate::error::{DecodeError, EncodeError};

// =============================================================================
// DECODING
// =============================================================================

/// Cursor over a byte slice with bounds-checked reads.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader whose first byte is at absolute offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Creates a reader whose first byte is at absolute offset `base`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            base,
            pos: base,
        }
    }

    /// Returns the absolute offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to an absolute offset.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    /// Absolute offset one past the last available byte.
    pub fn end(&self) -> usize {
        self.base + self.data.len()
    }

    /// Number of bytes left after the cursor.
    pub fn remaining_len(&self) -> usize {
        self.end().saturating_sub(self.pos)
    }

    /// Returns `len` bytes at an absolute offset without moving the cursor.
    pub fn peek_bytes(&self, offset: usize, len: usize, context: &str) -> Result<&'a [u8], DecodeError> {
        let available = self.end().saturating_sub(offset);
        if offset < self.base || len > available {
            return Err(DecodeError::UnexpectedEof {
                context: context.to_string(),
                offset,
                needed: len,
                available,
            });
        }
        let start = offset - self.base;
        Ok(&self.data[start..start + len])
    }

    /// Reads an unsigned little-endian integer of `width` bytes at an absolute
    /// offset without moving the cursor.
    pub fn peek_uint(&self, offset: usize, width: usize, context: &str) -> Result<u64, DecodeError> {
        Ok(get_uint(self.peek_bytes(offset, width, context)?, 0, width))
    }

    /// Reads exactly `len` bytes and advances the cursor.
    #[inline]
    pub fn read_bytes(&mut self, len: usize, context: &str) -> Result<&'a [u8], DecodeError> {
        let bytes = self.peek_bytes(self.pos, len, context)?;
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a little-endian u16 and advances the cursor.
    pub fn read_u16(&mut self, context: &str) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2, context)?;
        Ok(get_uint(bytes, 0, 2) as u16)
    }

    /// Reads a little-endian u32 and advances the cursor.
    pub fn read_u32(&mut self, context: &str) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4, context)?;
        Ok(get_uint(bytes, 0, 4) as u32)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Byte sink wrapper that counts what it writes.
#[derive(Debug)]
pub struct Writer<W> {
    sink: W,
    written: usize,
}

impl<W: Write> Writer<W> {
    /// Wraps a sink.
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.sink.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    /// Flushes the wrapped sink.
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.sink.flush()?;
        Ok(())
    }
}

// =============================================================================
// RAW BUFFER ACCESS
// =============================================================================

/// Reads an unsigned little-endian integer of 1, 2, 4 or 8 bytes.
///
/// The caller guarantees `offset + width <= bytes.len()`.
#[inline]
pub fn get_uint(bytes: &[u8], offset: usize, width: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[offset..offset + width]);
    u64::from_le_bytes(buf)
}

/// Writes the low `width` bytes of `value` in little-endian order.
///
/// The caller guarantees `offset + width <= bytes.len()`.
#[inline]
pub fn put_uint(bytes: &mut [u8], offset: usize, width: usize, value: u64) {
    bytes[offset..offset + width].copy_from_slice(&value.to_le_bytes()[..width]);
}

/// Sign-extends the low `width` bytes of `value`.
#[inline]
pub fn sign_extend(value: u64, width: usize) -> i64 {
    let shift = 64 - (width as u32) * 8;
    ((value << shift) as i64) >> shift
}
