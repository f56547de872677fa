//! Position-tracking byte reader and writer

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{DicomError, Result};
use crate::tag::Tag;
use crate::transfer_syntax::Endianness;

/// Reads fixed-width values from an in-memory buffer.
///
/// Every read is checked against `limit`, which the sequence decoder narrows
/// to the end of the innermost container with a defined length. Offsets
/// reported in errors are absolute: `base` is added to the buffer position.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    base: u64,
    endianness: Endianness,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
            base: 0,
            endianness,
        }
    }

    /// Report offsets as if `data[0]` sat at `base` in the source file
    pub fn with_base_offset(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the next byte to be read
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Absolute offset of an arbitrary buffer position
    pub fn offset_of(&self, pos: usize) -> u64 {
        self.base + pos as u64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.min(self.data.len());
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(DicomError::truncated(
                self.offset_of(pos),
                pos - self.pos,
                self.data.len().saturating_sub(self.pos),
            ));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DicomError::truncated(self.offset(), n, self.remaining()));
        }
        let data = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = self.read_bytes(2)?;
        Ok(match self.endianness {
            Endianness::Little => buf.get_u16_le(),
            Endianness::Big => buf.get_u16(),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = self.read_bytes(4)?;
        Ok(match self.endianness {
            Endianness::Little => buf.get_u32_le(),
            Endianness::Big => buf.get_u32(),
        })
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        let group = self.read_u16()?;
        let element = self.read_u16()?;
        Ok(Tag(group, element))
    }

    /// Read the next tag without consuming it
    pub fn peek_tag(&self) -> Result<Tag> {
        let mut lookahead = self.clone();
        lookahead.read_tag()
    }
}

/// Appends fixed-width values to a growable buffer
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: BytesMut,
    endianness: Endianness,
}

impl ByteWriter {
    pub fn new(endianness: Endianness) -> Self {
        Self {
            buf: BytesMut::new(),
            endianness,
        }
    }

    pub fn with_capacity(capacity: usize, endianness: Endianness) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            endianness,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u16(&mut self, value: u16) {
        match self.endianness {
            Endianness::Little => self.buf.put_u16_le(value),
            Endianness::Big => self.buf.put_u16(value),
        }
    }

    pub fn put_u32(&mut self, value: u32) {
        match self.endianness {
            Endianness::Little => self.buf.put_u32_le(value),
            Endianness::Big => self.buf.put_u32(value),
        }
    }

    pub fn put_tag(&mut self, tag: Tag) {
        self.put_u16(tag.0);
        self.put_u16(tag.1);
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn put_zeros(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    /// Overwrite a previously written 32-bit field
    pub fn patch_u32(&mut self, at: usize, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.buf[at..at + 4].copy_from_slice(&bytes);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
