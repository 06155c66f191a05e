// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{DecodeError, DecodeErrorKind};
use core::ffi::CStr;
use zerocopy::{FromBytes, byteorder::big_endian};

/// A read-only cursor over `blob[base..limit]`.
///
/// Positions are absolute offsets into `blob`, so that errors can report
/// where in the blob they happened. Alignment is relative to `base`.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    blob: &'a [u8],
    base: usize,
    limit: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at `base`. `limit` is clamped to the end
    /// of `blob`.
    pub(crate) fn new(blob: &'a [u8], base: usize, limit: usize) -> Self {
        let limit = limit.min(blob.len());
        Self {
            blob,
            base: base.min(limit),
            limit,
            pos: base.min(limit),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.pos)
    }

    fn remaining(&self) -> &'a [u8] {
        let blob = self.blob;
        &blob[self.pos..self.limit]
    }

    /// Reads the next `len` bytes.
    pub(crate) fn read_chunk(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let chunk = self
            .remaining()
            .get(..len)
            .ok_or_else(|| self.error(DecodeErrorKind::Truncated))?;
        self.pos += len;
        Ok(chunk)
    }

    /// Reads a `T` from the next `size_of::<T>()` bytes.
    pub(crate) fn read<T: FromBytes>(&mut self) -> Result<T, DecodeError> {
        let (value, _) = T::read_from_prefix(self.remaining())
            .map_err(|_| self.error(DecodeErrorKind::Truncated))?;
        self.pos += size_of::<T>();
        Ok(value)
    }

    /// Reads a big-endian word from a 4-byte aligned position.
    pub(crate) fn read_u32(&mut self) -> Result<u32, DecodeError> {
        assert!(
            (self.pos - self.base).is_multiple_of(4),
            "unaligned word read at offset {}",
            self.pos
        );
        self.read::<big_endian::U32>().map(|value| value.get())
    }

    /// Skips forward to the next multiple of `align` past `base`.
    pub(crate) fn realign(&mut self, align: usize) -> Result<(), DecodeError> {
        let pos = self.base + (self.pos - self.base).next_multiple_of(align);
        if pos > self.limit {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        self.pos = pos;
        Ok(())
    }

    /// Reads the bytes of a NUL-terminated string, then realigns to 4 bytes.
    ///
    /// The returned bytes do not include the terminator.
    pub(crate) fn read_string(&mut self) -> Result<&'a [u8], DecodeError> {
        let cstr = CStr::from_bytes_until_nul(self.remaining())
            .map_err(|_| self.error(DecodeErrorKind::Truncated))?;
        self.pos += cstr.count_bytes() + 1;
        self.realign(4)?;
        Ok(cstr.to_bytes())
    }

    /// Reads `len` bytes of property data, then realigns to 4 bytes.
    pub(crate) fn read_data(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let data = self.read_chunk(len)?;
        self.realign(4)?;
        Ok(data)
    }

    /// Looks up the NUL-terminated string `offset` bytes past `base`,
    /// without moving the cursor.
    pub(crate) fn string_at(&self, offset: u32) -> Result<&'a str, DecodeError> {
        let out_of_bounds = || {
            DecodeError::new(
                DecodeErrorKind::StringOffsetOutOfBounds(offset),
                self.base.saturating_add(offset as usize),
            )
        };
        let start = self
            .base
            .checked_add(offset as usize)
            .filter(|&start| start < self.limit)
            .ok_or_else(out_of_bounds)?;
        let blob = self.blob;
        let cstr = CStr::from_bytes_until_nul(&blob[start..self.limit]).map_err(|_| out_of_bounds())?;
        cstr.to_str()
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidString, start))
    }
}
