// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decoding of blobs back into a [`BootInfo`].

mod cursor;
mod unflatten;

use self::{cursor::Cursor, unflatten::Unflattener};
use crate::{
    emit::{FDT_BEGIN_NODE, FDT_END, FDT_MAGIC},
    error::{DecodeError, DecodeErrorKind},
    header::{BlobHeader, read_be_u32},
    memreserve::{MemoryReservation, ReserveEntry},
    model::BootInfo,
    version::HEADER_V1_SIZE,
};
use alloc::vec::Vec;
use log::debug;
#[cfg(feature = "std")]
use std::io::{self, Read};

const TOTALSIZE_OFFSET: usize = 4;
const OFF_DT_STRUCT_OFFSET: usize = 8;
const OFF_DT_STRINGS_OFFSET: usize = 12;
const OFF_MEM_RSVMAP_OFFSET: usize = 16;
const SIZE_DT_STRINGS_OFFSET: usize = 32;

pub(crate) fn from_blob(blob: &[u8]) -> Result<BootInfo, DecodeError> {
    check_magic(blob)?;
    let totalsize = check_totalsize(blob)?;
    let blob = blob
        .get(..totalsize)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::Truncated, blob.len()))?;

    let header = BlobHeader::parse(blob)?;
    debug!("decoding blob:\n{header}");

    let off_mem_rsvmap = header.off_mem_rsvmap as usize;
    let off_dt_struct = header.off_dt_struct as usize;
    let off_dt_strings = header.off_dt_strings as usize;
    if off_mem_rsvmap >= totalsize {
        return Err(out_of_bounds("off_mem_rsvmap", OFF_MEM_RSVMAP_OFFSET));
    }
    if off_dt_struct >= totalsize {
        return Err(out_of_bounds("off_dt_struct", OFF_DT_STRUCT_OFFSET));
    }
    if off_dt_strings > totalsize {
        return Err(out_of_bounds("off_dt_strings", OFF_DT_STRINGS_OFFSET));
    }
    let strings_limit = match header.size_dt_strings {
        Some(size) => off_dt_strings
            .checked_add(size as usize)
            .filter(|&limit| limit <= totalsize)
            .ok_or_else(|| out_of_bounds("size_dt_strings", SIZE_DT_STRINGS_OFFSET))?,
        None => totalsize,
    };

    let memory_reservations = read_reservations(Cursor::new(blob, off_mem_rsvmap, totalsize))?;

    let mut unflattener = Unflattener::new(
        Cursor::new(blob, off_dt_struct, totalsize),
        Cursor::new(blob, off_dt_strings, strings_limit),
        header.flags(),
    );
    let token = unflattener.read_token()?;
    if token != FDT_BEGIN_NODE {
        return Err(DecodeError::new(
            DecodeErrorKind::MissingBeginNode(token),
            off_dt_struct,
        ));
    }
    let root = unflattener.read_node(None, 0)?;

    let end_offset = unflattener.position();
    let token = unflattener.read_token()?;
    if token != FDT_END {
        return Err(DecodeError::new(DecodeErrorKind::MissingEnd(token), end_offset));
    }

    Ok(BootInfo::with_reservations(root, memory_reservations))
}

fn check_magic(prefix: &[u8]) -> Result<(), DecodeError> {
    let magic = read_be_u32(prefix, 0)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::Truncated, prefix.len()))?;
    if magic != FDT_MAGIC {
        return Err(DecodeError::new(DecodeErrorKind::InvalidMagic(magic), 0));
    }
    Ok(())
}

/// Returns the declared total size, which must at least cover the smallest
/// header.
fn check_totalsize(prefix: &[u8]) -> Result<usize, DecodeError> {
    let totalsize = read_be_u32(prefix, TOTALSIZE_OFFSET)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::Truncated, prefix.len()))?;
    if (totalsize as usize) < HEADER_V1_SIZE {
        return Err(DecodeError::new(
            DecodeErrorKind::BlobTooSmall(totalsize),
            TOTALSIZE_OFFSET,
        ));
    }
    Ok(totalsize as usize)
}

fn read_reservations(mut cursor: Cursor<'_>) -> Result<Vec<MemoryReservation>, DecodeError> {
    let mut reservations = Vec::new();
    loop {
        let entry = cursor.read::<ReserveEntry>()?;
        if entry.is_terminator() {
            return Ok(reservations);
        }
        reservations.push(entry.into());
    }
}

fn out_of_bounds(field: &'static str, offset: usize) -> DecodeError {
    DecodeError::new(DecodeErrorKind::OffsetOutOfBounds { field }, offset)
}

#[cfg(feature = "std")]
pub(crate) fn from_reader(mut source: impl Read) -> Result<BootInfo, DecodeError> {
    let mut prefix = [0u8; 8];
    read_exact(&mut source, &mut prefix[..TOTALSIZE_OFFSET], 0)?;
    check_magic(&prefix)?;
    read_exact(&mut source, &mut prefix[TOTALSIZE_OFFSET..], TOTALSIZE_OFFSET)?;
    let totalsize = check_totalsize(&prefix)?;

    let mut blob = Vec::from(prefix);
    source
        .take((totalsize - prefix.len()) as u64)
        .read_to_end(&mut blob)
        .map_err(|err| io_error(&err, prefix.len()))?;
    if blob.len() < totalsize {
        return Err(DecodeError::new(DecodeErrorKind::Truncated, blob.len()));
    }

    from_blob(&blob)
}

#[cfg(feature = "std")]
fn read_exact(
    source: &mut impl Read,
    buf: &mut [u8],
    offset: usize,
) -> Result<(), DecodeError> {
    source.read_exact(buf).map_err(|err| io_error(&err, offset))
}

#[cfg(feature = "std")]
fn io_error(err: &io::Error, offset: usize) -> DecodeError {
    let kind = match err.kind() {
        io::ErrorKind::UnexpectedEof => DecodeErrorKind::Truncated,
        kind => DecodeErrorKind::Io(kind),
    };
    DecodeError::new(kind, offset)
}
