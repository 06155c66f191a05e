// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The boot-parameter header at the start of every blob.

use crate::{
    emit::FDT_MAGIC,
    error::{DecodeError, DecodeErrorKind, EncodeError},
    memreserve::ReserveEntry,
    version::{HEADER_V1_SIZE, HEADER_V2_SIZE, HEADER_V3_SIZE, VersionFlags, VersionInfo},
};
use core::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::big_endian};

/// Value written to header bytes that the selected version does not define.
const HEADER_FILL: u8 = 0xff;

/// The widest header layout, as found in version 3 and later blobs.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
pub(crate) struct FdtHeader {
    /// Magic number of the device tree.
    pub(crate) magic: big_endian::U32,
    /// Total size of the device tree.
    pub(crate) totalsize: big_endian::U32,
    /// Offset of the device tree structure.
    pub(crate) off_dt_struct: big_endian::U32,
    /// Offset of the device tree strings.
    pub(crate) off_dt_strings: big_endian::U32,
    /// Offset of the memory reservation map.
    pub(crate) off_mem_rsvmap: big_endian::U32,
    /// Version of the device tree.
    pub(crate) version: big_endian::U32,
    /// Last compatible version of the device tree.
    pub(crate) last_comp_version: big_endian::U32,
    /// Physical ID of the boot CPU.
    pub(crate) boot_cpuid_phys: big_endian::U32,
    /// Size of the device tree strings.
    pub(crate) size_dt_strings: big_endian::U32,
}

const _: () = assert!(size_of::<FdtHeader>() == HEADER_V3_SIZE);

/// Sizes of the blocks that follow the header, known once flattening is
/// complete.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockSizes {
    pub(crate) reservations: usize,
    pub(crate) structure: usize,
    pub(crate) strings: usize,
}

impl BlockSizes {
    /// Byte size of the reservation map, including its terminating entry.
    pub(crate) fn reserve_map(&self) -> usize {
        (self.reservations + 1) * ReserveEntry::SIZE
    }
}

/// Offsets of each block, relative to the start of the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) off_mem_rsvmap: usize,
    pub(crate) off_dt_struct: usize,
    pub(crate) off_dt_strings: usize,
    pub(crate) totalsize: usize,
}

impl Layout {
    pub(crate) fn new(info: &VersionInfo, sizes: &BlockSizes) -> Self {
        // The reservation map is 8-byte aligned.
        let off_mem_rsvmap = info.header_size().next_multiple_of(8);
        let off_dt_struct = off_mem_rsvmap + sizes.reserve_map();
        let off_dt_strings = off_dt_struct + sizes.structure;
        Self {
            off_mem_rsvmap,
            off_dt_struct,
            off_dt_strings,
            totalsize: off_dt_strings + sizes.strings,
        }
    }
}

impl FdtHeader {
    /// Builds the header for a blob of the given version and block sizes.
    ///
    /// Fields that `info` does not define are left filled with `0xff`.
    pub(crate) fn build(
        info: &VersionInfo,
        layout: &Layout,
        sizes: &BlockSizes,
        boot_cpuid_phys: u32,
    ) -> Result<Self, EncodeError> {
        let mut header: Self = zerocopy::transmute!([HEADER_FILL; HEADER_V3_SIZE]);

        header.magic = FDT_MAGIC.into();
        header.version = info.version().into();
        header.last_comp_version = info.last_comp_version().into();
        header.off_mem_rsvmap = to_u32(layout.off_mem_rsvmap, "off_mem_rsvmap")?.into();
        header.off_dt_struct = to_u32(layout.off_dt_struct, "off_dt_struct")?.into();
        header.off_dt_strings = to_u32(layout.off_dt_strings, "off_dt_strings")?.into();
        header.totalsize = to_u32(layout.totalsize, "totalsize")?.into();

        if info.has(VersionFlags::HAS_BOOT_CPUID) {
            header.boot_cpuid_phys = boot_cpuid_phys.into();
        }
        if info.has(VersionFlags::HAS_STRING_TABLE_SIZE) {
            header.size_dt_strings = to_u32(sizes.strings, "size_dt_strings")?.into();
        }

        Ok(header)
    }
}

fn to_u32(value: usize, what: &'static str) -> Result<u32, EncodeError> {
    u32::try_from(value).map_err(|_| EncodeError::TooLarge { what })
}

/// A parsed blob header.
///
/// Fields that do not exist in the blob's version are `None`.
///
/// # Examples
///
/// ```
/// # use dtflat::header::BlobHeader;
/// # use dtflat::model::{BootInfo, Node};
/// let blob = BootInfo::new(Node::new("")).to_blob(2).unwrap();
/// let header = BlobHeader::parse(&blob).unwrap();
/// assert_eq!(header.version, 2);
/// assert_eq!(header.last_comp_version, 1);
/// assert!(header.boot_cpuid_phys.is_some());
/// assert_eq!(header.size_dt_strings, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct BlobHeader {
    /// Magic number.
    pub magic: u32,
    /// Total size of the blob in bytes.
    pub totalsize: u32,
    /// Offset of the structure block.
    pub off_dt_struct: u32,
    /// Offset of the string block.
    pub off_dt_strings: u32,
    /// Offset of the memory reservation map.
    pub off_mem_rsvmap: u32,
    /// Format version.
    pub version: u32,
    /// Oldest version this blob is backwards compatible with.
    pub last_comp_version: u32,
    /// Physical ID of the boot CPU, from version 2 on.
    pub boot_cpuid_phys: Option<u32>,
    /// Size of the string block, from version 3 on.
    pub size_dt_strings: Option<u32>,
}

impl BlobHeader {
    /// Parses the header at the start of `blob`.
    ///
    /// Only the magic number and the presence of the version-dependent
    /// fields are checked; block offsets are validated when decoding.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::Truncated`] if `blob` is too short to hold
    /// the header of its version, and [`DecodeErrorKind::InvalidMagic`] if
    /// it does not start with the magic number.
    pub fn parse(blob: &[u8]) -> Result<Self, DecodeError> {
        let Some(magic) = read_be_u32(blob, 0) else {
            return Err(DecodeError::new(DecodeErrorKind::Truncated, blob.len()));
        };
        if magic != FDT_MAGIC {
            return Err(DecodeError::new(DecodeErrorKind::InvalidMagic(magic), 0));
        }
        if blob.len() < HEADER_V1_SIZE {
            return Err(DecodeError::new(DecodeErrorKind::Truncated, blob.len()));
        }

        let mut raw = [0u8; HEADER_V3_SIZE];
        let available = blob.len().min(HEADER_V3_SIZE);
        raw[..available].copy_from_slice(&blob[..available]);
        let header: FdtHeader = zerocopy::transmute!(raw);

        let version = header.version.get();
        let required = match version {
            0 | 1 => HEADER_V1_SIZE,
            2 => HEADER_V2_SIZE,
            _ => HEADER_V3_SIZE,
        };
        if available < required {
            return Err(DecodeError::new(DecodeErrorKind::Truncated, blob.len()));
        }

        Ok(Self {
            magic,
            totalsize: header.totalsize.get(),
            off_dt_struct: header.off_dt_struct.get(),
            off_dt_strings: header.off_dt_strings.get(),
            off_mem_rsvmap: header.off_mem_rsvmap.get(),
            version,
            last_comp_version: header.last_comp_version.get(),
            boot_cpuid_phys: (version >= 2).then(|| header.boot_cpuid_phys.get()),
            size_dt_strings: (version >= 3).then(|| header.size_dt_strings.get()),
        })
    }

    /// Returns the format behaviors implied by this header's version.
    #[must_use]
    pub fn flags(&self) -> VersionFlags {
        VersionFlags::for_blob_version(self.version)
    }
}

impl fmt::Display for BlobHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tmagic:\t\t\t{:#x}", self.magic)?;
        writeln!(f, "\ttotalsize:\t\t{}", self.totalsize)?;
        writeln!(f, "\toff_dt_struct:\t\t{:#x}", self.off_dt_struct)?;
        writeln!(f, "\toff_dt_strings:\t\t{:#x}", self.off_dt_strings)?;
        writeln!(f, "\toff_mem_rsvmap:\t\t{:#x}", self.off_mem_rsvmap)?;
        writeln!(f, "\tversion:\t\t{:#x}", self.version)?;
        write!(f, "\tlast_comp_version:\t{:#x}", self.last_comp_version)?;
        if let Some(boot_cpuid_phys) = self.boot_cpuid_phys {
            write!(f, "\n\tboot_cpuid_phys:\t{boot_cpuid_phys:#x}")?;
        }
        if let Some(size_dt_strings) = self.size_dt_strings {
            write!(f, "\n\tsize_dt_strings:\t{size_dt_strings}")?;
        }
        Ok(())
    }
}

pub(crate) fn read_be_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    big_endian::U32::read_from_bytes(bytes).ok().map(|val| val.get())
}
