// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The registry of supported blob format versions.

use core::ops::BitOr;

use crate::error::EncodeError;

/// Size of the version 1 header: magic through `last_comp_version`.
pub(crate) const HEADER_V1_SIZE: usize = 7 * 4;
/// Size of the version 2 header, which adds `boot_cpuid_phys`.
pub(crate) const HEADER_V2_SIZE: usize = 8 * 4;
/// Size of the version 3 header, which adds `size_dt_strings`.
pub(crate) const HEADER_V3_SIZE: usize = 9 * 4;

/// First version of the "current" format family.
const FIRST_BARE_NAME_VERSION: u32 = 0x10;

/// A set of format behaviors that differ between blob versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionFlags {
    bits: u8,
}

impl VersionFlags {
    /// No behaviors enabled.
    pub const NONE: Self = Self { bits: 0 };
    /// Nodes are identified by their full path instead of their bare name.
    pub const FULL_PATH: Self = Self { bits: 0x1 };
    /// Property values of 8 bytes or more are aligned to 8 bytes.
    pub const VARIABLE_ALIGN: Self = Self { bits: 0x2 };
    /// A `name` property is synthesized for nodes that lack one.
    pub const SYNTHESIZE_NAME_PROPERTY: Self = Self { bits: 0x4 };
    /// The header carries the physical boot CPU id.
    pub const HAS_BOOT_CPUID: Self = Self { bits: 0x8 };
    /// The header carries the byte size of the string table.
    pub const HAS_STRING_TABLE_SIZE: Self = Self { bits: 0x10 };

    /// Returns `true` if every behavior in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// Returns the raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Derives the decoding behaviors implied by the `version` field of a
    /// blob header.
    ///
    /// Anything before version 16 uses full paths, variable alignment and
    /// synthesized `name` properties. The header fields present in the blob
    /// are gated separately by the version number itself.
    #[must_use]
    pub const fn for_blob_version(version: u32) -> Self {
        let mut flags = Self::NONE;
        if version >= 2 {
            flags = flags.union(Self::HAS_BOOT_CPUID);
        }
        if version >= 3 {
            flags = flags.union(Self::HAS_STRING_TABLE_SIZE);
        }
        if version < FIRST_BARE_NAME_VERSION {
            flags = flags
                .union(Self::FULL_PATH)
                .union(Self::SYNTHESIZE_NAME_PROPERTY)
                .union(Self::VARIABLE_ALIGN);
        }
        flags
    }
}

impl BitOr for VersionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// The layout profile of one blob format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    version: u32,
    last_comp_version: u32,
    header_size: usize,
    flags: VersionFlags,
}

impl VersionInfo {
    /// Looks up the profile of `version`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownVersion`] if `version` is not one of the
    /// supported versions 1, 2, 3 and 16.
    pub fn lookup(version: u32) -> Result<&'static Self, EncodeError> {
        VERSION_TABLE
            .iter()
            .find(|info| info.version == version)
            .ok_or(EncodeError::UnknownVersion(version))
    }

    /// Returns all supported profiles, oldest first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &VERSION_TABLE
    }

    /// Returns the version number written into the header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the oldest version a consumer must understand to read this
    /// format.
    #[must_use]
    pub fn last_comp_version(&self) -> u32 {
        self.last_comp_version
    }

    /// Returns the number of header bytes written for this version.
    #[must_use]
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Returns the format behaviors of this version.
    #[must_use]
    pub fn flags(&self) -> VersionFlags {
        self.flags
    }

    pub(crate) fn has(&self, flag: VersionFlags) -> bool {
        self.flags.contains(flag)
    }
}

static VERSION_TABLE: [VersionInfo; 4] = [
    VersionInfo {
        version: 1,
        last_comp_version: 1,
        header_size: HEADER_V1_SIZE,
        flags: VersionFlags::FULL_PATH
            .union(VersionFlags::VARIABLE_ALIGN)
            .union(VersionFlags::SYNTHESIZE_NAME_PROPERTY),
    },
    VersionInfo {
        version: 2,
        last_comp_version: 1,
        header_size: HEADER_V2_SIZE,
        flags: VersionFlags::FULL_PATH
            .union(VersionFlags::VARIABLE_ALIGN)
            .union(VersionFlags::SYNTHESIZE_NAME_PROPERTY)
            .union(VersionFlags::HAS_BOOT_CPUID),
    },
    VersionInfo {
        version: 3,
        last_comp_version: 1,
        header_size: HEADER_V3_SIZE,
        flags: VersionFlags::FULL_PATH
            .union(VersionFlags::VARIABLE_ALIGN)
            .union(VersionFlags::SYNTHESIZE_NAME_PROPERTY)
            .union(VersionFlags::HAS_BOOT_CPUID)
            .union(VersionFlags::HAS_STRING_TABLE_SIZE),
    },
    VersionInfo {
        version: FIRST_BARE_NAME_VERSION,
        last_comp_version: FIRST_BARE_NAME_VERSION,
        header_size: HEADER_V3_SIZE,
        flags: VersionFlags::HAS_BOOT_CPUID.union(VersionFlags::HAS_STRING_TABLE_SIZE),
    },
];
