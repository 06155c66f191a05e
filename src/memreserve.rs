// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Memory reservation entries.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::big_endian};

/// A physical memory region reserved from general use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryReservation {
    address: u64,
    size: u64,
}

impl MemoryReservation {
    /// Creates a new [`MemoryReservation`].
    #[must_use]
    pub fn new(address: u64, size: u64) -> Self {
        Self { address, size }
    }

    /// Returns the physical address of the reserved memory region.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Returns the size of the reserved memory region.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// On-wire layout of a reservation map entry.
#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
pub(crate) struct ReserveEntry {
    pub(crate) address: big_endian::U64,
    pub(crate) size: big_endian::U64,
}

impl ReserveEntry {
    pub(crate) const SIZE: usize = size_of::<Self>();

    /// The all-zero entry that terminates the reservation map.
    pub(crate) const TERMINATOR: Self = Self {
        address: big_endian::U64::ZERO,
        size: big_endian::U64::ZERO,
    };

    pub(crate) fn is_terminator(&self) -> bool {
        self.size.get() == 0
    }
}

impl From<&MemoryReservation> for ReserveEntry {
    fn from(reservation: &MemoryReservation) -> Self {
        Self {
            address: reservation.address.into(),
            size: reservation.size.into(),
        }
    }
}

impl From<ReserveEntry> for MemoryReservation {
    fn from(entry: ReserveEntry) -> Self {
        Self::new(entry.address.get(), entry.size.get())
    }
}
