// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The deduplicating table of property names.

use crate::error::EncodeError;
use alloc::{borrow::ToOwned, string::String, vec::Vec};
use indexmap::IndexMap;
use twox_hash::xxhash64;

/// An append-only pool of NUL-terminated property names.
///
/// Each distinct name is stored once; inserting it again returns the offset
/// of its first occurrence.
#[derive(Debug)]
pub(crate) struct StringTable {
    data: Vec<u8>,
    offsets: IndexMap<String, u32, xxhash64::State>,
}

impl StringTable {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            offsets: IndexMap::with_hasher(xxhash64::State::with_seed(0xdead_cafe)),
        }
    }

    /// Returns the offset of `name` in the table, appending it if needed.
    pub(crate) fn insert(&mut self, name: &str) -> Result<u32, EncodeError> {
        if let Some(&offset) = self.offsets.get(name) {
            return Ok(offset);
        }
        let offset = u32::try_from(self.data.len()).map_err(|_| EncodeError::TooLarge {
            what: "string table length",
        })?;
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        self.offsets.insert(name.to_owned(), offset);
        Ok(offset)
    }

    /// Returns the stored names in insertion order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.offsets.keys().map(String::as_str)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}
