// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Emitter, FDT_BEGIN_NODE, FDT_END_NODE, FDT_PROP};
use crate::error::EncodeError;
use alloc::vec::Vec;

/// Emits the structure block as blob bytes.
#[derive(Debug, Default)]
pub(crate) struct BinaryEmitter {
    buf: Vec<u8>,
}

impl BinaryEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Emitter for BinaryEmitter {
    fn cell(&mut self, value: u32) -> Result<(), EncodeError> {
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn string(&mut self, text: &str) -> Result<(), EncodeError> {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    fn align(&mut self, boundary: usize) -> Result<(), EncodeError> {
        let new_len = self.buf.len().next_multiple_of(boundary);
        self.buf.resize(new_len, 0);
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn begin_node(&mut self, _label: Option<&str>) -> Result<(), EncodeError> {
        self.cell(FDT_BEGIN_NODE)
    }

    fn end_node(&mut self, _label: Option<&str>) -> Result<(), EncodeError> {
        self.cell(FDT_END_NODE)
    }

    fn begin_property(&mut self, _label: Option<&str>) -> Result<(), EncodeError> {
        self.cell(FDT_PROP)
    }
}
