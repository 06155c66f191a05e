// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Output backends for the structure block.
//!
//! The flattener walks the tree once and describes the structure block as a
//! sequence of calls on an [`Emitter`]. [`BinaryEmitter`] turns those calls
//! into blob bytes, [`AsmEmitter`] into assembler directives that assemble
//! to the same bytes.

mod asm;
mod binary;

pub(crate) use asm::AsmEmitter;
pub(crate) use binary::BinaryEmitter;

use crate::error::EncodeError;

pub(crate) const FDT_MAGIC: u32 = 0xd00d_feed;
pub(crate) const FDT_BEGIN_NODE: u32 = 0x1;
pub(crate) const FDT_END_NODE: u32 = 0x2;
pub(crate) const FDT_PROP: u32 = 0x3;
pub(crate) const FDT_END: u32 = 0x9;
pub(crate) const FDT_TAGSIZE: usize = size_of::<u32>();

/// A sink for structure block tokens.
pub(crate) trait Emitter {
    /// Emits one big-endian 32-bit word.
    fn cell(&mut self, value: u32) -> Result<(), EncodeError>;

    /// Emits `text` followed by a NUL terminator.
    fn string(&mut self, text: &str) -> Result<(), EncodeError>;

    /// Pads the output with zeroes up to a multiple of `boundary` bytes.
    fn align(&mut self, boundary: usize) -> Result<(), EncodeError>;

    /// Emits raw bytes.
    fn data(&mut self, bytes: &[u8]) -> Result<(), EncodeError>;

    /// Emits a begin-node token, preceded by `label` if present.
    fn begin_node(&mut self, label: Option<&str>) -> Result<(), EncodeError>;

    /// Emits an end-node token, followed by `label` if present.
    fn end_node(&mut self, label: Option<&str>) -> Result<(), EncodeError>;

    /// Emits a property token, preceded by `label` if present.
    fn begin_property(&mut self, label: Option<&str>) -> Result<(), EncodeError>;
}
