// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::Emitter;
use crate::error::EncodeError;
use core::fmt::{self, Write as _};

/// Emits the structure block as GNU assembler directives.
///
/// Token opcodes are written symbolically (`OF_DT_BEGIN_NODE` and so on);
/// the caller is expected to `#define` them in the file preamble.
#[derive(Debug)]
pub(crate) struct AsmEmitter<'a, W: fmt::Write> {
    out: &'a mut W,
}

impl<'a, W: fmt::Write> AsmEmitter<'a, W> {
    pub(crate) fn new(out: &'a mut W) -> Self {
        Self { out }
    }

    /// Writes one raw line of output.
    pub(crate) fn line(&mut self, args: fmt::Arguments<'_>) -> Result<(), EncodeError> {
        self.out.write_fmt(args)?;
        self.out.write_char('\n')?;
        Ok(())
    }

    /// Defines `<prefix>_<name>` and `_<prefix>_<name>` at the current
    /// position and makes the first one global.
    pub(crate) fn global_label(&mut self, prefix: &str, name: &str) -> Result<(), EncodeError> {
        self.line(format_args!("\t.globl\t{prefix}_{name}"))?;
        self.line(format_args!("{prefix}_{name}:"))?;
        self.line(format_args!("_{prefix}_{name}:"))
    }

    fn symbol(&mut self, label: &str) -> Result<(), EncodeError> {
        self.line(format_args!("\t.globl\t{label}"))?;
        self.line(format_args!("{label}:"))
    }
}

impl<W: fmt::Write> Emitter for AsmEmitter<'_, W> {
    fn cell(&mut self, value: u32) -> Result<(), EncodeError> {
        self.line(format_args!("\t.long\t{value:#x}"))
    }

    fn string(&mut self, text: &str) -> Result<(), EncodeError> {
        self.line(format_args!("\t.string\t\"{}\"", Escaped(text)))
    }

    fn align(&mut self, boundary: usize) -> Result<(), EncodeError> {
        self.line(format_args!("\t.balign\t{boundary}"))
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let mut consumed = 0;

        let words = bytes.chunks_exact(4);
        let rest = words.remainder();
        for word in words {
            let value = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            self.line(format_args!("\t.long\t{value:#x}"))?;
            consumed += 4;
        }

        let rest = if let [hi, lo, tail @ ..] = rest {
            let value = u16::from_be_bytes([*hi, *lo]);
            self.line(format_args!("\t.short\t{value:#x}"))?;
            consumed += 2;
            tail
        } else {
            rest
        };

        if let [byte] = rest {
            self.line(format_args!("\t.byte\t{byte:#x}"))?;
            consumed += 1;
        }

        assert_eq!(consumed, bytes.len(), "asm data emitter dropped bytes");
        Ok(())
    }

    fn begin_node(&mut self, label: Option<&str>) -> Result<(), EncodeError> {
        if let Some(label) = label {
            self.symbol(label)?;
        }
        self.line(format_args!("\t.long\tOF_DT_BEGIN_NODE"))
    }

    fn end_node(&mut self, label: Option<&str>) -> Result<(), EncodeError> {
        self.line(format_args!("\t.long\tOF_DT_END_NODE"))?;
        if let Some(label) = label {
            self.line(format_args!("\t.globl\t{label}_end"))?;
            self.line(format_args!("{label}_end:"))?;
        }
        Ok(())
    }

    fn begin_property(&mut self, label: Option<&str>) -> Result<(), EncodeError> {
        if let Some(label) = label {
            self.symbol(label)?;
        }
        self.line(format_args!("\t.long\tOF_DT_PROP"))
    }
}

/// Renders a string for use inside a quoted `.string` directive.
///
/// Bytes outside printable ASCII become three-digit octal escapes.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.bytes() {
            match byte {
                b'"' | b'\\' => write!(f, "\\{}", char::from(byte))?,
                b' '..=b'~' => f.write_char(char::from(byte))?,
                _ => write!(f, "\\{byte:03o}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[test]
    fn data_is_split_into_words_then_short_then_byte() {
        let mut out = String::new();
        AsmEmitter::new(&mut out)
            .data(&[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde])
            .unwrap();
        assert_eq!(out, "\t.long\t0x12345678\n\t.short\t0x9abc\n\t.byte\t0xde\n");
    }

    #[test]
    fn data_single_short() {
        let mut out = String::new();
        AsmEmitter::new(&mut out).data(&[0x00, 0x01]).unwrap();
        assert_eq!(out, "\t.short\t0x1\n");
    }

    #[test]
    fn labelled_node_and_property() {
        let mut out = String::new();
        let mut emitter = AsmEmitter::new(&mut out);
        emitter.begin_node(Some("cpu0")).unwrap();
        emitter.begin_property(Some("cpu0_reg")).unwrap();
        emitter.end_node(Some("cpu0")).unwrap();
        assert_eq!(
            out,
            "\t.globl\tcpu0\ncpu0:\n\t.long\tOF_DT_BEGIN_NODE\n\
             \t.globl\tcpu0_reg\ncpu0_reg:\n\t.long\tOF_DT_PROP\n\
             \t.long\tOF_DT_END_NODE\n\t.globl\tcpu0_end\ncpu0_end:\n"
        );
    }

    #[test]
    fn unlabelled_tokens() {
        let mut out = String::new();
        let mut emitter = AsmEmitter::new(&mut out);
        emitter.begin_node(None).unwrap();
        emitter.end_node(None).unwrap();
        assert_eq!(out, "\t.long\tOF_DT_BEGIN_NODE\n\t.long\tOF_DT_END_NODE\n");
    }

    #[test]
    fn strings_are_escaped() {
        let mut out = String::new();
        let mut emitter = AsmEmitter::new(&mut out);
        emitter.string("cpu").unwrap();
        emitter.string("a\"b\\c").unwrap();
        emitter.align(4).unwrap();
        assert_eq!(
            out,
            "\t.string\t\"cpu\"\n\t.string\t\"a\\\"b\\\\c\"\n\t.balign\t4\n"
        );
    }

    #[test]
    fn control_and_non_ascii_bytes_are_octal() {
        let mut out = String::new();
        AsmEmitter::new(&mut out).string("a\tb\nc\u{e9}").unwrap();
        assert_eq!(out, "\t.string\t\"a\\011b\\012c\\303\\251\"\n");
    }

    #[test]
    fn global_label() {
        let mut out = String::new();
        AsmEmitter::new(&mut out)
            .global_label("dt", "blob_start")
            .unwrap();
        assert_eq!(out, "\t.globl\tdt_blob_start\ndt_blob_start:\n_dt_blob_start:\n");
    }
}
