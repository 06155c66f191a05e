// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `dtflat` crate.

use alloc::string::String;
use core::fmt;

/// An error that can occur when decoding a device tree blob.
#[derive(Debug)]
#[non_exhaustive]
pub struct DecodeError {
    offset: usize,
    /// The type of the error that has occurred.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self { offset, kind }
    }

    /// Returns the byte offset in the blob at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The kind of an error that can occur when decoding a device tree blob.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// The blob does not start with the FDT magic number.
    InvalidMagic(u32),
    /// The `totalsize` header field is smaller than the smallest header.
    BlobTooSmall(u32),
    /// A read ran past the end of the data it was confined to.
    Truncated,
    /// A header offset or size points outside of the blob.
    OffsetOutOfBounds {
        /// The name of the offending header field.
        field: &'static str,
    },
    /// A property name offset points outside of the string table.
    StringOffsetOutOfBounds(u32),
    /// The structure block does not start with a begin-node token.
    MissingBeginNode(u32),
    /// The structure block does not finish with an end token.
    MissingEnd(u32),
    /// An end-of-structure token was found while a node was still open.
    PrematureEnd,
    /// An unknown token was encountered.
    BadToken(u32),
    /// A node's full path is not a child of its parent's path.
    PathMismatch {
        /// The full path read from the blob.
        path: String,
        /// The full path of the enclosing node.
        parent: String,
    },
    /// Nodes are nested deeper than the decoder allows.
    NestingTooDeep,
    /// A property name is not valid UTF-8.
    InvalidString,
    /// Reading the blob from its source failed.
    #[cfg(feature = "std")]
    Io(std::io::ErrorKind),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic(magic) => write!(f, "blob has incorrect magic number 0x{magic:08x}"),
            Self::BlobTooSmall(size) => write!(f, "blob size ({size}) is too small"),
            Self::Truncated => write!(f, "premature end of data parsing flat device tree"),
            Self::OffsetOutOfBounds { field } => write!(f, "{field} exceeds total size"),
            Self::StringOffsetOutOfBounds(offset) => {
                write!(f, "string offset {offset} overruns string table")
            }
            Self::MissingBeginNode(token) => write!(
                f,
                "structure block doesn't begin with a begin-node token (begins with 0x{token:08x})"
            ),
            Self::MissingEnd(token) => write!(
                f,
                "structure block doesn't end with an end token (ends with 0x{token:08x})"
            ),
            Self::PrematureEnd => write!(f, "premature end token in structure block"),
            Self::BadToken(token) => write!(f, "invalid opcode word 0x{token:08x}"),
            Self::PathMismatch { path, parent } => {
                write!(f, "path \"{path}\" is not valid as a child of \"{parent}\"")
            }
            Self::NestingTooDeep => write!(f, "nodes are nested too deeply"),
            Self::InvalidString => write!(f, "invalid string in blob"),
            #[cfg(feature = "std")]
            Self::Io(kind) => write!(f, "error reading blob: {kind}"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// An error that can occur when encoding a device tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The requested blob version is not in the version table.
    UnknownVersion(u32),
    /// A length or offset does not fit into a 32-bit field.
    TooLarge {
        /// What overflowed.
        what: &'static str,
    },
    /// A node or property name contains a NUL byte, or a node name contains
    /// a `/`.
    InvalidName {
        /// The offending name.
        name: String,
    },
    /// A memory reservation has size 0, which reads back as the end of the
    /// reservation map.
    EmptyReservation {
        /// The address of the offending reservation.
        address: u64,
    },
    /// The sink of the assembly output reported an error.
    Format,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVersion(version) => {
                write!(f, "unknown device tree blob version {version}")
            }
            Self::TooLarge { what } => write!(f, "{what} exceeds u32"),
            Self::InvalidName { name } => {
                write!(f, "name {name:?} cannot be stored in a blob")
            }
            Self::EmptyReservation { address } => {
                write!(f, "memory reservation at {address:#x} has size 0")
            }
            Self::Format => write!(f, "error writing assembly output"),
        }
    }
}

impl From<fmt::Error> for EncodeError {
    fn from(_: fmt::Error) -> Self {
        Self::Format
    }
}

impl core::error::Error for EncodeError {}
