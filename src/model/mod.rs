// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An in-memory representation of a device tree and its boot information.
//!
//! This module provides the [`BootInfo`], [`Node`] and [`Property`] structs.
//! A [`BootInfo`] can be flattened into a blob or into assembly source, and
//! is what decoding a blob produces.

use crate::{
    EncodeConfig,
    error::{DecodeError, EncodeError},
    memreserve::MemoryReservation,
    reader, writer,
};
use alloc::{string::String, vec::Vec};
use core::fmt;

mod node;
mod property;

pub use node::{Node, NodeBuilder, join_path};
pub(crate) use node::is_valid_node_name;
pub use property::Property;

/// A device tree together with its memory reservation list.
///
/// # Examples
///
/// ```
/// # use dtflat::model::{BootInfo, Node, Property};
/// let root = Node::builder("")
///     .child(
///         Node::builder("cpu@0")
///             .property(Property::new("reg", 0u32.to_be_bytes()))
///             .build(),
///     )
///     .build();
/// let boot_info = BootInfo::new(root);
///
/// let blob = boot_info.to_blob(16).unwrap();
/// let decoded = BootInfo::from_blob(&blob).unwrap();
/// assert_eq!(decoded, boot_info);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootInfo {
    root: Node,
    /// The memory reservations, without the terminating entry.
    pub memory_reservations: Vec<MemoryReservation>,
}

impl BootInfo {
    /// Creates a new `BootInfo` with the given root node and no memory
    /// reservations.
    #[must_use]
    pub fn new(root: Node) -> Self {
        Self {
            root,
            memory_reservations: Vec::new(),
        }
    }

    /// Creates a new `BootInfo` with the given root node and memory
    /// reservations.
    #[must_use]
    pub fn with_reservations(root: Node, memory_reservations: Vec<MemoryReservation>) -> Self {
        Self {
            root,
            memory_reservations,
        }
    }

    /// Returns a reference to the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns a mutable reference to the root node.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Finds a node by its full path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::{BootInfo, Node};
    /// let root = Node::builder("")
    ///     .child(Node::builder("cpus").child(Node::new("cpu@0")).build())
    ///     .build();
    /// let boot_info = BootInfo::new(root);
    /// assert_eq!(boot_info.find_node("/cpus/cpu@0").unwrap().name(), "cpu@0");
    /// assert!(boot_info.find_node("/cpus/cpu@1").is_none());
    /// ```
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        if !path.starts_with('/') {
            return None;
        }
        let mut current = &self.root;
        for component in path.split('/').filter(|s| !s.is_empty()) {
            current = current.child(component)?;
        }
        Some(current)
    }

    /// Flattens this tree into a blob of the given version.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownVersion`] if `version` is not one of 1,
    /// 2, 3 or 16, and [`EncodeError::TooLarge`] if the blob would not fit
    /// the 32-bit header fields. Names that cannot be stored are
    /// [`EncodeError::InvalidName`], and a reservation of size 0 is
    /// [`EncodeError::EmptyReservation`].
    pub fn to_blob(&self, version: u32) -> Result<Vec<u8>, EncodeError> {
        self.to_blob_with(&EncodeConfig::new(version))
    }

    /// Flattens this tree into a blob as described by `config`.
    ///
    /// # Errors
    ///
    /// See [`BootInfo::to_blob`].
    pub fn to_blob_with(&self, config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
        writer::to_blob(self, config)
    }

    /// Renders this tree as assembly source of the given blob version.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownVersion`] if `version` is not one of 1,
    /// 2, 3 or 16.
    pub fn to_asm(&self, version: u32) -> Result<String, EncodeError> {
        self.to_asm_with(&EncodeConfig::new(version))
    }

    /// Renders this tree as assembly source as described by `config`.
    ///
    /// # Errors
    ///
    /// See [`BootInfo::to_asm`].
    pub fn to_asm_with(&self, config: &EncodeConfig) -> Result<String, EncodeError> {
        let mut out = String::new();
        writer::write_asm(&mut out, self, config)?;
        Ok(out)
    }

    /// Decodes a blob into a new tree.
    ///
    /// The slice may be longer than the blob; only the first `totalsize`
    /// bytes are looked at.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the blob is malformed or truncated.
    pub fn from_blob(blob: &[u8]) -> Result<Self, DecodeError> {
        reader::from_blob(blob)
    }

    /// Reads a blob from `source` and decodes it into a new tree.
    ///
    /// Exactly `totalsize` bytes are consumed from `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if reading fails, the input ends early, or
    /// the blob is malformed.
    #[cfg(feature = "std")]
    pub fn from_reader(source: impl std::io::Read) -> Result<Self, DecodeError> {
        reader::from_reader(source)
    }
}

impl fmt::Display for BootInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/dts-v1/;")?;
        writeln!(f)?;
        for reservation in &self.memory_reservations {
            writeln!(
                f,
                "/memreserve/ {:#x} {:#x};",
                reservation.address(),
                reservation.size()
            )?;
        }
        if !self.memory_reservations.is_empty() {
            writeln!(f)?;
        }
        self.root.fmt_source(f, 0)
    }
}
