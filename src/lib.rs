// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for flattening device trees into boot-parameter blobs and
//! reading them back.
//!
//! The in-memory tree is a [`BootInfo`](model::BootInfo): a root
//! [`Node`](model::Node) plus the list of memory reservations. It can be
//! turned into:
//!
//! - a binary blob of format version 1, 2, 3 or 16, with
//!   [`BootInfo::to_blob`](model::BootInfo::to_blob);
//! - GNU assembler source that assembles to an equivalent blob, with
//!   [`BootInfo::to_asm`](model::BootInfo::to_asm).
//!
//! Both renderings come from the same tree walk, so they only differ in how
//! the bytes are written down. Versions before 16 identify nodes by their
//! full path, align large property values to 8 bytes and carry a `name`
//! property on every node; see [`VersionInfo`](version::VersionInfo) for the
//! details of each version.
//!
//! Blobs of any of these versions can be decoded with
//! [`BootInfo::from_blob`](model::BootInfo::from_blob). Every read is bounded
//! by the sizes declared in the header, so malformed or truncated input
//! produces a [`DecodeError`] rather than a panic.
//!
//! The library is `#![no_std]` and needs `alloc`. The `std` feature, enabled
//! by default, adds [`BootInfo::from_reader`](model::BootInfo::from_reader).
//!
//! # Examples
//!
//! ```
//! use dtflat::model::{BootInfo, Node, Property};
//! use dtflat::MemoryReservation;
//!
//! let root = Node::builder("")
//!     .property(Property::new("model", "demo\0"))
//!     .child(
//!         Node::builder("memory@0")
//!             .property(Property::new("device_type", "memory\0"))
//!             .build(),
//!     )
//!     .build();
//! let boot_info =
//!     BootInfo::with_reservations(root, vec![MemoryReservation::new(0x1000, 0x2000)]);
//!
//! let blob = boot_info.to_blob(16).unwrap();
//! let decoded = BootInfo::from_blob(&blob).unwrap();
//! assert_eq!(decoded, boot_info);
//!
//! // Legacy versions add a `name` property to every node.
//! let legacy = BootInfo::from_blob(&boot_info.to_blob(1).unwrap()).unwrap();
//! let memory = legacy.find_node("/memory@0").unwrap();
//! assert_eq!(memory.property("name").unwrap().as_str(), Some("memory"));
//!
//! // Display the DTS
//! println!("{}", decoded);
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod config;
mod emit;
pub mod error;
pub mod header;
pub mod memreserve;
pub mod model;
mod reader;
mod strings;
pub mod version;
mod writer;

pub use config::EncodeConfig;
pub use error::{DecodeError, DecodeErrorKind, EncodeError};
pub use memreserve::MemoryReservation;
