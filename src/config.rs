// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Encoder settings.

use alloc::{borrow::ToOwned, string::String};

/// Boot CPU id written into binary blobs when none is configured.
pub(crate) const BLOB_BOOT_CPUID_PLACEHOLDER: u32 = 0xfeed_beef;
/// Boot CPU id written into assembly output when none is configured.
pub(crate) const ASM_BOOT_CPUID_PLACEHOLDER: u32 = 0xdead_beef;
/// Default prefix of the global symbols in assembly output.
const DEFAULT_SYMBOL_PREFIX: &str = "dt";

/// Settings for flattening a [`BootInfo`](crate::model::BootInfo).
///
/// # Examples
///
/// ```
/// # use dtflat::EncodeConfig;
/// # use dtflat::model::{BootInfo, Node};
/// let config = EncodeConfig::new(16)
///     .boot_cpuid_phys(1)
///     .symbol_prefix("fdt");
/// let asm = BootInfo::new(Node::new("")).to_asm_with(&config).unwrap();
/// assert!(asm.contains("fdt_blob_start:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeConfig {
    version: u32,
    boot_cpuid_phys: Option<u32>,
    symbol_prefix: String,
}

impl EncodeConfig {
    /// Creates a config for the given blob version with default settings.
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            boot_cpuid_phys: None,
            symbol_prefix: DEFAULT_SYMBOL_PREFIX.to_owned(),
        }
    }

    /// Sets the physical boot CPU id written into the header.
    ///
    /// Ignored for version 1, whose header has no such field.
    #[must_use]
    pub fn boot_cpuid_phys(mut self, boot_cpuid_phys: u32) -> Self {
        self.boot_cpuid_phys = Some(boot_cpuid_phys);
        self
    }

    /// Sets the prefix of the global symbols in assembly output.
    #[must_use]
    pub fn symbol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.symbol_prefix = prefix.into();
        self
    }

    /// Returns the blob version to produce.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn blob_boot_cpuid(&self) -> u32 {
        self.boot_cpuid_phys.unwrap_or(BLOB_BOOT_CPUID_PLACEHOLDER)
    }

    pub(crate) fn asm_boot_cpuid(&self) -> u32 {
        self.boot_cpuid_phys.unwrap_or(ASM_BOOT_CPUID_PLACEHOLDER)
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.symbol_prefix
    }
}
