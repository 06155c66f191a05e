// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::{string::String, vec::Vec};
use core::{ffi::CStr, fmt};

/// A named byte value attached to a [`Node`](super::Node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    value: Vec<u8>,
    label: Option<String>,
}

impl Property {
    /// Creates a new `Property` with the given name and value.
    ///
    /// The value is stored as-is; string values must carry their own NUL
    /// terminator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::Property;
    /// let prop = Property::new("reg", 0x1000u32.to_be_bytes());
    /// assert_eq!(prop.name(), "reg");
    /// assert_eq!(prop.value(), &[0, 0, 0x10, 0]);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            label: None,
        }
    }

    /// Attaches an emission label to this property.
    ///
    /// Labels become global symbols in the assembly rendering.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of this property.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the emission label of this property, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the value of this property as a big-endian `u32`, or `None` if
    /// it is not exactly 4 bytes long.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::Property;
    /// let prop = Property::new("reg", 1234u32.to_be_bytes());
    /// assert_eq!(prop.as_u32(), Some(1234));
    /// ```
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.value.as_slice().try_into().ok().map(u32::from_be_bytes)
    }

    /// Returns the value of this property as a string, or `None` if it is not
    /// a single NUL-terminated UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::Property;
    /// let prop = Property::new("name", "cpu\0");
    /// assert_eq!(prop.as_str(), Some("cpu"));
    /// ```
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        CStr::from_bytes_with_nul(&self.value)
            .ok()
            .and_then(|cstr| cstr.to_str().ok())
    }

    /// Returns an iterator over the NUL-separated strings in this property.
    pub fn as_str_list(&self) -> impl Iterator<Item = &str> {
        StringListIter { value: &self.value }
    }

    pub(crate) fn fmt_source(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = indent)?;
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        write!(f, "{}", self.name)?;

        if self.value.is_empty() {
            return writeln!(f, ";");
        }

        let is_printable = self
            .value
            .iter()
            .all(|&ch| ch.is_ascii_graphic() || ch == b' ' || ch == 0);
        let has_empty = self.value.windows(2).any(|window| window == [0, 0]);
        if is_printable && self.value.ends_with(&[0]) && !has_empty && self.value[0] != 0 {
            let mut strings = self.as_str_list();
            if let Some(first) = strings.next() {
                write!(f, " = \"{first}\"")?;
                for s in strings {
                    write!(f, ", \"{s}\"")?;
                }
                return writeln!(f, ";");
            }
        }

        if self.value.len().is_multiple_of(4) {
            write!(f, " = <")?;
            for (i, chunk) in self.value.chunks_exact(4).enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                let mut word = [0; 4];
                word.copy_from_slice(chunk);
                write!(f, "0x{:08x}", u32::from_be_bytes(word))?;
            }
            writeln!(f, ">;")
        } else {
            write!(f, " = [")?;
            for (i, byte) in self.value.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{byte:02x}")?;
            }
            writeln!(f, "];")
        }
    }
}

struct StringListIter<'a> {
    value: &'a [u8],
}

impl<'a> Iterator for StringListIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.value.is_empty() {
            return None;
        }
        let s = CStr::from_bytes_until_nul(self.value).ok()?.to_str().ok()?;
        self.value = &self.value[s.len() + 1..];
        Some(s)
    }
}
