// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::cursor::Cursor;
use crate::{
    emit::{FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_PROP},
    error::{DecodeError, DecodeErrorKind},
    model::{Node, Property, is_valid_node_name, join_path},
    version::VersionFlags,
};
use alloc::{
    borrow::{Cow, ToOwned},
    string::String,
};
use log::warn;

/// Maximum depth of nested nodes, counting the root.
pub(crate) const MAX_NESTING: usize = 256;

/// Rebuilds nodes from the structure block.
#[derive(Debug)]
pub(crate) struct Unflattener<'a> {
    structure: Cursor<'a>,
    strings: Cursor<'a>,
    flags: VersionFlags,
}

impl<'a> Unflattener<'a> {
    pub(crate) fn new(structure: Cursor<'a>, strings: Cursor<'a>, flags: VersionFlags) -> Self {
        Self {
            structure,
            strings,
            flags,
        }
    }

    pub(crate) fn read_token(&mut self) -> Result<u32, DecodeError> {
        self.structure.read_u32()
    }

    pub(crate) fn position(&self) -> usize {
        self.structure.position()
    }

    /// Reads the node whose begin-node token was just consumed, along with
    /// its properties and its whole subtree.
    ///
    /// `parent_path` is `None` for the root node.
    pub(crate) fn read_node(
        &mut self,
        parent_path: Option<&str>,
        depth: usize,
    ) -> Result<Node, DecodeError> {
        if depth >= MAX_NESTING {
            return Err(DecodeError::new(
                DecodeErrorKind::NestingTooDeep,
                self.structure.position(),
            ));
        }

        let id_offset = self.structure.position();
        let id = String::from_utf8_lossy(self.structure.read_string()?);
        if let Cow::Owned(_) = id {
            warn!("node name \"{id}\" is not valid UTF-8");
        }
        let id: &str = &id;
        let mut node = if self.flags.contains(VersionFlags::FULL_PATH) {
            let name = name_from_path(parent_path, id).ok_or_else(|| {
                DecodeError::new(
                    DecodeErrorKind::PathMismatch {
                        path: id.to_owned(),
                        parent: parent_path.unwrap_or_default().to_owned(),
                    },
                    id_offset,
                )
            })?;
            Node::with_path(name.to_owned(), id.to_owned())
        } else {
            Node::with_path(id.to_owned(), join_path(parent_path.unwrap_or("/"), id))
        };

        if !is_valid_node_name(node.name()) {
            warn!("node name \"{}\" has incorrect format", node.name());
        }

        loop {
            let token_offset = self.structure.position();
            match self.structure.read_u32()? {
                FDT_PROP => {
                    let prop = self.read_property()?;
                    node.add_property(prop);
                }
                FDT_BEGIN_NODE => {
                    let child = self.read_node(Some(node.full_path()), depth + 1)?;
                    node.push_child(child);
                }
                FDT_END_NODE => return Ok(node),
                FDT_END => {
                    return Err(DecodeError::new(DecodeErrorKind::PrematureEnd, token_offset));
                }
                token => {
                    return Err(DecodeError::new(DecodeErrorKind::BadToken(token), token_offset));
                }
            }
        }
    }

    fn read_property(&mut self) -> Result<Property, DecodeError> {
        let len = self.structure.read_u32()?;
        let name_offset = self.structure.read_u32()?;
        let name = self.strings.string_at(name_offset)?;

        if self.flags.contains(VersionFlags::VARIABLE_ALIGN) && len >= 8 {
            self.structure.realign(8)?;
        }
        let value = self.structure.read_data(len as usize)?;

        Ok(Property::new(name, value))
    }
}

/// Derives a node name from its full path, checking that the path hangs
/// directly off `parent_path`.
fn name_from_path<'p>(parent_path: Option<&str>, path: &'p str) -> Option<&'p str> {
    let Some(parent_path) = parent_path else {
        return (path == "/").then_some("");
    };

    let slash = path.rfind('/')?;
    let dir = match &path[..slash] {
        "" => "/",
        dir => dir,
    };
    (dir == parent_path).then_some(&path[slash + 1..])
}
