// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::property::Property;
use alloc::{string::String, vec::Vec};
use core::fmt;

/// Characters allowed in the base name of a node.
const NODE_NAME_CHARS: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789,._+*#?-";
/// Characters allowed in the unit address of a node, after the `@`.
const UNIT_ADDRESS_CHARS: &[u8] = b"0123456789abcdef,";

/// A node of a device tree, owning its properties and children.
///
/// Properties and children are kept in insertion order, which is also the
/// order in which they are flattened. A node does not point back to its
/// parent; instead it records its full path, which is recomputed whenever
/// the node is attached to a new parent with [`Node::add_child`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    full_path: String,
    base_name_len: usize,
    label: Option<String>,
    properties: Vec<Property>,
    children: Vec<Node>,
}

impl Node {
    /// Creates a new, detached [`Node`] with the given name.
    ///
    /// A node with an empty name is a root node and has the full path `/`.
    /// Any other detached node is treated as a child of the root until it is
    /// attached somewhere else.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::Node;
    /// let node = Node::new("cpu@0");
    /// assert_eq!(node.name(), "cpu@0");
    /// assert_eq!(node.base_name(), "cpu");
    /// assert_eq!(node.full_path(), "/cpu@0");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let full_path = join_path("/", &name);
        Self::with_path(name, full_path)
    }

    pub(crate) fn with_path(name: String, full_path: String) -> Self {
        Self {
            base_name_len: base_name_len(&name),
            name,
            full_path,
            label: None,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates a new [`NodeBuilder`] with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(name)
    }

    /// Returns the name of this node, including any unit address.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full path of this node.
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Returns the length of the name without its `@unit-address` suffix.
    #[must_use]
    pub fn base_name_len(&self) -> usize {
        self.base_name_len
    }

    /// Returns the name without its `@unit-address` suffix.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.name[..self.base_name_len]
    }

    /// Returns the emission label of this node, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets the emission label of this node.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// Returns an iterator over the properties of this node, in insertion
    /// order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Finds the first property with the given name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::{Node, Property};
    /// let mut node = Node::new("my-node");
    /// node.add_property(Property::new("my-prop", vec![1, 2, 3, 4]));
    /// assert_eq!(node.property("my-prop").unwrap().value(), &[1, 2, 3, 4]);
    /// ```
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|prop| prop.name() == name)
    }

    /// Appends a property to this node.
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Returns an iterator over the children of this node, in insertion
    /// order.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Finds the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name() == name)
    }

    /// Finds the first child with the given name and returns a mutable
    /// reference to it.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|child| child.name() == name)
    }

    /// Appends a child to this node.
    ///
    /// The full paths of the child and all of its descendants are rewritten
    /// to hang off this node.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dtflat::model::Node;
    /// let mut soc = Node::new("soc");
    /// soc.add_child(Node::builder("uart@1000").child(Node::new("port")).build());
    /// let port = soc.child("uart@1000").unwrap().child("port").unwrap();
    /// assert_eq!(port.full_path(), "/soc/uart@1000/port");
    /// ```
    pub fn add_child(&mut self, mut child: Node) {
        child.reparent(&self.full_path);
        self.children.push(child);
    }

    /// Appends an already decoded child whose path is known to be correct.
    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    fn reparent(&mut self, parent_path: &str) {
        self.full_path = join_path(parent_path, &self.name);
        for child in &mut self.children {
            child.reparent(&self.full_path);
        }
    }

    pub(crate) fn fmt_source(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = indent)?;
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        if self.name.is_empty() {
            writeln!(f, "/ {{")?;
        } else {
            writeln!(f, "{} {{", self.name)?;
        }

        for prop in &self.properties {
            prop.fmt_source(f, indent + 4)?;
        }

        for child in &self.children {
            writeln!(f)?;
            child.fmt_source(f, indent + 4)?;
        }

        writeln!(f, "{:indent$}}};", "", indent = indent)
    }
}

/// A builder for creating [`Node`]s.
#[derive(Debug)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            node: Node::new(name),
        }
    }

    /// Sets the emission label of the node.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.node.set_label(label);
        self
    }

    /// Adds a property to the node.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.node.add_property(property);
        self
    }

    /// Adds a child to the node.
    #[must_use]
    pub fn child(mut self, child: Node) -> Self {
        self.node.add_child(child);
        self
    }

    /// Builds the `Node`.
    #[must_use]
    pub fn build(self) -> Node {
        self.node
    }
}

/// Joins a parent path and a node name into the node's full path.
///
/// # Examples
///
/// ```
/// # use dtflat::model::join_path;
/// assert_eq!(join_path("/", ""), "/");
/// assert_eq!(join_path("/", "cpus"), "/cpus");
/// assert_eq!(join_path("/cpus", "cpu@0"), "/cpus/cpu@0");
/// ```
#[must_use]
pub fn join_path(parent: &str, name: &str) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 1);
    path.push_str(parent);
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    path
}

fn base_name_len(name: &str) -> usize {
    name.rfind('@').unwrap_or(name.len())
}

/// Checks a node name against the allowed character sets.
///
/// The base name may only use letters, digits and `,._+*#?-`; a unit
/// address after the last `@` may only use lowercase hex digits and commas.
pub(crate) fn is_valid_node_name(name: &str) -> bool {
    let (base, unit_address) = match name.rfind('@') {
        Some(at) => (&name[..at], Some(&name[at + 1..])),
        None => (name, None),
    };
    base.bytes().all(|ch| NODE_NAME_CHARS.contains(&ch))
        && unit_address.is_none_or(|addr| addr.bytes().all(|ch| UNIT_ADDRESS_CHARS.contains(&ch)))
}
