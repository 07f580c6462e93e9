//! Document access: the node-tree seam the engine drives.
//!
//! The engine never talks to a concrete document technology. It sees the
//! [`Document`] trait — an ordered selector query plus the handful of node
//! mutation primitives a replacement pass needs — and addresses nodes by
//! opaque [`NodeId`] handles.
//!
//! [`MemoryDocument`] is the built-in implementation: a flat arena of node
//! slots with parent/children links, used by the CLI and the test suite.
//! Hosts embedding the engine against a real render tree implement
//! [`Document`] over their own node storage.
//!
//! # Leniency
//!
//! No method panics or reports an error. Unknown handles, detached nodes,
//! and selectors the matcher cannot parse all degrade to empty results or
//! no-ops. The engine's failure model is silent degradation; the document
//! seam follows it.

use std::collections::BTreeMap;

/// Opaque handle to a node in a [`Document`].
///
/// Handles stay valid for the lifetime of the document, including for
/// detached nodes (the variant cache holds prototypes that live outside
/// the tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// The document operations a replacement pass needs.
pub trait Document {
    /// Nodes matching `selector`, in document (depth-first) order.
    fn query(&self, selector: &str) -> Vec<NodeId>;

    /// Create a new detached element.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Shallow structural clone: tag, attributes, classes, and style
    /// properties are copied; the clone is detached and childless. The
    /// clone never shares identity with its source.
    fn clone_node(&mut self, node: NodeId) -> NodeId;

    /// The node's parent, if attached.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Replace `old` with `new` in `parent`'s child list, preserving
    /// position. No-op when `old` is not currently a child of `parent`
    /// (e.g. it was already swapped out by an interleaved pass).
    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId);

    /// Read an attribute.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Write an attribute.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Append a class. Idempotent.
    fn add_class(&mut self, node: NodeId, class: &str);

    /// Write an inline style property.
    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str);

    /// The node's rendered width in pixels; 0 when unknown.
    fn client_width(&self, node: NodeId) -> u32;
}

#[derive(Debug, Clone, Default)]
struct Slot {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    layout_width: Option<u32>,
}

/// Arena-backed in-memory document.
///
/// Nodes live in a flat slot vector addressed by [`NodeId`]; the tree
/// structure is parent/children links between slots. Slots are never
/// freed — a node detached by [`Document::replace_child`] simply keeps
/// existing outside the tree, which is exactly what the variant cache
/// relies on for its prototypes.
#[derive(Debug)]
pub struct MemoryDocument {
    slots: Vec<Slot>,
    root: NodeId,
}

impl MemoryDocument {
    /// Create a document with a single empty `body` root.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.alloc("body");
        doc
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create an element and append it under `parent`.
    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.alloc(tag);
        self.append_child(parent, node);
        node
    }

    /// Append a detached node under `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.slot(parent).is_none() || self.slot(child).is_none() {
            return;
        }
        self.detach(child);
        self.slots[child.0 as usize].parent = Some(parent);
        self.slots[parent.0 as usize].children.push(child);
    }

    /// Fix the rendered width reported by [`Document::client_width`].
    ///
    /// Without an explicit layout width the node falls back to its `width`
    /// attribute, then to 0.
    pub fn set_client_width(&mut self, node: NodeId, width: u32) {
        if let Some(slot) = self.slot_mut(node) {
            slot.layout_width = Some(width);
        }
    }

    /// The node's tag name, or `""` for an unknown handle.
    pub fn tag(&self, node: NodeId) -> &str {
        self.slot(node).map(|s| s.tag.as_str()).unwrap_or("")
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.slot(node)
            .is_some_and(|s| s.classes.iter().any(|c| c == class))
    }

    pub fn style_property(&self, node: NodeId, name: &str) -> Option<&str> {
        self.slot(node)?.styles.get(name).map(String::as_str)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.slot(node).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.slot(current).and_then(|s| s.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            tag: tag.to_string(),
            ..Slot::default()
        });
        id
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node.0 as usize)
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(node.0 as usize)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.slot(node).and_then(|s| s.parent) else {
            return;
        };
        if let Some(parent_slot) = self.slot_mut(parent) {
            parent_slot.children.retain(|&c| c != node);
        }
        if let Some(slot) = self.slot_mut(node) {
            slot.parent = None;
        }
    }

    fn collect_matches(&self, node: NodeId, selectors: &[Compound], out: &mut Vec<NodeId>) {
        if let Some(slot) = self.slot(node) {
            if selectors.iter().any(|sel| sel.matches(slot)) {
                out.push(node);
            }
            for &child in &slot.children {
                self.collect_matches(child, selectors, out);
            }
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn query(&self, selector: &str) -> Vec<NodeId> {
        let selectors = parse_selector_list(selector);
        let mut out = Vec::new();
        if !selectors.is_empty() {
            self.collect_matches(self.root, &selectors, &mut out);
        }
        out
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(tag)
    }

    fn clone_node(&mut self, node: NodeId) -> NodeId {
        let Some(slot) = self.slot(node) else {
            return self.alloc("");
        };
        let copy = Slot {
            parent: None,
            children: Vec::new(),
            tag: slot.tag.clone(),
            attributes: slot.attributes.clone(),
            classes: slot.classes.clone(),
            styles: slot.styles.clone(),
            layout_width: slot.layout_width,
        };
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(copy);
        id
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node)?.parent
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if new == old || self.slot(new).is_none() {
            return;
        }
        if !self
            .slot(parent)
            .is_some_and(|s| s.children.contains(&old))
        {
            return;
        }
        self.detach(new);
        // Recomputed after the detach: removing `new` from this parent's
        // child list may have shifted `old`'s position.
        let Some(position) = self
            .slot(parent)
            .and_then(|s| s.children.iter().position(|&c| c == old))
        else {
            return;
        };
        self.slots[parent.0 as usize].children[position] = new;
        self.slots[new.0 as usize].parent = Some(parent);
        self.slots[old.0 as usize].parent = None;
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.slot(node)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(slot) = self.slot_mut(node)
            && !slot.classes.iter().any(|c| c == class)
        {
            slot.classes.push(class.to_string());
        }
    }

    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(slot) = self.slot_mut(node) {
            slot.styles.insert(name.to_string(), value.to_string());
        }
    }

    fn client_width(&self, node: NodeId) -> u32 {
        let Some(slot) = self.slot(node) else {
            return 0;
        };
        slot.layout_width
            .or_else(|| slot.attributes.get("width").and_then(|w| w.parse().ok()))
            .unwrap_or(0)
    }
}

// =============================================================================
// Selector matching
// =============================================================================

/// One compound simple selector: `tag.class#id[attr=value]`, no combinators.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Compound {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, slot: &Slot) -> bool {
        if let Some(tag) = &self.tag
            && !slot.tag.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && slot.attributes.get("id") != Some(id)
        {
            return false;
        }
        if !self.classes.iter().all(|c| slot.classes.contains(c)) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| {
            match (slot.attributes.get(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

/// Parse a comma-separated list of compound selectors.
///
/// Parts the grammar does not cover are skipped; an entirely unparseable
/// selector yields no matches rather than an error.
pub(crate) fn parse_selector_list(selector: &str) -> Vec<Compound> {
    selector
        .split(',')
        .filter_map(|part| parse_compound(part.trim()))
        .collect()
}

fn parse_compound(part: &str) -> Option<Compound> {
    if part.is_empty() {
        return None;
    }
    let mut compound = Compound::default();
    let mut rest = part;

    if !rest.starts_with(['.', '#', '[']) {
        let end = rest
            .find(['.', '#', '['])
            .unwrap_or(rest.len());
        compound.tag = Some(rest[..end].to_string());
        rest = &rest[end..];
    }

    while !rest.is_empty() {
        let marker = rest.chars().next()?;
        rest = &rest[marker.len_utf8()..];
        match marker {
            '.' | '#' => {
                let end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
                let name = &rest[..end];
                if name.is_empty() {
                    return None;
                }
                if marker == '.' {
                    compound.classes.push(name.to_string());
                } else {
                    compound.id = Some(name.to_string());
                }
                rest = &rest[end..];
            }
            '[' => {
                let end = rest.find(']')?;
                let inner = &rest[..end];
                match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim_matches(['"', '\'']);
                        compound
                            .attributes
                            .push((name.to_string(), Some(value.to_string())));
                    }
                    None => compound.attributes.push((inner.to_string(), None)),
                }
                rest = &rest[end + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}
