#![forbid(unsafe_code)]

//! Declarative view nodes and their builders.
//!
//! A view is a tree of [`ViewNode`]s, each carrying a unique id, one of a
//! fixed set of [`NodeType`]s, string properties, and ordered children.
//! Ids are the identity of a node across re-renders: frames, focus, and
//! split weights are all keyed by them.
//!
//! # Example
//! ```
//! use nui_layout::node::{body, tag, vbox};
//!
//! let root = vbox("root", [tag("t", "New Del"), body("b")]);
//! assert_eq!(root.children.len(), 2);
//! assert_eq!(root.find("t").and_then(|n| n.get("text")), Some("New Del"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed set of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    VBox,
    HBox,
    Stack,
    SplitBox,
    Scroll,
    Text,
    Button,
    Checkbox,
    TextBox,
    Tag,
    Body,
    Spacer,
    Rect,
    Row,
}

impl NodeType {
    pub const ALL: [NodeType; 14] = [
        NodeType::VBox,
        NodeType::HBox,
        NodeType::Stack,
        NodeType::SplitBox,
        NodeType::Scroll,
        NodeType::Text,
        NodeType::Button,
        NodeType::Checkbox,
        NodeType::TextBox,
        NodeType::Tag,
        NodeType::Body,
        NodeType::Spacer,
        NodeType::Rect,
        NodeType::Row,
    ];

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::VBox => "vbox",
            NodeType::HBox => "hbox",
            NodeType::Stack => "stack",
            NodeType::SplitBox => "splitbox",
            NodeType::Scroll => "scroll",
            NodeType::Text => "text",
            NodeType::Button => "button",
            NodeType::Checkbox => "checkbox",
            NodeType::TextBox => "textbox",
            NodeType::Tag => "tag",
            NodeType::Body => "body",
            NodeType::Spacer => "spacer",
            NodeType::Rect => "rect",
            NodeType::Row => "row",
        }
    }

    /// Types that receive mouse input without `focusable=1`.
    pub const fn is_interactive(self) -> bool {
        matches!(
            self,
            NodeType::Button
                | NodeType::Checkbox
                | NodeType::TextBox
                | NodeType::Tag
                | NodeType::Body
                | NodeType::Row
        )
    }

    /// Tag and body nodes own editable text frames.
    pub const fn is_editable(self) -> bool {
        matches!(self, NodeType::Tag | NodeType::Body)
    }

    pub const fn is_container(self) -> bool {
        matches!(
            self,
            NodeType::VBox
                | NodeType::HBox
                | NodeType::Stack
                | NodeType::SplitBox
                | NodeType::Scroll
                | NodeType::Row
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a type name outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeType(pub String);

impl fmt::Display for UnknownNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type {:?}", self.0)
    }
}

impl std::error::Error for UnknownNodeType {}

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}

/// Split direction of a splitbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// Children stacked top to bottom.
    #[default]
    Vertical,
    /// Children side by side.
    Horizontal,
}

impl Axis {
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::Vertical => "v",
            Axis::Horizontal => "h",
        }
    }
}

/// One node of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub id: String,
    pub kind: NodeType,
    pub props: BTreeMap<String, String>,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    pub fn new(id: impl Into<String>, kind: NodeType) -> Self {
        Self {
            id: id.into(),
            kind,
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Set a property.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Append a child.
    #[must_use]
    pub fn child(mut self, child: ViewNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Flex weight along the parent's axis.
    #[must_use]
    pub fn flex(self, weight: u32) -> Self {
        self.prop("flex", weight.to_string())
    }

    #[must_use]
    pub fn pad(self, pad: i32) -> Self {
        self.prop("pad", pad.to_string())
    }

    #[must_use]
    pub fn gap(self, gap: i32) -> Self {
        self.prop("gap", gap.to_string())
    }

    /// Bind the node's value to a state path.
    #[must_use]
    pub fn bind(self, path: impl Into<String>) -> Self {
        self.prop("bind", path)
    }

    #[must_use]
    pub fn focusable(self) -> Self {
        self.prop("focusable", "1")
    }

    /// Fixed size, overriding the measured minimum.
    #[must_use]
    pub fn size(self, w: i32, h: i32) -> Self {
        self.prop("w", w.to_string()).prop("h", h.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Numeric property; `None` when absent or malformed.
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Check if the node takes part in focus navigation.
    pub fn is_focusable(&self) -> bool {
        self.kind.is_interactive() || self.get("focusable") == Some("1")
    }

    /// Depth-first search by id.
    pub fn find(&self, id: &str) -> Option<&ViewNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ViewNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Visit every node in document order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ViewNode)) {
        f(self);
        for c in &self.children {
            c.walk(f);
        }
    }

    /// Visit every node in document order, mutably.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut ViewNode)) {
        f(self);
        for c in &mut self.children {
            c.walk_mut(f);
        }
    }
}

pub fn vbox(id: impl Into<String>, children: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::new(id, NodeType::VBox).children(children)
}

pub fn hbox(id: impl Into<String>, children: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::new(id, NodeType::HBox).children(children)
}

/// Children layered over the same rectangle, last on top.
pub fn stack(id: impl Into<String>, children: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::new(id, NodeType::Stack).children(children)
}

/// Children separated by draggable handles.
pub fn splitbox(
    id: impl Into<String>,
    axis: Axis,
    children: impl IntoIterator<Item = ViewNode>,
) -> ViewNode {
    ViewNode::new(id, NodeType::SplitBox)
        .prop("dir", axis.as_str())
        .children(children)
}

/// A viewport over one child, offset by the `offset` property in pixels.
pub fn scroll(id: impl Into<String>, child: ViewNode) -> ViewNode {
    ViewNode::new(id, NodeType::Scroll).child(child)
}

pub fn text(id: impl Into<String>, text: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Text).prop("text", text)
}

/// A button emitting `on` when clicked.
pub fn button(id: impl Into<String>, label: impl Into<String>, on: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Button)
        .prop("label", label)
        .prop("on", on)
}

pub fn checkbox(id: impl Into<String>, label: impl Into<String>, checked: bool) -> ViewNode {
    ViewNode::new(id, NodeType::Checkbox)
        .prop("label", label)
        .prop("checked", if checked { "1" } else { "0" })
}

/// A one-line input showing `placeholder` while empty.
pub fn textbox(id: impl Into<String>, placeholder: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::TextBox).prop("placeholder", placeholder)
}

/// A one-line editable command bar.
pub fn tag(id: impl Into<String>, text: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Tag).prop("text", text)
}

/// A multi-line editable text area.
pub fn body(id: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Body)
}

pub fn spacer(id: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Spacer)
}

/// A solid rectangle; `color` is a hex RGBA value such as `0xFF0000FF`.
pub fn rect(id: impl Into<String>, color: impl Into<String>) -> ViewNode {
    ViewNode::new(id, NodeType::Rect).prop("color", color)
}

/// A selectable list row laid out like an hbox.
pub fn row(id: impl Into<String>, children: impl IntoIterator<Item = ViewNode>) -> ViewNode {
    ViewNode::new(id, NodeType::Row).children(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for t in NodeType::ALL {
            assert_eq!(t.as_str().parse::<NodeType>(), Ok(t));
        }
        assert!("window".parse::<NodeType>().is_err());
    }

    #[test]
    fn builders_set_props() {
        let b = button("ok", "OK", "submit");
        assert_eq!(b.get("label"), Some("OK"));
        assert_eq!(b.get("on"), Some("submit"));
        let c = checkbox("cb", "done", true).bind("todo/0/done");
        assert_eq!(c.get("checked"), Some("1"));
        assert_eq!(c.get("bind"), Some("todo/0/done"));
        let s = splitbox("s", Axis::Horizontal, [body("a"), body("b")]);
        assert_eq!(s.get("dir"), Some("h"));
        assert_eq!(s.children.len(), 2);
    }

    #[test]
    fn focusable_covers_interactive_types() {
        assert!(body("b").is_focusable());
        assert!(!text("t", "x").is_focusable());
        assert!(text("t", "x").focusable().is_focusable());
    }

    #[test]
    fn walk_is_document_order() {
        let root = vbox("r", [hbox("h", [text("a", ""), text("b", "")]), text("c", "")]);
        let mut ids = Vec::new();
        root.walk(&mut |n| ids.push(n.id.as_str()));
        assert_eq!(ids, ["r", "h", "a", "b", "c"]);
    }

    #[test]
    fn find_mut_edits_in_place() {
        let mut root = vbox("r", [textbox("in", "type here")]);
        if let Some(n) = root.find_mut("in") {
            n.props.insert("text".into(), "hello".into());
        }
        assert_eq!(root.find("in").and_then(|n| n.get("text")), Some("hello"));
        assert!(root.find("missing").is_none());
    }
}
