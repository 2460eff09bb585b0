#![forbid(unsafe_code)]

//! View nodes, tree snapshots, and layout.
//!
//! - [`node`] - [`ViewNode`] and the declarative builders (`vbox`, `body`, ...)
//! - [`tree`] - revisioned [`Tree`] snapshots and their line wire form
//! - [`layout`] - measure-then-flex placement, splitbox handles and weights
//! - [`hit`] - hit testing, handle lookup, and focus order
//!
//! # Example
//!
//! ```
//! use nui_layout::node::{body, tag, vbox};
//! use nui_layout::{FixedMeasure, LayoutConfig, Layouter, Rectangle, Tree, hit_test};
//!
//! let view = vbox("root", [tag("t", "New Del"), body("b")]);
//! let tree = Tree::from_view(1, &view);
//! assert!(tree.serialize().contains("child root b"));
//!
//! let cfg = LayoutConfig::default();
//! let placed = Layouter::new(&FixedMeasure::default(), &cfg)
//!     .layout(&view, Rectangle::new(0, 0, 100, 200));
//! let hit = hit_test(&placed, placed.children[1].rect.min);
//! assert_eq!(hit.map(|n| n.id.as_str()), Some("b"));
//! ```

pub mod hit;
pub mod layout;
pub mod node;
pub mod tree;

pub use hit::{focus_order, handle_at, hit_test, next_focus};
pub use layout::{
    FixedMeasure, LayoutConfig, LayoutNode, Layouter, SplitHandle, TextMeasure, distribute,
    drag_weights, format_weights, parse_weights,
};
pub use node::{Axis, NodeType, UnknownNodeType, ViewNode};
pub use nui_core::geometry::{Point, Rectangle};
pub use tree::{Tree, TreeNode, TreeParseError, escape_value, parse_pairs, parse_tree, serialize_tree, unescape_value};
