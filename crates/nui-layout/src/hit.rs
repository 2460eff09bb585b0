#![forbid(unsafe_code)]

//! Hit testing, splitbox handles, and focus order over a placed tree.

use nui_core::geometry::Point;

use crate::layout::LayoutNode;

/// The deepest focusable node containing `p`.
///
/// Children are scanned last to first so the one drawn on top wins.
pub fn hit_test(n: &LayoutNode, p: Point) -> Option<&LayoutNode> {
    if !n.rect.contains(p) {
        return None;
    }
    for c in n.children.iter().rev() {
        if let Some(hit) = hit_test(c, p) {
            return Some(hit);
        }
    }
    n.is_focusable().then_some(n)
}

/// The splitbox handle under `p`, innermost first, as the splitbox and the
/// handle's index.
pub fn handle_at(n: &LayoutNode, p: Point) -> Option<(&LayoutNode, usize)> {
    if !n.rect.contains(p) {
        return None;
    }
    for c in n.children.iter().rev() {
        if let Some(hit) = handle_at(c, p) {
            return Some(hit);
        }
    }
    n.handles
        .iter()
        .find(|h| h.rect.contains(p))
        .map(|h| (n, h.index))
}

/// Ids of focusable nodes in document order.
pub fn focus_order(root: &LayoutNode) -> Vec<String> {
    let mut ids = Vec::new();
    root.walk(&mut |n| {
        if n.is_focusable() {
            ids.push(n.id.clone());
        }
    });
    ids
}

/// The id after (or before, when `backward`) `current` in `order`,
/// wrapping around. With no current focus, or one not in `order`, the
/// first (or last) id.
pub fn next_focus(order: &[String], current: Option<&str>, backward: bool) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    let n = order.len();
    let i = match current.and_then(|c| order.iter().position(|id| id == c)) {
        Some(i) if backward => (i + n - 1) % n,
        Some(i) => (i + 1) % n,
        None if backward => n - 1,
        None => 0,
    };
    Some(order[i].clone())
}
