#![forbid(unsafe_code)]

//! Two-pass layout: measure bottom-up, then place top-down.
//!
//! *Measure* computes each node's minimum size from its text, its children,
//! and its `pad`/`gap` properties. *Place* hands every container's inner
//! rectangle to its children: vbox and hbox give fixed children their
//! minimum and share what is left among flex children by weight; a
//! splitbox sizes children purely by weight with a handle between each
//! pair; a stack gives every child the whole rectangle.

use std::collections::{BTreeMap, HashMap};

use nui_core::geometry::{Point, Rectangle};
use nui_draw::Font;

use crate::node::{Axis, NodeType, ViewNode};

/// Text metrics needed to measure nodes.
pub trait TextMeasure {
    /// Width of `s` in pixels.
    fn text_width(&self, s: &str) -> i32;
    fn line_height(&self) -> i32;
}

impl TextMeasure for Font {
    fn text_width(&self, s: &str) -> i32 {
        self.string_width(s).unwrap_or(0)
    }

    fn line_height(&self) -> i32 {
        self.height
    }
}

/// Monospace metrics with no font behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMeasure {
    pub advance: i32,
    pub height: i32,
}

impl Default for FixedMeasure {
    fn default() -> Self {
        Self {
            advance: 8,
            height: 10,
        }
    }
}

impl TextMeasure for FixedMeasure {
    fn text_width(&self, s: &str) -> i32 {
        s.chars().count() as i32 * self.advance
    }

    fn line_height(&self) -> i32 {
        self.height
    }
}

/// Layout tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Thickness of a splitbox handle.
    pub handle: i32,
    /// Container padding when a node has no `pad` property.
    pub pad: i32,
    /// Gap between children when a node has no `gap` property.
    pub gap: i32,
    /// Minimum body height in lines.
    pub body_min_lines: i32,
    /// Border around textboxes and under tags.
    pub border: i32,
    /// Horizontal padding inside buttons.
    pub button_pad: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            handle: 3,
            pad: 0,
            gap: 0,
            body_min_lines: 5,
            border: 1,
            button_pad: 4,
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn with_handle(mut self, handle: i32) -> Self {
        self.handle = handle.max(1);
        self
    }

    #[must_use]
    pub fn with_pad(mut self, pad: i32) -> Self {
        self.pad = pad.max(0);
        self
    }

    #[must_use]
    pub fn with_gap(mut self, gap: i32) -> Self {
        self.gap = gap.max(0);
        self
    }

    #[must_use]
    pub fn with_body_min_lines(mut self, lines: i32) -> Self {
        self.body_min_lines = lines.max(1);
        self
    }
}

/// A draggable separator between splitbox children `index` and `index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitHandle {
    pub index: usize,
    pub rect: Rectangle,
}

/// A placed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub id: String,
    pub kind: NodeType,
    pub props: BTreeMap<String, String>,
    pub rect: Rectangle,
    pub children: Vec<LayoutNode>,
    /// Splitbox handles; empty for other types.
    pub handles: Vec<SplitHandle>,
}

impl LayoutNode {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Check if the node takes part in hit testing and focus navigation.
    pub fn is_focusable(&self) -> bool {
        self.kind.is_interactive() || self.get("focusable") == Some("1")
    }

    pub fn axis(&self) -> Axis {
        axis_of(self.get("dir"))
    }

    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Visit every node in document order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a LayoutNode)) {
        f(self);
        for c in &self.children {
            c.walk(f);
        }
    }
}

fn axis_of(dir: Option<&str>) -> Axis {
    match dir {
        Some("h" | "horizontal") => Axis::Horizontal,
        _ => Axis::Vertical,
    }
}

fn along(axis: Axis, p: Point) -> i32 {
    match axis {
        Axis::Vertical => p.y,
        Axis::Horizontal => p.x,
    }
}

fn across(axis: Axis, p: Point) -> i32 {
    match axis {
        Axis::Vertical => p.x,
        Axis::Horizontal => p.y,
    }
}

/// Split `total` among `weights` proportionally, conserving the sum.
///
/// Each share is the floor of its exact value plus at most one; the
/// leftover pixels go to the largest remainders, ties to the lower index.
/// All-zero weights (or a nonpositive total) give all zeros.
pub fn distribute(total: i32, weights: &[u32]) -> Vec<i32> {
    let sum: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if sum == 0 || total <= 0 {
        return vec![0; weights.len()];
    }
    let total_u = total as u64;
    let mut shares: Vec<i32> = Vec::with_capacity(weights.len());
    let mut priority: Vec<(usize, u64)> = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        let exact = total_u * u64::from(w);
        shares.push((exact / sum) as i32);
        priority.push((i, exact % sum));
    }
    let deficit = (total - shares.iter().sum::<i32>()) as usize;
    priority.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for &(i, _) in priority.iter().take(deficit) {
        shares[i] += 1;
    }
    shares
}

/// Parse a `weights=` property: comma-separated non-negative integers.
pub fn parse_weights(s: &str) -> Option<Vec<u32>> {
    s.split(',').map(|w| w.trim().parse().ok()).collect()
}

/// Format weights for a `weights=` property.
pub fn format_weights(w: &[u32]) -> String {
    w.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// Runs both layout passes over a view.
pub struct Layouter<'a> {
    metrics: &'a dyn TextMeasure,
    config: &'a LayoutConfig,
    weights: Option<&'a HashMap<String, Vec<u32>>>,
}

impl<'a> Layouter<'a> {
    pub fn new(metrics: &'a dyn TextMeasure, config: &'a LayoutConfig) -> Self {
        Self {
            metrics,
            config,
            weights: None,
        }
    }

    /// Splitbox weights that take precedence over `weights=` properties.
    #[must_use]
    pub fn with_weights(mut self, weights: &'a HashMap<String, Vec<u32>>) -> Self {
        self.weights = Some(weights);
        self
    }

    fn pad(&self, n: &ViewNode) -> i32 {
        n.get_i32("pad").unwrap_or(self.config.pad).max(0)
    }

    fn gap(&self, n: &ViewNode) -> i32 {
        n.get_i32("gap").unwrap_or(self.config.gap).max(0)
    }

    /// Flex weight: the `flex` property, else 1 for bodies and spacers.
    pub fn flex(&self, n: &ViewNode) -> u32 {
        match n.get("flex").and_then(|v| v.trim().parse().ok()) {
            Some(w) => w,
            None if matches!(n.kind, NodeType::Body | NodeType::Spacer) => 1,
            None => 0,
        }
    }

    /// Size of possibly multi-line text.
    fn text_size(&self, s: &str) -> Point {
        let lh = self.metrics.line_height();
        let mut w = 0;
        let mut lines = 0;
        for l in s.split('\n') {
            w = w.max(self.metrics.text_width(l));
            lines += 1;
        }
        Point::new(w, lh * lines)
    }

    /// Minimum size of `n`.
    pub fn measure(&self, n: &ViewNode) -> Point {
        let lh = self.metrics.line_height();
        let cfg = self.config;
        let mut size = match n.kind {
            NodeType::Text => self.text_size(n.get("text").unwrap_or("")),
            NodeType::Button => {
                let t = self.text_size(n.get("label").unwrap_or(""));
                Point::new(t.x + 2 * cfg.button_pad, t.y + 2 * cfg.border + 2)
            }
            NodeType::Checkbox => {
                let t = self.metrics.text_width(n.get("label").unwrap_or(""));
                Point::new(lh + cfg.button_pad + t, lh)
            }
            NodeType::TextBox => {
                let shown = match n.get("text") {
                    Some(t) if !t.is_empty() => t,
                    _ => n.get("placeholder").unwrap_or(""),
                };
                let t = self.metrics.text_width(shown);
                Point::new(t + 2 * (cfg.border + 2), lh + 2 * (cfg.border + 1))
            }
            NodeType::Tag => Point::new(0, lh + cfg.border),
            NodeType::Body => Point::new(0, cfg.body_min_lines * lh),
            NodeType::Spacer | NodeType::Rect => Point::ZERO,
            NodeType::Row if n.children.is_empty() => {
                self.text_size(n.get("text").unwrap_or(""))
            }
            NodeType::VBox => self.measure_line(n, Axis::Vertical, self.gap(n)),
            NodeType::HBox | NodeType::Row => self.measure_line(n, Axis::Horizontal, self.gap(n)),
            NodeType::SplitBox => {
                let axis = axis_of(n.get("dir"));
                self.measure_line(n, axis, self.config.handle)
            }
            NodeType::Stack | NodeType::Scroll => {
                let mut s = Point::ZERO;
                for c in &n.children {
                    let m = self.measure(c);
                    s = Point::new(s.x.max(m.x), s.y.max(m.y));
                }
                if n.kind == NodeType::Scroll {
                    s.y = s.y.min(lh);
                }
                s
            }
        };
        if n.kind.is_container() {
            let pad = self.pad(n);
            size = Point::new(size.x + 2 * pad, size.y + 2 * pad);
        }
        if let Some(w) = n.get_i32("w") {
            size.x = w.max(0);
        }
        if let Some(h) = n.get_i32("h") {
            size.y = h.max(0);
        }
        size
    }

    /// Children summed along `axis` with `sep` between, maxed across it.
    fn measure_line(&self, n: &ViewNode, axis: Axis, sep: i32) -> Point {
        let mut sum = 0;
        let mut cross = 0;
        for c in &n.children {
            let m = self.measure(c);
            sum += along(axis, m);
            cross = cross.max(across(axis, m));
        }
        sum += sep * (n.children.len().saturating_sub(1) as i32);
        match axis {
            Axis::Vertical => Point::new(cross, sum),
            Axis::Horizontal => Point::new(sum, cross),
        }
    }

    /// Place `root` in `r`.
    pub fn layout(&self, root: &ViewNode, r: Rectangle) -> LayoutNode {
        let mut out = LayoutNode {
            id: root.id.clone(),
            kind: root.kind,
            props: root.props.clone(),
            rect: r,
            children: Vec::with_capacity(root.children.len()),
            handles: Vec::new(),
        };
        if root.children.is_empty() {
            return out;
        }
        let inner = r.inset(self.pad(root));
        match root.kind {
            NodeType::VBox => self.place_flex(root, inner, Axis::Vertical, &mut out),
            NodeType::HBox | NodeType::Row => self.place_flex(root, inner, Axis::Horizontal, &mut out),
            NodeType::SplitBox => self.place_split(root, inner, &mut out),
            NodeType::Scroll => {
                let offset = root.get_i32("offset").unwrap_or(0);
                for c in &root.children {
                    let h = self.measure(c).y.max(inner.dy());
                    let offset = offset.clamp(0, (h - inner.dy()).max(0));
                    let cr = Rectangle::new(inner.min.x, inner.min.y - offset, inner.max.x, inner.min.y - offset + h);
                    out.children.push(self.layout(c, cr));
                }
            }
            _ => {
                for c in &root.children {
                    out.children.push(self.layout(c, inner));
                }
            }
        }
        out
    }

    /// Child rectangles along `axis` in `inner` with the given sizes and
    /// separator, clipped to `inner`.
    fn slots(inner: Rectangle, axis: Axis, sizes: &[i32], sep: i32) -> Vec<(Rectangle, Option<Rectangle>)> {
        let start = along(axis, inner.min);
        let end = along(axis, inner.max);
        let mut cursor = start;
        let mut out = Vec::with_capacity(sizes.len());
        for (i, &s) in sizes.iter().enumerate() {
            let a = cursor.min(end);
            let b = (cursor + s).min(end);
            let child = span(inner, axis, a, b);
            cursor += s;
            let sep_rect = if i + 1 < sizes.len() {
                let r = span(inner, axis, cursor.min(end), (cursor + sep).min(end));
                cursor += sep;
                Some(r)
            } else {
                None
            };
            out.push((child, sep_rect));
        }
        out
    }

    fn place_flex(&self, n: &ViewNode, inner: Rectangle, axis: Axis, out: &mut LayoutNode) {
        let gap = self.gap(n);
        let count = n.children.len();
        let total = along(axis, inner.size()) - gap * (count as i32 - 1);
        let mins: Vec<i32> = n.children.iter().map(|c| along(axis, self.measure(c))).collect();
        let weights: Vec<u32> = n.children.iter().map(|c| self.flex(c)).collect();
        let extra = total - mins.iter().sum::<i32>();
        let sizes: Vec<i32> = if weights.iter().all(|&w| w == 0) {
            mins
        } else if extra >= 0 {
            let add = distribute(extra, &weights);
            mins.iter().zip(add).map(|(m, a)| m + a).collect()
        } else {
            let cut = distribute(-extra, &weights);
            mins.iter().zip(cut).map(|(m, c)| (m - c).max(0)).collect()
        };
        for (c, (r, _)) in n.children.iter().zip(Self::slots(inner, axis, &sizes, gap)) {
            out.children.push(self.layout(c, r));
        }
    }

    /// Weights for a splitbox: the override map, else `weights=`, else
    /// equal. A list of the wrong length is ignored.
    pub fn split_weights(&self, n: &ViewNode) -> Vec<u32> {
        let count = n.children.len();
        let from_map = self
            .weights
            .and_then(|m| m.get(&n.id))
            .filter(|w| w.len() == count)
            .cloned();
        let w = from_map
            .or_else(|| n.get("weights").and_then(parse_weights).filter(|w| w.len() == count))
            .unwrap_or_else(|| vec![1; count]);
        if w.iter().all(|&x| x == 0) {
            return vec![1; count];
        }
        w
    }

    fn place_split(&self, n: &ViewNode, inner: Rectangle, out: &mut LayoutNode) {
        let axis = axis_of(n.get("dir"));
        let count = n.children.len();
        let handle = self.config.handle;
        let avail = (along(axis, inner.size()) - handle * (count as i32 - 1)).max(0);
        let sizes = distribute(avail, &self.split_weights(n));
        for (i, (c, (r, h))) in n
            .children
            .iter()
            .zip(Self::slots(inner, axis, &sizes, handle))
            .enumerate()
        {
            out.children.push(self.layout(c, r));
            if let Some(rect) = h {
                out.handles.push(SplitHandle { index: i, rect });
            }
        }
    }
}

fn span(inner: Rectangle, axis: Axis, a: i32, b: i32) -> Rectangle {
    match axis {
        Axis::Vertical => Rectangle::new(inner.min.x, a, inner.max.x, b),
        Axis::Horizontal => Rectangle::new(a, inner.min.y, b, inner.max.y),
    }
}

/// New weights after dragging handle `index` of `split` to `p`.
///
/// Every child's weight becomes its current size along the split axis;
/// the two children flanking the handle then trade pixels so the handle
/// starts at `p`, within the room the pair already occupies.
pub fn drag_weights(split: &LayoutNode, index: usize, p: Point) -> Vec<u32> {
    let axis = split.axis();
    let mut sizes: Vec<i32> = split
        .children
        .iter()
        .map(|c| along(axis, c.rect.size()).max(0))
        .collect();
    if index + 1 < sizes.len() {
        let pair = sizes[index] + sizes[index + 1];
        let first = (along(axis, p) - along(axis, split.children[index].rect.min)).clamp(0, pair);
        sizes[index] = first;
        sizes[index + 1] = pair - first;
    }
    sizes.into_iter().map(|s| s as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Axis, body, button, hbox, spacer, splitbox, tag, text, vbox};
    use proptest::prelude::*;

    const M: FixedMeasure = FixedMeasure {
        advance: 8,
        height: 10,
    };

    fn lay(root: &ViewNode, r: Rectangle) -> LayoutNode {
        let cfg = LayoutConfig::default();
        Layouter::new(&M, &cfg).layout(root, r)
    }

    #[test]
    fn distribute_conserves_and_prefers_low_index() {
        assert_eq!(distribute(197, &[1, 1]), vec![99, 98]);
        assert_eq!(distribute(10, &[1, 2, 2]), vec![2, 4, 4]);
        assert_eq!(distribute(7, &[0, 0]), vec![0, 0]);
        assert_eq!(distribute(-3, &[1]), vec![0]);
        assert_eq!(distribute(197, &[50, 147]), vec![50, 147]);
    }

    #[test]
    fn measures_by_type() {
        let cfg = LayoutConfig::default();
        let l = Layouter::new(&M, &cfg);
        assert_eq!(l.measure(&text("t", "abc")), Point::new(24, 10));
        assert_eq!(l.measure(&text("t", "ab\nabcd")), Point::new(32, 20));
        assert_eq!(l.measure(&button("b", "OK", "ok")), Point::new(24, 14));
        assert_eq!(l.measure(&body("b")), Point::new(0, 50));
        assert_eq!(l.measure(&tag("t", "New")), Point::new(0, 11));
        let row = hbox("h", [text("a", "ab"), text("b", "abc")]).gap(2).pad(1);
        assert_eq!(l.measure(&row), Point::new(16 + 2 + 24 + 2, 12));
    }

    #[test]
    fn vbox_gives_leftover_to_flex_children() {
        let root = vbox("r", [tag("t", "New Del"), body("b")]);
        let out = lay(&root, Rectangle::new(0, 0, 100, 200));
        assert_eq!(out.children[0].rect, Rectangle::new(0, 0, 100, 11));
        assert_eq!(out.children[1].rect, Rectangle::new(0, 11, 100, 200));
    }

    #[test]
    fn flex_weights_split_proportionally() {
        let root = hbox("r", [spacer("a").flex(1), spacer("b").flex(3)]);
        let out = lay(&root, Rectangle::new(0, 0, 100, 10));
        assert_eq!(out.children[0].rect.dx(), 25);
        assert_eq!(out.children[1].rect.dx(), 75);
    }

    #[test]
    fn no_flex_children_leaves_slack() {
        let root = vbox("r", [text("a", "x"), text("b", "y")]);
        let out = lay(&root, Rectangle::new(0, 0, 50, 100));
        assert_eq!(out.children[1].rect, Rectangle::new(0, 10, 50, 20));
    }

    #[test]
    fn overflow_is_clipped_to_the_container() {
        let root = vbox("r", [body("a"), body("b")]);
        let out = lay(&root, Rectangle::new(0, 0, 50, 60));
        for c in &out.children {
            assert!(out.rect.contains_rect(&c.rect));
        }
        let total: i32 = out.children.iter().map(|c| c.rect.dy()).sum();
        assert_eq!(total, 60);
    }

    #[test]
    fn splitbox_places_handles() {
        let root = splitbox("s", Axis::Vertical, [body("top"), body("bot")]);
        let out = lay(&root, Rectangle::new(0, 0, 100, 200));
        assert_eq!(out.children[0].rect, Rectangle::new(0, 0, 100, 99));
        assert_eq!(out.handles, vec![SplitHandle { index: 0, rect: Rectangle::new(0, 99, 100, 102) }]);
        assert_eq!(out.children[1].rect, Rectangle::new(0, 102, 100, 200));
    }

    #[test]
    fn splitbox_weights_prop_and_override() {
        let root = splitbox("s", Axis::Horizontal, [body("a"), body("b")]).prop("weights", "1,3");
        let out = lay(&root, Rectangle::new(0, 0, 103, 50));
        assert_eq!(out.children[0].rect.dx(), 25);
        let cfg = LayoutConfig::default();
        let mut w = HashMap::new();
        w.insert("s".to_string(), vec![3, 1]);
        let out = Layouter::new(&M, &cfg)
            .with_weights(&w)
            .layout(&root, Rectangle::new(0, 0, 103, 50));
        assert_eq!(out.children[0].rect.dx(), 75);
    }

    #[test]
    fn dragging_a_handle_resizes_the_pair() {
        let root = splitbox("s", Axis::Vertical, [body("top"), body("bot")]);
        let r = Rectangle::new(0, 0, 100, 200);
        let out = lay(&root, r);
        let w = drag_weights(&out, 0, Point::new(10, 50));
        assert_eq!(w, vec![50, 147]);
        let mut map = HashMap::new();
        map.insert("s".to_string(), w);
        let cfg = LayoutConfig::default();
        let out = Layouter::new(&M, &cfg).with_weights(&map).layout(&root, r);
        assert_eq!(out.children[0].rect.dy(), 50);
        // dragging past the pair clamps
        assert_eq!(drag_weights(&out, 0, Point::new(0, 500)), vec![197, 0]);
    }

    #[test]
    fn weights_text_round_trip() {
        assert_eq!(parse_weights("1, 2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_weights("1,x"), None);
        assert_eq!(format_weights(&[50, 147]), "50,147");
    }

    proptest! {
        #[test]
        fn flex_axis_is_conserved(
            fixed in proptest::collection::vec(0i32..30, 0..5),
            pad in 0i32..6,
            gap in 0i32..6,
            extra in 0i32..200,
        ) {
            let n = fixed.len() as i32 + 1;
            let mut kids: Vec<ViewNode> = fixed
                .iter()
                .enumerate()
                .map(|(i, h)| spacer(format!("f{i}")).flex(0).size(10, *h))
                .collect();
            kids.push(body("b").flex(1).size(10, 0));
            let root = vbox("r", kids).pad(pad).gap(gap);
            let height = 2 * pad + gap * (n - 1) + fixed.iter().sum::<i32>() + extra;
            let out = lay(&root, Rectangle::new(0, 0, 40, height));
            let sum: i32 = out.children.iter().map(|c| c.rect.dy()).sum();
            prop_assert_eq!(sum + gap * (n - 1) + 2 * pad, height);
        }

        #[test]
        fn distribute_is_exact(total in 0i32..10_000, weights in proptest::collection::vec(0u32..50, 1..8)) {
            let shares = distribute(total, &weights);
            if weights.iter().any(|&w| w > 0) {
                prop_assert_eq!(shares.iter().sum::<i32>(), total);
            }
            prop_assert!(shares.iter().all(|&s| s >= 0));
        }
    }
}
