#![forbid(unsafe_code)]

//! Painting a laid-out view onto the screen.
//!
//! The [`Renderer`] owns everything that lives only on the UI thread: the
//! solid-color palette, one [`DisplayFrame`] per body and tag, the splitbox
//! weights set by dragging, the last layout (for hit testing), and the
//! hover target. Each [`render`](Renderer::render) lays the current view out
//! again and repaints all of it; frames reload from their buffers only when
//! the buffer's sequence number moved.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use nui_core::event::Mouse;
use nui_core::geometry::{Point, Rectangle};
use nui_draw::{Color, Display, DrawConn, DrawResult, Font, Image, Pix};
use nui_layout::{LayoutConfig, LayoutNode, Layouter, NodeType};
use nui_text::{DisplayFrame, FrameColors, MouseSource, word_at};

use crate::buffers::{BufferKind, SharedSlot, TextSlot, lock_slot};
use crate::core::UiCore;

/// Colors for everything that is not a text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub back: Color,
    pub text: Color,
    pub placeholder: Color,
    pub border: Color,
    pub button: Color,
    pub hover: Color,
    pub focus: Color,
    pub check: Color,
    pub field: Color,
    pub handle: Color,
    pub selected_row: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            back: Color::WHITE,
            text: Color::BLACK,
            placeholder: Color(0x8888_88FF),
            border: Color::PURPLE_BLUE,
            button: Color::PALE_GREY_GREEN,
            hover: Color::PALE_BLUE_GREEN,
            focus: Color::DARK_BLUE,
            check: Color::DARK_GREEN,
            field: Color::WHITE,
            handle: Color::YELLOW_GREEN,
            selected_row: Color::PALE_YELLOW,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames over buffers
// ─────────────────────────────────────────────────────────────────────────────

/// Where a frame should start showing `runes` after scrolling `lines`
/// display lines from `org`. Negative counts scroll toward the start.
pub fn scroll_origin(frame: &DisplayFrame, runes: &[char], org: usize, lines: i32) -> usize {
    let org = org.min(runes.len());
    if lines < 0 {
        let mut q = org;
        for _ in 0..lines.unsigned_abs() {
            if q == 0 {
                break;
            }
            let mut ls = q - 1;
            while ls > 0 && runes[ls - 1] != '\n' {
                ls -= 1;
            }
            // every start lies before q, the last is the previous display line
            q = ls + frame.wrap_starts(&runes[ls..q]).last().copied().unwrap_or(0);
        }
        return q;
    }
    if lines == 0 {
        return org;
    }
    let n = lines as usize;
    let r = frame.r();
    let h = frame.line_height();
    let shown = frame.nlines();
    let line_start = |i: usize| org + frame.char_of_pt(Point::new(r.min.x, r.min.y + i as i32 * h));
    if n < shown {
        line_start(n)
    } else if org + frame.nchars() < runes.len() {
        org + frame.nchars()
    } else if shown > 1 {
        line_start(shown - 1)
    } else {
        org
    }
}

/// A frame and the buffer offset of its first displayed rune.
pub struct FrameView {
    kind: BufferKind,
    frame: DisplayFrame,
    org: usize,
}

impl fmt::Debug for FrameView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameView")
            .field("kind", &self.kind)
            .field("org", &self.org)
            .field("frame", &self.frame)
            .finish()
    }
}

impl FrameView {
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn frame(&self) -> &DisplayFrame {
        &self.frame
    }

    /// Buffer offset of the first displayed rune.
    pub fn org(&self) -> usize {
        self.org
    }

    /// Buffer offset of the rune under `p`.
    pub fn offset_at(&self, p: Point) -> usize {
        self.org + self.frame.char_of_pt(p)
    }

    fn is_current(&self, slot: &TextSlot) -> bool {
        self.frame.loaded_seq() == Some(slot.text.seq())
    }

    /// Refill from the buffer at the current origin.
    fn reload(&mut self, slot: &TextSlot) -> DrawResult<()> {
        let runes = slot.text.runes();
        self.org = self.org.min(runes.len());
        self.frame.fill(&runes[self.org..])?;
        self.show_selection(slot)?;
        self.frame.set_loaded_seq(Some(slot.text.seq()));
        Ok(())
    }

    fn show_selection(&mut self, slot: &TextSlot) -> DrawResult<()> {
        let (q0, q1) = slot.selection();
        let n = self.frame.nchars();
        let p0 = q0.saturating_sub(self.org).min(n);
        let p1 = q1.saturating_sub(self.org).min(n);
        self.frame.set_selection(p0, p1)
    }

    /// Pull runes from below into space freed by a deletion.
    fn refill_tail(&mut self, slot: &TextSlot) -> DrawResult<()> {
        let runes = slot.text.runes();
        let end = self.org + self.frame.nchars();
        if end < runes.len() && !self.frame.is_full() {
            self.frame.insert(&runes[end..], self.frame.nchars())?;
        }
        Ok(())
    }

    fn caret_visible(&self, q: usize) -> bool {
        let end = self.org + self.frame.nchars();
        q >= self.org && (q < end || (q == end && !self.frame.is_full()))
    }

    /// Scroll until the start of the selection is on screen.
    fn reveal_caret(&mut self, slot: &TextSlot) -> DrawResult<()> {
        let (q0, _) = slot.selection();
        if q0 < self.org {
            let runes = slot.text.runes();
            let mut q = q0;
            while q > 0 && runes[q - 1] != '\n' {
                q -= 1;
            }
            self.org = q;
            return self.reload(slot);
        }
        while !self.caret_visible(q0) {
            if self.scroll(slot, 1)? == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Scroll by `lines`, returning how far the origin moved.
    fn scroll(&mut self, slot: &TextSlot, lines: i32) -> DrawResult<i64> {
        let next = scroll_origin(&self.frame, slot.text.runes(), self.org, lines);
        if next == self.org {
            return Ok(0);
        }
        let moved = next as i64 - self.org as i64;
        self.org = next;
        self.reload(slot)?;
        Ok(moved)
    }

    fn type_runes(&mut self, slot: &mut TextSlot, runes: &[char]) -> DrawResult<()> {
        let (q0, q1) = slot.selection();
        let stale = !self.is_current(slot);
        slot.type_runes(runes);
        let n = self.frame.nchars();
        if stale || q0 < self.org || q0 > self.org + n {
            self.reload(slot)?;
        } else {
            let p0 = q0 - self.org;
            self.frame.delete(p0, (q1 - self.org).min(n))?;
            self.frame.insert(runes, p0)?;
            self.refill_tail(slot)?;
            self.show_selection(slot)?;
            self.frame.set_loaded_seq(Some(slot.text.seq()));
        }
        self.reveal_caret(slot)
    }

    fn backspace(&mut self, slot: &mut TextSlot) -> DrawResult<()> {
        let (_, q1) = slot.selection();
        let stale = !self.is_current(slot);
        slot.backspace();
        // the removed runes were [a, q1)
        let (a, _) = slot.selection();
        if a == q1 {
            return Ok(());
        }
        let n = self.frame.nchars();
        if stale || a < self.org || a > self.org + n {
            self.reload(slot)?;
        } else {
            self.frame.delete(a - self.org, (q1 - self.org).min(n))?;
            self.refill_tail(slot)?;
            self.show_selection(slot)?;
            self.frame.set_loaded_seq(Some(slot.text.seq()));
        }
        self.reveal_caret(slot)
    }

    fn move_caret(&mut self, slot: &mut TextSlot, forward: bool) -> DrawResult<()> {
        let (q0, q1) = slot.selection();
        let q = match (forward, q0 == q1) {
            (true, true) => q1 + 1,
            (true, false) => q1,
            (false, true) => q0.saturating_sub(1),
            (false, false) => q0,
        };
        slot.select(q, q);
        if !self.is_current(slot) {
            self.reload(slot)?;
        }
        self.show_selection(slot)?;
        self.reveal_caret(slot)
    }

    /// Track a B1 sweep, scrolling when the pointer leaves the frame, and
    /// store the result as the buffer's selection.
    fn select(&mut self, slot: &SharedSlot, m: Mouse, mice: &mut dyn MouseSource) -> DrawResult<(usize, usize)> {
        let runes: Vec<char> = {
            let s = lock_slot(slot);
            if !self.is_current(&s) {
                self.reload(&s)?;
            }
            s.text.runes().to_vec()
        };
        let start = self.org;
        let (frame, org) = (&mut self.frame, &mut self.org);
        let mut scroll = |f: &mut DisplayFrame, lines: i32| -> i64 {
            let next = scroll_origin(f, &runes, *org, lines);
            if next == *org {
                return 0;
            }
            if let Err(err) = f.fill(&runes[next..]) {
                warn!(error = %err, "render: refill during select failed");
                return 0;
            }
            let moved = next as i64 - *org as i64;
            *org = next;
            moved
        };
        let out = frame.select_with(m, mice, &mut scroll)?;
        let (a, b) = out.range();
        let clamp = |v: i64| (start as i64 + v).clamp(0, runes.len() as i64) as usize;
        let (q0, q1) = (clamp(a), clamp(b));
        let mut s = lock_slot(slot);
        s.select(q0, q1);
        if !self.is_current(&s) {
            self.reload(&s)?;
        }
        Ok(s.selection())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Paints the current view. See the module documentation.
pub struct Renderer {
    screen: Image,
    conn: DrawConn,
    font: Arc<Font>,
    config: LayoutConfig,
    theme: Theme,
    palette: HashMap<Color, Image>,
    body_colors: FrameColors,
    tag_colors: FrameColors,
    frames: HashMap<String, FrameView>,
    weights: HashMap<String, Vec<u32>>,
    layout: Option<LayoutNode>,
    hover: Option<String>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("screen", &self.screen.r)
            .field("frames", &self.frames.len())
            .field("weights", &self.weights)
            .field("hover", &self.hover)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// A renderer painting on `display`'s screen image with `font`.
    pub fn new(display: &Display, font: Arc<Font>) -> DrawResult<Self> {
        let conn = display.conn().clone();
        Ok(Self {
            screen: display.image.share(),
            body_colors: FrameColors::body(&conn)?,
            tag_colors: FrameColors::tag(&conn)?,
            conn,
            font,
            config: LayoutConfig::default(),
            theme: Theme::default(),
            palette: HashMap::new(),
            frames: HashMap::new(),
            weights: HashMap::new(),
            layout: None,
            hover: None,
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The screen rectangle.
    pub fn bounds(&self) -> Rectangle {
        self.screen.r
    }

    /// The layout of the last render.
    pub fn layout(&self) -> Option<&LayoutNode> {
        self.layout.as_ref()
    }

    /// Splitbox weights set by dragging, by splitbox id.
    pub fn weights(&self) -> &HashMap<String, Vec<u32>> {
        &self.weights
    }

    pub fn set_weights(&mut self, split: &str, weights: Vec<u32>) {
        self.weights.insert(split.to_string(), weights);
    }

    pub fn hover(&self) -> Option<&str> {
        self.hover.as_deref()
    }

    /// Change the hover target. Returns whether it changed.
    pub fn set_hover(&mut self, id: Option<String>) -> bool {
        if self.hover == id {
            return false;
        }
        self.hover = id;
        true
    }

    pub fn frame(&self, id: &str) -> Option<&FrameView> {
        self.frames.get(id)
    }

    /// Follow a resized screen. Frames are rebuilt on the next render.
    pub fn resize(&mut self, display: &Display) {
        self.screen = display.image.share();
        self.frames.clear();
        self.layout = None;
    }

    pub fn flush(&self) -> DrawResult<()> {
        self.conn.flush(true)
    }

    /// Lay out and repaint the whole view over the screen.
    pub fn render(&mut self, core: &UiCore) -> DrawResult<()> {
        self.render_in(core, self.screen.r)
    }

    /// Lay out and repaint the whole view over `r`.
    pub fn render_in(&mut self, core: &UiCore, r: Rectangle) -> DrawResult<()> {
        let view = core.view();
        let focus = core.focus();
        let layout = Layouter::new(&*self.font, &self.config)
            .with_weights(&self.weights)
            .layout(&view, r);
        let back = self.theme.back;
        self.fill(r, back)?;
        let mut live = HashSet::new();
        self.paint(&layout, core, focus.as_deref(), r, &mut live)?;
        self.frames.retain(|id, _| live.contains(id));
        self.layout = Some(layout);
        self.flush()
    }

    /// Release the palette and frame colors.
    pub fn free(&mut self) -> DrawResult<()> {
        self.frames.clear();
        for (_, mut img) in self.palette.drain() {
            img.free()?;
        }
        self.body_colors.free()?;
        self.tag_colors.free()
    }

    // ── painting ─────────────────────────────────────────────────────────

    fn color(&mut self, c: Color) -> DrawResult<&Image> {
        if !self.palette.contains_key(&c) {
            let pix = if c.alpha() == 0xFF { Pix::RGB24 } else { Pix::RGBA32 };
            let img = self.conn.alloc_image(Rectangle::new(0, 0, 1, 1), pix, true, c)?;
            self.palette.insert(c, img);
        }
        Ok(&self.palette[&c])
    }

    fn fill(&mut self, r: Rectangle, c: Color) -> DrawResult<()> {
        self.color(c)?;
        self.screen.draw(r, &self.palette[&c], None, Point::ZERO)
    }

    fn outline(&mut self, r: Rectangle, width: i32, c: Color) -> DrawResult<()> {
        self.color(c)?;
        self.screen.border(r, width, &self.palette[&c], Point::ZERO)
    }

    fn text(&mut self, pt: Point, s: &str, c: Color) -> DrawResult<Point> {
        self.color(c)?;
        self.screen.string(pt, &self.palette[&c], Point::ZERO, &self.font, s)
    }

    fn text_lines(&mut self, pt: Point, s: &str, c: Color) -> DrawResult<()> {
        let lh = self.font.height;
        for (i, line) in s.split('\n').enumerate() {
            self.text(Point::new(pt.x, pt.y + i as i32 * lh), line, c)?;
        }
        Ok(())
    }

    fn paint(
        &mut self,
        n: &LayoutNode,
        core: &UiCore,
        focus: Option<&str>,
        clip: Rectangle,
        live: &mut HashSet<String>,
    ) -> DrawResult<()> {
        let mut vis = n.rect;
        if !vis.clip(&clip) {
            return Ok(());
        }
        let th = self.theme;
        let focused = focus == Some(n.id.as_str());
        let lh = self.font.height;
        let border = self.config.border;
        let edge = if focused { th.focus } else { th.border };
        match n.kind {
            NodeType::Rect => {
                let c = n.get("color").and_then(Color::parse).unwrap_or(th.border);
                self.fill(vis, c)?;
            }
            NodeType::Text => self.text_lines(n.rect.min, n.get("text").unwrap_or(""), th.text)?,
            NodeType::Button => {
                let bg = if self.hover.as_deref() == Some(n.id.as_str()) {
                    th.hover
                } else {
                    th.button
                };
                self.fill(vis, bg)?;
                self.outline(n.rect, if focused { 2 } else { border }, edge)?;
                let at = Point::new(n.rect.min.x + self.config.button_pad, n.rect.min.y + 2);
                self.text(at, n.get("label").unwrap_or(""), th.text)?;
            }
            NodeType::Checkbox => {
                let bx = Rectangle::with_size(n.rect.min, lh, lh);
                self.fill(bx, th.field)?;
                self.outline(bx, border, edge)?;
                if n.get("checked") == Some("1") {
                    self.fill(bx.inset(3), th.check)?;
                }
                let at = Point::new(n.rect.min.x + lh + self.config.button_pad, n.rect.min.y);
                self.text(at, n.get("label").unwrap_or(""), th.text)?;
            }
            NodeType::TextBox => {
                self.fill(vis, th.field)?;
                self.outline(n.rect, border, edge)?;
                let at = Point::new(n.rect.min.x + border + 2, n.rect.min.y + border + 1);
                let end = match n.get("text") {
                    Some(t) if !t.is_empty() => self.text(at, t, th.text)?,
                    _ => {
                        self.text(at, n.get("placeholder").unwrap_or(""), th.placeholder)?;
                        at
                    }
                };
                if focused {
                    self.fill(Rectangle::new(end.x, at.y, end.x + 1, at.y + lh), th.text)?;
                }
            }
            NodeType::Tag | NodeType::Body => {
                live.insert(n.id.clone());
                self.paint_frame(n, core, focused)?;
            }
            NodeType::Row => {
                if n.get("selected") == Some("1") {
                    self.fill(vis, th.selected_row)?;
                }
                if n.children.is_empty() {
                    self.text_lines(n.rect.min, n.get("text").unwrap_or(""), th.text)?;
                }
                if focused {
                    self.outline(n.rect, border, th.focus)?;
                }
            }
            _ => {}
        }

        let scrolled = n.kind == NodeType::Scroll;
        let saved = self.screen.clipr;
        let inner = if scrolled {
            self.screen.replclipr(false, vis)?;
            vis
        } else {
            clip
        };
        for c in &n.children {
            self.paint(c, core, focus, inner, live)?;
        }
        for h in &n.handles {
            self.fill(h.rect, th.handle)?;
        }
        if scrolled {
            self.screen.replclipr(false, saved)?;
        }
        Ok(())
    }

    fn paint_frame(&mut self, n: &LayoutNode, core: &UiCore, focused: bool) -> DrawResult<()> {
        let Some(kind) = BufferKind::of_node(n.kind) else {
            return Ok(());
        };
        let slot = core.buffers().ensure(kind, &n.id, n.get("text").unwrap_or(""));
        let mut r = n.rect;
        if kind == BufferKind::Tag {
            let b = self.config.border;
            let line = Rectangle::new(r.min.x, r.max.y - b, r.max.x, r.max.y);
            self.screen.draw(line, &self.tag_colors.bord, None, Point::ZERO)?;
            r.max.y -= b;
        }
        if !self.frames.contains_key(&n.id) {
            let colors = match kind {
                BufferKind::Body => self.body_colors.share(),
                BufferKind::Tag => self.tag_colors.share(),
            };
            let frame = DisplayFrame::new(r, self.font.clone(), self.screen.share(), colors)?;
            debug!(id = %n.id, ?kind, "render: frame created");
            self.frames.insert(n.id.clone(), FrameView { kind, frame, org: 0 });
        }
        let Some(view) = self.frames.get_mut(&n.id) else {
            return Ok(());
        };
        let s = lock_slot(&slot);
        if view.frame.r() != r {
            view.frame.set_rect(r)?;
            view.reload(&s)?;
        } else if !view.is_current(&s) {
            view.reload(&s)?;
        } else {
            view.frame.redraw()?;
        }
        drop(s);
        view.frame.set_focused(focused)
    }

    // ── editing ──────────────────────────────────────────────────────────

    fn target(&mut self, core: &UiCore, id: &str) -> Option<(&mut FrameView, SharedSlot)> {
        let view = self.frames.get_mut(id)?;
        let slot = core.buffers().get(view.kind, id)?;
        Some((view, slot))
    }

    /// Run a B1 selection sweep in the frame `id`. Returns the new buffer
    /// selection.
    pub fn select(
        &mut self,
        core: &UiCore,
        id: &str,
        m: Mouse,
        mice: &mut dyn MouseSource,
    ) -> DrawResult<Option<(usize, usize)>> {
        let Some((view, slot)) = self.target(core, id) else {
            return Ok(None);
        };
        view.select(&slot, m, mice).map(Some)
    }

    /// Type `runes` into the frame `id`, replacing its selection.
    pub fn type_runes(&mut self, core: &UiCore, id: &str, runes: &[char]) -> DrawResult<bool> {
        let Some((view, slot)) = self.target(core, id) else {
            return Ok(false);
        };
        let mut s = lock_slot(&slot);
        view.type_runes(&mut s, runes)?;
        Ok(true)
    }

    pub fn backspace(&mut self, core: &UiCore, id: &str) -> DrawResult<bool> {
        let Some((view, slot)) = self.target(core, id) else {
            return Ok(false);
        };
        let mut s = lock_slot(&slot);
        view.backspace(&mut s)?;
        Ok(true)
    }

    /// Move the caret one rune. A non-empty selection collapses to the
    /// end it moves toward.
    pub fn move_caret(&mut self, core: &UiCore, id: &str, forward: bool) -> DrawResult<bool> {
        let Some((view, slot)) = self.target(core, id) else {
            return Ok(false);
        };
        let mut s = lock_slot(&slot);
        view.move_caret(&mut s, forward)?;
        Ok(true)
    }

    /// Scroll the frame `id` by `lines`. Returns the new origin.
    pub fn scroll(&mut self, core: &UiCore, id: &str, lines: i32) -> DrawResult<Option<usize>> {
        let Some((view, slot)) = self.target(core, id) else {
            return Ok(None);
        };
        let s = lock_slot(&slot);
        if !view.is_current(&s) {
            view.reload(&s)?;
        }
        view.scroll(&s, lines)?;
        Ok(Some(view.org))
    }

    /// The word under `p` in the frame `id`.
    pub fn word_at(&self, core: &UiCore, id: &str, p: Point) -> Option<String> {
        let view = self.frames.get(id)?;
        let slot = core.buffers().get(view.kind, id)?;
        let s = lock_slot(&slot);
        let (a, b) = word_at(s.text.runes(), view.offset_at(p))?;
        Some(s.text.read_range(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runes(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// 80x30 frame: ten 8-pixel cells per line, three 10-pixel lines.
    fn frame(text: &str) -> DisplayFrame {
        let font = Arc::new(Font::default_font(None).unwrap());
        let r = Rectangle::new(0, 0, 80, 30);
        let dst = Image::detached(r, Pix::XRGB32, false);
        let mut f = DisplayFrame::new(r, font, dst, FrameColors::detached()).unwrap();
        f.fill(&runes(text)).unwrap();
        f
    }

    #[test]
    fn scrolls_forward_by_displayed_lines() {
        let text = runes("one\ntwo\nthree\nfour\nfive");
        let f = frame("one\ntwo\nthree\nfour\nfive");
        assert_eq!(scroll_origin(&f, &text, 0, 1), 4);
        assert_eq!(scroll_origin(&f, &text, 0, 2), 8);
        // past the displayed lines: the next undisplayed rune
        assert_eq!(scroll_origin(&f, &text, 0, 5), 14);
        assert_eq!(scroll_origin(&f, &text, 0, 0), 0);
    }

    #[test]
    fn scrolls_back_over_line_starts() {
        let text = runes("one\ntwo\nthree\nfour");
        let f = frame("four");
        assert_eq!(scroll_origin(&f, &text, 14, -1), 8);
        assert_eq!(scroll_origin(&f, &text, 14, -2), 4);
        assert_eq!(scroll_origin(&f, &text, 14, -9), 0);
        assert_eq!(scroll_origin(&f, &text, 0, -1), 0);
    }

    #[test]
    fn scrolling_back_steps_through_wrapped_lines() {
        let text = runes("abcdefghijklmnopqrstuvwxy\nz");
        let f = frame("abcdefghijklmnopqrstuvwxy\nz");
        assert_eq!(scroll_origin(&f, &text, 0, 1), 10);
        assert_eq!(scroll_origin(&f, &text, 10, -1), 0);
        assert_eq!(scroll_origin(&f, &text, 26, -1), 20);
        assert_eq!(scroll_origin(&f, &text, 26, -2), 10);
        assert_eq!(scroll_origin(&f, &text, 26, -3), 0);
        // from the middle of a display line, back to its start first
        assert_eq!(scroll_origin(&f, &text, 15, -1), 10);
    }

    #[test]
    fn short_text_does_not_scroll_past_its_last_line() {
        let text = runes("ab\ncd");
        let f = frame("ab\ncd");
        assert_eq!(scroll_origin(&f, &text, 0, 4), 3);
    }

    #[test]
    fn default_theme_is_opaque() {
        let th = Theme::default();
        for c in [th.back, th.text, th.border, th.button, th.focus, th.handle] {
            assert_eq!(c.alpha(), 0xFF);
        }
    }
}
