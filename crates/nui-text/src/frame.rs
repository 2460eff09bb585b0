//! Line-wrapping display of a rune sequence.
//!
//! A [`DisplayFrame`] shows as much of a rune sequence as fits in its
//! rectangle. Runes wrap at the right edge and after `\n`; whatever would
//! land below the last full line is dropped rather than scrolled, so the
//! owner decides what the frame shows by choosing where to start feeding it.
//!
//! Offsets handed to and returned from a frame are relative to the first
//! rune it displays. The selection `[p0, p1)` always satisfies
//! `p0 <= p1 <= nchars`.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use nui_core::event::Mouse;
use nui_core::geometry::{Point, Rectangle};
use nui_draw::{Color, DrawConn, DrawResult, Font, Image, Pix};

/// Tab stops are this many digit widths apart.
const TAB_DIGITS: i32 = 8;

/// Something that yields mouse states while a button is held.
pub trait MouseSource {
    /// The next mouse state, or `None` when the source is exhausted.
    fn next_mouse(&mut self) -> Option<Mouse>;
}

impl<I: Iterator<Item = Mouse>> MouseSource for I {
    fn next_mouse(&mut self) -> Option<Mouse> {
        self.next()
    }
}

/// Scroll callback used during selection.
///
/// Receives the frame and a signed line count (negative scrolls toward the
/// start). Returns how many runes the frame's origin moved, negative when
/// it moved back; the callback is responsible for refilling the frame.
pub type ScrollFn = Box<dyn FnMut(&mut DisplayFrame, i32) -> i64 + Send>;

/// The images a frame paints with.
#[derive(Debug)]
pub struct FrameColors {
    pub back: Image,
    pub high: Image,
    pub bord: Image,
    pub text: Image,
    pub htext: Image,
}

impl FrameColors {
    /// Allocate one replicated pixel per color.
    pub fn alloc(
        conn: &DrawConn,
        back: Color,
        high: Color,
        bord: Color,
        text: Color,
        htext: Color,
    ) -> DrawResult<Self> {
        let pixel = |c: Color| conn.alloc_image(Rectangle::new(0, 0, 1, 1), Pix::RGB24, true, c);
        Ok(Self {
            back: pixel(back)?,
            high: pixel(high)?,
            bord: pixel(bord)?,
            text: pixel(text)?,
            htext: pixel(htext)?,
        })
    }

    /// Pale yellow body colors.
    pub fn body(conn: &DrawConn) -> DrawResult<Self> {
        Self::alloc(
            conn,
            Color::PALE_YELLOW,
            Color::DARK_YELLOW,
            Color::YELLOW_GREEN,
            Color::BLACK,
            Color::BLACK,
        )
    }

    /// Pale blue-green tag colors.
    pub fn tag(conn: &DrawConn) -> DrawResult<Self> {
        Self::alloc(
            conn,
            Color::PALE_BLUE_GREEN,
            Color::PALE_GREY_GREEN,
            Color::PURPLE_BLUE,
            Color::BLACK,
            Color::BLACK,
        )
    }

    /// Colors that paint nothing, for frames used only for layout.
    pub fn detached() -> Self {
        let pixel = || Image::detached(Rectangle::new(0, 0, 1, 1), Pix::RGB24, true);
        Self {
            back: pixel(),
            high: pixel(),
            bord: pixel(),
            text: pixel(),
            htext: pixel(),
        }
    }

    /// Handles on the same server images.
    pub fn share(&self) -> Self {
        Self {
            back: self.back.share(),
            high: self.high.share(),
            bord: self.bord.share(),
            text: self.text.share(),
            htext: self.htext.share(),
        }
    }

    pub fn free(&mut self) -> DrawResult<()> {
        self.back.free()?;
        self.high.free()?;
        self.bord.free()?;
        self.text.free()?;
        self.htext.free()
    }
}

/// Result of an interactive selection.
///
/// Both ends are rune offsets relative to the frame origin at the moment
/// the selection started; scrolling during the drag can carry `head`
/// outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOutcome {
    pub anchor: i64,
    pub head: i64,
}

impl SelectOutcome {
    /// The selection as an ordered pair.
    pub fn range(&self) -> (i64, i64) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }
}

/// A line-wrapped view of a prefix of some rune sequence.
pub struct DisplayFrame {
    r: Rectangle,
    font: Arc<Font>,
    dst: Image,
    cols: FrameColors,
    text: Vec<char>,
    /// Top-left of every displayed rune, plus the end position.
    pts: Vec<Point>,
    widths: Vec<i32>,
    p0: usize,
    p1: usize,
    focused: bool,
    loaded_seq: Option<u64>,
    scroll: Option<ScrollFn>,
}

impl fmt::Debug for DisplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayFrame")
            .field("r", &self.r)
            .field("nchars", &self.text.len())
            .field("p0", &self.p0)
            .field("p1", &self.p1)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl DisplayFrame {
    /// Create an empty frame over `r` in `dst` and clear its region.
    pub fn new(r: Rectangle, font: Arc<Font>, dst: Image, cols: FrameColors) -> DrawResult<Self> {
        let mut f = Self {
            r,
            font,
            dst,
            cols,
            text: Vec::new(),
            pts: Vec::new(),
            widths: Vec::new(),
            p0: 0,
            p1: 0,
            focused: false,
            loaded_seq: None,
            scroll: None,
        };
        f.relayout();
        f.dst.draw(f.r, &f.cols.back, None, Point::ZERO)?;
        Ok(f)
    }

    #[inline]
    pub fn r(&self) -> Rectangle {
        self.r
    }

    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn colors(&self) -> &FrameColors {
        &self.cols
    }

    /// Number of runes displayed.
    #[inline]
    pub fn nchars(&self) -> usize {
        self.text.len()
    }

    /// The displayed runes.
    pub fn text(&self) -> &[char] {
        &self.text
    }

    #[inline]
    pub fn p0(&self) -> usize {
        self.p0
    }

    #[inline]
    pub fn p1(&self) -> usize {
        self.p1
    }

    pub fn line_height(&self) -> i32 {
        self.font.height.max(1)
    }

    /// Lines that fit in the rectangle.
    pub fn maxlines(&self) -> usize {
        (self.r.dy().max(0) / self.line_height()) as usize
    }

    /// Lines holding at least one rune.
    pub fn nlines(&self) -> usize {
        match self.pts[..self.text.len()].last() {
            Some(pt) => ((pt.y - self.r.min.y) / self.line_height() + 1) as usize,
            None => 0,
        }
    }

    /// Check if no further rune could be displayed at the end.
    pub fn is_full(&self) -> bool {
        let h = self.line_height();
        let end = self.pts[self.text.len()];
        end.y + h > self.r.max.y || (end.y + 2 * h > self.r.max.y && end.x >= self.r.max.x)
    }

    /// Sequence number of the buffer contents last loaded, if any.
    pub fn loaded_seq(&self) -> Option<u64> {
        self.loaded_seq
    }

    pub fn set_loaded_seq(&mut self, seq: Option<u64>) {
        self.loaded_seq = seq;
    }

    /// Register the callback [`select`](Self::select) uses to scroll.
    pub fn set_scroll(&mut self, scroll: ScrollFn) {
        self.scroll = Some(scroll);
    }

    /// Show or hide the insertion tick for an empty selection.
    pub fn set_focused(&mut self, focused: bool) -> DrawResult<()> {
        if self.focused == focused {
            return Ok(());
        }
        self.focused = focused;
        if self.p0 == self.p1 {
            self.tick(self.pts[self.p0], focused)?;
        }
        Ok(())
    }

    fn advance(&self, c: char, x: i32, tabw: i32) -> i32 {
        match c {
            '\n' => 0,
            '\t' => {
                let next = self.r.min.x + ((x - self.r.min.x) / tabw + 1) * tabw;
                (next.min(self.r.max.x) - x).max(0)
            }
            _ => self.font.char_width(c),
        }
    }

    /// Recompute rune positions, dropping runes that no longer fit.
    fn relayout(&mut self) {
        let h = self.line_height();
        let tabw = (TAB_DIGITS * self.font.char_width('0')).max(1);
        self.pts.clear();
        self.widths.clear();
        let mut pt = self.r.min;
        let mut keep = self.text.len();
        for (i, &c) in self.text.iter().enumerate() {
            let mut w = self.advance(c, pt.x, tabw);
            if c != '\n' && pt.x > self.r.min.x && pt.x + w > self.r.max.x {
                pt = Point::new(self.r.min.x, pt.y + h);
                w = self.advance(c, pt.x, tabw);
            }
            if pt.y + h > self.r.max.y {
                keep = i;
                break;
            }
            self.pts.push(pt);
            self.widths.push(w);
            if c == '\n' {
                pt = Point::new(self.r.min.x, pt.y + h);
            } else {
                pt.x += w;
            }
        }
        self.text.truncate(keep);
        self.pts.push(pt);
        self.p1 = self.p1.min(keep);
        self.p0 = self.p0.min(self.p1);
    }

    /// Offsets in `runes` where display lines begin when they are laid out
    /// from the left edge at this frame's width, with no height limit.
    pub fn wrap_starts(&self, runes: &[char]) -> Vec<usize> {
        let tabw = (TAB_DIGITS * self.font.char_width('0')).max(1);
        let mut starts = vec![0];
        let mut x = self.r.min.x;
        for (i, &c) in runes.iter().enumerate() {
            let mut w = self.advance(c, x, tabw);
            if c != '\n' && x > self.r.min.x && x + w > self.r.max.x {
                starts.push(i);
                x = self.r.min.x;
                w = self.advance(c, x, tabw);
            }
            if c == '\n' {
                if i + 1 < runes.len() {
                    starts.push(i + 1);
                }
                x = self.r.min.x;
            } else {
                x += w;
            }
        }
        starts
    }

    /// Upper bound on runes worth handing to [`insert`](Self::insert).
    fn capacity(&self) -> usize {
        self.maxlines() * (self.r.dx().max(1) as usize + 1)
    }

    /// Insert `runes` before frame offset `pos`.
    ///
    /// Runes pushed past the last line are dropped. Returns how many of the
    /// inserted runes remain displayed.
    pub fn insert(&mut self, runes: &[char], pos: usize) -> DrawResult<usize> {
        let pos = pos.min(self.text.len());
        let n = runes.len().min(self.capacity());
        self.text.splice(pos..pos, runes[..n].iter().copied());
        if self.p0 >= pos {
            self.p0 += n;
        }
        if self.p1 >= pos {
            self.p1 += n;
        }
        self.relayout();
        self.redraw()?;
        Ok(n.min(self.text.len() - pos))
    }

    /// Remove the runes in `[q0, q1)`. Returns how many were removed.
    ///
    /// The frame is not refilled from below; the owner does that.
    pub fn delete(&mut self, q0: usize, q1: usize) -> DrawResult<usize> {
        let q1 = q1.min(self.text.len());
        let q0 = q0.min(q1);
        let n = q1 - q0;
        if n == 0 {
            return Ok(0);
        }
        self.text.drain(q0..q1);
        let shift = |p: usize| {
            if p >= q1 {
                p - n
            } else if p > q0 {
                q0
            } else {
                p
            }
        };
        self.p0 = shift(self.p0);
        self.p1 = shift(self.p1);
        self.relayout();
        self.redraw()?;
        Ok(n)
    }

    /// Drop everything displayed.
    pub fn clear(&mut self) -> DrawResult<()> {
        self.text.clear();
        self.p0 = 0;
        self.p1 = 0;
        self.relayout();
        self.redraw()
    }

    /// Replace the contents with as much of `runes` as fits.
    pub fn fill(&mut self, runes: &[char]) -> DrawResult<usize> {
        self.text.clear();
        self.p0 = 0;
        self.p1 = 0;
        self.insert(runes, 0)
    }

    /// Move the frame to `r`, re-wrapping its contents.
    pub fn set_rect(&mut self, r: Rectangle) -> DrawResult<()> {
        if r == self.r {
            return Ok(());
        }
        self.r = r;
        self.relayout();
        self.redraw()
    }

    /// Screen position of the top-left of rune `q`. Offsets past the end
    /// map to the end position.
    pub fn pt_of_char(&self, q: usize) -> Point {
        self.pts[q.min(self.text.len())]
    }

    /// Offset of the rune under `p`.
    ///
    /// Points right of a line's end map to the end of that line; points
    /// below the last line map to the end of the text.
    pub fn char_of_pt(&self, p: Point) -> usize {
        let n = self.text.len();
        let h = self.line_height();
        let line = if p.y < self.r.min.y {
            0
        } else {
            (p.y - self.r.min.y) / h
        };
        let y = self.r.min.y + line * h;
        let start = self.pts[..n].partition_point(|pt| pt.y < y);
        for q in start..n {
            if self.pts[q].y != y {
                return q;
            }
            if self.text[q] == '\n' || p.x < self.pts[q].x + (self.widths[q] + 1) / 2 {
                return q;
            }
        }
        n
    }

    /// One past the last rune before `limit` on the line of rune `q`.
    fn line_end(&self, q: usize, limit: usize) -> usize {
        let y = self.pts[q].y;
        let mut e = q;
        while e < limit && self.pts[e].y == y {
            e += 1;
        }
        e
    }

    /// Draw the glyphs of `[a, b)`, all on one line, in `fg`.
    fn paint_runs(&self, a: usize, b: usize, fg: &Image) -> DrawResult<()> {
        let mut s = a;
        while s < b {
            if matches!(self.text[s], '\t' | '\n') {
                s += 1;
                continue;
            }
            let mut e = s;
            while e < b && !matches!(self.text[e], '\t' | '\n') {
                e += 1;
            }
            let run: SmallVec<[char; 64]> = self.text[s..e].iter().copied().collect();
            self.dst.runestring(self.pts[s], fg, Point::ZERO, &self.font, &run)?;
            s = e;
        }
        Ok(())
    }

    fn tick(&self, pt: Point, on: bool) -> DrawResult<()> {
        let x = pt.x.min(self.r.max.x - 1);
        let mut r = Rectangle::new(x, pt.y, x + 1, pt.y + self.line_height());
        if !r.clip(&self.r) {
            return Ok(());
        }
        if on {
            return self.dst.draw(r, &self.cols.text, None, Point::ZERO);
        }
        self.dst.draw(r, &self.cols.back, None, Point::ZERO)?;
        let q = self.char_of_pt(pt);
        if q < self.text.len() && self.pts[q].y == pt.y {
            self.paint_runs(q, q + 1, &self.cols.text)?;
        }
        Ok(())
    }

    /// Paint `[p0, p1)` highlighted or plain. `pt` is the position of `p0`
    /// as given by [`pt_of_char`](Self::pt_of_char). An empty range draws
    /// or erases the insertion tick.
    pub fn drawsel(&self, pt: Point, p0: usize, p1: usize, highlighted: bool) -> DrawResult<()> {
        let n = self.text.len();
        let p1 = p1.min(n);
        let p0 = p0.min(p1);
        if p0 == p1 {
            return self.tick(pt, highlighted && self.focused);
        }
        let (bg, fg) = if highlighted {
            (&self.cols.high, &self.cols.htext)
        } else {
            (&self.cols.back, &self.cols.text)
        };
        let h = self.line_height();
        let mut q = p0;
        while q < p1 {
            let e = self.line_end(q, p1);
            let start = if q == p0 { pt } else { self.pts[q] };
            let last = e - 1;
            let x1 = if self.text[last] == '\n' {
                self.r.max.x
            } else {
                self.pts[last].x + self.widths[last]
            };
            let r = Rectangle::new(start.x, start.y, x1, start.y + h);
            self.dst.draw(r, bg, None, Point::ZERO)?;
            self.paint_runs(q, e, fg)?;
            q = e;
        }
        Ok(())
    }

    /// Repaint the background, the text, and the current selection.
    pub fn redraw(&self) -> DrawResult<()> {
        self.dst.draw(self.r, &self.cols.back, None, Point::ZERO)?;
        let n = self.text.len();
        let mut q = 0;
        while q < n {
            let e = self.line_end(q, n);
            self.paint_runs(q, e, &self.cols.text)?;
            q = e;
        }
        self.drawsel(self.pts[self.p0], self.p0, self.p1, true)
    }

    /// Change the selection, repainting only what changed hands.
    pub fn set_selection(&mut self, p0: usize, p1: usize) -> DrawResult<()> {
        let p1 = p1.min(self.text.len());
        let p0 = p0.min(p1);
        if (p0, p1) == (self.p0, self.p1) {
            return Ok(());
        }
        self.drawsel(self.pts[self.p0], self.p0, self.p1, false)?;
        self.p0 = p0;
        self.p1 = p1;
        self.drawsel(self.pts[p0], p0, p1, true)
    }

    /// Track a selection gesture that began with `m` until its button set
    /// changes, scrolling through the registered callback.
    pub fn select(&mut self, m: Mouse, mice: &mut dyn MouseSource) -> DrawResult<SelectOutcome> {
        let mut cb = self.scroll.take();
        let out = match cb.as_mut() {
            Some(f) => self.select_with(m, mice, &mut **f),
            None => self.select_with(m, mice, &mut |_: &mut DisplayFrame, _: i32| 0i64),
        };
        if self.scroll.is_none() {
            self.scroll = cb;
        }
        out
    }

    /// [`select`](Self::select) with an explicit scroll callback.
    ///
    /// When the pointer leaves the frame vertically, `scroll` gets the
    /// number of lines it is past the edge, at least one.
    pub fn select_with(
        &mut self,
        m: Mouse,
        mice: &mut dyn MouseSource,
        scroll: &mut dyn FnMut(&mut DisplayFrame, i32) -> i64,
    ) -> DrawResult<SelectOutcome> {
        let buttons = m.buttons;
        let anchor = self.char_of_pt(m.xy) as i64;
        let mut shift = 0i64;
        let mut head = anchor;
        self.show_range(anchor, head, shift)?;
        while let Some(m) = mice.next_mouse() {
            if m.buttons != buttons {
                break;
            }
            let h = self.line_height();
            let mut pt = m.xy;
            if pt.y < self.r.min.y {
                shift += scroll(self, -((self.r.min.y - pt.y) / h + 1));
                pt.y = self.r.min.y;
            } else if pt.y >= self.r.max.y {
                shift += scroll(self, (pt.y - self.r.max.y) / h + 1);
                pt.y = self.r.max.y - 1;
            }
            head = self.char_of_pt(pt) as i64 + shift;
            self.show_range(anchor, head, shift)?;
        }
        Ok(SelectOutcome { anchor, head })
    }

    fn show_range(&mut self, a: i64, b: i64, shift: i64) -> DrawResult<()> {
        let n = self.text.len() as i64;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let p0 = (lo - shift).clamp(0, n) as usize;
        let p1 = (hi - shift).clamp(0, n) as usize;
        self.set_selection(p0, p1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nui_core::event::Buttons;

    /// 80x30 frame: ten 8-pixel cells per line, three 10-pixel lines.
    fn frame() -> DisplayFrame {
        let font = Arc::new(Font::default_font(None).unwrap());
        let r = Rectangle::new(0, 0, 80, 30);
        let dst = Image::detached(r, Pix::XRGB32, false);
        DisplayFrame::new(r, font, dst, FrameColors::detached()).unwrap()
    }

    fn runes(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn press(x: i32, y: i32) -> Mouse {
        Mouse::new(Point::new(x, y), Buttons::LEFT, 0)
    }

    #[test]
    fn wraps_at_right_edge() {
        let mut f = frame();
        assert_eq!(f.insert(&runes("hello world"), 0).unwrap(), 11);
        assert_eq!(f.pt_of_char(9), Point::new(72, 0));
        assert_eq!(f.pt_of_char(10), Point::new(0, 10));
        assert_eq!(f.pt_of_char(11), Point::new(8, 10));
        assert_eq!(f.nlines(), 2);
        assert_eq!(f.maxlines(), 3);
    }

    #[test]
    fn wrap_starts_match_the_displayed_lines() {
        let f = frame();
        let text = runes("abcdefghijklmnopqrstuvwxy\nz");
        assert_eq!(f.wrap_starts(&text), vec![0, 10, 20, 26]);
        assert_eq!(f.wrap_starts(&text[..26]), vec![0, 10, 20]);
        assert_eq!(f.wrap_starts(&[]), vec![0]);
    }

    #[test]
    fn wraps_after_newline() {
        let mut f = frame();
        f.insert(&runes("ab\ncd"), 0).unwrap();
        assert_eq!(f.pt_of_char(2), Point::new(16, 0));
        assert_eq!(f.pt_of_char(3), Point::new(0, 10));
        assert_eq!(f.char_of_pt(Point::new(70, 2)), 2);
        assert_eq!(f.char_of_pt(Point::new(3, 15)), 3);
        assert_eq!(f.char_of_pt(Point::new(5, 15)), 4);
        assert_eq!(f.char_of_pt(Point::new(0, 25)), 5);
    }

    #[test]
    fn tabs_advance_to_stops() {
        let mut f = frame();
        f.set_rect(Rectangle::new(0, 0, 200, 30)).unwrap();
        f.insert(&runes("a\tb"), 0).unwrap();
        assert_eq!(f.pt_of_char(2), Point::new(64, 0));
    }

    #[test]
    fn overflow_is_dropped() {
        let mut f = frame();
        let kept = f.insert(&vec!['x'; 45], 0).unwrap();
        assert_eq!(kept, 30);
        assert_eq!(f.nchars(), 30);
        assert!(f.is_full());
        // inserting at the front pushes the tail out
        f.insert(&runes("ab"), 0).unwrap();
        assert_eq!(f.nchars(), 30);
        assert_eq!(&f.text()[..3], &['a', 'b', 'x']);
    }

    #[test]
    fn points_and_chars_are_inverse() {
        let mut f = frame();
        f.insert(&runes("one two\nthree four five"), 0).unwrap();
        for q in 0..f.nchars() {
            assert_eq!(f.char_of_pt(f.pt_of_char(q)), q, "offset {q}");
        }
    }

    #[test]
    fn edits_move_the_selection() {
        let mut f = frame();
        f.insert(&runes("abcdef"), 0).unwrap();
        f.set_selection(2, 4).unwrap();
        f.insert(&runes("xy"), 1).unwrap();
        assert_eq!((f.p0(), f.p1()), (4, 6));
        f.delete(0, 5).unwrap();
        assert_eq!((f.p0(), f.p1()), (0, 1));
        f.delete(0, 99).unwrap();
        assert_eq!((f.p0(), f.p1(), f.nchars()), (0, 0, 0));
    }

    #[test]
    fn select_follows_the_drag() {
        let mut f = frame();
        f.insert(&runes("hello world"), 0).unwrap();
        let mut mice = vec![
            press(20, 0),
            press(40, 0),
            Mouse::new(Point::new(40, 0), Buttons::empty(), 0),
        ]
        .into_iter();
        let out = f.select(press(0, 0), &mut mice).unwrap();
        assert_eq!(out.range(), (0, 5));
        assert_eq!((f.p0(), f.p1()), (0, 5));
    }

    #[test]
    fn backward_drag_orders_the_selection() {
        let mut f = frame();
        f.insert(&runes("hello world"), 0).unwrap();
        let mut mice = vec![press(8, 0), Mouse::new(Point::new(8, 0), Buttons::empty(), 0)].into_iter();
        let out = f.select(press(48, 0), &mut mice).unwrap();
        assert_eq!((out.anchor, out.head), (6, 1));
        assert_eq!((f.p0(), f.p1()), (1, 6));
    }

    #[test]
    fn leaving_the_frame_scrolls() {
        let mut f = frame();
        f.insert(&runes("hello"), 0).unwrap();
        let mut asked = Vec::new();
        let mut mice = vec![press(0, 55), press(0, -1), Mouse::new(Point::ZERO, Buttons::empty(), 0)].into_iter();
        f.select_with(press(0, 0), &mut mice, &mut |_: &mut DisplayFrame, d: i32| {
            asked.push(d);
            0i64
        })
        .unwrap();
        assert_eq!(asked, vec![3, -1]);
    }

    #[test]
    fn registered_scroll_shifts_the_head() {
        let mut f = frame();
        f.insert(&runes("hello"), 0).unwrap();
        f.set_scroll(Box::new(|_: &mut DisplayFrame, d: i32| i64::from(d) * 10));
        let mut mice = vec![press(0, 35), Mouse::new(Point::ZERO, Buttons::empty(), 0)].into_iter();
        let out = f.select(press(0, 0), &mut mice).unwrap();
        // one line down moved the origin ten runes; the head sits at the end
        assert_eq!(out.head, 15);
        assert_eq!(out.anchor, 0);
        assert_eq!((f.p0(), f.p1()), (0, 5));
    }
}
