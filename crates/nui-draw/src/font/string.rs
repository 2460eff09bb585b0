//! Drawing and measuring strings.

use smallvec::SmallVec;

use nui_core::geometry::{Point, Rectangle};
use nui_core::warn;

use crate::bytes::Packer;
use crate::draw::DrawOp;
use crate::error::DrawResult;
use crate::image::Image;

use super::Font;
use super::cache::GlyphCache;

/// Characters packed into one string command.
const MAX_RUNES: usize = 100;

/// Rounds without progress before a string is abandoned.
const MAX_STALLS: u32 = 4;

/// Where and how a string is painted.
struct Target<'a> {
    dst: &'a Image,
    src: &'a Image,
    sp: Point,
    clipr: Rectangle,
    bg: Option<(&'a Image, Point)>,
    op: DrawOp,
}

impl Font {
    /// Measure or draw `runes` starting at `pt`, returning the pen position
    /// after the last character.
    fn run(&self, target: Option<&Target<'_>>, mut pt: Point, runes: &[char]) -> DrawResult<Point> {
        let mut g = self.lock_cache();
        let mut rest = runes;
        let mut idx: SmallVec<[u16; 128]> = SmallVec::new();
        let mut bg_shift = 0;
        let mut stalls = 0;
        while !rest.is_empty() {
            let got = g.cachechars(self, rest, MAX_RUNES, &mut idx)?;
            if !idx.is_empty() {
                if let Some(t) = target {
                    self.emit(&g, t, pt, bg_shift, &idx)?;
                }
                pt.x += got.width;
                bg_shift += got.width;
                g.agefont();
            }
            rest = &rest[got.consumed..];
            if got.consumed == 0 {
                stalls += 1;
                if stalls > MAX_STALLS {
                    warn!(font = %self.name, "draw: string abandoned, glyph cache made no progress");
                    break;
                }
            } else {
                stalls = 0;
            }
            let Some(name) = got.need else {
                continue;
            };
            drop(g);
            match self.load_subfont(&name) {
                Ok(sf) => {
                    g = self.lock_cache();
                    g.loaded = Some(sf);
                }
                Err(err) => {
                    warn!(font = %self.name, subfont = %name, error = %err, "draw: subfont load failed");
                    if self.builtin {
                        return Err(err);
                    }
                    return self.with_fallback(|fb| fb.run(target, pt, rest));
                }
            }
        }
        Ok(pt)
    }

    fn with_fallback<T>(&self, f: impl FnOnce(&Font) -> DrawResult<T>) -> DrawResult<T> {
        let mut g = self.lock_cache();
        if g.fallback.is_none() {
            g.fallback = Some(Box::new(Font::default_font(self.conn.as_ref())?));
        }
        match g.fallback.as_deref() {
            Some(fb) => f(fb),
            None => f(self),
        }
    }

    fn emit(
        &self,
        g: &GlyphCache,
        t: &Target<'_>,
        pt: Point,
        bg_shift: i32,
        idx: &[u16],
    ) -> DrawResult<()> {
        let (Some(conn), Some(cache)) = (t.dst.conn(), g.image.as_ref()) else {
            return Ok(());
        };
        if !self.conn.as_ref().is_some_and(|c| c.same(conn)) {
            return Ok(());
        }
        let mut c = conn.lock();
        let n = idx.len();
        let len = 47 + 2 * n + if t.bg.is_some() { 12 } else { 0 };
        let b = c.bufimage_op(len, t.op)?;
        let mut p = Packer::new(b);
        p.u8(if t.bg.is_some() { b'x' } else { b's' })
            .u32(t.dst.id)
            .u32(t.src.id)
            .u32(cache.id)
            .point(Point::new(pt.x, pt.y + self.ascent))
            .rect(t.clipr)
            .point(t.sp)
            .u16(n as u16);
        if let Some((bg, bgp)) = t.bg {
            p.u32(bg.id).point(Point::new(bgp.x + bg_shift, bgp.y));
        }
        for &i in idx {
            p.u16(i);
        }
        Ok(())
    }

    /// Width of `s` in pixels.
    pub fn string_width(&self, s: &str) -> DrawResult<i32> {
        let runes: SmallVec<[char; 128]> = s.chars().collect();
        self.rune_width(&runes)
    }

    /// Width of `runes` in pixels.
    pub fn rune_width(&self, runes: &[char]) -> DrawResult<i32> {
        Ok(self.run(None, Point::ZERO, runes)?.x)
    }

    /// Width and height of `s`.
    pub fn string_size(&self, s: &str) -> DrawResult<Point> {
        Ok(Point::new(self.string_width(s)?, self.height))
    }

    /// Advance of a single character; zero when it cannot be measured.
    pub fn char_width(&self, r: char) -> i32 {
        self.rune_width(&[r]).unwrap_or(0)
    }
}

impl Image {
    /// Draw `s` with its top-left corner at `pt`, colored by `src` aligned
    /// at `sp`. Returns the point just past the last character.
    pub fn string(&self, pt: Point, src: &Image, sp: Point, font: &Font, s: &str) -> DrawResult<Point> {
        let runes: SmallVec<[char; 128]> = s.chars().collect();
        self.runestring_op(pt, src, sp, font, &runes, DrawOp::SOVER_D)
    }

    pub fn string_op(
        &self,
        pt: Point,
        src: &Image,
        sp: Point,
        font: &Font,
        s: &str,
        op: DrawOp,
    ) -> DrawResult<Point> {
        let runes: SmallVec<[char; 128]> = s.chars().collect();
        self.runestring_op(pt, src, sp, font, &runes, op)
    }

    pub fn runestring(
        &self,
        pt: Point,
        src: &Image,
        sp: Point,
        font: &Font,
        runes: &[char],
    ) -> DrawResult<Point> {
        self.runestring_op(pt, src, sp, font, runes, DrawOp::SOVER_D)
    }

    pub fn runestring_op(
        &self,
        pt: Point,
        src: &Image,
        sp: Point,
        font: &Font,
        runes: &[char],
        op: DrawOp,
    ) -> DrawResult<Point> {
        let t = Target {
            dst: self,
            src,
            sp,
            clipr: self.clipr,
            bg: None,
            op,
        };
        font.run(Some(&t), pt, runes)
    }

    /// Like [`string`](Self::string), first painting each character cell
    /// from `bg` aligned at `bgp`.
    #[allow(clippy::too_many_arguments)]
    pub fn string_bg(
        &self,
        pt: Point,
        src: &Image,
        sp: Point,
        font: &Font,
        s: &str,
        bg: &Image,
        bgp: Point,
    ) -> DrawResult<Point> {
        let runes: SmallVec<[char; 128]> = s.chars().collect();
        self.runestring_bg(pt, src, sp, font, &runes, bg, bgp)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn runestring_bg(
        &self,
        pt: Point,
        src: &Image,
        sp: Point,
        font: &Font,
        runes: &[char],
        bg: &Image,
        bgp: Point,
    ) -> DrawResult<Point> {
        let t = Target {
            dst: self,
            src,
            sp,
            clipr: self.clipr,
            bg: Some((bg, bgp)),
            op: DrawOp::SOVER_D,
        };
        font.run(Some(&t), pt, runes)
    }
}
