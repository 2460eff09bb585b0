//! The glyph cache.
//!
//! A font keeps recently used glyphs in one server image, `ncache` cells
//! wide. A character hashes to a run of [`NFLOOK`] candidate cells; a miss
//! evicts the least recently used of them, and a miss whose victim is too
//! young doubles the cache instead. Ages count string-drawing calls and are
//! renormalized before they overflow 16 bits.

use std::sync::Arc;

use smallvec::SmallVec;

use nui_core::geometry::Rectangle;
use nui_core::{debug, warn};

use crate::bytes::Packer;
use crate::chan::Pix;
use crate::color::Color;
use crate::display::DrawConn;
use crate::error::DrawResult;
use crate::image::Image;

use super::Font;
use super::subfont::{DEFAULT_SUBFONT, Subfont, lookup_subfont};

/// Initial number of hashed cells.
pub const NFCACHE: usize = 64;
/// Cells probed per lookup.
pub const NFLOOK: usize = 5;
/// Largest cache, in cells.
pub const MAXFCACHE: usize = 1024 + NFLOOK;
/// Initial number of subfont slots.
pub const NFSUBF: usize = 2;
/// Subfont slots added when all are busy.
pub const DSUBF: usize = 4;
/// Most subfont slots before the oldest is evicted regardless of age.
pub const MAXSUBF: usize = 50;
/// Age after which a subfont slot is considered stale.
pub const SUBFAGE: u32 = 10_000;
/// A victim younger than this many ages triggers growth instead.
const YOUNG: u32 = 500;
const AGE_WRAP: u32 = 65_536;

/// Replacement character for glyphs no subfont provides.
pub const PJW: u32 = 0;

/// One cache cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Cacheinfo {
    pub(crate) value: u32,
    pub(crate) width: u8,
    pub(crate) left: i8,
    pub(crate) x: i32,
    /// Zero marks a free cell.
    pub(crate) age: u32,
}

/// A loaded subfont and the font range it serves.
#[derive(Debug, Default)]
pub(crate) struct Cachesubf {
    pub(crate) age: u32,
    pub(crate) cf: Option<usize>,
    pub(crate) f: Option<Arc<Subfont>>,
}

/// Outcome of loading one character into a cell.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Load {
    Loaded,
    /// No glyph and no replacement; drop the character.
    Skip,
    /// The cache must be reshaped; emit what is pending and retry.
    Flush,
    /// The named subfont must be loaded first.
    Need(String),
}

/// Result of [`GlyphCache::cachechars`].
#[derive(Debug, Default)]
pub(crate) struct Cached {
    /// Characters consumed from the input, including skipped ones.
    pub(crate) consumed: usize,
    /// Total advance of the cached characters.
    pub(crate) width: i32,
    pub(crate) need: Option<String>,
}

#[derive(Debug)]
pub(crate) struct GlyphCache {
    pub(crate) age: u32,
    /// Cell width: the widest glyph seen.
    pub(crate) width: i32,
    pub(crate) maxdepth: u32,
    pub(crate) cells: Vec<Cacheinfo>,
    pub(crate) subf: Vec<Cachesubf>,
    pub(crate) image: Option<Image>,
    pub(crate) pjw_fallbacks: u64,
    /// Subfont loaded on this font's behalf, awaiting its first lookup.
    pub(crate) loaded: Option<Arc<Subfont>>,
    pub(crate) fallback: Option<Box<Font>>,
}

impl GlyphCache {
    pub(crate) fn new() -> Self {
        Self {
            age: 1,
            width: 0,
            maxdepth: 0,
            cells: vec![Cacheinfo::default(); NFCACHE + NFLOOK],
            subf: std::iter::repeat_with(Cachesubf::default).take(NFSUBF).collect(),
            image: None,
            pjw_fallbacks: 0,
            loaded: None,
            fallback: None,
        }
    }

    /// Look up or load up to `max` characters from `runes`, pushing their
    /// cell indices onto `out`.
    ///
    /// Stops early when the cache must grow, when a victim cell is already
    /// in use by the pending string, or when a subfont must be loaded.
    pub(crate) fn cachechars(
        &mut self,
        font: &Font,
        runes: &[char],
        max: usize,
        out: &mut SmallVec<[u16; 128]>,
    ) -> DrawResult<Cached> {
        out.clear();
        let mut done = Cached::default();
        let mut k = 0;
        while k < runes.len() && out.len() < max {
            let r = runes[k] as u32;
            let i = out.len();
            let nhash = self.cells.len() - NFLOOK;
            let sh = (17 * r as usize) % nhash;
            let hit = (sh..sh + NFLOOK).find(|&h| {
                let c = &self.cells[h];
                c.value == r && c.age != 0
            });
            let h = match hit {
                Some(h) => h,
                None => {
                    let mut h = sh;
                    let mut a = u32::MAX;
                    for t in sh..sh + NFLOOK {
                        if self.cells[t].age < a {
                            a = self.cells[t].age;
                            h = t;
                        }
                    }
                    if a != 0 && self.age.saturating_sub(a) < YOUNG {
                        let nc = 2 * nhash + NFLOOK;
                        if nc <= MAXFCACHE {
                            if i == 0 {
                                self.resize(font, self.width, nc, self.maxdepth)?;
                            }
                            break;
                        }
                    }
                    if self.cells[h].age == self.age {
                        break;
                    }
                    match self.loadchar(font, r, h, i)? {
                        Load::Loaded => h,
                        Load::Skip => {
                            k += 1;
                            done.consumed = k;
                            continue;
                        }
                        Load::Flush => break,
                        Load::Need(name) => {
                            done.need = Some(name);
                            break;
                        }
                    }
                }
            };
            let age = self.age;
            let c = &mut self.cells[h];
            done.width += i32::from(c.width);
            c.age = age;
            out.push(h as u16);
            k += 1;
            done.consumed = k;
        }
        Ok(done)
    }

    /// Find the loaded subfont for range `ci`, or the name to load.
    fn cf2subfont(&self, font: &Font, ci: usize) -> Result<Arc<Subfont>, Option<String>> {
        let name = &font.ranges[ci].name;
        let resolved = if name == DEFAULT_SUBFONT {
            DEFAULT_SUBFONT.to_string()
        } else {
            let depth = font.conn.as_ref().map_or(8, |c| c.screen_depth());
            font.loader.resolve(name, depth).ok_or(None)?
        };
        let loaded = self.loaded.as_ref().filter(|sf| sf.name == resolved).cloned();
        match loaded.or_else(|| lookup_subfont(font.conn.as_ref(), &resolved)) {
            // a cached copy shaped for a shorter font cannot be reused here
            Some(sf) if sf.ascent <= font.ascent => Ok(sf),
            _ => Err(Some(resolved)),
        }
    }

    /// Load `r` into cell `h`. `pending` counts cells already claimed by the
    /// string in progress, which must not be invalidated by a resize.
    fn loadchar(&mut self, font: &Font, r: u32, h: usize, pending: usize) -> DrawResult<Load> {
        let mut pic = r;
        'again: loop {
            let Some(ci) = font.ranges.iter().position(|cf| cf.min <= pic && pic <= cf.max) else {
                if pic != PJW {
                    pic = PJW;
                    continue 'again;
                }
                return Ok(Load::Skip);
            };

            let slot = match self.subf.iter().position(|s| s.cf == Some(ci)) {
                Some(s) => s,
                None => {
                    let mut oi = 0;
                    for (i, s) in self.subf.iter().enumerate() {
                        if s.age < self.subf[oi].age {
                            oi = i;
                        }
                    }
                    let mut slot = oi;
                    if self.subf[oi].f.is_some() {
                        let stale = self.age.saturating_sub(self.subf[oi].age) > SUBFAGE;
                        if !stale && self.subf.len() <= MAXSUBF {
                            slot = self.subf.len();
                            self.subf.resize_with(slot + DSUBF, Cachesubf::default);
                        }
                    }
                    self.subf[slot] = Cachesubf::default();
                    match self.cf2subfont(font, ci) {
                        Ok(sf) => {
                            self.subf[slot].f = Some(sf);
                            self.subf[slot].cf = Some(ci);
                            slot
                        }
                        Err(Some(name)) => return Ok(Load::Need(name)),
                        Err(None) => {
                            if pic != PJW {
                                pic = PJW;
                                continue 'again;
                            }
                            return Ok(Load::Skip);
                        }
                    }
                }
            };

            self.subf[slot].age = self.age;
            let Some(sf) = self.subf[slot].f.clone() else {
                return Ok(Load::Skip);
            };
            let cf = &font.ranges[ci];
            let idx = pic.wrapping_add(cf.offset).wrapping_sub(cf.min) as usize;
            if idx >= sf.n || sf.info[idx].width == 0 {
                if pic != PJW {
                    pic = PJW;
                    continue 'again;
                }
                return Ok(Load::Skip);
            }
            let fi = sf.info[idx];
            let wid = sf.info[idx + 1].x - fi.x;
            if self.width < wid || self.width == 0 || self.maxdepth < sf.bits.depth {
                if pending > 0 {
                    return Ok(Load::Flush);
                }
                let w = self.width.max(wid);
                let d = self.maxdepth.max(sf.bits.depth);
                if !self.resize(font, w, self.cells.len(), d)? {
                    return Ok(Load::Skip);
                }
            }

            let x = h as i32 * self.width;
            let c = &mut self.cells[h];
            c.value = r;
            c.width = fi.width;
            c.x = x;
            c.left = fi.left;
            let shift = font.ascent - sf.ascent;
            let top = i32::from(fi.top) + shift;
            let bottom = i32::from(fi.bottom) + shift;

            if let (Some(conn), Some(cache)) = (font.conn.as_ref(), self.image.as_ref()) {
                let mut cn = conn.lock();
                let b = cn.bufimage(37)?;
                Packer::new(b)
                    .u8(b'l')
                    .u32(cache.id)
                    .u32(sf.bits.id)
                    .u16(h as u16)
                    .rect(Rectangle::new(x, top, x + wid, bottom))
                    .i32(fi.x)
                    .i32(i32::from(fi.top))
                    .u8(fi.left as u8)
                    .u8(fi.width);
            }
            if pic != r {
                self.pjw_fallbacks += 1;
            }
            return Ok(Load::Loaded);
        }
    }

    /// Advance the age, renormalizing everything when it would overflow.
    pub(crate) fn agefont(&mut self) {
        self.age += 1;
        if self.age < AGE_WRAP {
            return;
        }
        for c in &mut self.cells {
            if c.age != 0 {
                c.age = (c.age >> 2) + 1;
            }
        }
        for s in &mut self.subf {
            if s.age == 0 {
                continue;
            }
            if s.age < SUBFAGE && s.cf.is_some() {
                *s = Cachesubf::default();
            } else {
                s.age = (s.age >> 2) + 1;
            }
        }
        self.age = (AGE_WRAP >> 2) + 1;
    }

    /// Replace the cache image with one of `ncache` cells of width `wid` at
    /// `depth`, and forget every cached glyph. Returns `false` when the cell
    /// array was reallocated, so callers holding indices must start over.
    pub(crate) fn resize(
        &mut self,
        font: &Font,
        wid: i32,
        ncache: usize,
        depth: u32,
    ) -> DrawResult<bool> {
        let depth = depth.clamp(1, 8);
        let wid = wid.max(1);
        let mut old = None;
        if let Some(conn) = font.conn.as_ref() {
            let r = Rectangle::new(0, 0, ncache as i32 * wid, font.height);
            let mut new = match conn.alloc_image(r, Pix::grey(depth), true, Color::TRANSPARENT) {
                Ok(img) => img,
                Err(err) => {
                    warn!(font = %font.name, error = %err, "draw: font cache resize failed");
                    self.wipe();
                    return Err(err);
                }
            };
            if let Err(err) = init_cache(conn, &new, ncache, font.ascent) {
                warn!(font = %font.name, error = %err, "draw: font cache init failed");
                if let Err(err) = new.free() {
                    debug!(font = %font.name, error = %err, "draw: freeing rejected cache failed");
                }
                self.wipe();
                return Err(err);
            }
            old = self.image.replace(new);
        }
        self.width = wid;
        self.maxdepth = depth;
        let same = self.cells.len() == ncache;
        if !same {
            self.cells = vec![Cacheinfo::default(); ncache];
        }
        self.wipe();
        // the new image is in place; a failure to drop the old one only leaks it
        if let Some(mut old) = old
            && let Err(err) = old.free()
        {
            warn!(font = %font.name, error = %err, "draw: freeing old font cache failed");
        }
        debug!(font = %font.name, ncache, width = wid, depth, "draw: font cache resized");
        Ok(same)
    }

    fn wipe(&mut self) {
        self.cells.fill(Cacheinfo::default());
    }
}

fn init_cache(conn: &DrawConn, img: &Image, ncache: usize, ascent: i32) -> DrawResult<()> {
    let mut c = conn.lock();
    // surface errors from earlier commands before the init
    c.flush(false)?;
    let b = c.bufimage(10)?;
    Packer::new(b)
        .u8(b'i')
        .u32(img.id)
        .u32(ncache as u32)
        .u8(ascent.clamp(0, 255) as u8);
    c.flush(false)
}
