//! Fonts.
//!
//! A [`Font`] maps character ranges to subfonts and draws through a
//! per-font glyph cache on the server. Font files are text: a line with the
//! height and ascent, then one `min max [offset] name` entry per range.
//! Numbers may be decimal, `0x` hex, or `0` octal. The offset, when given,
//! is the subfont glyph index of `min`.
//!
//! Fonts also work without a display, in which case only metrics are
//! available and nothing is drawn.

mod cache;
mod string;
pub mod subfont;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nui_core::{debug, warn};

use crate::display::DrawConn;
use crate::error::{DrawError, DrawResult};

pub use cache::{DSUBF, MAXFCACHE, MAXSUBF, NFCACHE, NFLOOK, NFSUBF, PJW, SUBFAGE};
pub use subfont::{
    DEFAULT_SUBFONT, FileLoader, Fontchar, Subfont, SubfontLoader, install_subfont,
    lookup_subfont, pack_fontchars, read_subfont, unpack_fontchars, write_subfont,
    write_subfont_parts,
};

use cache::GlyphCache;
use subfont::{BUILTIN_ASCENT, BUILTIN_HEIGHT, reconcile_ascent};

/// Largest character value a range may name.
const RUNEMAX: u32 = 0x10_FFFF;

/// One character range of a font and the subfont that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cachefont {
    pub min: u32,
    pub max: u32,
    /// Subfont glyph index of `min`.
    pub offset: u32,
    pub name: String,
}

/// A font: character ranges plus the glyph cache shared by everything drawn
/// with it.
pub struct Font {
    pub name: String,
    pub height: i32,
    pub ascent: i32,
    pub(crate) ranges: Vec<Cachefont>,
    pub(crate) conn: Option<DrawConn>,
    pub(crate) loader: Arc<dyn SubfontLoader>,
    builtin: bool,
    cache: Mutex<GlyphCache>,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("name", &self.name)
            .field("height", &self.height)
            .field("ascent", &self.ascent)
            .field("ranges", &self.ranges.len())
            .finish_non_exhaustive()
    }
}

fn parse_num(tok: &str) -> Option<i64> {
    let (digits, radix) = if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        (hex, 16)
    } else if tok.len() > 1 && tok.starts_with('0') {
        (&tok[1..], 8)
    } else {
        (tok, 10)
    };
    i64::from_str_radix(digits, radix).ok()
}

/// Parse font-file text into height, ascent, and ranges.
pub fn parse_font(name: &str, text: &str) -> DrawResult<(i32, i32, Vec<Cachefont>)> {
    let bad = |msg: &str| DrawError::Parse(format!("font {name}: {msg}"));
    let mut toks = text.split_whitespace().peekable();
    let num = |what: &str, toks: &mut std::iter::Peekable<std::str::SplitWhitespace<'_>>| {
        toks.next()
            .and_then(parse_num)
            .ok_or_else(|| bad(&format!("bad {what}")))
    };
    let height = num("height", &mut toks)?;
    let ascent = num("ascent", &mut toks)?;
    if height <= 0 || ascent <= 0 || ascent > height || height > 0x7FFF {
        return Err(bad("bad height or ascent"));
    }
    let mut ranges = Vec::new();
    while toks.peek().is_some() {
        let min = num("range start", &mut toks)?;
        let max = num("range end", &mut toks)?;
        if min < 0 || min > max || max > i64::from(RUNEMAX) {
            return Err(bad(&format!("illegal subfont range {min:#x}-{max:#x}")));
        }
        let offset = match toks.peek().and_then(|t| parse_num(t)) {
            Some(off) => {
                toks.next();
                off
            }
            None => 0,
        };
        if !(0..=i64::from(RUNEMAX)).contains(&offset) {
            return Err(bad(&format!("bad offset {offset}")));
        }
        let file = toks
            .next()
            .ok_or_else(|| bad("missing subfont name"))?;
        ranges.push(Cachefont {
            min: min as u32,
            max: max as u32,
            offset: offset as u32,
            name: file.to_string(),
        });
    }
    if ranges.is_empty() {
        return Err(bad("no subfont ranges"));
    }
    Ok((height as i32, ascent as i32, ranges))
}

impl Font {
    fn with_parts(
        conn: Option<&DrawConn>,
        name: &str,
        height: i32,
        ascent: i32,
        ranges: Vec<Cachefont>,
        loader: Arc<dyn SubfontLoader>,
        builtin: bool,
    ) -> Font {
        Font {
            name: name.to_string(),
            height,
            ascent,
            ranges,
            conn: conn.cloned(),
            loader,
            builtin,
            cache: Mutex::new(GlyphCache::new()),
        }
    }

    /// Build a font from font-file text. Subfonts are named relative to
    /// `loader`.
    pub fn build(
        conn: Option<&DrawConn>,
        name: &str,
        text: &str,
        loader: Arc<dyn SubfontLoader>,
    ) -> DrawResult<Font> {
        let (height, ascent, ranges) = parse_font(name, text)?;
        debug!(font = name, height, ascent, ranges = ranges.len(), "draw: font built");
        Ok(Self::with_parts(conn, name, height, ascent, ranges, loader, false))
    }

    /// Read a font file; subfonts are found next to it.
    pub fn open(conn: Option<&DrawConn>, path: &Path) -> DrawResult<Font> {
        let text = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::build(
            conn,
            &path.to_string_lossy(),
            &text,
            Arc::new(FileLoader::new(dir)),
        )
    }

    /// The built-in font: Latin-1 from the built-in subfont.
    pub fn default_font(conn: Option<&DrawConn>) -> DrawResult<Font> {
        let ranges = vec![Cachefont {
            min: 0,
            max: 0xFF,
            offset: 0,
            name: DEFAULT_SUBFONT.to_string(),
        }];
        Ok(Self::with_parts(
            conn,
            DEFAULT_SUBFONT,
            BUILTIN_HEIGHT,
            BUILTIN_ASCENT,
            ranges,
            Arc::new(FileLoader::default()),
            true,
        ))
    }

    /// Character ranges in file order.
    pub fn ranges(&self) -> &[Cachefont] {
        &self.ranges
    }

    /// The connection this font draws on, if any.
    pub fn conn(&self) -> Option<&DrawConn> {
        self.conn.as_ref()
    }

    /// How many characters have been drawn with the replacement glyph.
    pub fn pjw_fallbacks(&self) -> u64 {
        self.lock_cache().pjw_fallbacks
    }

    /// Number of glyph cache cells, including the probe overhang.
    pub fn cache_cells(&self) -> usize {
        self.lock_cache().cells.len()
    }

    pub(crate) fn lock_cache(&self) -> MutexGuard<'_, GlyphCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a resolved subfont and make it the last-used one.
    pub(crate) fn load_subfont(&self, resolved: &str) -> DrawResult<Arc<Subfont>> {
        let mut sf = if resolved == DEFAULT_SUBFONT {
            Subfont::builtin(self.conn.as_ref())?
        } else {
            self.loader.load(self.conn.as_ref(), resolved)?
        };
        if sf.ascent > self.ascent {
            warn!(
                font = %self.name,
                subfont = resolved,
                "draw: subfont ascent exceeds font ascent"
            );
            reconcile_ascent(&mut sf, self.ascent)?;
        }
        let sf = Arc::new(sf);
        install_subfont(Arc::clone(&sf));
        Ok(sf)
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        let cache = self.cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut img) = cache.image.take()
            && let Err(err) = img.free()
        {
            debug!(font = %self.name, error = %err, "draw: freeing font cache failed");
        }
    }
}
