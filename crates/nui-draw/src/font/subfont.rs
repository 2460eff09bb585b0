//! Subfonts: a glyph bitmap plus per-glyph metrics for a contiguous run of
//! characters.
//!
//! # File format
//!
//! An image file (see [`crate::imagefile`]) followed by three 12-byte text
//! fields (glyph count `n`, height, ascent) and `n + 1` six-byte entries:
//! `x` (2 bytes, little-endian), `top`, `bottom`, `left` (signed) and
//! `width`. The extra entry marks the right edge of the last glyph.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use nui_core::geometry::{Point, Rectangle};
use nui_core::{debug, trace};

use crate::bytes::{bpshort, gshort};
use crate::chan::{Pix, bytes_per_line};
use crate::color::Color;
use crate::display::DrawConn;
use crate::error::{DrawError, DrawResult};
use crate::image::Image;
use crate::imagefile::{read_image_data, write_image, write_image_data};

/// Name a font file uses for the built-in subfont.
pub const DEFAULT_SUBFONT: &str = "*default*";

/// Bytes per packed [`Fontchar`].
pub const FONTCHAR_LEN: usize = 6;

const FIELD: usize = 12;

/// Height and ascent of the built-in subfont. The 8×8 cells get a blank
/// row above and below.
pub const BUILTIN_HEIGHT: i32 = 10;
pub const BUILTIN_ASCENT: i32 = 8;
const BUILTIN_CELL: i32 = 8;
const BUILTIN_GLYPHS: usize = 256;

/// Metrics of one glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fontchar {
    /// Left edge of the glyph in the subfont bitmap.
    pub x: i32,
    /// First non-blank row.
    pub top: u8,
    /// Last non-blank row plus one.
    pub bottom: u8,
    /// Offset of the bitmap from the pen position.
    pub left: i8,
    /// Advance width. Zero marks a missing glyph.
    pub width: u8,
}

/// Pack glyph metrics into their six-byte file form.
pub fn pack_fontchars(info: &[Fontchar]) -> Vec<u8> {
    let mut out = vec![0u8; info.len() * FONTCHAR_LEN];
    for (b, fc) in out.chunks_exact_mut(FONTCHAR_LEN).zip(info) {
        bpshort(b, fc.x as u16);
        b[2] = fc.top;
        b[3] = fc.bottom;
        b[4] = fc.left as u8;
        b[5] = fc.width;
    }
    out
}

/// Inverse of [`pack_fontchars`]. A trailing partial entry is ignored.
pub fn unpack_fontchars(data: &[u8]) -> Vec<Fontchar> {
    data.chunks_exact(FONTCHAR_LEN)
        .map(|b| Fontchar {
            x: i32::from(gshort(b)),
            top: b[2],
            bottom: b[3],
            left: b[4] as i8,
            width: b[5],
        })
        .collect()
}

/// Glyph bitmap plus metrics. Shared between fonts through [`Arc`]; the
/// bitmap is freed when the last reference goes.
#[derive(Debug)]
pub struct Subfont {
    pub name: String,
    /// Number of glyphs; `info` holds one more entry.
    pub n: usize,
    pub height: i32,
    pub ascent: i32,
    pub info: Vec<Fontchar>,
    pub bits: Image,
}

impl Subfont {
    pub fn new(
        name: impl Into<String>,
        height: i32,
        ascent: i32,
        info: Vec<Fontchar>,
        bits: Image,
    ) -> DrawResult<Subfont> {
        let name = name.into();
        if info.is_empty() {
            return Err(DrawError::Parse(format!("subfont {name}: no glyph metrics")));
        }
        Ok(Subfont {
            name,
            n: info.len() - 1,
            height,
            ascent,
            info,
            bits,
        })
    }

    /// The built-in subfont: Latin-1 from 8×8 bitmaps, with a hollow box as
    /// the replacement glyph at position 0.
    pub fn builtin(conn: Option<&DrawConn>) -> DrawResult<Subfont> {
        let r = Rectangle::new(0, 0, BUILTIN_CELL * BUILTIN_GLYPHS as i32, BUILTIN_HEIGHT);
        let bpl = bytes_per_line(r, 1);
        let mut pixels = vec![0u8; bpl * BUILTIN_HEIGHT as usize];
        let mut info = Vec::with_capacity(BUILTIN_GLYPHS + 1);
        for code in 0..BUILTIN_GLYPHS {
            let rows = builtin_rows(code);
            let present = rows.is_some();
            if let Some(rows) = rows {
                for (y, bits) in rows.iter().enumerate() {
                    // the 8x8 tables put the leftmost pixel in bit 0
                    pixels[(y + 1) * bpl + code] = bits.reverse_bits();
                }
            }
            info.push(Fontchar {
                x: code as i32 * BUILTIN_CELL,
                top: 0,
                bottom: BUILTIN_HEIGHT as u8,
                left: 0,
                width: if present { BUILTIN_CELL as u8 } else { 0 },
            });
        }
        info.push(Fontchar {
            x: BUILTIN_GLYPHS as i32 * BUILTIN_CELL,
            ..Fontchar::default()
        });
        let bits = match conn {
            Some(conn) => {
                let mut img = conn.alloc_image(r, Pix::GREY1, false, Color::NOFILL)?;
                if let Err(err) = img.load(r, &pixels) {
                    img.free()?;
                    return Err(err);
                }
                img
            }
            None => Image::detached(r, Pix::GREY1, false),
        };
        Subfont::new(DEFAULT_SUBFONT, BUILTIN_HEIGHT, BUILTIN_ASCENT, info, bits)
    }
}

impl Drop for Subfont {
    fn drop(&mut self) {
        if let Err(err) = self.bits.free() {
            debug!(subfont = %self.name, error = %err, "draw: freeing subfont bitmap failed");
        }
    }
}

fn builtin_rows(code: usize) -> Option<[u8; 8]> {
    use font8x8::UnicodeFonts;

    if code == 0 {
        return Some([0x00, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00]);
    }
    let ch = char::from_u32(code as u32)?;
    match code {
        0x20..=0x7E => font8x8::BASIC_FONTS.get(ch),
        0xA0..=0xFF => font8x8::LATIN_FONTS.get(ch),
        _ => None,
    }
}

fn parse_field(b: &[u8], what: &str) -> DrawResult<i32> {
    std::str::from_utf8(b)
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DrawError::Parse(format!("subfont: bad {what} field")))
}

fn read_exact_or_parse<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> DrawResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => DrawError::Parse("subfont: file truncated".into()),
        _ => DrawError::Transport(e),
    })
}

/// Read a subfont file. Without a connection the bitmap stays detached and
/// only the metrics are usable.
pub fn read_subfont<R: BufRead + ?Sized>(
    conn: Option<&DrawConn>,
    r: &mut R,
    name: &str,
) -> DrawResult<Subfont> {
    let (h, pixels) = read_image_data(r)?;
    let mut hdr = [0u8; 3 * FIELD];
    read_exact_or_parse(r, &mut hdr)?;
    let n = parse_field(&hdr[..FIELD], "count")?;
    let height = parse_field(&hdr[FIELD..2 * FIELD], "height")?;
    let ascent = parse_field(&hdr[2 * FIELD..], "ascent")?;
    if !(0..=0xFFFF).contains(&n) || height <= 0 || ascent < 0 || ascent > height {
        return Err(DrawError::Parse(format!(
            "subfont {name}: bad header n={n} height={height} ascent={ascent}"
        )));
    }
    let mut raw = vec![0u8; (n as usize + 1) * FONTCHAR_LEN];
    read_exact_or_parse(r, &mut raw)?;
    let info = unpack_fontchars(&raw);
    let bits = match conn {
        Some(conn) => {
            let mut img = conn.alloc_image(h.r, h.chan, false, Color::NOFILL)?;
            if let Err(err) = img.load(h.r, &pixels) {
                img.free()?;
                return Err(err);
            }
            img
        }
        None => Image::detached(h.r, h.chan, false),
    };
    Subfont::new(name, height, ascent, info, bits)
}

fn write_metrics<W: Write + ?Sized>(
    w: &mut W,
    height: i32,
    ascent: i32,
    info: &[Fontchar],
) -> DrawResult<()> {
    let n = info.len().saturating_sub(1);
    write!(w, "{n:>11} {height:>11} {ascent:>11} ")?;
    w.write_all(&pack_fontchars(info))?;
    Ok(())
}

/// Write a subfont held on the server.
pub fn write_subfont<W: Write + ?Sized>(w: &mut W, sf: &Subfont) -> DrawResult<()> {
    write_image(w, &sf.bits, false)?;
    write_metrics(w, sf.height, sf.ascent, &sf.info)
}

/// Write a subfont from its parts, without a display.
pub fn write_subfont_parts<W: Write + ?Sized>(
    w: &mut W,
    chan: Pix,
    r: Rectangle,
    pixels: &[u8],
    height: i32,
    ascent: i32,
    info: &[Fontchar],
) -> DrawResult<()> {
    write_image_data(w, chan, r, pixels, false)?;
    write_metrics(w, height, ascent, info)
}

/// Source of subfonts named by font files.
pub trait SubfontLoader: Send + Sync {
    /// Map a font-file subfont name to the name it is loaded and shared
    /// under, or `None` if no such subfont exists.
    fn resolve(&self, name: &str, depth: u32) -> Option<String>;

    /// Load a resolved subfont.
    fn load(&self, conn: Option<&DrawConn>, resolved: &str) -> DrawResult<Subfont>;
}

/// Loads subfont files relative to a font's directory, preferring a
/// `name.<depth>` variant no deeper than the screen.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    dir: PathBuf,
}

impl FileLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SubfontLoader for FileLoader {
    fn resolve(&self, name: &str, depth: u32) -> Option<String> {
        let base = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            self.dir.join(name)
        };
        let base = base.to_string_lossy().into_owned();
        [8u32, 4, 2, 1]
            .into_iter()
            .filter(|&d| d <= depth.clamp(1, 8))
            .map(|d| format!("{base}.{d}"))
            .chain(std::iter::once(base.clone()))
            .find(|p| Path::new(p).is_file())
    }

    fn load(&self, conn: Option<&DrawConn>, resolved: &str) -> DrawResult<Subfont> {
        let file = File::open(resolved)?;
        trace!(path = resolved, "draw: loading subfont");
        read_subfont(conn, &mut BufReader::new(file), resolved)
    }
}

/// The most recently loaded subfont, shared across fonts.
static LAST_SUBFONT: Mutex<Option<Arc<Subfont>>> = Mutex::new(None);

fn same_conn(a: Option<&DrawConn>, b: Option<&DrawConn>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}

/// Find a loaded subfont by resolved name on the given connection.
pub fn lookup_subfont(conn: Option<&DrawConn>, name: &str) -> Option<Arc<Subfont>> {
    let last = LAST_SUBFONT.lock().unwrap_or_else(PoisonError::into_inner);
    last.as_ref()
        .filter(|sf| sf.name == name && same_conn(sf.bits.conn(), conn))
        .cloned()
}

/// Remember `sf` as the last-used subfont, releasing the previous one.
pub fn install_subfont(sf: Arc<Subfont>) {
    let old = LAST_SUBFONT
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(sf);
    drop(old);
}

impl DrawConn {
    /// A non-owning proxy for the replicated black image.
    pub(crate) fn black_image(&self) -> Image {
        let mut img = Image::detached(Rectangle::new(0, 0, 1, 1), Pix::GREY1, true);
        img.id = self.black_id();
        img.conn = Some(self.clone());
        img
    }
}

/// Shift a subfont's glyphs so its ascent matches a font's smaller one,
/// blanking the exposed strip and clamping the row metrics at zero.
pub(crate) fn reconcile_ascent(sf: &mut Subfont, ascent: i32) -> DrawResult<()> {
    let d = sf.ascent - ascent;
    if d <= 0 {
        return Ok(());
    }
    let b = &sf.bits;
    if let Some(conn) = b.conn() {
        b.draw(b.r, b, None, b.r.min + Point::new(0, d))?;
        b.draw(
            Rectangle::new(b.r.min.x, b.r.max.y - d, b.r.max.x, b.r.max.y),
            &conn.black_image(),
            None,
            b.r.min,
        )?;
    }
    let d8 = d.clamp(0, 255) as u8;
    for fc in sf.info.iter_mut().take(sf.n) {
        fc.top = fc.top.saturating_sub(d8);
        fc.bottom = fc.bottom.saturating_sub(d8);
    }
    sf.ascent = ascent;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_info() -> Vec<Fontchar> {
        vec![
            Fontchar { x: 0, top: 1, bottom: 9, left: -1, width: 6 },
            Fontchar { x: 5, top: 0, bottom: 10, left: 0, width: 7 },
            Fontchar { x: 12, ..Fontchar::default() },
        ]
    }

    #[test]
    fn fontchar_pack_layout() {
        let packed = pack_fontchars(&sample_info());
        assert_eq!(packed.len(), 18);
        assert_eq!(&packed[..6], &[0, 0, 1, 9, 0xFF, 6]);
        assert_eq!(unpack_fontchars(&packed), sample_info());
    }

    #[test]
    fn subfont_file_round_trip_without_display() {
        let r = Rectangle::new(0, 0, 12, 10);
        let pixels = vec![0u8; bytes_per_line(r, 1) * 10];
        let mut out = Vec::new();
        write_subfont_parts(&mut out, Pix::GREY1, r, &pixels, 10, 8, &sample_info()).unwrap();
        let sf = read_subfont(None, &mut Cursor::new(out), "sample").unwrap();
        assert_eq!(sf.n, 2);
        assert_eq!(sf.height, 10);
        assert_eq!(sf.ascent, 8);
        assert_eq!(sf.info, sample_info());
        assert_eq!(sf.bits.r, r);
    }

    #[test]
    fn builtin_covers_ascii_and_latin1() {
        let sf = Subfont::builtin(None).unwrap();
        assert_eq!(sf.n, 256);
        assert_eq!(sf.info[0].width, 8);
        assert_eq!(sf.info['A' as usize].width, 8);
        assert_eq!(sf.info[0xE9].width, 8);
        assert_eq!(sf.info[0x85].width, 0);
        assert_eq!(sf.info[256].x, 2048);
    }

    #[test]
    fn reconcile_clamps_rows() {
        let mut sf = Subfont::new(
            "tall",
            12,
            11,
            sample_info(),
            Image::detached(Rectangle::new(0, 0, 12, 12), Pix::GREY1, false),
        )
        .unwrap();
        reconcile_ascent(&mut sf, 8).unwrap();
        assert_eq!(sf.ascent, 8);
        assert_eq!(sf.info[0].top, 0);
        assert_eq!(sf.info[0].bottom, 6);
        assert_eq!(sf.info[1].bottom, 7);
    }

    #[test]
    fn last_used_slot_matches_name_and_connection() {
        let sf = Arc::new(
            Subfont::new(
                "slot-test",
                10,
                8,
                sample_info(),
                Image::detached(Rectangle::new(0, 0, 12, 10), Pix::GREY1, false),
            )
            .unwrap(),
        );
        install_subfont(sf);
        let (display, _wire) = crate::testing::recording_display();
        assert!(lookup_subfont(Some(display.conn()), "slot-test").is_none());
        // other tests share the slot, so only a hit on our name counts
        if let Some(hit) = lookup_subfont(None, "slot-test") {
            assert_eq!(hit.n, 2);
        }
    }
}
