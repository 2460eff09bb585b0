//! A software draw device.
//!
//! [`SoftDevice`] accepts the draw protocol byte stream on its data channel
//! and keeps every allocated image as an in-memory RGBA buffer. Compositing
//! (`d`), pixel loads (`y`, `Y`), read-back (`r`), the glyph cache (`i`,
//! `l`) and string drawing (`s`, `x`) are carried out; the remaining
//! commands are decoded, validated, and counted without touching pixels.
//!
//! Like the real device, a command that names an unknown image fails the
//! whole write and the rest of that buffer is dropped.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flate2::bufread::ZlibDecoder;

use nui_core::geometry::{Point, Rectangle, drawrepl};
use nui_draw::bytes::{glong, gshort};
use nui_draw::chan::{ChannelType, Pix, bytes_per_line};
use nui_draw::color::Color;
use nui_draw::display::{DisplayConfig, ScreenInfo};
use nui_draw::draw::DrawOp;
use nui_draw::{Display, DrawResult};

use crate::pixels::{CLEAR, Rgba, get_raw, pack, put_raw, quantize, unpack};

/// Largest image the device agrees to allocate, in pixels.
pub const MAX_PIXELS: i64 = 1 << 24;

type CmdResult<T> = Result<T, String>;

// ============================================================================
// Server-side state
// ============================================================================

struct SoftImage {
    chan: Pix,
    r: Rectangle,
    clipr: Rectangle,
    repl: bool,
    px: Vec<Rgba>,
}

impl SoftImage {
    fn new(chan: Pix, r: Rectangle, clipr: Rectangle, repl: bool) -> Self {
        let n = (r.dx().max(0) as usize) * (r.dy().max(0) as usize);
        Self {
            chan,
            r,
            clipr,
            repl,
            px: vec![CLEAR; n],
        }
    }

    fn index(&self, p: Point) -> Option<usize> {
        if !self.r.contains(p) {
            return None;
        }
        Some(((p.y - self.r.min.y) * self.r.dx() + (p.x - self.r.min.x)) as usize)
    }

    fn sample(&self, p: Point) -> Option<Rgba> {
        if !self.clipr.contains(p) {
            return None;
        }
        let p = if self.repl { drawrepl(self.r, p) } else { p };
        self.index(p).map(|i| self.px[i])
    }

    /// Coverage of a mask pixel: alpha when the format has it, grey level
    /// otherwise.
    fn coverage(&self, px: Rgba) -> u8 {
        if self.chan.has(ChannelType::Alpha) {
            px[3]
        } else {
            px[0]
        }
    }

    fn fill(&mut self, color: Color) {
        let c = quantize(
            self.chan,
            [color.red(), color.green(), color.blue(), color.alpha()],
        );
        self.px.fill(c);
    }
}

#[derive(Clone, Copy)]
struct CacheChar {
    r: Rectangle,
    left: i8,
    width: u8,
}

struct SoftFont {
    ascent: i32,
    chars: Vec<Option<CacheChar>>,
}

#[derive(Clone, Copy)]
struct SoftScreen {
    image: u32,
    fill: u32,
    public: bool,
}

struct DeviceState {
    client: u32,
    images: HashMap<u32, SoftImage>,
    screens: HashMap<u32, SoftScreen>,
    fonts: HashMap<u32, SoftFont>,
    names: HashMap<String, u32>,
    op: u8,
    replies: VecDeque<u8>,
    ctl: VecDeque<u8>,
    opcodes: Vec<u8>,
    refuse_allocs: usize,
}

fn composite(dst: Rgba, src: Rgba, m: u8, op: u8) -> Rgba {
    let m = u32::from(m);
    let mut out = [0u8; 4];
    if op == DrawOp::S.bits() {
        for k in 0..4 {
            out[k] = ((u32::from(src[k]) * m + u32::from(dst[k]) * (255 - m)) / 255) as u8;
        }
        return out;
    }
    let a = u32::from(src[3]) * m / 255;
    for k in 0..3 {
        out[k] = ((u32::from(src[k]) * a + u32::from(dst[k]) * (255 - a)) / 255) as u8;
    }
    out[3] = (a + u32::from(dst[3]) * (255 - a) / 255) as u8;
    out
}

fn rect_at(b: &[u8]) -> Rectangle {
    Rectangle::new(
        glong(b) as i32,
        glong(&b[4..]) as i32,
        glong(&b[8..]) as i32,
        glong(&b[12..]) as i32,
    )
}

fn point_at(b: &[u8]) -> Point {
    Point::new(glong(b) as i32, glong(&b[4..]) as i32)
}

fn need(buf: &[u8], n: usize, what: char) -> CmdResult<()> {
    if buf.len() < n {
        return Err(format!("short '{what}' command: {} of {n} bytes", buf.len()));
    }
    Ok(())
}

/// Length of a polygon coordinate stream holding `npts` points.
fn coords_len(buf: &[u8], npts: usize) -> CmdResult<usize> {
    let mut i = 0;
    for _ in 0..2 * npts {
        let b = *buf.get(i).ok_or("polygon coordinates truncated")?;
        i += if b & 0x80 != 0 { 3 } else { 1 };
    }
    if i > buf.len() {
        return Err("polygon coordinates truncated".into());
    }
    Ok(i)
}

impl DeviceState {
    fn image(&self, id: u32) -> CmdResult<&SoftImage> {
        self.images.get(&id).ok_or_else(|| format!("unknown id {id}"))
    }

    fn image_mut(&mut self, id: u32) -> CmdResult<&mut SoftImage> {
        self.images.get_mut(&id).ok_or_else(|| format!("unknown id {id}"))
    }

    fn fresh_id(&self, id: u32) -> CmdResult<()> {
        if self.images.contains_key(&id) {
            return Err(format!("image id {id} in use"));
        }
        Ok(())
    }

    fn take_op(&mut self) -> u8 {
        std::mem::replace(&mut self.op, DrawOp::SOVER_D.bits())
    }

    /// Composite `src` through `mask` onto `r` of `dst`.
    #[allow(clippy::too_many_arguments)]
    fn draw(
        &mut self,
        dst: u32,
        r: Rectangle,
        clip: Rectangle,
        src: u32,
        sp: Point,
        mask: u32,
        mp: Point,
        op: u8,
    ) -> CmdResult<()> {
        let d = self.image(dst)?;
        let area = r.intersection(&clip).intersection(&d.clipr).intersection(&d.r);
        let s = self.image(src)?;
        let m = self.image(mask)?;
        let mut writes = Vec::new();
        for y in area.min.y..area.max.y {
            for x in area.min.x..area.max.x {
                let p = Point::new(x, y);
                let delta = p - r.min;
                if let (Some(spx), Some(mpx)) = (s.sample(sp + delta), m.sample(mp + delta)) {
                    writes.push((p, spx, m.coverage(mpx)));
                }
            }
        }
        let d = self.image_mut(dst)?;
        for (p, spx, cov) in writes {
            if let Some(i) = d.index(p) {
                d.px[i] = quantize(d.chan, composite(d.px[i], spx, cov, op));
            }
        }
        Ok(())
    }

    /// Execute one command; returns the number of bytes it used.
    fn execute(&mut self, buf: &[u8], opaque: u32) -> CmdResult<usize> {
        let cmd = buf[0];
        self.opcodes.push(cmd);
        let c = cmd as char;
        match cmd {
            b'b' => {
                need(buf, 51, c)?;
                let id = glong(&buf[1..]);
                let screen = glong(&buf[5..]);
                let chan = Pix(glong(&buf[10..]));
                let repl = buf[14] != 0;
                let r = rect_at(&buf[15..]);
                let clipr = rect_at(&buf[31..]);
                let color = Color(glong(&buf[47..]));
                self.fresh_id(id)?;
                if screen != 0 && !self.screens.contains_key(&screen) {
                    return Err(format!("unknown screen {screen}"));
                }
                if chan.depth() == 0 {
                    return Err(format!("bad channel {:#x}", chan.0));
                }
                let area = i64::from(r.dx()) * i64::from(r.dy());
                if r.is_bad() || area > MAX_PIXELS {
                    return Err(format!("cannot allocate {r:?}"));
                }
                if self.refuse_allocs > 0 {
                    self.refuse_allocs -= 1;
                    return Err("allocation refused".into());
                }
                let mut img = SoftImage::new(chan, r, clipr, repl);
                if color != Color::NOFILL {
                    img.fill(color);
                }
                self.images.insert(id, img);
                Ok(51)
            }
            b'f' => {
                need(buf, 5, c)?;
                let id = glong(&buf[1..]);
                if id == 0 || self.images.remove(&id).is_none() {
                    return Err(format!("cannot free id {id}"));
                }
                self.fonts.remove(&id);
                self.names.retain(|_, v| *v != id);
                Ok(5)
            }
            b'A' => {
                need(buf, 14, c)?;
                let id = glong(&buf[1..]);
                let image = glong(&buf[5..]);
                let fill = glong(&buf[9..]);
                self.image(image)?;
                self.image(fill)?;
                if self.screens.contains_key(&id) {
                    return Err(format!("screen id {id} in use"));
                }
                let public = buf[13] != 0;
                self.screens.insert(id, SoftScreen { image, fill, public });
                Ok(14)
            }
            b'F' => {
                need(buf, 5, c)?;
                let id = glong(&buf[1..]);
                self.screens
                    .remove(&id)
                    .ok_or_else(|| format!("unknown screen {id}"))?;
                Ok(5)
            }
            b'S' => {
                need(buf, 9, c)?;
                let id = glong(&buf[1..]);
                match self.screens.get(&id) {
                    Some(s) if s.public => Ok(9),
                    _ => Err(format!("no public screen {id}")),
                }
            }
            b'N' => {
                need(buf, 7, c)?;
                let id = glong(&buf[1..]);
                let publish = buf[5] != 0;
                let n = buf[6] as usize;
                need(buf, 7 + n, c)?;
                let name = String::from_utf8_lossy(&buf[7..7 + n]).into_owned();
                self.image(id)?;
                if publish {
                    self.names.insert(name, id);
                } else if self.names.get(&name) == Some(&id) {
                    self.names.remove(&name);
                } else {
                    return Err(format!("image {id} is not named {name:?}"));
                }
                Ok(7 + n)
            }
            b'n' => {
                need(buf, 6, c)?;
                let id = glong(&buf[1..]);
                let n = buf[5] as usize;
                need(buf, 6 + n, c)?;
                let name = String::from_utf8_lossy(&buf[6..6 + n]).into_owned();
                self.fresh_id(id)?;
                let src = *self
                    .names
                    .get(&name)
                    .ok_or_else(|| format!("no image named {name:?}"))?;
                let img = self.image(src)?;
                let info = ScreenInfo {
                    client: self.client,
                    image_id: id,
                    chan: img.chan,
                    repl: img.repl,
                    r: img.r,
                    clipr: img.clipr,
                };
                let copy = SoftImage {
                    chan: img.chan,
                    r: img.r,
                    clipr: img.clipr,
                    repl: img.repl,
                    px: img.px.clone(),
                };
                self.images.insert(id, copy);
                self.ctl.extend(info.format());
                Ok(6 + n)
            }
            b't' => {
                need(buf, 4, c)?;
                let n = gshort(&buf[2..]) as usize;
                need(buf, 4 + 4 * n, c)?;
                for k in 0..n {
                    self.image(glong(&buf[4 + 4 * k..]))?;
                }
                Ok(4 + 4 * n)
            }
            b'o' => {
                need(buf, 21, c)?;
                let id = glong(&buf[1..]);
                let log = point_at(&buf[5..]);
                let img = self.image_mut(id)?;
                let delta = log - img.r.min;
                img.r = img.r.add_pt(delta);
                img.clipr = img.clipr.add_pt(delta);
                Ok(21)
            }
            b'c' => {
                need(buf, 22, c)?;
                let id = glong(&buf[1..]);
                let img = self.image_mut(id)?;
                img.repl = buf[5] != 0;
                img.clipr = rect_at(&buf[6..]);
                Ok(22)
            }
            b'O' => {
                need(buf, 2, c)?;
                self.op = buf[1];
                Ok(2)
            }
            b'd' => {
                need(buf, 45, c)?;
                let op = self.take_op();
                self.draw(
                    glong(&buf[1..]),
                    rect_at(&buf[13..]),
                    Rectangle::HUGE,
                    glong(&buf[5..]),
                    point_at(&buf[29..]),
                    glong(&buf[9..]),
                    point_at(&buf[37..]),
                    op,
                )?;
                Ok(45)
            }
            b'L' | b'e' | b'E' => {
                need(buf, 45, c)?;
                self.take_op();
                self.image(glong(&buf[1..]))?;
                let src = if cmd == b'L' { &buf[33..] } else { &buf[5..] };
                self.image(glong(src))?;
                Ok(45)
            }
            b'p' | b'P' => {
                need(buf, 31, c)?;
                self.take_op();
                self.image(glong(&buf[1..]))?;
                self.image(glong(&buf[19..]))?;
                let npts = gshort(&buf[5..]) as usize + 1;
                Ok(31 + coords_len(&buf[31..], npts)?)
            }
            b'y' | b'Y' => {
                need(buf, 21, c)?;
                let id = glong(&buf[1..]);
                let r = rect_at(&buf[5..]);
                let img = self.image(id)?;
                if !img.r.contains_rect(&r) || r.is_empty() {
                    return Err(format!("load: bad rectangle {r:?}"));
                }
                let depth = img.chan.depth();
                let bpl = bytes_per_line(r, depth);
                let n = bpl * r.dy() as usize;
                let (data, used) = if cmd == b'y' {
                    need(buf, 21 + n, c)?;
                    (buf[21..21 + n].to_vec(), n)
                } else {
                    let mut z = ZlibDecoder::new(&buf[21..]);
                    let mut data = vec![0u8; n];
                    z.read_exact(&mut data)
                        .map_err(|e| format!("bad compressed data: {e}"))?;
                    let mut rest = Vec::new();
                    z.read_to_end(&mut rest)
                        .map_err(|e| format!("bad compressed data: {e}"))?;
                    if !rest.is_empty() {
                        return Err("compressed block has excess rows".into());
                    }
                    (data, z.total_in() as usize)
                };
                let img = self.image_mut(id)?;
                for (row, y) in data.chunks(bpl).zip(r.min.y..r.max.y) {
                    for (i, x) in (r.min.x..r.max.x).enumerate() {
                        let v = get_raw(row, r.min.x, depth, i);
                        if let Some(k) = img.index(Point::new(x, y)) {
                            img.px[k] = unpack(img.chan, v);
                        }
                    }
                }
                Ok(21 + used)
            }
            b'r' => {
                need(buf, 21, c)?;
                let id = glong(&buf[1..]);
                let r = rect_at(&buf[5..]);
                let img = self.image(id)?;
                if !img.r.contains_rect(&r) || r.is_empty() {
                    return Err(format!("unload: bad rectangle {r:?}"));
                }
                let depth = img.chan.depth();
                let bpl = bytes_per_line(r, depth);
                let mut out = vec![0u8; bpl * r.dy() as usize];
                for (row, y) in out.chunks_mut(bpl).zip(r.min.y..r.max.y) {
                    for (i, x) in (r.min.x..r.max.x).enumerate() {
                        if let Some(k) = img.index(Point::new(x, y)) {
                            put_raw(row, r.min.x, depth, i, pack(img.chan, img.px[k]));
                        }
                    }
                }
                self.replies.extend(out);
                Ok(21)
            }
            b'i' => {
                need(buf, 10, c)?;
                let id = glong(&buf[1..]);
                let n = glong(&buf[5..]) as usize;
                self.image(id)?;
                self.fonts.insert(
                    id,
                    SoftFont {
                        ascent: i32::from(buf[9]),
                        chars: vec![None; n],
                    },
                );
                Ok(10)
            }
            b'l' => {
                need(buf, 37, c)?;
                let cache = glong(&buf[1..]);
                let src = glong(&buf[5..]);
                let index = gshort(&buf[9..]) as usize;
                let r = rect_at(&buf[11..]);
                let sp = point_at(&buf[27..]);
                let left = buf[35] as i8;
                let width = buf[36];
                let slots = self
                    .fonts
                    .get(&cache)
                    .map(|f| f.chars.len())
                    .ok_or_else(|| format!("image {cache} is not a font cache"))?;
                if index >= slots {
                    return Err(format!("glyph index {index} out of range"));
                }
                self.draw(cache, r, Rectangle::HUGE, src, sp, opaque, Point::ZERO, DrawOp::S.bits())?;
                if let Some(f) = self.fonts.get_mut(&cache) {
                    f.chars[index] = Some(CacheChar { r, left, width });
                }
                Ok(37)
            }
            b's' | b'x' => {
                need(buf, 47, c)?;
                let op = self.take_op();
                let dst = glong(&buf[1..]);
                let src = glong(&buf[5..]);
                let cache = glong(&buf[9..]);
                let mut p = point_at(&buf[13..]);
                let clipr = rect_at(&buf[21..]);
                let mut sp = point_at(&buf[37..]);
                let n = gshort(&buf[45..]) as usize;
                let mut at = 47;
                let bg = if cmd == b'x' {
                    need(buf, 59, c)?;
                    at = 59;
                    Some((glong(&buf[47..]), point_at(&buf[51..])))
                } else {
                    None
                };
                need(buf, at + 2 * n, c)?;
                let font = self
                    .fonts
                    .get(&cache)
                    .ok_or_else(|| format!("image {cache} is not a font cache"))?;
                let ascent = font.ascent;
                let mut glyphs = Vec::with_capacity(n);
                for k in 0..n {
                    let i = gshort(&buf[at + 2 * k..]) as usize;
                    let ch = font
                        .chars
                        .get(i)
                        .copied()
                        .flatten()
                        .ok_or_else(|| format!("glyph index {i} not loaded"))?;
                    glyphs.push(ch);
                }
                let height = self.image(cache)?.r.dy();
                if let Some((bg, bgp)) = bg {
                    let total: i32 = glyphs.iter().map(|g| i32::from(g.width)).sum();
                    let r = Rectangle::new(p.x, p.y - ascent, p.x + total, p.y - ascent + height);
                    self.draw(dst, r, clipr, bg, bgp, opaque, Point::ZERO, DrawOp::SOVER_D.bits())?;
                }
                for g in glyphs {
                    let min = Point::new(p.x + i32::from(g.left), p.y - (ascent - g.r.min.y));
                    let r = Rectangle::from_points(min, min + g.r.size());
                    let sp1 = sp + Point::new(i32::from(g.left), g.r.min.y);
                    self.draw(dst, r, clipr, src, sp1, cache, g.r.min, op)?;
                    p.x += i32::from(g.width);
                    sp.x += i32::from(g.width);
                }
                Ok(at + 2 * n)
            }
            b'v' => Ok(1),
            other => Err(format!("unknown draw command {:?}", other as char)),
        }
    }

    /// Id of a replicated opaque mask, allocating one on first use.
    fn opaque_mask(&mut self) -> u32 {
        const OPAQUE_ID: u32 = u32::MAX;
        self.images.entry(OPAQUE_ID).or_insert_with(|| {
            let mut img = SoftImage::new(
                Pix::GREY1,
                Rectangle::new(0, 0, 1, 1),
                Rectangle::HUGE,
                true,
            );
            img.fill(Color::WHITE);
            img
        });
        OPAQUE_ID
    }

    fn write_commands(&mut self, mut buf: &[u8]) -> CmdResult<()> {
        let opaque = self.opaque_mask();
        while !buf.is_empty() {
            let n = self.execute(buf, opaque)?;
            buf = &buf[n..];
        }
        Ok(())
    }
}

// ============================================================================
// Device handle and channels
// ============================================================================

/// A headless draw device. Clones share the same state.
#[derive(Clone)]
pub struct SoftDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SoftDevice {
    /// A device whose screen is `r` in `XRGB32`, painted white.
    pub fn new(r: Rectangle) -> Self {
        Self::with_chan(r, Pix::XRGB32)
    }

    /// A device with the given screen format.
    pub fn with_chan(r: Rectangle, chan: Pix) -> Self {
        let mut screen = SoftImage::new(chan, r, r, false);
        screen.fill(Color::WHITE);
        let mut images = HashMap::new();
        images.insert(0, screen);
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                client: 1,
                images,
                screens: HashMap::new(),
                fonts: HashMap::new(),
                names: HashMap::new(),
                op: DrawOp::SOVER_D.bits(),
                replies: VecDeque::new(),
                ctl: VecDeque::new(),
                opcodes: Vec::new(),
                refuse_allocs: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn screen_info(st: &DeviceState) -> Option<ScreenInfo> {
        st.images.get(&0).map(|s| ScreenInfo {
            client: st.client,
            image_id: 0,
            chan: s.chan,
            repl: false,
            r: s.r,
            clipr: s.clipr,
        })
    }

    /// Open a display on this device.
    pub fn open_display(&self) -> DrawResult<Display> {
        self.open_display_with(DisplayConfig::default())
    }

    /// Open a display with explicit tunables.
    pub fn open_display_with(&self, config: DisplayConfig) -> DrawResult<Display> {
        {
            let mut st = self.lock();
            if let Some(info) = Self::screen_info(&st) {
                st.ctl.extend(info.format());
            }
        }
        Display::from_channels(
            Box::new(CtlChannel(self.clone())),
            Box::new(DataChannel(self.clone())),
            None,
            config,
        )
    }

    /// Resize the screen and queue a fresh ctl line, as a window system
    /// does before signalling a resize.
    pub fn resize(&self, r: Rectangle) {
        let mut st = self.lock();
        if let Some(screen) = st.images.get_mut(&0) {
            let mut fresh = SoftImage::new(screen.chan, r, r, false);
            fresh.fill(Color::WHITE);
            *screen = fresh;
        }
        if let Some(info) = Self::screen_info(&st) {
            st.ctl.extend(info.format());
        }
    }

    /// Refuse the next `n` image allocations.
    pub fn refuse_allocations(&self, n: usize) {
        self.lock().refuse_allocs = n;
    }

    /// Color of one pixel of image `id`, ignoring clipping and replication.
    pub fn pixel(&self, id: u32, p: Point) -> Option<Color> {
        let st = self.lock();
        let img = st.images.get(&id)?;
        let px = img.px[img.index(p)?];
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }

    /// Color of one screen pixel.
    pub fn screen_pixel(&self, p: Point) -> Option<Color> {
        self.pixel(0, p)
    }

    /// Check if every pixel of `r` in image `id` has color `c`.
    pub fn region_is(&self, id: u32, r: Rectangle, c: Color) -> bool {
        (r.min.y..r.max.y)
            .all(|y| (r.min.x..r.max.x).all(|x| self.pixel(id, Point::new(x, y)) == Some(c)))
    }

    /// Count pixels of `r` in image `id` that differ from `c`.
    pub fn count_not(&self, id: u32, r: Rectangle, c: Color) -> usize {
        (r.min.y..r.max.y)
            .flat_map(|y| (r.min.x..r.max.x).map(move |x| Point::new(x, y)))
            .filter(|&p| self.pixel(id, p).is_some_and(|px| px != c))
            .count()
    }

    /// Opcodes executed so far, in order.
    pub fn opcodes(&self) -> Vec<u8> {
        self.lock().opcodes.clone()
    }

    /// How many times `op` was executed.
    pub fn count(&self, op: u8) -> usize {
        self.lock().opcodes.iter().filter(|&&c| c == op).count()
    }

    /// Forget the opcode history.
    pub fn clear_opcodes(&self) {
        self.lock().opcodes.clear();
    }

    /// Number of live images, the screen included.
    pub fn live_images(&self) -> usize {
        let st = self.lock();
        st.images.keys().filter(|&&id| id != u32::MAX).count()
    }

    /// Check if an image id is allocated.
    pub fn has_image(&self, id: u32) -> bool {
        self.lock().images.contains_key(&id)
    }

    /// Bounds of image `id`.
    pub fn image_rect(&self, id: u32) -> Option<Rectangle> {
        self.lock().images.get(&id).map(|i| i.r)
    }

    /// Number of screens allocated.
    pub fn screens(&self) -> usize {
        self.lock().screens.len()
    }

    /// Ids of the images backing each screen.
    pub fn screen_images(&self) -> Vec<(u32, u32)> {
        self.lock()
            .screens
            .values()
            .map(|s| (s.image, s.fill))
            .collect()
    }
}

impl std::fmt::Debug for SoftDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.lock();
        f.debug_struct("SoftDevice")
            .field("images", &st.images.len())
            .field("screens", &st.screens.len())
            .field("fonts", &st.fonts.len())
            .finish()
    }
}

struct DataChannel(SoftDevice);

impl Write for DataChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut st = self.0.lock();
        st.write_commands(buf)
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidData, msg))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for DataChannel {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut st = self.0.lock();
        let n = out.len().min(st.replies.len());
        for (slot, b) in out.iter_mut().zip(st.replies.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

struct CtlChannel(SoftDevice);

impl Read for CtlChannel {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut st = self.0.lock();
        let n = out.len().min(st.ctl.len());
        for (slot, b) in out.iter_mut().zip(st.ctl.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

impl Write for CtlChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
