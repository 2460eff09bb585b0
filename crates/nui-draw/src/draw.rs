//! Drawing primitives.
//!
//! Each primitive packs one command into the display buffer. Nothing is
//! written until the buffer fills or someone flushes, except for pixel
//! loads and reads, which flush on their own.

use std::io::Write as _;

use bitflags::bitflags;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use smallvec::SmallVec;

use nui_core::geometry::{Point, Rectangle};

use crate::bytes::Packer;
use crate::chan::bytes_per_line;
use crate::display::DrawConn;
use crate::error::{DrawError, DrawResult};
use crate::image::Image;

/// Bytes kept free in the buffer when chunking pixel loads.
const LOAD_SLACK: usize = 64;

/// Largest pixel block requested per `r` command.
const UNLOAD_CHUNK: usize = 8000;

bitflags! {
    /// Porter-Duff compositing operator.
    ///
    /// Built from four regions: source inside destination, destination
    /// inside source, source outside destination, destination outside
    /// source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DrawOp: u8 {
        const CLEAR = 0;
        const SIN_D = 8;
        const DIN_S = 4;
        const SOUT_D = 2;
        const DOUT_S = 1;
        const S = Self::SIN_D.bits() | Self::SOUT_D.bits();
        const SOVER_D = Self::SIN_D.bits() | Self::SOUT_D.bits() | Self::DOUT_S.bits();
        const SATOP_D = Self::SIN_D.bits() | Self::DOUT_S.bits();
        const SXOR_D = Self::SOUT_D.bits() | Self::DOUT_S.bits();
        const D = Self::DIN_S.bits() | Self::DOUT_S.bits();
        const DOVER_S = Self::DIN_S.bits() | Self::DOUT_S.bits() | Self::SOUT_D.bits();
        const DATOP_S = Self::DIN_S.bits() | Self::SOUT_D.bits();
    }
}

impl Default for DrawOp {
    fn default() -> Self {
        DrawOp::SOVER_D
    }
}

/// Line end style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum End {
    #[default]
    Square,
    Disc,
    /// Arrow head: `a` is the distance from tip to back along the line, `b`
    /// the distance along it to the barb tips, `c` the barb half-width.
    Arrow { a: u32, b: u32, c: u32 },
}

impl End {
    /// The encoded 32-bit end value.
    pub const fn code(self) -> u32 {
        match self {
            End::Square => 0,
            End::Disc => 1,
            End::Arrow { a, b, c } => 2 | (a << 5) | (b << 14) | (c << 23),
        }
    }

    /// Arrow with the conventional proportions.
    pub const fn arrow() -> End {
        End::Arrow { a: 8, b: 10, c: 2 }
    }
}

/// Append `newx` to an encoded polygon coordinate stream: one byte when the
/// delta fits in 7 signed bits, else three bytes carrying the absolute value.
fn addcoord(out: &mut SmallVec<[u8; 64]>, oldx: i32, newx: i32) {
    let dx = newx.wrapping_sub(oldx);
    if (-0x40..=0x3F).contains(&dx) {
        out.push((dx & 0x7F) as u8);
    } else {
        out.push(0x80 | (newx & 0x7F) as u8);
        out.push((newx >> 7) as u8);
        out.push((newx >> 15) as u8);
    }
}

fn encode_points(pts: &[Point]) -> SmallVec<[u8; 64]> {
    let mut out = SmallVec::new();
    let mut o = Point::ZERO;
    for &p in pts {
        addcoord(&mut out, o.x, p.x);
        addcoord(&mut out, o.y, p.y);
        o = p;
    }
    out
}

impl Image {
    /// The connection to emit on, plus a check that `others` live on it too.
    fn emit_conn(&self, others: &[&Image]) -> Option<&DrawConn> {
        let conn = self.conn.as_ref()?;
        for o in others {
            if let Some(oc) = &o.conn
                && !oc.same(conn)
            {
                return None;
            }
        }
        Some(conn)
    }

    /// Composite `src` through `mask` onto `r`, aligning `r.min` with `p` in
    /// both. A missing mask means fully opaque.
    pub fn draw(&self, r: Rectangle, src: &Image, mask: Option<&Image>, p: Point) -> DrawResult<()> {
        self.gendrawop(r, src, p, mask, p, DrawOp::SOVER_D)
    }

    /// [`draw`](Self::draw) with an explicit operator.
    pub fn drawop(
        &self,
        r: Rectangle,
        src: &Image,
        mask: Option<&Image>,
        p: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        self.gendrawop(r, src, p, mask, p, op)
    }

    /// General composite: `r.min` aligns with `p0` in `src` and `p1` in
    /// `mask`.
    pub fn gendraw(
        &self,
        r: Rectangle,
        src: &Image,
        p0: Point,
        mask: Option<&Image>,
        p1: Point,
    ) -> DrawResult<()> {
        self.gendrawop(r, src, p0, mask, p1, DrawOp::SOVER_D)
    }

    pub fn gendrawop(
        &self,
        r: Rectangle,
        src: &Image,
        p0: Point,
        mask: Option<&Image>,
        p1: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        let others: SmallVec<[&Image; 2]> = std::iter::once(src).chain(mask).collect();
        let Some(conn) = self.emit_conn(&others) else {
            return Ok(());
        };
        let mut c = conn.lock();
        let mask_id = mask.map_or(c.opaque, |m| m.id);
        let b = c.bufimage_op(1 + 4 + 4 + 4 + 16 + 8 + 8, op)?;
        Packer::new(b)
            .u8(b'd')
            .u32(self.id)
            .u32(src.id)
            .u32(mask_id)
            .rect(r)
            .point(p0)
            .point(p1);
        Ok(())
    }

    /// Paint a border of thickness `width` just inside `r`; a negative
    /// width paints outside it.
    pub fn border(&self, r: Rectangle, width: i32, src: &Image, sp: Point) -> DrawResult<()> {
        self.borderop(r, width, src, sp, DrawOp::SOVER_D)
    }

    pub fn borderop(
        &self,
        r: Rectangle,
        width: i32,
        src: &Image,
        sp: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        let (r, i, sp) = if width < 0 {
            (r.inset(width), -width, sp + Point::new(width, width))
        } else {
            (r, width, sp)
        };
        let (x0, y0, x1, y1) = (r.min.x, r.min.y, r.max.x, r.max.y);
        self.drawop(Rectangle::new(x0, y0, x1, y0 + i), src, None, sp, op)?;
        self.gendrawop(
            Rectangle::new(x0, y1 - i, x1, y1),
            src,
            Point::new(sp.x, sp.y + r.dy() - i),
            None,
            Point::ZERO,
            op,
        )?;
        self.gendrawop(
            Rectangle::new(x0, y0 + i, x0 + i, y1 - i),
            src,
            Point::new(sp.x, sp.y + i),
            None,
            Point::ZERO,
            op,
        )?;
        self.gendrawop(
            Rectangle::new(x1 - i, y0 + i, x1, y1 - i),
            src,
            Point::new(sp.x + r.dx() - i, sp.y + i),
            None,
            Point::ZERO,
            op,
        )
    }

    /// Line from `p0` to `p1` of half-width `radius`.
    #[allow(clippy::too_many_arguments)]
    pub fn line(
        &self,
        p0: Point,
        p1: Point,
        end0: End,
        end1: End,
        radius: i32,
        src: &Image,
        sp: Point,
    ) -> DrawResult<()> {
        self.lineop(p0, p1, end0, end1, radius, src, sp, DrawOp::SOVER_D)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn lineop(
        &self,
        p0: Point,
        p1: Point,
        end0: End,
        end1: End,
        radius: i32,
        src: &Image,
        sp: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        let Some(conn) = self.emit_conn(&[src]) else {
            return Ok(());
        };
        let mut c = conn.lock();
        let b = c.bufimage_op(1 + 4 + 8 + 8 + 4 + 4 + 4 + 4 + 8, op)?;
        Packer::new(b)
            .u8(b'L')
            .u32(self.id)
            .point(p0)
            .point(p1)
            .u32(end0.code())
            .u32(end1.code())
            .i32(radius)
            .u32(src.id)
            .point(sp);
        Ok(())
    }

    /// Open polyline through `pts`.
    pub fn poly(
        &self,
        pts: &[Point],
        end0: End,
        end1: End,
        radius: i32,
        src: &Image,
        sp: Point,
    ) -> DrawResult<()> {
        self.polyop(pts, end0, end1, radius, src, sp, DrawOp::SOVER_D)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn polyop(
        &self,
        pts: &[Point],
        end0: End,
        end1: End,
        radius: i32,
        src: &Image,
        sp: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        self.polycmd(b'p', pts, end0.code(), end1.code(), radius, src, sp, op)
    }

    /// Filled polygon. `wind` selects the fill rule: 0 for even-odd,
    /// nonzero for the winding rule.
    pub fn fillpoly(&self, pts: &[Point], wind: i32, src: &Image, sp: Point) -> DrawResult<()> {
        self.fillpolyop(pts, wind, src, sp, DrawOp::SOVER_D)
    }

    pub fn fillpolyop(
        &self,
        pts: &[Point],
        wind: i32,
        src: &Image,
        sp: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        self.polycmd(b'P', pts, wind as u32, 0, 0, src, sp, op)
    }

    #[allow(clippy::too_many_arguments)]
    fn polycmd(
        &self,
        cmd: u8,
        pts: &[Point],
        e0: u32,
        e1: u32,
        radius: i32,
        src: &Image,
        sp: Point,
        op: DrawOp,
    ) -> DrawResult<()> {
        if pts.is_empty() {
            return Ok(());
        }
        let Some(conn) = self.emit_conn(&[src]) else {
            return Ok(());
        };
        let coords = encode_points(pts);
        let mut c = conn.lock();
        let b = c.bufimage_op(1 + 4 + 2 + 4 + 4 + 4 + 4 + 8 + coords.len(), op)?;
        Packer::new(b)
            .u8(cmd)
            .u32(self.id)
            .u16((pts.len() - 1) as u16)
            .u32(e0)
            .u32(e1)
            .i32(radius)
            .u32(src.id)
            .point(sp)
            .bytes(&coords);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn ellipse_cmd(
        &self,
        cmd: u8,
        c0: Point,
        a: i32,
        b: i32,
        thick: i32,
        src: &Image,
        sp: Point,
        alpha: u32,
        phi: i32,
        op: DrawOp,
    ) -> DrawResult<()> {
        let Some(conn) = self.emit_conn(&[src]) else {
            return Ok(());
        };
        let mut c = conn.lock();
        let buf = c.bufimage_op(1 + 4 + 4 + 8 + 4 + 4 + 4 + 8 + 4 + 4, op)?;
        Packer::new(buf)
            .u8(cmd)
            .u32(self.id)
            .u32(src.id)
            .point(c0)
            .i32(a)
            .i32(b)
            .i32(thick)
            .point(sp)
            .u32(alpha)
            .i32(phi);
        Ok(())
    }

    /// Ellipse outline centred at `c` with semi-axes `a`, `b`; the line is
    /// `2 * thick + 1` pixels wide.
    pub fn ellipse(&self, c: Point, a: i32, b: i32, thick: i32, src: &Image, sp: Point) -> DrawResult<()> {
        self.ellipse_cmd(b'e', c, a, b, thick, src, sp, 0, 0, DrawOp::SOVER_D)
    }

    pub fn fill_ellipse(&self, c: Point, a: i32, b: i32, src: &Image, sp: Point) -> DrawResult<()> {
        self.ellipse_cmd(b'E', c, a, b, 0, src, sp, 0, 0, DrawOp::SOVER_D)
    }

    /// Arc of an ellipse from angle `alpha` sweeping `phi`, both in
    /// 64ths of a degree.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &self,
        c: Point,
        a: i32,
        b: i32,
        thick: i32,
        src: &Image,
        sp: Point,
        alpha: i32,
        phi: i32,
    ) -> DrawResult<()> {
        self.ellipse_cmd(
            b'e',
            c,
            a,
            b,
            thick,
            src,
            sp,
            (alpha as u32) | 1 << 31,
            phi,
            DrawOp::SOVER_D,
        )
    }

    /// Filled pie slice; angles as for [`arc`](Self::arc).
    #[allow(clippy::too_many_arguments)]
    pub fn fill_arc(
        &self,
        c: Point,
        a: i32,
        b: i32,
        src: &Image,
        sp: Point,
        alpha: i32,
        phi: i32,
    ) -> DrawResult<()> {
        self.ellipse_cmd(
            b'E',
            c,
            a,
            b,
            0,
            src,
            sp,
            (alpha as u32) | 1 << 31,
            phi,
            DrawOp::SOVER_D,
        )
    }

    fn check_pixel_rect(&self, r: Rectangle, data_len: usize, what: &str) -> DrawResult<usize> {
        if !self.r.contains_rect(&r) || r.is_empty() {
            return Err(DrawError::Config(format!("{what}: bad rectangle {r:?}")));
        }
        let bpl = bytes_per_line(r, self.depth);
        let need = bpl * r.dy() as usize;
        if data_len < need {
            return Err(DrawError::Config(format!(
                "{what}: need {need} bytes, have {data_len}"
            )));
        }
        Ok(bpl)
    }

    /// Replace the pixels of `r` with raw rows from `data`. Returns the
    /// number of bytes consumed.
    pub fn load(&self, r: Rectangle, data: &[u8]) -> DrawResult<usize> {
        let bpl = self.check_pixel_rect(r, data.len(), "load")?;
        let Some(conn) = &self.conn else {
            return Ok(bpl * r.dy() as usize);
        };
        let mut c = conn.lock();
        let chunk = c.bufsize().saturating_sub(LOAD_SLACK);
        let mut r = r;
        let mut used = 0;
        while r.min.y < r.max.y {
            let dy = (r.dy() as usize).min(chunk / bpl);
            if dy == 0 {
                return Err(DrawError::Config(format!(
                    "load: {bpl}-byte rows do not fit the buffer"
                )));
            }
            let n = dy * bpl;
            let part = Rectangle::new(r.min.x, r.min.y, r.max.x, r.min.y + dy as i32);
            let b = c.bufimage(21 + n)?;
            Packer::new(b)
                .u8(b'y')
                .u32(self.id)
                .rect(part)
                .bytes(&data[used..used + n]);
            used += n;
            r.min.y += dy as i32;
        }
        c.flush(false)?;
        Ok(used)
    }

    /// Like [`load`](Self::load), compressing each block on the wire. Each
    /// `Y` command carries one complete zlib stream covering whole rows.
    pub fn cload(&self, r: Rectangle, data: &[u8]) -> DrawResult<usize> {
        let bpl = self.check_pixel_rect(r, data.len(), "cload")?;
        let Some(conn) = &self.conn else {
            return Ok(bpl * r.dy() as usize);
        };
        let chunk = conn.bufsize().saturating_sub(LOAD_SLACK);
        let mut r = r;
        let mut used = 0;
        while r.min.y < r.max.y {
            let mut dy = (r.dy() as usize).min(chunk / bpl);
            let packed = loop {
                if dy == 0 {
                    return Err(DrawError::Config(format!(
                        "cload: {bpl}-byte rows do not fit the buffer"
                    )));
                }
                let z = compress(&data[used..used + dy * bpl])?;
                if 21 + z.len() <= chunk {
                    break z;
                }
                dy /= 2;
            };
            let part = Rectangle::new(r.min.x, r.min.y, r.max.x, r.min.y + dy as i32);
            let mut c = conn.lock();
            let b = c.bufimage(21 + packed.len())?;
            Packer::new(b).u8(b'Y').u32(self.id).rect(part).bytes(&packed);
            used += dy * bpl;
            r.min.y += dy as i32;
        }
        conn.flush(false)?;
        Ok(used)
    }

    /// Read back the pixels of `r` into `out`. Returns the number of bytes
    /// stored.
    pub fn unload(&self, r: Rectangle, out: &mut [u8]) -> DrawResult<usize> {
        let bpl = self.check_pixel_rect(r, out.len(), "unload")?;
        let Some(conn) = &self.conn else {
            return Err(DrawError::Config("unload: image is detached".into()));
        };
        let rows = UNLOAD_CHUNK / bpl;
        if rows == 0 {
            return Err(DrawError::Config(format!(
                "unload: {bpl}-byte rows are too wide"
            )));
        }
        let mut c = conn.lock();
        let mut r = r;
        let mut got = 0;
        while r.min.y < r.max.y {
            let dy = rows.min(r.dy() as usize);
            let part = Rectangle::new(r.min.x, r.min.y, r.max.x, r.min.y + dy as i32);
            let b = c.bufimage(1 + 4 + 16)?;
            Packer::new(b).u8(b'r').u32(self.id).rect(part);
            c.flush(false)?;
            let want = got + dy * bpl;
            while got < want {
                let n = c.read_data(&mut out[got..want])?;
                if n == 0 {
                    return Err(DrawError::Protocol(format!(
                        "unload: short reply, {got} of {want} bytes"
                    )));
                }
                got += n;
            }
            r.min.y += dy as i32;
        }
        Ok(got)
    }
}

pub(crate) fn compress(data: &[u8]) -> DrawResult<Vec<u8>> {
    let mut z = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::default());
    z.write_all(data)?;
    Ok(z.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::glong;
    use crate::chan::Pix;
    use crate::color::Color;
    use crate::testing::recording_display;

    #[test]
    fn op_values() {
        assert_eq!(DrawOp::SOVER_D.bits(), 11);
        assert_eq!(DrawOp::S.bits(), 10);
        assert_eq!(DrawOp::CLEAR.bits(), 0);
        assert_eq!(DrawOp::DOVER_S.bits(), 7);
        assert_eq!(DrawOp::default(), DrawOp::SOVER_D);
    }

    #[test]
    fn end_codes() {
        assert_eq!(End::Square.code(), 0);
        assert_eq!(End::Disc.code(), 1);
        assert_eq!(End::Arrow { a: 1, b: 1, c: 1 }.code(), 2 | 32 | (1 << 14) | (1 << 23));
    }

    #[test]
    fn coords_short_and_long() {
        let v = encode_points(&[Point::new(3, -2), Point::new(500, -2)]);
        // 3, -2, then x jumps by 497 (long form), y unchanged
        assert_eq!(&v[..2], &[3, 0x7E]);
        assert_eq!(v[2], 0x80 | (500 & 0x7F) as u8);
        assert_eq!(v[3], (500 >> 7) as u8);
        assert_eq!(v[4], 0);
        assert_eq!(v[5], 0);
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn draw_packs_45_bytes() {
        let (d, wire) = recording_display();
        let img = d
            .alloc_image(Rectangle::new(0, 0, 4, 4), Pix::RGB24, false, Color::RED)
            .unwrap();
        wire.take();
        d.image
            .draw(Rectangle::new(1, 2, 3, 4), &img, None, Point::ZERO)
            .unwrap();
        d.conn().flush(false).unwrap();
        let out = wire.take();
        assert_eq!(out.len(), 45);
        assert_eq!(out[0], b'd');
        assert_eq!(glong(&out[1..]), 0);
        assert_eq!(glong(&out[5..]), img.id);
        assert_eq!(glong(&out[9..]), d.white.id);
    }

    #[test]
    fn non_default_op_gets_prefix() {
        let (d, wire) = recording_display();
        d.image
            .drawop(Rectangle::new(0, 0, 1, 1), &d.black, None, Point::ZERO, DrawOp::S)
            .unwrap();
        d.conn().flush(false).unwrap();
        let out = wire.take();
        assert_eq!(&out[..3], &[b'O', 10, b'd']);
        assert_eq!(out.len(), 47);
    }

    #[test]
    fn border_is_four_draws() {
        let (d, wire) = recording_display();
        d.image
            .border(Rectangle::new(0, 0, 10, 10), 2, &d.black, Point::ZERO)
            .unwrap();
        d.conn().flush(false).unwrap();
        assert_eq!(wire.take().len(), 4 * 45);
    }

    #[test]
    fn primitive_sizes() {
        let (d, wire) = recording_display();
        let s = &d.black;
        d.image
            .line(Point::ZERO, Point::new(9, 9), End::Disc, End::Square, 1, s, Point::ZERO)
            .unwrap();
        d.image.ellipse(Point::new(5, 5), 3, 2, 0, s, Point::ZERO).unwrap();
        d.image
            .arc(Point::new(5, 5), 3, 2, 0, s, Point::ZERO, 0, 90 * 64)
            .unwrap();
        d.image
            .fillpoly(&[Point::ZERO, Point::new(4, 0), Point::new(0, 4)], 0, s, Point::ZERO)
            .unwrap();
        d.conn().flush(false).unwrap();
        let out = wire.take();
        assert_eq!(out[0], b'L');
        assert_eq!(out[45], b'e');
        assert_eq!(out[90], b'e');
        assert_eq!(glong(&out[90 + 37..]) & (1 << 31), 1 << 31);
        assert_eq!(out[135], b'P');
        assert_eq!(out.len(), 135 + 31 + 6);
    }

    #[test]
    fn load_chunks_rows() {
        let (d, wire) = recording_display();
        let img = d
            .alloc_image(Rectangle::new(0, 0, 1000, 10), Pix::XRGB32, false, Color::NOFILL)
            .unwrap();
        wire.take();
        let data = vec![7u8; 4000 * 10];
        assert_eq!(img.load(img.r, &data).unwrap(), 40_000);
        let out = wire.take();
        // one row of 4000 bytes per command at the default buffer size
        assert_eq!(out.len(), 10 * (21 + 4000));
        assert!(img.load(Rectangle::new(0, 0, 2000, 1), &data).is_err());
    }

    #[test]
    fn unload_reads_reply() {
        let (d, wire) = recording_display();
        let img = d
            .alloc_image(Rectangle::new(0, 0, 2, 2), Pix::GREY8, false, Color::NOFILL)
            .unwrap();
        wire.reply(&[1, 2, 3, 4]);
        let mut out = [0u8; 4];
        assert_eq!(img.unload(img.r, &mut out).unwrap(), 4);
        assert_eq!(out, [1, 2, 3, 4]);
        let mut short = [0u8; 4];
        assert!(matches!(
            img.unload(img.r, &mut short),
            Err(DrawError::Protocol(_))
        ));
    }

    #[test]
    fn detached_images_ignore_drawing() {
        let img = Image::detached(Rectangle::new(0, 0, 2, 2), Pix::GREY8, false);
        assert!(img.draw(img.r, &img, None, Point::ZERO).is_ok());
        assert!(img.fill_ellipse(Point::ZERO, 1, 1, &img, Point::ZERO).is_ok());
    }
}
