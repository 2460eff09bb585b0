//! Little-endian field packing for the command stream.
//!
//! Every multi-byte protocol field is little-endian. Coordinates are 32-bit,
//! counts and cache indices 16-bit.

use nui_core::geometry::{Point, Rectangle};

/// Store `v` as 4 little-endian bytes at the start of `b`.
#[inline]
pub fn bplong(b: &mut [u8], v: u32) {
    b[..4].copy_from_slice(&v.to_le_bytes());
}

/// Store `v` as 2 little-endian bytes at the start of `b`.
#[inline]
pub fn bpshort(b: &mut [u8], v: u16) {
    b[..2].copy_from_slice(&v.to_le_bytes());
}

/// Load a little-endian 32-bit value.
#[inline]
pub fn glong(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Load a little-endian 16-bit value.
#[inline]
pub fn gshort(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

/// Sequential writer over a command slice handed out by the buffer.
pub(crate) struct Packer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Packer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.buf[self.pos] = v;
        self.pos += 1;
        self
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        bpshort(&mut self.buf[self.pos..], v);
        self.pos += 2;
        self
    }

    pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
        bplong(&mut self.buf[self.pos..], v);
        self.pos += 4;
        self
    }

    pub(crate) fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub(crate) fn point(&mut self, p: Point) -> &mut Self {
        self.i32(p.x).i32(p.y)
    }

    pub(crate) fn rect(&mut self, r: Rectangle) -> &mut Self {
        self.point(r.min).point(r.max)
    }

    pub(crate) fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        self
    }

    #[cfg(test)]
    pub(crate) fn written(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_and_short_layout() {
        let mut b = [0u8; 6];
        bplong(&mut b, 0x1122_3344);
        bpshort(&mut b[4..], 0xA1B2);
        assert_eq!(b, [0x44, 0x33, 0x22, 0x11, 0xB2, 0xA1]);
        assert_eq!(glong(&b), 0x1122_3344);
        assert_eq!(gshort(&b[4..]), 0xA1B2);
    }

    #[test]
    fn packer_writes_sequentially() {
        let mut b = [0u8; 1 + 4 + 16];
        let mut p = Packer::new(&mut b);
        p.u8(b'r').u32(7).rect(Rectangle::new(-1, 2, 3, 4));
        assert_eq!(p.written(), 21);
        assert_eq!(b[0], b'r');
        assert_eq!(glong(&b[1..]), 7);
        assert_eq!(glong(&b[5..]) as i32, -1);
        assert_eq!(glong(&b[17..]), 4);
    }
}
