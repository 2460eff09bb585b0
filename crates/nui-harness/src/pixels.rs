//! Conversion between packed channel data and straight RGBA.
//!
//! Rows follow the draw protocol layout: pixels of depth 8 and more are
//! little-endian, smaller ones are packed most significant bit first, and a
//! row starts on the byte holding `r.min.x`.

use nui_draw::chan::{ChannelType, Pix};
use nui_draw::color::{cmap2rgb, rgb2cmap};

/// One pixel as straight (not premultiplied) RGBA.
pub type Rgba = [u8; 4];

pub const CLEAR: Rgba = [0, 0, 0, 0];

fn expand(v: u32, nbits: u32) -> u8 {
    let max = (1u32 << nbits) - 1;
    (v * 255 / max) as u8
}

fn luminance(px: Rgba) -> u8 {
    ((299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2])) / 1000) as u8
}

/// Decode a raw pixel value.
pub fn unpack(chan: Pix, v: u32) -> Rgba {
    let mut out = [0, 0, 0, 255];
    let mut shift = chan.depth();
    for (t, n) in chan.channels() {
        shift -= n;
        let raw = (v >> shift) & ((1 << n) - 1);
        let c = expand(raw, n);
        match t {
            ChannelType::Red => out[0] = c,
            ChannelType::Green => out[1] = c,
            ChannelType::Blue => out[2] = c,
            ChannelType::Grey => {
                out[0] = c;
                out[1] = c;
                out[2] = c;
            }
            ChannelType::Alpha => out[3] = c,
            ChannelType::Map => {
                let rgb = cmap2rgb(raw as u8);
                out[0] = (rgb >> 16) as u8;
                out[1] = (rgb >> 8) as u8;
                out[2] = rgb as u8;
            }
            ChannelType::Ignore => {}
        }
    }
    out
}

/// Encode a pixel into a raw value.
pub fn pack(chan: Pix, px: Rgba) -> u32 {
    let mut v = 0u32;
    for (t, n) in chan.channels() {
        let c = match t {
            ChannelType::Red => px[0],
            ChannelType::Green => px[1],
            ChannelType::Blue => px[2],
            ChannelType::Grey => luminance(px),
            ChannelType::Alpha => px[3],
            ChannelType::Map => rgb2cmap(px[0], px[1], px[2]),
            ChannelType::Ignore => 0,
        };
        let c = if t == ChannelType::Map {
            u32::from(c)
        } else {
            u32::from(c) >> (8 - n)
        };
        v = (v << n) | c;
    }
    v
}

/// Round a color through the channel format.
pub fn quantize(chan: Pix, px: Rgba) -> Rgba {
    unpack(chan, pack(chan, px))
}

/// Bit offset of the first pixel within its row data.
fn lead_bits(minx: i32, depth: u32) -> u64 {
    if depth >= 8 {
        0
    } else {
        (i64::from(minx) * i64::from(depth)).rem_euclid(8) as u64
    }
}

/// Raw value of pixel `i` of a row whose first pixel is at `minx`.
pub fn get_raw(row: &[u8], minx: i32, depth: u32, i: usize) -> u32 {
    let off = lead_bits(minx, depth) + i as u64 * u64::from(depth);
    let byte = (off / 8) as usize;
    if depth >= 8 {
        let nbytes = (depth / 8) as usize;
        let mut v = 0u32;
        for k in (0..nbytes).rev() {
            v = (v << 8) | u32::from(row[byte + k]);
        }
        v
    } else {
        let shift = 8 - depth - (off % 8) as u32;
        (u32::from(row[byte]) >> shift) & ((1 << depth) - 1)
    }
}

/// Store a raw value as pixel `i` of a row.
pub fn put_raw(row: &mut [u8], minx: i32, depth: u32, i: usize, v: u32) {
    let off = lead_bits(minx, depth) + i as u64 * u64::from(depth);
    let byte = (off / 8) as usize;
    if depth >= 8 {
        for k in 0..(depth / 8) as usize {
            row[byte + k] = (v >> (8 * k)) as u8;
        }
    } else {
        let shift = 8 - depth - (off % 8) as u32;
        let mask = (((1u32 << depth) - 1) << shift) as u8;
        row[byte] = (row[byte] & !mask) | (((v << shift) as u8) & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb24_is_little_endian_bgr_in_memory() {
        let v = pack(Pix::RGB24, [255, 0, 0, 255]);
        assert_eq!(v, 0xFF_0000);
        let mut row = [0u8; 3];
        put_raw(&mut row, 0, 24, 0, v);
        assert_eq!(row, [0, 0, 255]);
        assert_eq!(unpack(Pix::RGB24, get_raw(&row, 0, 24, 0)), [255, 0, 0, 255]);
    }

    #[test]
    fn sub_byte_pixels_pack_high_bits_first() {
        let mut row = [0u8; 1];
        put_raw(&mut row, 0, 1, 0, 1);
        put_raw(&mut row, 0, 1, 3, 1);
        assert_eq!(row[0], 0b1001_0000);
        assert_eq!(get_raw(&row, 0, 1, 3), 1);
        assert_eq!(get_raw(&row, 0, 1, 1), 0);
        // a row starting at x=4 begins mid-byte
        let mut row = [0u8; 1];
        put_raw(&mut row, 4, 1, 0, 1);
        assert_eq!(row[0], 0b0000_1000);
    }

    #[test]
    fn grey_and_alpha_quantize() {
        assert_eq!(quantize(Pix::GREY1, [255, 255, 255, 255]), [255, 255, 255, 255]);
        assert_eq!(quantize(Pix::GREY1, [0, 0, 0, 255]), [0, 0, 0, 255]);
        assert_eq!(quantize(Pix::RGBA32, [1, 2, 3, 4]), [1, 2, 3, 4]);
        assert_eq!(quantize(Pix::XRGB32, [1, 2, 3, 4])[3], 255);
    }
}
