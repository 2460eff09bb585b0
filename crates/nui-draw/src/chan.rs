//! Pixel channel descriptors.
//!
//! A [`Pix`] packs up to four channels into a 32-bit value, one byte per
//! channel, most significant channel first. Each byte holds the channel
//! type in its high nibble and the bit count in its low nibble. The string
//! form lists the channels in the same order, e.g. `r8g8b8` for 24-bit RGB.

use std::fmt;
use std::str::FromStr;

use nui_core::geometry::Rectangle;

use crate::error::DrawError;

/// The kind of data a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelType {
    Red = 0,
    Green = 1,
    Blue = 2,
    Grey = 3,
    Alpha = 4,
    Map = 5,
    Ignore = 6,
}

const CHANNAMES: &[u8; 7] = b"rgbkamx";
const NCHAN: u32 = 7;

impl ChannelType {
    /// Letter used in the string form.
    pub const fn letter(self) -> char {
        CHANNAMES[self as usize] as char
    }

    fn from_letter(c: u8) -> Option<Self> {
        Some(match c {
            b'r' => Self::Red,
            b'g' => Self::Green,
            b'b' => Self::Blue,
            b'k' => Self::Grey,
            b'a' => Self::Alpha,
            b'm' => Self::Map,
            b'x' => Self::Ignore,
            _ => return None,
        })
    }

    fn from_code(c: u32) -> Option<Self> {
        CHANNAMES
            .get(c as usize)
            .and_then(|&letter| Self::from_letter(letter))
    }
}

const fn dc(t: ChannelType, nbits: u32) -> u32 {
    ((t as u32 & 15) << 4) | (nbits & 15)
}

const fn chan1(a: ChannelType, b: u32) -> u32 {
    dc(a, b)
}

const fn chan2(a: ChannelType, b: u32, c: ChannelType, d: u32) -> u32 {
    (chan1(a, b) << 8) | dc(c, d)
}

const fn chan3(a: ChannelType, b: u32, c: ChannelType, d: u32, e: ChannelType, f: u32) -> u32 {
    (chan2(a, b, c, d) << 8) | dc(e, f)
}

#[allow(clippy::too_many_arguments)]
const fn chan4(
    a: ChannelType,
    b: u32,
    c: ChannelType,
    d: u32,
    e: ChannelType,
    f: u32,
    g: ChannelType,
    h: u32,
) -> u32 {
    (chan3(a, b, c, d, e, f) << 8) | dc(g, h)
}

/// A packed pixel channel descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pix(pub u32);

impl Pix {
    pub const GREY1: Pix = Pix(chan1(ChannelType::Grey, 1));
    pub const GREY2: Pix = Pix(chan1(ChannelType::Grey, 2));
    pub const GREY4: Pix = Pix(chan1(ChannelType::Grey, 4));
    pub const GREY8: Pix = Pix(chan1(ChannelType::Grey, 8));
    pub const CMAP8: Pix = Pix(chan1(ChannelType::Map, 8));
    pub const RGB15: Pix = Pix(chan4(
        ChannelType::Ignore,
        1,
        ChannelType::Red,
        5,
        ChannelType::Green,
        5,
        ChannelType::Blue,
        5,
    ));
    pub const RGB16: Pix = Pix(chan3(
        ChannelType::Red,
        5,
        ChannelType::Green,
        6,
        ChannelType::Blue,
        5,
    ));
    pub const RGB24: Pix = Pix(chan3(
        ChannelType::Red,
        8,
        ChannelType::Green,
        8,
        ChannelType::Blue,
        8,
    ));
    pub const BGR24: Pix = Pix(chan3(
        ChannelType::Blue,
        8,
        ChannelType::Green,
        8,
        ChannelType::Red,
        8,
    ));
    pub const RGBA32: Pix = Pix(chan4(
        ChannelType::Red,
        8,
        ChannelType::Green,
        8,
        ChannelType::Blue,
        8,
        ChannelType::Alpha,
        8,
    ));
    pub const ARGB32: Pix = Pix(chan4(
        ChannelType::Alpha,
        8,
        ChannelType::Red,
        8,
        ChannelType::Green,
        8,
        ChannelType::Blue,
        8,
    ));
    pub const XRGB32: Pix = Pix(chan4(
        ChannelType::Ignore,
        8,
        ChannelType::Red,
        8,
        ChannelType::Green,
        8,
        ChannelType::Blue,
        8,
    ));
    pub const ABGR32: Pix = Pix(chan4(
        ChannelType::Alpha,
        8,
        ChannelType::Blue,
        8,
        ChannelType::Green,
        8,
        ChannelType::Red,
        8,
    ));
    pub const XBGR32: Pix = Pix(chan4(
        ChannelType::Ignore,
        8,
        ChannelType::Blue,
        8,
        ChannelType::Green,
        8,
        ChannelType::Red,
        8,
    ));

    /// Single-channel grey descriptor of the given depth.
    pub const fn grey(depth: u32) -> Pix {
        Pix(chan1(ChannelType::Grey, depth))
    }

    /// Total bits per pixel, or 0 if the descriptor is invalid.
    ///
    /// Invalid means: a channel with 0 or more than 8 bits, an unknown
    /// channel type, or a total that is neither a multiple of 8 nor a
    /// divisor of 8.
    pub const fn depth(self) -> u32 {
        let mut c = self.0;
        let mut n = 0;
        while c != 0 {
            let t = (c >> 4) & 15;
            let nbits = c & 15;
            if t >= NCHAN || nbits > 8 || nbits == 0 {
                return 0;
            }
            n += nbits;
            c >>= 8;
        }
        if n == 0 || (n > 8 && n % 8 != 0) || (n < 8 && 8 % n != 0) {
            return 0;
        }
        n
    }

    /// Channels from most to least significant, as `(type, nbits)`.
    pub fn channels(self) -> Vec<(ChannelType, u32)> {
        let mut out = Vec::with_capacity(4);
        let mut c = self.0;
        while c != 0 {
            if let Some(t) = ChannelType::from_code((c >> 4) & 15) {
                out.push((t, c & 15));
            }
            c >>= 8;
        }
        out.reverse();
        out
    }

    /// Check if any channel has the given type.
    pub fn has(self, t: ChannelType) -> bool {
        self.channels().iter().any(|&(ct, _)| ct == t)
    }

    /// Parse the string form. Leading and trailing whitespace is ignored.
    pub fn parse(s: &str) -> Option<Pix> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let bytes = s.as_bytes();
        if bytes.len() % 2 != 0 {
            return None;
        }
        let mut c: u32 = 0;
        for pair in bytes.chunks(2) {
            let t = ChannelType::from_letter(pair[0])?;
            if !pair[1].is_ascii_digit() {
                return None;
            }
            let n = u32::from(pair[1] - b'0');
            c = (c << 8) | dc(t, n);
        }
        Some(Pix(c))
    }

    /// Format as the string form, or `None` if the descriptor is invalid.
    pub fn to_chan_string(self) -> Option<String> {
        if self.depth() == 0 {
            return None;
        }
        let mut s = String::with_capacity(8);
        for (t, n) in self.channels() {
            s.push(t.letter());
            s.push(char::from_digit(n, 10)?);
        }
        Some(s)
    }
}

impl FromStr for Pix {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pix::parse(s).ok_or_else(|| DrawError::Config(format!("bad channel descriptor {s:?}")))
    }
}

impl fmt::Display for Pix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_chan_string() {
            Some(s) => f.write_str(&s),
            None => write!(f, "<bad chan {:#x}>", self.0),
        }
    }
}

fn units_per_line(r: Rectangle, d: u32, bits_per_unit: i64) -> usize {
    if d == 0 || d > 32 {
        return 0;
    }
    let d = i64::from(d);
    let (minx, maxx) = (i64::from(r.min.x), i64::from(r.max.x));
    let l = if minx >= 0 {
        (maxx * d + bits_per_unit - 1) / bits_per_unit - (minx * d) / bits_per_unit
    } else {
        let t = (-minx * d + bits_per_unit - 1) / bits_per_unit;
        t + (maxx * d + bits_per_unit - 1) / bits_per_unit
    };
    l.max(0) as usize
}

/// Bytes needed for one row of `r` at depth `d`, accounting for sub-byte
/// alignment of `r.min.x`. Returns 0 for unsupported depths.
pub fn bytes_per_line(r: Rectangle, d: u32) -> usize {
    units_per_line(r, d, 8)
}

/// 32-bit words needed for one row of `r` at depth `d`.
pub fn words_per_line(r: Rectangle, d: u32) -> usize {
    units_per_line(r, d, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_depths() {
        assert_eq!(Pix::GREY1.depth(), 1);
        assert_eq!(Pix::GREY4.depth(), 4);
        assert_eq!(Pix::CMAP8.depth(), 8);
        assert_eq!(Pix::RGB15.depth(), 16);
        assert_eq!(Pix::RGB16.depth(), 16);
        assert_eq!(Pix::RGB24.depth(), 24);
        assert_eq!(Pix::ARGB32.depth(), 32);
    }

    #[test]
    fn invalid_descriptors_have_zero_depth() {
        assert_eq!(Pix(0).depth(), 0);
        // three bits does not divide 8
        assert_eq!(Pix(dc(ChannelType::Grey, 3)).depth(), 0);
        // nine bits is neither a multiple nor a divisor
        assert_eq!(
            Pix(chan2(ChannelType::Grey, 1, ChannelType::Alpha, 8)).depth(),
            0
        );
        // type 7 is out of range
        assert_eq!(Pix(0x71).depth(), 0);
    }

    #[test]
    fn string_forms() {
        assert_eq!(Pix::RGB24.to_string(), "r8g8b8");
        assert_eq!(Pix::XRGB32.to_string(), "x8r8g8b8");
        assert_eq!(Pix::GREY1.to_string(), "k1");
        assert_eq!(Pix::parse("r8g8b8\n"), Some(Pix::RGB24));
        assert_eq!(Pix::parse("  a8r8g8b8 "), Some(Pix::ARGB32));
        assert_eq!(Pix::parse("q8"), None);
        assert_eq!(Pix::parse("r"), None);
        assert!("z1".parse::<Pix>().is_err());
    }

    #[test]
    fn bytes_per_line_alignment() {
        assert_eq!(bytes_per_line(Rectangle::new(0, 0, 100, 1), 32), 400);
        assert_eq!(bytes_per_line(Rectangle::new(0, 0, 9, 1), 1), 2);
        // a 1-bit row from x=7 to x=9 straddles two bytes
        assert_eq!(bytes_per_line(Rectangle::new(7, 0, 9, 1), 1), 2);
        assert_eq!(bytes_per_line(Rectangle::new(-3, 0, 5, 1), 8), 8);
        assert_eq!(bytes_per_line(Rectangle::new(0, 0, 4, 1), 0), 0);
        assert_eq!(words_per_line(Rectangle::new(0, 0, 33, 1), 1), 2);
    }
}
