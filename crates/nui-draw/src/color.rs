//! Colors and the standard 8-bit color map.
//!
//! A [`Color`] is a 32-bit `RRGGBBAA` value with premultiplied alpha.

/// A 32-bit RRGGBBAA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const OPAQUE: Color = Color(0xFFFF_FFFF);
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0x0000_00FF);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const RED: Color = Color(0xFF00_00FF);
    pub const GREEN: Color = Color(0x00FF_00FF);
    pub const BLUE: Color = Color(0x0000_FFFF);
    pub const CYAN: Color = Color(0x00FF_FFFF);
    pub const MAGENTA: Color = Color(0xFF00_FFFF);
    pub const YELLOW: Color = Color(0xFFFF_00FF);
    pub const PALE_YELLOW: Color = Color(0xFFFF_AAFF);
    pub const DARK_YELLOW: Color = Color(0xEEEE_9EFF);
    pub const DARK_GREEN: Color = Color(0x4488_44FF);
    pub const PALE_GREEN: Color = Color(0xAAFF_AAFF);
    pub const MED_GREEN: Color = Color(0x88CC_88FF);
    pub const DARK_BLUE: Color = Color(0x0000_55FF);
    pub const PALE_BLUE_GREEN: Color = Color(0xAAFF_FFFF);
    pub const PALE_BLUE: Color = Color(0x0000_BBFF);
    pub const BLUE_GREEN: Color = Color(0x0088_88FF);
    pub const GREY_GREEN: Color = Color(0x55AA_AAFF);
    pub const PALE_GREY_GREEN: Color = Color(0x9EEE_EEFF);
    pub const YELLOW_GREEN: Color = Color(0x9999_4CFF);
    pub const MED_BLUE: Color = Color(0x0000_99FF);
    pub const GREY_BLUE: Color = Color(0x005D_BBFF);
    pub const PALE_GREY_BLUE: Color = Color(0x4993_DDFF);
    pub const PURPLE_BLUE: Color = Color(0x8888_CCFF);
    pub const NOT_A_COLOR: Color = Color(0xFFFF_FF00);
    /// Allocate an image without filling it.
    pub const NOFILL: Color = Color::NOT_A_COLOR;

    /// Build a color from 8-bit components.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn blue(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn alpha(self) -> u8 {
        self.0 as u8
    }

    /// Replace the alpha, scaling the color components to stay premultiplied.
    #[must_use]
    pub const fn set_alpha(self, alpha: u8) -> Color {
        let a = alpha as u32;
        let r = (self.red() as u32 * a) / 255;
        let g = (self.green() as u32 * a) / 255;
        let b = (self.blue() as u32 * a) / 255;
        Color((r << 24) | (g << 16) | (b << 8) | a)
    }

    /// Parse `#RRGGBB`, `#RRGGBBAA`, or a bare hex number.
    pub fn parse(s: &str) -> Option<Color> {
        let hex = s.trim().trim_start_matches('#').trim_start_matches("0x");
        let v = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Color((v << 8) | 0xFF)),
            8 => Some(Color(v)),
            _ => None,
        }
    }
}

/// The 24-bit RGB value of entry `c` of the standard rgbv color map.
pub fn cmap2rgb(c: u8) -> u32 {
    let c = i32::from(c);
    let r = c >> 6;
    let mut v = (c >> 4) & 3;
    let j = (c - v + r) & 15;
    let g = j >> 2;
    let b = j & 3;
    let den = r.max(g).max(b);
    if den == 0 {
        v *= 17;
        ((v << 16) | (v << 8) | v) as u32
    } else {
        let num = 17 * (4 * den + v);
        (((r * num / den) << 16) | ((g * num / den) << 8) | (b * num / den)) as u32
    }
}

/// The color-map entry as an opaque [`Color`].
pub fn cmap2rgba(c: u8) -> Color {
    Color((cmap2rgb(c) << 8) | 0xFF)
}

/// The color-map entry closest to the given RGB components.
pub fn rgb2cmap(cr: u8, cg: u8, cb: u8) -> u8 {
    let (cr, cg, cb) = (i32::from(cr), i32::from(cg), i32::from(cb));
    let mut best = 0u8;
    let mut bestsq = i32::MAX;
    for i in 0..=255u8 {
        let rgb = cmap2rgb(i);
        let r = ((rgb >> 16) & 0xFF) as i32;
        let g = ((rgb >> 8) & 0xFF) as i32;
        let b = (rgb & 0xFF) as i32;
        let sq = (r - cr) * (r - cr) + (g - cg) * (g - cg) + (b - cb) * (b - cb);
        if sq < bestsq {
            bestsq = sq;
            best = i;
        }
    }
    best
}
