//! The external image file format.
//!
//! A file is five 12-byte text fields (channel string, then the rectangle's
//! min.x, min.y, max.x, max.y) followed by the pixel rows, top to bottom.
//! The compressed form starts with the line `compressed` and carries the
//! rows as a single zlib stream. Files from older systems may put a log2
//! grey depth (`0` to `3`) in the channel field.

use std::io::{self, BufRead, Read, Write};

use flate2::bufread::ZlibDecoder;

use nui_core::debug;
use nui_core::geometry::Rectangle;

use crate::chan::{Pix, bytes_per_line};
use crate::color::Color;
use crate::display::DrawConn;
use crate::draw::compress;
use crate::error::{DrawError, DrawResult};
use crate::image::Image;

const FIELD: usize = 12;
const HEADER_LEN: usize = 5 * FIELD;
const COMPRESSED_TAG: &[u8] = b"compressed\n";

/// Format and geometry from an image file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub chan: Pix,
    pub r: Rectangle,
    pub compressed: bool,
}

impl ImageHeader {
    /// Bytes of pixel data the header announces.
    pub fn data_len(&self) -> usize {
        bytes_per_line(self.r, self.chan.depth()) * self.r.dy().max(0) as usize
    }
}

fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8], what: &str) -> DrawResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DrawError::Parse(format!("{what}: file truncated")),
        _ => DrawError::Transport(e),
    })
}

fn parse_header(hdr: &[u8], compressed: bool) -> DrawResult<ImageHeader> {
    let field = |i: usize| -> DrawResult<&str> {
        std::str::from_utf8(&hdr[i * FIELD..(i + 1) * FIELD])
            .map(str::trim)
            .map_err(|_| DrawError::Parse(format!("image header field {i} is not text")))
    };
    let chan_text = field(0)?;
    let chan = match chan_text.parse::<u32>() {
        Ok(ld) if ld <= 3 => Pix::grey(1 << ld),
        _ => Pix::parse(chan_text)
            .filter(|p| p.depth() != 0)
            .ok_or_else(|| DrawError::Parse(format!("bad channel {chan_text:?} in image header")))?,
    };
    let mut n = [0i32; 4];
    for (i, v) in n.iter_mut().enumerate() {
        let f = field(i + 1)?;
        *v = f
            .parse()
            .map_err(|_| DrawError::Parse(format!("bad number {f:?} in image header")))?;
    }
    let r = Rectangle::new(n[0], n[1], n[2], n[3]);
    if r.is_bad() {
        return Err(DrawError::Parse(format!("bad rectangle {r:?} in image header")));
    }
    Ok(ImageHeader { chan, r, compressed })
}

/// Read and validate a header, leaving the reader at the pixel data.
pub fn read_header<R: BufRead + ?Sized>(r: &mut R) -> DrawResult<ImageHeader> {
    let mut hdr = [0u8; COMPRESSED_TAG.len() + HEADER_LEN];
    read_full(r, &mut hdr[..COMPRESSED_TAG.len()], "image header")?;
    if &hdr[..COMPRESSED_TAG.len()] == COMPRESSED_TAG {
        read_full(r, &mut hdr[..HEADER_LEN], "image header")?;
        parse_header(&hdr[..HEADER_LEN], true)
    } else {
        read_full(r, &mut hdr[COMPRESSED_TAG.len()..HEADER_LEN], "image header")?;
        parse_header(&hdr[..HEADER_LEN], false)
    }
}

/// Write a header in the five-field form.
pub fn write_header<W: Write + ?Sized>(w: &mut W, h: &ImageHeader) -> DrawResult<()> {
    let chan = h
        .chan
        .to_chan_string()
        .ok_or_else(|| DrawError::Config(format!("bad channel {:#x}", h.chan.0)))?;
    if h.compressed {
        w.write_all(COMPRESSED_TAG)?;
    }
    write!(
        w,
        "{chan:>11} {:>11} {:>11} {:>11} {:>11} ",
        h.r.min.x, h.r.min.y, h.r.max.x, h.r.max.y
    )?;
    Ok(())
}

/// Read a whole image file into memory without touching a display.
///
/// Only the bytes of the image are consumed, so data stored after it (as in
/// a subfont file) can be read from `r` afterwards.
pub fn read_image_data<R: BufRead + ?Sized>(r: &mut R) -> DrawResult<(ImageHeader, Vec<u8>)> {
    let h = read_header(r)?;
    let mut data = vec![0u8; h.data_len()];
    if h.compressed {
        let mut z = ZlibDecoder::new(&mut *r);
        read_full(&mut z, &mut data, "compressed image")?;
        // drain the stream trailer so the reader sits just past it
        let mut tail = [0u8; 1];
        if z.read(&mut tail)? != 0 {
            return Err(DrawError::Parse("compressed image has excess data".into()));
        }
    } else {
        read_full(r, &mut data, "image data")?;
    }
    Ok((h, data))
}

/// Write an in-memory image in file form.
pub fn write_image_data<W: Write + ?Sized>(
    w: &mut W,
    chan: Pix,
    r: Rectangle,
    data: &[u8],
    compressed: bool,
) -> DrawResult<()> {
    let h = ImageHeader { chan, r, compressed };
    let n = h.data_len();
    if data.len() < n {
        return Err(DrawError::Config(format!(
            "image data is {} bytes, header needs {n}",
            data.len()
        )));
    }
    write_header(w, &h)?;
    if compressed {
        w.write_all(&compress(&data[..n])?)?;
    } else {
        w.write_all(&data[..n])?;
    }
    Ok(())
}

/// Read an image file and load it into a new server image.
pub fn read_image<R: BufRead + ?Sized>(conn: &DrawConn, r: &mut R) -> DrawResult<Image> {
    let (h, data) = read_image_data(r)?;
    let mut img = conn.alloc_image(h.r, h.chan, false, Color::NOFILL)?;
    if let Err(err) = img.load(h.r, &data) {
        img.free()?;
        return Err(err);
    }
    debug!(id = img.id, chan = %h.chan, compressed = h.compressed, "draw: image read");
    Ok(img)
}

/// Read back a server image and write it in file form.
pub fn write_image<W: Write + ?Sized>(w: &mut W, img: &Image, compressed: bool) -> DrawResult<()> {
    let mut data = vec![0u8; bytes_per_line(img.r, img.depth) * img.r.dy().max(0) as usize];
    img.unload(img.r, &mut data)?;
    write_image_data(w, img.chan, img.r, &data, compressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip() {
        let h = ImageHeader {
            chan: Pix::RGB24,
            r: Rectangle::new(-3, 4, 10, 20),
            compressed: false,
        };
        let mut out = Vec::new();
        write_header(&mut out, &h).unwrap();
        assert_eq!(out.len(), 60);
        assert_eq!(read_header(&mut Cursor::new(out)).unwrap(), h);
    }

    #[test]
    fn compressed_data_leaves_trailing_bytes() {
        let r = Rectangle::new(0, 0, 8, 3);
        let data: Vec<u8> = (0..24).collect();
        let mut out = Vec::new();
        write_image_data(&mut out, Pix::GREY8, r, &data, true).unwrap();
        out.extend_from_slice(b"TAIL");
        let mut cur = Cursor::new(out);
        let (h, back) = read_image_data(&mut cur).unwrap();
        assert!(h.compressed);
        assert_eq!(back, data);
        let mut rest = String::new();
        cur.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "TAIL");
    }

    #[test]
    fn old_depth_headers() {
        let text = format!("{:>11} {:>11} {:>11} {:>11} {:>11} ", 0, 0, 0, 8, 1);
        let mut bytes = text.into_bytes();
        bytes.push(0xA5);
        let (h, data) = read_image_data(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(h.chan, Pix::GREY1);
        assert_eq!(data, vec![0xA5]);
    }

    #[test]
    fn truncated_files_are_parse_errors() {
        let r = Rectangle::new(0, 0, 4, 4);
        let mut out = Vec::new();
        write_image_data(&mut out, Pix::GREY8, r, &[0u8; 16], false).unwrap();
        out.truncate(out.len() - 1);
        assert!(matches!(
            read_image_data(&mut Cursor::new(out)),
            Err(DrawError::Parse(_))
        ));
        assert!(matches!(
            read_header(&mut Cursor::new(b"rubbish".to_vec())),
            Err(DrawError::Parse(_))
        ));
    }
}
