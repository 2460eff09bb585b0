//! Font, subfont, and image files on disk.

use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::Path;

use nui_draw::font::{read_subfont, write_subfont, write_subfont_parts};
use nui_draw::imagefile::{read_image, read_image_data, write_image, write_image_data};
use nui_draw::{Color, Font, Fontchar, Pix, Point, Rectangle};
use nui_harness::SoftDevice;

const SUB_HEIGHT: i32 = 12;
const SUB_ASCENT: i32 = 10;

/// Two 8-pixel glyphs: a solid block for `A` and a narrow bar for `B`,
/// both inked on rows 2 to 9.
fn tiny_subfont() -> Vec<u8> {
    let r = Rectangle::new(0, 0, 16, SUB_HEIGHT);
    let mut pixels = vec![0u8; 2 * SUB_HEIGHT as usize];
    for row in 2..10 {
        pixels[row * 2] = 0xFF;
        pixels[row * 2 + 1] = 0x3C;
    }
    let info = vec![
        Fontchar { x: 0, top: 2, bottom: 10, left: 0, width: 8 },
        Fontchar { x: 8, top: 2, bottom: 10, left: 0, width: 8 },
        Fontchar { x: 16, ..Fontchar::default() },
    ];
    let mut out = Vec::new();
    write_subfont_parts(&mut out, Pix::GREY1, r, &pixels, SUB_HEIGHT, SUB_ASCENT, &info).unwrap();
    out
}

fn font_dir(font_text: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tiny"), tiny_subfont()).unwrap();
    fs::write(dir.path().join("broken"), b"not a subfont").unwrap();
    fs::write(dir.path().join("font"), font_text).unwrap();
    dir
}

fn font_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("font")
}

#[test]
fn font_file_metrics_without_display() {
    let dir = font_dir("12 10\n0x41 0x42 tiny\n");
    let font = Font::open(None, &font_path(&dir)).unwrap();
    assert_eq!((font.height, font.ascent), (12, 10));
    assert_eq!(font.string_width("AB").unwrap(), 16);
    assert_eq!(font.string_width("ABBA").unwrap(), 32);
    assert_eq!(font.pjw_fallbacks(), 0);
}

#[test]
fn font_file_draws_its_glyphs() {
    let dir = font_dir("12 10\n0x41 0x42 tiny\n");
    let dev = SoftDevice::new(Rectangle::new(0, 0, 100, 40));
    let d = dev.open_display().unwrap();
    let font = Font::open(Some(d.conn()), &font_path(&dir)).unwrap();
    let end = d
        .image
        .string(Point::ZERO, &d.black, Point::ZERO, &font, "AB")
        .unwrap();
    d.flush().unwrap();
    assert_eq!(end, Point::new(16, 0));
    assert_eq!(dev.screen_pixel(Point::new(0, 2)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(7, 9)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(0, 1)), Some(Color::WHITE));
    assert_eq!(dev.screen_pixel(Point::new(0, 10)), Some(Color::WHITE));
    // B is inked in columns 2 to 5 only
    assert_eq!(dev.screen_pixel(Point::new(8, 5)), Some(Color::WHITE));
    assert_eq!(dev.screen_pixel(Point::new(10, 5)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(14, 5)), Some(Color::WHITE));
}

#[test]
fn unreadable_subfont_falls_back_to_builtin() {
    let dir = font_dir("12 10\n0x41 0x42 broken\n");
    let font = Font::open(None, &font_path(&dir)).unwrap();
    // the built-in glyphs are eight pixels wide
    assert_eq!(font.string_width("AB").unwrap(), 16);
    assert_eq!(font.string_width("ABA").unwrap(), 24);
}

#[test]
fn tall_subfont_is_shifted_to_the_font_ascent() {
    let dir = font_dir("12 8\n0x41 0x42 tiny\n");
    let dev = SoftDevice::new(Rectangle::new(0, 0, 100, 40));
    let d = dev.open_display().unwrap();
    let font = Font::open(Some(d.conn()), &font_path(&dir)).unwrap();
    d.image
        .string(Point::ZERO, &d.black, Point::ZERO, &font, "A")
        .unwrap();
    d.flush().unwrap();
    // ink moved up by the two-row difference
    assert_eq!(dev.screen_pixel(Point::new(0, 0)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(0, 7)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(0, 8)), Some(Color::WHITE));
}

#[test]
fn subfont_survives_a_trip_through_the_server() {
    let bytes = tiny_subfont();
    let dev = SoftDevice::new(Rectangle::new(0, 0, 10, 10));
    let d = dev.open_display().unwrap();
    let sf = read_subfont(Some(d.conn()), &mut Cursor::new(bytes.clone()), "tiny").unwrap();
    assert_eq!(sf.n, 2);
    assert!(sf.bits.is_attached());
    let mut out = Vec::new();
    write_subfont(&mut out, &sf).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn image_files_load_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img");
    let r = Rectangle::new(0, 0, 5, 3);
    let data: Vec<u8> = (0..r.dx() * r.dy() * 3).map(|i| i as u8).collect();
    write_image_data(&mut File::create(&path).unwrap(), Pix::RGB24, r, &data, true).unwrap();

    let dev = SoftDevice::new(Rectangle::new(0, 0, 10, 10));
    let d = dev.open_display().unwrap();
    let img = read_image(d.conn(), &mut BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(img.r, r);
    assert_eq!(img.chan, Pix::RGB24);

    let mut out = Vec::new();
    write_image(&mut out, &img, false).unwrap();
    let (h, back) = read_image_data(&mut Cursor::new(out)).unwrap();
    assert!(!h.compressed);
    assert_eq!(h.r, r);
    assert_eq!(back, data);
}

#[test]
fn missing_font_file_is_an_error() {
    assert!(Font::open(None, Path::new("/nonexistent/font")).is_err());
}
