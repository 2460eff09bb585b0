//! End-to-end drawing against the software device.

use nui_draw::screen::{Screen, bottom_window, top_n_windows};
use nui_draw::{Color, DrawError, Font, Image, Pix, Point, Rectangle, Refresh};
use nui_harness::SoftDevice;

fn device() -> SoftDevice {
    SoftDevice::new(Rectangle::new(0, 0, 200, 200))
}

#[test]
fn allocate_and_compose() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let red = d
        .alloc_image(Rectangle::new(0, 0, 100, 100), Pix::RGB24, false, Color::RED)
        .unwrap();
    let target = Rectangle::new(50, 50, 150, 150);
    d.image.draw(target, &red, None, Point::ZERO).unwrap();
    d.flush().unwrap();

    assert!(dev.region_is(0, target, Color::RED));
    assert_eq!(dev.screen_pixel(Point::new(49, 49)), Some(Color::WHITE));
    assert_eq!(dev.screen_pixel(Point::new(150, 150)), Some(Color::WHITE));

    // and the same through the protocol
    let mut buf = vec![0u8; 4 * 100 * 100];
    let n = d.image.unload(target, &mut buf).unwrap();
    assert_eq!(n, buf.len());
    assert!(buf.chunks(4).all(|px| px[..3] == [0, 0, 255]));
}

#[test]
fn source_outside_its_bounds_draws_nothing() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let blue = d
        .alloc_image(Rectangle::new(0, 0, 10, 10), Pix::RGB24, false, Color::BLUE)
        .unwrap();
    d.image
        .draw(Rectangle::new(0, 0, 40, 40), &blue, None, Point::ZERO)
        .unwrap();
    d.flush().unwrap();
    assert!(dev.region_is(0, Rectangle::new(0, 0, 10, 10), Color::BLUE));
    assert_eq!(dev.screen_pixel(Point::new(20, 20)), Some(Color::WHITE));
}

#[test]
fn replicated_fill_and_border() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let green = d
        .alloc_image(Rectangle::new(0, 0, 1, 1), Pix::RGB24, true, Color::GREEN)
        .unwrap();
    assert_eq!(green.clipr, Rectangle::HUGE);
    let r = Rectangle::new(10, 10, 60, 40);
    d.image.border(r, 2, &green, Point::ZERO).unwrap();
    d.flush().unwrap();
    assert_eq!(dev.screen_pixel(Point::new(10, 10)), Some(Color::GREEN));
    assert_eq!(dev.screen_pixel(Point::new(59, 39)), Some(Color::GREEN));
    assert_eq!(dev.screen_pixel(Point::new(12, 12)), Some(Color::WHITE));
    assert_eq!(dev.count(b'd'), 4);
}

#[test]
fn mask_limits_the_paint() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let mask = d
        .alloc_image(Rectangle::new(0, 0, 8, 1), Pix::GREY1, false, Color::BLACK)
        .unwrap();
    // left half opaque
    mask.load(Rectangle::new(0, 0, 8, 1), &[0xF0]).unwrap();
    d.image
        .draw(Rectangle::new(0, 0, 8, 1), &d.black, Some(&mask), Point::ZERO)
        .unwrap();
    d.flush().unwrap();
    assert_eq!(dev.screen_pixel(Point::new(3, 0)), Some(Color::BLACK));
    assert_eq!(dev.screen_pixel(Point::new(4, 0)), Some(Color::WHITE));
}

#[test]
fn compressed_load_matches_plain_load() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let r = Rectangle::new(0, 0, 64, 64);
    let data: Vec<u8> = (0..64 * 64).map(|i| (i % 251) as u8).collect();
    let a = d.alloc_image(r, Pix::GREY8, false, Color::NOFILL).unwrap();
    let b = d.alloc_image(r, Pix::GREY8, false, Color::NOFILL).unwrap();
    assert_eq!(a.load(r, &data).unwrap(), data.len());
    assert_eq!(b.cload(r, &data).unwrap(), data.len());
    let mut back_a = vec![0u8; data.len()];
    let mut back_b = vec![0u8; data.len()];
    a.unload(r, &mut back_a).unwrap();
    b.unload(r, &mut back_b).unwrap();
    assert_eq!(back_a, data);
    assert_eq!(back_b, data);
    assert!(dev.count(b'Y') >= 1);
}

#[test]
fn refused_allocation_is_a_resource_error() {
    let dev = device();
    let d = dev.open_display().unwrap();
    dev.refuse_allocations(1);
    let err = d
        .alloc_image(Rectangle::new(0, 0, 4, 4), Pix::RGB24, false, Color::RED)
        .unwrap_err();
    assert!(matches!(err, DrawError::Resource(_)), "{err}");
    // the connection recovers
    assert!(
        d.alloc_image(Rectangle::new(0, 0, 4, 4), Pix::RGB24, false, Color::RED)
            .is_ok()
    );
}

#[test]
fn free_releases_server_image() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let before = dev.live_images();
    let mut img = d
        .alloc_image(Rectangle::new(0, 0, 4, 4), Pix::GREY8, false, Color::WHITE)
        .unwrap();
    let id = img.id;
    assert!(dev.has_image(id));
    img.free().unwrap();
    img.free().unwrap();
    d.conn().flush(false).unwrap();
    assert!(!dev.has_image(id));
    assert_eq!(dev.live_images(), before);
    // drawing on a freed image is a no-op
    img.draw(img.r, &d.black, None, Point::ZERO).unwrap();
}

#[test]
fn named_images_are_found_by_name() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let img = d
        .alloc_image(Rectangle::new(0, 0, 3, 2), Pix::RGB24, false, Color::YELLOW)
        .unwrap();
    img.name("shared", true).unwrap();
    let found = d.conn().named_image("shared").unwrap();
    assert_ne!(found.id, img.id);
    assert_eq!(found.r, img.r);
    assert_eq!(found.chan, Pix::RGB24);
    assert!(d.conn().named_image("nobody").is_err());
}

#[test]
fn screens_and_windows() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let mut scr = Screen::alloc(&d.image, &d.white, false).unwrap();
    assert_eq!(dev.screens(), 1);
    let w1 = scr
        .alloc_window(Rectangle::new(0, 0, 50, 50), Refresh::Backup, Color::WHITE)
        .unwrap();
    let mut w2 = scr
        .alloc_window(Rectangle::new(20, 20, 80, 80), Refresh::None, Color::PALE_YELLOW)
        .unwrap();
    assert!(w1.is_window());
    assert_eq!(w1.chan, Pix::XRGB32);
    assert_eq!(d.conn().window_ids(), vec![w1.id, w2.id]);

    top_n_windows(&[&w1, &w2]).unwrap();
    bottom_window(&w1).unwrap();
    w2.origin_window(Point::new(100, 100), Point::new(20, 20)).unwrap();
    assert_eq!(w2.r, Rectangle::new(100, 100, 160, 160));
    d.conn().flush(false).unwrap();
    assert_eq!(dev.count(b't'), 2);
    assert_eq!(dev.image_rect(w2.id), Some(Rectangle::new(100, 100, 160, 160)));

    w2.free().unwrap();
    assert_eq!(d.conn().window_ids(), vec![w1.id]);
    scr.free().unwrap();
    scr.free().unwrap();
    assert_eq!(dev.screens(), 0);
}

#[test]
fn primitives_are_accepted_by_the_device() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let pts = [Point::new(0, 0), Point::new(150, 10), Point::new(3, 190)];
    d.image
        .line(pts[0], pts[1], nui_draw::End::Square, nui_draw::End::arrow(), 1, &d.black, Point::ZERO)
        .unwrap();
    d.image
        .poly(&pts, nui_draw::End::Disc, nui_draw::End::Disc, 0, &d.black, Point::ZERO)
        .unwrap();
    d.image.fillpoly(&pts, 0, &d.black, Point::ZERO).unwrap();
    d.image
        .ellipse(Point::new(100, 100), 30, 20, 1, &d.black, Point::ZERO)
        .unwrap();
    d.image
        .fill_arc(Point::new(100, 100), 30, 20, &d.black, Point::ZERO, 0, 90 * 64)
        .unwrap();
    d.flush().unwrap();
    let ops = dev.opcodes();
    for op in [b'L', b'p', b'P', b'e', b'E', b'v'] {
        assert!(ops.contains(&op), "missing {}", op as char);
    }
}

#[test]
fn font_fallback_draws_replacement_glyph() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let font = Font::default_font(Some(d.conn())).unwrap();
    let start = Point::new(10, 10);
    let end = d
        .image
        .string(start, &d.black, Point::ZERO, &font, "a\u{2603}b")
        .unwrap();
    d.flush().unwrap();
    assert_eq!(end, Point::new(34, 10));
    assert_eq!(font.pjw_fallbacks(), 1);
    // each cell got some ink, the snowman as the hollow box
    for cell in 0..3 {
        let x = start.x + 8 * cell;
        let r = Rectangle::new(x, 10, x + 8, 20);
        assert!(dev.count_not(0, r, Color::WHITE) > 0, "cell {cell} is blank");
    }
    // nothing outside the string
    assert_eq!(dev.count_not(0, Rectangle::new(34, 10, 60, 20), Color::WHITE), 0);
}

#[test]
fn string_with_background_paints_cells() {
    let dev = device();
    let d = dev.open_display().unwrap();
    let font = Font::default_font(Some(d.conn())).unwrap();
    let yellow = d
        .alloc_image(Rectangle::new(0, 0, 1, 1), Pix::RGB24, true, Color::YELLOW)
        .unwrap();
    d.image
        .string_bg(Point::new(0, 0), &d.black, Point::ZERO, &font, "  ", &yellow, Point::ZERO)
        .unwrap();
    d.flush().unwrap();
    assert!(dev.region_is(0, Rectangle::new(0, 0, 16, 10), Color::YELLOW));
    assert_eq!(dev.screen_pixel(Point::new(16, 0)), Some(Color::WHITE));
}

#[test]
fn detached_images_need_no_device() {
    let img = Image::detached(Rectangle::new(0, 0, 10, 10), Pix::GREY1, false);
    let font = Font::default_font(None).unwrap();
    let end = img
        .string(Point::ZERO, &img, Point::ZERO, &font, "xyz")
        .unwrap();
    assert_eq!(end, Point::new(24, 0));
}
