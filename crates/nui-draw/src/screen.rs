//! Screens and windows.
//!
//! A [`Screen`] is a compositing surface backed by an image and a fill
//! image; windows are images allocated on a screen that take part in its
//! stacking order. Freeing a screen leaves its backing image alone.

use nui_core::geometry::{Point, Rectangle};

use crate::bytes::Packer;
use crate::chan::Pix;
use crate::color::Color;
use crate::display::DrawConn;
use crate::error::DrawResult;
use crate::image::Image;

/// How the server restores obscured window contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Refresh {
    /// The server keeps a backing store.
    #[default]
    Backup = 0,
    /// Obscured contents are lost.
    None = 1,
    /// The client is sent a refresh message.
    Mesg = 2,
}

/// A server-side compositing surface.
#[derive(Debug)]
pub struct Screen {
    conn: Option<DrawConn>,
    /// Server id of the screen.
    pub id: u32,
    /// Backing image id; zero for a public screen attached by id.
    pub image_id: u32,
    /// Id of the image painted into uncovered areas.
    pub fill_id: u32,
    /// Pixel format of the backing image, shared by every window.
    pub chan: Pix,
}

impl Screen {
    /// Allocate a screen backed by `image` and painted with `fill`.
    pub fn alloc(image: &Image, fill: &Image, public: bool) -> DrawResult<Screen> {
        let Some(conn) = image.conn() else {
            return Ok(Screen {
                conn: None,
                id: 0,
                image_id: image.id,
                fill_id: fill.id,
                chan: image.chan,
            });
        };
        let mut c = conn.lock();
        let id = c.next_id();
        let b = c.bufimage(1 + 4 + 4 + 4 + 1)?;
        Packer::new(b)
            .u8(b'A')
            .u32(id)
            .u32(image.id)
            .u32(fill.id)
            .u8(u8::from(public));
        c.flush(false)?;
        Ok(Screen {
            conn: Some(conn.clone()),
            id,
            image_id: image.id,
            fill_id: fill.id,
            chan: image.chan,
        })
    }

    /// Attach to a public screen published by another client.
    ///
    /// The protocol returns no description of the screen, so the caller's
    /// `pix` is trusted.
    pub fn public(conn: &DrawConn, id: u32, pix: Pix) -> DrawResult<Screen> {
        let mut c = conn.lock();
        let b = c.bufimage(1 + 4 + 4)?;
        Packer::new(b).u8(b'S').u32(id).u32(pix.0);
        c.flush(false)?;
        Ok(Screen {
            conn: Some(conn.clone()),
            id,
            image_id: 0,
            fill_id: 0,
            chan: pix,
        })
    }

    /// Release the screen. Idempotent; the backing image survives.
    pub fn free(&mut self) -> DrawResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let mut c = conn.lock();
        let b = c.bufimage(1 + 4)?;
        Packer::new(b).u8(b'F').u32(self.id);
        c.flush(false)
    }

    /// Allocate a window on this screen, in the screen's pixel format.
    pub fn alloc_window(&self, r: Rectangle, refresh: Refresh, fill: Color) -> DrawResult<Image> {
        match &self.conn {
            Some(conn) => conn.alloc_image_on(Some(self.id), refresh, r, self.chan, false, fill),
            None => Ok(Image::detached(r, self.chan, false)),
        }
    }
}

fn restack(windows: &[&Image], top: bool) -> DrawResult<()> {
    let Some(first) = windows.first() else {
        return Ok(());
    };
    let Some(conn) = first.conn() else {
        return Ok(());
    };
    // windows from different displays cannot be restacked together
    if windows
        .iter()
        .any(|w| !w.conn().is_some_and(|c| c.same(conn)))
    {
        return Ok(());
    }
    let mut c = conn.lock();
    // the count field is 16 bits and the command must fit the buffer
    for chunk in windows.chunks(1024) {
        let b = c.bufimage(1 + 1 + 2 + 4 * chunk.len())?;
        let mut p = Packer::new(b);
        p.u8(b't').u8(u8::from(top)).u16(chunk.len() as u16);
        for w in chunk {
            p.u32(w.id);
        }
    }
    Ok(())
}

/// Raise the windows to the top of their screen, first one topmost.
pub fn top_n_windows(windows: &[&Image]) -> DrawResult<()> {
    restack(windows, true)
}

/// Raise one window.
pub fn top_window(w: &Image) -> DrawResult<()> {
    restack(&[w], true)
}

/// Lower the windows to the bottom of their screen.
pub fn bottom_n_windows(windows: &[&Image]) -> DrawResult<()> {
    restack(windows, false)
}

/// Lower one window.
pub fn bottom_window(w: &Image) -> DrawResult<()> {
    restack(&[w], false)
}

impl Image {
    /// Move a window: its logical origin becomes `log` and its position on
    /// the screen `scr`. Local bounds shift by `log - r.min`.
    pub fn origin_window(&mut self, log: Point, scr: Point) -> DrawResult<()> {
        if let Some(conn) = &self.conn {
            let mut c = conn.lock();
            let b = c.bufimage(1 + 4 + 8 + 8)?;
            Packer::new(b).u8(b'o').u32(self.id).point(log).point(scr);
            c.flush(false)?;
        }
        let delta = log - self.r.min;
        self.r = self.r.add_pt(delta);
        self.clipr = self.clipr.add_pt(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recording_display_with;

    #[test]
    fn detached_windows_move_locally() {
        let mut w = Image::detached(Rectangle::new(10, 10, 50, 40), Pix::RGB24, false);
        w.origin_window(Point::new(0, 0), Point::new(10, 10)).ok();
        assert_eq!(w.r, Rectangle::new(0, 0, 40, 30));
        assert_eq!(w.clipr, Rectangle::new(0, 0, 40, 30));
    }

    #[test]
    fn restacking_nothing_is_fine() {
        assert!(top_n_windows(&[]).is_ok());
        let w = Image::detached(Rectangle::new(0, 0, 1, 1), Pix::RGB24, false);
        assert!(bottom_window(&w).is_ok());
    }

    #[test]
    fn windows_take_the_screen_format() {
        let (display, wire) = recording_display_with(Pix::CMAP8);
        let screen = Screen::alloc(&display.image, &display.white, false).unwrap();
        wire.take();
        let w = screen
            .alloc_window(Rectangle::new(10, 10, 60, 40), Refresh::Backup, Color::WHITE)
            .unwrap();
        let b = wire.take();
        assert_eq!(b[0], b'b');
        assert_eq!(u32::from_le_bytes([b[10], b[11], b[12], b[13]]), Pix::CMAP8.0);
        assert_eq!(w.chan, Pix::CMAP8);
        assert_eq!(w.depth, 8);
        assert!(w.is_window());
    }

    #[test]
    fn detached_screens_keep_the_image_format() {
        let img = Image::detached(Rectangle::new(0, 0, 100, 100), Pix::RGB16, false);
        let screen = Screen::alloc(&img, &img, false).unwrap();
        let w = screen
            .alloc_window(Rectangle::new(0, 0, 10, 10), Refresh::None, Color::WHITE)
            .unwrap();
        assert_eq!(w.chan, Pix::RGB16);
        assert_eq!(w.depth, 16);
    }

    #[test]
    fn refresh_codes() {
        assert_eq!(Refresh::Backup as u8, 0);
        assert_eq!(Refresh::None as u8, 1);
        assert_eq!(Refresh::Mesg as u8, 2);
    }
}
