//! Server-side images and their local proxies.

use nui_core::debug;
use nui_core::geometry::Rectangle;

use crate::bytes::Packer;
use crate::chan::Pix;
use crate::color::Color;
use crate::display::{DrawConn, ScreenInfo};
use crate::error::{DrawError, DrawResult};
use crate::screen::Refresh;

/// Longest name accepted by [`Image::name`] and [`DrawConn::named_image`].
pub const MAX_NAME: usize = 255;

/// Local proxy for a rectangle of pixels held by the draw server.
///
/// An image whose connection has been dropped (after [`free`](Image::free),
/// or one built detached) accepts every drawing call and does nothing.
#[derive(Debug)]
pub struct Image {
    pub(crate) conn: Option<DrawConn>,
    /// Server id; 0 is the screen.
    pub id: u32,
    /// Pixel format the server holds the image in.
    pub chan: Pix,
    /// Bits per pixel, derived from `chan`.
    pub depth: u32,
    /// Whether the image tiles the plane.
    pub repl: bool,
    /// Bounds of the pixels.
    pub r: Rectangle,
    /// Drawing is confined to this rectangle.
    pub clipr: Rectangle,
    /// Screen id when this image is a window.
    pub(crate) screen: Option<u32>,
}

impl Image {
    pub(crate) fn from_info(conn: Option<DrawConn>, id: u32, info: &ScreenInfo) -> Image {
        Image {
            conn,
            id,
            chan: info.chan,
            depth: info.chan.depth(),
            repl: info.repl,
            r: info.r,
            clipr: info.clipr,
            screen: None,
        }
    }

    /// An image with no server counterpart. Drawing on it is a no-op.
    pub fn detached(r: Rectangle, chan: Pix, repl: bool) -> Image {
        Image {
            conn: None,
            id: 0,
            chan,
            depth: chan.depth(),
            repl,
            r,
            clipr: if repl { Rectangle::HUGE } else { r },
            screen: None,
        }
    }

    /// Another handle on the same server image.
    ///
    /// Freeing through any handle releases the server image; the others
    /// keep its id and must not be drawn on afterwards.
    pub fn share(&self) -> Image {
        Image {
            conn: self.conn.clone(),
            id: self.id,
            chan: self.chan,
            depth: self.depth,
            repl: self.repl,
            r: self.r,
            clipr: self.clipr,
            screen: self.screen,
        }
    }

    /// The connection, if still attached.
    pub fn conn(&self) -> Option<&DrawConn> {
        self.conn.as_ref()
    }

    /// Check if the image is still attached to a display.
    pub fn is_attached(&self) -> bool {
        self.conn.is_some()
    }

    /// Check if the image is a window on some screen.
    pub fn is_window(&self) -> bool {
        self.screen.is_some()
    }

    /// Release the server-side image. Idempotent.
    pub fn free(&mut self) -> DrawResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let mut c = conn.lock();
        let b = c.bufimage(1 + 4)?;
        Packer::new(b).u8(b'f').u32(self.id);
        if self.screen.take().is_some() {
            c.remove_window(self.id);
        }
        Ok(())
    }

    /// Publish the image under `name` (`publish = true`) or withdraw the name.
    pub fn name(&self, name: &str, publish: bool) -> DrawResult<()> {
        if name.len() > MAX_NAME {
            return Err(DrawError::Config(format!(
                "image name too long ({} bytes)",
                name.len()
            )));
        }
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        let mut c = conn.lock();
        let b = c.bufimage(1 + 4 + 1 + 1 + name.len())?;
        Packer::new(b)
            .u8(b'N')
            .u32(self.id)
            .u8(u8::from(publish))
            .u8(name.len() as u8)
            .bytes(name.as_bytes());
        c.flush(false)
    }

    /// Set the replicate flag and clip rectangle.
    pub fn replclipr(&mut self, repl: bool, clipr: Rectangle) -> DrawResult<()> {
        if let Some(conn) = &self.conn {
            let mut c = conn.lock();
            let b = c.bufimage(1 + 4 + 1 + 16)?;
            Packer::new(b)
                .u8(b'c')
                .u32(self.id)
                .u8(u8::from(repl))
                .rect(clipr);
        }
        self.repl = repl;
        self.clipr = clipr;
        Ok(())
    }
}

impl DrawConn {
    /// Allocate an image.
    ///
    /// `r` must be a valid rectangle of at most 2^28 pixels and `pix` must
    /// have a nonzero depth. A replicated image gets the huge clip
    /// rectangle; otherwise the clip equals `r`. `fill` paints the new
    /// image unless it is [`Color::NOFILL`].
    pub fn alloc_image(
        &self,
        r: Rectangle,
        pix: Pix,
        repl: bool,
        fill: Color,
    ) -> DrawResult<Image> {
        self.alloc_image_on(None, Refresh::Backup, r, pix, repl, fill)
    }

    pub(crate) fn alloc_image_on(
        &self,
        screen: Option<u32>,
        refresh: Refresh,
        r: Rectangle,
        pix: Pix,
        repl: bool,
        fill: Color,
    ) -> DrawResult<Image> {
        if r.is_bad() {
            return Err(DrawError::Config(format!("bad rectangle {r:?}")));
        }
        let depth = pix.depth();
        if depth == 0 {
            return Err(DrawError::Config(format!("bad channel descriptor {:#x}", pix.0)));
        }
        let clipr = if repl { Rectangle::HUGE } else { r };
        let mut c = self.lock();
        let id = c.next_id();
        let b = c.bufimage(51)?;
        Packer::new(b)
            .u8(b'b')
            .u32(id)
            .u32(screen.unwrap_or(0))
            .u8(refresh as u8)
            .u32(pix.0)
            .u8(u8::from(repl))
            .rect(r)
            .rect(clipr)
            .u32(fill.0);
        if let Err(err) = c.flush(false) {
            return Err(match err {
                DrawError::Transport(e) => {
                    DrawError::Resource(format!("allocimage {r:?} refused: {e}"))
                }
                other => other,
            });
        }
        if screen.is_some() {
            c.add_window(id);
        }
        debug!(id, chan = %pix, "draw: image allocated");
        Ok(Image {
            conn: Some(self.clone()),
            id,
            chan: pix,
            depth,
            repl,
            r,
            clipr,
            screen,
        })
    }

    /// Look up an image another client published under `name`.
    pub fn named_image(&self, name: &str) -> DrawResult<Image> {
        if name.len() > MAX_NAME {
            return Err(DrawError::Config(format!(
                "image name too long ({} bytes)",
                name.len()
            )));
        }
        let mut c = self.lock();
        let id = c.next_id();
        let b = c.bufimage(1 + 4 + 1 + name.len())?;
        Packer::new(b)
            .u8(b'n')
            .u32(id)
            .u8(name.len() as u8)
            .bytes(name.as_bytes());
        c.flush(false)?;
        let info = c.read_ctl_info()?;
        drop(c);
        let mut img = Image::from_info(Some(self.clone()), id, &info);
        if img.depth == 0 {
            // the server described something unusable; release the id
            img.free()?;
            return Err(DrawError::Protocol(format!("named image {name:?} has bad chan")));
        }
        Ok(img)
    }
}
