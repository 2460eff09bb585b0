//! The display connection and its command buffer.
//!
//! # Connection layout
//!
//! Opening `<dir>/new` on a draw device yields the control channel; reading
//! it returns twelve 12-character fields describing the connection
//! (see [`ScreenInfo`]). The first field names the connection directory,
//! under which `data` carries commands and replies and `refresh` delivers
//! resize notifications.
//!
//! # Locking
//!
//! All protocol state (buffer, id counter, window chain, device handles)
//! sits behind one mutex in [`DrawConn`]. It is held only while a single
//! command is packed (and, for `r` and `n`, while its reply is read).
//! Operations built from other operations, like the font cache resize that
//! allocates an image, release it between the steps.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nui_core::geometry::Rectangle;
use nui_core::{debug, info, warn};

use crate::chan::Pix;
use crate::color::Color;
use crate::draw::DrawOp;
use crate::error::{DrawError, DrawResult};
use crate::image::Image;

/// Default size of the command buffer.
pub const DEFAULT_BUFSIZE: usize = 8000;

/// Room kept past the buffer size for the trailing flush marker.
const BUF_HEADROOM: usize = 5;

/// Length of one ctl-line field.
pub const CTL_FIELD: usize = 12;

/// Number of fields in a ctl line.
pub const CTL_NFIELDS: usize = 12;

/// A device channel: anything readable and writable that can cross threads.
pub trait DeviceFile: Read + Write + Send {}

impl<T: Read + Write + Send> DeviceFile for T {}

/// Tunables for a display connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Size of the command buffer in bytes.
    pub bufsize: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bufsize: DEFAULT_BUFSIZE,
        }
    }
}

impl DisplayConfig {
    /// Set the command buffer size (at least 512 bytes).
    #[must_use]
    pub fn with_bufsize(mut self, bufsize: usize) -> Self {
        self.bufsize = bufsize.max(512);
        self
    }
}

/// The twelve-field description returned by the ctl channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    /// Connection directory number.
    pub client: u32,
    /// Id of the described image (0 for the screen).
    pub image_id: u32,
    /// Pixel format of the image.
    pub chan: Pix,
    /// Whether the image tiles the plane.
    pub repl: bool,
    /// Image bounds.
    pub r: Rectangle,
    /// Clip rectangle.
    pub clipr: Rectangle,
}

impl ScreenInfo {
    /// Parse a ctl reply of at least 12 × 12 bytes.
    pub fn parse(buf: &[u8]) -> DrawResult<ScreenInfo> {
        if buf.len() < CTL_FIELD * CTL_NFIELDS {
            return Err(DrawError::Protocol(format!(
                "short ctl reply: {} bytes",
                buf.len()
            )));
        }
        let field = |i: usize| -> DrawResult<&str> {
            std::str::from_utf8(&buf[i * CTL_FIELD..(i + 1) * CTL_FIELD])
                .map(str::trim)
                .map_err(|_| DrawError::Protocol(format!("ctl field {i} is not text")))
        };
        let num = |i: usize| -> DrawResult<i32> {
            let f = field(i)?;
            f.parse::<i32>()
                .map_err(|_| DrawError::Protocol(format!("ctl field {i}: bad number {f:?}")))
        };
        let chan_text = field(2)?;
        let chan = Pix::parse(chan_text)
            .filter(|p| p.depth() != 0)
            .ok_or_else(|| DrawError::Protocol(format!("ctl: bad channel {chan_text:?}")))?;
        Ok(ScreenInfo {
            client: num(0)? as u32,
            image_id: num(1)? as u32,
            chan,
            repl: num(3)? != 0,
            r: Rectangle::new(num(4)?, num(5)?, num(6)?, num(7)?),
            clipr: Rectangle::new(num(8)?, num(9)?, num(10)?, num(11)?),
        })
    }

    /// Format in ctl-line form: twelve right-aligned 11-character fields,
    /// each followed by a space.
    pub fn format(&self) -> Vec<u8> {
        let fields = [
            self.client.to_string(),
            self.image_id.to_string(),
            self.chan.to_string(),
            u8::from(self.repl).to_string(),
            self.r.min.x.to_string(),
            self.r.min.y.to_string(),
            self.r.max.x.to_string(),
            self.r.max.y.to_string(),
            self.clipr.min.x.to_string(),
            self.clipr.min.y.to_string(),
            self.clipr.max.x.to_string(),
            self.clipr.max.y.to_string(),
        ];
        let mut out = String::with_capacity(CTL_FIELD * CTL_NFIELDS);
        for f in &fields {
            out.push_str(&format!("{f:>11} "));
        }
        out.into_bytes()
    }
}

/// Protocol state guarded by the connection lock.
pub(crate) struct Conn {
    buf: Vec<u8>,
    bufsize: usize,
    imageid: u32,
    windows: Vec<u32>,
    ctl: Box<dyn DeviceFile>,
    data: Box<dyn DeviceFile>,
    pub(crate) opaque: u32,
    pub(crate) black: u32,
    pub(crate) white: u32,
    pub(crate) screen_depth: u32,
}

impl Conn {
    /// Reserve `n` bytes for one command, flushing first if they do not fit.
    pub(crate) fn bufimage(&mut self, n: usize) -> DrawResult<&mut [u8]> {
        if n > self.bufsize {
            return Err(DrawError::Config(format!(
                "command of {n} bytes exceeds buffer of {}",
                self.bufsize
            )));
        }
        if self.buf.len() + n > self.bufsize {
            self.write_buffer()?;
        }
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        Ok(&mut self.buf[start..])
    }

    /// Like [`bufimage`](Self::bufimage), prefixing an `O` command when `op`
    /// is not the default `SoverD`. The returned slice covers only the
    /// caller's command.
    pub(crate) fn bufimage_op(&mut self, n: usize, op: DrawOp) -> DrawResult<&mut [u8]> {
        if op == DrawOp::SOVER_D {
            return self.bufimage(n);
        }
        let b = self.bufimage(n + 2)?;
        b[0] = b'O';
        b[1] = op.bits();
        Ok(&mut b[2..])
    }

    fn write_buffer(&mut self) -> DrawResult<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.data.write_all(&self.buf);
        self.buf.clear();
        result.map_err(|err| {
            warn!(error = %err, "draw: flush failed");
            DrawError::Transport(err)
        })
    }

    /// Write out pending commands, appending `v` when `visible`.
    pub(crate) fn flush(&mut self, visible: bool) -> DrawResult<()> {
        if visible {
            // headroom guarantees the marker fits
            self.buf.push(b'v');
        }
        self.write_buffer()
    }

    pub(crate) fn next_id(&mut self) -> u32 {
        self.imageid = self.imageid.wrapping_add(1);
        if self.imageid == 0 {
            self.imageid = 1;
        }
        self.imageid
    }

    pub(crate) fn read_data(&mut self, out: &mut [u8]) -> DrawResult<usize> {
        self.data.read(out).map_err(DrawError::Transport)
    }

    pub(crate) fn read_ctl_info(&mut self) -> DrawResult<ScreenInfo> {
        let mut buf = [0u8; CTL_FIELD * CTL_NFIELDS];
        let mut got = 0;
        while got < buf.len() {
            let n = self.ctl.read(&mut buf[got..]).map_err(DrawError::Transport)?;
            if n == 0 {
                break;
            }
            got += n;
        }
        ScreenInfo::parse(&buf[..got])
    }

    pub(crate) fn add_window(&mut self, id: u32) {
        self.windows.push(id);
    }

    pub(crate) fn remove_window(&mut self, id: u32) {
        self.windows.retain(|&w| w != id);
    }

    pub(crate) fn windows(&self) -> &[u32] {
        &self.windows
    }

    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn bufsize(&self) -> usize {
        self.bufsize
    }
}

/// Shared, locked handle to the protocol state of one display.
///
/// Every server-side proxy keeps one of these to emit its commands.
#[derive(Clone)]
pub struct DrawConn {
    inner: Arc<Mutex<Conn>>,
}

impl std::fmt::Debug for DrawConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawConn")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

impl DrawConn {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Conn> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if both handles refer to the same connection.
    pub fn same(&self, other: &DrawConn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Write pending commands; `visible` also asks the device to update the
    /// screen.
    pub fn flush(&self, visible: bool) -> DrawResult<()> {
        self.lock().flush(visible)
    }

    /// Depth of the screen image.
    pub fn screen_depth(&self) -> u32 {
        self.lock().screen_depth
    }

    /// Id of the opaque (all-ones) replicated image used as a default mask.
    pub fn opaque_id(&self) -> u32 {
        self.lock().opaque
    }

    /// Id of the replicated black image.
    pub fn black_id(&self) -> u32 {
        self.lock().black
    }

    /// Ids of the windows allocated on this connection, oldest first.
    pub fn window_ids(&self) -> Vec<u32> {
        self.lock().windows().to_vec()
    }

    /// Bytes packed but not yet written.
    pub fn pending_bytes(&self) -> usize {
        self.lock().pending()
    }

    /// Size of the command buffer.
    pub fn bufsize(&self) -> usize {
        self.lock().bufsize()
    }
}

/// An open display: the connection plus the screen image and the standard
/// black and white images.
pub struct Display {
    conn: DrawConn,
    /// The screen image (id 0).
    pub image: Image,
    /// Replicated opaque white; doubles as the opaque mask.
    pub white: Image,
    /// Replicated black; doubles as the transparent mask.
    pub black: Image,
    info: ScreenInfo,
    refresh: Option<Box<dyn Read + Send>>,
    dir: Option<PathBuf>,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("info", &self.info)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl Display {
    /// Open a connection on the draw device rooted at `dir` (usually
    /// `/dev/draw`).
    pub fn open(dir: &Path) -> DrawResult<Display> {
        Self::open_with_config(dir, DisplayConfig::default())
    }

    /// Open with explicit tunables.
    pub fn open_with_config(dir: &Path, config: DisplayConfig) -> DrawResult<Display> {
        let mut ctl = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join("new"))?;
        let mut buf = [0u8; CTL_FIELD * CTL_NFIELDS];
        ctl.read_exact(&mut buf)
            .map_err(|e| DrawError::Protocol(format!("reading ctl: {e}")))?;
        let info = ScreenInfo::parse(&buf)?;
        let conndir = dir.join(info.client.to_string());
        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .open(conndir.join("data"))?;
        let refresh = File::open(conndir.join("refresh")).ok();
        let mut display = Self::attach(
            Box::new(ctl),
            Box::new(data),
            refresh.map(|f| Box::new(f) as Box<dyn Read + Send>),
            info,
            config,
        )?;
        display.dir = Some(conndir);
        Ok(display)
    }

    /// Open over caller-supplied channels. The ctl line is read from `ctl`.
    pub fn from_channels(
        mut ctl: Box<dyn DeviceFile>,
        data: Box<dyn DeviceFile>,
        refresh: Option<Box<dyn Read + Send>>,
        config: DisplayConfig,
    ) -> DrawResult<Display> {
        let mut buf = [0u8; CTL_FIELD * CTL_NFIELDS];
        ctl.read_exact(&mut buf)
            .map_err(|e| DrawError::Protocol(format!("reading ctl: {e}")))?;
        let info = ScreenInfo::parse(&buf)?;
        Self::attach(ctl, data, refresh, info, config)
    }

    fn attach(
        ctl: Box<dyn DeviceFile>,
        data: Box<dyn DeviceFile>,
        refresh: Option<Box<dyn Read + Send>>,
        info: ScreenInfo,
        config: DisplayConfig,
    ) -> DrawResult<Display> {
        let bufsize = config.bufsize;
        let conn = DrawConn {
            inner: Arc::new(Mutex::new(Conn {
                buf: Vec::with_capacity(bufsize + BUF_HEADROOM),
                bufsize,
                imageid: 0,
                windows: Vec::new(),
                ctl,
                data,
                opaque: 0,
                black: 0,
                white: 0,
                screen_depth: info.chan.depth(),
            })),
        };
        let image = Image::from_info(Some(conn.clone()), 0, &info);
        let white = conn.alloc_image(Rectangle::new(0, 0, 1, 1), Pix::GREY1, true, Color::WHITE)?;
        let black = conn.alloc_image(Rectangle::new(0, 0, 1, 1), Pix::GREY1, true, Color::BLACK)?;
        {
            let mut c = conn.lock();
            c.white = white.id;
            c.opaque = white.id;
            c.black = black.id;
        }
        info!(
            client = info.client,
            chan = %info.chan,
            width = info.r.dx(),
            height = info.r.dy(),
            "draw: display attached"
        );
        Ok(Display {
            conn,
            image,
            white,
            black,
            info,
            refresh,
            dir: None,
        })
    }

    /// The shared connection handle.
    pub fn conn(&self) -> &DrawConn {
        &self.conn
    }

    /// The ctl description read at open time (or at the last
    /// [`refresh_screen`](Self::refresh_screen)).
    pub fn info(&self) -> &ScreenInfo {
        &self.info
    }

    /// Connection directory, when opened from a device path.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Flush pending commands and make them visible.
    pub fn flush(&self) -> DrawResult<()> {
        self.conn.flush(true)
    }

    /// Allocate an image on this display.
    pub fn alloc_image(
        &self,
        r: Rectangle,
        pix: Pix,
        repl: bool,
        fill: Color,
    ) -> DrawResult<Image> {
        self.conn.alloc_image(r, pix, repl, fill)
    }

    /// Re-read the ctl description after a resize and update the screen
    /// image bounds.
    pub fn refresh_screen(&mut self) -> DrawResult<()> {
        let info = self.conn.lock().read_ctl_info()?;
        debug!(width = info.r.dx(), height = info.r.dy(), "draw: screen refreshed");
        self.image.r = info.r;
        self.image.clipr = info.clipr;
        self.info = info;
        Ok(())
    }

    /// Hand the refresh channel to a reader task.
    pub fn take_refresh(&mut self) -> Option<Box<dyn Read + Send>> {
        self.refresh.take()
    }

    /// Free the standard images and flush. The screen image is not freed.
    pub fn close(mut self) -> DrawResult<()> {
        self.white.free()?;
        self.black.free()?;
        self.conn.flush(false)?;
        info!(client = self.info.client, "draw: display closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_info_round_trip() {
        let info = ScreenInfo {
            client: 3,
            image_id: 0,
            chan: Pix::XRGB32,
            repl: false,
            r: Rectangle::new(0, 0, 640, 480),
            clipr: Rectangle::new(0, 0, 640, 480),
        };
        let line = info.format();
        assert_eq!(line.len(), 144);
        assert_eq!(ScreenInfo::parse(&line).ok(), Some(info));
    }

    #[test]
    fn screen_info_rejects_short_or_bad() {
        assert!(matches!(
            ScreenInfo::parse(b"too short"),
            Err(DrawError::Protocol(_))
        ));
        let mut line = ScreenInfo {
            client: 1,
            image_id: 0,
            chan: Pix::RGB24,
            repl: false,
            r: Rectangle::new(0, 0, 1, 1),
            clipr: Rectangle::new(0, 0, 1, 1),
        }
        .format();
        line[2 * CTL_FIELD + 10] = b'q';
        assert!(ScreenInfo::parse(&line).is_err());
    }

    #[test]
    fn standard_masks_alias_white_and_black() {
        let (display, _wire) = crate::testing::recording_display();
        let conn = display.conn();
        assert_eq!(conn.opaque_id(), display.white.id);
        assert_eq!(conn.black_id(), display.black.id);
        assert_ne!(display.white.id, display.black.id);
        assert!(display.white.repl && display.black.repl);
        assert_eq!(display.white.chan, Pix::GREY1);
    }

    #[test]
    fn config_clamps_tiny_buffers() {
        assert_eq!(DisplayConfig::default().bufsize, DEFAULT_BUFSIZE);
        assert_eq!(DisplayConfig::default().with_bufsize(10).bufsize, 512);
    }
}
