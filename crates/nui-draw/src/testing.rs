//! Recording device channels for unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use nui_core::geometry::Rectangle;

use crate::chan::Pix;
use crate::display::{Display, DisplayConfig, ScreenInfo};

/// Shared record of what a display wrote, plus queued replies.
#[derive(Clone, Default)]
pub(crate) struct Wire {
    pub(crate) written: Arc<Mutex<Vec<u8>>>,
    pub(crate) replies: Arc<Mutex<VecDeque<u8>>>,
    /// While set, writes to the data channel fail.
    pub(crate) broken: Arc<AtomicBool>,
}

impl Wire {
    pub(crate) fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock().unwrap())
    }

    pub(crate) fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub(crate) fn reply(&self, bytes: &[u8]) {
        self.replies.lock().unwrap().extend(bytes.iter().copied());
    }
}

struct DataChan(Wire);

impl Write for DataChan {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.0.broken.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "draw device gone"));
        }
        self.0.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for DataChan {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut q = self.0.replies.lock().unwrap();
        let n = out.len().min(q.len());
        for (slot, b) in out.iter_mut().zip(q.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

struct CtlChan(io::Cursor<Vec<u8>>);

impl Read for CtlChan {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.0.read(out)
    }
}

impl Write for CtlChan {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn screen_info() -> ScreenInfo {
    ScreenInfo {
        client: 1,
        image_id: 0,
        chan: Pix::XRGB32,
        repl: false,
        r: Rectangle::new(0, 0, 640, 480),
        clipr: Rectangle::new(0, 0, 640, 480),
    }
}

/// A display whose data channel records into the returned wire. The
/// allocation of the standard images is already drained.
pub(crate) fn recording_display() -> (Display, Wire) {
    recording_display_with(Pix::XRGB32)
}

/// Like [`recording_display`], with a screen image in `chan`.
pub(crate) fn recording_display_with(chan: Pix) -> (Display, Wire) {
    let wire = Wire::default();
    let info = ScreenInfo {
        chan,
        ..screen_info()
    };
    let ctl = CtlChan(io::Cursor::new(info.format()));
    let display = Display::from_channels(
        Box::new(ctl),
        Box::new(DataChan(wire.clone())),
        None,
        DisplayConfig::default(),
    )
    .unwrap();
    wire.take();
    (display, wire)
}
