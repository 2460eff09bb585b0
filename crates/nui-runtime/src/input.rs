#![forbid(unsafe_code)]

//! Device reader threads.
//!
//! Each reader decodes one device into [`Event`]s on a shared bounded
//! channel. Sends never block: when the channel is full the event is
//! dropped, since a UI that far behind would not show it anyway. The
//! keyboard reader is the exception at end of input, where it waits to
//! deliver the final wake-up so the dispatch loop sees the closed flag.

use std::io::{self, ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use nui_core::event::{Event, KeyDecoder, MOUSE_MSG_LEN, MouseMessage, parse_mouse_message};

/// Send without blocking. Returns false once the receiver is gone.
fn offer(tx: &SyncSender<Event>, ev: Event) -> bool {
    match tx.try_send(ev) {
        Ok(()) => true,
        Err(TrySendError::Full(ev)) => {
            trace!(?ev, "input: channel full, event dropped");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Decodes 49-byte mouse device messages.
pub struct MouseReader<R> {
    src: R,
    tx: SyncSender<Event>,
}

impl<R: Read + Send + 'static> MouseReader<R> {
    pub fn new(src: R, tx: SyncSender<Event>) -> Self {
        Self { src, tx }
    }

    /// Run on a named thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("nui-mouse".into())
            .spawn(move || self.run())
    }

    /// Read until end of input or until the receiver goes away.
    pub fn run(mut self) {
        let mut buf = [0u8; MOUSE_MSG_LEN];
        loop {
            if let Err(err) = self.src.read_exact(&mut buf) {
                if err.kind() != ErrorKind::UnexpectedEof {
                    warn!(error = %err, "input: mouse read failed");
                }
                debug!("input: mouse reader done");
                return;
            }
            let ev = match parse_mouse_message(&buf) {
                Ok(MouseMessage::Mouse(m)) => Event::Mouse(m),
                Ok(MouseMessage::Resize(_)) => Event::Resize,
                Err(err) => {
                    warn!(error = %err, "input: bad mouse message");
                    continue;
                }
            };
            if !offer(&self.tx, ev) {
                return;
            }
        }
    }
}

/// Decodes the keyboard byte stream into keys.
pub struct KeyboardReader<R> {
    src: R,
    tx: SyncSender<Event>,
    closed: Arc<AtomicBool>,
}

impl<R: Read + Send + 'static> KeyboardReader<R> {
    /// `closed` is set when the keyboard reaches end of input.
    pub fn new(src: R, tx: SyncSender<Event>, closed: Arc<AtomicBool>) -> Self {
        Self { src, tx, closed }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("nui-keyboard".into())
            .spawn(move || self.run())
    }

    pub fn run(mut self) {
        let mut decoder = KeyDecoder::new();
        let mut buf = [0u8; 256];
        loop {
            let n = match self.src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "input: keyboard read failed");
                    break;
                }
            };
            for key in decoder.feed(&buf[..n]) {
                if !offer(&self.tx, Event::Key(key)) {
                    return;
                }
            }
        }
        debug!("input: keyboard closed");
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Event::Wake);
    }
}

/// Turns each read on the display's refresh channel into a resize.
pub struct RefreshReader {
    src: Box<dyn Read + Send>,
    tx: SyncSender<Event>,
}

impl RefreshReader {
    pub fn new(src: Box<dyn Read + Send>, tx: SyncSender<Event>) -> Self {
        Self { src, tx }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("nui-refresh".into())
            .spawn(move || self.run())
    }

    pub fn run(mut self) {
        let mut buf = [0u8; 128];
        loop {
            match self.src.read(&mut buf) {
                Ok(0) => return,
                Ok(_) => {
                    if !offer(&self.tx, Event::Resize) {
                        return;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    debug!(error = %err, "input: refresh channel closed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nui_core::event::{Buttons, KeyEvent, Mouse, format_mouse_message, keys};
    use nui_core::geometry::Point;
    use std::io::Cursor;
    use std::sync::mpsc::sync_channel;

    fn message(msg: MouseMessage) -> Vec<u8> {
        format_mouse_message(&msg).to_vec()
    }

    #[test]
    fn mouse_messages_become_events() {
        let m = Mouse::new(Point::new(3, 4), Buttons::LEFT, 10);
        let mut bytes = message(MouseMessage::Mouse(m));
        bytes.extend(message(MouseMessage::Resize(m)));
        bytes.extend(b"garbage");
        let (tx, rx) = sync_channel(8);
        MouseReader::new(Cursor::new(bytes), tx).run();
        let got: Vec<Event> = rx.try_iter().collect();
        assert_eq!(got, vec![Event::Mouse(m), Event::Resize]);
    }

    #[test]
    fn full_channel_drops_events() {
        let m = Mouse::new(Point::new(1, 1), Buttons::empty(), 0);
        let bytes: Vec<u8> = (0..5).flat_map(|_| message(MouseMessage::Mouse(m))).collect();
        let (tx, rx) = sync_channel(2);
        MouseReader::new(Cursor::new(bytes), tx).run();
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn keyboard_reports_keys_then_closes() {
        let mut bytes = "a".as_bytes().to_vec();
        let mut tmp = [0u8; 4];
        bytes.extend(keys::KSHIFT.encode_utf8(&mut tmp).as_bytes());
        bytes.extend("\t".as_bytes());
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = sync_channel(8);
        KeyboardReader::new(Cursor::new(bytes), tx, closed.clone()).run();
        let got: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                Event::Key(KeyEvent::new('a')),
                Event::Key(KeyEvent::shifted('\t')),
                Event::Wake,
            ]
        );
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn refresh_reads_become_resizes() {
        let (tx, rx) = sync_channel(4);
        RefreshReader::new(Box::new(Cursor::new(b"x".to_vec())), tx).run();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Event::Resize]);
    }

    #[test]
    fn readers_run_on_threads() {
        let (tx, rx) = sync_channel(4);
        let m = Mouse::new(Point::new(7, 7), Buttons::RIGHT, 5);
        let handle = MouseReader::new(Cursor::new(message(MouseMessage::Mouse(m))), tx)
            .spawn()
            .unwrap();
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), Event::Mouse(m));
    }
}
