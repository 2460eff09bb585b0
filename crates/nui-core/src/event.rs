#![forbid(unsafe_code)]

//! Input events decoded from the mouse and keyboard devices.
//!
//! The mouse device delivers fixed 49-byte messages: a one-byte kind
//! (`m` for motion/buttons, `r` for a resize notification) followed by four
//! 12-character space-padded decimal fields (x, y, buttons, msec).
//!
//! The keyboard device delivers a UTF-8 byte stream. [`RuneDecoder`] turns it
//! into runes, and [`KeyDecoder`] folds the `Kshift` prefix rune into a
//! shift flag on the following key.

use bitflags::bitflags;

use crate::geometry::Point;

/// Size of one mouse device message.
pub const MOUSE_MSG_LEN: usize = 1 + 4 * 12;

bitflags! {
    /// Mouse buttons held during an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        /// Button 1 (left).
        const LEFT   = 1;
        /// Button 2 (middle).
        const MIDDLE = 2;
        /// Button 3 (right).
        const RIGHT  = 4;
        /// Wheel up.
        const WHEEL_UP   = 8;
        /// Wheel down.
        const WHEEL_DOWN = 16;
    }
}

/// Mouse state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mouse {
    pub xy: Point,
    pub buttons: Buttons,
    pub msec: u32,
}

impl Mouse {
    /// Create a mouse state.
    pub const fn new(xy: Point, buttons: Buttons, msec: u32) -> Self {
        Self { xy, buttons, msec }
    }
}

/// A decoded mouse device message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    /// Pointer motion or button change.
    Mouse(Mouse),
    /// The window was resized; carries the pointer state at that time.
    Resize(Mouse),
}

/// Error decoding a device message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad device message: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

fn decimal_field(field: &[u8]) -> Result<i64, DecodeError> {
    let text = std::str::from_utf8(field)
        .map_err(|_| DecodeError("non-ascii numeric field".into()))?
        .trim();
    text.parse::<i64>()
        .map_err(|_| DecodeError(format!("bad numeric field {text:?}")))
}

/// Decode one 49-byte mouse message.
pub fn parse_mouse_message(buf: &[u8]) -> Result<MouseMessage, DecodeError> {
    if buf.len() < MOUSE_MSG_LEN {
        return Err(DecodeError(format!("short mouse message: {} bytes", buf.len())));
    }
    let field = |i: usize| decimal_field(&buf[1 + 12 * i..1 + 12 * (i + 1)]);
    let mouse = Mouse {
        xy: Point::new(field(0)? as i32, field(1)? as i32),
        buttons: Buttons::from_bits_truncate(field(2)? as u32),
        msec: field(3)? as u32,
    };
    match buf[0] {
        b'm' => Ok(MouseMessage::Mouse(mouse)),
        b'r' => Ok(MouseMessage::Resize(mouse)),
        other => Err(DecodeError(format!("unknown mouse message kind {other:#x}"))),
    }
}

/// Encode a mouse message in device format.
pub fn format_mouse_message(msg: &MouseMessage) -> [u8; MOUSE_MSG_LEN] {
    let (kind, m) = match msg {
        MouseMessage::Mouse(m) => (b'm', m),
        MouseMessage::Resize(m) => (b'r', m),
    };
    let text = format!(
        "{}{:>11} {:>11} {:>11} {:>11} ",
        kind as char,
        m.xy.x,
        m.xy.y,
        m.buttons.bits(),
        m.msec
    );
    let mut out = [b' '; MOUSE_MSG_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(MOUSE_MSG_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Plan 9 keyboard runes.
pub mod keys {
    /// Base of the function-key range.
    pub const KF: u32 = 0xF000;
    /// Base of the special-key range.
    pub const SPEC: u32 = 0xF800;

    const fn key(v: u32) -> char {
        match char::from_u32(v) {
            Some(c) => c,
            None => '\u{FFFD}',
        }
    }

    pub const KVIEW: char = key(SPEC);
    pub const KF1: char = key(KF | 1);
    pub const KF2: char = key(KF | 2);
    pub const KF3: char = key(KF | 3);
    pub const KF4: char = key(KF | 4);
    pub const KF5: char = key(KF | 5);
    pub const KF6: char = key(KF | 6);
    pub const KF7: char = key(KF | 7);
    pub const KF8: char = key(KF | 8);
    pub const KF9: char = key(KF | 9);
    pub const KF10: char = key(KF | 10);
    pub const KF11: char = key(KF | 11);
    pub const KF12: char = key(KF | 12);
    pub const KHOME: char = key(KF | 0x0D);
    pub const KUP: char = key(KF | 0x0E);
    pub const KDOWN: char = KVIEW;
    pub const KPGUP: char = key(KF | 0x0F);
    pub const KPRINT: char = key(KF | 0x10);
    pub const KLEFT: char = key(KF | 0x11);
    pub const KRIGHT: char = key(KF | 0x12);
    pub const KPGDOWN: char = key(KF | 0x13);
    pub const KINS: char = key(KF | 0x14);
    pub const KALT: char = key(KF | 0x15);
    pub const KSHIFT: char = key(KF | 0x16);
    pub const KCTL: char = key(KF | 0x17);
    pub const KEND: char = key(KF | 0x18);
    pub const KSCROLL: char = key(KF | 0x19);
    pub const KSCROLLONEUP: char = key(KF | 0x20);
    pub const KSCROLLONEDOWN: char = key(KF | 0x21);

    pub const KSOH: char = '\u{01}';
    pub const KSTX: char = '\u{02}';
    pub const KETX: char = '\u{03}';
    pub const KEOF: char = '\u{04}';
    pub const KENQ: char = '\u{05}';
    pub const KACK: char = '\u{06}';
    pub const KBS: char = '\u{08}';
    pub const KNACK: char = '\u{15}';
    pub const KETB: char = '\u{17}';
    pub const KESC: char = '\u{1B}';
    pub const KDEL: char = '\u{7F}';

    pub const KBREAK: char = key(SPEC | 0x61);
    pub const KCAPS: char = key(SPEC | 0x64);
    pub const KNUM: char = key(SPEC | 0x65);
    pub const KMIDDLE: char = key(SPEC | 0x66);
    pub const KALTGR: char = key(SPEC | 0x67);

    /// Check if the rune is a printable character rather than a control
    /// or navigation key.
    pub fn is_printable(r: char) -> bool {
        let v = r as u32;
        if (KF..=0xF8FF).contains(&v) {
            return false;
        }
        r == '\n' || r == '\t' || !r.is_control()
    }
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub rune: char,
    /// Set when the rune was immediately preceded by `Kshift`.
    pub shift: bool,
}

impl KeyEvent {
    pub const fn new(rune: char) -> Self {
        Self { rune, shift: false }
    }

    pub const fn shifted(rune: char) -> Self {
        Self { rune, shift: true }
    }
}

/// Any input the dispatch loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Mouse(Mouse),
    Key(KeyEvent),
    /// The display was resized.
    Resize,
    /// Something outside the input devices changed state (a 9P write, a
    /// finished command) and the UI should repaint.
    Wake,
}

/// Incremental UTF-8 decoder for the keyboard byte stream.
///
/// Malformed sequences decode to U+FFFD; an incomplete trailing sequence is
/// held until more bytes arrive.
#[derive(Debug, Default, Clone)]
pub struct RuneDecoder {
    pending: Vec<u8>,
}

impl RuneDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; decoded runes are appended to `out`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<char>) {
        self.pending.extend_from_slice(bytes);
        let mut i = 0;
        while i < self.pending.len() {
            let b = self.pending[i];
            let need = match b {
                0x00..=0x7F => 1,
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    i += 1;
                    continue;
                }
            };
            if i + need > self.pending.len() {
                // Incomplete: keep only if every continuation byte so far is valid.
                if self.pending[i + 1..]
                    .iter()
                    .all(|&c| (0x80..=0xBF).contains(&c))
                {
                    break;
                }
                out.push(char::REPLACEMENT_CHARACTER);
                i += 1;
                continue;
            }
            match std::str::from_utf8(&self.pending[i..i + need]) {
                Ok(s) => {
                    out.extend(s.chars());
                    i += need;
                }
                Err(_) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    i += 1;
                }
            }
        }
        self.pending.drain(..i);
    }
}

/// Turns decoded runes into [`KeyEvent`]s, latching `Kshift`.
#[derive(Debug, Default, Clone)]
pub struct KeyDecoder {
    runes: RuneDecoder,
    shift: bool,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed keyboard bytes and collect the resulting key events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        let mut runes = Vec::new();
        self.runes.feed(bytes, &mut runes);
        let mut events = Vec::with_capacity(runes.len());
        for r in runes {
            if r == keys::KSHIFT {
                self.shift = true;
                continue;
            }
            events.push(KeyEvent {
                rune: r,
                shift: std::mem::take(&mut self.shift),
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_message_round_trip() {
        let msg = MouseMessage::Mouse(Mouse::new(
            Point::new(120, -4),
            Buttons::LEFT | Buttons::RIGHT,
            987_654,
        ));
        let bytes = format_mouse_message(&msg);
        assert_eq!(bytes.len(), 49);
        assert_eq!(parse_mouse_message(&bytes), Ok(msg));
    }

    #[test]
    fn resize_message_kind() {
        let mut bytes = format_mouse_message(&MouseMessage::Mouse(Mouse::default()));
        bytes[0] = b'r';
        assert!(matches!(
            parse_mouse_message(&bytes),
            Ok(MouseMessage::Resize(_))
        ));
    }

    #[test]
    fn short_and_unknown_messages_rejected() {
        assert!(parse_mouse_message(b"m 1 2").is_err());
        let mut bytes = format_mouse_message(&MouseMessage::Mouse(Mouse::default()));
        bytes[0] = b'q';
        assert!(parse_mouse_message(&bytes).is_err());
    }

    #[test]
    fn rune_decoder_handles_split_sequences() {
        let mut d = RuneDecoder::new();
        let mut out = Vec::new();
        let bytes = "aé€".as_bytes();
        d.feed(&bytes[..2], &mut out);
        assert_eq!(out, vec!['a']);
        d.feed(&bytes[2..4], &mut out);
        assert_eq!(out, vec!['a', 'é']);
        d.feed(&bytes[4..], &mut out);
        assert_eq!(out, vec!['a', 'é', '€']);
    }

    #[test]
    fn rune_decoder_replaces_garbage() {
        let mut d = RuneDecoder::new();
        let mut out = Vec::new();
        d.feed(&[0xFF, b'x', 0xC3, b'y'], &mut out);
        assert_eq!(out, vec!['\u{FFFD}', 'x', '\u{FFFD}', 'y']);
    }

    #[test]
    fn kshift_marks_next_key() {
        let mut d = KeyDecoder::new();
        let mut bytes = Vec::new();
        let mut tmp = [0u8; 4];
        bytes.extend_from_slice(keys::KSHIFT.encode_utf8(&mut tmp).as_bytes());
        bytes.push(b'\t');
        bytes.push(b'\t');
        let evs = d.feed(&bytes);
        assert_eq!(evs, vec![KeyEvent::shifted('\t'), KeyEvent::new('\t')]);
    }

    #[test]
    fn printable_classification() {
        assert!(keys::is_printable('a'));
        assert!(keys::is_printable('\n'));
        assert!(!keys::is_printable(keys::KUP));
        assert!(!keys::is_printable(keys::KDEL));
        assert!(!keys::is_printable(keys::KESC));
    }
}
