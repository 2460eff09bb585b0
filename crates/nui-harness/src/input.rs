//! Scripted input: mouse gestures and keyboard byte streams.

use std::collections::VecDeque;

use nui_core::event::{Buttons, Mouse, MouseMessage, format_mouse_message};
use nui_core::geometry::Point;

/// A queue of mouse states replayed in order.
///
/// Timestamps advance by ten milliseconds per event.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMouse {
    queue: VecDeque<Mouse>,
    msec: u32,
}

impl ScriptedMouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a state.
    #[must_use]
    pub fn at(mut self, xy: Point, buttons: Buttons) -> Self {
        self.msec += 10;
        self.queue.push_back(Mouse::new(xy, buttons, self.msec));
        self
    }

    /// Press `button` at `from`, move through `path`, release at the last
    /// point.
    #[must_use]
    pub fn drag(mut self, button: Buttons, from: Point, path: &[Point]) -> Self {
        self = self.at(from, button);
        for &p in path {
            self = self.at(p, button);
        }
        let end = path.last().copied().unwrap_or(from);
        self.at(end, Buttons::empty())
    }

    /// Press and release `button` at `xy`.
    #[must_use]
    pub fn click(self, button: Buttons, xy: Point) -> Self {
        self.at(xy, button).at(xy, Buttons::empty())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The whole script in mouse-device format.
    pub fn to_device_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.queue.len() * nui_core::event::MOUSE_MSG_LEN);
        for m in &self.queue {
            out.extend_from_slice(&format_mouse_message(&MouseMessage::Mouse(*m)));
        }
        out
    }
}

impl Iterator for ScriptedMouse {
    type Item = Mouse;

    fn next(&mut self) -> Option<Mouse> {
        self.queue.pop_front()
    }
}

/// Keyboard device bytes for `text`, each rune in `shifted` preceded by
/// the shift prefix.
pub fn key_bytes(text: &str, shifted: &[char]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut tmp = [0u8; 4];
    for r in text.chars() {
        if shifted.contains(&r) {
            out.extend_from_slice(nui_core::event::keys::KSHIFT.encode_utf8(&mut tmp).as_bytes());
        }
        out.extend_from_slice(r.encode_utf8(&mut tmp).as_bytes());
    }
    out
}
