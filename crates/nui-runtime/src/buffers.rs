#![forbid(unsafe_code)]

//! Text buffers behind the body and tag nodes.
//!
//! Each body or tag id owns one [`TextSlot`]: its runes plus the current
//! selection in buffer coordinates. Slots are shared between the UI thread,
//! which edits them and paints frames over them, and file-server threads,
//! which read and replace their text.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use nui_layout::NodeType;
use nui_text::TextBuffer;

use crate::store::BufferProxy;

/// Which family of editable node a buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferKind {
    Body,
    Tag,
}

impl BufferKind {
    /// Store prefix routing to this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Body => "_body",
            Self::Tag => "_tag",
        }
    }

    pub fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "_body" => Some(Self::Body),
            "_tag" => Some(Self::Tag),
            _ => None,
        }
    }

    /// The buffer kind backing a node type, if it is editable.
    pub fn of_node(kind: NodeType) -> Option<Self> {
        match kind {
            NodeType::Body => Some(Self::Body),
            NodeType::Tag => Some(Self::Tag),
            _ => None,
        }
    }
}

/// A buffer and its selection `[q0, q1)`.
#[derive(Debug, Clone, Default)]
pub struct TextSlot {
    pub text: TextBuffer,
    q0: usize,
    q1: usize,
}

impl TextSlot {
    pub fn new(text: &str) -> Self {
        Self {
            text: TextBuffer::from_text(text),
            q0: 0,
            q1: 0,
        }
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.q0, self.q1)
    }

    /// Set the selection, clamped to the text and ordered.
    pub fn select(&mut self, q0: usize, q1: usize) {
        let n = self.text.nc();
        let (a, b) = (q0.min(n), q1.min(n));
        (self.q0, self.q1) = if a <= b { (a, b) } else { (b, a) };
    }

    pub fn selected_text(&self) -> String {
        self.text.read_range(self.q0, self.q1)
    }

    /// Replace the selection with `runes`, leaving an empty selection after
    /// them.
    pub fn type_runes(&mut self, runes: &[char]) {
        let (q0, q1) = self.selection();
        if q1 > q0 {
            self.text.delete(q0, q1);
        }
        self.text.insert(q0, runes);
        let q = q0 + runes.len();
        self.q0 = q;
        self.q1 = q;
    }

    /// Delete the selection, or the rune before an empty one.
    pub fn backspace(&mut self) {
        let (q0, q1) = self.selection();
        if q1 > q0 {
            self.text.delete(q0, q1);
            self.q1 = q0;
        } else if q0 > 0 {
            self.text.delete(q0 - 1, q0);
            self.q0 = q0 - 1;
            self.q1 = q0 - 1;
        }
    }

    /// Replace the whole text, keeping the selection where it still fits.
    pub fn set_text(&mut self, text: &str) {
        self.text.set_text(text);
        self.select(self.q0, self.q1);
    }
}

/// Shared handle on one slot.
pub type SharedSlot = Arc<Mutex<TextSlot>>;

/// Lock a slot, ignoring poisoning: a slot is plain data and stays usable.
pub fn lock_slot(slot: &SharedSlot) -> MutexGuard<'_, TextSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All body and tag buffers, keyed by kind and node id.
#[derive(Debug, Default)]
pub struct Buffers {
    slots: RwLock<BTreeMap<(BufferKind, String), SharedSlot>>,
}

impl Buffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `id`, created holding `initial` if missing.
    pub fn ensure(&self, kind: BufferKind, id: &str, initial: &str) -> SharedSlot {
        if let Some(slot) = self.get(kind, id) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry((kind, id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(TextSlot::new(initial))))
            .clone()
    }

    pub fn get(&self, kind: BufferKind, id: &str) -> Option<SharedSlot> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&(kind, id.to_string())).cloned()
    }

    /// Drop every slot `keep` rejects.
    pub fn retain(&self, mut keep: impl FnMut(BufferKind, &str) -> bool) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|(kind, id), _| keep(*kind, id));
    }

    /// Run `f` on a slot.
    pub fn with<R>(&self, kind: BufferKind, id: &str, f: impl FnOnce(&mut TextSlot) -> R) -> Option<R> {
        let slot = self.get(kind, id)?;
        let mut guard = lock_slot(&slot);
        Some(f(&mut guard))
    }

    /// Current sequence number of a buffer.
    pub fn seq(&self, kind: BufferKind, id: &str) -> Option<u64> {
        self.with(kind, id, |s| s.text.seq())
    }

    /// Bump a buffer's sequence number without changing its text.
    pub fn mark_dirty(&self, kind: BufferKind, id: &str) -> bool {
        self.with(kind, id, |s| s.text.mark_dirty()).is_some()
    }
}

impl BufferProxy for Buffers {
    fn read(&self, kind: BufferKind, id: &str) -> Option<String> {
        self.with(kind, id, |s| s.text.read_all())
    }

    fn write(&self, kind: BufferKind, id: &str, text: &str) -> bool {
        self.with(kind, id, |s| s.set_text(text)).is_some()
    }

    fn ids(&self, kind: BufferKind) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect()
    }
}
