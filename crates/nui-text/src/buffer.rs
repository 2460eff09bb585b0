#![forbid(unsafe_code)]

//! In-memory rune buffer with change tracking.

/// Runes plus a change counter and a dirty flag.
///
/// Every mutation bumps [`seq`](TextBuffer::seq) and sets the dirty flag;
/// [`clean`](TextBuffer::clean) clears only the flag. Positions are rune
/// offsets and are clamped to the buffer, never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    runes: Vec<char>,
    seq: u64,
    dirty: bool,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            runes: text.chars().collect(),
            seq: 0,
            dirty: false,
        }
    }

    /// Number of runes.
    #[inline]
    pub fn nc(&self) -> usize {
        self.runes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runes.is_empty()
    }

    /// Read-only view of the contents.
    #[inline]
    pub fn runes(&self) -> &[char] {
        &self.runes
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag. The sequence number is left alone.
    pub fn clean(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.seq += 1;
        self.dirty = true;
    }

    /// Mark the buffer changed without altering its contents.
    pub fn mark_dirty(&mut self) {
        self.touch();
    }

    /// Insert `runes` before offset `q`.
    pub fn insert(&mut self, q: usize, runes: &[char]) {
        let q = q.min(self.runes.len());
        self.runes.splice(q..q, runes.iter().copied());
        self.touch();
    }

    pub fn insert_str(&mut self, q: usize, text: &str) {
        let runes: Vec<char> = text.chars().collect();
        self.insert(q, &runes);
    }

    /// Remove the runes in `[q0, q1)`.
    pub fn delete(&mut self, q0: usize, q1: usize) {
        let (q0, q1) = self.clamp_range(q0, q1);
        self.runes.drain(q0..q1);
        self.touch();
    }

    /// Copy runes starting at `q` into `out`, returning how many were copied.
    pub fn read(&self, q: usize, out: &mut [char]) -> usize {
        let q = q.min(self.runes.len());
        let n = out.len().min(self.runes.len() - q);
        out[..n].copy_from_slice(&self.runes[q..q + n]);
        n
    }

    /// The runes in `[q0, q1)` as a string.
    pub fn read_range(&self, q0: usize, q1: usize) -> String {
        let (q0, q1) = self.clamp_range(q0, q1);
        self.runes[q0..q1].iter().collect()
    }

    pub fn read_all(&self) -> String {
        self.runes.iter().collect()
    }

    /// Replace the whole contents.
    pub fn set_all(&mut self, runes: &[char]) {
        self.runes.clear();
        self.runes.extend_from_slice(runes);
        self.touch();
    }

    pub fn set_text(&mut self, text: &str) {
        self.runes = text.chars().collect();
        self.touch();
    }

    fn clamp_range(&self, q0: usize, q1: usize) -> (usize, usize) {
        let n = self.runes.len();
        let q1 = q1.min(n);
        (q0.min(q1), q1)
    }
}
