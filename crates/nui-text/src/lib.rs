#![forbid(unsafe_code)]

//! Editable rune buffers and the frame that displays them.
//!
//! [`TextBuffer`] holds the runes of a body or tag along with a sequence
//! number bumped on every mutation. [`DisplayFrame`] lays a prefix of some
//! rune sequence out in a rectangle, wrapping at the right edge and at
//! newlines, and maps between screen points and character offsets.
//!
//! # Example
//! ```
//! use nui_text::TextBuffer;
//!
//! let mut buf = TextBuffer::from_text("hello");
//! let before = buf.seq();
//! buf.insert_str(5, " world");
//! assert_eq!(buf.read_all(), "hello world");
//! buf.delete(5, 11);
//! assert_eq!(buf.read_all(), "hello");
//! assert!(buf.seq() > before);
//! assert!(buf.is_dirty());
//! ```

pub mod buffer;
pub mod frame;
pub mod word;

pub use buffer::TextBuffer;
pub use frame::{DisplayFrame, FrameColors, MouseSource, ScrollFn, SelectOutcome};
pub use word::word_at;
