#![forbid(unsafe_code)]

//! nineui file server
//!
//! Serves a running UI's state over 9P2000 so other processes can read the
//! view tree, drive it with actions, and edit its text.
//!
//! # Key Components
//!
//! - [`Msg`] / [`Fcall`] - The 9P2000 message codec
//! - [`Node`] - The fixed namespace and its read/write semantics
//! - [`Session`] - One connection's fid table and request handling
//! - [`serve`] - Runs a session over a byte stream
//! - [`Listener`] - Unix-socket listener with a thread per connection
//! - [`post`] - Posts the listener as `ui.<title>` in the srv directory
//!
//! # How it fits in the system
//! Every request goes through the same `UiCore` the UI thread uses, so a
//! line written to `/actions` runs the action pipeline exactly like a click,
//! and a write to `/state/<key>` recomputes the view.

pub mod codec;
pub mod error;
pub mod namespace;
pub mod server;

pub use codec::{Fcall, Msg, Qid, Stat, decode_dir, read_msg, write_msg};
pub use error::{NinepError, NinepResult};
pub use namespace::Node;
pub use server::{DEFAULT_MSIZE, Listener, Session, post, serve};
