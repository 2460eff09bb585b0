#![forbid(unsafe_code)]

//! Client side of the Plan 9 draw protocol.
//!
//! A [`Display`] owns a connection to a draw device: a control channel, a
//! data channel carrying the little-endian command stream, and an optional
//! refresh channel. Server-side resources ([`Image`], [`Screen`], windows,
//! the glyph cache of a [`Font`]) are addressed by ids handed out by the
//! connection and proxied locally.
//!
//! Commands are packed into a fixed-size buffer and written when the buffer
//! fills or the caller flushes. Every proxy holds a [`DrawConn`], the shared
//! locked half of the connection; the lock is held only for the emission of
//! a single command and its immediate reply.

pub mod bytes;
pub mod chan;
pub mod color;
pub mod display;
pub mod draw;
pub mod error;
pub mod font;
pub mod icossin;
pub mod image;
pub mod imagefile;
pub mod screen;

#[cfg(test)]
pub(crate) mod testing;

pub use chan::{ChannelType, Pix};
pub use color::Color;
pub use display::{DeviceFile, Display, DisplayConfig, DrawConn, ScreenInfo};
pub use draw::{DrawOp, End};
pub use error::{DrawError, DrawResult};
pub use font::{Font, Fontchar, Subfont, SubfontLoader};
pub use image::Image;
pub use nui_core::geometry::{Point, Rectangle};
pub use screen::{Refresh, Screen};
