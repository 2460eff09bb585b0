#![forbid(unsafe_code)]

//! Headless testing support for nineui.
//!
//! - **Software draw device**: [`SoftDevice`] speaks the draw protocol over
//!   in-memory channels and keeps real pixels, so tests can open a
//!   [`Display`](nui_draw::Display), draw, and inspect the result.
//! - **Scripted input**: [`ScriptedMouse`] replays mouse gestures, either
//!   directly as [`Mouse`](nui_core::event::Mouse) values or as mouse-device
//!   bytes; [`key_bytes`] builds keyboard-device streams.
//!
//! # Quick Start
//!
//! ```ignore
//! use nui_harness::SoftDevice;
//!
//! let dev = SoftDevice::new(Rectangle::new(0, 0, 200, 100));
//! let display = dev.open_display()?;
//! display.image.draw(r, &red, None, Point::ZERO)?;
//! display.flush()?;
//! assert_eq!(dev.screen_pixel(Point::new(10, 10)), Some(Color::RED));
//! ```

pub mod device;
pub mod input;
pub mod pixels;

pub use device::SoftDevice;
pub use input::{ScriptedMouse, key_bytes};
