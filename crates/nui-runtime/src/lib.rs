#![forbid(unsafe_code)]

//! nineui runtime
//!
//! This crate ties the draw, text, and layout crates into a running
//! application: a path-keyed state store, a view recomputed from it, and an
//! input loop that turns clicks and keys into actions.
//!
//! # Key Components
//!
//! - [`App`] - Trait for an application's view and action handling
//! - [`Store`] - Hierarchical string state with `_body/` and `_tag/` routed to text buffers
//! - [`Action`] - Semantic UI events and their `kind k=v ...` line form
//! - [`UiCore`] - Shared state: bindings, the revisioned tree, buffers, focus
//! - [`Renderer`] - Lays out and paints the view, owns the text frames
//! - [`Dispatcher`] - Maps mouse and keyboard input to actions and edits
//! - [`Builtins`] - Named commands run in the UI thread; others run externally
//! - [`Program`] - The dispatch loop over the draw, mouse, and keyboard devices
//!
//! # How it fits in the system
//! `UiCore` is the single point every writer goes through. The UI thread
//! drives it from input, and the 9P file server (`nui-fs`) drives it from
//! file writes, so both see the same actions, revisions, and buffers.

pub mod action;
pub mod app;
pub mod buffers;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod exec;
pub mod input;
pub mod program;
pub mod render;
pub mod store;

pub use action::{Action, ActionParseError, kind, parse_action};
pub use app::App;
pub use buffers::{BufferKind, Buffers, SharedSlot, TextSlot, lock_slot};
pub use config::ProgramConfig;
pub use crate::core::{UiCore, Waker};
pub use dispatch::Dispatcher;
pub use exec::{Builtin, Builtins, CommandSpec, ExecContext, ExecError, find_command};
pub use input::{KeyboardReader, MouseReader, RefreshReader};
pub use program::{Program, load_font};
pub use render::{FrameView, Renderer, Theme};
pub use store::{BufferProxy, QUIT_KEY, Store};
