#![forbid(unsafe_code)]

//! nineui public facade crate.
//!
//! Re-exports the types an application needs and offers [`run`], which
//! opens the devices, optionally posts the 9P file server, and runs the
//! dispatch loop until the UI quits.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

// --- Core re-exports -------------------------------------------------------

pub use nui_core::event::{Buttons, Event, KeyEvent, Mouse, keys};
pub use nui_core::geometry::{Point, Rectangle};

// --- Draw re-exports -------------------------------------------------------

pub use nui_draw::{Color, Display, DisplayConfig, DrawError, Font, Image, Pix};

// --- Layout re-exports -----------------------------------------------------

pub use nui_layout::node::{
    body, button, checkbox, hbox, rect, row, scroll, spacer, splitbox, stack, tag, textbox, vbox,
};
pub use nui_layout::{Axis, LayoutConfig, NodeType, Tree, ViewNode, node};

// --- Runtime re-exports ----------------------------------------------------

pub use nui_runtime::{
    Action, App, BufferKind, Builtins, ExecContext, ExecError, Program, ProgramConfig, Store,
    Theme, UiCore,
};

#[cfg(feature = "subscriber")]
pub use nui_core::logging::init_from_env as init_logging;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for nineui apps.
#[derive(Debug)]
pub enum Error {
    /// The draw device failed or refused.
    Draw(DrawError),
    /// Other I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Draw(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<DrawError> for Error {
    fn from(err: DrawError) -> Self {
        Self::Draw(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for nineui APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Run `app` until it quits.
///
/// When `config.serve_9p` is set the file server is posted as
/// `ui.<title>` first; a failure to post is logged and the UI runs
/// without it.
pub fn run(app: impl App + 'static, config: &ProgramConfig) -> Result<()> {
    run_core(UiCore::new(app), config)
}

/// [`run`] for a core built by the caller.
pub fn run_core(core: Arc<UiCore>, config: &ProgramConfig) -> Result<()> {
    let program = Program::with_core(core.clone(), config)?;
    let _srv = serve(&core, config);
    program.run()?;
    Ok(())
}

#[cfg(feature = "fs")]
fn serve(core: &Arc<UiCore>, config: &ProgramConfig) -> Option<nui_fs::Listener> {
    if !config.serve_9p {
        return None;
    }
    match nui_fs::post(core.clone(), config) {
        Ok(listener) => Some(listener),
        Err(err) => {
            warn!(path = %config.srv_path().display(), error = %err, "ui: could not post file server");
            None
        }
    }
}

#[cfg(not(feature = "fs"))]
fn serve(_: &Arc<UiCore>, config: &ProgramConfig) -> Option<()> {
    if config.serve_9p {
        warn!("ui: built without the fs feature, not serving 9P");
    }
    None
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, App, Axis, Builtins, Color, Error, Event, ExecContext, KeyEvent, Mouse, Program,
        ProgramConfig, Result, Store, UiCore, ViewNode, body, button, checkbox, hbox, node, row,
        run, scroll, spacer, splitbox, tag, textbox, vbox,
    };

    pub use crate::{core, draw, layout, runtime, text};
}

pub use nui_core as core;
pub use nui_draw as draw;
#[cfg(feature = "fs")]
pub use nui_fs as fs;
pub use nui_layout as layout;
pub use nui_runtime as runtime;
pub use nui_text as text;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Counter;

    impl App for Counter {
        fn view(&self, store: &Store) -> ViewNode {
            let n = store.get("count").unwrap_or_else(|| "0".into());
            vbox("root", [node::text("n", n), button("inc", "+", "inc")])
        }

        fn handle(&mut self, action: &Action, store: &Store) {
            if action.get("action") == Some("inc") {
                let n: u32 = store.get("count").and_then(|v| v.parse().ok()).unwrap_or(0);
                store.set("count", (n + 1).to_string());
            }
        }
    }

    #[test]
    fn missing_draw_device_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProgramConfig::default().with_draw_dir(dir.path().join("nodraw"));
        let err = run(Counter, &config).unwrap_err();
        assert!(matches!(err, Error::Draw(_)), "{err}");
    }

    #[test]
    fn prelude_builds_and_drives_an_app() {
        let core = UiCore::new(Counter);
        core.dispatch_line("click id=inc action=inc button=1").unwrap();
        assert_eq!(core.store().get("count").as_deref(), Some("1"));
        assert_eq!(core.node("n").unwrap().props.get("text").map(String::as_str), Some("1"));
    }
}
