#![forbid(unsafe_code)]

//! The application interface.

use std::path::PathBuf;

use nui_layout::ViewNode;

use crate::action::Action;
use crate::exec::Builtins;
use crate::store::Store;

/// A nineui application: a view of the state plus reactions to actions.
///
/// The runtime calls [`view`](App::view) after every action and every
/// external state change, so the view is a pure function of the store.
/// Bound textboxes and checkboxes are filled in by the runtime afterwards.
///
/// # Example
///
/// ```
/// use nui_layout::ViewNode;
/// use nui_layout::node::{button, text, vbox};
/// use nui_runtime::{Action, App, Store};
///
/// struct Counter;
///
/// impl App for Counter {
///     fn view(&self, state: &Store) -> ViewNode {
///         let n = state.get("count").unwrap_or_else(|| "0".into());
///         vbox("root", [text("n", n), button("inc", "+1", "inc")])
///     }
///
///     fn handle(&mut self, action: &Action, state: &Store) {
///         if action.get("action") == Some("inc") {
///             let n: i64 = state.get("count").and_then(|v| v.parse().ok()).unwrap_or(0);
///             state.set("count", (n + 1).to_string());
///         }
///     }
/// }
/// ```
pub trait App: Send {
    /// Build the view tree for the current state.
    fn view(&self, state: &Store) -> ViewNode;

    /// React to an action after the runtime's own handling of it.
    fn handle(&mut self, action: &Action, state: &Store) {
        let _ = (action, state);
    }

    /// Builtin commands, collected once at startup.
    fn builtins(&mut self) -> Builtins {
        Builtins::new()
    }

    /// Directories searched for external commands before `PATH`.
    fn bin_dirs(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}
