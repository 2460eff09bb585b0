#![forbid(unsafe_code)]

//! The state every part of a running UI shares.
//!
//! [`UiCore`] owns the store, the body and tag buffers, the application,
//! the current view and its revisioned tree, and the focused node. The UI
//! thread and every file-server connection hold it through an [`Arc`] and
//! drive it with the same calls, so an action written by an external client
//! behaves exactly like one produced by a click.
//!
//! Actions run through one pipeline at a time. Each [`dispatch`] applies
//! the runtime's own handling (bindings, focus, command execution), hands
//! the action to the application, then recomputes the view once, bumping
//! the tree revision by one.
//!
//! [`dispatch`]: UiCore::dispatch

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, warn};

use nui_layout::{NodeType, Tree, TreeNode, ViewNode};

use crate::action::{Action, ActionParseError, kind, parse_action};
use crate::app::App;
use crate::buffers::{BufferKind, Buffers};
use crate::exec::{
    Builtins, CommandSpec, ENV_FOCUS, ENV_ID, ExecContext, ExecError, find_command, spawn_command,
};
use crate::store::{QUIT_KEY, Store};

/// Called whenever the UI should repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `"1"` for the usual spellings of true, `"0"` otherwise.
fn flag(v: &str) -> &'static str {
    match v.trim() {
        "1" | "true" | "yes" | "on" => "1",
        _ => "0",
    }
}

struct Snapshot {
    view: ViewNode,
    tree: Tree,
}

/// Shared UI state. See the module documentation.
pub struct UiCore {
    store: Arc<Store>,
    buffers: Arc<Buffers>,
    app: Mutex<Box<dyn App>>,
    builtins: Mutex<Builtins>,
    bin_dirs: Vec<PathBuf>,
    search_path: RwLock<Option<OsString>>,
    snapshot: RwLock<Snapshot>,
    focus: Mutex<Option<String>>,
    waker: Mutex<Option<Waker>>,
    pipeline: Mutex<()>,
}

impl fmt::Debug for UiCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiCore")
            .field("rev", &self.rev())
            .field("focus", &self.focus())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl UiCore {
    /// Start `app` on an empty store. The first view is revision 1.
    pub fn new(app: impl App + 'static) -> Arc<Self> {
        Self::with_store(app, Store::new())
    }

    /// Start `app` on a pre-populated store.
    pub fn with_store(mut app: impl App + 'static, store: Store) -> Arc<Self> {
        let store = Arc::new(store);
        let buffers = Arc::new(Buffers::new());
        store.set_proxy(buffers.clone());
        let builtins = app.builtins();
        let bin_dirs = app.bin_dirs();
        let placeholder = ViewNode::new("", NodeType::VBox);
        let core = Arc::new(Self {
            store,
            buffers,
            app: Mutex::new(Box::new(app) as Box<dyn App>),
            builtins: Mutex::new(builtins),
            bin_dirs,
            search_path: RwLock::new(std::env::var_os("PATH")),
            snapshot: RwLock::new(Snapshot {
                tree: Tree::from_view(0, &placeholder),
                view: placeholder,
            }),
            focus: Mutex::new(None),
            waker: Mutex::new(None),
            pipeline: Mutex::new(()),
        });
        core.refresh();
        core
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn buffers(&self) -> &Arc<Buffers> {
        &self.buffers
    }

    /// Replace the `PATH`-style list searched after the bin dirs.
    pub fn set_search_path(&self, path: Option<OsString>) {
        *self.search_path.write().unwrap_or_else(PoisonError::into_inner) = path;
    }

    fn snap(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current tree revision.
    pub fn rev(&self) -> u64 {
        self.snap().tree.rev
    }

    pub fn tree(&self) -> Tree {
        self.snap().tree.clone()
    }

    /// The current tree in its line form.
    pub fn tree_text(&self) -> String {
        self.snap().tree.serialize()
    }

    /// The current view with bindings applied.
    pub fn view(&self) -> ViewNode {
        self.snap().view.clone()
    }

    pub fn node(&self, id: &str) -> Option<TreeNode> {
        self.snap().tree.get(id).cloned()
    }

    pub fn focus(&self) -> Option<String> {
        lock(&self.focus).clone()
    }

    /// Move focus without going through an action.
    pub fn set_focus(&self, id: Option<&str>) {
        *lock(&self.focus) = id.filter(|s| !s.is_empty()).map(str::to_string);
        self.wake();
    }

    /// Install the repaint callback.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *lock(&self.waker) = Some(Arc::new(waker));
    }

    /// Ask the UI thread to repaint.
    pub fn wake(&self) {
        let waker = lock(&self.waker).clone();
        if let Some(w) = waker {
            w();
        }
    }

    /// Run one action through the pipeline. Returns the new revision.
    pub fn dispatch(self: &Arc<Self>, action: Action) -> u64 {
        let _pipeline = lock(&self.pipeline);
        let mut queue = VecDeque::from([action]);
        while let Some(a) = queue.pop_front() {
            debug!(action = %a, "ui: dispatch");
            self.apply(&a, &mut queue);
            lock(&self.app).handle(&a, &self.store);
        }
        self.recompute()
    }

    /// Parse and dispatch one action line.
    pub fn dispatch_line(self: &Arc<Self>, line: &str) -> Result<u64, ActionParseError> {
        let action = parse_action(line)?;
        Ok(self.dispatch(action))
    }

    /// Recompute the view. Returns the new revision.
    pub fn refresh(&self) -> u64 {
        let _pipeline = lock(&self.pipeline);
        self.recompute()
    }

    /// Set a state path and recompute. `None` when nothing was stored.
    pub fn set_state(&self, path: &str, value: impl Into<String>) -> Option<u64> {
        self.store.set(path, value).then(|| self.refresh())
    }

    /// Remove a state path and recompute if it existed.
    pub fn del_state(&self, path: &str) -> Option<String> {
        let old = self.store.del(path)?;
        self.refresh();
        Some(old)
    }

    pub fn buffer_text(&self, kind: BufferKind, id: &str) -> Option<String> {
        self.buffers.with(kind, id, |s| s.text.read_all())
    }

    /// Replace a buffer's text from outside the UI. Bodies report the
    /// change with a `bodychange` action.
    pub fn write_buffer(self: &Arc<Self>, kind: BufferKind, id: &str, text: &str) -> bool {
        if self.buffers.with(kind, id, |s| s.set_text(text)).is_none() {
            return false;
        }
        match kind {
            BufferKind::Body => {
                self.dispatch(Action::new(kind::BODY_CHANGE).arg("id", id));
            }
            BufferKind::Tag => self.wake(),
        }
        true
    }

    /// Bump a body's (or tag's) sequence number so its frame reloads.
    pub fn mark_dirty(&self, id: &str) -> bool {
        let hit = self.buffers.mark_dirty(BufferKind::Body, id)
            || self.buffers.mark_dirty(BufferKind::Tag, id);
        if hit {
            self.wake();
        }
        hit
    }

    /// End the dispatch loop.
    pub fn quit(&self) {
        self.store.set(QUIT_KEY, "1");
        self.wake();
    }

    pub fn should_quit(&self) -> bool {
        self.store.get(QUIT_KEY).as_deref() == Some("1")
    }

    /// Selected text of an editable node.
    pub fn selection_text(&self, id: &str) -> Option<String> {
        let kind = BufferKind::of_node(self.node(id)?.kind)?;
        self.buffers.with(kind, id, |s| s.selected_text())
    }

    fn apply(self: &Arc<Self>, a: &Action, follow: &mut VecDeque<Action>) {
        match a.kind.as_str() {
            kind::TOGGLE => {
                let Some(node) = a.id().and_then(|id| self.node(id)) else {
                    return;
                };
                if node.kind != NodeType::Checkbox {
                    return;
                }
                let path = node.props.get("bindchecked").or_else(|| node.props.get("bind"));
                if let Some(path) = path {
                    let value = match a.get("value") {
                        Some(v) => flag(v),
                        None if node.props.get("checked").map(String::as_str) == Some("1") => "0",
                        None => "1",
                    };
                    self.store.set(path, value);
                }
            }
            kind::INPUT => {
                let Some(node) = a.id().and_then(|id| self.node(id)) else {
                    return;
                };
                if let (NodeType::TextBox, Some(path)) = (node.kind, node.props.get("bind")) {
                    self.store.set(path, a.get("text").unwrap_or(""));
                }
            }
            kind::FOCUS => {
                *lock(&self.focus) = a.id().filter(|s| !s.is_empty()).map(str::to_string);
            }
            kind::EXECUTE => self.execute(a, follow),
            _ => {}
        }
    }

    fn execute(self: &Arc<Self>, a: &Action, follow: &mut VecDeque<Action>) {
        let id = a.id().unwrap_or("").to_string();
        let mut words = a.get("text").unwrap_or("").split_whitespace();
        let Some(cmd) = words.next() else {
            return;
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        let focus = self.focus();
        let selection = focus
            .as_deref()
            .and_then(|f| self.selection_text(f))
            .or_else(|| self.selection_text(&id))
            .unwrap_or_default();

        let ran = {
            let ctx = ExecContext {
                id: &id,
                cmd,
                args: &args,
                selection: &selection,
                state: &self.store,
            };
            lock(&self.builtins).run(&ctx)
        };
        match ran {
            Some(Ok(Some(out))) => follow.push_back(output_action(&id, cmd, out)),
            Some(Ok(None)) => {}
            Some(Err(e)) => follow.push_back(error_action(&id, cmd, &e)),
            None => {
                let search = self
                    .search_path
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                let Some(path) = find_command(cmd, &self.bin_dirs, search.as_deref()) else {
                    follow.push_back(error_action(&id, cmd, &ExecError::NotFound(cmd.to_string())));
                    return;
                };
                let spec = CommandSpec::new(cmd, path)
                    .args(args)
                    .stdin(selection)
                    .env(ENV_ID, id.clone())
                    .env(ENV_FOCUS, focus.unwrap_or_default());
                let core = Arc::downgrade(self);
                let (rid, rcmd) = (id.clone(), cmd.to_string());
                let spawned = spawn_command(spec, move |result| {
                    let Some(core) = core.upgrade() else {
                        return;
                    };
                    let action = match result {
                        Ok(out) => output_action(&rid, &rcmd, out),
                        Err(e) => error_action(&rid, &rcmd, &e),
                    };
                    core.dispatch(action);
                });
                if let Err(e) = spawned {
                    warn!(cmd, error = %e, "ui: command spawn failed");
                    follow.push_back(error_action(&id, cmd, &e));
                }
            }
        }
    }

    /// Rebuild the view and tree. The caller holds the pipeline lock.
    fn recompute(&self) -> u64 {
        let mut view = lock(&self.app).view(&self.store);
        self.apply_bindings(&mut view);
        self.sync_buffers(&view);
        let rev = {
            let mut snap = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            let rev = snap.tree.rev + 1;
            snap.tree = Tree::from_view(rev, &view);
            snap.view = view;
            rev
        };
        {
            let mut focus = lock(&self.focus);
            if focus.as_deref().is_some_and(|id| self.node(id).is_none()) {
                *focus = None;
            }
        }
        debug!(rev, "ui: view recomputed");
        self.wake();
        rev
    }

    /// Fill bound textboxes and checkboxes from the store.
    fn apply_bindings(&self, view: &mut ViewNode) {
        let store = &self.store;
        view.walk_mut(&mut |n| match n.kind {
            NodeType::TextBox => {
                if let Some(path) = n.props.get("bind").cloned() {
                    match store.get(&path) {
                        Some(v) => {
                            n.props.insert("text".into(), v);
                        }
                        None => {
                            n.props.remove("text");
                        }
                    }
                }
            }
            NodeType::Checkbox => {
                let path = n.props.get("bindchecked").or_else(|| n.props.get("bind")).cloned();
                if let Some(v) = path.and_then(|p| store.get(&p)) {
                    n.props.insert("checked".into(), flag(&v).into());
                }
            }
            _ => {}
        });
    }

    /// Make sure every body and tag has a buffer and drop the rest.
    fn sync_buffers(&self, view: &ViewNode) {
        let mut live = HashSet::new();
        view.walk(&mut |n| {
            if let Some(kind) = BufferKind::of_node(n.kind) {
                self.buffers.ensure(kind, &n.id, n.get("text").unwrap_or(""));
                live.insert((kind, n.id.clone()));
            }
        });
        self.buffers
            .retain(|kind, id| live.contains(&(kind, id.to_string())));
    }
}

fn output_action(id: &str, cmd: &str, out: String) -> Action {
    Action::new(kind::CMD_OUTPUT)
        .arg("id", id)
        .arg("cmd", cmd)
        .arg("text", out)
}

fn error_action(id: &str, cmd: &str, e: &ExecError) -> Action {
    Action::new(kind::CMD_ERROR)
        .arg("id", id)
        .arg("cmd", cmd)
        .arg("text", e.to_string())
}
