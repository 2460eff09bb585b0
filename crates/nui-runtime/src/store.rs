#![forbid(unsafe_code)]

//! Hierarchical application state.
//!
//! Keys are slash-separated paths (`user/name`, `todo/3/done`). Leading,
//! trailing, and doubled slashes are ignored, so `/a//b/` and `a/b` name the
//! same entry. A directory is any proper prefix of a key; [`Store::list`]
//! returns the immediate children of one.
//!
//! Two prefixes are not stored here: `_body/<id>` and `_tag/<id>` route to
//! the text buffers of the body and tag nodes through a [`BufferProxy`],
//! so applications read and write editor text the same way as any other
//! state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use nui_layout::escape_value;

use crate::buffers::BufferKind;

/// Setting this key to `"1"` ends the dispatch loop.
pub const QUIT_KEY: &str = "_quit";

/// Access to text buffers living outside the store.
pub trait BufferProxy: Send + Sync {
    fn read(&self, kind: BufferKind, id: &str) -> Option<String>;
    /// Replace a buffer's text. `false` if there is no such buffer.
    fn write(&self, kind: BufferKind, id: &str, text: &str) -> bool;
    fn ids(&self, kind: BufferKind) -> Vec<String>;
}

/// Canonical form of a path: no empty segments.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(seg);
    }
    out
}

/// Split a normalized path into a proxied buffer reference.
fn proxied(path: &str) -> Option<(BufferKind, &str)> {
    let (head, id) = path.split_once('/')?;
    let kind = BufferKind::from_prefix(head)?;
    (!id.is_empty() && !id.contains('/')).then_some((kind, id))
}

/// Path-keyed string store guarded by a read/write lock.
#[derive(Default)]
pub struct Store {
    map: RwLock<BTreeMap<String, String>>,
    proxy: RwLock<Option<Arc<dyn BufferProxy>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut map = store.write();
            for (k, v) in entries {
                let k = normalize_path(k.as_ref());
                if !k.is_empty() {
                    map.insert(k, v.into());
                }
            }
        }
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn proxy(&self) -> Option<Arc<dyn BufferProxy>> {
        self.proxy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Route `_body/` and `_tag/` paths to `proxy`.
    pub fn set_proxy(&self, proxy: Arc<dyn BufferProxy>) {
        *self.proxy.write().unwrap_or_else(PoisonError::into_inner) = Some(proxy);
    }

    pub fn get(&self, path: &str) -> Option<String> {
        let path = normalize_path(path);
        if let Some((kind, id)) = proxied(&path) {
            return self.proxy()?.read(kind, id);
        }
        self.read().get(&path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Store `value` at `path`. Returns `false` when nothing was stored: an
    /// empty path, or a buffer path naming no buffer.
    pub fn set(&self, path: &str, value: impl Into<String>) -> bool {
        let path = normalize_path(path);
        if path.is_empty() {
            return false;
        }
        if let Some((kind, id)) = proxied(&path) {
            let value = value.into();
            return self.proxy().is_some_and(|p| p.write(kind, id, &value));
        }
        self.write().insert(path, value.into());
        true
    }

    /// Remove the entry at `path`. Buffers cannot be removed.
    pub fn del(&self, path: &str) -> Option<String> {
        let path = normalize_path(path);
        if proxied(&path).is_some() {
            return None;
        }
        self.write().remove(&path)
    }

    /// Immediate children of `dir`, sorted. The root lists `_body` and
    /// `_tag` when there are buffers behind them.
    pub fn list(&self, dir: &str) -> Vec<String> {
        let dir = normalize_path(dir);
        if let Some(kind) = BufferKind::from_prefix(&dir) {
            let mut ids = self.proxy().map(|p| p.ids(kind)).unwrap_or_default();
            ids.sort();
            return ids;
        }
        let mut names = BTreeSet::new();
        {
            let map = self.read();
            let prefix = if dir.is_empty() {
                String::new()
            } else {
                format!("{dir}/")
            };
            for (k, _) in map.range(prefix.clone()..) {
                let Some(rest) = k.strip_prefix(&prefix) else {
                    break;
                };
                let name = rest.split('/').next().unwrap_or(rest);
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
        }
        if dir.is_empty()
            && let Some(p) = self.proxy()
        {
            for kind in [BufferKind::Body, BufferKind::Tag] {
                if !p.ids(kind).is_empty() {
                    names.insert(kind.prefix().to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    /// Check if `dir` has any children.
    pub fn is_dir(&self, dir: &str) -> bool {
        !self.list(dir).is_empty()
    }

    /// Number of stored entries, buffers excluded.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sorted `key=value` lines, values escaped as in the tree format.
    pub fn snapshot(&self) -> String {
        let map = self.read();
        let mut out = String::new();
        for (k, v) in map.iter() {
            out.push_str(k);
            out.push('=');
            out.push_str(&escape_value(v));
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.len())
            .field("proxied", &self.proxy().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBuffers {
        bodies: Mutex<BTreeMap<String, String>>,
    }

    impl BufferProxy for FakeBuffers {
        fn read(&self, kind: BufferKind, id: &str) -> Option<String> {
            match kind {
                BufferKind::Body => self.bodies.lock().unwrap().get(id).cloned(),
                BufferKind::Tag => None,
            }
        }

        fn write(&self, kind: BufferKind, id: &str, text: &str) -> bool {
            let mut b = self.bodies.lock().unwrap();
            match (kind, b.get_mut(id)) {
                (BufferKind::Body, Some(v)) => {
                    *v = text.to_string();
                    true
                }
                _ => false,
            }
        }

        fn ids(&self, kind: BufferKind) -> Vec<String> {
            match kind {
                BufferKind::Body => self.bodies.lock().unwrap().keys().cloned().collect(),
                BufferKind::Tag => Vec::new(),
            }
        }
    }

    #[test]
    fn paths_are_normalized() {
        let s = Store::new();
        assert!(s.set("/user//name/", "ann"));
        assert_eq!(s.get("user/name").as_deref(), Some("ann"));
        assert_eq!(normalize_path("//"), "");
        assert!(!s.set("/", "x"));
    }

    #[test]
    fn get_set_del() {
        let s = Store::new();
        assert_eq!(s.get("a"), None);
        s.set("a", "1");
        s.set("a", "2");
        assert_eq!(s.get("a").as_deref(), Some("2"));
        assert_eq!(s.del("a").as_deref(), Some("2"));
        assert!(!s.contains("a"));
        assert!(s.is_empty());
    }

    #[test]
    fn list_returns_immediate_children() {
        let s = Store::with_entries([
            ("todo/1/text", "milk"),
            ("todo/1/done", "0"),
            ("todo/2/text", "eggs"),
            ("todos", "x"),
            ("user", "ann"),
        ]);
        assert_eq!(s.list("todo"), ["1", "2"]);
        assert_eq!(s.list("todo/1"), ["done", "text"]);
        assert_eq!(s.list(""), ["todo", "todos", "user"]);
        assert!(s.list("user").is_empty());
        assert!(s.is_dir("todo"));
        assert!(!s.is_dir("nothing"));
    }

    #[test]
    fn buffer_paths_go_through_the_proxy() {
        let s = Store::new();
        let fake = Arc::new(FakeBuffers::default());
        fake.bodies.lock().unwrap().insert("b".into(), "hello".into());
        s.set_proxy(fake.clone());

        assert_eq!(s.get("_body/b").as_deref(), Some("hello"));
        assert!(s.set("_body/b", "bye"));
        assert_eq!(fake.bodies.lock().unwrap()["b"], "bye");
        assert!(!s.set("_body/missing", "x"));
        assert_eq!(s.del("_body/b"), None);
        assert_eq!(s.list("_body"), ["b"]);
        assert_eq!(s.list(""), ["_body"]);
        // nothing was stored locally
        assert!(s.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_escaped() {
        let s = Store::with_entries([("b", "two words"), ("a", "1")]);
        assert_eq!(s.snapshot(), "a=1\nb=\"two words\"\n");
    }

    proptest! {
        #[test]
        fn last_set_wins(key in "[a-z]{1,4}(/[a-z]{1,4}){0,2}", a in ".*", b in ".*") {
            let s = Store::new();
            s.set(&key, a);
            s.set(&key, b.clone());
            prop_assert_eq!(s.get(&key), Some(b));
            prop_assert_eq!(s.len(), 1);
        }
    }
}
