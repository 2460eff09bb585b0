#![forbid(unsafe_code)]

//! The served file tree.
//!
//! ```text
//! /tree          r   serialized view tree
//! /actions       w   one action per line
//! /focus         rw  focused node id
//! /ctl           w   `quit`, `dirty <id>`
//! /state/...     rw  store paths, one directory level per path segment
//! /body/<id>     rw  body text
//! /tag/<id>      r   tag text
//! ```
//!
//! Walking under `/state` succeeds for any name, at any depth, so a client
//! can write a key that does not exist yet; such a file reads empty.

use std::sync::Arc;

use nui_runtime::store::normalize_path;
use nui_runtime::{BufferKind, BufferProxy, UiCore};

use crate::codec::{DMDIR, OEXEC, ORDWR, OWRITE, QTDIR, QTFILE, Qid, Stat};

pub const ENOTFOUND: &str = "file does not exist";
pub const EPERM: &str = "permission denied";
pub const ENOTDIR: &str = "not a directory";
pub const EBADCTL: &str = "bad ctl message";

const OWNER: &str = "nui";

/// A file in the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Root,
    Tree,
    Actions,
    Focus,
    Ctl,
    /// A store path; `""` is `/state` itself.
    State(String),
    BodyDir,
    Body(String),
    TagDir,
    Tag(String),
}

/// FNV-1a, folded into the low 56 bits of a qid path.
fn key_hash(key: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in key.bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h & 0x00FF_FFFF_FFFF_FFFF
}

/// Value of a write: a trailing newline is not part of it.
fn chomp(data: &[u8]) -> String {
    let s = String::from_utf8_lossy(data);
    s.strip_suffix('\n').unwrap_or(&s).to_string()
}

/// `current` up to `offset` followed by `data`.
fn splice(current: &str, offset: u64, data: &[u8]) -> String {
    let mut bytes = current.as_bytes().to_vec();
    bytes.truncate(usize::try_from(offset).unwrap_or(usize::MAX));
    bytes.extend_from_slice(data);
    String::from_utf8_lossy(&bytes).into_owned()
}

impl Node {
    fn kind_byte(&self) -> u64 {
        match self {
            Self::Root => 0,
            Self::Tree => 1,
            Self::Actions => 2,
            Self::Focus => 3,
            Self::Ctl => 4,
            Self::State(_) => 5,
            Self::BodyDir => 6,
            Self::Body(_) => 7,
            Self::TagDir => 8,
            Self::Tag(_) => 9,
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::State(k) | Self::Body(k) | Self::Tag(k) => k,
            _ => "",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Root => "/",
            Self::Tree => "tree",
            Self::Actions => "actions",
            Self::Focus => "focus",
            Self::Ctl => "ctl",
            Self::State(p) if p.is_empty() => "state",
            Self::State(p) => p.rsplit('/').next().unwrap_or(p),
            Self::BodyDir => "body",
            Self::TagDir => "tag",
            Self::Body(id) | Self::Tag(id) => id,
        }
    }

    pub fn is_dir(&self, core: &UiCore) -> bool {
        match self {
            Self::Root | Self::BodyDir | Self::TagDir => true,
            Self::State(p) => p.is_empty() || core.store().is_dir(p),
            _ => false,
        }
    }

    /// Identity derived from the node's kind and key alone.
    pub fn qid(&self, core: &UiCore) -> Qid {
        let dir = self.is_dir(core);
        Qid {
            kind: if dir { QTDIR } else { QTFILE },
            version: match self {
                Self::Tree => core.rev() as u32,
                _ => 0,
            },
            path: (self.kind_byte() << 56) | key_hash(self.key()),
        }
    }

    fn perm(&self, core: &UiCore) -> u32 {
        if self.is_dir(core) {
            return DMDIR | 0o555;
        }
        match self {
            Self::Tree | Self::Tag(_) => 0o444,
            Self::Actions | Self::Ctl => 0o222,
            _ => 0o666,
        }
    }

    pub fn parent(&self) -> Node {
        match self {
            Self::Root | Self::Tree | Self::Actions | Self::Focus | Self::Ctl => Self::Root,
            Self::BodyDir | Self::TagDir => Self::Root,
            Self::State(p) if p.is_empty() => Self::Root,
            Self::State(p) => Self::State(p.rsplit_once('/').map_or("", |(d, _)| d).to_string()),
            Self::Body(_) => Self::BodyDir,
            Self::Tag(_) => Self::TagDir,
        }
    }

    /// Step to `name` below this node.
    pub fn walk(&self, core: &UiCore, name: &str) -> Result<Node, &'static str> {
        if name == ".." {
            return Ok(self.parent());
        }
        if !matches!(self, Self::State(_)) && !self.is_dir(core) {
            return Err(ENOTDIR);
        }
        if name.is_empty() || name == "." || name.contains('/') {
            return Err(ENOTFOUND);
        }
        match self {
            Self::Root => match name {
                "tree" => Ok(Self::Tree),
                "actions" => Ok(Self::Actions),
                "focus" => Ok(Self::Focus),
                "ctl" => Ok(Self::Ctl),
                "state" => Ok(Self::State(String::new())),
                "body" => Ok(Self::BodyDir),
                "tag" => Ok(Self::TagDir),
                _ => Err(ENOTFOUND),
            },
            Self::State(p) => Ok(Self::State(normalize_path(&format!("{p}/{name}")))),
            Self::BodyDir => buffer_ids(core, BufferKind::Body)
                .contains(&name.to_string())
                .then(|| Self::Body(name.to_string()))
                .ok_or(ENOTFOUND),
            Self::TagDir => buffer_ids(core, BufferKind::Tag)
                .contains(&name.to_string())
                .then(|| Self::Tag(name.to_string()))
                .ok_or(ENOTFOUND),
            _ => Err(ENOTDIR),
        }
    }

    /// Check an open mode against the node's permissions.
    pub fn check_open(&self, core: &UiCore, mode: u8) -> Result<(), &'static str> {
        let perm = self.perm(core);
        let (read, write) = match mode & 3 {
            OWRITE => (false, true),
            ORDWR => (true, true),
            OEXEC => return Err(EPERM),
            _ => (true, false),
        };
        if (read && perm & 0o444 == 0) || (write && perm & 0o222 == 0) {
            return Err(EPERM);
        }
        Ok(())
    }

    /// Entries of a directory node.
    pub fn children(&self, core: &UiCore) -> Vec<Node> {
        match self {
            Self::Root => vec![
                Self::Tree,
                Self::Actions,
                Self::Focus,
                Self::Ctl,
                Self::State(String::new()),
                Self::BodyDir,
                Self::TagDir,
            ],
            Self::State(p) => core
                .store()
                .list(p)
                .into_iter()
                .map(|name| Self::State(normalize_path(&format!("{p}/{name}"))))
                .collect(),
            Self::BodyDir => buffer_ids(core, BufferKind::Body)
                .into_iter()
                .map(Self::Body)
                .collect(),
            Self::TagDir => buffer_ids(core, BufferKind::Tag)
                .into_iter()
                .map(Self::Tag)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Current contents of a readable file.
    pub fn contents(&self, core: &UiCore) -> Result<Vec<u8>, &'static str> {
        let text = match self {
            Self::Tree => core.tree_text(),
            Self::Focus => core.focus().unwrap_or_default(),
            Self::State(p) => core.store().get(p).unwrap_or_default(),
            Self::Body(id) => core
                .buffer_text(BufferKind::Body, id)
                .ok_or(ENOTFOUND)?,
            Self::Tag(id) => core.buffer_text(BufferKind::Tag, id).ok_or(ENOTFOUND)?,
            _ => return Err(EPERM),
        };
        Ok(text.into_bytes())
    }

    pub fn stat(&self, core: &UiCore) -> Stat {
        let perm = self.perm(core);
        let length = if perm & DMDIR == 0 && perm & 0o444 != 0 {
            self.contents(core).map_or(0, |c| c.len() as u64)
        } else {
            0
        };
        Stat {
            qid: self.qid(core),
            mode: perm,
            length,
            name: self.name().to_string(),
            uid: OWNER.into(),
            gid: OWNER.into(),
            muid: OWNER.into(),
            ..Stat::default()
        }
    }

    /// Apply a write. Returns the byte count taken.
    pub fn write(&self, core: &Arc<UiCore>, offset: u64, data: &[u8]) -> Result<u32, String> {
        let text = String::from_utf8_lossy(data);
        match self {
            Self::Actions => {
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    core.dispatch_line(line).map_err(|e| e.to_string())?;
                }
            }
            Self::Ctl => {
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    ctl(core, line)?;
                }
            }
            Self::Focus => {
                let id = chomp(data);
                core.set_focus(Some(id.trim()));
            }
            Self::State(p) if !p.is_empty() && !core.store().is_dir(p) => {
                let value = if offset == 0 {
                    chomp(data)
                } else {
                    let current = core.store().get(p).unwrap_or_default();
                    splice(&current, offset, chomp(data).as_bytes())
                };
                core.set_state(p, value).ok_or(EPERM)?;
            }
            Self::Body(id) => {
                let current = core.buffer_text(BufferKind::Body, id).ok_or(ENOTFOUND)?;
                let next = splice(&current, offset, data);
                if !core.write_buffer(BufferKind::Body, id, &next) {
                    return Err(ENOTFOUND.into());
                }
            }
            _ => return Err(EPERM.into()),
        }
        Ok(data.len() as u32)
    }
}

fn buffer_ids(core: &UiCore, kind: BufferKind) -> Vec<String> {
    let mut ids = core.buffers().ids(kind);
    ids.sort();
    ids
}

fn ctl(core: &UiCore, line: &str) -> Result<(), String> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("quit"), None, _) => {
            core.quit();
            Ok(())
        }
        (Some("dirty"), Some(id), None) => {
            if core.mark_dirty(id) {
                Ok(())
            } else {
                Err(format!("no buffer {id}"))
            }
        }
        _ => Err(format!("{EBADCTL}: {line}")),
    }
}

/// Pack as many whole entries as fit in `count`, starting at entry `from`.
/// Returns the bytes and the number of entries packed.
pub fn pack_dir(stats: &[Stat], from: usize, count: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut n = 0;
    for st in stats.iter().skip(from) {
        let entry = st.to_bytes();
        if out.len() + entry.len() > count {
            break;
        }
        out.extend(entry);
        n += 1;
    }
    (out, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nui_layout::ViewNode;
    use nui_layout::node::{body, tag, vbox};
    use nui_runtime::{App, Store};

    struct Win;

    impl App for Win {
        fn view(&self, _: &Store) -> ViewNode {
            vbox("w", [tag("t", "Del Put"), body("b")])
        }
    }

    fn core() -> Arc<UiCore> {
        let core = UiCore::with_store(Win, Store::with_entries([("user/name", "ann"), ("mode", "x")]));
        core.set_search_path(None);
        core
    }

    #[test]
    fn qids_are_deterministic_per_kind_and_key() {
        let c = core();
        let a = Node::Body("b".into()).qid(&c);
        assert_eq!(a, Node::Body("b".into()).qid(&c));
        assert_ne!(a.path, Node::Tag("b".into()).qid(&c).path);
        assert_ne!(a.path, Node::Body("c".into()).qid(&c).path);
        assert!(Node::Root.qid(&c).is_dir());
        assert!(Node::State("user".into()).qid(&c).is_dir());
        assert!(!Node::State("user/name".into()).qid(&c).is_dir());
        assert_eq!(Node::Tree.qid(&c).version, c.rev() as u32);
    }

    #[test]
    fn walks_follow_the_layout() {
        let c = core();
        let state = Node::Root.walk(&c, "state").unwrap();
        let user = state.walk(&c, "user").unwrap();
        assert_eq!(user.walk(&c, "name").unwrap(), Node::State("user/name".into()));
        assert_eq!(user.walk(&c, "..").unwrap(), state);
        assert_eq!(Node::Root.walk(&c, "body").unwrap().walk(&c, "b"), Ok(Node::Body("b".into())));
        assert_eq!(Node::BodyDir.walk(&c, "nope"), Err(ENOTFOUND));
        assert_eq!(Node::Tree.walk(&c, "x"), Err(ENOTDIR));
        assert_eq!(Node::Root.walk(&c, "etc"), Err(ENOTFOUND));
    }

    #[test]
    fn open_modes_respect_permissions() {
        let c = core();
        assert_eq!(Node::Actions.check_open(&c, 0), Err(EPERM));
        assert!(Node::Actions.check_open(&c, OWRITE).is_ok());
        assert_eq!(Node::Tree.check_open(&c, OWRITE), Err(EPERM));
        assert_eq!(Node::Tag("t".into()).check_open(&c, ORDWR), Err(EPERM));
        assert!(Node::Body("b".into()).check_open(&c, ORDWR).is_ok());
        assert_eq!(Node::Root.check_open(&c, OWRITE), Err(EPERM));
    }

    #[test]
    fn directory_listings() {
        let c = core();
        let names = |n: Node| -> Vec<String> {
            n.children(&c).iter().map(|n| n.name().to_string()).collect()
        };
        assert_eq!(names(Node::Root), ["tree", "actions", "focus", "ctl", "state", "body", "tag"]);
        assert_eq!(names(Node::State(String::new())), ["_body", "_tag", "mode", "user"]);
        assert_eq!(names(Node::BodyDir), ["b"]);
        assert_eq!(names(Node::TagDir), ["t"]);
    }

    #[test]
    fn reads_and_writes() {
        let c = core();
        assert_eq!(Node::Tag("t".into()).contents(&c).unwrap(), b"Del Put");
        assert_eq!(Node::State("user/name".into()).contents(&c).unwrap(), b"ann");
        assert_eq!(Node::Actions.contents(&c), Err(EPERM));

        let rev = c.rev();
        Node::State("user/name".into()).write(&c, 0, b"bob\n").unwrap();
        assert_eq!(c.store().get("user/name").as_deref(), Some("bob"));
        assert_eq!(c.rev(), rev + 1);

        Node::Body("b".into()).write(&c, 0, b"hello").unwrap();
        Node::Body("b".into()).write(&c, 5, b" world").unwrap();
        assert_eq!(c.buffer_text(BufferKind::Body, "b").as_deref(), Some("hello world"));
        assert_eq!(Node::Body("b".into()).stat(&c).length, 11);

        Node::Focus.write(&c, 0, b"b\n").unwrap();
        assert_eq!(c.focus().as_deref(), Some("b"));
        assert!(Node::Tag("t".into()).write(&c, 0, b"x").is_err());
        assert!(Node::Actions.write(&c, 0, b"=bad\n").is_err());
    }

    #[test]
    fn ctl_messages() {
        let c = core();
        let seq = c.buffers().seq(BufferKind::Body, "b");
        Node::Ctl.write(&c, 0, b"dirty b\n").unwrap();
        assert_ne!(c.buffers().seq(BufferKind::Body, "b"), seq);
        assert!(Node::Ctl.write(&c, 0, b"dirty zz\n").is_err());
        assert!(Node::Ctl.write(&c, 0, b"reboot\n").is_err());
        Node::Ctl.write(&c, 0, b"quit\n").unwrap();
        assert!(c.should_quit());
    }

    #[test]
    fn pack_dir_keeps_whole_entries() {
        let c = core();
        let stats: Vec<Stat> = Node::Root.children(&c).iter().map(|n| n.stat(&c)).collect();
        let one = stats[0].to_bytes().len();
        let (bytes, n) = pack_dir(&stats, 0, one + 1);
        assert_eq!((bytes.len(), n), (one, 1));
        let (_, rest) = pack_dir(&stats, 1, 8192);
        assert_eq!(rest, stats.len() - 1);
    }
}
