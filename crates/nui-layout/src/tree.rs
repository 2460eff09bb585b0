#![forbid(unsafe_code)]

//! Revisioned tree snapshots and their line-oriented wire form.
//!
//! ```text
//! rev 7
//! root root
//! node root vbox
//! node t tag
//! prop t text="New Del"
//! child root t
//! ```
//!
//! All `node` lines come first, in document order, followed by one `prop`
//! line per node that has properties (keys sorted) and one `child` line per
//! edge. Values containing a space, tab, newline, backslash, double quote,
//! or `=` are double-quoted with `\n`, `\t`, `\\`, and `\"` escapes.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::node::{NodeType, ViewNode};

/// A flattened node: children are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub kind: NodeType,
    pub props: BTreeMap<String, String>,
    pub children: Vec<String>,
}

/// Snapshot of a view at some revision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    pub rev: u64,
    pub root: String,
    pub nodes: HashMap<String, TreeNode>,
    /// Ids in document order.
    pub order: Vec<String>,
}

/// Error from [`parse_tree`], with the 1-based line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeParseError {
    pub line: usize,
    pub msg: String,
}

impl TreeParseError {
    fn new(line: usize, msg: impl Into<String>) -> Self {
        Self {
            line,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for TreeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree line {}: {}", self.line, self.msg)
    }
}

impl std::error::Error for TreeParseError {}

impl Tree {
    /// Flatten `root` into a snapshot tagged `rev`.
    ///
    /// A node whose id repeats an earlier one is dropped along with its
    /// subtree.
    pub fn from_view(rev: u64, root: &ViewNode) -> Tree {
        let mut t = Tree {
            rev,
            root: root.id.clone(),
            nodes: HashMap::new(),
            order: Vec::new(),
        };
        t.add(root);
        t
    }

    fn add(&mut self, n: &ViewNode) -> bool {
        if self.nodes.contains_key(&n.id) {
            nui_core::warn!(id = %n.id, "tree: duplicate node id dropped");
            return false;
        }
        self.order.push(n.id.clone());
        self.nodes.insert(
            n.id.clone(),
            TreeNode {
                id: n.id.clone(),
                kind: n.kind,
                props: n.props.clone(),
                children: Vec::new(),
            },
        );
        let mut kids = Vec::with_capacity(n.children.len());
        for c in &n.children {
            if self.add(c) {
                kids.push(c.id.clone());
            }
        }
        if let Some(node) = self.nodes.get_mut(&n.id) {
            node.children = kids;
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild the nested view, if the root exists.
    pub fn to_view(&self) -> Option<ViewNode> {
        self.build(&self.root, 0)
    }

    fn build(&self, id: &str, depth: usize) -> Option<ViewNode> {
        // a parsed tree can contain cycles
        if depth > self.nodes.len() {
            return None;
        }
        let n = self.nodes.get(id)?;
        Some(ViewNode {
            id: n.id.clone(),
            kind: n.kind,
            props: n.props.clone(),
            children: n
                .children
                .iter()
                .filter_map(|c| self.build(c, depth + 1))
                .collect(),
        })
    }

    /// The wire form.
    pub fn serialize(&self) -> String {
        let mut out = format!("rev {}\nroot {}\n", self.rev, self.root);
        let nodes: Vec<&TreeNode> = self.order.iter().filter_map(|id| self.nodes.get(id)).collect();
        for n in &nodes {
            out.push_str(&format!("node {} {}\n", n.id, n.kind));
        }
        for n in &nodes {
            if n.props.is_empty() {
                continue;
            }
            out.push_str("prop ");
            out.push_str(&n.id);
            for (k, v) in &n.props {
                out.push(' ');
                out.push_str(k);
                out.push('=');
                out.push_str(&escape_value(v));
            }
            out.push('\n');
        }
        for n in &nodes {
            for c in &n.children {
                out.push_str(&format!("child {} {}\n", n.id, c));
            }
        }
        out
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

pub fn serialize_tree(t: &Tree) -> String {
    t.serialize()
}

/// Parse the wire form. Blank lines are ignored.
pub fn parse_tree(s: &str) -> Result<Tree, TreeParseError> {
    let mut t = Tree::default();
    let mut saw_root = false;
    for (i, raw) in s.split('\n').enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let (word, rest) = raw.split_once(' ').unwrap_or((raw, ""));
        match word {
            "rev" => {
                t.rev = rest
                    .trim()
                    .parse()
                    .map_err(|_| TreeParseError::new(line, format!("bad revision {rest:?}")))?;
            }
            "root" => {
                t.root = rest.trim().to_string();
                saw_root = true;
            }
            "node" => {
                let mut f = rest.split_whitespace();
                let (Some(id), Some(kind), None) = (f.next(), f.next(), f.next()) else {
                    return Err(TreeParseError::new(line, "node wants an id and a type"));
                };
                let kind: NodeType = kind
                    .parse()
                    .map_err(|e: crate::node::UnknownNodeType| TreeParseError::new(line, e.to_string()))?;
                if t.nodes.contains_key(id) {
                    return Err(TreeParseError::new(line, format!("duplicate node {id}")));
                }
                t.order.push(id.to_string());
                t.nodes.insert(
                    id.to_string(),
                    TreeNode {
                        id: id.to_string(),
                        kind,
                        props: BTreeMap::new(),
                        children: Vec::new(),
                    },
                );
            }
            "prop" => {
                let (id, pairs) = rest.split_once(' ').unwrap_or((rest, ""));
                let props = parse_pairs(pairs).map_err(|msg| TreeParseError::new(line, msg))?;
                let node = t
                    .nodes
                    .get_mut(id)
                    .ok_or_else(|| TreeParseError::new(line, format!("prop for unknown node {id}")))?;
                node.props.extend(props);
            }
            "child" => {
                let mut f = rest.split_whitespace();
                let (Some(parent), Some(child), None) = (f.next(), f.next(), f.next()) else {
                    return Err(TreeParseError::new(line, "child wants a parent and a child"));
                };
                if !t.nodes.contains_key(child) {
                    return Err(TreeParseError::new(line, format!("unknown child {child}")));
                }
                let node = t
                    .nodes
                    .get_mut(parent)
                    .ok_or_else(|| TreeParseError::new(line, format!("unknown parent {parent}")))?;
                node.children.push(child.to_string());
            }
            other => {
                return Err(TreeParseError::new(line, format!("unknown record {other:?}")));
            }
        }
    }
    if !saw_root {
        return Err(TreeParseError::new(0, "missing root"));
    }
    if !t.nodes.is_empty() && !t.nodes.contains_key(&t.root) {
        return Err(TreeParseError::new(0, format!("root {} is not a node", t.root)));
    }
    Ok(t)
}

fn needs_quoting(v: &str) -> bool {
    v.chars().any(|c| matches!(c, ' ' | '\t' | '\n' | '\\' | '"' | '='))
}

/// Quote `v` if it cannot appear bare in a `k=v` pair.
pub fn escape_value(v: &str) -> Cow<'_, str> {
    if !needs_quoting(v) {
        return Cow::Borrowed(v);
    }
    let mut out = String::with_capacity(v.len() + 2);
    out.push('"');
    for c in v.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

/// Inverse of [`escape_value`]. `None` for an unterminated quote.
pub fn unescape_value(s: &str) -> Option<String> {
    let Some(body) = s.strip_prefix('"') else {
        return Some(s.to_string());
    };
    let (v, used) = read_quoted(body)?;
    (used == body.len()).then_some(v)
}

/// Decode a quoted value whose opening quote has been consumed. Returns
/// the value and the bytes used, closing quote included.
fn read_quoted(s: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, i + 1)),
            '\\' => {
                let (_, e) = chars.next()?;
                out.push(match e {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
    None
}

/// Parse space-separated `k=v` pairs, values optionally quoted.
pub fn parse_pairs(s: &str) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    let mut rest = s.trim_start_matches([' ', '\t']);
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| format!("pair without '=' near {rest:?}"))?;
        let key = &rest[..eq];
        if key.is_empty() || key.contains([' ', '\t']) {
            return Err(format!("bad key {key:?}"));
        }
        let after = &rest[eq + 1..];
        let (value, next) = if let Some(body) = after.strip_prefix('"') {
            let (v, used) = read_quoted(body).ok_or_else(|| format!("unterminated value for {key}"))?;
            (v, &body[used..])
        } else {
            let end = after.find([' ', '\t']).unwrap_or(after.len());
            (after[..end].to_string(), &after[end..])
        };
        if !next.is_empty() && !next.starts_with([' ', '\t']) {
            return Err(format!("junk after value of {key}"));
        }
        out.push((key.to_string(), value));
        rest = next.trim_start_matches([' ', '\t']);
    }
    Ok(out)
}
