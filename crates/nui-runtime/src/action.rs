#![forbid(unsafe_code)]

//! Semantic actions and their line form.
//!
//! An action is a kind plus string arguments. On the wire it is one line,
//! `<kind> k=v k=v...`, keys sorted, values quoted the same way tree
//! properties are.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nui_layout::{escape_value, parse_pairs};

/// Action kinds the runtime emits or interprets.
pub mod kind {
    pub const CLICK: &str = "click";
    pub const TOGGLE: &str = "toggle";
    pub const INPUT: &str = "input";
    pub const KEY: &str = "key";
    pub const FOCUS: &str = "focus";
    pub const SCROLL: &str = "scroll";
    pub const EXECUTE: &str = "execute";
    pub const LOOK: &str = "look";
    pub const BODY_CHANGE: &str = "bodychange";
    pub const CMD_OUTPUT: &str = "cmdoutput";
    pub const CMD_ERROR: &str = "cmderror";
}

/// A semantic UI event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Action {
    pub kind: String,
    pub args: BTreeMap<String, String>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            args: BTreeMap::new(),
        }
    }

    /// Builder: set an argument.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// The target node id, if any.
    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// The line form, without a trailing newline.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        for (k, v) in &self.args {
            write!(f, " {k}={}", escape_value(v))?;
        }
        Ok(())
    }
}

/// A line that is not an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionParseError {
    pub msg: String,
}

impl fmt::Display for ActionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad action: {}", self.msg)
    }
}

impl std::error::Error for ActionParseError {}

/// Parse one action line. A trailing newline is accepted.
pub fn parse_action(line: &str) -> Result<Action, ActionParseError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.trim_start_matches([' ', '\t']);
    let (kind, rest) = match line.find([' ', '\t']) {
        Some(i) => (&line[..i], &line[i..]),
        None => (line, ""),
    };
    if kind.is_empty() {
        return Err(ActionParseError {
            msg: "empty line".into(),
        });
    }
    if kind.contains(['=', '"']) {
        return Err(ActionParseError {
            msg: format!("bad kind {kind:?}"),
        });
    }
    let pairs = parse_pairs(rest).map_err(|msg| ActionParseError { msg })?;
    Ok(Action {
        kind: kind.to_string(),
        args: pairs.into_iter().collect(),
    })
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_action(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn line_form() {
        let a = Action::new(kind::INPUT)
            .arg("id", "name")
            .arg("text", "Ann Lee")
            .arg("cursor", "7");
        assert_eq!(a.serialize(), "input cursor=7 id=name text=\"Ann Lee\"");
        assert_eq!(a.id(), Some("name"));
    }

    #[test]
    fn parses_lines_from_clients() {
        let a = parse_action("toggle id=cb value=1\n").unwrap();
        assert!(a.is(kind::TOGGLE));
        assert_eq!(a.get("value"), Some("1"));

        let bare = parse_action("refresh").unwrap();
        assert_eq!(bare, Action::new("refresh"));

        let quoted = parse_action("cmdoutput id=b text=\"a\\nb\"").unwrap();
        assert_eq!(quoted.get("text"), Some("a\nb"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_action("").is_err());
        assert!(parse_action("   \n").is_err());
        assert!(parse_action("click id").is_err());
        assert!(parse_action("k=v").is_err());
        assert!(parse_action("click text=\"open").is_err());
    }

    proptest! {
        #[test]
        fn line_form_round_trips(
            kind in "[a-z]{1,10}",
            args in proptest::collection::btree_map("[a-z]{1,6}", ".*", 0..5),
        ) {
            let a = Action { kind, args };
            prop_assert_eq!(parse_action(&a.serialize()), Ok(a));
        }
    }
}
