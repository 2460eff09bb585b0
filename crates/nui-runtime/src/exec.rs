#![forbid(unsafe_code)]

//! Builtin and external commands run from tags and bodies.
//!
//! Middle-clicking a word executes it. A builtin registered by the
//! application runs synchronously on the UI thread; anything else is looked
//! up in the application's binary directories, then in `PATH`, and runs on
//! its own thread with the current selection on standard input. Output and
//! failures come back as `cmdoutput` and `cmderror` actions.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::store::Store;

/// Environment variable naming the node a command was executed from.
pub const ENV_ID: &str = "uiid";
/// Environment variable naming the focused node.
pub const ENV_FOCUS: &str = "uifocus";

/// Why a command did not produce output.
#[derive(Debug)]
pub enum ExecError {
    /// Not a builtin and not found on any search path.
    NotFound(String),
    /// The process could not be started.
    Spawn { cmd: String, source: io::Error },
    /// The process exited unsuccessfully.
    Failed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },
    /// A builtin reported failure.
    Builtin { cmd: String, msg: String },
}

impl ExecError {
    pub fn builtin(cmd: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Builtin {
            cmd: cmd.into(),
            msg: msg.into(),
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(cmd) => write!(f, "{cmd}: command not found"),
            Self::Spawn { cmd, source } => write!(f, "{cmd}: {source}"),
            Self::Failed { cmd, code, stderr } => {
                match code {
                    Some(c) => write!(f, "{cmd}: exit status {c}")?,
                    None => write!(f, "{cmd}: killed by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::Builtin { cmd, msg } => write!(f, "{cmd}: {msg}"),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// What a builtin sees when it runs.
#[derive(Debug)]
pub struct ExecContext<'a> {
    /// Node the command was executed from.
    pub id: &'a str,
    /// The command word.
    pub cmd: &'a str,
    /// Words after the command.
    pub args: &'a [String],
    /// Selected text of the focused body or tag.
    pub selection: &'a str,
    pub state: &'a Store,
}

/// A builtin command. `Ok(Some(text))` becomes a `cmdoutput` action.
pub type Builtin =
    Box<dyn FnMut(&ExecContext<'_>) -> Result<Option<String>, ExecError> + Send>;

/// Named builtins.
#[derive(Default)]
pub struct Builtins {
    map: HashMap<String, Builtin>,
}

impl Builtins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register `f` under `name`, replacing any previous one.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&ExecContext<'_>) -> Result<Option<String>, ExecError> + Send + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnMut(&ExecContext<'_>) -> Result<Option<String>, ExecError> + Send + 'static,
    {
        self.map.insert(name.into(), Box::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Run the builtin named `ctx.cmd`, or `None` if there is none.
    pub fn run(&mut self, ctx: &ExecContext<'_>) -> Option<Result<Option<String>, ExecError>> {
        let f = self.map.get_mut(ctx.cmd)?;
        Some(f(ctx))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtins")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(unix)]
fn is_executable(p: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    p.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(p: &Path) -> bool {
    p.is_file()
}

/// Locate `name` in `dirs`, then in the directories of `path` (a
/// `PATH`-style list). A name containing `/` is checked as given.
pub fn find_command(name: &str, dirs: &[PathBuf], path: Option<&OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let p = PathBuf::from(name);
        return is_executable(&p).then_some(p);
    }
    let from_path = path.map(|p| std::env::split_paths(p).collect::<Vec<_>>()).unwrap_or_default();
    dirs.iter()
        .chain(from_path.iter())
        .map(|d| d.join(name))
        .find(|p| is_executable(p))
}

/// A resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub cmd: String,
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Written to the command's standard input.
    pub stdin: String,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(cmd: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            path: path.into(),
            args: Vec::new(),
            stdin: String::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = text.into();
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Run a command to completion and return its standard output.
pub fn run_command(spec: &CommandSpec) -> Result<String, ExecError> {
    let spawn_err = |source| ExecError::Spawn {
        cmd: spec.cmd.clone(),
        source,
    };
    let mut child = Command::new(&spec.path)
        .args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;
    debug!(cmd = %spec.cmd, pid = child.id(), "exec: spawned");

    // stdin is written while stdout and stderr drain.
    let feeder = child.stdin.take().map(|mut pipe| {
        let input = spec.stdin.clone();
        thread::spawn(move || {
            let _ = pipe.write_all(input.as_bytes());
        })
    });
    let out = child.wait_with_output().map_err(spawn_err)?;
    if let Some(h) = feeder {
        let _ = h.join();
    }
    info!(cmd = %spec.cmd, status = ?out.status.code(), "exec: exited");
    if !out.status.success() {
        return Err(ExecError::Failed {
            cmd: spec.cmd.clone(),
            code: out.status.code(),
            stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Run a command on its own thread; `done` receives the outcome there.
pub fn spawn_command<F>(spec: CommandSpec, done: F) -> Result<JoinHandle<()>, ExecError>
where
    F: FnOnce(Result<String, ExecError>) + Send + 'static,
{
    let cmd = spec.cmd.clone();
    thread::Builder::new()
        .name(format!("nui-exec-{cmd}"))
        .spawn(move || done(run_command(&spec)))
        .map_err(|source| ExecError::Spawn { cmd, source })
}
