#![forbid(unsafe_code)]

//! Connections and the listening socket.
//!
//! A [`Session`] holds one connection's fid table and answers one request
//! at a time. [`serve`] runs a session over any byte stream; [`Listener`]
//! accepts Unix-socket connections and serves each on its own thread.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};

use nui_runtime::{ProgramConfig, UiCore};

use crate::codec::{Fcall, IOHDR_LEN, Msg, ORDWR, OWRITE, Stat, VERSION, read_msg, write_msg};
use crate::error::NinepResult;
use crate::namespace::{EPERM, Node, pack_dir};

/// Largest message the server accepts before negotiation.
pub const DEFAULT_MSIZE: u32 = 8192 + IOHDR_LEN;

const ENOAUTH: &str = "authentication not required";
const EUNKNOWNFID: &str = "unknown fid";
const EFIDINUSE: &str = "fid in use";
const EOPEN: &str = "fid already open";
const ENOTOPEN: &str = "fid not open for that";
const EDIROFF: &str = "bad offset in directory read";
const EUNEXPECTED: &str = "unexpected message";

/// A directory read in progress.
#[derive(Debug)]
struct DirRead {
    stats: Vec<Stat>,
    next: usize,
    offset: u64,
}

#[derive(Debug)]
struct Fid {
    node: Node,
    mode: Option<u8>,
    dir: Option<DirRead>,
    /// File contents as of the last read at offset 0.
    data: Vec<u8>,
}

impl Fid {
    fn new(node: Node) -> Self {
        Self {
            node,
            mode: None,
            dir: None,
            data: Vec::new(),
        }
    }

    fn readable(&self) -> bool {
        matches!(self.mode, Some(m) if m & 3 != OWRITE)
    }

    fn writable(&self) -> bool {
        matches!(self.mode, Some(m) if m & 3 == OWRITE || m & 3 == ORDWR)
    }
}

/// One client connection.
pub struct Session {
    core: Arc<UiCore>,
    msize: u32,
    fids: HashMap<u32, Fid>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("msize", &self.msize)
            .field("fids", &self.fids.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(core: Arc<UiCore>) -> Self {
        Self::with_msize(core, DEFAULT_MSIZE)
    }

    pub fn with_msize(core: Arc<UiCore>, msize: u32) -> Self {
        Self {
            core,
            msize: msize.max(IOHDR_LEN + 1),
            fids: HashMap::new(),
        }
    }

    /// Negotiated message size.
    pub fn msize(&self) -> u32 {
        self.msize
    }

    /// Answer one request.
    pub fn handle(&mut self, msg: Msg) -> Msg {
        let reply = match self.reply(msg.fcall) {
            Ok(r) => r,
            Err(ename) => {
                debug!(tag = msg.tag, error = %ename, "9p: request failed");
                Fcall::Rerror { ename }
            }
        };
        Msg::new(msg.tag, reply)
    }

    fn fid(&mut self, fid: u32) -> Result<&mut Fid, String> {
        self.fids.get_mut(&fid).ok_or_else(|| EUNKNOWNFID.to_string())
    }

    fn reply(&mut self, fcall: Fcall) -> Result<Fcall, String> {
        let core = self.core.clone();
        match fcall {
            Fcall::Tversion { msize, version } => {
                self.fids.clear();
                self.msize = self.msize.min(msize).max(IOHDR_LEN + 1);
                let version = if version.starts_with(VERSION) {
                    VERSION
                } else {
                    "unknown"
                };
                Ok(Fcall::Rversion {
                    msize: self.msize,
                    version: version.into(),
                })
            }
            Fcall::Tauth { .. } => Err(ENOAUTH.into()),
            Fcall::Tattach { fid, .. } => {
                if self.fids.contains_key(&fid) {
                    return Err(EFIDINUSE.into());
                }
                self.fids.insert(fid, Fid::new(Node::Root));
                Ok(Fcall::Rattach {
                    qid: Node::Root.qid(&core),
                })
            }
            Fcall::Tflush { .. } => Ok(Fcall::Rflush),
            Fcall::Twalk {
                fid,
                newfid,
                wnames,
            } => {
                let from = self.fid(fid)?;
                if from.mode.is_some() {
                    return Err(EOPEN.into());
                }
                let mut node = from.node.clone();
                if newfid != fid && self.fids.contains_key(&newfid) {
                    return Err(EFIDINUSE.into());
                }
                let mut qids = Vec::with_capacity(wnames.len());
                for name in &wnames {
                    match node.walk(&core, name) {
                        Ok(next) => {
                            qids.push(next.qid(&core));
                            node = next;
                        }
                        Err(e) if qids.is_empty() => return Err(e.into()),
                        Err(_) => return Ok(Fcall::Rwalk { qids }),
                    }
                }
                self.fids.insert(newfid, Fid::new(node));
                Ok(Fcall::Rwalk { qids })
            }
            Fcall::Topen { fid, mode } => {
                let iounit = self.msize - IOHDR_LEN;
                let f = self.fid(fid)?;
                if f.mode.is_some() {
                    return Err(EOPEN.into());
                }
                if f.node.is_dir(&core) && mode & 3 != 0 {
                    return Err(EPERM.into());
                }
                f.node.check_open(&core, mode)?;
                f.mode = Some(mode);
                Ok(Fcall::Ropen {
                    qid: f.node.qid(&core),
                    iounit,
                })
            }
            Fcall::Tread { fid, offset, count } => {
                let count = count.min(self.msize - IOHDR_LEN) as usize;
                let f = self.fid(fid)?;
                if !f.readable() {
                    return Err(ENOTOPEN.into());
                }
                if f.node.is_dir(&core) {
                    read_dir(f, &core, offset, count)
                } else {
                    if offset == 0 {
                        f.data = f.node.contents(&core)?;
                    }
                    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(f.data.len());
                    let end = (start + count).min(f.data.len());
                    Ok(Fcall::Rread {
                        data: f.data[start..end].to_vec(),
                    })
                }
            }
            Fcall::Twrite { fid, offset, data } => {
                let f = self.fid(fid)?;
                if !f.writable() {
                    return Err(ENOTOPEN.into());
                }
                let node = f.node.clone();
                let count = node.write(&core, offset, &data)?;
                trace!(file = node.name(), count, "9p: write");
                Ok(Fcall::Rwrite { count })
            }
            Fcall::Tclunk { fid } => {
                self.fids.remove(&fid).ok_or(EUNKNOWNFID)?;
                Ok(Fcall::Rclunk)
            }
            Fcall::Tremove { fid } => {
                self.fids.remove(&fid).ok_or(EUNKNOWNFID)?;
                Err(EPERM.into())
            }
            Fcall::Tstat { fid } => {
                let f = self.fid(fid)?;
                Ok(Fcall::Rstat {
                    stat: f.node.stat(&core).to_bytes(),
                })
            }
            Fcall::Tcreate { .. } | Fcall::Twstat { .. } => Err(EPERM.into()),
            _ => Err(EUNEXPECTED.into()),
        }
    }
}

fn read_dir(f: &mut Fid, core: &UiCore, offset: u64, count: usize) -> Result<Fcall, String> {
    if offset == 0 {
        let stats = f.node.children(core).iter().map(|n| n.stat(core)).collect();
        f.dir = Some(DirRead {
            stats,
            next: 0,
            offset: 0,
        });
    }
    let Some(dir) = f.dir.as_mut().filter(|d| d.offset == offset) else {
        return Err(EDIROFF.into());
    };
    let (data, n) = pack_dir(&dir.stats, dir.next, count);
    dir.next += n;
    dir.offset += data.len() as u64;
    Ok(Fcall::Rread { data })
}

/// Serve one connection until the peer hangs up.
pub fn serve<S: Read + Write>(core: Arc<UiCore>, mut stream: S) -> NinepResult<()> {
    let mut session = Session::new(core);
    while let Some(msg) = read_msg(&mut stream, DEFAULT_MSIZE)? {
        trace!(tag = msg.tag, ty = msg.fcall.type_byte(), "9p: request");
        let reply = session.handle(msg);
        write_msg(&mut stream, &reply)?;
    }
    Ok(())
}

/// A Unix socket serving the namespace. Closing it (or dropping it) stops
/// accepting and removes the socket file; open connections run until their
/// peers hang up.
pub struct Listener {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Listener {
    /// Listen at `path`, replacing a stale socket there.
    pub fn bind(core: Arc<UiCore>, path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "9p: removed stale socket"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let listener = UnixListener::bind(&path)?;
        let stop = Arc::new(AtomicBool::new(false));
        let accept_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("nui-9p".into())
            .spawn(move || accept_loop(listener, core, accept_stop))?;
        info!(path = %path.display(), "9p: listening");
        Ok(Self {
            path,
            stop,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting and remove the socket.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::SeqCst);
        // wake the accept
        let _ = UnixStream::connect(&self.path);
        if handle.join().is_err() {
            warn!("9p: accept thread panicked");
        }
        let _ = fs::remove_file(&self.path);
        info!(path = %self.path.display(), "9p: closed");
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: UnixListener, core: Arc<UiCore>, stop: Arc<AtomicBool>) {
    let mut next_id: u64 = 0;
    for conn in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let stream = match conn {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "9p: accept failed");
                continue;
            }
        };
        next_id += 1;
        let id = next_id;
        let core = core.clone();
        let spawned = thread::Builder::new()
            .name(format!("nui-9p-{id}"))
            .spawn(move || {
                debug!(conn = id, "9p: connection opened");
                match serve(core, stream) {
                    Ok(()) => debug!(conn = id, "9p: connection closed"),
                    Err(err) => debug!(conn = id, error = %err, "9p: connection dropped"),
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "9p: could not start connection thread");
        }
    }
}

/// Post the namespace as `ui.<title>` in the configured srv directory.
pub fn post(core: Arc<UiCore>, config: &ProgramConfig) -> io::Result<Listener> {
    fs::create_dir_all(&config.srv_dir)?;
    Listener::bind(core, config.srv_path())
}
