#![forbid(unsafe_code)]

//! 9P2000 messages.
//!
//! Every message is `size[4] type[1] tag[2]` followed by the type's fields,
//! all little-endian. Strings are `len[2]` then UTF-8 bytes; `size` counts
//! itself.

use std::io::{ErrorKind, Read, Write};

use crate::error::{NinepError, NinepResult};

pub const TVERSION: u8 = 100;
pub const RVERSION: u8 = 101;
pub const TAUTH: u8 = 102;
pub const RAUTH: u8 = 103;
pub const TATTACH: u8 = 104;
pub const RATTACH: u8 = 105;
pub const RERROR: u8 = 107;
pub const TFLUSH: u8 = 108;
pub const RFLUSH: u8 = 109;
pub const TWALK: u8 = 110;
pub const RWALK: u8 = 111;
pub const TOPEN: u8 = 112;
pub const ROPEN: u8 = 113;
pub const TCREATE: u8 = 114;
pub const RCREATE: u8 = 115;
pub const TREAD: u8 = 116;
pub const RREAD: u8 = 117;
pub const TWRITE: u8 = 118;
pub const RWRITE: u8 = 119;
pub const TCLUNK: u8 = 120;
pub const RCLUNK: u8 = 121;
pub const TREMOVE: u8 = 122;
pub const RREMOVE: u8 = 123;
pub const TSTAT: u8 = 124;
pub const RSTAT: u8 = 125;
pub const TWSTAT: u8 = 126;
pub const RWSTAT: u8 = 127;

/// The only protocol version spoken.
pub const VERSION: &str = "9P2000";
pub const NOTAG: u16 = 0xFFFF;
pub const NOFID: u32 = 0xFFFF_FFFF;
/// `size[4] type[1] tag[2]`
pub const HEADER_LEN: usize = 7;
/// Read/write framing: header plus `fid[4] offset[8] count[4]`.
pub const IOHDR_LEN: u32 = 24;
/// Most elements a single walk may carry.
pub const MAXWELEM: usize = 16;

pub const QTDIR: u8 = 0x80;
pub const QTFILE: u8 = 0x00;
pub const DMDIR: u32 = 0x8000_0000;

pub const OREAD: u8 = 0;
pub const OWRITE: u8 = 1;
pub const ORDWR: u8 = 2;
pub const OEXEC: u8 = 3;
pub const OTRUNC: u8 = 0x10;

/// File identity as the server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qid {
    pub kind: u8,
    pub version: u32,
    pub path: u64,
}

impl Qid {
    pub const LEN: usize = 13;

    pub fn is_dir(&self) -> bool {
        self.kind & QTDIR != 0
    }
}

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stat {
    pub typ: u16,
    pub dev: u32,
    pub qid: Qid,
    pub mode: u32,
    pub atime: u32,
    pub mtime: u32,
    pub length: u64,
    pub name: String,
    pub uid: String,
    pub gid: String,
    pub muid: String,
}

impl Stat {
    /// Append the entry, leading `size[2]` included.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let mut p = Packer::new(out);
        let start = p.mark();
        p.u16(0)
            .u16(self.typ)
            .u32(self.dev)
            .qid(&self.qid)
            .u32(self.mode)
            .u32(self.atime)
            .u32(self.mtime)
            .u64(self.length)
            .str(&self.name)
            .str(&self.uid)
            .str(&self.gid)
            .str(&self.muid);
        let len = p.mark() - start - 2;
        p.patch_u16(start, len as u16);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }

    /// Parse one entry from the front of `b`. Returns it and the bytes used.
    pub fn decode(b: &[u8]) -> NinepResult<(Stat, usize)> {
        let mut u = Unpacker::new(b);
        let size = usize::from(u.u16()?);
        let body = u.take(size)?;
        let mut u = Unpacker::new(body);
        let st = Stat {
            typ: u.u16()?,
            dev: u.u32()?,
            qid: u.qid()?,
            mode: u.u32()?,
            atime: u.u32()?,
            mtime: u.u32()?,
            length: u.u64()?,
            name: u.str()?,
            uid: u.str()?,
            gid: u.str()?,
            muid: u.str()?,
        };
        Ok((st, size + 2))
    }
}

/// Split packed directory data into entries.
pub fn decode_dir(mut b: &[u8]) -> NinepResult<Vec<Stat>> {
    let mut out = Vec::new();
    while !b.is_empty() {
        let (st, used) = Stat::decode(b)?;
        out.push(st);
        b = &b[used..];
    }
    Ok(out)
}

/// Message bodies, requests (`T*`) and replies (`R*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fcall {
    Tversion { msize: u32, version: String },
    Rversion { msize: u32, version: String },
    Tauth { afid: u32, uname: String, aname: String },
    Rauth { aqid: Qid },
    Tattach { fid: u32, afid: u32, uname: String, aname: String },
    Rattach { qid: Qid },
    Rerror { ename: String },
    Tflush { oldtag: u16 },
    Rflush,
    Twalk { fid: u32, newfid: u32, wnames: Vec<String> },
    Rwalk { qids: Vec<Qid> },
    Topen { fid: u32, mode: u8 },
    Ropen { qid: Qid, iounit: u32 },
    Tcreate { fid: u32, name: String, perm: u32, mode: u8 },
    Rcreate { qid: Qid, iounit: u32 },
    Tread { fid: u32, offset: u64, count: u32 },
    Rread { data: Vec<u8> },
    Twrite { fid: u32, offset: u64, data: Vec<u8> },
    Rwrite { count: u32 },
    Tclunk { fid: u32 },
    Rclunk,
    Tremove { fid: u32 },
    Rremove,
    Tstat { fid: u32 },
    Rstat { stat: Vec<u8> },
    Twstat { fid: u32, stat: Vec<u8> },
    Rwstat,
}

impl Fcall {
    pub fn type_byte(&self) -> u8 {
        match self {
            Self::Tversion { .. } => TVERSION,
            Self::Rversion { .. } => RVERSION,
            Self::Tauth { .. } => TAUTH,
            Self::Rauth { .. } => RAUTH,
            Self::Tattach { .. } => TATTACH,
            Self::Rattach { .. } => RATTACH,
            Self::Rerror { .. } => RERROR,
            Self::Tflush { .. } => TFLUSH,
            Self::Rflush => RFLUSH,
            Self::Twalk { .. } => TWALK,
            Self::Rwalk { .. } => RWALK,
            Self::Topen { .. } => TOPEN,
            Self::Ropen { .. } => ROPEN,
            Self::Tcreate { .. } => TCREATE,
            Self::Rcreate { .. } => RCREATE,
            Self::Tread { .. } => TREAD,
            Self::Rread { .. } => RREAD,
            Self::Twrite { .. } => TWRITE,
            Self::Rwrite { .. } => RWRITE,
            Self::Tclunk { .. } => TCLUNK,
            Self::Rclunk => RCLUNK,
            Self::Tremove { .. } => TREMOVE,
            Self::Rremove => RREMOVE,
            Self::Tstat { .. } => TSTAT,
            Self::Rstat { .. } => RSTAT,
            Self::Twstat { .. } => TWSTAT,
            Self::Rwstat => RWSTAT,
        }
    }

    pub fn error(ename: impl Into<String>) -> Self {
        Self::Rerror {
            ename: ename.into(),
        }
    }
}

/// One tagged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub tag: u16,
    pub fcall: Fcall,
}

impl Msg {
    pub fn new(tag: u16, fcall: Fcall) -> Self {
        Self { tag, fcall }
    }

    /// The full wire form, `size[4]` included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        let mut p = Packer::new(&mut out);
        p.u32(0).u8(self.fcall.type_byte()).u16(self.tag);
        match &self.fcall {
            Fcall::Tversion { msize, version } | Fcall::Rversion { msize, version } => {
                p.u32(*msize).str(version);
            }
            Fcall::Tauth { afid, uname, aname } => {
                p.u32(*afid).str(uname).str(aname);
            }
            Fcall::Rauth { aqid: qid } | Fcall::Rattach { qid } => {
                p.qid(qid);
            }
            Fcall::Tattach {
                fid,
                afid,
                uname,
                aname,
            } => {
                p.u32(*fid).u32(*afid).str(uname).str(aname);
            }
            Fcall::Rerror { ename } => {
                p.str(ename);
            }
            Fcall::Tflush { oldtag } => {
                p.u16(*oldtag);
            }
            Fcall::Twalk {
                fid,
                newfid,
                wnames,
            } => {
                p.u32(*fid).u32(*newfid).u16(wnames.len() as u16);
                for w in wnames {
                    p.str(w);
                }
            }
            Fcall::Rwalk { qids } => {
                p.u16(qids.len() as u16);
                for q in qids {
                    p.qid(q);
                }
            }
            Fcall::Topen { fid, mode } => {
                p.u32(*fid).u8(*mode);
            }
            Fcall::Ropen { qid, iounit } | Fcall::Rcreate { qid, iounit } => {
                p.qid(qid).u32(*iounit);
            }
            Fcall::Tcreate {
                fid,
                name,
                perm,
                mode,
            } => {
                p.u32(*fid).str(name).u32(*perm).u8(*mode);
            }
            Fcall::Tread { fid, offset, count } => {
                p.u32(*fid).u64(*offset).u32(*count);
            }
            Fcall::Rread { data } => {
                p.u32(data.len() as u32).bytes(data);
            }
            Fcall::Twrite { fid, offset, data } => {
                p.u32(*fid).u64(*offset).u32(data.len() as u32).bytes(data);
            }
            Fcall::Rwrite { count } => {
                p.u32(*count);
            }
            Fcall::Tclunk { fid } | Fcall::Tremove { fid } | Fcall::Tstat { fid } => {
                p.u32(*fid);
            }
            Fcall::Rstat { stat } => {
                p.u16(stat.len() as u16).bytes(stat);
            }
            Fcall::Twstat { fid, stat } => {
                p.u32(*fid).u16(stat.len() as u16).bytes(stat);
            }
            Fcall::Rflush | Fcall::Rclunk | Fcall::Rremove | Fcall::Rwstat => {}
        }
        let size = p.mark() as u32;
        p.patch_u32(0, size);
        out
    }

    /// Parse one complete message, `size[4]` included.
    pub fn decode(b: &[u8]) -> NinepResult<Msg> {
        let mut u = Unpacker::new(b);
        let size = u.u32()? as usize;
        if size != b.len() {
            return Err(NinepError::Format(format!(
                "size field {size} but message is {} bytes",
                b.len()
            )));
        }
        let typ = u.u8()?;
        let tag = u.u16()?;
        let fcall = match typ {
            TVERSION => Fcall::Tversion {
                msize: u.u32()?,
                version: u.str()?,
            },
            RVERSION => Fcall::Rversion {
                msize: u.u32()?,
                version: u.str()?,
            },
            TAUTH => Fcall::Tauth {
                afid: u.u32()?,
                uname: u.str()?,
                aname: u.str()?,
            },
            RAUTH => Fcall::Rauth { aqid: u.qid()? },
            TATTACH => Fcall::Tattach {
                fid: u.u32()?,
                afid: u.u32()?,
                uname: u.str()?,
                aname: u.str()?,
            },
            RATTACH => Fcall::Rattach { qid: u.qid()? },
            RERROR => Fcall::Rerror { ename: u.str()? },
            TFLUSH => Fcall::Tflush { oldtag: u.u16()? },
            RFLUSH => Fcall::Rflush,
            TWALK => {
                let fid = u.u32()?;
                let newfid = u.u32()?;
                let n = usize::from(u.u16()?);
                if n > MAXWELEM {
                    return Err(NinepError::Format(format!("walk of {n} elements")));
                }
                let wnames = (0..n).map(|_| u.str()).collect::<NinepResult<_>>()?;
                Fcall::Twalk {
                    fid,
                    newfid,
                    wnames,
                }
            }
            RWALK => {
                let n = usize::from(u.u16()?);
                let qids = (0..n).map(|_| u.qid()).collect::<NinepResult<_>>()?;
                Fcall::Rwalk { qids }
            }
            TOPEN => Fcall::Topen {
                fid: u.u32()?,
                mode: u.u8()?,
            },
            ROPEN => Fcall::Ropen {
                qid: u.qid()?,
                iounit: u.u32()?,
            },
            TCREATE => Fcall::Tcreate {
                fid: u.u32()?,
                name: u.str()?,
                perm: u.u32()?,
                mode: u.u8()?,
            },
            RCREATE => Fcall::Rcreate {
                qid: u.qid()?,
                iounit: u.u32()?,
            },
            TREAD => Fcall::Tread {
                fid: u.u32()?,
                offset: u.u64()?,
                count: u.u32()?,
            },
            RREAD => {
                let n = u.u32()? as usize;
                Fcall::Rread {
                    data: u.take(n)?.to_vec(),
                }
            }
            TWRITE => {
                let fid = u.u32()?;
                let offset = u.u64()?;
                let n = u.u32()? as usize;
                Fcall::Twrite {
                    fid,
                    offset,
                    data: u.take(n)?.to_vec(),
                }
            }
            RWRITE => Fcall::Rwrite { count: u.u32()? },
            TCLUNK => Fcall::Tclunk { fid: u.u32()? },
            RCLUNK => Fcall::Rclunk,
            TREMOVE => Fcall::Tremove { fid: u.u32()? },
            RREMOVE => Fcall::Rremove,
            TSTAT => Fcall::Tstat { fid: u.u32()? },
            RSTAT => {
                let n = usize::from(u.u16()?);
                Fcall::Rstat {
                    stat: u.take(n)?.to_vec(),
                }
            }
            TWSTAT => {
                let fid = u.u32()?;
                let n = usize::from(u.u16()?);
                Fcall::Twstat {
                    fid,
                    stat: u.take(n)?.to_vec(),
                }
            }
            RWSTAT => Fcall::Rwstat,
            other => return Err(NinepError::Format(format!("unknown message type {other}"))),
        };
        if !u.is_empty() {
            return Err(NinepError::Format(format!(
                "{} trailing bytes after type {typ}",
                u.remaining()
            )));
        }
        Ok(Msg { tag, fcall })
    }
}

/// Read one message. `None` when the peer closed between messages.
pub fn read_msg<R: Read>(r: &mut R, msize: u32) -> NinepResult<Option<Msg>> {
    let mut size = [0u8; 4];
    match r.read_exact(&mut size) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let n = u32::from_le_bytes(size);
    if (n as usize) < HEADER_LEN || n > msize {
        return Err(NinepError::Format(format!("bad message size {n}")));
    }
    let mut buf = vec![0u8; n as usize];
    buf[..4].copy_from_slice(&size);
    r.read_exact(&mut buf[4..])?;
    Msg::decode(&buf).map(Some)
}

pub fn write_msg<W: Write>(w: &mut W, msg: &Msg) -> NinepResult<()> {
    w.write_all(&msg.encode())?;
    w.flush()?;
    Ok(())
}

// ─── Field packing ──────────────────────────────────────────────────────────

struct Packer<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> Packer<'a> {
    fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }

    fn mark(&self) -> usize {
        self.out.len()
    }

    fn u8(&mut self, v: u8) -> &mut Self {
        self.out.push(v);
        self
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.out.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.out.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.out.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.out.extend_from_slice(data);
        self
    }

    fn str(&mut self, s: &str) -> &mut Self {
        self.u16(s.len() as u16).bytes(s.as_bytes())
    }

    fn qid(&mut self, q: &Qid) -> &mut Self {
        self.u8(q.kind).u32(q.version).u64(q.path)
    }

    fn patch_u16(&mut self, at: usize, v: u16) {
        self.out[at..at + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn patch_u32(&mut self, at: usize, v: u32) {
        self.out[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
}

struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> NinepResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(NinepError::Format(format!(
                "short message: want {n} bytes, have {}",
                self.remaining()
            )));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn array<const N: usize>(&mut self) -> NinepResult<[u8; N]> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    fn u8(&mut self) -> NinepResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> NinepResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> NinepResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> NinepResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    fn str(&mut self) -> NinepResult<String> {
        let n = usize::from(self.u16()?);
        let raw = self.take(n)?;
        String::from_utf8(raw.to_vec()).map_err(|_| NinepError::Format("string is not UTF-8".into()))
    }

    fn qid(&mut self) -> NinepResult<Qid> {
        Ok(Qid {
            kind: self.u8()?,
            version: self.u32()?,
            path: self.u64()?,
        })
    }
}
