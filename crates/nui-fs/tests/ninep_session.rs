//! 9P sessions against a live UI core.

use std::os::unix::net::UnixStream;
use std::sync::Arc;

use nui_fs::codec::{NOFID, NOTAG, OREAD, ORDWR, OWRITE, VERSION};
use nui_fs::{DEFAULT_MSIZE, Fcall, Listener, Msg, Session, decode_dir, post, read_msg, write_msg};
use nui_layout::ViewNode;
use nui_layout::node::{body, button, checkbox, tag, vbox};
use nui_runtime::{App, BufferKind, ProgramConfig, Store, UiCore};

struct Form;

impl App for Form {
    fn view(&self, _: &Store) -> ViewNode {
        vbox(
            "root",
            [
                tag("t", "Get Put"),
                body("b"),
                checkbox("cb", "agree", false).bind("user/agree"),
                button("ok", "OK", "submit"),
            ],
        )
    }
}

fn core() -> Arc<UiCore> {
    let core = UiCore::new(Form);
    core.set_search_path(None);
    core
}

struct Client {
    session: Session,
    tag: u16,
    next_fid: u32,
}

impl Client {
    fn attach(core: Arc<UiCore>) -> Self {
        let mut c = Self {
            session: Session::new(core),
            tag: 0,
            next_fid: 1,
        };
        let r = c.session.handle(Msg::new(
            NOTAG,
            Fcall::Tversion {
                msize: 4096,
                version: VERSION.into(),
            },
        ));
        assert_eq!(
            r.fcall,
            Fcall::Rversion {
                msize: 4096,
                version: VERSION.into()
            }
        );
        let r = c.rpc(Fcall::Tattach {
            fid: 0,
            afid: NOFID,
            uname: "glenda".into(),
            aname: String::new(),
        });
        assert!(matches!(r, Fcall::Rattach { qid } if qid.is_dir()));
        c
    }

    fn rpc(&mut self, f: Fcall) -> Fcall {
        self.tag += 1;
        let r = self.session.handle(Msg::new(self.tag, f));
        assert_eq!(r.tag, self.tag);
        r.fcall
    }

    fn open(&mut self, path: &[&str], mode: u8) -> Result<u32, String> {
        let fid = self.next_fid;
        self.next_fid += 1;
        let r = self.rpc(Fcall::Twalk {
            fid: 0,
            newfid: fid,
            wnames: path.iter().map(|s| s.to_string()).collect(),
        });
        match r {
            Fcall::Rwalk { qids } if qids.len() == path.len() => {}
            Fcall::Rerror { ename } => return Err(ename),
            other => return Err(format!("{other:?}")),
        }
        match self.rpc(Fcall::Topen { fid, mode }) {
            Fcall::Ropen { .. } => Ok(fid),
            Fcall::Rerror { ename } => Err(ename),
            other => Err(format!("{other:?}")),
        }
    }

    fn read_all(&mut self, fid: u32) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let r = self.rpc(Fcall::Tread {
                fid,
                offset: out.len() as u64,
                count: 256,
            });
            match r {
                Fcall::Rread { data } if data.is_empty() => return out,
                Fcall::Rread { data } => out.extend(data),
                other => panic!("read failed: {other:?}"),
            }
        }
    }

    fn cat(&mut self, path: &[&str]) -> String {
        let fid = self.open(path, OREAD).unwrap();
        let data = self.read_all(fid);
        self.rpc(Fcall::Tclunk { fid });
        String::from_utf8(data).unwrap()
    }

    fn write(&mut self, path: &[&str], data: &str) -> Fcall {
        let fid = self.open(path, OWRITE).unwrap();
        let r = self.rpc(Fcall::Twrite {
            fid,
            offset: 0,
            data: data.as_bytes().to_vec(),
        });
        self.rpc(Fcall::Tclunk { fid });
        r
    }
}

#[test]
fn written_action_updates_bound_state() {
    let core = core();
    let mut c = Client::attach(core.clone());
    let rev = core.rev();

    let r = c.write(&["actions"], "toggle id=cb value=1\n");
    assert_eq!(r, Fcall::Rwrite { count: 21 });

    assert_eq!(c.cat(&["state", "user", "agree"]), "1");
    assert_eq!(core.rev(), rev + 1);
    assert!(c.cat(&["tree"]).contains("checked=1"));
}

#[test]
fn state_writes_recompute_the_tree() {
    let core = core();
    let mut c = Client::attach(core.clone());
    let rev = core.rev();
    c.write(&["state", "user", "agree"], "1\n");
    assert_eq!(core.store().get("user/agree").as_deref(), Some("1"));
    assert_eq!(core.rev(), rev + 1);
    assert_eq!(core.node("cb").unwrap().props.get("checked").map(String::as_str), Some("1"));
}

#[test]
fn body_and_tag_text() {
    let core = core();
    let mut c = Client::attach(core.clone());
    assert_eq!(c.cat(&["tag", "t"]), "Get Put");
    c.write(&["body", "b"], "some text");
    assert_eq!(core.buffer_text(BufferKind::Body, "b").as_deref(), Some("some text"));
    assert_eq!(c.cat(&["body", "b"]), "some text");
    assert_eq!(c.open(&["tag", "t"], OWRITE), Err("permission denied".into()));
    assert_eq!(c.open(&["body", "zz"], OREAD), Err("file does not exist".into()));
}

#[test]
fn focus_and_ctl() {
    let core = core();
    let mut c = Client::attach(core.clone());
    assert_eq!(c.cat(&["focus"]), "");
    c.write(&["focus"], "b\n");
    assert_eq!(core.focus().as_deref(), Some("b"));
    assert_eq!(c.cat(&["focus"]), "b");

    let r = c.write(&["ctl"], "bogus\n");
    assert!(matches!(r, Fcall::Rerror { .. }));
    c.write(&["ctl"], "quit\n");
    assert!(core.should_quit());
}

#[test]
fn directory_reads_return_stat_entries() {
    let core = core();
    let mut c = Client::attach(core);
    let fid = c.open(&[], OREAD).unwrap();
    let entries = decode_dir(&c.read_all(fid)).unwrap();
    let names: Vec<&str> = entries.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["tree", "actions", "focus", "ctl", "state", "body", "tag"]);
    assert!(entries[4].qid.is_dir());

    let fid = c.open(&["body"], OREAD).unwrap();
    let entries = decode_dir(&c.read_all(fid)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "b");

    let r = c.rpc(Fcall::Tread {
        fid,
        offset: 3,
        count: 64,
    });
    assert_eq!(r, Fcall::error("bad offset in directory read"));
}

#[test]
fn refused_requests() {
    let core = core();
    let mut c = Client::attach(core);
    let r = c.rpc(Fcall::Tauth {
        afid: 5,
        uname: "glenda".into(),
        aname: String::new(),
    });
    assert_eq!(r, Fcall::error("authentication not required"));

    let r = c.rpc(Fcall::Tcreate {
        fid: 0,
        name: "new".into(),
        perm: 0o666,
        mode: ORDWR,
    });
    assert_eq!(r, Fcall::error("permission denied"));
    assert_eq!(c.rpc(Fcall::Tflush { oldtag: 1 }), Fcall::Rflush);
    assert_eq!(c.rpc(Fcall::Tclunk { fid: 77 }), Fcall::error("unknown fid"));
    assert_eq!(c.open(&["actions"], OREAD), Err("permission denied".into()));

    // a walk failing past the first element reports the prefix it managed
    let r = c.rpc(Fcall::Twalk {
        fid: 0,
        newfid: 40,
        wnames: vec!["body".into(), "missing".into()],
    });
    assert!(matches!(r, Fcall::Rwalk { ref qids } if qids.len() == 1), "{r:?}");
    assert_eq!(c.rpc(Fcall::Tstat { fid: 40 }), Fcall::error("unknown fid"));
}

#[test]
fn stat_reports_name_and_length() {
    let core = core();
    let mut c = Client::attach(core);
    c.open(&["tag", "t"], OREAD).unwrap();
    let r = c.rpc(Fcall::Tstat { fid: 1 });
    let Fcall::Rstat { stat } = r else {
        panic!("{r:?}");
    };
    let st = &decode_dir(&stat).unwrap()[0];
    assert_eq!(st.name, "t");
    assert_eq!(st.length, 7);
    assert_eq!(st.mode, 0o444);
}

fn rpc(stream: &mut UnixStream, tag: u16, f: Fcall) -> Fcall {
    write_msg(stream, &Msg::new(tag, f)).unwrap();
    read_msg(stream, DEFAULT_MSIZE).unwrap().unwrap().fcall
}

#[test]
fn unix_socket_connection() {
    let dir = tempfile::tempdir().unwrap();
    let core = core();
    let listener = Listener::bind(core.clone(), dir.path().join("ui.test")).unwrap();

    let mut s = UnixStream::connect(listener.path()).unwrap();
    let r = rpc(
        &mut s,
        NOTAG,
        Fcall::Tversion {
            msize: 8192,
            version: VERSION.into(),
        },
    );
    assert!(matches!(r, Fcall::Rversion { msize: 8192, .. }));
    rpc(
        &mut s,
        1,
        Fcall::Tattach {
            fid: 0,
            afid: NOFID,
            uname: "glenda".into(),
            aname: String::new(),
        },
    );
    rpc(
        &mut s,
        2,
        Fcall::Twalk {
            fid: 0,
            newfid: 1,
            wnames: vec!["tree".into()],
        },
    );
    rpc(&mut s, 3, Fcall::Topen { fid: 1, mode: OREAD });
    let r = rpc(
        &mut s,
        4,
        Fcall::Tread {
            fid: 1,
            offset: 0,
            count: 8000,
        },
    );
    assert_eq!(
        r,
        Fcall::Rread {
            data: core.tree_text().into_bytes()
        }
    );
    drop(s);

    let path = listener.path().to_path_buf();
    listener.close();
    assert!(!path.exists());
}

#[test]
fn post_names_the_socket_after_the_title() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProgramConfig::default()
        .with_srv_dir(dir.path().join("srv"))
        .with_title("demo");
    let listener = post(core(), &config).unwrap();
    assert_eq!(listener.path(), dir.path().join("srv/ui.demo"));
    assert!(listener.path().exists());
    UnixStream::connect(listener.path()).unwrap();
}
