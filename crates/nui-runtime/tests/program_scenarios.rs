//! The dispatch loop end to end against the software draw device.

use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::{Arc, Mutex};

use nui_core::event::{Buttons, Event, KeyEvent, Mouse, keys};
use nui_draw::{Color, Font, Point, Rectangle};
use nui_harness::SoftDevice;
use nui_layout::node::{body, button, checkbox, splitbox, tag, textbox, vbox};
use nui_layout::{Axis, ViewNode};
use nui_runtime::{Action, App, BufferKind, Builtins, Program, Store, UiCore};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn seen(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct Split;

impl App for Split {
    fn view(&self, _: &Store) -> ViewNode {
        splitbox("split", Axis::Vertical, [body("top"), body("bot")]).prop("weights", "1,1")
    }
}

struct Editor(Recorder);

impl App for Editor {
    fn view(&self, _: &Store) -> ViewNode {
        vbox("root", [tag("t", "Echo"), body("b")])
    }

    fn handle(&mut self, action: &Action, _: &Store) {
        self.0.0.lock().unwrap().push(action.serialize());
    }

    fn builtins(&mut self) -> Builtins {
        Builtins::new().with("Echo", |ctx| Ok(Some(format!("[{}]", ctx.selection))))
    }
}

struct Form(Recorder);

impl App for Form {
    fn view(&self, _: &Store) -> ViewNode {
        vbox(
            "root",
            [
                textbox("name", "name").bind("user/name"),
                checkbox("cb", "agree", false).bind("user/agree"),
                button("ok", "OK", "submit"),
            ],
        )
    }

    fn handle(&mut self, action: &Action, _: &Store) {
        self.0.0.lock().unwrap().push(action.serialize());
    }
}

fn start(app: impl App + 'static, r: Rectangle) -> (SoftDevice, Program, SyncSender<Event>) {
    let dev = SoftDevice::new(r);
    let display = dev.open_display().unwrap();
    let font = Arc::new(Font::default_font(Some(display.conn())).unwrap());
    let (tx, rx) = sync_channel(32);
    let core = UiCore::new(app);
    core.set_search_path(None);
    let mut prog = Program::with_display(core, display, font, rx).unwrap();
    prog.render().unwrap();
    (dev, prog, tx)
}

fn at(x: i32, y: i32, buttons: Buttons) -> Mouse {
    Mouse::new(Point::new(x, y), buttons, 0)
}

/// Start a gesture with `press`; the rest of it waits in the channel.
fn gesture(prog: &mut Program, tx: &SyncSender<Event>, press: Mouse, rest: &[Mouse]) {
    for m in rest {
        tx.send(Event::Mouse(*m)).unwrap();
    }
    prog.step(Event::Mouse(press)).unwrap();
}

fn click(prog: &mut Program, tx: &SyncSender<Event>, x: i32, y: i32, b: Buttons) {
    gesture(prog, tx, at(x, y, b), &[]);
    prog.step(Event::Mouse(at(x, y, Buttons::empty()))).unwrap();
}

fn type_text(prog: &mut Program, text: &str) {
    for r in text.chars() {
        prog.step(Event::Key(KeyEvent::new(r))).unwrap();
    }
}

#[test]
fn splitbox_drag_resizes_the_top_body() {
    let (dev, mut prog, tx) = start(Split, Rectangle::new(0, 0, 200, 200));
    let layout = prog.renderer().layout().unwrap().clone();
    assert_eq!(layout.find("top").unwrap().rect.dy(), 99);
    assert_eq!(layout.handles[0].rect, Rectangle::new(0, 99, 200, 102));

    gesture(
        &mut prog,
        &tx,
        at(100, 100, Buttons::LEFT),
        &[at(100, 50, Buttons::LEFT), at(100, 50, Buttons::empty())],
    );

    assert_eq!(prog.renderer().weights()["split"], vec![50, 147]);
    let layout = prog.renderer().layout().unwrap();
    assert_eq!(layout.find("top").unwrap().rect, Rectangle::new(0, 0, 200, 50));
    assert_eq!(layout.find("bot").unwrap().rect, Rectangle::new(0, 53, 200, 200));
    assert_eq!(dev.screen_pixel(Point::new(100, 25)), Some(Color::PALE_YELLOW));
    assert_eq!(dev.screen_pixel(Point::new(100, 51)), Some(Color::YELLOW_GREEN));
    assert_eq!(dev.screen_pixel(Point::new(100, 60)), Some(Color::PALE_YELLOW));
    assert!(prog.renderer().frame("top").is_some());
}

#[test]
fn typing_selecting_and_executing_in_a_window() {
    let rec = Recorder::default();
    let (_dev, mut prog, tx) = start(Editor(rec.clone()), Rectangle::new(0, 0, 200, 100));

    // focus the body, then type into it
    gesture(&mut prog, &tx, at(5, 50, Buttons::LEFT), &[at(5, 50, Buttons::empty())]);
    assert_eq!(prog.core().focus().as_deref(), Some("b"));
    type_text(&mut prog, "hello");
    assert_eq!(prog.core().buffer_text(BufferKind::Body, "b").as_deref(), Some("hello"));
    assert_eq!(prog.core().store().get("_body/b").as_deref(), Some("hello"));
    let frame = prog.renderer().frame("b").unwrap().frame();
    assert_eq!(frame.text().iter().collect::<String>(), "hello");
    assert_eq!((frame.p0(), frame.p1()), (5, 5));

    // sweep "he"
    gesture(
        &mut prog,
        &tx,
        at(1, 12, Buttons::LEFT),
        &[at(17, 12, Buttons::LEFT), at(17, 12, Buttons::empty())],
    );
    assert_eq!(prog.core().selection_text("b").as_deref(), Some("he"));

    // B2 on the tag word runs the builtin over the focused selection
    click(&mut prog, &tx, 10, 5, Buttons::MIDDLE);
    let seen = rec.seen();
    assert!(seen.contains(&"execute id=t text=Echo".to_string()), "{seen:?}");
    assert!(seen.contains(&"cmdoutput cmd=Echo id=t text=[he]".to_string()), "{seen:?}");

    // backspace removes the selection
    prog.step(Event::Key(KeyEvent::new(keys::KBS))).unwrap();
    assert_eq!(prog.core().buffer_text(BufferKind::Body, "b").as_deref(), Some("llo"));
}

#[test]
fn b3_looks_at_the_word_under_the_pointer() {
    let rec = Recorder::default();
    let (_dev, mut prog, tx) = start(Editor(rec.clone()), Rectangle::new(0, 0, 200, 100));
    prog.core().write_buffer(BufferKind::Body, "b", "open the pod bay doors");
    prog.step(Event::Wake).unwrap();
    // "the" spans x 40..64 on the first body line
    click(&mut prog, &tx, 45, 15, Buttons::RIGHT);
    assert!(rec.seen().contains(&"look id=b text=the".to_string()));
    // on whitespace there is no word
    click(&mut prog, &tx, 33, 15, Buttons::RIGHT);
    assert_eq!(rec.seen().iter().filter(|a| a.starts_with("look")).count(), 1);
}

#[test]
fn external_buffer_writes_reload_the_frame() {
    let (_dev, mut prog, _tx) = start(Editor(Recorder::default()), Rectangle::new(0, 0, 200, 100));
    assert!(prog.core().write_buffer(BufferKind::Body, "b", "fresh"));
    prog.step(Event::Wake).unwrap();
    let frame = prog.renderer().frame("b").unwrap().frame();
    assert_eq!(frame.text().iter().collect::<String>(), "fresh");

    prog.core().mark_dirty("b");
    prog.step(Event::Wake).unwrap();
    let seq = prog.core().buffers().seq(BufferKind::Body, "b");
    assert_eq!(prog.renderer().frame("b").unwrap().frame().loaded_seq(), seq);
}

#[test]
fn form_controls_emit_actions() {
    let rec = Recorder::default();
    let (dev, mut prog, tx) = start(Form(rec.clone()), Rectangle::new(0, 0, 200, 100));

    // the checkbox box sits at (0,14)-(10,24)
    assert_eq!(dev.screen_pixel(Point::new(5, 19)), Some(Color::WHITE));
    click(&mut prog, &tx, 2, 16, Buttons::LEFT);
    assert_eq!(prog.core().store().get("user/agree").as_deref(), Some("1"));
    assert_eq!(dev.screen_pixel(Point::new(5, 19)), Some(Color::DARK_GREEN));

    // Tab reaches the textbox first
    prog.step(Event::Key(KeyEvent::new('\t'))).unwrap();
    assert_eq!(prog.core().focus().as_deref(), Some("name"));
    type_text(&mut prog, "Al");
    prog.step(Event::Key(KeyEvent::new(keys::KBS))).unwrap();
    assert_eq!(prog.core().store().get("user/name").as_deref(), Some("A"));
    assert!(rec.seen().contains(&"input cursor=2 id=name text=Al".to_string()));

    // shift-Tab wraps backward to the button; Enter clicks it
    prog.step(Event::Key(KeyEvent::shifted('\t'))).unwrap();
    assert_eq!(prog.core().focus().as_deref(), Some("ok"));
    prog.step(Event::Key(KeyEvent::new('\n'))).unwrap();
    assert!(rec.seen().contains(&"click action=submit button=1 id=ok".to_string()));

    // Space on the checkbox toggles it back
    prog.step(Event::Key(KeyEvent::shifted('\t'))).unwrap();
    assert_eq!(prog.core().focus().as_deref(), Some("cb"));
    prog.step(Event::Key(KeyEvent::new(' '))).unwrap();
    assert_eq!(prog.core().store().get("user/agree").as_deref(), Some("0"));
}

#[test]
fn resize_relays_out() {
    let (dev, mut prog, _tx) = start(Split, Rectangle::new(0, 0, 200, 200));
    dev.resize(Rectangle::new(0, 0, 300, 100));
    prog.step(Event::Resize).unwrap();
    assert_eq!(prog.renderer().bounds(), Rectangle::new(0, 0, 300, 100));
    let layout = prog.renderer().layout().unwrap();
    assert_eq!(layout.rect, Rectangle::new(0, 0, 300, 100));
    assert_eq!(layout.find("top").unwrap().rect.dy(), 49);
}

#[test]
fn del_ends_the_loop() {
    let (_dev, prog, tx) = start(Editor(Recorder::default()), Rectangle::new(0, 0, 200, 100));
    tx.send(Event::Key(KeyEvent::new(keys::KDEL))).unwrap();
    tx.send(Event::Key(KeyEvent::new('x'))).unwrap();
    let core = prog.core().clone();
    prog.run().unwrap();
    assert!(core.should_quit());
    assert_eq!(core.buffer_text(BufferKind::Body, "b").as_deref(), Some(""));
}

#[test]
fn loop_ends_when_every_sender_is_gone() {
    let (_dev, prog, tx) = start(Split, Rectangle::new(0, 0, 100, 100));
    tx.send(Event::Wake).unwrap();
    drop(tx);
    prog.run().unwrap();
}
