#![forbid(unsafe_code)]

//! The dispatch loop.
//!
//! A [`Program`] owns the display, the renderer, and the input channel.
//! Device readers, the core's waker, and anything else holding a sender
//! feed [`Event`]s into one bounded channel; the UI thread takes them one
//! at a time, hands input to the [`Dispatcher`], and repaints when the view
//! changed. The loop ends when `_quit` is set, the keyboard closes, Del is
//! typed, every sender is gone, or the display dies.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, sync_channel};

use tracing::{debug, info, warn};

use nui_core::event::{Event, Mouse};
use nui_draw::{Display, DrawConn, DrawError, DrawResult, Font};

use crate::app::App;
use crate::config::ProgramConfig;
use crate::core::UiCore;
use crate::dispatch::Dispatcher;
use crate::input::{KeyboardReader, MouseReader, RefreshReader};
use crate::render::Renderer;

/// Most non-mouse events held back while a gesture runs.
const MAX_DEFERRED: usize = 64;

/// Mouse events for a gesture loop, pulled from the event channel. Other
/// events that arrive meanwhile are kept for later, up to [`MAX_DEFERRED`].
struct ChannelMice<'a> {
    events: &'a Receiver<Event>,
    deferred: &'a mut VecDeque<Event>,
}

impl ChannelMice<'_> {
    fn defer(&mut self, ev: Event) {
        // one pending repaint or relayout is as good as several
        if matches!(ev, Event::Wake | Event::Resize) && self.deferred.contains(&ev) {
            return;
        }
        if self.deferred.len() >= MAX_DEFERRED {
            debug!(?ev, "ui: dropping event deferred during a gesture");
            return;
        }
        self.deferred.push_back(ev);
    }
}

impl Iterator for ChannelMice<'_> {
    type Item = Mouse;

    fn next(&mut self) -> Option<Mouse> {
        loop {
            match self.events.recv().ok()? {
                Event::Mouse(m) => return Some(m),
                other => self.defer(other),
            }
        }
    }
}

/// Load the configured font, falling back to the built-in one.
pub fn load_font(conn: &DrawConn, path: Option<&Path>) -> DrawResult<Font> {
    if let Some(p) = path {
        match Font::open(Some(conn), p) {
            Ok(font) => return Ok(font),
            Err(err) => {
                warn!(path = %p.display(), error = %err, "ui: font load failed, using the default font");
            }
        }
    }
    Font::default_font(Some(conn))
}

/// A running UI. See the module documentation.
pub struct Program {
    core: Arc<UiCore>,
    display: Display,
    renderer: Renderer,
    dispatcher: Dispatcher,
    events: Receiver<Event>,
    deferred: VecDeque<Event>,
    keyboard_closed: Arc<AtomicBool>,
    painted: Option<(u64, Option<String>)>,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("core", &self.core)
            .field("display", &self.display)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl Program {
    /// Start `app` on the devices named by `config`.
    pub fn new(app: impl App + 'static, config: &ProgramConfig) -> DrawResult<Self> {
        Self::with_core(UiCore::new(app), config)
    }

    /// Open the devices for an existing core.
    ///
    /// A missing mouse or keyboard device is logged and the program runs
    /// without it.
    pub fn with_core(core: Arc<UiCore>, config: &ProgramConfig) -> DrawResult<Self> {
        let mut display = Display::open_with_config(&config.draw_dir, config.display)?;
        let font = Arc::new(load_font(display.conn(), config.font_path.as_deref())?);
        let (tx, rx) = sync_channel(config.input_capacity);
        let closed = Arc::new(AtomicBool::new(false));

        match File::open(&config.mouse_path) {
            Ok(f) => {
                MouseReader::new(f, tx.clone()).spawn()?;
            }
            Err(err) => warn!(path = %config.mouse_path.display(), error = %err, "ui: no mouse"),
        }
        match File::open(&config.cons_path) {
            Ok(f) => {
                KeyboardReader::new(f, tx.clone(), closed.clone()).spawn()?;
            }
            Err(err) => warn!(path = %config.cons_path.display(), error = %err, "ui: no keyboard"),
        }
        if let Some(refresh) = display.take_refresh() {
            RefreshReader::new(refresh, tx.clone()).spawn()?;
        }
        core.set_waker(move || {
            let _ = tx.try_send(Event::Wake);
        });

        let renderer = Renderer::new(&display, font)?.with_config(config.layout.clone());
        info!(title = %config.title, "ui: program started");
        Ok(Self {
            core,
            display,
            renderer,
            dispatcher: Dispatcher::new(),
            events: rx,
            deferred: VecDeque::new(),
            keyboard_closed: closed,
            painted: None,
        })
    }

    /// A program over an open display, reading events from `events`.
    pub fn with_display(
        core: Arc<UiCore>,
        display: Display,
        font: Arc<Font>,
        events: Receiver<Event>,
    ) -> DrawResult<Self> {
        let renderer = Renderer::new(&display, font)?;
        Ok(Self {
            core,
            display,
            renderer,
            dispatcher: Dispatcher::new(),
            events,
            deferred: VecDeque::new(),
            keyboard_closed: Arc::new(AtomicBool::new(false)),
            painted: None,
        })
    }

    pub fn core(&self) -> &Arc<UiCore> {
        &self.core
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Check if the loop should stop.
    pub fn is_done(&self) -> bool {
        self.core.should_quit() || self.keyboard_closed.load(Ordering::SeqCst)
    }

    /// Repaint everything now.
    pub fn render(&mut self) -> DrawResult<()> {
        self.renderer.render(&self.core)?;
        self.painted = Some((self.core.rev(), self.core.focus()));
        Ok(())
    }

    /// Handle one event and repaint if the view moved on.
    pub fn step(&mut self, ev: Event) -> DrawResult<()> {
        let mut repaint = false;
        match ev {
            Event::Mouse(m) => {
                let mut mice = ChannelMice {
                    events: &self.events,
                    deferred: &mut self.deferred,
                };
                self.dispatcher.mouse(&self.core, &mut self.renderer, m, &mut mice)?;
            }
            Event::Key(k) => self.dispatcher.key(&self.core, &mut self.renderer, k)?,
            Event::Resize => {
                self.display.refresh_screen()?;
                self.renderer.resize(&self.display);
                debug!(r = ?self.renderer.bounds(), "ui: resized");
                repaint = true;
            }
            Event::Wake => repaint = true,
        }
        let stamp = (self.core.rev(), self.core.focus());
        if !self.is_done() && (repaint || self.painted.as_ref() != Some(&stamp)) {
            self.render()?;
        }
        Ok(())
    }

    /// Run until done, then release the display.
    pub fn run(mut self) -> DrawResult<()> {
        let result = self.event_loop();
        let Program {
            mut renderer,
            display,
            ..
        } = self;
        if let Err(err) = renderer.free().and_then(|()| display.close()) {
            debug!(error = %err, "ui: display release failed");
        }
        info!("ui: program finished");
        result
    }

    fn event_loop(&mut self) -> DrawResult<()> {
        self.render()?;
        while !self.is_done() {
            let ev = match self.deferred.pop_front() {
                Some(ev) => ev,
                None => match self.events.recv() {
                    Ok(ev) => ev,
                    Err(_) => break,
                },
            };
            match self.step(ev) {
                Ok(()) => {}
                Err(DrawError::Transport(err)) => {
                    warn!(error = %err, "ui: display lost");
                    return Err(DrawError::Transport(err));
                }
                Err(err) => warn!(error = %err, "ui: event failed"),
            }
        }
        Ok(())
    }
}
