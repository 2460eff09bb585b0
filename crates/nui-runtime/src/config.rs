#![forbid(unsafe_code)]

//! Program configuration.

use std::path::PathBuf;

use nui_draw::DisplayConfig;
use nui_layout::LayoutConfig;

/// Env var overriding the draw device directory.
pub const ENV_DRAW: &str = "NUI_DRAW";
/// Env var overriding the mouse device.
pub const ENV_MOUSE: &str = "NUI_MOUSE";
/// Env var overriding the keyboard device.
pub const ENV_CONS: &str = "NUI_CONS";
/// Env var naming a font file.
pub const ENV_FONT: &str = "NUI_FONT";
/// Env var overriding the directory the file server is posted in.
pub const ENV_SRV: &str = "NUI_SRV";

/// Bounds on the input channel capacity.
pub const MIN_INPUT_CAPACITY: usize = 16;
pub const MAX_INPUT_CAPACITY: usize = 32;

/// Where a program finds its devices and how it presents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    pub draw_dir: PathBuf,
    pub mouse_path: PathBuf,
    pub cons_path: PathBuf,
    /// Font file; the built-in font when unset or unreadable.
    pub font_path: Option<PathBuf>,
    /// Names the posted file server, `ui.<title>`.
    pub title: String,
    pub srv_dir: PathBuf,
    /// Capacity of the bounded input channel.
    pub input_capacity: usize,
    /// Serve the UI state over 9P while running.
    pub serve_9p: bool,
    pub display: DisplayConfig,
    pub layout: LayoutConfig,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            draw_dir: PathBuf::from("/dev/draw"),
            mouse_path: PathBuf::from("/dev/mouse"),
            cons_path: PathBuf::from("/dev/cons"),
            font_path: None,
            title: "nui".into(),
            srv_dir: PathBuf::from("/srv"),
            input_capacity: MAX_INPUT_CAPACITY,
            serve_9p: false,
            display: DisplayConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl ProgramConfig {
    /// Defaults overridden from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| get_env(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let mut config = Self::default();
        if let Some(p) = path(ENV_DRAW) {
            config.draw_dir = p;
        }
        if let Some(p) = path(ENV_MOUSE) {
            config.mouse_path = p;
        }
        if let Some(p) = path(ENV_CONS) {
            config.cons_path = p;
        }
        if let Some(p) = path(ENV_SRV) {
            config.srv_dir = p;
        }
        config.font_path = path(ENV_FONT);
        config
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_draw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.draw_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_mouse(mut self, path: impl Into<PathBuf>) -> Self {
        self.mouse_path = path.into();
        self
    }

    #[must_use]
    pub fn with_cons(mut self, path: impl Into<PathBuf>) -> Self {
        self.cons_path = path.into();
        self
    }

    #[must_use]
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_srv_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.srv_dir = dir.into();
        self
    }

    /// Set the input channel capacity, clamped to 16..=32.
    #[must_use]
    pub fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity.clamp(MIN_INPUT_CAPACITY, MAX_INPUT_CAPACITY);
        self
    }

    #[must_use]
    pub fn with_9p(mut self, serve: bool) -> Self {
        self.serve_9p = serve;
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Where the file server is posted.
    pub fn srv_path(&self) -> PathBuf {
        self.srv_dir.join(format!("ui.{}", self.title))
    }
}
