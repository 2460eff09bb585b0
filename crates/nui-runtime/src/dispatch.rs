#![forbid(unsafe_code)]

//! Turning mouse and keyboard input into actions.
//!
//! The [`Dispatcher`] hit-tests input against the renderer's last layout
//! and either emits an [`Action`] through the core or edits a text frame
//! directly. Mouse buttons act on press only; holding a button and moving
//! is handled by the gesture loops (frame selection, splitbox dragging),
//! which consume mouse events until the buttons change.
//!
//! | Input | Target | Result |
//! |---|---|---|
//! | B1 | button | `click id button=1 action=<on>` |
//! | B1 | checkbox | `toggle id value=<not checked>` |
//! | B1 | textbox | `focus id` |
//! | B1 | tag, body | focus, then a selection sweep |
//! | B1 | splitbox handle | drag loop updating weights |
//! | B2 / B3 | tag, body | `execute` / `look` with the word under the pointer |
//! | wheel | tag, body | scroll three lines, `scroll id lines=n` |
//! | Tab / shift-Tab | | `focus` on the next / previous focusable node |
//! | printable, Kbs | textbox | `input id text cursor` |
//! | printable, Kbs | tag, body | direct edit |
//! | Enter / Space | button / checkbox | synthesized `click` / `toggle` |
//! | Del | | quit |

use std::sync::Arc;

use tracing::debug;

use nui_core::event::{Buttons, KeyEvent, Mouse, keys};
use nui_draw::DrawResult;
use nui_layout::{LayoutNode, NodeType, drag_weights, focus_order, handle_at, hit_test, next_focus};
use nui_text::MouseSource;

use crate::action::{Action, kind};
use crate::core::UiCore;
use crate::render::Renderer;

/// Lines moved per wheel notch.
pub const WHEEL_LINES: i32 = 3;

/// Records the buttons of every mouse event a gesture loop consumes.
struct Tracked<'a> {
    inner: &'a mut dyn MouseSource,
    last: Option<Buttons>,
}

impl Iterator for Tracked<'_> {
    type Item = Mouse;

    fn next(&mut self) -> Option<Mouse> {
        let m = self.inner.next_mouse()?;
        self.last = Some(m.buttons);
        Some(m)
    }
}

/// Input-to-action translation. See the module documentation.
#[derive(Debug, Default)]
pub struct Dispatcher {
    buttons: Buttons,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons held as of the last mouse event seen.
    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    /// Handle one mouse event. Gestures read further events from `mice`.
    pub fn mouse(
        &mut self,
        core: &Arc<UiCore>,
        renderer: &mut Renderer,
        m: Mouse,
        mice: &mut dyn MouseSource,
    ) -> DrawResult<()> {
        let pressed = m.buttons.difference(self.buttons);
        self.buttons = m.buttons;
        let Some(layout) = renderer.layout().cloned() else {
            return Ok(());
        };

        if pressed.is_empty() {
            let hover = hit_test(&layout, m.xy)
                .filter(|n| n.kind == NodeType::Button)
                .map(|n| n.id.clone());
            if renderer.set_hover(hover) {
                renderer.render(core)?;
            }
            return Ok(());
        }

        if pressed.intersects(Buttons::WHEEL_UP | Buttons::WHEEL_DOWN) {
            let lines = if pressed.contains(Buttons::WHEEL_UP) {
                -WHEEL_LINES
            } else {
                WHEEL_LINES
            };
            if let Some(n) = hit_test(&layout, m.xy).filter(|n| is_text(n)) {
                renderer.scroll(core, &n.id, lines)?;
                renderer.flush()?;
                core.dispatch(
                    Action::new(kind::SCROLL)
                        .arg("id", n.id.as_str())
                        .arg("lines", lines.to_string()),
                );
            }
            return Ok(());
        }

        if pressed.contains(Buttons::LEFT) {
            if let Some((split, index)) = handle_at(&layout, m.xy) {
                return self.drag_split(core, renderer, split, index, mice);
            }
            let Some(n) = hit_test(&layout, m.xy) else {
                return Ok(());
            };
            let id = n.id.as_str();
            match n.kind {
                NodeType::Button => {
                    core.dispatch(click(n));
                }
                NodeType::Checkbox => {
                    core.dispatch(toggle(n));
                }
                NodeType::TextBox => {
                    core.dispatch(Action::new(kind::FOCUS).arg("id", id));
                }
                NodeType::Tag | NodeType::Body => {
                    if core.focus().as_deref() != Some(id) {
                        core.set_focus(Some(id));
                        renderer.render(core)?;
                    }
                    let mut tracked = Tracked { inner: mice, last: None };
                    let sel = renderer.select(core, id, m, &mut tracked)?;
                    if let Some(b) = tracked.last {
                        self.buttons = b;
                    }
                    debug!(id, ?sel, "dispatch: selection");
                    renderer.flush()?;
                }
                _ => {
                    core.dispatch(Action::new(kind::CLICK).arg("id", id).arg("button", "1"));
                }
            }
            return Ok(());
        }

        let which = if pressed.contains(Buttons::MIDDLE) {
            kind::EXECUTE
        } else if pressed.contains(Buttons::RIGHT) {
            kind::LOOK
        } else {
            return Ok(());
        };
        let Some(n) = hit_test(&layout, m.xy).filter(|n| is_text(n)) else {
            return Ok(());
        };
        if let Some(word) = renderer.word_at(core, &n.id, m.xy) {
            core.dispatch(Action::new(which).arg("id", n.id.as_str()).arg("text", word));
        }
        Ok(())
    }

    /// Follow a held B1 on a splitbox handle until every button is up.
    fn drag_split(
        &mut self,
        core: &Arc<UiCore>,
        renderer: &mut Renderer,
        split: &LayoutNode,
        index: usize,
        mice: &mut dyn MouseSource,
    ) -> DrawResult<()> {
        while let Some(m) = mice.next_mouse() {
            self.buttons = m.buttons;
            let weights = drag_weights(split, index, m.xy);
            debug!(split = %split.id, ?weights, "dispatch: split drag");
            renderer.set_weights(&split.id, weights);
            renderer.render(core)?;
            if m.buttons.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Handle one key.
    pub fn key(&mut self, core: &Arc<UiCore>, renderer: &mut Renderer, k: KeyEvent) -> DrawResult<()> {
        if k.rune == keys::KDEL {
            core.quit();
            return Ok(());
        }
        let focus = core.focus();
        let target = focus
            .as_deref()
            .and_then(|id| renderer.layout().and_then(|l| l.find(id)).cloned());

        if k.rune == '\t' && target.as_ref().is_none_or(|n| n.kind != NodeType::Body) {
            let order = renderer.layout().map(focus_order).unwrap_or_default();
            if let Some(next) = next_focus(&order, focus.as_deref(), k.shift) {
                core.dispatch(Action::new(kind::FOCUS).arg("id", next));
            }
            return Ok(());
        }

        let Some(n) = target else {
            core.dispatch(key_action("", k));
            return Ok(());
        };
        let id = n.id.as_str();
        match (n.kind, k.rune) {
            (NodeType::Button, '\n') => {
                core.dispatch(click(&n));
            }
            (NodeType::Checkbox, ' ') => {
                core.dispatch(toggle(&n));
            }
            (NodeType::TextBox, r) if r == keys::KBS || (keys::is_printable(r) && r != '\n') => {
                let mut text: Vec<char> = n.get("text").unwrap_or("").chars().collect();
                if r == keys::KBS {
                    text.pop();
                } else {
                    text.push(r);
                }
                let cursor = text.len();
                core.dispatch(
                    Action::new(kind::INPUT)
                        .arg("id", id)
                        .arg("text", text.into_iter().collect::<String>())
                        .arg("cursor", cursor.to_string()),
                );
            }
            (NodeType::Tag, '\n') => {}
            (NodeType::Tag | NodeType::Body, keys::KBS) => {
                renderer.backspace(core, id)?;
                renderer.flush()?;
            }
            (NodeType::Tag | NodeType::Body, keys::KLEFT | keys::KRIGHT) => {
                renderer.move_caret(core, id, k.rune == keys::KRIGHT)?;
                renderer.flush()?;
            }
            (NodeType::Tag | NodeType::Body, r) if keys::is_printable(r) => {
                renderer.type_runes(core, id, &[r])?;
                renderer.flush()?;
            }
            _ => {
                core.dispatch(key_action(id, k));
            }
        }
        Ok(())
    }
}

fn is_text(n: &LayoutNode) -> bool {
    matches!(n.kind, NodeType::Tag | NodeType::Body)
}

fn click(n: &LayoutNode) -> Action {
    Action::new(kind::CLICK)
        .arg("id", n.id.as_str())
        .arg("button", "1")
        .arg("action", n.get("on").unwrap_or(""))
}

fn toggle(n: &LayoutNode) -> Action {
    let value = if n.get("checked") == Some("1") { "0" } else { "1" };
    Action::new(kind::TOGGLE).arg("id", n.id.as_str()).arg("value", value)
}

fn key_action(id: &str, k: KeyEvent) -> Action {
    let a = Action::new(kind::KEY)
        .arg("id", id)
        .arg("rune", (k.rune as u32).to_string());
    if k.shift { a.arg("shift", "1") } else { a }
}
