//! Interactive shell on the process's own terminal
//!
//! Every tab renders into its own [`ScreenPane`]; the selected one is on
//! screen under a tab strip. Key bindings arrive as [`ShellAction`]s.

use super::emulator::Viewport;
use super::keys::ShellAction;
use super::screen::{Screen, ScreenPane};
use super::shell::{Shell, TabKey};
use super::surface::SurfaceOptions;
use crate::core::context::AppContext;
use std::collections::HashMap;
use tracing::debug;

/// Ctrl+C as typed into a terminal
const INTERRUPT: &str = "\x03";

/// What the main loop should do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct Console {
    shell: Shell,
    panes: HashMap<TabKey, ScreenPane>,
    screen: Screen,
}

impl Console {
    pub fn new(ctx: &AppContext, options: SurfaceOptions, screen: Screen) -> Self {
        let mut panes = HashMap::new();
        let shell = Shell::new(ctx, options, |key| {
            let pane = screen.pane();
            panes.insert(key.clone(), pane.clone());
            Box::new(pane)
        });
        Self { shell, panes, screen }
    }

    /// Lay every tab out in `viewport`, start sessions and draw the selected tab
    pub fn ready(&self, viewport: Option<Viewport>) {
        if let Some(viewport) = viewport {
            self.screen.set_content_rows(viewport.height as u16);
        }
        self.shell.ready(viewport);
        self.show_selected();
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn pane(&self, key: &TabKey) -> Option<&ScreenPane> {
        self.panes.get(key)
    }

    pub fn apply(&mut self, ctx: &AppContext, action: ShellAction) -> Flow {
        match action {
            ShellAction::Select(index) => {
                if self.shell.select_index(index) {
                    self.show_selected();
                }
            }
            ShellAction::SelectAll => {
                if self.shell.select(&TabKey::All) {
                    self.show_selected();
                }
            }
            ShellAction::NextTab => {
                if self.shell.cycle(true) {
                    self.show_selected();
                }
            }
            ShellAction::PreviousTab => {
                if self.shell.cycle(false) {
                    self.show_selected();
                }
            }
            ShellAction::ToggleRunning => self.shell.toggle_running(),
            ShellAction::ToggleSortedColors => {
                ctx.toggle_sorted_colors();
            }
            ShellAction::Quit => return Flow::Quit,
            ShellAction::Input(data) => {
                if !self.shell.handle_input(&data) {
                    if data == INTERRUPT {
                        return Flow::Quit;
                    }
                    debug!("Input ignored by the visible tab");
                }
            }
        }
        Flow::Continue
    }

    /// Host terminal resized: refit every tab and redraw the visible one
    pub fn on_window_resize(&self, viewport: Viewport) {
        self.screen.set_content_rows(viewport.height as u16);
        self.shell.on_window_resize(viewport);
        self.show_selected();
    }

    fn show_selected(&self) {
        let Some(pane) = self.shell.selected().and_then(|key| self.panes.get(key)) else {
            return;
        };
        self.screen.show(pane, &self.shell.header());
    }

    /// Dispose every tab and give the terminal back
    pub fn dispose(&mut self) {
        self.shell.dispose();
        self.panes.clear();
        self.screen.release();
    }
}
