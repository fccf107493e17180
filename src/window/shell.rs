//! Tab set: one surface per service plus the combined "All" view
//!
//! Exactly one tab is visible at a time. Window resizes go to every surface
//! (hidden ones catch up when revealed); keyboard input goes to the visible
//! one.

use super::emulator::{TerminalEmulator, Viewport};
use super::keys::KEY_HINTS;
use super::surface::{Feed, RenderSurface, SurfaceOptions};
use crate::core::context::AppContext;
use crate::terminal::SessionId;
use std::sync::Arc;
use tracing::{debug, info};

/// Title of the combined tab
pub const ALL_TAB_TITLE: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TabKey {
    Service(SessionId),
    All,
}

#[derive(Debug)]
struct Tab {
    key: TabKey,
    title: String,
    surface: RenderSurface,
}

#[derive(Debug)]
pub struct Shell {
    tabs: Vec<Tab>,
    selected: usize,
}

impl Shell {
    /// Build and mount every surface. The combined tab comes last and is
    /// selected.
    pub fn new<F>(ctx: &AppContext, options: SurfaceOptions, mut make_emulator: F) -> Self
    where
        F: FnMut(&TabKey) -> Box<dyn TerminalEmulator>,
    {
        let appearance = ctx.appearance();
        let sessions = ctx.registry().sessions();

        let mut tabs: Vec<Tab> = sessions
            .iter()
            .map(|session| {
                let key = TabKey::Service(session.id().to_string());
                let surface = RenderSurface::new(
                    Feed::Single(Arc::clone(session)),
                    make_emulator(&key),
                    appearance,
                    options.clone(),
                );
                Tab {
                    key,
                    title: session.display_name().to_string(),
                    surface,
                }
            })
            .collect();

        let all = TabKey::All;
        let surface = RenderSurface::new(
            Feed::Aggregated(sessions.to_vec()),
            make_emulator(&all),
            appearance,
            options,
        );
        tabs.push(Tab {
            key: all,
            title: ALL_TAB_TITLE.to_string(),
            surface,
        });

        for tab in &tabs {
            tab.surface.mount();
        }

        let selected = tabs.len() - 1;
        tabs[selected].surface.set_visible(true);
        info!("Shell ready with {} tabs", tabs.len());

        Self { tabs, selected }
    }

    /// Every surface is attached and laid out in `viewport`
    pub fn ready(&self, viewport: Option<Viewport>) {
        for tab in &self.tabs {
            tab.surface.mark_ready(viewport);
        }
    }

    /// (key, title) pairs in display order
    pub fn tabs(&self) -> impl Iterator<Item = (&TabKey, &str)> {
        self.tabs.iter().map(|t| (&t.key, t.title.as_str()))
    }

    /// Key of the visible tab; `None` once disposed
    pub fn selected(&self) -> Option<&TabKey> {
        self.tabs.get(self.selected).map(|t| &t.key)
    }

    /// Surface of the visible tab; `None` once disposed
    pub fn active(&self) -> Option<&RenderSurface> {
        self.tabs.get(self.selected).map(|t| &t.surface)
    }

    pub fn surface(&self, key: &TabKey) -> Option<&RenderSurface> {
        self.tabs.iter().find(|t| &t.key == key).map(|t| &t.surface)
    }

    /// Show the tab under `key`. Returns false if no such tab exists.
    pub fn select(&mut self, key: &TabKey) -> bool {
        let Some(index) = self.tabs.iter().position(|t| &t.key == key) else {
            return false;
        };
        self.select_index(index)
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        if index != self.selected {
            self.tabs[self.selected].surface.set_visible(false);
            self.selected = index;
            self.tabs[index].surface.set_visible(true);
            debug!("Selected tab {}", self.tabs[index].title);
        }
        true
    }

    /// Show the next (or previous) tab, wrapping around
    pub fn cycle(&mut self, forward: bool) -> bool {
        let len = self.tabs.len();
        if len == 0 {
            return false;
        }
        let index = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        self.select_index(index)
    }

    /// One-line tab strip with the visible tab highlighted
    pub fn header(&self) -> String {
        let mut line = String::new();
        for (index, tab) in self.tabs.iter().enumerate() {
            let label = match tab.key {
                TabKey::All => format!(" 0 {} ", tab.title),
                TabKey::Service(_) if index < 9 => format!(" {} {} ", index + 1, tab.title),
                TabKey::Service(_) => format!(" {} ", tab.title),
            };
            if index == self.selected {
                line.push_str(&format!("\x1b[7m{}\x1b[27m", label));
            } else {
                line.push_str(&label);
            }
        }
        line.push_str(&format!("  \x1b[2m{}\x1b[22m", KEY_HINTS));
        line
    }

    pub fn on_window_resize(&self, viewport: Viewport) {
        for tab in &self.tabs {
            tab.surface.on_window_resize(viewport);
        }
    }

    /// Keyboard or paste input for the visible tab
    pub fn handle_input(&self, data: &str) -> bool {
        self.active().is_some_and(|surface| surface.handle_input(data))
    }

    /// Start/stop button of the visible tab
    pub fn toggle_running(&self) {
        if let Some(surface) = self.active() {
            surface.toggle_running();
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Dispose every surface
    pub fn dispose(&mut self) {
        for tab in self.tabs.drain(..) {
            tab.surface.dispose();
        }
        self.selected = 0;
    }
}
