//! Application context
//!
//! Built once at process entry and passed by reference to everything that
//! needs sessions, the backend channel or the current appearance.

use crate::core::config::Config;
use crate::core::settings::Settings;
use crate::protocol::{Command, CommandEnvelope};
use crate::terminal::{BackendChannel, CommandSink, SessionRegistry};
use crate::window::accent::AccentMode;
use crate::window::surface::Appearance;
use crate::window::theme::ThemeName;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AppContext {
    config: Config,
    backend: Arc<BackendChannel>,
    sink: Arc<dyn CommandSink>,
    registry: SessionRegistry,
    appearance: Appearance,
    settings: Mutex<Settings>,
    /// Where preference changes are written; `None` keeps them in memory
    settings_path: Option<PathBuf>,
}

impl AppContext {
    pub fn new(config: Config, sink: Arc<dyn CommandSink>, settings: Settings) -> Self {
        let backend = Arc::new(BackendChannel::new());
        let registry = SessionRegistry::new(&config, &backend, &sink);
        let appearance = Appearance::new(settings.theme.tokens(), settings.accent_mode());

        Self {
            config,
            backend,
            sink,
            registry,
            appearance,
            settings: Mutex::new(settings),
            settings_path: None,
        }
    }

    /// Persist preference changes to `path`
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<BackendChannel> {
        &self.backend
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Route a serialized inbound envelope to session `id`
    pub fn deliver(&self, id: &str, payload: &str) {
        self.backend.deliver_json(id, payload);
    }

    /// Post a window-level command (`id: ""`)
    pub fn send_window(&self, command: Command) {
        if !command.is_window_command() {
            warn!("Refusing to send {:?} as a window command", command);
            return;
        }
        match CommandEnvelope::window(command).to_json() {
            Ok(message) => self.sink.post(message),
            Err(e) => warn!("Failed to encode window command: {}", e),
        }
    }

    /// Switch theme; every mounted surface resyncs its palette
    pub fn set_theme(&self, theme: ThemeName) {
        let changed = {
            let mut settings = self.settings.lock();
            let changed = settings.theme != theme;
            settings.theme = theme;
            changed
        };
        if changed {
            info!("Theme set to {}", theme.display_name());
            self.persist();
            self.appearance.theme.set(theme.tokens());
        }
    }

    /// Flip between theme-derived and sorted accent colours
    pub fn toggle_sorted_colors(&self) -> AccentMode {
        let mode = {
            let mut settings = self.settings.lock();
            settings.sorted_colors = !settings.sorted_colors;
            settings.accent_mode()
        };
        info!("Accent colours: {:?}", mode);
        self.persist();
        self.appearance.accent_mode.set(mode);
        mode
    }

    fn persist(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        let settings = self.settings();
        if let Err(e) = settings.save_to(path) {
            warn!("Failed to save settings: {:#}", e);
        }
    }

    /// Detach every session from the backend channel
    pub fn shutdown(&self) {
        self.registry.dispose_all();
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("name", &self.config.name)
            .field("sessions", &self.registry.len())
            .finish()
    }
}
