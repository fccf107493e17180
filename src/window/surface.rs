//! Render surface: one feed bound to one live terminal emulator
//!
//! Lifecycle: `Uninitialized -> Mounted -> Disposed`, with visibility toggled
//! freely while mounted. Every listener the surface installs (session buses,
//! theme, accent mode) is registered under a [`ListenerId`] it generated
//! itself and is removed by id on dispose. Deferred work (start, refit) is
//! cancelled in the same call that disposes the surface.

use super::accent::{Accent, AccentMode};
use super::aggregate::{self, Aggregator, Draw, FeedMode};
use super::boundary::Failure;
use super::deferred::Deferred;
use super::emulator::{TerminalEmulator, Viewport};
use super::theme::{TerminalTheme, ThemeTokens};
use crate::core::events::{AppEvent, EventSender};
use crate::core::observable::Observable;
use crate::protocol::{Event, EventKind};
use crate::terminal::{ListenerId, Session, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Debounce applied to window resize events
pub const DEFAULT_REFIT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What a surface renders
#[derive(Debug, Clone)]
pub enum Feed {
    /// One session, raw output, interactive
    Single(Arc<Session>),
    /// Several sessions merged with source labels, read-only
    Aggregated(Vec<Arc<Session>>),
}

impl Feed {
    pub fn mode(&self) -> FeedMode {
        match self {
            Feed::Single(_) => FeedMode::Single,
            Feed::Aggregated(_) => FeedMode::Aggregated,
        }
    }

    fn sessions(&self) -> Vec<Arc<Session>> {
        match self {
            Feed::Single(session) => vec![Arc::clone(session)],
            Feed::Aggregated(sessions) => sessions.clone(),
        }
    }
}

/// App-wide values every surface follows
#[derive(Debug, Clone)]
pub struct Appearance {
    pub theme: Arc<Observable<ThemeTokens>>,
    pub accent_mode: Arc<Observable<AccentMode>>,
}

impl Appearance {
    pub fn new(tokens: ThemeTokens, mode: AccentMode) -> Self {
        Self {
            theme: Arc::new(Observable::new(tokens)),
            accent_mode: Arc::new(Observable::new(mode)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    /// Settle time between the readiness signal and the `start` command
    pub start_delay: Duration,
    pub refit_debounce: Duration,
    /// Start every bound session once ready
    pub autostart: bool,
    /// Where panics in deferred callbacks are reported
    pub failures: Option<EventSender>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            start_delay: Duration::ZERO,
            refit_debounce: DEFAULT_REFIT_DEBOUNCE,
            autostart: true,
            failures: None,
        }
    }
}

/// Run a deferred callback; a panic goes to `failures` instead of dying
/// silently inside the runtime
fn run_reporting(failures: Option<EventSender>, callback: impl FnOnce()) {
    let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) else {
        return;
    };
    let failure = Failure::from_panic(payload);
    error!("Deferred surface callback panicked: {}", failure.message);
    if let Some(events) = failures {
        events.send(AppEvent::Failed(failure));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    Uninitialized,
    Mounted,
    Disposed,
}

struct SurfaceInner {
    mode: FeedMode,
    sessions: Vec<Arc<Session>>,
    emulator: Box<dyn TerminalEmulator>,
    appearance: Appearance,
    options: SurfaceOptions,

    phase: SurfacePhase,
    ready: bool,
    visible: bool,
    running: bool,

    tokens: ThemeTokens,
    accent_mode: AccentMode,
    accents: HashMap<SessionId, Accent>,
    aggregator: Aggregator,

    /// (session position, listener) pairs installed on session buses
    listeners: Vec<(usize, ListenerId)>,
    theme_listener: Option<ListenerId>,
    mode_listener: Option<ListenerId>,

    viewport: Option<Viewport>,
    /// A fit was requested while hidden
    fit_pending: bool,
    start: Deferred,
    refit: Deferred,
}

impl SurfaceInner {
    fn input_enabled(&self) -> bool {
        self.mode == FeedMode::Single && !self.running
    }

    fn session(&self, id: &str) -> Option<&Arc<Session>> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    fn accent_for(&mut self, id: &str) -> Accent {
        if let Some(accent) = self.accents.get(id) {
            return *accent;
        }
        let index = self.session(id).map(|s| s.index()).unwrap_or_default();
        let accent = Accent::compute(self.accent_mode, index, &self.tokens);
        self.accents.insert(id.to_string(), accent);
        accent
    }

    fn draw(&mut self, draws: Vec<Draw>) {
        for draw in draws {
            match draw {
                Draw::Text(text) => self.emulator.write(&text),
                Draw::Line(text) => self.emulator.writeln(&text),
            }
        }
    }

    fn on_event(&mut self, source: &str, event: &Event) {
        if self.phase != SurfacePhase::Mounted {
            return;
        }

        match self.mode {
            FeedMode::Single => {
                let accent = self.accent_for(source);
                let rendered = aggregate::render_single(event, accent);
                self.draw(rendered.draws);
                if let Some(running) = rendered.running {
                    self.running = running;
                    self.emulator.set_input_enabled(!running);
                }
            }
            FeedMode::Aggregated => {
                let Some(item) = self.aggregator.accept(source, event) else {
                    return;
                };
                let name = self
                    .session(source)
                    .map(|s| s.display_name().to_string())
                    .unwrap_or_else(|| source.to_string());
                let accent = self.accent_for(source);
                self.draw(aggregate::render_item(&item, &name, accent));
            }
        }
    }

    fn on_theme(&mut self, tokens: &ThemeTokens) {
        if self.phase != SurfacePhase::Mounted {
            return;
        }
        self.tokens = tokens.clone();
        self.emulator.set_theme(&TerminalTheme::from_tokens(tokens));
        self.accents.clear();
    }

    fn on_accent_mode(&mut self, mode: AccentMode) {
        if self.phase != SurfacePhase::Mounted {
            return;
        }
        self.accent_mode = mode;
        self.accents.clear();
    }

    /// Fit now if visible, otherwise remember to fit on the next reveal
    fn fit(&mut self) {
        if self.phase != SurfacePhase::Mounted {
            return;
        }
        if !self.visible {
            self.fit_pending = true;
            return;
        }
        self.fit_pending = false;

        let Some(viewport) = self.viewport else {
            return;
        };
        if let Some(size) = self.emulator.fit(viewport) {
            debug!("Surface fitted to {}x{}", size.cols, size.rows);
            if self.mode == FeedMode::Single {
                for session in &self.sessions {
                    session.resize(size);
                }
            }
        }
    }

    fn start_sessions(&mut self) {
        if self.phase != SurfacePhase::Mounted {
            return;
        }
        self.start.disarm();
        for session in &self.sessions {
            session.start();
        }
    }

    fn refit_elapsed(&mut self) {
        self.refit.disarm();
        self.fit();
    }
}

/// One terminal emulator bound to a single-session or aggregated feed
pub struct RenderSurface {
    inner: Arc<Mutex<SurfaceInner>>,
}

impl RenderSurface {
    pub fn new(
        feed: Feed,
        emulator: Box<dyn TerminalEmulator>,
        appearance: &Appearance,
        options: SurfaceOptions,
    ) -> Self {
        let tokens = appearance.theme.get();
        let accent_mode = appearance.accent_mode.get();
        Self {
            inner: Arc::new(Mutex::new(SurfaceInner {
                mode: feed.mode(),
                sessions: feed.sessions(),
                emulator,
                appearance: appearance.clone(),
                options,
                phase: SurfacePhase::Uninitialized,
                ready: false,
                visible: false,
                running: false,
                tokens,
                accent_mode,
                accents: HashMap::new(),
                aggregator: Aggregator::new(),
                listeners: Vec::new(),
                theme_listener: None,
                mode_listener: None,
                viewport: None,
                fit_pending: false,
                start: Deferred::idle(),
                refit: Deferred::idle(),
            })),
        }
    }

    /// Open the emulator and attach to every bound session.
    ///
    /// Issues no command; see [`RenderSurface::mark_ready`].
    pub fn mount(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        if inner.phase != SurfacePhase::Uninitialized {
            warn!("Ignoring mount of a surface in phase {:?}", inner.phase);
            return;
        }

        let theme = TerminalTheme::from_tokens(&inner.tokens);
        inner.emulator.open();
        inner.emulator.set_theme(&theme);
        let interactive = inner.mode == FeedMode::Single;
        inner.emulator.set_input_enabled(interactive);
        inner.emulator.set_cursor_blink(interactive);

        let mut listeners = Vec::with_capacity(inner.sessions.len() * EventKind::ALL.len());
        for (position, session) in inner.sessions.iter().enumerate() {
            for kind in EventKind::ALL {
                let id = ListenerId::new();
                let handler = event_handler(weak.clone(), session.id().to_string());
                match session.subscribe(id, kind, handler) {
                    Ok(()) => listeners.push((position, id)),
                    Err(e) => warn!("Failed to attach surface to {}: {}", session.id(), e),
                }
            }
        }
        inner.listeners = listeners;

        let theme_listener = ListenerId::new();
        let w = weak.clone();
        inner.appearance.theme.subscribe(theme_listener, move |tokens| {
            if let Some(inner) = w.upgrade() {
                inner.lock().on_theme(tokens);
            }
        });
        inner.theme_listener = Some(theme_listener);

        let mode_listener = ListenerId::new();
        inner.appearance.accent_mode.subscribe(mode_listener, move |mode| {
            if let Some(inner) = weak.upgrade() {
                inner.lock().on_accent_mode(*mode);
            }
        });
        inner.mode_listener = Some(mode_listener);

        inner.phase = SurfacePhase::Mounted;
        debug!(
            "Mounted {:?} surface over {} session(s)",
            inner.mode,
            inner.sessions.len()
        );
    }

    /// Readiness signal: the emulator is attached and laid out in `viewport`.
    ///
    /// Fits once and schedules `start` for every bound session after the
    /// configured settle delay. Only the first signal counts.
    pub fn mark_ready(&self, viewport: Option<Viewport>) {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted || inner.ready {
            return;
        }
        inner.ready = true;
        if viewport.is_some() {
            inner.viewport = viewport;
        }
        inner.fit();

        if inner.options.autostart {
            let delay = inner.options.start_delay;
            let failures = inner.options.failures.clone();
            inner.start = Deferred::schedule(delay, move || {
                run_reporting(failures, || {
                    if let Some(inner) = weak.upgrade() {
                        inner.lock().start_sessions();
                    }
                })
            });
        }
    }

    /// Visibility change; becoming visible fits immediately
    pub fn set_visible(&self, visible: bool) {
        let mut inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted || inner.visible == visible {
            return;
        }
        inner.visible = visible;
        if visible {
            inner.refit.cancel();
            inner.fit();
        }
    }

    /// Window resize; the fit runs once resizing settles
    pub fn on_window_resize(&self, viewport: Viewport) {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted {
            return;
        }
        inner.viewport = Some(viewport);
        let debounce = inner.options.refit_debounce;
        inner.refit.cancel();
        let failures = inner.options.failures.clone();
        inner.refit = Deferred::schedule(debounce, move || {
            run_reporting(failures, || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().refit_elapsed();
                }
            })
        });
    }

    /// Keyboard or paste input. Returns whether it was forwarded.
    pub fn handle_input(&self, data: &str) -> bool {
        let inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted || !inner.input_enabled() {
            return false;
        }
        for session in &inner.sessions {
            session.input(data);
        }
        true
    }

    /// Start/stop button of a single-session surface
    pub fn toggle_running(&self) {
        let inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted {
            return;
        }
        if inner.mode != FeedMode::Single {
            debug!("Start/stop toggle ignored on an aggregated surface");
            return;
        }
        for session in &inner.sessions {
            if inner.running {
                session.stop();
            } else {
                session.start();
            }
        }
    }

    /// A link in the output was activated
    pub fn open_link(&self, uri: &str) {
        let inner = self.inner.lock();
        if inner.phase != SurfacePhase::Mounted {
            return;
        }
        if let Some(session) = inner.sessions.first() {
            session.open_link(uri);
        }
    }

    /// Detach everything and release the emulator. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        if inner.phase == SurfacePhase::Disposed {
            return;
        }

        inner.start.cancel();
        inner.refit.cancel();

        for (position, id) in std::mem::take(&mut inner.listeners) {
            if let Some(session) = inner.sessions.get(position) {
                session.unsubscribe(id);
            }
        }
        if let Some(id) = inner.theme_listener.take() {
            inner.appearance.theme.unsubscribe(id);
        }
        if let Some(id) = inner.mode_listener.take() {
            inner.appearance.accent_mode.unsubscribe(id);
        }

        if inner.phase == SurfacePhase::Mounted {
            inner.emulator.dispose();
        }
        inner.accents.clear();
        inner.aggregator.reset();
        inner.running = false;
        inner.visible = false;
        inner.phase = SurfacePhase::Disposed;
        debug!("Disposed {:?} surface", inner.mode);
    }

    pub fn phase(&self) -> SurfacePhase {
        self.inner.lock().phase
    }

    pub fn mode(&self) -> FeedMode {
        self.inner.lock().mode
    }

    /// A managed process is driving output (single-session surfaces only)
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn input_enabled(&self) -> bool {
        self.inner.lock().input_enabled()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.lock().visible
    }

    /// Whether the scheduled `start` has not fired yet
    pub fn start_pending(&self) -> bool {
        self.inner.lock().start.is_pending()
    }

    /// Ids of the bound sessions, in feed order
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.inner.lock().sessions.iter().map(|s| s.id().to_string()).collect()
    }

    /// Cached accent for `id`, if one was computed since the last reset
    pub fn cached_accent(&self, id: &str) -> Option<Accent> {
        self.inner.lock().accents.get(id).copied()
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RenderSurface")
            .field("mode", &inner.mode)
            .field("phase", &inner.phase)
            .field("visible", &inner.visible)
            .field("running", &inner.running)
            .finish()
    }
}

fn event_handler(weak: Weak<Mutex<SurfaceInner>>, source: SessionId) -> impl Fn(&Event) + Send + Sync + 'static {
    move |event| {
        if let Some(inner) = weak.upgrade() {
            inner.lock().on_event(&source, event);
        }
    }
}
