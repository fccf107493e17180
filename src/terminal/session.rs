//! Session: one supervised service seen from the UI
//!
//! A session is a stateless conduit. It forwards backend events for its id to
//! its own [`EventBus`] and turns lifecycle calls into command envelopes.
//! Running/stopped state is derived by each observer from the event stream.

use crate::core::config::ServiceConfig;
use crate::protocol::{Command, CommandEnvelope, Event, EventKind, TermSize};
use crate::terminal::backend::{BackendChannel, CommandSink};
use crate::terminal::bus::{EventBus, ListenerId, SubscribeError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Unique identifier for a session (the service id)
pub type SessionId = String;

pub struct Session {
    config: Arc<ServiceConfig>,
    /// Registration order inside the registry
    index: usize,
    bus: Arc<EventBus>,
    sink: Arc<dyn CommandSink>,
    backend: Arc<BackendChannel>,
    /// Route on the backend channel; `None` once disposed
    route: Mutex<Option<ListenerId>>,
}

impl Session {
    /// Create a session and attach it to the backend channel under its id
    pub fn new(
        config: Arc<ServiceConfig>,
        index: usize,
        backend: Arc<BackendChannel>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let route = ListenerId::new();

        let forward = Arc::clone(&bus);
        backend.on(&config.id, route, move |event| forward.emit(event));

        Self {
            config,
            index,
            bus,
            sink,
            backend,
            route: Mutex::new(Some(route)),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Position in registration order
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display_name(&self) -> &str {
        self.config.display_name()
    }

    /// Serialize `command` and hand it to the backend. Never fails.
    pub fn send(&self, command: Command) {
        if self.is_disposed() {
            debug!("Ignoring {:?} for disposed session {}", command, self.id());
            return;
        }

        match CommandEnvelope::new(self.id(), command).to_json() {
            Ok(message) => self.sink.post(message),
            Err(e) => warn!("Failed to encode command for session {}: {}", self.id(), e),
        }
    }

    pub fn start(&self) {
        self.send(Command::StartTerminal);
    }

    pub fn stop(&self) {
        self.send(Command::StopTerminal);
    }

    pub fn input(&self, data: &str) {
        self.send(Command::InputTerminal(data.to_string()));
    }

    pub fn resize(&self, size: TermSize) {
        self.send(Command::ResizeTerminal(size));
    }

    pub fn open_link(&self, uri: &str) {
        self.send(Command::OpenLink(uri.to_string()));
    }

    /// Register `handler` for `kind` under `id`
    pub fn subscribe<F>(&self, id: ListenerId, kind: EventKind, handler: F) -> Result<(), SubscribeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(id, kind, handler)
    }

    pub fn subscribe_once<F>(&self, id: ListenerId, kind: EventKind, handler: F) -> Result<(), SubscribeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe_once(id, kind, handler)
    }

    /// Remove the registration under `id`; unknown ids are a no-op
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Number of listeners currently attached
    pub fn listener_count(&self) -> usize {
        self.bus.len()
    }

    /// Detach from the backend channel and drop every listener. Idempotent.
    pub fn dispose(&self) {
        if let Some(route) = self.route.lock().take() {
            self.backend.off(self.id(), route);
            debug!("Session {} disposed", self.id());
        }
        self.bus.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.route.lock().is_none()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.config.id)
            .field("index", &self.index)
            .field("bus", &self.bus)
            .finish()
    }
}
