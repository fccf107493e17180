//! Backend boundary: the global inbound channel and the outbound command sink
//!
//! Inbound envelopes arrive keyed by session id and are routed to whoever
//! subscribed for that id (normally exactly one [`Session`](super::Session)).
//! Outbound commands leave through a [`CommandSink`] as serialized JSON.

use crate::protocol::Event;
use crate::terminal::bus::ListenerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receiver of serialized outbound command envelopes.
///
/// Posting is fire-and-forget: implementations swallow and log their own
/// failures.
pub trait CommandSink: Send + Sync {
    fn post(&self, message: String);
}

/// Sink forwarding messages into a tokio channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl CommandSink for ChannelSink {
    fn post(&self, message: String) {
        if let Err(e) = self.tx.send(message) {
            warn!("Backend channel closed, dropping command: {}", e.0);
        }
    }
}

type RouteHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Global inbound channel keyed by session id
#[derive(Default)]
pub struct BackendChannel {
    routes: Mutex<HashMap<String, Vec<(ListenerId, RouteHandler)>>>,
}

impl BackendChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events for session `id` to `handler`
    pub fn on<F>(&self, id: &str, listener: ListenerId, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .entry(id.to_string())
            .or_default()
            .push((listener, Arc::new(handler)));
    }

    /// Remove a route. Unknown ids are ignored.
    pub fn off(&self, id: &str, listener: ListenerId) -> bool {
        let mut routes = self.routes.lock();
        let Some(handlers) = routes.get_mut(id) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(l, _)| *l != listener);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            routes.remove(id);
        }
        removed
    }

    /// Deliver a decoded event. Events for unknown ids are a no-op.
    pub fn deliver(&self, id: &str, event: &Event) {
        let handlers: Vec<RouteHandler> = match self.routes.lock().get(id) {
            Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => {
                debug!("Dropping {} event for unknown session {:?}", event.kind(), id);
                return;
            }
        };

        for handler in handlers {
            handler(event);
        }
    }

    /// Decode an inbound envelope and deliver it; malformed envelopes are dropped
    pub fn deliver_json(&self, id: &str, raw: &str) {
        match Event::from_json(raw) {
            Ok(event) => self.deliver(id, &event),
            Err(e) => debug!("Dropping inbound envelope for {:?}: {}", id, e),
        }
    }

    /// Number of session ids with at least one route
    pub fn route_count(&self) -> usize {
        self.routes.lock().len()
    }
}

impl std::fmt::Debug for BackendChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendChannel")
            .field("routes", &self.route_count())
            .finish()
    }
}

/// Sink that keeps every posted message, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages posted so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Decoded envelopes posted so far (undecodable ones are skipped)
    pub fn envelopes(&self) -> Vec<crate::protocol::CommandEnvelope> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| crate::protocol::CommandEnvelope::from_json(m).ok())
            .collect()
    }
}

impl CommandSink for RecordingSink {
    fn post(&self, message: String) {
        self.messages.lock().push(message);
    }
}
