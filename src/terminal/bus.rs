//! Per-session event bus with id-addressable listeners
//!
//! Listeners are registered under a [`ListenerId`] chosen by the registering
//! party, so the same logical handler can be attached and detached repeatedly
//! without relying on closure identity.

use crate::protocol::{Event, EventKind};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Opaque handle for one listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared listener callback
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscribeError {
    /// The id is still registered; the earlier registration is kept
    #[error("listener {0} is already registered")]
    DuplicateListener(ListenerId),
}

struct Entry {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
    once: bool,
}

/// Typed publish/subscribe channel for one session.
///
/// Dispatch snapshots the matching handlers before calling them, so handlers
/// may subscribe or unsubscribe (themselves included) while being invoked.
#[derive(Default)]
pub struct EventBus {
    entries: Mutex<Vec<Entry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind` under `id`.
    ///
    /// A second registration with an id that is still live is rejected.
    pub fn subscribe<F>(&self, id: ListenerId, kind: EventKind, handler: F) -> Result<(), SubscribeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert(id, kind, Arc::new(handler), false)
    }

    /// Register a handler that is removed right before its first delivery
    pub fn subscribe_once<F>(&self, id: ListenerId, kind: EventKind, handler: F) -> Result<(), SubscribeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.insert(id, kind, Arc::new(handler), true)
    }

    fn insert(&self, id: ListenerId, kind: EventKind, handler: Handler, once: bool) -> Result<(), SubscribeError> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.id == id) {
            warn!("Rejected duplicate listener registration {} for {}", id, kind);
            return Err(SubscribeError::DuplicateListener(id));
        }
        entries.push(Entry {
            id,
            kind,
            handler,
            once,
        });
        Ok(())
    }

    /// Remove the registration under `id`. Returns whether one existed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Deliver `event` to every listener of its kind, in registration order
    pub fn emit(&self, event: &Event) {
        let kind = event.kind();
        let handlers: Vec<Handler> = {
            let mut entries = self.entries.lock();
            let matching = entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| Arc::clone(&e.handler))
                .collect();
            entries.retain(|e| !(e.once && e.kind == kind));
            matching
        };

        for handler in handlers {
            handler(event);
        }
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is currently registered
    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.lock().iter().any(|e| e.id == id)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.len()).finish()
    }
}
