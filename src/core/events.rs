//! Application event definitions

use crate::protocol::Command;
use crate::terminal::SessionId;
use crate::window::boundary::Failure;
use crate::window::keys::ShellAction;
use tokio::sync::mpsc;

/// Events delivered to the main loop from the backend side and OS signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Serialized inbound event envelope for a session
    Backend { id: SessionId, payload: String },

    /// Window-level command (close/minimize/maximize)
    Window(Command),

    /// Key binding or input from the controlling terminal
    Action(ShellAction),

    /// The controlling terminal changed size
    Resized,

    /// A deferred interface callback panicked
    Failed(Failure),

    /// The user asked to rebuild the interface after a failure
    Reload,

    /// Leave the main loop
    Quit,
}

/// Cloneable handle for posting [`AppEvent`]s into the main loop.
///
/// Sending never fails from the caller's point of view: once the loop is gone
/// events are dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Channel pair for a new main loop
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: AppEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Post an inbound envelope for session `id`
    pub fn backend(&self, id: &str, payload: String) -> bool {
        self.send(AppEvent::Backend {
            id: id.to_string(),
            payload,
        })
    }
}
