//! Wire format for UI ↔ backend communication.
//!
//! Two envelopes cross the backend boundary:
//! - Outbound commands (UI → backend): `{ "id": ..., "event": { "name": ..., "payload"?: ... } }`
//! - Inbound events (backend → UI), delivered per session id:
//!   `{ "type": "output" | "running" | "stopped" | "error", "data"?: ... }`
//!
//! Only `serde` + `serde_json` are used here so the backend side can share it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session id used for commands that target the window rather than a service
pub const WINDOW_ID: &str = "";

/// Errors raised while decoding an envelope
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ── Inbound events ─────────────────────────────────────────────────

/// Event emitted by the backend for one session.
///
/// Serialized as the inbound envelope: `output` and `error` always carry
/// `data`, `running` and `stopped` carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    /// Text written by the process
    Output(String),
    /// Process is up
    Running,
    /// Process exited
    Stopped,
    /// Backend failure for this session
    Error(String),
}

/// Variant tag of an [`Event`], used as a subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Output,
    Running,
    Stopped,
    Error,
}

impl EventKind {
    /// Every kind, in the order surfaces install their listeners
    pub const ALL: [EventKind; 4] = [
        EventKind::Output,
        EventKind::Stopped,
        EventKind::Running,
        EventKind::Error,
    ];
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Output(_) => EventKind::Output,
            Event::Running => EventKind::Running,
            Event::Stopped => EventKind::Stopped,
            Event::Error(_) => EventKind::Error,
        }
    }

    /// Text carried by `output` and `error`
    pub fn data(&self) -> Option<&str> {
        match self {
            Event::Output(text) | Event::Error(text) => Some(text),
            Event::Running | Event::Stopped => None,
        }
    }

    /// Encode as an inbound envelope
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode an inbound envelope
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Output => write!(f, "output"),
            EventKind::Running => write!(f, "running"),
            EventKind::Stopped => write!(f, "stopped"),
            EventKind::Error => write!(f, "error"),
        }
    }
}

// ── Outbound commands ──────────────────────────────────────────────

/// Terminal grid size reported by a fit computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Command sent from the UI to the backend.
///
/// Serialized as the `event` member of a [`CommandEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "snake_case")]
pub enum Command {
    StartTerminal,
    StopTerminal,
    /// Raw keystroke or paste text
    InputTerminal(String),
    ResizeTerminal(TermSize),
    /// URI the user activated
    OpenLink(String),
    CloseWindow,
    MinimizeWindow,
    MaximizeWindow,
}

impl Command {
    /// Whether this command targets the window instead of a session
    pub fn is_window_command(&self) -> bool {
        matches!(
            self,
            Command::CloseWindow | Command::MinimizeWindow | Command::MaximizeWindow
        )
    }
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Session id, or [`WINDOW_ID`] for window-level commands
    pub id: String,
    pub event: Command,
}

impl CommandEnvelope {
    pub fn new(id: impl Into<String>, event: Command) -> Self {
        Self {
            id: id.into(),
            event,
        }
    }

    /// Envelope for a window-level command
    pub fn window(event: Command) -> Self {
        Self::new(WINDOW_ID, event)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(envelope: &CommandEnvelope) -> Value {
        serde_json::from_str(&envelope.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_start_command_has_no_payload() {
        let envelope = CommandEnvelope::new("0", Command::StartTerminal);
        assert_eq!(
            as_value(&envelope),
            json!({ "id": "0", "event": { "name": "start_terminal" } })
        );
    }

    #[test]
    fn test_resize_command_payload() {
        let envelope = CommandEnvelope::new("api", Command::ResizeTerminal(TermSize::new(120, 40)));
        assert_eq!(
            as_value(&envelope),
            json!({
                "id": "api",
                "event": { "name": "resize_terminal", "payload": { "cols": 120, "rows": 40 } }
            })
        );
    }

    #[test]
    fn test_input_and_link_payloads_are_strings() {
        let input = CommandEnvelope::new("a", Command::InputTerminal("ls\r".to_string()));
        assert_eq!(as_value(&input)["event"]["payload"], json!("ls\r"));

        let link = CommandEnvelope::new("a", Command::OpenLink("https://example.com".to_string()));
        assert_eq!(as_value(&link)["event"]["name"], json!("open_link"));
    }

    #[test]
    fn test_window_commands_use_empty_id() {
        let envelope = CommandEnvelope::window(Command::MinimizeWindow);
        assert!(envelope.event.is_window_command());
        assert_eq!(
            as_value(&envelope),
            json!({ "id": "", "event": { "name": "minimize_window" } })
        );
    }

    #[test]
    fn test_parse_command_from_frontend_shape() {
        let raw = r#"{"id":"1","event":{"name":"input_terminal","payload":"q"}}"#;
        let envelope = CommandEnvelope::from_json(raw).unwrap();
        assert_eq!(envelope.id, "1");
        assert_eq!(envelope.event, Command::InputTerminal("q".to_string()));
    }

    #[test]
    fn test_inbound_envelopes() {
        assert_eq!(
            Event::from_json(r#"{"type":"output","data":"hi\n"}"#).unwrap(),
            Event::Output("hi\n".to_string())
        );
        assert_eq!(Event::from_json(r#"{"type":"running"}"#).unwrap(), Event::Running);
        assert_eq!(Event::from_json(r#"{"type":"stopped"}"#).unwrap(), Event::Stopped);
        assert_eq!(
            Event::from_json(r#"{"type":"error","data":"boom"}"#).unwrap(),
            Event::Error("boom".to_string())
        );
    }

    #[test]
    fn test_malformed_inbound_envelopes() {
        assert!(Event::from_json("not json").is_err());
        assert!(Event::from_json(r#"{"type":"exploded"}"#).is_err());
        // output without data is not a valid envelope
        assert!(Event::from_json(r#"{"type":"output"}"#).is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let value: Value = serde_json::from_str(&Event::Stopped.to_json()).unwrap();
        assert_eq!(value, json!({ "type": "stopped" }));
        let value: Value = serde_json::from_str(&Event::Error("x".into()).to_json()).unwrap();
        assert_eq!(value, json!({ "type": "error", "data": "x" }));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(Event::Output(String::new()).kind(), EventKind::Output);
        assert_eq!(Event::Running.data(), None);
        assert_eq!(Event::Error("e".into()).data(), Some("e"));
        assert_eq!(EventKind::Stopped.to_string(), "stopped");
    }
}
