//! runz
//!
//! Supervise several long-running services through individually labeled
//! terminal views and one combined, chronologically merged log view.
//!
//! # Layout
//! - [`protocol`]: command and event envelopes exchanged with the backend
//! - [`terminal`]: per-session event buses, sessions and the session registry
//! - [`window`]: render surfaces, aggregation, theming and the error boundary
//! - [`core`]: configuration, preferences and the application context
//! - [`pty`]: PTY supervisor serving the backend side of the protocol

pub mod core;
pub mod protocol;
pub mod pty;
pub mod terminal;
pub mod window;

pub use crate::core::config::{Config, ConfigError, ConfigSource, ServiceConfig};
pub use crate::core::context::AppContext;
pub use crate::core::events::{AppEvent, EventSender};
pub use crate::core::settings::Settings;
pub use protocol::{Command, CommandEnvelope, Event, EventKind, TermSize};
pub use terminal::{Session, SessionId, SessionRegistry};
