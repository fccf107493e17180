//! Terminal module - sessions and their event plumbing
//!
//! This module provides:
//! - `EventBus`: per-session typed publish/subscribe with id-addressable listeners
//! - `BackendChannel` / `CommandSink`: the inbound and outbound sides of the backend boundary
//! - `Session`: one service's conduit between backend events and UI commands
//! - `SessionRegistry`: the fixed set of sessions built from configuration

pub mod backend;
pub mod bus;
mod registry;
mod session;

pub use backend::{BackendChannel, ChannelSink, CommandSink, RecordingSink};
pub use bus::{EventBus, ListenerId, SubscribeError};
pub use registry::SessionRegistry;
pub use session::{Session, SessionId};
