//! Core module - configuration, preferences, shared context and events

pub mod config;
pub mod context;
pub mod events;
pub mod observable;
pub mod settings;
