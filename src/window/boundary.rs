//! Top-level failure boundary for the rendering layer
//!
//! A panic (or a fatal error) anywhere under [`ErrorBoundary::guard`] stops
//! the whole interface. Until the user asks for a reload, the boundary only
//! shows its static fallback screen.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

/// What stopped the interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Full diagnostic text
    pub message: String,
    /// Short text meant for the user, shown under the notice
    pub friendly_message: Option<String>,
}

impl Failure {
    /// Failure described by a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self {
            message,
            friendly_message: None,
        }
    }

    fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
            friendly_message: Some(err.to_string()),
        }
    }
}

/// Static recovery screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackScreen {
    pub title: &'static str,
    pub body: &'static str,
    pub detail: Option<String>,
    pub action: &'static str,
}

impl FallbackScreen {
    /// Plain-text rendering, one element per line
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.to_string(), self.body.to_string()];
        if let Some(detail) = &self.detail {
            lines.push(String::new());
            lines.push(detail.clone());
        }
        lines.push(String::new());
        lines.push(format!("[ {} ]", self.action));
        lines
    }
}

#[derive(Debug, Default)]
pub struct ErrorBoundary {
    failure: Option<Failure>,
    reloads: usize,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` unless the boundary has tripped. A panic trips it.
    pub fn guard<R>(&mut self, f: impl FnOnce() -> R) -> Option<R> {
        if self.failure.is_some() {
            return None;
        }
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(payload) => {
                self.trip(Failure::from_panic(payload));
                None
            }
        }
    }

    /// Like [`guard`](Self::guard), but an `Err` trips the boundary as well
    pub fn guard_result<R>(&mut self, f: impl FnOnce() -> anyhow::Result<R>) -> Option<R> {
        match self.guard(f)? {
            Ok(value) => Some(value),
            Err(e) => {
                self.trip(Failure::from_error(&e));
                None
            }
        }
    }

    /// Failure caught outside [`guard`](Self::guard), e.g. in a deferred
    /// callback. The first failure wins until reload.
    pub fn report(&mut self, failure: Failure) {
        if self.failure.is_none() {
            self.trip(failure);
        }
    }

    fn trip(&mut self, failure: Failure) {
        error!("Interface stopped: {}", failure.message);
        self.failure = Some(failure);
    }

    pub fn is_tripped(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Screen replacing the interface while tripped
    pub fn fallback_screen(&self) -> Option<FallbackScreen> {
        self.failure.as_ref().map(|failure| FallbackScreen {
            title: "Uh oh!",
            body: "Something went wrong.",
            detail: failure.friendly_message.clone(),
            action: "Reload",
        })
    }

    /// User-requested reload. Returns whether the interface must be rebuilt.
    pub fn reload(&mut self) -> bool {
        if self.failure.take().is_none() {
            return false;
        }
        self.reloads += 1;
        info!("Reloading interface (reload #{})", self.reloads);
        true
    }

    pub fn reloads(&self) -> usize {
        self.reloads
    }
}
