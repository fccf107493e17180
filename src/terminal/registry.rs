//! Fixed set of sessions built once from configuration

use crate::core::config::Config;
use crate::terminal::backend::{BackendChannel, CommandSink};
use crate::terminal::session::Session;
use std::sync::Arc;
use tracing::info;

/// All sessions of the process, in configuration order.
///
/// Membership never changes after construction; sessions themselves may be
/// started and stopped any number of times.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<Arc<Session>>,
}

impl SessionRegistry {
    /// Create one session per configured service
    pub fn new(config: &Config, backend: &Arc<BackendChannel>, sink: &Arc<dyn CommandSink>) -> Self {
        let sessions = config
            .services
            .iter()
            .enumerate()
            .map(|(index, service)| {
                Arc::new(Session::new(
                    Arc::new(service.clone()),
                    index,
                    Arc::clone(backend),
                    Arc::clone(sink),
                ))
            })
            .collect::<Vec<_>>();

        info!("Registered {} sessions", sessions.len());
        Self { sessions }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Session>> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.sessions.iter()
    }

    pub fn sessions(&self) -> &[Arc<Session>] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Dispose every session (process shutdown)
    pub fn dispose_all(&self) {
        for session in &self.sessions {
            session.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ServiceConfig;
    use crate::terminal::backend::RecordingSink;

    #[test]
    fn test_registry_preserves_order_and_index() {
        let config = Config::new(
            "t",
            vec![
                ServiceConfig::new("a", "x").with_name("Build"),
                ServiceConfig::new("b", "y").with_name("Serve"),
            ],
        )
        .unwrap();
        let backend = Arc::new(BackendChannel::new());
        let sink: Arc<dyn CommandSink> = Arc::new(RecordingSink::new());

        let registry = SessionRegistry::new(&config, &backend, &sink);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("b").map(|s| s.index()), Some(1));
        assert_eq!(registry.get("a").map(|s| s.display_name()), Some("Build"));
        assert!(registry.get("c").is_none());
        assert_eq!(backend.route_count(), 2);

        registry.dispose_all();
        assert_eq!(backend.route_count(), 0);
    }
}
