//! Service container for dependency injection
//!
//! Wires up settings, the provided tree and the session manager.

use std::sync::Arc;

use crate::application::{SessionManager, TraversalOptions};
use crate::config::Settings;
use crate::infrastructure::provider::{JsonTreeFile, TreeProvider};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
///
/// Built once by the entry point and handed to request handlers by reference.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Sessions over the shared decision tree
    pub sessions: Arc<SessionManager>,
}

impl ServiceContainer {
    /// Create a container reading the tree configured in `settings`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let provider = JsonTreeFile::new(settings.tree_path.clone());
        Self::with_provider(settings, &provider)
    }

    /// Create a container with a custom tree provider (for testing).
    pub fn with_provider(settings: Settings, provider: &dyn TreeProvider) -> InfraResult<Self> {
        let tree = Arc::new(provider.provide()?);
        let options = TraversalOptions {
            offer_probably: settings.session.offer_probably,
        };
        let sessions = Arc::new(SessionManager::with_options(tree, options));
        Ok(Self {
            settings: Arc::new(settings),
            sessions,
        })
    }

    /// Evict sessions idle beyond the configured timeout.
    ///
    /// A timeout beyond chrono's range is clamped, so nothing is evicted.
    pub fn evict_idle_sessions(&self) -> usize {
        let timeout = self
            .settings
            .session
            .idle_timeout()
            .unwrap_or(chrono::Duration::MAX);
        self.sessions.evict_idle(timeout)
    }
}
