//! Session service
//!
//! Owns one traversal engine per session id. The map is sharded and locked per
//! entry, so independent sessions proceed concurrently; a submission holds
//! its entry only for the duration of the synchronous state transition.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::engine::{TraversalEngine, TraversalOptions};
use crate::application::registry::CurrentQuestion;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DecisionTree, Programme};

#[derive(Debug)]
struct SessionEntry {
    engine: TraversalEngine,
    last_active: DateTime<Utc>,
}

impl SessionEntry {
    fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// Thread-safe registry of live sessions over one shared decision tree.
pub struct SessionManager {
    tree: Arc<DecisionTree>,
    options: TraversalOptions,
    sessions: DashMap<String, SessionEntry>,
}

impl SessionManager {
    pub fn new(tree: Arc<DecisionTree>) -> Self {
        Self::with_options(tree, TraversalOptions::default())
    }

    pub fn with_options(tree: Arc<DecisionTree>, options: TraversalOptions) -> Self {
        info!("session manager ready, tree depth {}", tree.depth());
        Self {
            tree,
            options,
            sessions: DashMap::new(),
        }
    }

    pub fn tree(&self) -> &Arc<DecisionTree> {
        &self.tree
    }

    /// Create a session on the injected tree.
    pub fn create_session(&self) -> ApplicationResult<String> {
        self.create_session_for(Arc::clone(&self.tree))
    }

    /// Create a session on an explicit tree. Fails if its root is a leaf.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn create_session_for(&self, tree: Arc<DecisionTree>) -> ApplicationResult<String> {
        let engine = TraversalEngine::start(tree, self.options)?;
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                engine,
                last_active: Utc::now(),
            },
        );
        info!("created session {}", session_id);
        Ok(session_id)
    }

    /// Scoped mutable access to a session's engine.
    pub fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut TraversalEngine) -> R,
    ) -> ApplicationResult<R> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| not_found(session_id))?;
        entry.touch();
        Ok(f(&mut entry.engine))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn current_question(&self, session_id: &str) -> ApplicationResult<CurrentQuestion> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| not_found(session_id))?;
        entry.engine.current_question()
    }

    /// Submit an answer token. `Some(programmes)` means the traversal finished
    /// and the session is gone; `None` means more questions follow.
    #[instrument(level = "debug", skip(self))]
    pub fn submit_answer(
        &self,
        session_id: &str,
        token: &str,
    ) -> ApplicationResult<Option<Vec<Programme>>> {
        // the entry guard must be released before removing from the map
        let outcome = self.with_session(session_id, |engine| engine.process_answer(token))??;
        if outcome.is_some() {
            self.sessions.remove(session_id);
            info!("session {} complete, removed", session_id);
        }
        Ok(outcome)
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    /// Remove sessions without activity for longer than `max_idle`.
    /// Returns the number of sessions removed.
    #[instrument(level = "debug", skip(self))]
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            debug!("idle cutoff out of range, nothing to evict");
            return 0;
        };
        let before = self.sessions.len();
        self.sessions.retain(|id, entry| {
            let keep = entry.last_active >= cutoff;
            if !keep {
                debug!("evicting idle session {}", id);
            }
            keep
        });
        before.saturating_sub(self.sessions.len())
    }
}

fn not_found(session_id: &str) -> ApplicationError {
    warn!("session not found: {}", session_id);
    ApplicationError::SessionNotFound(session_id.to_string())
}
