//! Project id → session map

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info};

use super::session::ProjectSession;
use crate::config::Config;
use crate::domain::ProjectRecord;

/// Explicit registry of per-project sessions
///
/// Sessions are created on first use and torn down by `close`.
#[derive(Debug)]
pub struct ProjectRegistry {
    config: Config,
    sessions: HashMap<String, ProjectSession>,
}

impl ProjectRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Session for a project, created with `record` as baseline if missing
    pub fn get_or_create(&mut self, project_id: &str, record: &ProjectRecord, now: Instant) -> &mut ProjectSession {
        let config = &self.config;
        self.sessions.entry(project_id.to_string()).or_insert_with(|| {
            info!(%project_id, "ProjectRegistry: opening session");
            ProjectSession::new(project_id, record.clone(), config, now)
        })
    }

    pub fn get(&self, project_id: &str) -> Option<&ProjectSession> {
        self.sessions.get(project_id)
    }

    pub fn get_mut(&mut self, project_id: &str) -> Option<&mut ProjectSession> {
        self.sessions.get_mut(project_id)
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut ProjectSession> {
        self.sessions.values_mut()
    }

    /// Remove a session; false when none existed
    pub fn close(&mut self, project_id: &str) -> bool {
        debug!(%project_id, "ProjectRegistry::close: called");
        let removed = self.sessions.remove(project_id).is_some();
        if removed {
            info!(%project_id, "ProjectRegistry: session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Earliest timer deadline across all sessions
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions.values().filter_map(ProjectSession::next_deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Chapter;

    #[test]
    fn test_sessions_are_isolated_and_closable() {
        let mut registry = ProjectRegistry::new(Config::default());
        let now = Instant::now();
        let a = ProjectRecord::new().with_current_chapter(Chapter::Budget);
        let b = ProjectRecord::new().with_current_chapter(Chapter::Rooms);

        registry.get_or_create("a", &a, now);
        registry.get_or_create("b", &b, now);
        // Existing sessions keep their baseline
        registry.get_or_create("a", &b, now);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").unwrap().snapshot().current_chapter, Some(Chapter::Budget));
        assert!(registry.next_deadline().is_some());

        assert!(registry.close("a"));
        assert!(!registry.close("a"));
        assert!(registry.get("a").is_none());
        assert_eq!(registry.len(), 1);
    }
}
