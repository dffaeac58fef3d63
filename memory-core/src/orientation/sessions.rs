//! Session history: a repository-backed store with a filesystem fallback
//! for when the sessions table is empty.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One recorded assistant session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    /// Absent on sessions recovered from the filesystem fallback, which
    /// only carries `{id, title, created_at, updated_at}`.
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence contract for session history.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Most recent `limit` sessions, newest-first. Empty when the store
    /// has never recorded a session, triggering the filesystem fallback.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>>;
    async fn insert(&self, session: Session) -> Result<()>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl InMemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn list_recent(&self, limit: usize) -> Result<Vec<Session>> {
        let mut sessions = self.sessions.read().await.clone();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn insert(&self, session: Session) -> Result<()> {
        self.sessions.write().await.push(session);
        Ok(())
    }
}

/// The subset of a session JSON file the filesystem fallback parses.
#[derive(Debug, Deserialize)]
struct SessionFile {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Reads `<home>/.cortex/sessions/*.json`, sorted by file mtime desc, and
/// parses each as a [`Session`]. Unreadable/unparseable files
/// are skipped rather than failing the whole read, matching the
/// non-fatal degradation the rest of `WakeUp` follows.
pub fn read_filesystem_sessions(limit: usize) -> Vec<Session> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    read_filesystem_sessions_from(&home.join(".cortex").join("sessions"), limit)
}

fn read_filesystem_sessions_from(dir: &std::path::Path, limit: usize) -> Vec<Session> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("json"))
        .filter_map(|e| e.metadata().ok().and_then(|m| m.modified().ok()).map(|mtime| (e.path(), mtime)))
        .collect();
    files.sort_by(|a, b| b.1.cmp(&a.1));

    files
        .into_iter()
        .take(limit)
        .filter_map(|(path, _)| {
            let contents = std::fs::read_to_string(path).ok()?;
            let parsed: SessionFile = serde_json::from_str(&contents).ok()?;
            Some(Session {
                id: parsed.id,
                title: parsed.title,
                goal: None,
                in_progress: false,
                created_at: parsed.created_at,
                updated_at: parsed.updated_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn in_memory_repo_sorts_newest_first() {
        let repo = InMemorySessionRepository::new();
        let older = Session {
            id: "s1".into(),
            title: "older".into(),
            goal: None,
            in_progress: false,
            created_at: Utc::now(),
            updated_at: Utc::now() - chrono::Duration::hours(2),
        };
        let newer = Session {
            id: "s2".into(),
            title: "newer".into(),
            goal: None,
            in_progress: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        repo.insert(older).await.unwrap();
        repo.insert(newer).await.unwrap();

        let recent = repo.list_recent(10).await.unwrap();
        assert_eq!(recent[0].id, "s2");
        assert_eq!(recent[1].id, "s1");
    }

    #[test]
    fn filesystem_fallback_parses_and_sorts_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let older_path = dir.path().join("a.json");
        let newer_path = dir.path().join("b.json");

        let mut older = std::fs::File::create(&older_path).unwrap();
        write!(
            older,
            r#"{{"id":"sess_a","title":"first","created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}}"#
        )
        .unwrap();
        drop(older);

        std::thread::sleep(std::time::Duration::from_millis(10));

        let mut newer = std::fs::File::create(&newer_path).unwrap();
        write!(
            newer,
            r#"{{"id":"sess_b","title":"second","created_at":"2026-01-02T00:00:00Z","updated_at":"2026-01-02T00:00:00Z"}}"#
        )
        .unwrap();
        drop(newer);

        let sessions = read_filesystem_sessions_from(dir.path(), 10);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "sess_b");
        assert_eq!(sessions[1].id, "sess_a");
    }

    #[test]
    fn filesystem_fallback_on_missing_dir_returns_empty() {
        let sessions = read_filesystem_sessions_from(std::path::Path::new("/nonexistent/path/xyz"), 10);
        assert!(sessions.is_empty());
    }
}
