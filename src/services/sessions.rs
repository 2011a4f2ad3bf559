use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::Result,
    models::session::{NewSession, SessionDocument, SessionRecord, SessionStats, SessionStatus},
    repositories::session::SessionRepository,
};

/// Owns every session record and the aggregates derived from them.
///
/// Each mutating call reloads the durable document, applies its change,
/// recomputes `activeSessions` and writes the whole document back. Calls
/// within this process are serialized; writers in other processes need an
/// external lock.
pub struct SessionStore {
    repo: SessionRepository,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Creates a new `SessionStore`.
    ///
    /// # Arguments
    ///
    /// * `repo` - The durable document.
    /// * `clock` - The time source for all timestamps.
    pub fn new(repo: SessionRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Runs `apply` against the latest snapshot.
    ///
    /// `apply` returns its output and whether it changed the document; the
    /// document is only written back when it did.
    async fn transact<T, F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&mut SessionDocument, DateTime<Utc>) -> (T, bool),
    {
        let _guard = self.write_lock.lock().await;

        let mut document = self.repo.load().await?;
        let now = self.clock.now();
        let (output, changed) = apply(&mut document, now);

        if changed {
            document.recompute_active();
            self.repo.save(&document).await?;
        }

        Ok(output)
    }

    /// Registers a new active session.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `SessionRecord`.
    pub async fn create_session(&self, fields: NewSession) -> Result<SessionRecord> {
        let session = self
            .transact(|document, now| {
                let session = SessionRecord::new(fields, now);
                document.sessions.push(session.clone());
                document.total_connections += 1;
                (session, true)
            })
            .await?;

        tracing::info!("Session {} created for {}", session.id, session.jid);
        Ok(session)
    }

    /// Records a heartbeat. Unknown or terminal sessions are ignored.
    pub async fn update_activity(&self, id: &Uuid) -> Result<()> {
        let touched = self
            .transact(|document, now| match document.find_mut(id) {
                Some(session) if session.is_active() => {
                    session.touch(now);
                    (true, true)
                }
                _ => (false, false),
            })
            .await?;

        if !touched {
            tracing::debug!("Ignoring activity for inactive session {}", id);
        }
        Ok(())
    }

    /// Ends an active session.
    ///
    /// # Returns
    ///
    /// `true` if the session transitioned, `false` if it was unknown or
    /// already terminal.
    pub async fn end_session(&self, id: &Uuid) -> Result<bool> {
        let ended = self
            .transact(|document, now| {
                let ended = document
                    .find_mut(id)
                    .is_some_and(|session| session.terminate(SessionStatus::Ended, now));
                (ended, ended)
            })
            .await?;

        if ended {
            tracing::info!("Session {} ended", id);
        } else {
            tracing::debug!("Session {} already terminal or unknown", id);
        }
        Ok(ended)
    }

    /// Ends every active session of `jid`.
    pub async fn end_user_sessions(&self, jid: &str) -> Result<usize> {
        let count = self
            .transact(|document, now| {
                let count = document
                    .sessions
                    .iter_mut()
                    .filter(|s| s.jid == jid)
                    .map(|s| s.terminate(SessionStatus::Ended, now))
                    .filter(|&ended| ended)
                    .count();
                (count, count > 0)
            })
            .await?;

        if count > 0 {
            tracing::info!("Ended {} sessions for {}", count, jid);
        }
        Ok(count)
    }

    /// Finds a session by its ID.
    pub async fn get_session(&self, id: &Uuid) -> Result<Option<SessionRecord>> {
        let document = self.repo.load().await?;
        Ok(document.sessions.into_iter().find(|s| &s.id == id))
    }

    /// Returns all active sessions in insertion order.
    pub async fn get_active_sessions(&self) -> Result<Vec<SessionRecord>> {
        let document = self.repo.load().await?;
        Ok(document.sessions.into_iter().filter(|s| s.is_active()).collect())
    }

    /// Returns every session of `jid`, whatever its status.
    pub async fn get_user_sessions(&self, jid: &str) -> Result<Vec<SessionRecord>> {
        let document = self.repo.load().await?;
        Ok(document.sessions.into_iter().filter(|s| s.jid == jid).collect())
    }

    /// Computes aggregate statistics.
    pub async fn get_session_stats(&self) -> Result<SessionStats> {
        let document = self.repo.load().await?;
        let today = self.clock.now().with_timezone(&Local).date_naive();

        let today_connections = document
            .sessions
            .iter()
            .filter(|s| s.connected_at.with_timezone(&Local).date_naive() == today)
            .count() as u64;

        let durations: Vec<i64> = document
            .sessions
            .iter()
            .filter(|s| s.status.is_terminal())
            .filter_map(|s| s.duration)
            .collect();

        let average_duration = if durations.is_empty() {
            0
        } else {
            let total: i64 = durations.iter().sum();
            (total as f64 / durations.len() as f64).round() as u64
        };

        Ok(SessionStats {
            active_sessions: document.active_sessions,
            total_connections: document.total_connections,
            today_connections,
            average_duration,
        })
    }

    /// Expires active sessions idle for longer than `max_age_hours`.
    ///
    /// # Returns
    ///
    /// The number of sessions reaped.
    pub async fn cleanup_expired_sessions(&self, max_age_hours: u64) -> Result<usize> {
        let max_age = i64::try_from(max_age_hours)
            .ok()
            .and_then(Duration::try_hours);

        let count = self
            .transact(|document, now| {
                let cutoff = max_age
                    .and_then(|age| now.checked_sub_signed(age))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                let count = document
                    .sessions
                    .iter_mut()
                    .filter(|s| s.is_active() && s.last_activity < cutoff)
                    .map(|s| s.terminate(SessionStatus::Expired, now))
                    .filter(|&expired| expired)
                    .count();
                (count, count > 0)
            })
            .await?;

        if count > 0 {
            tracing::info!("Expired {} idle sessions", count);
        }
        Ok(count)
    }
}
