use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The value stored for metadata the client did not report.
pub const UNKNOWN: &str = "unknown";

/// The lifecycle state of a session.
///
/// `Ended` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The connection is live.
    Active,
    /// The connection was closed explicitly.
    Ended,
    /// The connection was reaped for inactivity.
    Expired,
}

impl SessionStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// The metadata supplied when a client connects.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// The owning identity.
    pub jid: String,
    /// The device name.
    pub device: Option<String>,
    /// The client platform.
    pub platform: Option<String>,
    /// The remote address.
    pub ip: Option<String>,
    /// The client user agent.
    pub user_agent: Option<String>,
}

impl NewSession {
    /// Creates a `NewSession` for `jid` with no metadata.
    pub fn new(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            ..Default::default()
        }
    }
}

/// Represents one tracked connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The unique identifier of the session.
    pub id: Uuid,
    /// The identity this session belongs to.
    pub jid: String,
    pub device: String,
    pub platform: String,
    pub ip: String,
    pub user_agent: String,
    /// The timestamp when the session was created.
    pub connected_at: DateTime<Utc>,
    /// The timestamp of the last heartbeat.
    pub last_activity: DateTime<Utc>,
    pub status: SessionStatus,
    /// The timestamp of the transition into a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// The session length in milliseconds, set together with `ended_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl SessionRecord {
    /// Creates an active record connected at `now`.
    pub fn new(fields: NewSession, now: DateTime<Utc>) -> Self {
        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            id: Uuid::new_v4(),
            jid: fields.jid,
            device: or_unknown(fields.device),
            platform: or_unknown(fields.platform),
            ip: or_unknown(fields.ip),
            user_agent: or_unknown(fields.user_agent),
            connected_at: now,
            last_activity: now,
            status: SessionStatus::Active,
            ended_at: None,
            duration: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Records a heartbeat. `last_activity` never moves backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Moves an active record into the terminal `status`.
    ///
    /// Returns `false` and leaves the record untouched if it is already
    /// terminal.
    pub fn terminate(&mut self, status: SessionStatus, now: DateTime<Utc>) -> bool {
        if !self.is_active() || !status.is_terminal() {
            return false;
        }

        let duration = (now - self.connected_at).num_milliseconds().max(0);
        self.status = status;
        self.ended_at = Some(now);
        self.duration = Some(duration);
        true
    }
}

/// The durable shape of the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    /// All records, in insertion order.
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    /// The number of records with status `active`.
    #[serde(default)]
    pub active_sessions: u64,
    /// The number of sessions ever created.
    #[serde(default)]
    pub total_connections: u64,
}

impl SessionDocument {
    /// Counts active records directly.
    pub fn count_active(&self) -> u64 {
        self.sessions.iter().filter(|s| s.is_active()).count() as u64
    }

    /// Brings `active_sessions` back in line with the record set.
    pub fn recompute_active(&mut self) {
        self.active_sessions = self.count_active();
    }

    pub fn find_mut(&mut self, id: &Uuid) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }
}

/// Aggregate statistics for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub active_sessions: u64,
    pub total_connections: u64,
    /// Sessions connected on the current local calendar date.
    pub today_connections: u64,
    /// Mean duration of terminal sessions, in milliseconds.
    pub average_duration: u64,
}
