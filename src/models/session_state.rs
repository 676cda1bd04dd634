use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    /// A run is in flight and a new `start` would be ignored.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Stopping)
    }

    /// Binary indicator shown by the dashboard.
    pub fn indicator(&self) -> &'static str {
        if self.is_active() { "Active" } else { "Stopped" }
    }
}

/// How the last run ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionOutcome {
    /// The catalog ran out of pages.
    Completed,
    /// `stop()` was called.
    Cancelled,
    /// The retry budget was spent.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub indicator: String,
    pub run_id: Option<Uuid>,
    pub target_url: Option<String>,
    pub profile: Option<String>,
    pub item_count: usize,
    pub attempts: u32,
    pub outcome: Option<SessionOutcome>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
