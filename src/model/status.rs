/// Scan session lifecycle states
///
/// A session moves `pending -> in_progress -> {completed, failed}`. A pending
/// session that cannot start may also go straight to `failed`. Terminal
/// states never change again.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle state of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Session created, no network activity yet
    Pending,

    /// Orchestrator owns the session and is crawling
    InProgress,

    /// Crawl finished (frontier exhausted or a limit tripped)
    Completed,

    /// Crawl aborted by an unrecoverable error
    Failed,
}

impl ScanStatus {
    /// Returns true for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Failed)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_statuses() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
