// Job Status Domain Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::DomainError;

/// Lifecycle state of a posting, assigned by the user in the master file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    New,
    Interested,
    Applied,
    Interviewing,
    Interviewed,
    Accepted,
    Rejected,
    Archive,
    Delete,
    Old,
    Unknown,
}

impl JobStatus {
    /// Statuses that mean "never show me this posting again".
    ///
    /// This is the only place the removable set is defined; the filter
    /// pipeline and the reconciler both go through it.
    pub fn is_removable(self) -> bool {
        matches!(
            self,
            JobStatus::Archive | JobStatus::Rejected | JobStatus::Delete | JobStatus::Old
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::New => "NEW",
            JobStatus::Interested => "INTERESTED",
            JobStatus::Applied => "APPLIED",
            JobStatus::Interviewing => "INTERVIEWING",
            JobStatus::Interviewed => "INTERVIEWED",
            JobStatus::Accepted => "ACCEPTED",
            JobStatus::Rejected => "REJECTED",
            JobStatus::Archive => "ARCHIVE",
            JobStatus::Delete => "DELETE",
            JobStatus::Old => "OLD",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    /// Case-insensitive, since the master file is edited by hand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => JobStatus::New,
            "INTERESTED" => JobStatus::Interested,
            "APPLIED" => JobStatus::Applied,
            "INTERVIEWING" => JobStatus::Interviewing,
            "INTERVIEWED" => JobStatus::Interviewed,
            "ACCEPTED" => JobStatus::Accepted,
            "REJECTED" => JobStatus::Rejected,
            "ARCHIVE" | "ARCHIVED" => JobStatus::Archive,
            "DELETE" | "DELETED" => JobStatus::Delete,
            "OLD" => JobStatus::Old,
            "UNKNOWN" => JobStatus::Unknown,
            _ => return Err(DomainError::UnknownStatus(s.to_string())),
        };
        Ok(status)
    }
}
