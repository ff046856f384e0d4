use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Family of background work guarded by a persisted processing flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFamily {
    /// Catalog metadata ingestion.
    Metadata,
    /// Album asset downloads.
    Albums,
}

impl JobFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobFamily::Metadata => "metadata",
            JobFamily::Albums => "albums",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "metadata" => Some(JobFamily::Metadata),
            "albums" => Some(JobFamily::Albums),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted processing flags, one per job family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFlags {
    pub metadata_processing: bool,
    pub albums_processing: bool,
}

impl JobFlags {
    pub fn is_set(&self, family: JobFamily) -> bool {
        match family {
            JobFamily::Metadata => self.metadata_processing,
            JobFamily::Albums => self.albums_processing,
        }
    }

    pub fn set(&mut self, family: JobFamily, value: bool) {
        match family {
            JobFamily::Metadata => self.metadata_processing = value,
            JobFamily::Albums => self.albums_processing = value,
        }
    }

    pub fn any_set(&self) -> bool {
        self.metadata_processing || self.albums_processing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRunStatus {
    Running,
    Completed,
    Failed,
}

impl JobRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRunStatus::Running => "running",
            JobRunStatus::Completed => "completed",
            JobRunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(JobRunStatus::Running),
            "completed" => Some(JobRunStatus::Completed),
            "failed" => Some(JobRunStatus::Failed),
            _ => None,
        }
    }
}

/// One execution of a background job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub id: i64,
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobRunStatus,
    pub error_message: Option<String>,
    /// Free-form description of what triggered the run, e.g. "query:miles davis".
    pub triggered_by: String,
    /// JSON summary written when the run finishes.
    pub summary: Option<serde_json::Value>,
}
