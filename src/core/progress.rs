use serde::{Deserialize, Serialize};
use crate::core::RecordId;

/// Progress message type
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Start,
    Progress,
    Complete,
    Error,
}

/// Batch ingestion progress, emitted once per finished file plus start/complete
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub progress_type: ProgressType,
    /// Files finished so far, successful or not
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// Progress percentage (0-100)
    pub progress_percentage: usize,
    pub status: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub record_id: Option<RecordId>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Progress {
    pub fn new(
        progress_type: ProgressType,
        completed_tasks: usize,
        total_tasks: usize,
        status: &str,
    ) -> Self {
        let progress_percentage = if total_tasks > 0 {
            (completed_tasks * 100) / total_tasks
        } else {
            0
        };

        Self {
            progress_type,
            completed_tasks,
            total_tasks,
            progress_percentage,
            status: status.to_string(),
            file_name: None,
            record_id: None,
            error: None,
        }
    }

    pub fn with_file(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    pub fn with_record(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
