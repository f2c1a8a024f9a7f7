use std::time::Duration;
use crate::utils::ConverterError;
use crate::worker::Stage;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker pool is closed: {0}")]
    Closed(String),

    #[error("{0} task panicked: {1}")]
    Panicked(Stage, String),

    #[error("{0} task timed out after {1:?}")]
    TimedOut(Stage, Duration),

    #[error(transparent)]
    Converter(#[from] ConverterError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<tokio::sync::AcquireError> for WorkerError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        WorkerError::Closed(format!("Failed to acquire worker: {}", err))
    }
}

impl From<WorkerError> for ConverterError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Closed(msg) => ConverterError::cancelled(msg),
            WorkerError::Panicked(stage, msg) => {
                let msg = format!("{stage} task panicked: {msg}");
                match stage {
                    Stage::Decode => ConverterError::corrupt(msg),
                    Stage::Encode => ConverterError::encode(msg),
                    Stage::Archive => ConverterError::archive(msg),
                }
            }
            timed_out @ WorkerError::TimedOut(..) => ConverterError::TimedOut(timed_out.to_string()),
            WorkerError::Converter(e) => e,
        }
    }
}
