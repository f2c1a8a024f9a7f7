mod pool;
mod task;
mod error;

pub use pool::WorkerPool;
pub use task::Stage;
pub use error::{WorkerError, WorkerResult};
