use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::utils::ConverterResult;
use crate::worker::{Stage, WorkerError, WorkerResult};

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded pool for blocking decode/encode/archive jobs.
///
/// Jobs run on tokio's blocking threads; the semaphore caps how many pixel
/// buffers are in flight at once. A job that outlives the timeout is abandoned:
/// the caller gets `TimedOut`, the job keeps its permit until it returns, and
/// whatever it produces is dropped.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    active_workers: Arc<AtomicUsize>,
    worker_count: usize,
    timeout: Duration,
}

/// Decrements the active counter however the job ends.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    pub fn new(worker_count: Option<usize>, timeout: Option<Duration>) -> Self {
        let worker_count = worker_count.unwrap_or(DEFAULT_WORKERS).max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(worker_count)),
            active_workers: Arc::new(AtomicUsize::new(0)),
            worker_count,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    pub async fn run<T, F>(&self, stage: Stage, subject: &str, job: F) -> WorkerResult<T>
    where
        F: FnOnce() -> ConverterResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.map_err(|e| {
            warn!("Failed to acquire worker for {} of '{}': {}", stage, subject, e);
            WorkerError::from(e)
        })?;

        let current = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        let active = ActiveGuard(Arc::clone(&self.active_workers));
        debug!(
            "{} started - Active: {}/{}, Subject: {}",
            stage, current, self.worker_count, subject
        );

        // The permit and the active count belong to the blocking job, so an
        // abandoned job keeps its slot until it really ends.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _active = active;
            job()
        });

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                warn!("{} of '{}' timed out after {:?}", stage, subject, self.timeout);
                Err(WorkerError::TimedOut(stage, self.timeout))
            }
            Ok(Err(join_err)) => Err(WorkerError::Panicked(stage, join_err.to_string())),
            Ok(Ok(result)) => result.map_err(WorkerError::from),
        }
    }

    /// Rejects queued and future jobs. Jobs already running finish on their own.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ConverterError;

    #[tokio::test]
    async fn test_runs_job() {
        let pool = WorkerPool::default();
        let value = pool.run(Stage::Encode, "sum", || Ok(2 + 2)).await.unwrap();
        assert_eq!(value, 4);
        assert_eq!(pool.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_job_error_passes_through() {
        let pool = WorkerPool::default();
        let err = pool
            .run(Stage::Decode, "bad", || Err::<(), _>(ConverterError::corrupt("bad row")))
            .await
            .unwrap_err();
        assert!(matches!(
            ConverterError::from(err),
            ConverterError::CorruptImage(msg) if msg == "bad row"
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let pool = WorkerPool::new(Some(1), Some(Duration::from_millis(20)));
        let err = pool
            .run(Stage::Encode, "slow", || {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::TimedOut(Stage::Encode, _)));
        assert!(matches!(ConverterError::from(err), ConverterError::TimedOut(_)));

        // The abandoned job still counts until it returns.
        assert_eq!(pool.active_workers(), 1);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(pool.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_jobs_keep_their_slot() {
        let pool = WorkerPool::new(Some(1), Some(Duration::from_millis(10)));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let err = pool
                .run(Stage::Decode, "slow", move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(150));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap_err();
            assert!(matches!(err, WorkerError::TimedOut(Stage::Decode, _)));
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_maps_to_stage_error() {
        let pool = WorkerPool::default();
        let err = pool
            .run(Stage::Archive, "boom", || -> ConverterResult<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(ConverterError::from(err), ConverterError::Archive(_)));
    }

    #[tokio::test]
    async fn test_closed_pool_cancels() {
        let pool = WorkerPool::default();
        pool.close();
        assert!(pool.is_closed());
        let err = pool.run(Stage::Decode, "late", || Ok(())).await.unwrap_err();
        assert!(matches!(ConverterError::from(err), ConverterError::Cancelled(_)));
    }
}
