use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::{LoadStatus, Reader, Result};

pub const DEFAULT_WORKERS: usize = 10;

/// Loads page 1 of many sources at once, bounded by a semaphore. Pages of
/// one source are never loaded concurrently: each task owns one source.
pub struct ParallelLoader {
    semaphore: Arc<Semaphore>,
}

impl Default for ParallelLoader {
    fn default() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }
}

impl ParallelLoader {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn load_all(
        &self,
        reader: Arc<Reader>,
        source_ids: Vec<String>,
    ) -> Vec<(String, Result<LoadStatus>)> {
        let mut handles = Vec::new();

        for source_id in source_ids {
            let reader = reader.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = reader.load(&source_id, true).await;
                (source_id, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}
