//! Result-store contract (spec §6) and the `Job`/result-batch data model
//! (spec §3). Grounded in `original_source/models.py`.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::page::PageNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Bfs,
    Dfs,
}

/// One crawl. Batches may only be appended until a terminal sentinel
/// appears in some batch; thereafter the job is closed (spec §3).
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub root_url: String,
    pub strategy: Strategy,
    pub max_depth: u32,
    pub end_phrase: Option<String>,
    pub start_time: SystemTime,
}

/// One entry of a result batch: either a produced page node, or the
/// distinguished terminal sentinel marking end-of-stream.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    Node(PageNode),
    Terminal,
}

impl BatchEntry {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEntry::Terminal)
    }
}

/// A stored sub-batch: at most `batch_size` entries, with a `returned`
/// flag the poller flips on read so subsequent polls don't re-deliver it.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    pub entries: Vec<BatchEntry>,
    pub returned: bool,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists a sub-batch (at most `batch_size` entries) as a child of
    /// `job_id`.
    async fn put_batch(&self, job_id: u64, entries: Vec<BatchEntry>);

    /// Returns all unreturned entries across all batches for `job_id`,
    /// flipping `returned` on each batch read. Empty when nothing new.
    async fn list_unreturned(&self, job_id: u64) -> Vec<BatchEntry>;

    /// Returns every stored entry for `job_id`, returned or not — used by
    /// resume to reconstruct working state.
    async fn list_all(&self, job_id: u64) -> Vec<BatchEntry>;

    /// Cascade-deletes all batches for `job_id`.
    async fn delete_job(&self, job_id: u64);

    /// Whether any batch has ever been stored for `job_id` — used by
    /// resume detection (spec §4.5 step 1).
    async fn has_any(&self, job_id: u64) -> bool;

    async fn create_job(&self, job: Job);
    async fn get_job(&self, job_id: u64) -> Option<Job>;
    async fn all_job_ids(&self) -> Vec<u64>;
}

/// Reference in-process implementation: a job table plus, per job, an
/// append-only list of stored batches. Good enough for the demo binary
/// and for exercising the crawl engine in tests without a database.
#[derive(Default)]
pub struct InMemoryResultStore {
    jobs: Mutex<HashMap<u64, Job>>,
    batches: Mutex<HashMap<u64, Vec<StoredBatch>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put_batch(&self, job_id: u64, entries: Vec<BatchEntry>) {
        if entries.is_empty() {
            return;
        }
        self.batches.lock().await.entry(job_id).or_default().push(StoredBatch {
            entries,
            returned: false,
        });
    }

    async fn list_unreturned(&self, job_id: u64) -> Vec<BatchEntry> {
        let mut batches = self.batches.lock().await;
        let Some(job_batches) = batches.get_mut(&job_id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for batch in job_batches.iter_mut() {
            if !batch.returned {
                out.extend(batch.entries.iter().cloned());
                batch.returned = true;
            }
        }
        out
    }

    async fn list_all(&self, job_id: u64) -> Vec<BatchEntry> {
        let batches = self.batches.lock().await;
        batches
            .get(&job_id)
            .map(|bs| bs.iter().flat_map(|b| b.entries.iter().cloned()).collect())
            .unwrap_or_default()
    }

    async fn delete_job(&self, job_id: u64) {
        self.jobs.lock().await.remove(&job_id);
        self.batches.lock().await.remove(&job_id);
    }

    async fn has_any(&self, job_id: u64) -> bool {
        self.batches
            .lock()
            .await
            .get(&job_id)
            .map(|bs| !bs.is_empty())
            .unwrap_or(false)
    }

    async fn create_job(&self, job: Job) {
        self.jobs.lock().await.insert(job.id, job);
    }

    async fn get_job(&self, job_id: u64) -> Option<Job> {
        self.jobs.lock().await.get(&job_id).cloned()
    }

    async fn all_job_ids(&self) -> Vec<u64> {
        self.jobs.lock().await.keys().copied().collect()
    }
}

pub fn job_age(job: &Job) -> Duration {
    job.start_time.elapsed().unwrap_or_default()
}
