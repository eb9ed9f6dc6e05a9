//! Job lifecycle: start-crawl/poll contract and admin cleanup (spec §6).
//! Grounded in `original_source/main.py`'s `Crawler` `MethodView` (the
//! `POST`/`GET` handlers) and `models.py`'s `JobModel`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::blobstore::BlobStore;
use crate::config::CrawlerConfig;
use crate::crawler;
use crate::error::JobUnknown;
use crate::favicon::FaviconResolver;
use crate::http_client::HttpClient;
use crate::page::{PageNode, PageNodeJson};
use crate::store::{BatchEntry, Job, ResultStore, Strategy};
use crate::task::{BoxedTask, TaskRunner};

/// Result of a poll call (spec §6 "Poll call").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResult {
    pub finished: bool,
    pub new_nodes: Vec<PageNodeJson>,
}

/// Coordinates job creation, polling, and cleanup against the pluggable
/// collaborators. One instance is shared (behind an `Arc`) by every
/// crawl started through it.
pub struct JobManager<C, B, S, T> {
    client: Arc<C>,
    favicons: Arc<FaviconResolver<C, B>>,
    store: Arc<S>,
    tasks: Arc<T>,
    config: CrawlerConfig,
    next_job_id: AtomicU64,
}

impl<C, B, S, T> JobManager<C, B, S, T>
where
    C: HttpClient + 'static,
    B: BlobStore + 'static,
    S: ResultStore + 'static,
    T: TaskRunner + 'static,
{
    pub fn new(
        client: Arc<C>,
        favicons: Arc<FaviconResolver<C, B>>,
        store: Arc<S>,
        tasks: Arc<T>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            client,
            favicons,
            store,
            tasks,
            config,
            next_job_id: AtomicU64::new(0),
        }
    }

    /// Validates and fetches the seed, creates a job record, and schedules
    /// the crawl in the background. Returns `None` if the seed URL cannot
    /// be fetched — no job is created and no batches are written (spec
    /// S1).
    pub async fn start_crawl(
        &self,
        url: &str,
        strategy: Strategy,
        max_depth: u32,
        end_phrase: Option<String>,
    ) -> Option<(PageNode, u64)> {
        let root = crawler::build_seed(url, end_phrase.as_deref(), &*self.client, &*self.favicons)
            .await?;

        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let job = Job {
            id: job_id,
            root_url: root.url.clone(),
            strategy,
            max_depth,
            end_phrase,
            start_time: std::time::SystemTime::now(),
        };

        self.store.create_job(job.clone()).await;

        let client = Arc::clone(&self.client);
        let favicons = Arc::clone(&self.favicons);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let root_for_task = root.clone();

        let task: BoxedTask = Box::pin(async move {
            crawler::run(job, root_for_task, client, favicons, store, config).await;
        });
        self.tasks.spawn(task);

        Some((root, job_id))
    }

    /// Polls for new results, blocking up to `poll_timeout` and checking
    /// every `poll_interval` (spec §6 "Poll call"). Returns `JobUnknown`
    /// if the id is still unrecognized after `job_unknown_grace`.
    pub async fn poll_job(&self, job_id: u64) -> Result<PollResult, JobUnknown> {
        let start = Instant::now();

        if self.store.get_job(job_id).await.is_none() {
            tokio::time::sleep(self.config.job_unknown_grace).await;
            if self.store.get_job(job_id).await.is_none() {
                return Err(JobUnknown(job_id));
            }
        }

        loop {
            let entries = self.store.list_unreturned(job_id).await;
            if !entries.is_empty() {
                let mut finished = false;
                let mut new_nodes = Vec::with_capacity(entries.len());

                for entry in entries {
                    match entry {
                        BatchEntry::Node(node) => new_nodes.push(node.to_json()),
                        BatchEntry::Terminal => finished = true,
                    }
                }

                if finished {
                    self.store.delete_job(job_id).await;
                }

                return Ok(PollResult {
                    finished,
                    new_nodes,
                });
            }

            if start.elapsed() >= self.config.poll_timeout {
                return Ok(PollResult {
                    finished: false,
                    new_nodes: Vec::new(),
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Deletes every job older than `admin_cleanup_age` (spec §6 `GET
    /// /admin/cron/cleanup`).
    pub async fn cleanup_stale_jobs(&self) -> usize {
        let mut deleted = 0;
        for job_id in self.store.all_job_ids().await {
            let Some(job) = self.store.get_job(job_id).await else {
                continue;
            };
            if crate::store::job_age(&job) > self.config.admin_cleanup_age {
                self.store.delete_job(job_id).await;
                deleted += 1;
            }
        }
        deleted
    }
}
