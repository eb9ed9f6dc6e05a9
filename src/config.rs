use std::time::Duration;

/// Tunable constants for the crawl engine. Defaults are the spec's literal
/// values; only `max_depth`/`end_phrase`/`strategy` are exposed as CLI
/// flags (see `cli.rs`) — the rest mirror the original's hard-coded class
/// constants (`NUM_WORKERS`, `PENDING_FUTURE_LIMIT`, etc).
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// BFS concurrent fetch worker budget.
    pub num_workers: usize,
    /// Soft cap on in-flight BFS fetches before the driver waits.
    pub pending_future_limit: usize,
    /// How often the output pipeline flushes its buffer.
    pub flush_interval: Duration,
    /// Maximum entries per stored result sub-batch.
    pub batch_size: usize,
    /// Favicon cache: write-through to blob storage after this many new entries.
    pub favicon_checkpoint_interval: u32,
    /// Cap on recursive favicon-link-in-404-body extraction.
    pub favicon_recursion_cap: u8,
    /// Per-fetch HTTP deadline.
    pub fetch_timeout: Duration,
    /// Poll interval while waiting for new batches or BFS completions.
    pub poll_interval: Duration,
    /// Maximum time a single poll call blocks for new results.
    pub poll_timeout: Duration,
    /// Grace period before treating an unknown job id as truly unknown.
    pub job_unknown_grace: Duration,
    /// Age at which `cleanup_stale_jobs` deletes a job.
    pub admin_cleanup_age: Duration,
    /// Wait this long for any in-flight BFS fetch before falling back to a sleep.
    pub bfs_wait_timeout: Duration,
    /// Sleep this long when no in-flight BFS fetch completed within `bfs_wait_timeout`.
    pub bfs_backoff_sleep: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            num_workers: 10,
            pending_future_limit: 20,
            flush_interval: Duration::from_millis(1500),
            batch_size: 50,
            favicon_checkpoint_interval: 5,
            favicon_recursion_cap: 3,
            fetch_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(20),
            job_unknown_grace: Duration::from_secs(1),
            admin_cleanup_age: Duration::from_secs(4 * 60 * 60),
            bfs_wait_timeout: Duration::from_millis(250),
            bfs_backoff_sleep: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = CrawlerConfig::default();
        assert_eq!(cfg.num_workers, 10);
        assert_eq!(cfg.pending_future_limit, 20);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.flush_interval, Duration::from_millis(1500));
    }
}
