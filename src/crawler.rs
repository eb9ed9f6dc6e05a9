//! The crawler base/driver (spec §4.5): resume detection, the lazy
//! producer loop, and the output pipeline's batching/flush policy.
//! Grounded in `original_source/crawler.py`'s `Crawler.__call__`.

use std::sync::Arc;
use std::time::Instant;

use crate::blobstore::BlobStore;
use crate::config::CrawlerConfig;
use crate::favicon::FaviconResolver;
use crate::http_client::HttpClient;
use crate::idgen::IdGenerator;
use crate::page::{make_seed_node, PageNode};
use crate::resume::{self, Unfinished};
use crate::store::{BatchEntry, Job, ResultStore, Strategy};
use crate::strategy;

/// Runs one job to completion: resumes if there is prior state, otherwise
/// starts fresh from `root`, and always flushes a terminal sentinel on
/// the way out (spec §4.8: "never abort without finalizing").
pub async fn run<C, B, S>(
    job: Job,
    root: PageNode,
    client: Arc<C>,
    favicons: Arc<FaviconResolver<C, B>>,
    store: Arc<S>,
    config: CrawlerConfig,
) where
    C: HttpClient + 'static,
    B: BlobStore + 'static,
    S: ResultStore + 'static,
{
    let id_gen = Arc::new(IdGenerator::new(0));

    let mut start_nodes = if store.has_any(job.id).await {
        let stored = store.list_all(job.id).await;
        match strategy::unfinished(job.strategy, stored, job.max_depth) {
            Unfinished::Done => return,
            Unfinished::Nodes(nodes) => {
                id_gen.seed_after(resume::max_id(&nodes));
                nodes
            }
        }
    } else {
        id_gen.seed_after(root.id);
        vec![root]
    };

    // A backend that only persists the `{id,parent,url,favicon,depth,
    // phrase_found}` wire form loses `links` on resume; reload any such
    // node before handing it to the strategy (spec §9 "Rehydration").
    for node in start_nodes.iter_mut() {
        if node.needs_links() {
            if node.load(&*client, &*favicons).await.is_err() {
                node.links = Some(Vec::new());
            }
        }
    }

    match job.strategy {
        Strategy::Dfs => {
            // A resumed DFS can reconstruct more than one node of the
            // partial path, which `strategy::produce`'s single-root
            // signature can't express (spec §4.6: "all stored nodes"
            // become the pre-existing partial path a backtrack walks
            // through), so the full path is driven directly through
            // `dfs::run`, mirroring the BFS branch below.
            let (tx, rx) = tokio::sync::mpsc::channel(config.batch_size);
            let current_id = start_nodes.iter().map(|n| n.id).max().unwrap();
            let path = resume::index_by_id(&start_nodes);
            let max_depth = job.max_depth;
            let end_phrase = job.end_phrase.clone();

            tokio::spawn(async move {
                crate::dfs::run(
                    path,
                    current_id,
                    max_depth,
                    end_phrase.as_deref(),
                    &*client,
                    &*favicons,
                    &id_gen,
                    tx,
                )
                .await;
            });

            drive(&job, rx, store, config).await;
        }
        Strategy::Bfs => {
            // BFS may resume with several frontier survivors at once, which
            // `strategy::produce`'s single-root signature can't express, so
            // the frontier is driven directly through `bfs::run`.
            let (tx, rx) = tokio::sync::mpsc::channel(config.batch_size);
            let max_depth = job.max_depth;
            let end_phrase = job.end_phrase.clone();
            let cfg = config.clone();

            tokio::spawn(async move {
                crate::bfs::run(
                    client,
                    favicons,
                    id_gen,
                    max_depth,
                    end_phrase,
                    start_nodes,
                    cfg,
                    tx,
                )
                .await;
            });

            drive(&job, rx, store, config).await;
        }
    }
}

/// The output pipeline itself: buffer, periodic stable-sorted flush,
/// finalization with the terminal sentinel (spec §4.5 steps 3-5).
async fn drive<S: ResultStore>(
    job: &Job,
    mut rx: tokio::sync::mpsc::Receiver<PageNode>,
    store: Arc<S>,
    config: CrawlerConfig,
) {
    let mut buffer: Vec<PageNode> = Vec::new();
    let mut timer_start = Instant::now();

    loop {
        let remaining = config.flush_interval.saturating_sub(timer_start.elapsed());

        tokio::select! {
            node = rx.recv() => {
                match node {
                    Some(node) => buffer.push(node),
                    None => break,
                }
            }
            _ = tokio::time::sleep(remaining) => {}
        }

        if timer_start.elapsed() >= config.flush_interval {
            flush(job.id, &mut buffer, &store, config.batch_size, false).await;
            timer_start = Instant::now();
        }
    }

    flush(job.id, &mut buffer, &store, config.batch_size, true).await;
}

async fn flush<S: ResultStore>(
    job_id: u64,
    buffer: &mut Vec<PageNode>,
    store: &Arc<S>,
    batch_size: usize,
    terminal: bool,
) {
    buffer.sort_by_key(|n| (n.parent, n.id));

    let mut entries: Vec<BatchEntry> = buffer.drain(..).map(BatchEntry::Node).collect();
    if terminal {
        entries.push(BatchEntry::Terminal);
    } else if entries.is_empty() {
        return;
    }

    for chunk in entries.chunks(batch_size) {
        store.put_batch(job_id, chunk.to_vec()).await;
    }
}

/// Fetches and wraps a raw seed URL into a page node with id `0` (spec
/// §4.5 step 2, §4.2). Used by `job.rs` when starting a fresh crawl.
pub async fn build_seed<C: HttpClient, B: BlobStore>(
    url: &str,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
) -> Option<PageNode> {
    make_seed_node(url, end_phrase, client, favicons).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::stub::InMemoryBlobStore;
    use crate::http_client::stub::StubHttpClient;
    use crate::store::InMemoryResultStore;
    use std::time::SystemTime;

    fn job(id: u64, strategy: Strategy, max_depth: u32) -> Job {
        Job {
            id,
            root_url: "http://seed.test/".into(),
            strategy,
            max_depth,
            end_phrase: None,
            start_time: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn bfs_job_emits_seed_and_children_then_sentinel() {
        let client = Arc::new(StubHttpClient::new());
        client
            .set_page("http://seed.test/", 200, "<a href=\"http://a.test/\">a</a>")
            .await;
        client.set_page("http://a.test/", 200, "leaf").await;

        let favicons = Arc::new(
            FaviconResolver::load(
                Arc::clone(&client),
                Arc::new(InMemoryBlobStore::new()),
                5,
                3,
                "/favicons/",
            )
            .await,
        );

        let seed = build_seed("http://seed.test/", None, &*client, &*favicons)
            .await
            .unwrap();

        let store = Arc::new(InMemoryResultStore::new());
        let the_job = job(1, Strategy::Bfs, 1);
        store.create_job(the_job.clone()).await;

        let mut config = CrawlerConfig::default();
        config.flush_interval = std::time::Duration::from_millis(10);

        run(the_job, seed, client, favicons, Arc::clone(&store), config).await;

        let all = store.list_all(1).await;
        assert!(all.last().unwrap().is_terminal());

        let urls: Vec<String> = all
            .iter()
            .filter_map(|e| match e {
                BatchEntry::Node(n) => Some(n.url.clone()),
                BatchEntry::Terminal => None,
            })
            .collect();
        assert!(urls.contains(&"http://seed.test/".to_string()));
        assert!(urls.contains(&"http://a.test/".to_string()));
    }

    #[tokio::test]
    async fn dfs_job_reaches_terminal_sentinel() {
        let client = Arc::new(StubHttpClient::new());
        client
            .set_page("http://seed.test/", 200, "<a href=\"http://a.test/\">a</a>")
            .await;
        client.set_page("http://a.test/", 200, "leaf").await;

        let favicons = Arc::new(
            FaviconResolver::load(
                Arc::clone(&client),
                Arc::new(InMemoryBlobStore::new()),
                5,
                3,
                "/favicons/",
            )
            .await,
        );

        let seed = build_seed("http://seed.test/", None, &*client, &*favicons)
            .await
            .unwrap();

        let store = Arc::new(InMemoryResultStore::new());
        let the_job = job(2, Strategy::Dfs, 2);
        store.create_job(the_job.clone()).await;

        let mut config = CrawlerConfig::default();
        config.flush_interval = std::time::Duration::from_millis(10);

        run(the_job, seed, client, favicons, Arc::clone(&store), config).await;

        let all = store.list_all(2).await;
        assert!(all.last().unwrap().is_terminal());
    }
}
