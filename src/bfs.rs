//! Breadth-first strategy (spec §4.7): bounded concurrent fetch with a
//! per-depth barrier and a pending-futures cap. Grounded in
//! `original_source/crawler.py`'s `BredthFirstCrawl`, with the thread
//! pool + `futures.wait` idiom replaced by a Tokio `JoinSet` (pattern
//! from `agentdrive-gg/src/crawl.rs`).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::blobstore::BlobStore;
use crate::config::CrawlerConfig;
use crate::favicon::FaviconResolver;
use crate::http_client::HttpClient;
use crate::idgen::IdGenerator;
use crate::page::{try_make_page_node, PageNode};
use crate::skip_on_none;

/// One completed fetch result. The decision to extend the frontier is
/// made from the fetched `PageNode`'s own `depth` field, never from how
/// many frontier levels the driver has processed so far — a resumed
/// frontier can start above depth 0, so a submission-time counter would
/// drift from the real depth (spec §4.7, testable property #2).
struct Completed {
    node: Option<PageNode>,
}

/// Runs the BFS producer to completion, sending each successfully fetched
/// node down `tx` as soon as it completes. Concurrency is capped at
/// `config.num_workers` in-flight fetches at any time (spec §4.7/§5:
/// "a fixed-size worker pool").
#[allow(clippy::too_many_arguments)]
pub async fn run<C: HttpClient + 'static, B: BlobStore + 'static>(
    client: Arc<C>,
    favicons: Arc<FaviconResolver<C, B>>,
    id_gen: Arc<IdGenerator>,
    max_depth: u32,
    end_phrase: Option<String>,
    initial_frontier: Vec<PageNode>,
    config: CrawlerConfig,
    tx: mpsc::Sender<PageNode>,
) {
    let workers = Arc::new(tokio::sync::Semaphore::new(config.num_workers));
    let mut current_nodes = initial_frontier;

    while !current_nodes.is_empty() {
        let mut pending: JoinSet<Completed> = JoinSet::new();
        let mut next_nodes = Vec::new();

        for current_node in &current_nodes {
            let links = current_node.links.clone().unwrap_or_default();

            for link in links {
                spawn_fetch(
                    &mut pending,
                    link,
                    current_node.clone(),
                    Arc::clone(&client),
                    Arc::clone(&favicons),
                    Arc::clone(&id_gen),
                    Arc::clone(&workers),
                    end_phrase.clone(),
                );

                if pending.len() > config.pending_future_limit
                    && !drain_until_under_limit(
                        &mut pending,
                        config.pending_future_limit,
                        config.bfs_wait_timeout,
                        config.bfs_backoff_sleep,
                        &tx,
                        max_depth,
                        &mut next_nodes,
                    )
                    .await
                {
                    return;
                }
            }
        }

        // drain whatever is left at this depth before advancing
        while let Some(res) = pending.join_next().await {
            let Ok(completed) = res else { continue };
            let node = skip_on_none!(completed.node);
            let phrase_found = node.phrase_found;
            if tx.send(node.clone()).await.is_err() {
                return;
            }
            if phrase_found {
                return;
            }
            if node.depth < max_depth {
                next_nodes.push(node);
            }
        }

        current_nodes = next_nodes;
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_fetch<C: HttpClient + 'static, B: BlobStore + 'static>(
    pending: &mut JoinSet<Completed>,
    link: String,
    parent: PageNode,
    client: Arc<C>,
    favicons: Arc<FaviconResolver<C, B>>,
    id_gen: Arc<IdGenerator>,
    workers: Arc<tokio::sync::Semaphore>,
    end_phrase: Option<String>,
) {
    pending.spawn(async move {
        // Held for the duration of the fetch so genuine in-flight
        // concurrency never exceeds the worker-pool size, even though
        // `pending_future_limit` (checked below, after spawning) is a much
        // looser soft cap on queued-but-not-yet-drained tasks.
        let _permit = workers.acquire().await;
        let node = try_make_page_node(
            &link,
            Some(&parent),
            &id_gen,
            end_phrase.as_deref(),
            &*client,
            &*favicons,
        )
        .await;
        Completed { node }
    });
}

/// Waits up to 250 ms per attempt for a completion, sleeping 500 ms on a
/// timeout, until `pending` shrinks to the cap. Returns `false` if the
/// crawl should stop entirely (phrase found or the driver hung up).
async fn drain_until_under_limit(
    pending: &mut JoinSet<Completed>,
    limit: usize,
    wait_timeout: std::time::Duration,
    backoff_sleep: std::time::Duration,
    tx: &mpsc::Sender<PageNode>,
    max_depth: u32,
    next_nodes: &mut Vec<PageNode>,
) -> bool {
    while pending.len() > limit {
        match tokio::time::timeout(wait_timeout, pending.join_next()).await {
            Ok(Some(Ok(completed))) => {
                let node = skip_on_none!(completed.node);
                let phrase_found = node.phrase_found;
                if tx.send(node.clone()).await.is_err() {
                    return false;
                }
                if phrase_found {
                    return false;
                }
                if node.depth < max_depth {
                    next_nodes.push(node);
                }
            }
            Ok(Some(Err(_join_error))) => continue,
            Ok(None) => break,
            Err(_elapsed) => tokio::time::sleep(backoff_sleep).await,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::stub::InMemoryBlobStore;
    use crate::http_client::stub::StubHttpClient;

    fn root_node(links: Vec<&str>) -> PageNode {
        PageNode {
            id: 0,
            url: "http://seed.test/".into(),
            parent: None,
            depth: 0,
            links: Some(links.into_iter().map(String::from).collect()),
            phrase_found: false,
            favicon: None,
        }
    }

    async fn favicon_resolver() -> Arc<FaviconResolver<StubHttpClient, InMemoryBlobStore>> {
        Arc::new(
            FaviconResolver::load(
                Arc::new(StubHttpClient::new()),
                Arc::new(InMemoryBlobStore::new()),
                5,
                3,
                "/favicons/",
            )
            .await,
        )
    }

    #[tokio::test]
    async fn emits_both_depth_one_children() {
        let client = Arc::new(StubHttpClient::new());
        client.set_page("http://a.test/", 200, "leaf a").await;
        client.set_page("http://b.test/", 200, "leaf b").await;

        let favicons = favicon_resolver().await;
        let id_gen = Arc::new(IdGenerator::new(0));
        let (tx, mut rx) = mpsc::channel(16);

        run(
            Arc::clone(&client),
            favicons,
            id_gen,
            1,
            None,
            vec![root_node(vec!["http://a.test/", "http://b.test/"])],
            CrawlerConfig::default(),
            tx,
        )
        .await;

        let mut urls = Vec::new();
        while let Some(n) = rx.recv().await {
            urls.push(n.url);
        }
        urls.sort();
        assert_eq!(urls, vec!["http://a.test/", "http://b.test/"]);
    }

    #[tokio::test]
    async fn stops_extending_frontier_past_max_depth() {
        let client = Arc::new(StubHttpClient::new());
        client
            .set_page("http://a.test/", 200, "<a href=\"http://a.test/deep\">x</a>")
            .await;
        client.set_page("http://a.test/deep", 200, "leaf").await;

        let favicons = favicon_resolver().await;
        let id_gen = Arc::new(IdGenerator::new(0));
        let (tx, mut rx) = mpsc::channel(16);

        run(
            Arc::clone(&client),
            favicons,
            id_gen,
            1,
            None,
            vec![root_node(vec!["http://a.test/"])],
            CrawlerConfig::default(),
            tx,
        )
        .await;

        let mut emitted = Vec::new();
        while let Some(n) = rx.recv().await {
            emitted.push(n);
        }
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].depth, 1);
    }

    #[tokio::test]
    async fn resumed_frontier_above_depth_zero_still_respects_max_depth() {
        // A frontier reconstructed from a resume can start at any depth, not
        // just 0 (e.g. a crash after depth 2 with max_depth 3). The decision
        // to keep expanding must follow the fetched nodes' real depth rather
        // than a driver-relative counter.
        let client = Arc::new(StubHttpClient::new());
        client
            .set_page("http://a.test/child", 200, "<a href=\"http://a.test/grandchild\">x</a>")
            .await;
        client.set_page("http://a.test/grandchild", 200, "leaf").await;

        let favicons = favicon_resolver().await;
        let id_gen = Arc::new(IdGenerator::new(10));
        let (tx, mut rx) = mpsc::channel(16);

        let mut frontier = root_node(vec!["http://a.test/child"]);
        frontier.depth = 2;

        run(
            Arc::clone(&client),
            favicons,
            id_gen,
            3,
            None,
            vec![frontier],
            CrawlerConfig::default(),
            tx,
        )
        .await;

        let mut emitted = Vec::new();
        while let Some(n) = rx.recv().await {
            emitted.push(n);
        }

        assert!(emitted.iter().all(|n| n.depth <= 3), "no node may exceed max_depth: {emitted:?}");
        assert!(
            !emitted.iter().any(|n| n.url == "http://a.test/grandchild"),
            "grandchild sits at depth 4 and must not be fetched"
        );
    }
}
