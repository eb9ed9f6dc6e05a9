//! Polymorphic strategy boundary (spec §9 "Polymorphic strategies"): DFS
//! and BFS share the driver loop in `crawler.rs` through two operations,
//! `produce` and `unfinished`, modeled here as plain functions over the
//! `Strategy` enum rather than a trait object — neither traversal needs
//! virtual dispatch once the driver has decided which one it's running.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::blobstore::BlobStore;
use crate::config::CrawlerConfig;
use crate::favicon::FaviconResolver;
use crate::http_client::HttpClient;
use crate::idgen::IdGenerator;
use crate::page::PageNode;
use crate::resume::{self, Unfinished};
use crate::store::{BatchEntry, Strategy};
use crate::{bfs, dfs};

/// The lazy producer-to-driver boundary (spec §9): a bounded channel the
/// driver reads from until the producer task finishes and drops its
/// sender, at which point `recv()` starts returning `None`.
pub fn produce<C: HttpClient + 'static, B: BlobStore + 'static>(
    strategy: Strategy,
    root: PageNode,
    max_depth: u32,
    end_phrase: Option<String>,
    client: Arc<C>,
    favicons: Arc<FaviconResolver<C, B>>,
    id_gen: Arc<IdGenerator>,
    config: CrawlerConfig,
) -> mpsc::Receiver<PageNode> {
    let (tx, rx) = mpsc::channel(config.batch_size);

    tokio::spawn(async move {
        match strategy {
            Strategy::Dfs => {
                let mut path = HashMap::new();
                let current_id = root.id;
                path.insert(root.id, root);
                dfs::run(
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
            }
            Strategy::Bfs => {
                bfs::run(
                    client,
                    favicons,
                    id_gen,
                    max_depth,
                    end_phrase,
                    vec![root],
                    config,
                    tx,
                )
                .await;
            }
        }
    });

    rx
}

/// Resumes a strategy from its persisted batches (spec §4.5 step 1).
/// Returns `Done` when a terminal sentinel was already written, otherwise
/// the node list to hand to a fresh `produce` call along with the id to
/// seed the generator past.
pub fn unfinished(strategy: Strategy, entries: Vec<BatchEntry>, max_depth: u32) -> Unfinished {
    match strategy {
        Strategy::Dfs => resume::unfinished_dfs(entries),
        Strategy::Bfs => resume::unfinished_bfs(entries, max_depth),
    }
}
