//! Depth-first strategy (spec §4.6): random-link-pick with backtrack on
//! dead ends. Grounded in `original_source/crawler.py`'s
//! `DepthFirstCrawler`, extended with the spec's backtrack behavior.

use std::collections::HashMap;

use rand::Rng;
use tokio::sync::mpsc;

use crate::blobstore::BlobStore;
use crate::favicon::FaviconResolver;
use crate::http_client::HttpClient;
use crate::idgen::IdGenerator;
use crate::page::{try_make_page_node, PageNode};

/// Runs the DFS producer to completion, sending each yielded node down
/// `tx`. `path` holds every node still reachable by backtracking,
/// indexed by id; `current_id` is where the crawl resumes from.
pub async fn run<C: HttpClient, B: BlobStore>(
    mut path: HashMap<u64, PageNode>,
    mut current_id: u64,
    max_depth: u32,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
    id_gen: &IdGenerator,
    tx: mpsc::Sender<PageNode>,
) {
    loop {
        let current_depth = match path.get(&current_id) {
            Some(n) => n.depth,
            None => return,
        };
        if current_depth >= max_depth {
            return;
        }

        let mut built = None;
        loop {
            let link = {
                let current = path.get_mut(&current_id).expect("current node is in path");
                let links = current.links.get_or_insert_with(Vec::new);
                if links.is_empty() {
                    break;
                }
                let idx = rand::rng().random_range(0..links.len());
                links.remove(idx)
            };

            let parent_snapshot = path.get(&current_id).cloned();
            let node = try_make_page_node(
                &link,
                parent_snapshot.as_ref(),
                id_gen,
                end_phrase,
                client,
                favicons,
            )
            .await;

            if let Some(node) = node {
                built = Some(node);
                break;
            }
        }

        match built {
            Some(child) => {
                let phrase_found = child.phrase_found;
                let child_id = child.id;
                if tx.send(child.clone()).await.is_err() {
                    return;
                }
                path.insert(child_id, child);

                if phrase_found {
                    return;
                }
                current_id = child_id;
            }
            None => {
                // LinkCapacityExhausted at `current`: backtrack, or stop if
                // we've backtracked all the way past the seed.
                match path.get(&current_id).and_then(|n| n.parent) {
                    Some(parent_id) => current_id = parent_id,
                    None => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::stub::InMemoryBlobStore;
    use crate::http_client::stub::StubHttpClient;
    use std::sync::Arc;

    async fn favicon_resolver() -> FaviconResolver<StubHttpClient, InMemoryBlobStore> {
        FaviconResolver::load(
            Arc::new(StubHttpClient::new()),
            Arc::new(InMemoryBlobStore::new()),
            5,
            3,
            "/favicons/",
        )
        .await
    }

    fn seed(links: Vec<&str>) -> PageNode {
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

    #[tokio::test]
    async fn backtracks_past_dead_end_to_try_the_other_branch() {
        let client = StubHttpClient::new();
        // http://a.test/ has no outbound links: a dead end.
        client.set_page("http://a.test/", 200, "no links here").await;
        client
            .set_page("http://b.test/", 200, "<a href=\"http://b.test/child\">x</a>")
            .await;
        client.set_page("http://b.test/child", 200, "leaf").await;

        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);
        let root = seed(vec!["http://a.test/", "http://b.test/"]);
        let mut path = HashMap::new();
        path.insert(0, root);

        let (tx, mut rx) = mpsc::channel(16);
        run(path, 0, 3, None, &client, &favicons, &id_gen, tx).await;

        let mut emitted = Vec::new();
        while let Some(n) = rx.recv().await {
            emitted.push(n);
        }

        // both branches get visited eventually regardless of random order,
        // and every emitted node chains back to the seed.
        assert!(!emitted.is_empty());
        for n in &emitted {
            assert!(n.parent == Some(0) || emitted.iter().any(|p| Some(p.id) == n.parent));
        }
    }

    #[tokio::test]
    async fn stops_at_max_depth_without_further_backtrack() {
        let client = StubHttpClient::new();
        client
            .set_page("http://a.test/", 200, "<a href=\"http://a.test/1\">x</a>")
            .await;
        client
            .set_page("http://a.test/1", 200, "<a href=\"http://a.test/2\">x</a>")
            .await;
        client.set_page("http://a.test/2", 200, "leaf").await;

        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);
        let root = seed(vec!["http://a.test/"]);
        let mut path = HashMap::new();
        path.insert(0, root);

        let (tx, mut rx) = mpsc::channel(16);
        run(path, 0, 2, None, &client, &favicons, &id_gen, tx).await;

        let mut emitted = Vec::new();
        while let Some(n) = rx.recv().await {
            emitted.push(n);
        }

        assert!(emitted.iter().all(|n| n.depth <= 2));
        assert!(emitted.iter().any(|n| n.depth == 2));
    }

    #[tokio::test]
    async fn seed_with_no_links_terminates_immediately() {
        let client = StubHttpClient::new();
        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);
        let root = seed(vec![]);
        let mut path = HashMap::new();
        path.insert(0, root);

        let (tx, mut rx) = mpsc::channel(16);
        run(path, 0, 3, None, &client, &favicons, &id_gen, tx).await;

        assert!(rx.recv().await.is_none());
    }
}
