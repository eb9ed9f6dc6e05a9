//! The page-node abstraction and its fetch-and-parse rules (spec §3, §4.2).
//! Grounded in `original_source/page.py`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blobstore::BlobStore;
use crate::error::{Log, PageUnreachable};
use crate::favicon::FaviconResolver;
use crate::host::{make_phrase_regex, normalize_url};
use crate::http_client::HttpClient;
use crate::idgen::IdGenerator;
use crate::links::extract_links;

/// One fetched page. `links` is `None` for a node rehydrated from the
/// result store without links (load on demand via `load()`); `Some` for a
/// freshly-fetched node, even if the page had zero outbound links.
#[derive(Debug, Clone)]
pub struct PageNode {
    pub id: u64,
    pub url: String,
    pub parent: Option<u64>,
    pub depth: u32,
    pub links: Option<Vec<String>>,
    pub phrase_found: bool,
    pub favicon: Option<String>,
}

/// The `{id, parent, url, favicon, depth, phrase_found}` wire form (spec
/// §6). `links` is intentionally excluded — callers reload it with
/// `load()` when needed (spec §9 Rehydration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNodeJson {
    pub id: u64,
    pub parent: Option<u64>,
    pub url: String,
    pub favicon: Option<String>,
    pub depth: u32,
    pub phrase_found: bool,
}

impl PageNode {
    pub fn to_json(&self) -> PageNodeJson {
        PageNodeJson {
            id: self.id,
            parent: self.parent,
            url: self.url.clone(),
            favicon: self.favicon.clone(),
            depth: self.depth,
            phrase_found: self.phrase_found,
        }
    }

    pub fn from_json(json: PageNodeJson) -> Self {
        PageNode {
            id: json.id,
            url: json.url,
            parent: json.parent,
            depth: json.depth,
            links: None,
            phrase_found: json.phrase_found,
            favicon: json.favicon,
        }
    }

    pub fn needs_links(&self) -> bool {
        self.links.is_none()
    }

    /// Returns the page's links, fetching and re-parsing the page first if
    /// they weren't carried over from a rehydrated node.
    pub async fn load<C: HttpClient, B: BlobStore>(
        &mut self,
        client: &C,
        favicons: &FaviconResolver<C, B>,
    ) -> Result<(), PageUnreachable> {
        if self.links.is_some() {
            return Ok(());
        }

        let Some(res) = client.fetch(&self.url).await else {
            return Err(PageUnreachable {
                url: self.url.clone(),
                reason: "network failure on reload".into(),
            });
        };

        if !res.is_success() {
            return Err(PageUnreachable {
                url: self.url.clone(),
                reason: format!("status {}", res.status_code),
            });
        }

        let body = res.text_lossy();
        self.links = Some(extract_links(&body, &self.url));
        self.favicon = favicons.get_favicon(&self.url, Some(&body)).await;

        Ok(())
    }
}

struct FetchedPage {
    url: String,
    links: Vec<String>,
    phrase_found: bool,
    favicon: Option<String>,
}

/// Shared fetch-decode-parse step used by both child and seed node
/// construction. Fails with [`PageUnreachable`] on network failure or a
/// non-200 status; never allocates an id.
async fn fetch_page<C: HttpClient, B: BlobStore>(
    url: &str,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
) -> Result<FetchedPage, PageUnreachable> {
    let url = normalize_url(url);

    let Some(res) = client.fetch(&url).await else {
        return Err(PageUnreachable {
            url: url.clone(),
            reason: "network failure".into(),
        });
    };

    if !res.is_success() {
        return Err(PageUnreachable {
            url: url.clone(),
            reason: format!("status {}", res.status_code),
        });
    }

    let body = res.text_lossy();
    let links = extract_links(&body, &url);

    let phrase_found = match end_phrase {
        Some(phrase) => match make_phrase_regex(phrase) {
            Ok(re) => re.is_match(&body),
            Err(e) => {
                format!("Invalid end phrase regex {:?}: {}", phrase, e)
                    .log("[WARN]")
                    .await;
                false
            }
        },
        None => false,
    };

    let favicon = favicons.get_favicon(&url, Some(&body)).await;

    Ok(FetchedPage {
        url,
        links,
        phrase_found,
        favicon,
    })
}

/// Fetches `url`, parses it into a `PageNode`. The id is allocated
/// *last*, via `id_gen`, so a failed attempt never consumes an id.
pub async fn make_page_node<C: HttpClient, B: BlobStore>(
    url: &str,
    parent: Option<&PageNode>,
    id_gen: &IdGenerator,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
) -> Result<PageNode, PageUnreachable> {
    let fetched = fetch_page(url, end_phrase, client, favicons).await?;

    let (parent_id, depth) = match parent {
        Some(p) => (Some(p.id), p.depth + 1),
        None => (None, 0),
    };

    Ok(PageNode {
        id: id_gen.next(),
        url: fetched.url,
        parent: parent_id,
        depth,
        links: Some(fetched.links),
        phrase_found: fetched.phrase_found,
        favicon: fetched.favicon,
    })
}

/// Factory wrapper: converts any fetch/parse failure into `None`, which
/// the owning strategy interprets as "try another link" (spec §4.2).
pub async fn try_make_page_node<C: HttpClient, B: BlobStore>(
    url: &str,
    parent: Option<&PageNode>,
    id_gen: &IdGenerator,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
) -> Option<PageNode> {
    match make_page_node(url, parent, id_gen, end_phrase, client, favicons).await {
        Ok(node) => Some(node),
        Err(e) => {
            e.to_string().log("[WARN]").await;
            None
        }
    }
}

/// Builds the seed node for a fresh crawl from a raw URL. The seed's id
/// is always `0`, assigned directly rather than through the id generator
/// (spec §3: "seed is 0"; the generator is only seeded afterwards).
pub async fn make_seed_node<C: HttpClient, B: BlobStore>(
    url: &str,
    end_phrase: Option<&str>,
    client: &C,
    favicons: &FaviconResolver<C, B>,
) -> Option<PageNode> {
    match fetch_page(url, end_phrase, client, favicons).await {
        Ok(fetched) => Some(PageNode {
            id: 0,
            url: fetched.url,
            parent: None,
            depth: 0,
            links: Some(fetched.links),
            phrase_found: fetched.phrase_found,
            favicon: fetched.favicon,
        }),
        Err(e) => {
            e.to_string().log("[WARN]").await;
            None
        }
    }
}

pub type SharedHttpClient<C> = Arc<C>;

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

    #[tokio::test]
    async fn seed_node_has_id_zero_and_no_parent() {
        let client = StubHttpClient::new();
        client
            .set_page("http://a.test/", 200, "<a href=\"http://b.test/\">b</a>")
            .await;
        let favicons = favicon_resolver().await;

        let seed = make_seed_node("http://a.test/", None, &client, &favicons)
            .await
            .unwrap();

        assert_eq!(seed.id, 0);
        assert_eq!(seed.depth, 0);
        assert_eq!(seed.parent, None);
        assert_eq!(seed.links.unwrap(), vec!["http://b.test/"]);
    }

    #[tokio::test]
    async fn unreachable_seed_produces_no_node() {
        let client = StubHttpClient::new();
        let favicons = favicon_resolver().await;

        assert!(
            make_seed_node("http://nowhere.invalid/", None, &client, &favicons)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn child_depth_and_parent_are_derived() {
        let client = StubHttpClient::new();
        client.set_page("http://a.test/", 200, "root").await;
        client.set_page("http://a.test/child", 200, "child").await;
        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);

        let parent = make_page_node("http://a.test/", None, &id_gen, None, &client, &favicons)
            .await
            .unwrap();

        let child = make_page_node(
            "http://a.test/child",
            Some(&parent),
            &id_gen,
            None,
            &client,
            &favicons,
        )
        .await
        .unwrap();

        assert_eq!(child.parent, Some(parent.id));
        assert_eq!(child.depth, parent.depth + 1);
        assert_eq!(child.id, parent.id + 1);
    }

    #[tokio::test]
    async fn failed_fetch_does_not_consume_an_id() {
        let client = StubHttpClient::new();
        client.set_page("http://a.test/", 200, "root").await;
        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);

        let ok = try_make_page_node(
            "http://a.test/",
            None,
            &id_gen,
            None,
            &client,
            &favicons,
        )
        .await
        .unwrap();

        // a failed fetch against an unseeded URL must not burn an id
        let fail = try_make_page_node(
            "http://missing.test/",
            None,
            &id_gen,
            None,
            &client,
            &favicons,
        )
        .await;
        assert!(fail.is_none());

        let next_ok = try_make_page_node(
            "http://a.test/",
            None,
            &id_gen,
            None,
            &client,
            &favicons,
        )
        .await
        .unwrap();

        assert_eq!(next_ok.id, ok.id + 1);
    }

    #[tokio::test]
    async fn phrase_found_is_detected() {
        let client = StubHttpClient::new();
        client
            .set_page("http://a.test/", 200, "welcome to the \"secret\" page")
            .await;
        let favicons = favicon_resolver().await;
        let id_gen = IdGenerator::new(0);

        let node = make_page_node(
            "http://a.test/",
            None,
            &id_gen,
            Some("secret"),
            &client,
            &favicons,
        )
        .await
        .unwrap();

        assert!(node.phrase_found);
    }

    #[tokio::test]
    async fn rehydrated_node_loads_links_lazily() {
        let client = StubHttpClient::new();
        client
            .set_page("http://a.test/", 200, "<a href=\"http://b.test/\">b</a>")
            .await;
        let favicons = favicon_resolver().await;

        let mut rehydrated = PageNode::from_json(PageNodeJson {
            id: 0,
            parent: None,
            url: "http://a.test/".to_string(),
            favicon: None,
            depth: 0,
            phrase_found: false,
        });

        assert!(rehydrated.needs_links());
        rehydrated.load(&client, &favicons).await.unwrap();
        assert_eq!(rehydrated.links.unwrap(), vec!["http://b.test/"]);
    }
}
