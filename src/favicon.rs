//! Favicon resolver + content-addressed cache (spec §4.3). Grounded in
//! `original_source/crawler/favicon.py`.

use std::collections::HashSet;
use std::sync::Arc;

use md5::{Digest, Md5};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tokio::sync::Mutex;

use crate::blobstore::BlobStore;
use crate::error::Log;
use crate::host::{get_host, host_key, resolve_relative};
use crate::http_client::HttpClient;

/// Base URL prefix for locally-served favicon blobs.
pub const FAVICON_BASE: &str = "/favicons/";

/// Matches a `<link rel="icon"|"shortcut icon" href=...>` tag in a 404
/// error page's body.
static ICON_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r#"<link [^>]*rel=["'](?:shortcut icon|icon)["'][^>]*href=["']?(?P<icon>[^"' ]*)"#,
    )
    .case_insensitive(true)
    .build()
    .expect("static icon link regex is valid")
});

fn find_icon_link(body: &str) -> Option<String> {
    ICON_LINK_REGEX
        .captures(body)
        .and_then(|c| c.name("icon"))
        .map(|m| m.as_str().to_string())
}

/// Write-through cache of `host_key -> content hash` plus the set of
/// known content hashes. One mutex covers the whole read-modify-save
/// critical section, matching the spec's invariant.
struct FaviconCacheInner {
    host_to_hash: std::collections::HashMap<String, Option<String>>,
    hash_set: HashSet<String>,
    new_entries_since_save: u32,
}

pub struct FaviconResolver<C: HttpClient, B: BlobStore> {
    client: Arc<C>,
    blobs: Arc<B>,
    inner: Mutex<FaviconCacheInner>,
    checkpoint_interval: u32,
    recursion_cap: u8,
    base_url: String,
}

const HASH_DICT_FILE: &str = "hash_dict.json";
const HASH_SET_FILE: &str = "hash_set.json";

impl<C: HttpClient, B: BlobStore> FaviconResolver<C, B> {
    pub async fn load(
        client: Arc<C>,
        blobs: Arc<B>,
        checkpoint_interval: u32,
        recursion_cap: u8,
        base_url: impl Into<String>,
    ) -> Self {
        let host_to_hash = match blobs.read_file(HASH_DICT_FILE).await {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            None => std::collections::HashMap::new(),
        };
        let hash_set = match blobs.read_file(HASH_SET_FILE).await {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            None => HashSet::new(),
        };

        Self {
            client,
            blobs,
            inner: Mutex::new(FaviconCacheInner {
                host_to_hash,
                hash_set,
                new_entries_since_save: 0,
            }),
            checkpoint_interval,
            recursion_cap,
            base_url: base_url.into(),
        }
    }

    /// spec §4.3 algorithm. `body`, when available, is searched for an
    /// explicit `<link rel="icon">` before falling back to `/favicon.ico`.
    pub async fn get_favicon(&self, page_url: &str, body: Option<&str>) -> Option<String> {
        let host = get_host(page_url)?;
        let key = host_key(&host);

        {
            let inner = self.inner.lock().await;
            if let Some(cached) = inner.host_to_hash.get(&key) {
                return cached
                    .as_ref()
                    .map(|hash| format!("{}{}.ico", self.base_url, hash));
            }
        }

        let icon_bytes = self.discover_icon(&host, body).await;

        let Some(icon_bytes) = icon_bytes else {
            self.record_miss(key).await;
            return None;
        };

        let hash = format!("{:x}", Md5::digest(&icon_bytes));
        self.record_hit(key, hash.clone(), icon_bytes).await;

        Some(format!("{}{}.ico", self.base_url, hash))
    }

    async fn discover_icon(&self, host: &str, body: Option<&str>) -> Option<Vec<u8>> {
        if let Some(body) = body {
            if let Some(icon_ref) = find_icon_link(body) {
                let target = resolve_relative(&icon_ref, host);
                if let Some(bytes) = self.download_icon(&target, 0).await {
                    return Some(bytes);
                }
            }
        }

        let default_url = format!("{}/favicon.ico", host);
        self.download_icon(&default_url, 0).await
    }

    /// Attempts to download an icon. On a 404 whose body is HTML, tries
    /// one recursive extraction from that body, capped at
    /// `recursion_cap` levels to prevent loops.
    fn download_icon<'a>(
        &'a self,
        url: &'a str,
        depth: u8,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            let res = self.client.fetch(url).await?;

            match res.status_code {
                200 => Some(res.content),
                404 if depth < self.recursion_cap => {
                    let body = res.text_lossy();
                    let icon_ref = find_icon_link(&body)?;
                    let host = get_host(url).unwrap_or_else(|| url.to_string());
                    let next_url = resolve_relative(&icon_ref, &host);
                    self.download_icon(&next_url, depth + 1).await
                }
                _ => None,
            }
        })
    }

    async fn record_hit(&self, key: String, hash: String, bytes: Vec<u8>) {
        let is_new_hash = {
            let inner = self.inner.lock().await;
            !inner.hash_set.contains(&hash)
        };

        if is_new_hash {
            if let Err(e) = self.blobs.save_file(&bytes, &format!("{}.ico", hash)).await {
                format!("Failed to persist favicon blob {}: {}", hash, e)
                    .log("[WARN]")
                    .await;
            }
        }

        let mut inner = self.inner.lock().await;
        inner.host_to_hash.insert(key, Some(hash.clone()));
        inner.hash_set.insert(hash);
        inner.new_entries_since_save += 1;
        self.maybe_checkpoint(&mut inner).await;
    }

    async fn record_miss(&self, key: String) {
        let mut inner = self.inner.lock().await;
        inner.host_to_hash.insert(key, None);
        inner.new_entries_since_save += 1;
        self.maybe_checkpoint(&mut inner).await;
    }

    /// Persistence fault (spec §7): save failures are swallowed so
    /// crawling continues, the in-memory cache stays valid regardless.
    async fn maybe_checkpoint(&self, inner: &mut FaviconCacheInner) {
        if inner.new_entries_since_save < self.checkpoint_interval {
            return;
        }

        let dict_bytes = match serde_json::to_vec(&inner.host_to_hash) {
            Ok(b) => b,
            Err(_) => return,
        };
        let set_bytes = match serde_json::to_vec(&inner.hash_set) {
            Ok(b) => b,
            Err(_) => return,
        };

        let dict_saved = self.blobs.save_file(&dict_bytes, HASH_DICT_FILE).await;
        let set_saved = self.blobs.save_file(&set_bytes, HASH_SET_FILE).await;

        if dict_saved.is_err() || set_saved.is_err() {
            "Failed to checkpoint favicon cache; continuing with in-memory state"
                .log("[WARN]")
                .await;
            return;
        }

        inner.new_entries_since_save = 0;
    }

    /// Explicit flush on shutdown, in addition to the every-N-writes policy.
    pub async fn flush(&self) {
        let mut inner = self.inner.lock().await;
        inner.new_entries_since_save = self.checkpoint_interval;
        self.maybe_checkpoint(&mut inner).await;
    }
}
