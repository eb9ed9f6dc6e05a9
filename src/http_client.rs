//! HTTP client contract (spec §6): `fetch(url) -> {status_code, content}`
//! or a failure on network error, with a 10s deadline. Grounded in
//! `original_source/site_utils.py`'s `retrieve_url` and the teacher's
//! `fetch.rs`.

use std::time::Duration;

use async_trait::async_trait;

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status_code: u16,
    pub content: Vec<u8>,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Decodes the body as UTF-8, replacing invalid bytes with the
    /// replacement character. Never fatal (spec §7 DecodeFailure).
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetches `url`, returning `Ok(None)` on network failure (timeout,
    /// DNS, connection refused, ...) and `Ok(Some(response))` for any
    /// response received, success or not. The caller decides what to do
    /// with non-200 statuses.
    async fn fetch(&self, url: &str) -> Option<FetchedResponse>;
}

/// `reqwest`-backed client with the spec's 10s per-fetch deadline.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn fetch(&self, url: &str) -> Option<FetchedResponse> {
        let res = self.client.get(url).send().await.ok()?;
        let status_code = res.status().as_u16();
        let content = res.bytes().await.ok()?.to_vec();

        Some(FetchedResponse {
            status_code,
            content,
        })
    }
}

/// An in-memory `HttpClient` double used by unit/integration tests so the
/// crawl engine can be exercised without a network. Not behind `cfg(test)`
/// so `tests/crawl_scenarios.rs` (a separate crate) can use it too.
pub mod stub {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct StubPage {
        pub status_code: u16,
        pub body: String,
    }

    pub struct StubHttpClient {
        pages: Mutex<HashMap<String, StubPage>>,
        pub probe_counts: Mutex<HashMap<String, usize>>,
    }

    impl StubHttpClient {
        pub fn new() -> Self {
            Self {
                pages: Mutex::new(HashMap::new()),
                probe_counts: Mutex::new(HashMap::new()),
            }
        }

        pub async fn set_page(&self, url: &str, status_code: u16, body: impl Into<String>) {
            self.pages.lock().await.insert(
                url.to_string(),
                StubPage {
                    status_code,
                    body: body.into(),
                },
            );
        }

        pub async fn probes_for(&self, url: &str) -> usize {
            *self.probe_counts.lock().await.get(url).unwrap_or(&0)
        }
    }

    impl Default for StubHttpClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn fetch(&self, url: &str) -> Option<FetchedResponse> {
            *self
                .probe_counts
                .lock()
                .await
                .entry(url.to_string())
                .or_insert(0) += 1;

            let pages = self.pages.lock().await;
            pages.get(url).map(|p| FetchedResponse {
                status_code: p.status_code,
                content: p.body.clone().into_bytes(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubHttpClient;
    use super::*;

    #[tokio::test]
    async fn stub_records_probe_counts() {
        let client = StubHttpClient::new();
        client.set_page("http://a.test/", 200, "hello").await;

        let r1 = client.fetch("http://a.test/").await.unwrap();
        assert!(r1.is_success());
        assert_eq!(r1.text_lossy(), "hello");

        client.fetch("http://a.test/").await;
        assert_eq!(client.probes_for("http://a.test/").await, 2);
    }

    #[tokio::test]
    async fn stub_missing_page_is_none() {
        let client = StubHttpClient::new();
        assert!(client.fetch("http://missing.test/").await.is_none());
    }
}
