//! Favicon blob store contract (spec §6): `save_file`, `read_file`,
//! `list_files`. Grounded in `original_source/site_utils.py` (GCS-backed
//! in the original) and `agentdrive-gg/src/cache.rs`'s atomic-write
//! pattern for the filesystem implementation.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save_file(&self, bytes: &[u8], name: &str) -> std::io::Result<()>;
    async fn read_file(&self, name: &str) -> Option<Vec<u8>>;
    async fn list_files(&self) -> HashSet<String>;
}

/// Stores blobs as plain files under a root directory, writing atomically
/// via a temp-file-then-rename (same trick as `agentdrive-gg`'s cache).
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save_file(&self, bytes: &[u8], name: &str) -> std::io::Result<()> {
        let path = self.path_for(name);
        let tmp_path = self.root.join(format!(".{}.tmp", name));

        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.path_for(name)).await.ok()
    }

    async fn list_files(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return names;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.insert(name.to_string());
                }
            }
        }

        names
    }
}

pub fn default_favicon_root() -> PathBuf {
    PathBuf::from("favicons")
}

/// In-memory double used for tests.
pub mod stub {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryBlobStore {
        files: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    impl InMemoryBlobStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl BlobStore for InMemoryBlobStore {
        async fn save_file(&self, bytes: &[u8], name: &str) -> std::io::Result<()> {
            self.files
                .lock()
                .await
                .insert(name.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn read_file(&self, name: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(name).cloned()
        }

        async fn list_files(&self) -> HashSet<String> {
            self.files.lock().await.keys().cloned().collect()
        }
    }
}
