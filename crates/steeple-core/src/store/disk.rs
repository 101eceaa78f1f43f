use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{CacheStore, CachedData};
use crate::error::StoreError;
use crate::request::{CacheKey, Response};

/// Extension of committed entry files
const ENTRY_EXTENSION: &str = "entry";

/// Everything about an entry except its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

/// File-backed cache store.
///
/// Each namespace is a directory under `root`. Each entry is a single file
/// named by the SHA-256 of its key, holding one line of JSON metadata
/// followed by the raw body. Entries are written to a temporary file and
/// renamed into place, so concurrent writers to the same key leave one
/// complete entry behind (last writer wins).
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, StoreError> {
        let valid = !namespace.is_empty()
            && namespace != "."
            && namespace != ".."
            && !namespace.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidNamespace(namespace.to_string()));
        }
        Ok(self.root.join(namespace))
    }

    fn entry_path(&self, namespace: &str, key: &CacheKey) -> Result<PathBuf, StoreError> {
        let digest = Sha256::digest(key.as_str().as_bytes());
        Ok(self
            .namespace_dir(namespace)?
            .join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION)))
    }

    fn encode(key: &CacheKey, response: &Response) -> Result<Vec<u8>, StoreError> {
        let meta = CachedData::new(EntryMeta {
            url: key.as_str().to_string(),
            status: response.status,
            headers: response.headers.clone(),
        });
        // Compact JSON never contains a raw newline
        let mut contents = serde_json::to_vec(&meta)?;
        contents.push(b'\n');
        contents.extend_from_slice(&response.body);
        Ok(contents)
    }

    fn decode(contents: Vec<u8>) -> Result<(CachedData<EntryMeta>, Bytes), StoreError> {
        let split = contents
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| StoreError::Corrupt("missing metadata line".to_string()))?;
        let meta: CachedData<EntryMeta> = serde_json::from_slice(&contents[..split])?;
        let body = Bytes::from(contents).slice(split + 1..);
        Ok((meta, body))
    }

    /// Metadata of every entry in a namespace, for display.
    pub async fn list_entries(
        &self,
        namespace: &str,
    ) -> Result<Vec<CachedData<EntryMeta>>, StoreError> {
        let dir = self.namespace_dir(namespace)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = read_dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match tokio::fs::read(&path).await.map_err(StoreError::from).and_then(Self::decode) {
                Ok((meta, _)) => entries.push(meta),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable cache entry");
                }
            }
        }
        entries.sort_by(|a, b| a.data.url.cmp(&b.data.url));
        Ok(entries)
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn open(&self, namespace: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.namespace_dir(namespace)?).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut read_dir = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(item) = read_dir.next_entry().await? {
            if !item.file_type().await?.is_dir() {
                continue;
            }
            match item.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(dir) => warn!(dir = ?dir, "Ignoring non-UTF-8 cache directory"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, namespace: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_dir_all(self.namespace_dir(namespace)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_in(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, StoreError> {
        let path = self.entry_path(namespace, key)?;
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (meta, body) = Self::decode(contents)?;
        if meta.data.url != key.as_str() {
            return Err(StoreError::Corrupt(format!(
                "entry for {} holds {}",
                key, meta.data.url
            )));
        }

        Ok(Some(Response {
            status: meta.data.status,
            headers: meta.data.headers,
            body,
        }))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &CacheKey,
        response: &Response,
    ) -> Result<(), StoreError> {
        self.open(namespace).await?;
        let path = self.entry_path(namespace, key)?;
        let tmp = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

        tokio::fs::write(&tmp, Self::encode(key, response)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
