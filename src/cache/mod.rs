//! Cache Store (C1): filesystem-backed blob/JSON cache with TTL and
//! multi-process download locks, plus the short-TTL in-process memoization
//! layer spec §5 calls out as part of C1's responsibility.

mod error;
mod lock;
mod memo;

pub use error::CacheError;
pub use lock::DownloadLock;
pub use memo::MemoCache;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    data: T,
    timestamp: u64,
    valid_until: Option<u64>,
}

/// One provider's slice of the filesystem cache, rooted at `cache/<provider>/`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Returns `None` if the entry is missing, malformed, or past
    /// `valid_until` — all three are treated as a plain cache miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).await.ok()?;
        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("cache entry {path:?} is malformed, treating as a miss: {e}");
                return None;
            }
        };

        if let Some(valid_until) = envelope.valid_until {
            if now_unix() > valid_until {
                return None;
            }
        }

        Some(envelope.data)
    }

    /// Writes atomically (temp file + rename), file mode 0644, directory
    /// 0755 — the previous value is never removed before the new one lands.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        valid_until: Option<u64>,
    ) -> Result<(), CacheError> {
        let envelope = Envelope {
            data: value,
            timestamp: now_unix(),
            valid_until,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.write_atomic(&self.path_for(key), &bytes).await
    }

    pub async fn get_blob(&self, path: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(path)).await.ok()
    }

    pub async fn set_blob(&self, path: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let full = self.root.join(path);
        self.write_atomic(&full, bytes).await
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
            #[cfg(unix)]
            set_permissions(parent, 0o755).await;
        }

        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        {
            let mut tmp = fs::File::create(&tmp_path).await?;
            tmp.write_all(bytes).await?;
            tmp.flush().await?;
        }

        #[cfg(unix)]
        set_permissions(&tmp_path, 0o644).await;

        fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    /// Scoped acquisition of an exclusive download lock for `name`, stale
    /// after `stale_after_secs`.
    pub async fn acquire_download_lock(
        &self,
        name: &str,
        stale_after_secs: u64,
    ) -> Result<DownloadLock, CacheError> {
        DownloadLock::acquire(self.root.join(format!("{name}.lock")), stale_after_secs).await
    }
}

#[cfg(unix)]
async fn set_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path).await {
        let mut perms = meta.permissions();
        perms.set_mode(mode);
        let _ = fs::set_permissions(path, perms).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.set("stops", &vec![1, 2, 3], None).await.unwrap();
        let got: Option<Vec<i32>> = store.get("stops").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.set("stops", &42, Some(0)).await.unwrap();
        let got: Option<i32> = store.get("stops").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn malformed_entry_is_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        fs::create_dir_all(dir.path()).await.unwrap();
        fs::write(dir.path().join("stops.json"), b"not json").await.unwrap();
        let got: Option<i32> = store.get("stops").await;
        assert_eq!(got, None);
    }
}
