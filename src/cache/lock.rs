//! File-system advisory lock used to serialize GTFS downloads across
//! processes (spec §5: poll every 10s for up to 300s; a lock file older than
//! `stale_after` is considered abandoned and removed).

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs;
use tokio::time::sleep;

use super::error::CacheError;

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const MAX_WAIT: Duration = Duration::from_secs(300);

/// An acquired lock; the lock file is removed when this is dropped.
pub struct DownloadLock {
    path: PathBuf,
}

impl DownloadLock {
    pub async fn acquire(path: PathBuf, stale_after_secs: u64) -> Result<Self, CacheError> {
        let mut waited = Duration::ZERO;

        loop {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path, stale_after_secs).await {
                        log::warn!("removing stale download lock {:?}", path);
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                }
                Err(e) => return Err(e.into()),
            }

            if waited >= MAX_WAIT {
                return Err(CacheError::LockTimedOut {
                    name: path.display().to_string(),
                    stale_after_secs,
                });
            }

            sleep(POLL_INTERVAL).await;
            waited += POLL_INTERVAL;
        }
    }

    async fn is_stale(path: &PathBuf, stale_after_secs: u64) -> bool {
        let Ok(meta) = fs::metadata(path).await else {
            return true;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        modified
            .elapsed()
            .map(|age| age.as_secs() > stale_after_secs)
            .unwrap_or(false)
    }

    pub fn release(self) {
        // drop() does the actual cleanup; named for readability at call sites.
    }
}

impl Drop for DownloadLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn acquires_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("gtfs.lock");
        let lock = DownloadLock::acquire(lock_path.clone(), 3600).await.unwrap();
        assert!(lock_path.exists());
        drop(lock);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn stale_lock_is_removed_and_reacquired() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("gtfs.lock");
        std::fs::write(&lock_path, b"").unwrap();

        // stale_after=0 makes any existing lock immediately stale.
        let lock = DownloadLock::acquire(lock_path.clone(), 0).await.unwrap();
        assert!(lock_path.exists());
        drop(lock);
    }
}
