#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("could not acquire download lock for {name} (held for over {stale_after_secs}s)")]
    LockTimedOut { name: String, stale_after_secs: u64 },
}
