//! Infrastructure shared by every concrete adapter: the rate-limited HTTP
//! client, the filesystem cache, the in-process memo tables, and the shared
//! GTFS [`Feed`] the adapter falls back to for coordinates/names/route
//! geometry (spec §4.9 "each adapter wraps its own GTFS bundle").

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, MemoCache};
use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use crate::gtfs::feed::{Feed, FeedSnapshot};
use crate::rate_limit::RateLimiter;

use super::{Coordinates, ServiceMessagesResponse, VehiclesResponse, WaitingTimesResponse};

const MEMO_TTL: Duration = Duration::from_secs(30);

pub struct ProviderCommon {
    pub config: ProviderConfig,
    pub cache: CacheStore,
    pub rate_limiter: RateLimiter,
    pub http: reqwest::Client,
    pub feed: Arc<Feed>,
    pub waiting_times_memo: MemoCache<WaitingTimesResponse>,
    pub vehicles_memo: MemoCache<VehiclesResponse>,
    pub messages_memo: MemoCache<ServiceMessagesResponse>,
}

impl ProviderCommon {
    pub fn new(config: ProviderConfig, cache_root: impl Into<std::path::PathBuf>, feed: Arc<Feed>) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_delay);
        Self {
            config,
            cache: CacheStore::new(cache_root),
            rate_limiter,
            http: reqwest::Client::new(),
            feed,
            waiting_times_memo: MemoCache::new(MEMO_TTL),
            vehicles_memo: MemoCache::new(MEMO_TTL),
            messages_memo: MemoCache::new(MEMO_TTL),
        }
    }

    /// The currently published GTFS snapshot, or `FeedNotReady` — every
    /// adapter call that needs static data (fallback coordinates, route
    /// shapes, schedules) goes through this instead of inlining the check.
    pub fn snapshot(&self) -> AppResult<Arc<FeedSnapshot>> {
        self.feed.snapshot().ok_or(AppError::FeedNotReady)
    }

    /// Coordinates from the GTFS bundle for stops the real-time API didn't
    /// return a position for (spec §8 scenario 1: "upstream returns null
    /// coordinates, fall back to GTFS").
    pub fn gtfs_fallback_coordinates(snapshot: &FeedSnapshot, stop_id: &str) -> Option<Coordinates> {
        snapshot.stops_by_id.get(stop_id).and_then(|s| s.coordinates).map(Coordinates::from)
    }

    pub fn gtfs_stop_name(snapshot: &FeedSnapshot, stop_id: &str) -> Option<String> {
        snapshot.stops_by_id.get(stop_id).map(|s| s.name.clone())
    }

    /// Rate-limiter gate before any upstream call: when the quota is known
    /// exhausted, the caller should serve `memo.get_stale()` instead of
    /// blocking (spec §5 back-pressure rule) — this only paces calls that do
    /// go out.
    pub async fn before_upstream_call(&self) {
        self.rate_limiter.before_call().await;
    }
}
