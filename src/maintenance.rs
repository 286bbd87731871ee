//! Static GTFS bundle acquisition and periodic refresh, grounded in the
//! teacher's `maintenance.rs` "run forever, reload on a schedule" shape —
//! generalized from one shared maintenance window over a database into one
//! independent reload loop per provider's [`Feed`] (spec §4.4 pipeline step 1
//! download, §4.10 "discover adapter packages, instantiate each enabled
//! one").

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::ProviderConfig;
use crate::gtfs::feed::Feed;
use crate::gtfs::loader::{self, LoadedGtfs};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("http error fetching GTFS bundle: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gtfs load error: {0}")]
    Load(#[from] loader::GtfsLoadError),

    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}

pub type Result<T> = std::result::Result<T, Error>;

async fn download_and_parse(config: &ProviderConfig, http: &reqwest::Client, cache: &CacheStore, url: &str) -> Result<LoadedGtfs> {
    let mut request = http.get(url);
    if let Some(key) = &config.api_key {
        request = request.query(&[("apikey", key.as_str())]);
    }
    let bytes = request.send().await?.bytes().await?;
    Ok(loader::load_from_zip_bytes(&config.name, bytes, cache).await?)
}

/// Downloads and parses `config.gtfs_url`'s bundle, publishing the resulting
/// snapshot onto `feed`. A download lock serializes concurrent downloads of
/// the same bundle across processes sharing the cache root (spec §5).
///
/// When `gtfs_url` is unset the adapter has nothing to download (e.g. a
/// provider configured for real-time endpoints only during development);
/// this is logged, not an error, and the feed simply stays `Empty`.
pub async fn load_once(config: &ProviderConfig, cache: &CacheStore, http: &reqwest::Client, feed: &Feed) -> Result<()> {
    let Some(url) = config.gtfs_url.clone() else {
        log::warn!("{}: no GTFS_URL configured, feed stays empty", config.name);
        return Ok(());
    };

    feed.begin_load();

    let lock = cache.acquire_download_lock(&format!("{}_gtfs_download", config.name), 3600).await?;
    let result = download_and_parse(config, http, cache, &url).await;
    lock.release();

    match result {
        Ok(loaded) => {
            log::info!(
                "{}: GTFS feed ready ({} stops, {} routes, {} trips, from_cache={})",
                config.name,
                loaded.snapshot.stop_count(),
                loaded.snapshot.route_count(),
                loaded.snapshot.trip_count(),
                loaded.from_cache,
            );
            feed.publish(loaded.snapshot);
            Ok(())
        }
        Err(e) => {
            log::error!("{}: GTFS reload failed, keeping previous snapshot: {e}", config.name);
            feed.fail_load();
            Err(e)
        }
    }
}

/// Runs forever: reload the bundle every `gtfs_cache_ttl`. A failed reload is
/// logged and retried on the next tick rather than propagated — C4's
/// contract is that a bad reload never tears down an already-`Ready` feed.
pub async fn keep_feed_fresh(config: ProviderConfig, cache: CacheStore, http: reqwest::Client, feed: Arc<Feed>) {
    loop {
        if let Err(e) = load_once(&config, &cache, &http, &feed).await {
            log::warn!("{}: GTFS reload error: {e}", config.name);
        }
        tokio::time::sleep(config.gtfs_cache_ttl).await;
    }
}
