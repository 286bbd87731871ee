//! Fixtures shared across module test suites: env/logger bootstrap plus a
//! minimal in-memory [`Feed`] and a fake [`ProviderAdapter`], mirroring the
//! teacher's `test_utils.rs` init-and-build-a-fixture shape.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::AppResult;
use crate::gtfs::feed::{Feed, FeedSnapshot, Route, Shape, Stop, StopTime, Trip};
use crate::gtfs::structure::{LocationType, RouteType};
use crate::providers::{Colors, Endpoint, ProviderAdapter};

pub fn init() {
    dotenvy::from_filename(".env").ok();
    env_logger::try_init().ok();
}

/// A two-stop, one-route, one-trip, one-shape feed: `stop_a` -> `stop_b` on
/// line `"1"`, a 500 m north-south shape. Enough for C7/C8/C11/C12 tests that
/// need a snapshot without downloading a real GTFS bundle.
pub fn fixture_snapshot() -> FeedSnapshot {
    let mut snapshot = FeedSnapshot::default();

    snapshot.stops_by_id.insert(
        "stop_a".to_string(),
        Stop {
            id: "stop_a".to_string(),
            name: "Stop A".to_string(),
            coordinates: Some((50.8503, 4.3517)),
            parent_station: None,
            location_type: LocationType::StopOrPlatform,
            platform_code: None,
            timezone: None,
        },
    );
    snapshot.stops_by_id.insert(
        "stop_b".to_string(),
        Stop {
            id: "stop_b".to_string(),
            name: "Stop B".to_string(),
            coordinates: Some((50.8548, 4.3517)),
            parent_station: None,
            location_type: LocationType::StopOrPlatform,
            platform_code: None,
            timezone: None,
        },
    );

    snapshot.routes_by_id.insert(
        "1".to_string(),
        Route {
            id: "1".to_string(),
            short_name: "1".to_string(),
            long_name: "Stop A - Stop B".to_string(),
            route_type: RouteType::Tram,
            color: "FF0000".to_string(),
            text_color: "FFFFFF".to_string(),
            trip_ids: vec!["trip_1".to_string()],
        },
    );

    snapshot.trips_by_id.insert(
        "trip_1".to_string(),
        Trip {
            id: "trip_1".to_string(),
            route_id: "1".to_string(),
            service_id: "weekdays".to_string(),
            direction_id: Some(0),
            headsign: Some("Stop B".to_string()),
            shape_id: Some("shape_1".to_string()),
        },
    );
    snapshot.trips_by_route.entry("1".to_string()).or_default().push("trip_1".to_string());
    snapshot.trips_by_service.entry("weekdays".to_string()).or_default().push("trip_1".to_string());

    snapshot.stop_times_by_trip.insert(
        "trip_1".to_string(),
        vec![
            StopTime { stop_sequence: 0, stop_id: "stop_a".to_string(), arrival_time: Some(8 * 3600), departure_time: Some(8 * 3600), headsign: None },
            StopTime {
                stop_sequence: 1,
                stop_id: "stop_b".to_string(),
                arrival_time: Some(8 * 3600 + 600),
                departure_time: Some(8 * 3600 + 600),
                headsign: None,
            },
        ],
    );

    snapshot
        .shapes_by_id
        .insert("shape_1".to_string(), Shape { id: "shape_1".to_string(), points: vec![(50.8503, 4.3517), (50.8548, 4.3517)] });

    snapshot.derive_route_variants();
    snapshot
}

pub fn fixture_feed() -> Arc<Feed> {
    let feed = Feed::new();
    feed.begin_load();
    feed.publish(fixture_snapshot());
    Arc::new(feed)
}

/// A provider adapter with no real upstream, useful for registry/dispatch
/// tests: `colors()` is the only implemented capability, everything else
/// falls through to `ProviderAdapter`'s default "unsupported" 404.
pub struct FakeAdapter {
    pub config: ProviderConfig,
}

impl FakeAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            config: ProviderConfig {
                name: name.to_string(),
                api_url: None,
                api_key: None,
                gtfs_url: None,
                gtfs_realtime_url: None,
                monitored_lines: vec!["1".to_string()],
                stop_ids: vec!["stop_a".to_string()],
                rate_limit_delay: std::time::Duration::from_millis(10),
                gtfs_cache_ttl: std::time::Duration::from_secs(3600),
                available_languages: vec!["en".to_string()],
                default_timezone: "UTC".to_string(),
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn capabilities(&self) -> &'static [Endpoint] {
        &[Endpoint::Colors]
    }

    async fn colors(&self, _line: &str) -> AppResult<Colors> {
        Ok(Colors::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixture_snapshot_derives_one_route_variant() {
        let snapshot = fixture_snapshot();
        assert_eq!(snapshot.stop_count(), 2);
        assert_eq!(snapshot.route_count(), 1);
        assert!(snapshot.variant_for("1", Some(0)).is_some());
    }
}
