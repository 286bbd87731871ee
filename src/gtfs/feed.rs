//! In-memory representation of a loaded GTFS bundle: flat arenas plus the
//! indices every query component (C5, C7, C11, C12) reads against, and the
//! `Empty -> Loading -> Ready -> Reloading -> Ready` lifecycle around it
//! (spec §4.12/§9: no object-graph cycles, publish-then-swap).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use super::calendar::CalendarIndex;
use super::translations::TranslationIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coordinates: Option<(f64, f64)>,
    pub parent_station: Option<String>,
    pub location_type: super::structure::LocationType,
    pub platform_code: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub short_name: String,
    pub long_name: String,
    pub route_type: super::structure::RouteType,
    /// `#RRGGBB`, uppercase, normalized on ingest.
    pub color: String,
    pub text_color: String,
    pub trip_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    pub direction_id: Option<u8>,
    pub headsign: Option<String>,
    pub shape_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTime {
    pub stop_sequence: u16,
    pub stop_id: String,
    pub arrival_time: Option<u32>,
    pub departure_time: Option<u32>,
    pub headsign: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    /// Points in `(lat, lon)` order internally; the wire format exposes
    /// `[lon, lat]` per spec §9's preserved GeoJSON convention.
    pub points: Vec<(f64, f64)>,
}

/// Canonical ordered stop list + shape for one route direction (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteVariant {
    pub route_id: String,
    pub direction_id: Option<u8>,
    pub representative_trip_id: String,
    pub stop_ids: Vec<String>,
    pub shape_id: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agency {
    pub id: Option<String>,
    pub name: String,
    pub timezone: String,
}

/// An immutable, fully indexed snapshot of one loaded GTFS bundle.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub stops_by_id: HashMap<String, Stop>,
    pub routes_by_id: HashMap<String, Route>,
    pub trips_by_id: HashMap<String, Trip>,
    pub trips_by_route: HashMap<String, Vec<String>>,
    pub trips_by_service: HashMap<String, Vec<String>>,
    pub stop_times_by_trip: HashMap<String, Vec<StopTime>>,
    pub shapes_by_id: HashMap<String, Shape>,
    pub agencies: Vec<Agency>,
    pub calendar: CalendarIndex,
    pub translations: TranslationIndex,
    pub route_variants: HashMap<String, Vec<RouteVariant>>,
    pub content_hash: String,
}

impl FeedSnapshot {
    pub fn stop_count(&self) -> usize {
        self.stops_by_id.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes_by_id.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips_by_id.len()
    }

    /// Timezone to use for "now" conversions for this feed's agency. Falls
    /// back to UTC with a caller-visible warning (open question, spec §9).
    pub fn agency_timezone(&self) -> (String, Option<String>) {
        match self.agencies.first() {
            Some(agency) if !agency.timezone.is_empty() => (agency.timezone.clone(), None),
            _ => (
                "UTC".to_string(),
                Some("agency timezone missing, defaulting to UTC".to_string()),
            ),
        }
    }

    /// Picks, for each `(route_id, direction_id)`, the trip with the most
    /// stop_times as the representative for that direction (spec §4.4 step 5).
    pub fn derive_route_variants(&mut self) {
        let mut by_key: HashMap<(String, Option<u8>), (String, usize)> = HashMap::new();

        for trip in self.trips_by_id.values() {
            let stop_time_count = self
                .stop_times_by_trip
                .get(&trip.id)
                .map(|v| v.len())
                .unwrap_or(0);
            let key = (trip.route_id.clone(), trip.direction_id);
            let better = match by_key.get(&key) {
                Some((_, count)) => stop_time_count > *count,
                None => true,
            };
            if better {
                by_key.insert(key, (trip.id.clone(), stop_time_count));
            }
        }

        let mut route_variants: HashMap<String, Vec<RouteVariant>> = HashMap::new();
        for ((route_id, direction_id), (trip_id, _)) in by_key {
            let Some(trip) = self.trips_by_id.get(&trip_id) else {
                continue;
            };
            let stop_ids = self
                .stop_times_by_trip
                .get(&trip_id)
                .map(|sts| sts.iter().map(|st| st.stop_id.clone()).collect())
                .unwrap_or_default();
            let destination = self
                .stop_times_by_trip
                .get(&trip_id)
                .and_then(|sts| sts.last())
                .and_then(|st| self.stops_by_id.get(&st.stop_id))
                .map(|s| s.name.clone())
                .or_else(|| trip.headsign.clone());

            route_variants.entry(route_id.clone()).or_default().push(RouteVariant {
                route_id,
                direction_id,
                representative_trip_id: trip_id,
                stop_ids,
                shape_id: trip.shape_id.clone(),
                destination,
            });
        }

        self.route_variants = route_variants;
    }

    pub fn variant_for(&self, route_id: &str, direction_id: Option<u8>) -> Option<&RouteVariant> {
        self.route_variants
            .get(route_id)?
            .iter()
            .find(|v| v.direction_id == direction_id)
    }

    pub fn shape_points(&self, shape_id: &str) -> Option<&[(f64, f64)]> {
        self.shapes_by_id.get(shape_id).map(|s| s.points.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Empty,
    Loading,
    Ready,
    Reloading,
}

impl From<u8> for FeedStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => FeedStatus::Loading,
            2 => FeedStatus::Ready,
            3 => FeedStatus::Reloading,
            _ => FeedStatus::Empty,
        }
    }
}

impl From<FeedStatus> for u8 {
    fn from(s: FeedStatus) -> u8 {
        match s {
            FeedStatus::Empty => 0,
            FeedStatus::Loading => 1,
            FeedStatus::Ready => 2,
            FeedStatus::Reloading => 3,
        }
    }
}

/// Holds the current immutable snapshot behind a lock-free pointer swap, plus
/// a status word for `/health`-style observability of the lifecycle.
#[derive(Default)]
pub struct Feed {
    current: ArcSwapOption<FeedSnapshot>,
    status: AtomicU8,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus::from(self.status.load(Ordering::Acquire))
    }

    /// Readers never block: they get whatever was last published, or `None`
    /// before the first successful load (spec §4.12: "Queries served only
    /// in Ready").
    pub fn snapshot(&self) -> Option<Arc<FeedSnapshot>> {
        if self.status() == FeedStatus::Empty {
            return None;
        }
        self.current.load_full()
    }

    pub fn begin_load(&self) {
        let next = if self.current.load().is_some() {
            FeedStatus::Reloading
        } else {
            FeedStatus::Loading
        };
        self.status.store(next.into(), Ordering::Release);
    }

    /// Publishes a freshly built snapshot and atomically swaps the pointer.
    pub fn publish(&self, snapshot: FeedSnapshot) {
        self.current.store(Some(Arc::new(snapshot)));
        self.status.store(FeedStatus::Ready.into(), Ordering::Release);
    }

    /// A failed reload keeps the previous `Ready` snapshot in place (spec
    /// §4.4 `MalformedFeed` handling, §4.12 lifecycle note).
    pub fn fail_load(&self) {
        let status = if self.current.load().is_some() {
            FeedStatus::Ready
        } else {
            FeedStatus::Empty
        };
        self.status.store(status.into(), Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_feed_serves_no_snapshot() {
        let feed = Feed::new();
        assert_eq!(feed.status(), FeedStatus::Empty);
        assert!(feed.snapshot().is_none());
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let feed = Feed::new();
        feed.begin_load();
        feed.publish(FeedSnapshot::default());
        assert_eq!(feed.status(), FeedStatus::Ready);

        feed.begin_load();
        assert_eq!(feed.status(), FeedStatus::Reloading);
        let before = feed.snapshot().unwrap().content_hash.clone();

        feed.fail_load();
        assert_eq!(feed.status(), FeedStatus::Ready);
        assert_eq!(feed.snapshot().unwrap().content_hash, before);
    }
}
