//! Schedule Query Engine (C11): read-only lookups against an immutable
//! [`FeedSnapshot`] — trip segments, stops in a bounding box, reachability
//! sets, and scheduled waiting times (spec §4.11).

use chrono::NaiveDate;
use serde::Serialize;

use super::feed::{FeedSnapshot, Route, Stop};

#[derive(Debug, Clone, Serialize)]
pub struct TripSegmentStop {
    pub stop_id: String,
    pub name: String,
    pub arrival_time: Option<u32>,
    pub departure_time: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripSegment {
    pub trip_id: String,
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
    pub stops: Vec<TripSegmentStop>,
    pub duration_seconds: Option<u32>,
    /// `true` if `start_id` precedes `end_id` in the trip's native stop
    /// ordering; `false` when the request asked for the reverse.
    pub native_direction: bool,
}

/// `find_trips_between`: every trip whose stop_times include both stops with
/// `start` preceding `end` (native direction) or vice versa (reverse,
/// reported via `native_direction: false`), optionally filtered to trips
/// whose service operates on `date`.
pub fn find_trips_between(
    snapshot: &FeedSnapshot,
    start_id: &str,
    end_id: &str,
    date: Option<NaiveDate>,
) -> Vec<TripSegment> {
    let mut results = Vec::new();

    for trip in snapshot.trips_by_id.values() {
        if let Some(date) = date {
            if !snapshot.calendar.operates_on(&trip.service_id, date) {
                continue;
            }
        }

        let Some(stop_times) = snapshot.stop_times_by_trip.get(&trip.id) else {
            continue;
        };

        let start_pos = stop_times.iter().position(|st| st.stop_id == start_id);
        let end_pos = stop_times.iter().position(|st| st.stop_id == end_id);

        let (Some(start_pos), Some(end_pos)) = (start_pos, end_pos) else {
            continue;
        };
        if start_pos == end_pos {
            continue;
        }

        let native_direction = start_pos < end_pos;
        let (lo, hi) = if native_direction {
            (start_pos, end_pos)
        } else {
            (end_pos, start_pos)
        };

        let mut segment: Vec<_> = stop_times[lo..=hi].to_vec();
        if !native_direction {
            segment.reverse();
        }

        let Some(route) = snapshot.routes_by_id.get(&trip.route_id) else {
            continue;
        };

        let duration_seconds = match (segment.first(), segment.last()) {
            (Some(first), Some(last)) => {
                let depart = first.departure_time.or(first.arrival_time);
                let arrive = last.arrival_time.or(last.departure_time);
                match (depart, arrive) {
                    (Some(d), Some(a)) if a >= d => Some(a - d),
                    _ => None,
                }
            }
            _ => None,
        };

        let stops = segment
            .iter()
            .map(|st| TripSegmentStop {
                stop_id: st.stop_id.clone(),
                name: snapshot
                    .stops_by_id
                    .get(&st.stop_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default(),
                arrival_time: st.arrival_time,
                departure_time: st.departure_time,
            })
            .collect();

        results.push(TripSegment {
            trip_id: trip.id.clone(),
            route_id: route.id.clone(),
            route_short_name: route.short_name.clone(),
            route_long_name: route.long_name.clone(),
            stops,
            duration_seconds,
            native_direction,
        });
    }

    results
}

#[derive(Debug, Clone, Serialize)]
pub struct StopsInBbox {
    pub count: usize,
    pub stops: Vec<Stop>,
}

/// `stations_in_bbox`: linear scan of every stop with coordinates inside the
/// box. `count_only` skips materializing the stop list.
pub fn stations_in_bbox(
    snapshot: &FeedSnapshot,
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
    count_only: bool,
) -> StopsInBbox {
    let matches: Vec<&Stop> = snapshot
        .stops_by_id
        .values()
        .filter(|s| match s.coordinates {
            Some((lat, lon)) => lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon,
            None => false,
        })
        .collect();

    let count = matches.len();
    let stops = if count_only {
        Vec::new()
    } else {
        matches.into_iter().cloned().collect()
    };

    StopsInBbox { count, stops }
}

/// `destinations_from` / `origins_to`: stops reachable forward or backward
/// along any route through `stop_id`, deduplicated.
pub fn reachable_stops(snapshot: &FeedSnapshot, stop_id: &str, forward: bool) -> Vec<Stop> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for stop_times in snapshot.stop_times_by_trip.values() {
        let Some(pos) = stop_times.iter().position(|st| st.stop_id == stop_id) else {
            continue;
        };

        let range: Vec<&super::feed::StopTime> = if forward {
            stop_times[pos + 1..].iter().collect()
        } else if pos > 0 {
            stop_times[..pos].iter().collect()
        } else {
            Vec::new()
        };

        for st in range {
            if seen.insert(st.stop_id.clone()) {
                if let Some(stop) = snapshot.stops_by_id.get(&st.stop_id) {
                    out.push(stop.clone());
                }
            }
        }
    }

    out
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteServing {
    pub route: Route,
    pub direction_id: Option<u8>,
    pub first_stop_name: String,
    pub last_stop_name: String,
    pub service_calendar: String,
}

/// `routes_serving`: one summary per `(route, direction)` variant whose
/// stop list contains `stop_id`.
pub fn routes_serving(snapshot: &FeedSnapshot, stop_id: &str) -> Vec<RouteServing> {
    let mut out = Vec::new();

    for variants in snapshot.route_variants.values() {
        for variant in variants {
            if !variant.stop_ids.iter().any(|s| s == stop_id) {
                continue;
            }
            let Some(route) = snapshot.routes_by_id.get(&variant.route_id) else {
                continue;
            };
            let Some(trip) = snapshot.trips_by_id.get(&variant.representative_trip_id) else {
                continue;
            };

            let first_stop_name = variant
                .stop_ids
                .first()
                .and_then(|id| snapshot.stops_by_id.get(id))
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let last_stop_name = variant
                .stop_ids
                .last()
                .and_then(|id| snapshot.stops_by_id.get(id))
                .map(|s| s.name.clone())
                .unwrap_or_default();

            let days = snapshot.calendar.valid_calendar_days(&[trip.service_id.as_str()]);
            let service_calendar = super::calendar::service_days_string(&days);

            out.push(RouteServing {
                route: route.clone(),
                direction_id: variant.direction_id,
                first_stop_name,
                last_stop_name,
                service_calendar,
            });
        }
    }

    out
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledArrival {
    pub route_id: String,
    pub trip_id: String,
    pub headsign: Option<String>,
    pub scheduled_time_seconds: u32,
    pub minutes_until: i64,
}

/// `waiting_times_from_schedule`: every stop_time at `stop_id` (optionally
/// restricted to `route_id`) whose owning trip operates "today" relative to
/// `at_time`, with `minutes_until` computed from `arrival_time`. Entries
/// with `minutes_until < -2` are dropped (spec §4.9), results sorted
/// ascending and capped to `limit`.
pub fn waiting_times_from_schedule(
    snapshot: &FeedSnapshot,
    stop_id: &str,
    at_date: NaiveDate,
    at_seconds_since_midnight: u32,
    route_id: Option<&str>,
    limit: usize,
) -> Vec<ScheduledArrival> {
    let mut out = Vec::new();

    for (trip_id, stop_times) in &snapshot.stop_times_by_trip {
        let Some(trip) = snapshot.trips_by_id.get(trip_id) else {
            continue;
        };
        if let Some(route_id) = route_id {
            if trip.route_id != route_id {
                continue;
            }
        }
        if !snapshot.calendar.operates_on(&trip.service_id, at_date) {
            continue;
        }

        for st in stop_times {
            if st.stop_id != stop_id {
                continue;
            }
            let Some(scheduled) = st.arrival_time.or(st.departure_time) else {
                continue;
            };
            let minutes_until = (scheduled as i64 - at_seconds_since_midnight as i64) / 60;
            if minutes_until < -2 {
                continue;
            }
            out.push(ScheduledArrival {
                route_id: trip.route_id.clone(),
                trip_id: trip.id.clone(),
                headsign: trip.headsign.clone(),
                scheduled_time_seconds: scheduled,
                minutes_until,
            });
        }
    }

    out.sort_by_key(|a| a.minutes_until);
    out.truncate(limit);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gtfs::feed::{Route, StopTime, Trip};
    use crate::gtfs::structure::RouteType;
    use std::collections::HashMap;

    fn snapshot_with_one_trip() -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::default();
        snapshot.routes_by_id.insert(
            "R1".to_string(),
            Route {
                id: "R1".to_string(),
                short_name: "1".to_string(),
                long_name: "Line One".to_string(),
                route_type: RouteType::Tram,
                color: "FFFFFF".to_string(),
                text_color: "000000".to_string(),
                trip_ids: vec!["T1".to_string()],
            },
        );
        snapshot.trips_by_id.insert(
            "T1".to_string(),
            Trip {
                id: "T1".to_string(),
                route_id: "R1".to_string(),
                service_id: "S1".to_string(),
                direction_id: Some(0),
                headsign: Some("Downtown".to_string()),
                shape_id: None,
            },
        );
        snapshot.stop_times_by_trip.insert(
            "T1".to_string(),
            vec![
                StopTime {
                    stop_sequence: 1,
                    stop_id: "A".to_string(),
                    arrival_time: Some(100),
                    departure_time: Some(100),
                    headsign: None,
                },
                StopTime {
                    stop_sequence: 2,
                    stop_id: "B".to_string(),
                    arrival_time: Some(200),
                    departure_time: Some(200),
                    headsign: None,
                },
                StopTime {
                    stop_sequence: 3,
                    stop_id: "C".to_string(),
                    arrival_time: Some(400),
                    departure_time: Some(400),
                    headsign: None,
                },
            ],
        );
        let mut by_service_id = HashMap::new();
        by_service_id.insert(
            "S1".to_string(),
            crate::gtfs::calendar::ServiceCalendar {
                regular: None,
                exceptions: vec![crate::gtfs::structure::GtfsCalendarDate {
                    service_id: "S1".to_string(),
                    date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                    exception_type: crate::gtfs::structure::Exception::Added,
                }],
            },
        );
        snapshot.calendar = crate::gtfs::calendar::CalendarIndex { by_service_id };
        snapshot
    }

    #[test]
    fn finds_native_direction_segment() {
        let snapshot = snapshot_with_one_trip();
        let segments = find_trips_between(&snapshot, "A", "C", None);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].native_direction);
        assert_eq!(segments[0].stops.len(), 3);
        assert_eq!(segments[0].duration_seconds, Some(300));
    }

    #[test]
    fn finds_reverse_direction_segment() {
        let snapshot = snapshot_with_one_trip();
        let segments = find_trips_between(&snapshot, "C", "A", None);
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].native_direction);
        assert_eq!(segments[0].stops[0].stop_id, "C");
        assert_eq!(segments[0].stops.last().unwrap().stop_id, "A");
    }

    #[test]
    fn date_filter_excludes_non_operating_trips() {
        let snapshot = snapshot_with_one_trip();
        let unmatched_date = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        assert!(find_trips_between(&snapshot, "A", "C", Some(unmatched_date)).is_empty());

        let matched_date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(find_trips_between(&snapshot, "A", "C", Some(matched_date)).len(), 1);
    }

    #[test]
    fn waiting_times_drops_arrivals_too_far_in_the_past() {
        let snapshot = snapshot_with_one_trip();
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let arrivals = waiting_times_from_schedule(&snapshot, "C", date, 401, None, 10);
        // 400 - 401 = -1s => 0 minutes rounded toward zero, within -2 minute tolerance.
        assert_eq!(arrivals.len(), 1);

        let arrivals = waiting_times_from_schedule(&snapshot, "C", date, 400 + 61 * 3, None, 10);
        assert!(arrivals.is_empty());
    }
}
