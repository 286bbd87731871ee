//! Nearest-Stop & Search Index (C12): geospatial nearest-N stops and
//! substring stop-name search across the default name and every translation
//! (spec §4.12).

use geo::Point;
use serde::Serialize;

use crate::geo::{get_bounding_box, haversine_distance, GeoError};

use super::feed::{FeedSnapshot, Stop};

#[derive(Debug, Clone, Serialize)]
pub struct NearbyStop {
    pub stop: Stop,
    pub distance_m: f64,
}

/// Linear distance scan over every stop with coordinates, ordered by
/// ascending distance, capped to `limit` and `max_distance_km`. A bounding
/// box around `(lat, lon)` (C3's `get_bounding_box`) skips the haversine
/// call entirely for stops that cannot possibly be within range.
pub fn nearest_stops(
    snapshot: &FeedSnapshot,
    lat: f64,
    lon: f64,
    limit: usize,
    max_distance_km: f64,
) -> Result<Vec<NearbyStop>, GeoError> {
    let max_distance_m = max_distance_km * 1000.0;
    let bbox = get_bounding_box(Point::new(lon, lat), max_distance_m);
    let mut candidates = Vec::new();

    for stop in snapshot.stops_by_id.values() {
        let Some(coords) = stop.coordinates else {
            continue;
        };
        let (stop_lat, stop_lon) = coords;
        if stop_lon < bbox.min().x || stop_lon > bbox.max().x || stop_lat < bbox.min().y || stop_lat > bbox.max().y {
            continue;
        }
        let distance_m = haversine_distance((lat, lon), coords)?;
        if distance_m <= max_distance_m {
            candidates.push(NearbyStop {
                stop: stop.clone(),
                distance_m,
            });
        }
    }

    candidates.sort_by(|a, b| a.distance_m.partial_cmp(&b.distance_m).unwrap());
    candidates.truncate(limit);
    Ok(candidates)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Prefix,
    Substring,
}

/// Case-insensitive substring match across a stop's default name and every
/// translated name. Prefix hits outrank substring hits; within the same rank,
/// shorter names sort first.
pub fn stops_by_name(snapshot: &FeedSnapshot, query: &str, limit: usize) -> Vec<Stop> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<(MatchRank, usize, Stop)> = Vec::new();

    for stop in snapshot.stops_by_id.values() {
        let mut names: Vec<&str> = vec![stop.name.as_str()];
        if let Some(translations) = snapshot.translations.for_stop(&stop.id) {
            names.extend(translations.values().map(|s| s.as_str()));
        }

        let best_rank = names.iter().filter_map(|name| {
            let lower = name.to_lowercase();
            if lower.starts_with(&needle) {
                Some(MatchRank::Prefix)
            } else if lower.contains(&needle) {
                Some(MatchRank::Substring)
            } else {
                None
            }
        }).min();

        if let Some(rank) = best_rank {
            matches.push((rank, stop.name.len(), stop.clone()));
        }
    }

    matches.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    matches.truncate(limit);
    matches.into_iter().map(|(_, _, stop)| stop).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gtfs::feed::Stop;

    fn stop(id: &str, name: &str, coords: Option<(f64, f64)>) -> Stop {
        Stop {
            id: id.to_string(),
            name: name.to_string(),
            coordinates: coords,
            parent_station: None,
            location_type: Default::default(),
            platform_code: None,
            timezone: None,
        }
    }

    fn snapshot_with_stops() -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::default();
        snapshot.stops_by_id.insert("A".to_string(), stop("A", "Central Station", Some((50.8466, 4.3528))));
        snapshot.stops_by_id.insert("B".to_string(), stop("B", "Central Park", Some((50.8466, 4.3628))));
        snapshot.stops_by_id.insert("C".to_string(), stop("C", "Far Away", Some((51.5, 5.0))));
        snapshot
    }

    #[test]
    fn nearest_stops_orders_by_ascending_distance() {
        let snapshot = snapshot_with_stops();
        let found = nearest_stops(&snapshot, 50.8466, 4.3528, 10, 50.0).unwrap();
        assert_eq!(found[0].stop.id, "A");
        assert!(found[0].distance_m < found[1].distance_m);
    }

    #[test]
    fn max_distance_filters_out_far_stops() {
        let snapshot = snapshot_with_stops();
        let found = nearest_stops(&snapshot, 50.8466, 4.3528, 10, 1.0).unwrap();
        assert!(!found.iter().any(|s| s.stop.id == "C"));
    }

    #[test]
    fn prefix_hits_outrank_substring_hits() {
        let snapshot = snapshot_with_stops();
        let found = stops_by_name(&snapshot, "central", 10);
        assert_eq!(found.len(), 2);
        // Both are prefix hits ("Central ..."); shorter name ("Central Park"
        // and "Central Station" are same length) falls back to insertion
        // order, so just check both appear and a non-match doesn't.
        assert!(found.iter().any(|s| s.id == "A"));
        assert!(found.iter().any(|s| s.id == "B"));
    }

    #[test]
    fn substring_match_on_translation() {
        let mut snapshot = snapshot_with_stops();
        snapshot.translations = crate::gtfs::translations::TranslationIndex::build_from_table(vec![
            crate::gtfs::translations::TableTranslation {
                table_name: "stops".to_string(),
                field_name: "stop_name".to_string(),
                language: "fr".to_string(),
                translation: "Gare Centrale".to_string(),
                record_id: Some("C".to_string()),
                field_value: None,
            },
        ]);

        let found = stops_by_name(&snapshot, "gare", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "C");
    }
}
