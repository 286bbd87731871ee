//! Vehicle Position Reconstructor (C8): fuses a provider's "next stop +
//! distance" telemetry with the shape/stop geometry index (C7) to produce a
//! map-ready interpolated position and bearing (spec §4.8).

use serde::Serialize;

use super::feed::FeedSnapshot;
use super::shape_index::{index_stop_on_shape, segment_length, walk_to_fraction};

/// How a provider identifies a trip's direction; adapters translate their
/// operator-specific enum into one of these before calling [`resolve_direction`].
#[derive(Debug, Clone)]
pub enum DirectionKey {
    Id(u8),
    TerminusStopId(String),
    Headsign(String),
}

/// Raw telemetry as normalized by a provider adapter (spec §3 "Vehicle
/// Telemetry (raw)").
#[derive(Debug, Clone)]
pub struct VehicleTelemetry {
    pub provider: String,
    pub line_id: String,
    pub direction: DirectionKey,
    pub next_stop_id: String,
    pub distance_to_next_stop_m: f64,
    pub delay_seconds: Option<i32>,
}

/// Derived, map-ready vehicle position (spec §3 "Vehicle Position (derived)").
#[derive(Debug, Clone, Serialize)]
pub struct VehiclePosition {
    pub line: String,
    pub direction: Option<u8>,
    pub from_stop: Option<String>,
    pub to_stop: String,
    pub segment_length_m: f64,
    pub distance_to_next_m: f64,
    pub interpolated_latlon: Option<(f64, f64)>,
    pub bearing_deg: Option<f64>,
    pub is_valid: bool,
    /// `[lon, lat]` per point — GeoJSON order, preserved on the wire per
    /// spec §6/§9's documented coordinate-order asymmetry.
    pub shape_segment: Option<Vec<(f64, f64)>>,
}

impl VehiclePosition {
    fn invalid(line: String, direction: Option<u8>, to_stop: String) -> Self {
        Self {
            line,
            direction,
            from_stop: None,
            to_stop,
            segment_length_m: 0.0,
            distance_to_next_m: 0.0,
            interpolated_latlon: None,
            bearing_deg: None,
            is_valid: false,
            shape_segment: None,
        }
    }
}

/// Strips trailing non-digit characters (spec §9: STIB stop-id suffixes like
/// `5710F`/`5710G`).
pub fn strip_suffix(stop_id: &str) -> &str {
    stop_id.trim_end_matches(|c: char| !c.is_ascii_digit())
}

/// Finds `stop_id` in `stop_ids`, falling back to suffix-stripped matching.
/// Returns `(index, warning)` where `warning` is set only when the fallback
/// path was used and still failed, or when the fallback path succeeded but
/// meaningfully differs from an exact match (spec §9 open question).
fn find_stop_index(stop_ids: &[String], stop_id: &str) -> (Option<usize>, Option<String>) {
    if let Some(idx) = stop_ids.iter().position(|s| s == stop_id) {
        return (Some(idx), None);
    }

    let stripped = strip_suffix(stop_id);
    if stripped != stop_id {
        if let Some(idx) = stop_ids.iter().position(|s| strip_suffix(s) == stripped) {
            return (Some(idx), None);
        }
        return (
            None,
            Some(format!(
                "stop id {stop_id:?} has a non-digit suffix and still did not match any stop \
                 after stripping it — upstream may have introduced a semantically significant suffix"
            )),
        );
    }

    (None, None)
}

/// Resolves a provider's direction key against a route's known variants.
pub fn resolve_direction(snapshot: &FeedSnapshot, route_id: &str, key: &DirectionKey) -> Option<u8> {
    let variants = snapshot.route_variants.get(route_id)?;
    match key {
        DirectionKey::Id(id) => Some(*id),
        DirectionKey::TerminusStopId(stop_id) => variants
            .iter()
            .find(|v| v.stop_ids.last().map(|s| s.as_str()) == Some(stop_id.as_str()))
            .and_then(|v| v.direction_id),
        DirectionKey::Headsign(headsign) => variants
            .iter()
            .find(|v| v.destination.as_deref() == Some(headsign.as_str()))
            .and_then(|v| v.direction_id),
    }
}

/// Runs the full reconstruction algorithm (spec §4.8 steps 1-7).
pub fn reconstruct(snapshot: &FeedSnapshot, telemetry: &VehicleTelemetry) -> VehiclePosition {
    let direction_id = resolve_direction(snapshot, &telemetry.line_id, &telemetry.direction);

    let Some(variant) = snapshot.variant_for(&telemetry.line_id, direction_id) else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, telemetry.next_stop_id.clone());
    };

    let (idx, warning) = find_stop_index(&variant.stop_ids, &telemetry.next_stop_id);
    if let Some(w) = warning {
        log::warn!("{w}");
    }

    let Some(idx) = idx else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, telemetry.next_stop_id.clone());
    };
    if idx == 0 {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, telemetry.next_stop_id.clone());
    }

    let from_stop = variant.stop_ids[idx - 1].clone();
    let to_stop = variant.stop_ids[idx].clone();

    let Some(shape_id) = &variant.shape_id else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, to_stop);
    };
    let Some(shape) = snapshot.shape_points(shape_id) else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, to_stop);
    };

    let from_coords = snapshot.stops_by_id.get(&from_stop).and_then(|s| s.coordinates);
    let to_coords = snapshot.stops_by_id.get(&to_stop).and_then(|s| s.coordinates);

    let (Some(from_coords), Some(to_coords)) = (from_coords, to_coords) else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, to_stop);
    };

    let from_idx = index_stop_on_shape(from_coords, shape).ok().flatten();
    let to_idx = index_stop_on_shape(to_coords, shape).ok().flatten();

    let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, to_stop);
    };
    if from_idx > to_idx {
        return VehiclePosition::invalid(telemetry.line_id.clone(), direction_id, to_stop);
    }

    let segment_len = segment_length(shape, from_idx, to_idx).unwrap_or(0.0);
    let distance_to_next = telemetry.distance_to_next_stop_m;

    let mut is_valid = true;
    if segment_len > 0.0 && distance_to_next > 1.2 * segment_len {
        is_valid = false;
    }

    let capped = distance_to_next.min(segment_len).max(0.0);
    let walk_distance = (segment_len - capped).max(0.0);
    let shape_segment = &shape[from_idx..=to_idx];

    let (interpolated_latlon, bearing_deg) = match walk_to_fraction(shape_segment, walk_distance) {
        Ok(Some((pos, bearing))) => (Some(pos), Some(bearing)),
        _ => {
            is_valid = false;
            (None, None)
        }
    };

    VehiclePosition {
        line: telemetry.line_id.clone(),
        direction: direction_id,
        from_stop: Some(from_stop),
        to_stop,
        segment_length_m: segment_len,
        distance_to_next_m: capped,
        interpolated_latlon,
        bearing_deg,
        is_valid,
        // wire order is [lon, lat]; internal storage is (lat, lon).
        shape_segment: Some(shape_segment.iter().map(|(lat, lon)| (*lon, *lat)).collect()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gtfs::feed::{RouteVariant, Shape, Stop};
    use std::collections::HashMap;

    fn test_snapshot() -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::default();

        // 10 points, ~50m apart along a straight line of latitude -> 500m total.
        let points: Vec<(f64, f64)> = (0..10).map(|i| (50.0 + i as f64 * 0.00045, 4.0)).collect();
        snapshot.shapes_by_id.insert(
            "shape1".to_string(),
            Shape {
                id: "shape1".to_string(),
                points,
            },
        );

        snapshot.stops_by_id.insert(
            "from".to_string(),
            Stop {
                id: "from".to_string(),
                name: "From".to_string(),
                coordinates: Some((50.0, 4.0)),
                parent_station: None,
                location_type: Default::default(),
                platform_code: None,
                timezone: None,
            },
        );
        snapshot.stops_by_id.insert(
            "6190".to_string(),
            Stop {
                id: "6190".to_string(),
                name: "To".to_string(),
                coordinates: Some((50.00405, 4.0)),
                parent_station: None,
                location_type: Default::default(),
                platform_code: None,
                timezone: None,
            },
        );

        let mut variants = HashMap::new();
        variants.insert(
            "55".to_string(),
            vec![RouteVariant {
                route_id: "55".to_string(),
                direction_id: Some(0),
                representative_trip_id: "t1".to_string(),
                stop_ids: vec!["from".to_string(), "6190".to_string()],
                shape_id: Some("shape1".to_string()),
                destination: Some("To".to_string()),
            }],
        );
        snapshot.route_variants = variants;

        snapshot
    }

    #[test]
    fn interpolates_vehicle_position_scenario_2() {
        let snapshot = test_snapshot();
        let telemetry = VehicleTelemetry {
            provider: "stib".to_string(),
            line_id: "55".to_string(),
            direction: DirectionKey::Id(0),
            next_stop_id: "6190".to_string(),
            distance_to_next_stop_m: 32.0,
            delay_seconds: None,
        };

        let position = reconstruct(&snapshot, &telemetry);
        assert!(position.is_valid);
        assert!((position.segment_length_m - 500.0).abs() < 10.0);
        let (lat, _lon) = position.interpolated_latlon.unwrap();
        let to_lat = snapshot.stops_by_id["6190"].coordinates.unwrap().0;
        let distance_to_to_stop = crate::geo::haversine_distance((lat, 4.0), (to_lat, 4.0)).unwrap();
        assert!((distance_to_to_stop - 32.0).abs() < 5.0, "distance was {distance_to_to_stop}");
    }

    #[test]
    fn implausible_distance_marks_invalid_but_still_emits() {
        let snapshot = test_snapshot();
        let telemetry = VehicleTelemetry {
            provider: "stib".to_string(),
            line_id: "55".to_string(),
            direction: DirectionKey::Id(0),
            next_stop_id: "6190".to_string(),
            distance_to_next_stop_m: 10_000.0,
            delay_seconds: None,
        };

        let position = reconstruct(&snapshot, &telemetry);
        assert!(!position.is_valid);
        assert!(position.distance_to_next_m <= position.segment_length_m);
    }

    #[test]
    fn strips_letter_suffix_from_stop_ids() {
        assert_eq!(strip_suffix("5710F"), "5710");
        assert_eq!(strip_suffix("5710"), "5710");
    }
}
