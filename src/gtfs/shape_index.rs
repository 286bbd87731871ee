//! Shape/Stop Geometry Index (C7): maps stops onto the nearest vertex of a
//! route polyline and computes cumulative distances and walk-to-fraction
//! positions along it, for the vehicle reconstructor (C8).

use crate::geo::{bearing, haversine_distance, GeoError};

/// Stops are assumed to sit within this distance of their nearest shape
/// vertex (spec §3: "Points are assumed dense enough...").
pub const STOP_TO_SHAPE_MAX_METRES: f64 = 50.0;

/// Finds the index of the shape vertex nearest to `stop_coords`. Returns
/// `None` if the minimum distance exceeds `STOP_TO_SHAPE_MAX_METRES`.
/// Ties (equal distance) resolve to the smaller index.
pub fn index_stop_on_shape(
    stop_coords: (f64, f64),
    shape: &[(f64, f64)],
) -> Result<Option<usize>, GeoError> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, point) in shape.iter().enumerate() {
        let d = haversine_distance(stop_coords, *point)?;
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((idx, d)),
        }
    }
    Ok(best.filter(|(_, d)| *d <= STOP_TO_SHAPE_MAX_METRES).map(|(idx, _)| idx))
}

/// Sums the haversine distance of each consecutive pair of shape points
/// between `start_idx` and `end_idx` inclusive.
pub fn segment_length(shape: &[(f64, f64)], start_idx: usize, end_idx: usize) -> Result<f64, GeoError> {
    if start_idx >= end_idx || end_idx >= shape.len() {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for i in start_idx..end_idx {
        total += haversine_distance(shape[i], shape[i + 1])?;
    }
    Ok(total)
}

/// Walks along `shape_segment` (already sliced to the relevant stop-to-stop
/// range) until the cumulative distance reaches `distance_m`, then linearly
/// interpolates within the containing micro-segment. Bearing is computed
/// from that micro-segment's direction. Falls back to the segment's last
/// point if `distance_m` exceeds the segment's total length.
pub fn walk_to_fraction(
    shape_segment: &[(f64, f64)],
    distance_m: f64,
) -> Result<Option<((f64, f64), f64)>, GeoError> {
    if shape_segment.len() < 2 {
        return Ok(shape_segment.first().map(|p| (*p, 0.0)));
    }

    let mut cumulative = 0.0;
    for window in shape_segment.windows(2) {
        let (p1, p2) = (window[0], window[1]);
        let micro_len = haversine_distance(p1, p2)?;

        if cumulative + micro_len >= distance_m {
            let remaining = distance_m - cumulative;
            let fraction = if micro_len > f64::EPSILON {
                (remaining / micro_len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let lat = p1.0 + (p2.0 - p1.0) * fraction;
            let lon = p1.1 + (p2.1 - p1.1) * fraction;
            let heading = bearing((lat, lon), p2)?;
            return Ok(Some(((lat, lon), heading)));
        }

        cumulative += micro_len;
    }

    // Distance exceeds the segment; return the last point, per the
    // original interpolation logic (never returns None once a segment
    // exists).
    let last = *shape_segment.last().unwrap();
    let prev = shape_segment[shape_segment.len() - 2];
    let heading = bearing(prev, last)?;
    Ok(Some((last, heading)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn finds_nearest_vertex_within_threshold() {
        let shape = vec![(50.0, 4.0), (50.001, 4.0), (50.002, 4.0)];
        let idx = index_stop_on_shape((50.001, 4.0), &shape).unwrap();
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn rejects_stop_far_from_shape() {
        let shape = vec![(50.0, 4.0), (50.001, 4.0)];
        let idx = index_stop_on_shape((51.0, 4.0), &shape).unwrap();
        assert_eq!(idx, None);
    }

    #[test]
    fn walk_to_fraction_interpolates_within_segment() {
        // ~111m per 0.001 degree of latitude near the equator-ish scale used here.
        let shape: Vec<(f64, f64)> = (0..=10).map(|i| (50.0 + i as f64 * 0.0005, 4.0)).collect();
        let total = segment_length(&shape, 0, shape.len() - 1).unwrap();
        let (pos, _bearing) = walk_to_fraction(&shape, total / 2.0).unwrap().unwrap();
        assert!((pos.0 - 50.0025).abs() < 0.001);
    }

    #[test]
    fn walk_to_fraction_falls_back_to_last_point() {
        let shape = vec![(50.0, 4.0), (50.001, 4.0)];
        let (pos, _) = walk_to_fraction(&shape, 1_000_000.0).unwrap().unwrap();
        assert_eq!(pos, (50.001, 4.0));
    }
}
