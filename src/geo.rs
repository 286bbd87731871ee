//! Pure geometric helpers shared by the shape index (C7) and the vehicle
//! position reconstructor (C8). Kept dependency-light and allocation-free:
//! most call sites run once per stop/shape point at load time or once per
//! telemetry update, so these need to be cheap.

use geo::{HaversineDestination, Point, Rect};

const EARTH_RADIUS_METRES: f64 = 6_371_000.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

fn check(lat: f64, lon: f64) -> Result<(), GeoError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) || !lat.is_finite() || !lon.is_finite() {
        return Err(GeoError::InvalidCoordinates { lat, lon });
    }
    Ok(())
}

/// Great-circle distance between two (lat, lon) points, in metres.
pub fn haversine_distance(a: (f64, f64), b: (f64, f64)) -> Result<f64, GeoError> {
    check(a.0, a.1)?;
    check(b.0, b.1)?;

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    Ok(EARTH_RADIUS_METRES * 2.0 * h.sqrt().asin())
}

/// Initial bearing from `a` to `b`, in degrees, normalized to [0, 360).
pub fn bearing(a: (f64, f64), b: (f64, f64)) -> Result<f64, GeoError> {
    check(a.0, a.1)?;
    check(b.0, b.1)?;

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlon = lon2 - lon1;
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let deg = y.atan2(x).to_degrees();

    Ok((deg + 360.0) % 360.0)
}

/// Planar-approximation distance from a point to a line segment. Valid only
/// for segments shorter than ~2km (the curvature of the earth is ignored),
/// which is sufficient for matching a stop to its nearest shape vertex.
pub fn point_to_segment_distance(
    p: (f64, f64),
    seg_a: (f64, f64),
    seg_b: (f64, f64),
) -> Result<f64, GeoError> {
    check(p.0, p.1)?;
    check(seg_a.0, seg_a.1)?;
    check(seg_b.0, seg_b.1)?;

    // Treat lat/lon as planar (x=lon, y=lat), scaling lon by cos(lat) so
    // metres-per-degree is roughly uniform in both axes near `p`.
    let lat_scale = p.0.to_radians().cos().max(1e-6);
    let to_xy = |pt: (f64, f64)| -> (f64, f64) { (pt.1 * lat_scale, pt.0) };

    let (px, py) = to_xy(p);
    let (ax, ay) = to_xy(seg_a);
    let (bx, by) = to_xy(seg_b);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (ax + t * dx, ay + t * dy);
    let (ddx, ddy) = (px - cx, py - cy);
    let degrees_dist = (ddx * ddx + ddy * ddy).sqrt();

    // convert back from "scaled degrees" to metres using the same
    // haversine-derived metres-per-degree-latitude constant.
    let metres_per_degree = EARTH_RADIUS_METRES.to_radians();
    Ok(degrees_dist * metres_per_degree)
}

/// Axis-aligned bounding box big enough to contain a circle of radius
/// `min_radius_metres` centred on `center`. Used to pre-filter stops near a
/// point before an exact haversine check (the search index, C12).
pub fn get_bounding_box(center: Point, min_radius_metres: f64) -> Rect {
    // pythagoras: a box whose corner is `min_radius_metres` away in every
    // direction comfortably contains the circle.
    let r_2 = min_radius_metres.powi(2);
    let corner_distance = (r_2 * 2.0).sqrt();

    Rect::new(
        // top left
        center.haversine_destination(315., corner_distance),
        // bottom right
        center.haversine_destination(135., corner_distance),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_bounding_box() {
        let center = Point::new(174.0, -36.0);
        let min_radius_metres = 2000.0;

        let bounding_box = get_bounding_box(center, min_radius_metres);
        assert!(bounding_box.min().x < center.x());
        assert!(bounding_box.max().x > center.x());
    }

    #[test]
    fn haversine_known_distance() {
        // Brussels STIB stop 8122 vicinity, roughly 1km north
        let a = (50.8466, 4.4022);
        let b = (50.8556, 4.4022);
        let d = haversine_distance(a, b).unwrap();
        assert!((d - 1000.0).abs() < 20.0, "distance was {d}");
    }

    #[test]
    fn bearing_due_north_is_zero() {
        let a = (50.0, 4.0);
        let b = (51.0, 4.0);
        let b_deg = bearing(a, b).unwrap();
        assert!(b_deg < 1.0 || b_deg > 359.0, "bearing was {b_deg}");
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let err = haversine_distance((91.0, 0.0), (0.0, 0.0)).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinates { .. }));
    }

    #[test]
    fn point_to_segment_distance_endpoint_clamp() {
        // point beyond segment end should measure to the end point
        let seg_a = (50.0, 4.0);
        let seg_b = (50.001, 4.0);
        let p = (50.002, 4.0);
        let d = point_to_segment_distance(p, seg_a, seg_b).unwrap();
        let expected = haversine_distance(p, seg_b).unwrap();
        assert!((d - expected).abs() < 1.0);
    }
}
