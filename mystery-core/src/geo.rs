//! Great-circle distance between two positions.

use libm::{atan2, cos, sin, sqrt};

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;

/// Distance in meters between two positions given in decimal degrees.
#[must_use]
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    let sin_dlat = sin(delta_lat / 2.0);
    let sin_dlon = sin(delta_lon / 2.0);
    let a = sin_dlat * sin_dlat + cos(lat1_rad) * cos(lat2_rad) * sin_dlon * sin_dlon;
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = distance_m(35.0, 139.0, 36.0, 139.0);
        assert!((distance - 111_195.0).abs() < 100.0);
    }

    #[test]
    fn identical_positions_are_zero_apart() {
        assert!(distance_m(52.09, 5.12, 52.09, 5.12).abs() < 1e-6);
    }

    #[test]
    fn moving_closer_never_increases_distance() {
        let (target_lat, target_lon) = (52.090_737, 5.121_420);
        let mut previous = f64::MAX;
        for step in 0..=20 {
            let offset = 0.01 * f64::from(20 - step) / 20.0;
            let distance = distance_m(target_lat + offset, target_lon + offset, target_lat, target_lon);
            assert!(distance <= previous);
            previous = distance;
        }
        assert!(previous < 1e-6);
    }
}
