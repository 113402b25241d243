//! Geographic coordinates and distance math.

use serde::{Deserialize, Serialize};

/// A resolved coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Calculate distance between two coordinates in kilometers.
///
/// Uses the Haversine formula for accuracy on Earth's surface.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_known_cities() {
        // Minneapolis to St. Paul (≈16 km)
        let minneapolis = GeoPoint::new(44.98, -93.27);
        let st_paul = GeoPoint::new(44.95, -93.09);

        let distance = distance_km(minneapolis, st_paul);
        assert!(distance > 15.0 && distance < 17.0);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let point = GeoPoint::new(40.7128, -74.0060);
        assert!(distance_km(point, point) < 0.001);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(40.7128, -74.0060);
        let b = GeoPoint::new(40.7580, -73.9855);
        let ab = distance_km(a, b);
        let ba = distance_km(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }
}
