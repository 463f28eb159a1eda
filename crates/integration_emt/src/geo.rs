//! Validated WGS84 coordinates

use std::fmt;

use crate::error::EmtError;

/// A point given as latitude/longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Create a point, rejecting values outside the WGS84 ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` if latitude is not in [-90, 90] or longitude
    /// is not in [-180, 180] (NaN included).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EmtError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(EmtError::InvalidLocation(format!(
                "coordinates out of range: {latitude}, {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in meters (Haversine)
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let lat1_rad = self.latitude.to_radians();
        let lat2_rad = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (lat1_rad.cos() * lat2_rad.cos()).mul_add(
            (delta_lon / 2.0).sin().powi(2),
            (delta_lat / 2.0).sin().powi(2),
        );
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        let point = Coordinates::new(40.4168, -3.7038).unwrap();
        assert!((point.latitude() - 40.4168).abs() < f64::EPSILON);
        assert!((point.longitude() + 3.7038).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -181.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_sol_to_cibeles() {
        let sol = Coordinates::new(40.416_775, -3.703_790).unwrap();
        let cibeles = Coordinates::new(40.419_290, -3.693_157).unwrap();
        let d = sol.distance_meters(&cibeles);
        assert!((850.0..1000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let point = Coordinates::new(40.4168, -3.7038).unwrap();
        assert!(point.distance_meters(&point).abs() < 0.001);
    }

    #[test]
    fn test_display() {
        let point = Coordinates::new(40.4168, -3.7038).unwrap();
        assert_eq!(point.to_string(), "40.416800, -3.703800");
    }
}
