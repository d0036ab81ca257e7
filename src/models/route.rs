//! Route geometry model

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Ordered start-to-end sequence of coordinates describing a route's shape
pub type Path = Vec<Coordinate>;

/// A resolved driving route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Route {
    pub path: Path,
    pub distance_km: f64,
    pub duration_min: f64,
}

impl Route {
    /// Build a route from the routing service's raw units (meters, seconds)
    #[must_use]
    pub fn from_meters_seconds(path: Path, distance_m: f64, duration_s: f64) -> Self {
        Self {
            path,
            distance_km: (distance_m / 1000.0).max(0.0),
            duration_min: (duration_s / 60.0).max(0.0),
        }
    }

    /// Distance formatted with one decimal, e.g. "123.4 km"
    #[must_use]
    pub fn format_distance(&self) -> String {
        format!("{:.1} km", self.distance_km)
    }

    /// Duration rounded to whole minutes
    #[must_use]
    pub fn format_duration(&self) -> String {
        format!("{} min", self.duration_min.round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        let route = Route::from_meters_seconds(
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)],
            500_000.0,
            18_000.0,
        );
        assert_eq!(route.distance_km, 500.0);
        assert_eq!(route.duration_min, 300.0);
        assert_eq!(route.format_distance(), "500.0 km");
        assert_eq!(route.format_duration(), "300 min");
    }
}
