//! Vehicle profile and fuel station models

use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::error::PlannerError;

/// Fuel characteristics of the rider's vehicle, supplied by the profile store
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VehicleProfile {
    /// Display name, e.g. "CB 500X"
    #[serde(default)]
    pub name: Option<String>,
    pub tank_capacity_l: f64,
    pub fuel_consumption_km_per_l: f64,
    #[serde(default)]
    pub reserve_l: f64,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            name: Some("My bike".to_string()),
            tank_capacity_l: 15.0,
            fuel_consumption_km_per_l: 20.0,
            reserve_l: 3.0,
        }
    }
}

impl VehicleProfile {
    #[must_use]
    pub fn new(tank_capacity_l: f64, fuel_consumption_km_per_l: f64, reserve_l: f64) -> Self {
        Self {
            name: None,
            tank_capacity_l,
            fuel_consumption_km_per_l,
            reserve_l,
        }
    }

    /// Reject profiles that would make the autonomy computation meaningless
    pub fn validate(&self) -> Result<(), PlannerError> {
        if !self.tank_capacity_l.is_finite() || self.tank_capacity_l <= 0.0 {
            return Err(PlannerError::input_invalid(
                "Tank capacity must be a positive number of liters",
            ));
        }
        if !self.fuel_consumption_km_per_l.is_finite() || self.fuel_consumption_km_per_l <= 0.0 {
            return Err(PlannerError::input_invalid(
                "Fuel consumption must be a positive number of km per liter",
            ));
        }
        if !self.reserve_l.is_finite() || self.reserve_l < 0.0 {
            return Err(PlannerError::input_invalid(
                "Reserve must be zero or a positive number of liters",
            ));
        }
        if self.reserve_l >= self.tank_capacity_l {
            return Err(PlannerError::input_invalid(
                "Reserve must be smaller than the tank capacity",
            ));
        }
        Ok(())
    }

    /// Fuel available before dipping into the reserve
    #[must_use]
    pub fn usable_fuel_l(&self) -> f64 {
        self.tank_capacity_l - self.reserve_l
    }
}

/// A refuelling point returned by the POI collaborator
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FuelStation {
    pub id: u64,
    pub coord: Coordinate,
    pub name: Option<String>,
    /// Distance from the search target in km
    pub distance_km: f64,
}

impl FuelStation {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Fuel station")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = VehicleProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.usable_fuel_l(), 12.0);
    }

    #[rstest]
    #[case(0.0, 20.0, 0.0)]
    #[case(-5.0, 20.0, 0.0)]
    #[case(15.0, 0.0, 3.0)]
    #[case(15.0, f64::NAN, 3.0)]
    #[case(15.0, 20.0, -1.0)]
    #[case(15.0, 20.0, 15.0)]
    #[case(f64::INFINITY, 20.0, 3.0)]
    fn test_invalid_profiles(#[case] tank: f64, #[case] consumption: f64, #[case] reserve: f64) {
        let err = VehicleProfile::new(tank, consumption, reserve)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PlannerError::InputInvalid { .. }));
    }

    #[test]
    fn test_profile_deserializes_without_optional_fields() {
        let profile: VehicleProfile = serde_json::from_str(
            r#"{"tank_capacity_l": 17.5, "fuel_consumption_km_per_l": 25.0}"#,
        )
        .unwrap();
        assert_eq!(profile.reserve_l, 0.0);
        assert!(profile.name.is_none());
    }

    #[test]
    fn test_station_display_name() {
        let station = FuelStation {
            id: 1,
            coord: Coordinate::new(0.0, 0.0),
            name: None,
            distance_km: 0.0,
        };
        assert_eq!(station.display_name(), "Fuel station");
    }
}
