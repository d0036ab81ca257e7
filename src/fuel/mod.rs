//! Fuel autonomy planning
//!
//! Decides whether the vehicle can cover a route on one tank and, when it
//! cannot, where along the route to look for a refuelling stop.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PlannerError;
use crate::models::{Coordinate, Route, VehicleProfile};
use crate::routing::sampler;

pub mod overpass;
pub mod stations;

pub use overpass::OverpassClient;
pub use stations::{StationLocator, StationProvider};

/// Share of the autonomy at which the refuel search is placed, leaving a
/// safety margin before the tank runs dry
pub const REFUEL_MARGIN_FACTOR: f64 = 0.8;

/// How much of the tank counts towards autonomy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyModel {
    /// Tank capacity minus the reserve
    #[default]
    UsableFuel,
    /// Whole tank, reserve included
    FullTank,
}

impl AutonomyModel {
    #[must_use]
    pub fn fuel_l(self, profile: &VehicleProfile) -> f64 {
        match self {
            Self::UsableFuel => profile.usable_fuel_l(),
            Self::FullTank => profile.tank_capacity_l,
        }
    }
}

/// Outcome of the autonomy computation for one route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FuelPlan {
    pub autonomy_km: f64,
    pub distance_km: f64,
    pub needs_fuel: bool,
    /// Autonomy left at the destination, negative when fuel is needed
    pub margin_km: f64,
    /// Refuelling stops needed to reach the destination
    pub required_stops: u32,
    /// Fraction of the route at which to search for a station
    pub search_fraction: Option<f64>,
    pub search_target: Option<Coordinate>,
}

impl FuelPlan {
    #[must_use]
    pub fn format_autonomy(&self) -> String {
        format!("{:.0} km", self.autonomy_km)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuelAutonomyPlanner {
    model: AutonomyModel,
}

impl FuelAutonomyPlanner {
    #[must_use]
    pub fn new(model: AutonomyModel) -> Self {
        Self { model }
    }

    /// Distance the vehicle covers on the fuel counted by the model
    #[must_use]
    pub fn autonomy_km(&self, profile: &VehicleProfile) -> f64 {
        self.model.fuel_l(profile) * profile.fuel_consumption_km_per_l
    }

    /// Compute the fuel plan for a route.
    ///
    /// The search target is the path point at
    /// `autonomy * REFUEL_MARGIN_FACTOR / distance` of the route.
    pub fn plan(&self, route: &Route, profile: &VehicleProfile) -> Result<FuelPlan, PlannerError> {
        profile.validate()?;

        let autonomy_km = self.autonomy_km(profile);
        let distance_km = route.distance_km.max(0.0);
        let needs_fuel = distance_km > 0.0 && distance_km > autonomy_km;

        let required_stops = if distance_km > 0.0 {
            ((distance_km / autonomy_km).ceil() as u32).saturating_sub(1)
        } else {
            0
        };

        let (search_fraction, search_target) = if needs_fuel {
            let fraction = autonomy_km * REFUEL_MARGIN_FACTOR / distance_km;
            (
                Some(fraction),
                sampler::coordinate_at_fraction(&route.path, fraction),
            )
        } else {
            (None, None)
        };

        let plan = FuelPlan {
            autonomy_km,
            distance_km,
            needs_fuel,
            margin_km: round_2(autonomy_km - distance_km),
            required_stops,
            search_fraction,
            search_target,
        };
        debug!(
            "Fuel plan: autonomy {}, distance {:.1} km, needs fuel: {}",
            plan.format_autonomy(),
            distance_km,
            needs_fuel
        );
        Ok(plan)
    }
}

fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn straight_route(points: usize, distance_km: f64) -> Route {
        let path = (0..points)
            .map(|i| Coordinate::new(-8.0, -35.0 + i as f64 * 0.01))
            .collect();
        Route {
            path,
            distance_km,
            duration_min: distance_km,
        }
    }

    #[test]
    fn test_long_trip_needs_fuel() {
        let route = straight_route(100, 500.0);
        let plan = FuelAutonomyPlanner::default()
            .plan(&route, &VehicleProfile::default())
            .unwrap();

        assert_eq!(plan.autonomy_km, 240.0);
        assert!(plan.needs_fuel);
        assert_eq!(plan.margin_km, -260.0);
        assert_eq!(plan.required_stops, 2);
        let fraction = plan.search_fraction.unwrap();
        assert!((fraction - 0.384).abs() < 1e-9);
        assert_eq!(plan.search_target, Some(route.path[38]));
    }

    #[test]
    fn test_zero_distance_never_needs_fuel() {
        let plan = FuelAutonomyPlanner::default()
            .plan(&straight_route(1, 0.0), &VehicleProfile::default())
            .unwrap();
        assert!(!plan.needs_fuel);
        assert_eq!(plan.required_stops, 0);
        assert!(plan.search_target.is_none());
    }

    #[rstest]
    #[case(239.0, false)]
    #[case(240.0, false)]
    #[case(240.5, true)]
    fn test_needs_fuel_boundary(#[case] distance_km: f64, #[case] expected: bool) {
        let plan = FuelAutonomyPlanner::default()
            .plan(&straight_route(10, distance_km), &VehicleProfile::default())
            .unwrap();
        assert_eq!(plan.needs_fuel, expected);
        assert_eq!(plan.search_fraction.is_some(), expected);
    }

    #[test]
    fn test_full_tank_model() {
        let planner = FuelAutonomyPlanner::new(AutonomyModel::FullTank);
        assert_eq!(planner.autonomy_km(&VehicleProfile::default()), 300.0);

        let plan = planner
            .plan(&straight_route(10, 280.0), &VehicleProfile::default())
            .unwrap();
        assert!(!plan.needs_fuel);
        assert_eq!(plan.margin_km, 20.0);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let profile = VehicleProfile::new(10.0, 0.0, 1.0);
        let err = FuelAutonomyPlanner::default()
            .plan(&straight_route(10, 100.0), &profile)
            .unwrap_err();
        assert!(matches!(err, PlannerError::InputInvalid { .. }));
    }
}
