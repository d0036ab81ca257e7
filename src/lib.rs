//! `MotoWeather` - motorcycle trip planning with rain and fuel overlays
//!
//! This library resolves a driving route, overlays the hourly weather along
//! it, warns about rain and plans refuelling stops from the vehicle's fuel
//! autonomy. A small state machine drives the trip from exploring the map
//! through preview to live navigation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fuel;
pub mod geocoding;
pub mod http;
pub mod models;
pub mod navigation;
pub mod planner;
pub mod routing;
pub mod telemetry;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::PlannerConfig;
pub use error::PlannerError;
pub use fuel::{AutonomyModel, FuelAutonomyPlanner, FuelPlan, REFUEL_MARGIN_FACTOR};
pub use models::{Coordinate, FuelStation, Place, RainAlert, Route, VehicleProfile, WeatherSample};
pub use navigation::{NavigationState, NavigationStateMachine, Transition, TripData};
pub use planner::{PlannedTrip, TripPlanner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlannerError>;
