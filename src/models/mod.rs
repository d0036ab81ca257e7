//! Data models for the trip planner
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and selected places
//! - Route: resolved path with distance and duration
//! - Weather: per-sample forecasts, conditions and the rain alert
//! - Vehicle: fuel profile and refuelling stations

pub mod location;
pub mod route;
pub mod vehicle;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{Coordinate, Place};
pub use route::{Path, Route};
pub use vehicle::{FuelStation, VehicleProfile};
pub use weather::{RainAlert, WeatherCondition, WeatherSample};
