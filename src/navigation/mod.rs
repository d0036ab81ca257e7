//! Trip session and navigation state machine
//!
//! The machine owns the single active [`TripSession`]. Calculations run in
//! two steps so the caller never has to hold the machine while network calls
//! are in flight: [`NavigationStateMachine::begin_calculation`] hands out a
//! ticket carrying the current [`TripId`], and results are applied with that
//! id. Cancelling or starting a new calculation changes the id, so late
//! results of an abandoned trip are discarded.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::PlannerError;
use crate::fuel::FuelPlan;
use crate::models::{Coordinate, FuelStation, Place, RainAlert, Route, VehicleProfile, WeatherSample};
use crate::planner::{PlannedTrip, TripPlanner};

pub mod tracker;

pub use tracker::{CameraCommand, CameraMode, LocationTracker, TrackerEvent, TrackerSnapshot};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Explore,
    DestinationSelected,
    Preview,
    Navigating,
}

impl NavigationState {
    /// The camera follows the rider unconditionally while navigating
    #[must_use]
    pub fn camera_mode(self) -> CameraMode {
        match self {
            Self::Navigating => CameraMode::Navigation,
            _ => CameraMode::Explore,
        }
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Explore => "explore",
            Self::DestinationSelected => "destination selected",
            Self::Preview => "preview",
            Self::Navigating => "navigating",
        };
        f.write_str(name)
    }
}

/// Identifies one trip attempt; async results carry the id they were started for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TripId(u64);

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of an intent
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "outcome", content = "state", rename_all = "snake_case")]
pub enum Transition {
    /// The intent was applied; carries the resulting state
    Applied(NavigationState),
    /// The intent does not apply in the current state, or the result belongs
    /// to an abandoned trip; nothing changed
    Ignored(NavigationState),
}

impl Transition {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn state(self) -> NavigationState {
        match self {
            Self::Applied(state) | Self::Ignored(state) => state,
        }
    }
}

/// Inputs of a calculation that was allowed to start
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationTicket {
    pub trip_id: TripId,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub vehicle: VehicleProfile,
}

#[derive(Debug, Clone)]
pub struct TripSession {
    id: TripId,
    origin: Option<Place>,
    destination: Option<Place>,
    planned: Option<PlannedTrip>,
    stations: Vec<FuelStation>,
    selected_station: Option<u64>,
    last_error: Option<String>,
}

impl TripSession {
    fn new(id: TripId) -> Self {
        Self {
            id,
            origin: None,
            destination: None,
            planned: None,
            stations: Vec::new(),
            selected_station: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> TripId {
        self.id
    }
}

/// Read-only view of the trip for presentation
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TripData {
    pub state: NavigationState,
    pub trip_id: TripId,
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub route: Option<Route>,
    pub samples: Vec<WeatherSample>,
    pub rain_alert: Option<RainAlert>,
    pub fuel_plan: Option<FuelPlan>,
    pub stations: Vec<FuelStation>,
    pub selected_station: Option<u64>,
    pub last_error: Option<String>,
}

pub struct NavigationStateMachine {
    state: NavigationState,
    session: TripSession,
    next_id: u64,
    vehicle: VehicleProfile,
    live_position: Option<Coordinate>,
}

impl Default for NavigationStateMachine {
    fn default() -> Self {
        Self::new(VehicleProfile::default())
    }
}

impl NavigationStateMachine {
    #[must_use]
    pub fn new(vehicle: VehicleProfile) -> Self {
        Self {
            state: NavigationState::Explore,
            session: TripSession::new(TripId(0)),
            next_id: 1,
            vehicle,
            live_position: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> NavigationState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &TripSession {
        &self.session
    }

    #[must_use]
    pub fn vehicle(&self) -> &VehicleProfile {
        &self.vehicle
    }

    fn next_trip_id(&mut self) -> TripId {
        let id = TripId(self.next_id);
        self.next_id += 1;
        id
    }

    fn ignored(&self, intent: &str) -> Transition {
        debug!("Ignoring {} while in state {}", intent, self.state);
        Transition::Ignored(self.state)
    }

    /// Discard all trip data except the explicit origin
    fn invalidate_plan(&mut self) {
        self.session.id = self.next_trip_id();
        self.session.planned = None;
        self.session.stations.clear();
        self.session.selected_station = None;
        self.session.last_error = None;
    }

    pub fn select_destination(&mut self, destination: Place) -> Transition {
        match self.state {
            NavigationState::Explore | NavigationState::DestinationSelected => {
                info!("Destination selected: {}", destination.short_label());
                self.invalidate_plan();
                self.session.destination = Some(destination);
                self.state = NavigationState::DestinationSelected;
                Transition::Applied(self.state)
            }
            _ => self.ignored("destination selection"),
        }
    }

    /// Use an explicit origin instead of the live position
    pub fn set_origin(&mut self, origin: Place) -> Transition {
        match self.state {
            NavigationState::Explore | NavigationState::DestinationSelected => {
                self.session.origin = Some(origin);
                Transition::Applied(self.state)
            }
            _ => self.ignored("origin change"),
        }
    }

    /// Go back to routing from the live position
    pub fn clear_origin(&mut self) -> Transition {
        match self.state {
            NavigationState::Explore | NavigationState::DestinationSelected => {
                self.session.origin = None;
                Transition::Applied(self.state)
            }
            _ => self.ignored("origin reset"),
        }
    }

    /// Replace the vehicle profile used by the next calculation.
    ///
    /// Only applies before a route exists: the fuel plan of a previewed or
    /// running trip is tied to the profile it was calculated with.
    pub fn set_vehicle_profile(
        &mut self,
        vehicle: VehicleProfile,
    ) -> Result<Transition, PlannerError> {
        vehicle.validate()?;
        match self.state {
            NavigationState::Explore | NavigationState::DestinationSelected => {
                self.vehicle = vehicle;
                Ok(Transition::Applied(self.state))
            }
            _ => Ok(self.ignored("vehicle change")),
        }
    }

    pub fn update_live_position(&mut self, position: Coordinate) {
        if position.is_valid() {
            self.live_position = Some(position);
        }
    }

    /// Start a calculation for the selected destination.
    ///
    /// Returns `Ok(None)` when no destination is waiting for a route. The
    /// ticket's trip id is fresh, so results of earlier attempts will be
    /// discarded.
    pub fn begin_calculation(&mut self) -> Result<Option<CalculationTicket>, PlannerError> {
        if self.state != NavigationState::DestinationSelected {
            debug!("Ignoring calculation while in state {}", self.state);
            return Ok(None);
        }
        let Some(destination) = self.session.destination.as_ref().map(|d| d.coords) else {
            return Err(PlannerError::input_invalid("No destination selected"));
        };

        let origin = match (&self.session.origin, self.live_position) {
            (Some(origin), _) => origin.coords,
            (None, Some(position)) => position,
            (None, None) => {
                let err = PlannerError::position_unavailable(
                    "No origin selected and no live position received",
                );
                self.session.last_error = Some(err.user_message());
                return Err(err);
            }
        };

        self.invalidate_plan();
        debug!("Calculation {} started", self.session.id);
        Ok(Some(CalculationTicket {
            trip_id: self.session.id,
            origin,
            destination,
            vehicle: self.vehicle.clone(),
        }))
    }

    fn is_current_calculation(&self, trip_id: TripId) -> bool {
        trip_id == self.session.id && self.state == NavigationState::DestinationSelected
    }

    /// Apply the outcome of the calculation started with `trip_id`.
    ///
    /// A success moves the trip to `Preview`; a failure keeps the destination
    /// selected and records the error for display.
    pub fn complete_calculation(
        &mut self,
        trip_id: TripId,
        result: Result<PlannedTrip, PlannerError>,
    ) -> Transition {
        match result {
            Ok(planned) => self.apply_plan(trip_id, planned),
            Err(e) => self.record_failure(trip_id, &e),
        }
    }

    fn apply_plan(&mut self, trip_id: TripId, planned: PlannedTrip) -> Transition {
        if !self.is_current_calculation(trip_id) {
            warn!("Discarding stale calculation result for trip {}", trip_id);
            return Transition::Ignored(self.state);
        }
        info!(
            "Trip {} ready for preview: {}, fuel needed: {}",
            trip_id,
            planned.route.format_distance(),
            planned.fuel_plan.needs_fuel
        );
        self.session.planned = Some(planned);
        self.state = NavigationState::Preview;
        Transition::Applied(self.state)
    }

    fn record_failure(&mut self, trip_id: TripId, e: &PlannerError) -> Transition {
        if !self.is_current_calculation(trip_id) {
            debug!("Discarding stale calculation failure for trip {}", trip_id);
            return Transition::Ignored(self.state);
        }
        if e.is_fatal() {
            error!("Calculation for trip {} failed: {}", trip_id, e);
        } else {
            warn!("Calculation for trip {} failed: {}", trip_id, e);
        }
        self.session.last_error = Some(e.user_message());
        Transition::Applied(self.state)
    }

    /// Attach the station lookup result of the trip it was started for
    pub fn apply_stations(&mut self, trip_id: TripId, stations: Vec<FuelStation>) -> Transition {
        let has_plan = matches!(
            self.state,
            NavigationState::Preview | NavigationState::Navigating
        );
        if trip_id != self.session.id || !has_plan {
            debug!("Discarding stale station list for trip {}", trip_id);
            return Transition::Ignored(self.state);
        }
        self.session.stations = stations;
        self.session.selected_station = None;
        Transition::Applied(self.state)
    }

    /// Run the whole calculation, including the station lookup, while
    /// holding the machine. Callers that share the machine across tasks
    /// should use the ticket API instead.
    pub async fn calculate(&mut self, planner: &TripPlanner) -> Result<Transition, PlannerError> {
        let Some(ticket) = self.begin_calculation()? else {
            return Ok(Transition::Ignored(self.state));
        };

        match planner
            .plan(&ticket.origin, &ticket.destination, &ticket.vehicle)
            .await
        {
            Ok(planned) => {
                let fuel_plan = planned.fuel_plan.clone();
                let transition = self.apply_plan(ticket.trip_id, planned);
                let stations = planner.find_stations(&fuel_plan).await;
                self.apply_stations(ticket.trip_id, stations);
                Ok(transition)
            }
            Err(e) => {
                self.record_failure(ticket.trip_id, &e);
                Err(e)
            }
        }
    }

    pub fn start(&mut self) -> Transition {
        match self.state {
            NavigationState::Preview => {
                info!("Navigation started for trip {}", self.session.id);
                self.state = NavigationState::Navigating;
                Transition::Applied(self.state)
            }
            _ => self.ignored("start"),
        }
    }

    /// Drop the trip and return to `Explore`. Also ends an active navigation.
    pub fn cancel(&mut self) -> Transition {
        if self.state == NavigationState::Explore {
            return self.ignored("cancel");
        }
        info!("Trip {} cancelled from state {}", self.session.id, self.state);
        let id = self.next_trip_id();
        self.session = TripSession::new(id);
        self.state = NavigationState::Explore;
        Transition::Applied(self.state)
    }

    /// Record the rider's chosen refuel stop
    pub fn select_station(&mut self, station_id: u64) -> Result<Transition, PlannerError> {
        if !matches!(
            self.state,
            NavigationState::Preview | NavigationState::Navigating
        ) {
            return Ok(self.ignored("station selection"));
        }
        let Some(station) = self.session.stations.iter().find(|s| s.id == station_id) else {
            return Err(PlannerError::input_invalid(format!(
                "Unknown fuel station {station_id}"
            )));
        };
        info!("Refuel stop selected: {}", station.display_name());
        self.session.selected_station = Some(station_id);
        Ok(Transition::Applied(self.state))
    }

    #[must_use]
    pub fn trip_data(&self) -> TripData {
        let planned = self.session.planned.as_ref();
        TripData {
            state: self.state,
            trip_id: self.session.id,
            origin: self.session.origin.clone(),
            destination: self.session.destination.clone(),
            route: planned.map(|p| p.route.clone()),
            samples: planned.map(|p| p.samples.clone()).unwrap_or_default(),
            rain_alert: planned.and_then(|p| p.rain_alert.clone()),
            fuel_plan: planned.map(|p| p.fuel_plan.clone()),
            stations: self.session.stations.clone(),
            selected_station: self.session.selected_station,
            last_error: self.session.last_error.clone(),
        }
    }
}
