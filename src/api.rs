//! JSON API over the trip session, vehicle profile and location tracker

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

use crate::error::PlannerError;
use crate::models::{Coordinate, Place, VehicleProfile};
use crate::navigation::tracker::PositionFix;
use crate::navigation::{
    CameraMode, NavigationStateMachine, TrackerEvent, TrackerSnapshot, Transition, TripData,
};
use crate::planner::TripPlanner;

#[derive(Clone)]
pub struct AppState {
    machine: Arc<Mutex<NavigationStateMachine>>,
    planner: Arc<TripPlanner>,
    tracker: mpsc::Sender<TrackerEvent>,
    snapshots: watch::Receiver<TrackerSnapshot>,
}

impl AppState {
    pub fn new(
        machine: NavigationStateMachine,
        planner: Arc<TripPlanner>,
        tracker: mpsc::Sender<TrackerEvent>,
        snapshots: watch::Receiver<TrackerSnapshot>,
    ) -> Self {
        Self {
            machine: Arc::new(Mutex::new(machine)),
            planner,
            tracker,
            snapshots,
        }
    }

    async fn send_tracker_event(&self, event: TrackerEvent) -> Result<(), ApiError> {
        self.tracker.send(event).await.map_err(|_| ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Location tracking is not running".to_string(),
        })
    }

    /// The transition has already been applied at this point, so a tracker
    /// that is gone only costs the camera update
    async fn follow_camera_mode(&self, mode: CameraMode) {
        if self.tracker.send(TrackerEvent::ModeChanged(mode)).await.is_err() {
            warn!("Location tracking is not running, camera stays in its previous mode");
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    message: String,
}

impl From<&PlannerError> for ApiError {
    fn from(err: &PlannerError) -> Self {
        let status = match err {
            PlannerError::InputInvalid { .. } => StatusCode::BAD_REQUEST,
            PlannerError::PositionUnavailable { .. } => StatusCode::CONFLICT,
            PlannerError::RouteUnavailable { .. } | PlannerError::EnrichmentDegraded { .. } => {
                StatusCode::BAD_GATEWAY
            }
            PlannerError::Config { .. } | PlannerError::Cache { .. } | PlannerError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.user_message(),
        }
    }
}

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        Self::from(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub transition: Transition,
    pub trip: TripData,
}

#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub transition: Transition,
    pub vehicle: VehicleProfile,
}

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<PlaceRequest> for Place {
    type Error = PlannerError;

    fn try_from(request: PlaceRequest) -> Result<Self, Self::Error> {
        let coords = Coordinate::new(request.latitude, request.longitude);
        if !coords.is_valid() {
            return Err(PlannerError::input_invalid(format!(
                "Invalid coordinates: lat={}, lng={}",
                request.latitude, request.longitude
            )));
        }
        let label = if request.label.trim().is_empty() {
            coords.format_coordinates()
        } else {
            request.label
        };
        Ok(Place::new(label, coords))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/trip", get(get_trip))
        .route("/trip/origin", post(set_origin).delete(clear_origin))
        .route("/trip/destination", post(select_destination))
        .route("/trip/calculate", post(calculate))
        .route("/trip/start", post(start))
        .route("/trip/cancel", post(cancel))
        .route("/trip/stations/{id}/select", post(select_station))
        .route("/vehicle", get(get_vehicle).put(put_vehicle))
        .route("/position", post(report_position))
        .route("/position/unavailable", post(report_position_unavailable))
        .route("/camera", get(get_camera))
        .route("/camera/drag", post(camera_dragged))
        .route("/camera/follow", post(camera_follow))
        .with_state(state)
}

fn respond(transition: Transition, machine: &NavigationStateMachine) -> Json<IntentResponse> {
    Json(IntentResponse {
        transition,
        trip: machine.trip_data(),
    })
}

async fn get_trip(State(state): State<AppState>) -> Json<TripData> {
    Json(state.machine.lock().await.trip_data())
}

async fn set_origin(
    State(state): State<AppState>,
    Json(request): Json<PlaceRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let place = Place::try_from(request)?;
    let mut machine = state.machine.lock().await;
    let transition = machine.set_origin(place);
    Ok(respond(transition, &machine))
}

async fn clear_origin(State(state): State<AppState>) -> Json<IntentResponse> {
    let mut machine = state.machine.lock().await;
    let transition = machine.clear_origin();
    respond(transition, &machine)
}

async fn select_destination(
    State(state): State<AppState>,
    Json(request): Json<PlaceRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let place = Place::try_from(request)?;
    let mut machine = state.machine.lock().await;
    let transition = machine.select_destination(place);
    Ok(respond(transition, &machine))
}

/// Plans the trip without holding the session lock during network calls.
/// The station lookup continues in the background and is applied to the
/// trip it was started for.
async fn calculate(State(state): State<AppState>) -> Result<Json<IntentResponse>, ApiError> {
    let position = state.snapshots.borrow().position;

    let ticket = {
        let mut machine = state.machine.lock().await;
        if let Some(position) = position {
            machine.update_live_position(position);
        }
        match machine.begin_calculation()? {
            Some(ticket) => ticket,
            None => return Ok(respond(Transition::Ignored(machine.state()), &machine)),
        }
    };

    let result = state
        .planner
        .plan(&ticket.origin, &ticket.destination, &ticket.vehicle)
        .await;

    let mut machine = state.machine.lock().await;
    let planned = match result {
        Ok(planned) => planned,
        Err(e) => {
            let error = ApiError::from(&e);
            machine.complete_calculation(ticket.trip_id, Err(e));
            return Err(error);
        }
    };

    let fuel_plan = planned.fuel_plan.clone();
    let transition = machine.complete_calculation(ticket.trip_id, Ok(planned));

    if transition.is_applied() && fuel_plan.needs_fuel {
        let machine = state.machine.clone();
        let planner = state.planner.clone();
        let trip_id = ticket.trip_id;
        tokio::spawn(async move {
            let stations = planner.find_stations(&fuel_plan).await;
            if !machine
                .lock()
                .await
                .apply_stations(trip_id, stations)
                .is_applied()
            {
                debug!("Station lookup for trip {} finished after the trip changed", trip_id);
            }
        });
    }

    Ok(respond(transition, &machine))
}

async fn start(State(state): State<AppState>) -> Json<IntentResponse> {
    let response = {
        let mut machine = state.machine.lock().await;
        let transition = machine.start();
        respond(transition, &machine)
    };
    if response.transition.is_applied() {
        state.follow_camera_mode(CameraMode::Navigation).await;
    }
    response
}

async fn cancel(State(state): State<AppState>) -> Json<IntentResponse> {
    let response = {
        let mut machine = state.machine.lock().await;
        let transition = machine.cancel();
        respond(transition, &machine)
    };
    if response.transition.is_applied() {
        state.follow_camera_mode(CameraMode::Explore).await;
    }
    response
}

async fn select_station(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<IntentResponse>, ApiError> {
    let mut machine = state.machine.lock().await;
    let transition = machine.select_station(id)?;
    Ok(respond(transition, &machine))
}

async fn get_vehicle(State(state): State<AppState>) -> Json<VehicleProfile> {
    Json(state.machine.lock().await.vehicle().clone())
}

/// Changes the profile for the next calculation; ignored while a trip is
/// previewed or running
async fn put_vehicle(
    State(state): State<AppState>,
    Json(profile): Json<VehicleProfile>,
) -> Result<Json<VehicleResponse>, ApiError> {
    let mut machine = state.machine.lock().await;
    let transition = machine.set_vehicle_profile(profile).map_err(|e| {
        warn!("Rejected vehicle profile: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(VehicleResponse {
        transition,
        vehicle: machine.vehicle().clone(),
    }))
}

async fn report_position(
    State(state): State<AppState>,
    Json(fix): Json<PositionFix>,
) -> Result<StatusCode, ApiError> {
    if !fix.coordinate().is_valid() {
        return Err(PlannerError::input_invalid("Position fix is not a valid coordinate").into());
    }
    state.send_tracker_event(TrackerEvent::Fix(fix)).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn report_position_unavailable(
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.send_tracker_event(TrackerEvent::Unavailable).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_camera(State(state): State<AppState>) -> Json<TrackerSnapshot> {
    Json(state.snapshots.borrow().clone())
}

async fn camera_dragged(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send_tracker_event(TrackerEvent::MapDragged).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn camera_follow(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.send_tracker_event(TrackerEvent::FollowRequested).await?;
    Ok(StatusCode::ACCEPTED)
}
