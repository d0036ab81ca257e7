//! Live location tracking and camera follow
//!
//! Position fixes arrive as a bounded stream of [`TrackerEvent`]s. Every event
//! is an idempotent update of the tracker state; the resulting
//! [`TrackerSnapshot`] is published on a watch channel for readers.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::error::PlannerError;
use crate::models::Coordinate;

const EXPLORE_ZOOM: f64 = 15.0;
const NAVIGATION_ZOOM: f64 = 18.0;
const NAVIGATION_PITCH: f64 = 60.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    #[default]
    Explore,
    Navigation,
}

/// Where the map camera should look
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct CameraCommand {
    pub center: Coordinate,
    pub zoom: f64,
    pub pitch: f64,
    /// Degrees clockwise from north
    pub bearing: f64,
}

/// A position report from the device
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Device heading in degrees, when the sensor provides one
    #[serde(default)]
    pub heading: Option<f64>,
}

impl PositionFix {
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Fix(PositionFix),
    /// The device could not provide a position
    Unavailable,
    /// The rider moved the map by hand
    MapDragged,
    FollowRequested,
    ModeChanged(CameraMode),
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct TrackerSnapshot {
    pub position: Option<Coordinate>,
    pub heading: Option<f64>,
    /// The position is the configured default, not a device fix
    pub is_fallback: bool,
    pub follow: bool,
    pub mode: CameraMode,
    /// Last camera placement issued while following
    pub camera: Option<CameraCommand>,
}

pub struct LocationTracker {
    min_movement_m: f64,
    fallback: Coordinate,
    position: Option<Coordinate>,
    heading: Option<f64>,
    is_fallback: bool,
    follow: bool,
    mode: CameraMode,
    camera: Option<CameraCommand>,
}

impl LocationTracker {
    #[must_use]
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            min_movement_m: config.min_movement_m,
            fallback: config.fallback_position(),
            position: None,
            heading: None,
            is_fallback: false,
            follow: true,
            mode: CameraMode::Explore,
            camera: None,
        }
    }

    /// Apply one event; returns the camera placement if the camera must move
    pub fn handle(&mut self, event: TrackerEvent) -> Option<CameraCommand> {
        match event {
            TrackerEvent::Fix(fix) => self.apply_fix(fix),
            TrackerEvent::Unavailable => self.position_unavailable(),
            TrackerEvent::MapDragged => {
                self.on_map_drag();
                None
            }
            TrackerEvent::FollowRequested => self.enable_follow(),
            TrackerEvent::ModeChanged(mode) => self.set_mode(mode),
        }
    }

    pub fn apply_fix(&mut self, fix: PositionFix) -> Option<CameraCommand> {
        let current = fix.coordinate();
        if !current.is_valid() {
            warn!("Ignoring invalid position fix {}", current.format_coordinates());
            return None;
        }

        self.heading = self.next_heading(&current, fix.heading);
        self.position = Some(current);
        self.is_fallback = false;
        self.recenter()
    }

    /// Device heading first, then the bearing from the previous fix once the
    /// rider has moved far enough, otherwise the previous heading
    fn next_heading(&self, current: &Coordinate, device_heading: Option<f64>) -> Option<f64> {
        if let Some(heading) = device_heading.filter(|h| h.is_finite()) {
            return Some(heading.rem_euclid(360.0));
        }

        match self.position {
            Some(previous) if !self.is_fallback => {
                let moved_m = previous.distance_km(current) * 1000.0;
                if moved_m > self.min_movement_m {
                    Some(previous.bearing_to(current))
                } else {
                    self.heading
                }
            }
            _ => self.heading,
        }
    }

    /// Fall back to the configured default position if no fix arrived yet
    pub fn position_unavailable(&mut self) -> Option<CameraCommand> {
        let err = PlannerError::position_unavailable("Device reported no position");
        if self.position.is_some() {
            debug!("{}; keeping last known position", err);
            return None;
        }
        info!(
            "{}; using default position {}",
            err,
            self.fallback.format_coordinates()
        );
        self.position = Some(self.fallback);
        self.is_fallback = true;
        self.recenter()
    }

    pub fn on_map_drag(&mut self) {
        if self.follow {
            debug!("Map dragged, camera follow disabled");
        }
        self.follow = false;
    }

    pub fn enable_follow(&mut self) -> Option<CameraCommand> {
        self.follow = true;
        self.recenter()
    }

    /// Switching to navigation always turns follow back on
    pub fn set_mode(&mut self, mode: CameraMode) -> Option<CameraCommand> {
        self.mode = mode;
        if mode == CameraMode::Navigation {
            self.follow = true;
        }
        self.recenter()
    }

    fn recenter(&mut self) -> Option<CameraCommand> {
        if !self.follow {
            return None;
        }
        let center = self.position?;
        let command = match self.mode {
            CameraMode::Explore => CameraCommand {
                center,
                zoom: EXPLORE_ZOOM,
                pitch: 0.0,
                bearing: 0.0,
            },
            CameraMode::Navigation => CameraCommand {
                center,
                zoom: NAVIGATION_ZOOM,
                pitch: NAVIGATION_PITCH,
                bearing: self.heading.unwrap_or(0.0),
            },
        };
        self.camera = Some(command);
        Some(command)
    }

    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            position: self.position,
            heading: self.heading,
            is_fallback: self.is_fallback,
            follow: self.follow,
            mode: self.mode,
            camera: self.camera,
        }
    }
}

/// Consume tracker events until every sender is dropped, publishing a
/// snapshot after each one
pub async fn run_tracker(
    mut tracker: LocationTracker,
    mut events: mpsc::Receiver<TrackerEvent>,
    snapshots: watch::Sender<TrackerSnapshot>,
) {
    snapshots.send_replace(tracker.snapshot());
    while let Some(event) = events.recv().await {
        if let Some(camera) = tracker.handle(event) {
            debug!(
                "Camera to {} zoom {} bearing {:.0}",
                camera.center.format_coordinates(),
                camera.zoom,
                camera.bearing
            );
        }
        snapshots.send_replace(tracker.snapshot());
    }
    debug!("Tracker event stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LocationTracker {
        LocationTracker::new(&TrackingConfig::default())
    }

    fn fix(latitude: f64, longitude: f64, heading: Option<f64>) -> PositionFix {
        PositionFix {
            latitude,
            longitude,
            heading,
        }
    }

    #[test]
    fn test_bearing_from_movement() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(0.0, 0.0, None));
        assert_eq!(tracker.snapshot().heading, None);

        tracker.apply_fix(fix(0.0, 1.0, None));
        let heading = tracker.snapshot().heading.unwrap();
        assert!((heading - 90.0).abs() < 0.5, "Expected ~90, got {heading}");
    }

    #[test]
    fn test_device_heading_wins() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(0.0, 0.0, None));
        tracker.apply_fix(fix(0.0, 0.001, Some(370.0)));
        assert_eq!(tracker.snapshot().heading, Some(10.0));
    }

    #[test]
    fn test_non_finite_device_heading_ignored() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(0.0, 0.0, None));
        tracker.apply_fix(fix(0.001, 0.0, Some(f64::NAN)));
        assert!(tracker.snapshot().heading.unwrap().abs() < 0.5);
    }

    #[test]
    fn test_small_movement_keeps_previous_heading() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(0.0, 0.0, Some(45.0)));
        // ~5.5 m east, below the movement threshold
        tracker.apply_fix(fix(0.0, 0.00005, None));
        assert_eq!(tracker.snapshot().heading, Some(45.0));
    }

    #[test]
    fn test_follow_recenters_explore_camera() {
        let mut tracker = tracker();
        let camera = tracker.apply_fix(fix(-8.05, -34.88, Some(120.0))).unwrap();
        assert_eq!(camera.zoom, 15.0);
        assert_eq!(camera.pitch, 0.0);
        assert_eq!(camera.bearing, 0.0);
        assert_eq!(camera.center, Coordinate::new(-8.05, -34.88));
    }

    #[test]
    fn test_navigation_camera_uses_heading() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(-8.05, -34.88, Some(120.0)));
        let camera = tracker.set_mode(CameraMode::Navigation).unwrap();
        assert_eq!(camera.zoom, 18.0);
        assert_eq!(camera.pitch, 60.0);
        assert_eq!(camera.bearing, 120.0);
    }

    #[test]
    fn test_drag_disables_follow_until_reenabled() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(-8.05, -34.88, None));
        tracker.on_map_drag();

        assert!(tracker.apply_fix(fix(-8.06, -34.88, None)).is_none());
        assert!(!tracker.snapshot().follow);

        let camera = tracker.enable_follow().unwrap();
        assert_eq!(camera.center, Coordinate::new(-8.06, -34.88));
    }

    #[test]
    fn test_navigation_forces_follow() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(-8.05, -34.88, None));
        tracker.on_map_drag();
        assert!(tracker.set_mode(CameraMode::Navigation).is_some());
        assert!(tracker.snapshot().follow);
    }

    #[test]
    fn test_unavailable_falls_back_to_default() {
        let mut tracker = tracker();
        let camera = tracker.position_unavailable().unwrap();
        assert_eq!(camera.center, Coordinate::new(-8.0476, -34.8770));
        assert!(tracker.snapshot().is_fallback);

        // A real fix replaces the fallback without deriving a bearing from it
        tracker.apply_fix(fix(-8.10, -34.90, None));
        let snapshot = tracker.snapshot();
        assert!(!snapshot.is_fallback);
        assert_eq!(snapshot.heading, None);
    }

    #[test]
    fn test_unavailable_keeps_known_position() {
        let mut tracker = tracker();
        tracker.apply_fix(fix(-8.10, -34.90, None));
        assert!(tracker.position_unavailable().is_none());
        assert_eq!(
            tracker.snapshot().position,
            Some(Coordinate::new(-8.10, -34.90))
        );
    }

    #[test]
    fn test_invalid_fix_ignored() {
        let mut tracker = tracker();
        assert!(tracker.apply_fix(fix(120.0, 0.0, None)).is_none());
        assert!(tracker.snapshot().position.is_none());
    }

    #[tokio::test]
    async fn test_run_tracker_publishes_snapshots() {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(TrackerSnapshot::default());
        let handle = tokio::spawn(run_tracker(tracker(), events_rx, snapshot_tx));

        events_tx
            .send(TrackerEvent::Fix(fix(-8.05, -34.88, Some(30.0))))
            .await
            .unwrap();
        events_tx.send(TrackerEvent::MapDragged).await.unwrap();
        drop(events_tx);
        handle.await.unwrap();

        let snapshot = snapshot_rx.borrow().clone();
        assert_eq!(snapshot.position, Some(Coordinate::new(-8.05, -34.88)));
        assert_eq!(snapshot.heading, Some(30.0));
        assert!(!snapshot.follow);
    }
}
