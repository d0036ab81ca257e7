//! Error types and handling for the trip planner

use thiserror::Error;

/// Main error type for the trip planner
#[derive(Error, Debug)]
pub enum PlannerError {
    /// The routing collaborator failed or returned no usable route
    #[error("Route unavailable: {message}")]
    RouteUnavailable { message: String },

    /// Weather, geocoding or station lookups failed; the route is still usable
    #[error("Enrichment degraded: {message}")]
    EnrichmentDegraded { message: String },

    /// Missing origin/destination or an unusable vehicle profile
    #[error("Invalid input: {message}")]
    InputInvalid { message: String },

    /// The device could not provide a position
    #[error("Position unavailable: {message}")]
    PositionUnavailable { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PlannerError {
    pub fn route_unavailable<S: Into<String>>(message: S) -> Self {
        Self::RouteUnavailable {
            message: message.into(),
        }
    }

    pub fn enrichment_degraded<S: Into<String>>(message: S) -> Self {
        Self::EnrichmentDegraded {
            message: message.into(),
        }
    }

    pub fn input_invalid<S: Into<String>>(message: S) -> Self {
        Self::InputInvalid {
            message: message.into(),
        }
    }

    pub fn position_unavailable<S: Into<String>>(message: S) -> Self {
        Self::PositionUnavailable {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether the error aborts the current calculate attempt
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PlannerError::EnrichmentDegraded { .. } | PlannerError::PositionUnavailable { .. }
        )
    }

    /// Get a single human-readable notification for the rider
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::RouteUnavailable { .. } => {
                "Could not calculate a route. Please try again.".to_string()
            }
            PlannerError::EnrichmentDegraded { .. } => {
                "Some weather or fuel information is unavailable for this route.".to_string()
            }
            PlannerError::InputInvalid { message } => format!("Invalid input: {message}"),
            PlannerError::PositionUnavailable { .. } => {
                "Current position unavailable. Choose an origin or enable location access.".to_string()
            }
            PlannerError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            PlannerError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            PlannerError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let route_err = PlannerError::route_unavailable("no routes");
        assert!(matches!(route_err, PlannerError::RouteUnavailable { .. }));

        let input_err = PlannerError::input_invalid("missing destination");
        assert!(matches!(input_err, PlannerError::InputInvalid { .. }));

        let gps_err = PlannerError::position_unavailable("permission denied");
        assert!(matches!(gps_err, PlannerError::PositionUnavailable { .. }));
    }

    #[test]
    fn test_user_messages() {
        let route_err = PlannerError::route_unavailable("timeout");
        assert!(route_err.user_message().contains("Could not calculate a route"));

        let input_err = PlannerError::input_invalid("tank capacity must be positive");
        assert!(input_err.user_message().contains("tank capacity must be positive"));
    }

    #[test]
    fn test_fatality() {
        assert!(PlannerError::route_unavailable("x").is_fatal());
        assert!(PlannerError::input_invalid("x").is_fatal());
        assert!(!PlannerError::enrichment_degraded("x").is_fatal());
        assert!(!PlannerError::position_unavailable("x").is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlannerError = io_err.into();
        assert!(matches!(err, PlannerError::Io { .. }));
    }
}
