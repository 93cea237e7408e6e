use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named phases of the scan analysis workflow.
///
/// Failure states and in-flight guards are tagged with the stage they
/// belong to, so callers can tell which action to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classification,
    Explanation,
    Geolocation,
    ProviderSearch,
    AppointmentSearch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Classification => "classification",
            Stage::Explanation => "explanation",
            Stage::Geolocation => "geolocation",
            Stage::ProviderSearch => "provider search",
            Stage::AppointmentSearch => "appointment search",
        };
        write!(f, "{name}")
    }
}

/// Errors surfaced by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Input was rejected locally, before any network traffic.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A backend request failed; the stage names the retriable action.
    #[error("{stage} request failed: {message}")]
    Network { stage: Stage, message: String },

    /// The platform refused to share the device position.
    #[error("{0}")]
    PermissionDenied(String),

    /// The platform has no geolocation facility at all.
    #[error("{0}")]
    Unsupported(String),

    /// Another request for the same stage is still in flight.
    #[error("a {0} request is already in flight")]
    StageInFlight(Stage),
}

/// Errors from resolving the device position to a place name.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied: {0}")]
    Denied(String),

    #[error("geolocation is not available on this platform")]
    Unsupported,

    #[error("reverse geocoding failed: {0}")]
    Geocoding(String),

    /// The geocoder answered but named no city and no country.
    #[error("position could not be resolved to a place")]
    Unresolvable,
}

/// Errors from the provider and appointment search coordinator.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// The liveness probe failed; nothing was searched.
    #[error("search service unreachable: {0}")]
    Unreachable(String),

    #[error("search request failed: {0}")]
    Request(String),
}

/// Errors from a single backend HTTP call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure: refused connection, timeout, DNS.
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// Non-success status; message carries the `error` payload when the
    /// backend sent one.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// A success status whose body did not match the documented shape.
    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    /// A success status carrying an `error` payload instead of a result.
    #[error("backend reported an error: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_read_naturally_in_errors() {
        let err = WorkflowError::Network {
            stage: Stage::ProviderSearch,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "provider search request failed: connection refused"
        );

        let busy = WorkflowError::StageInFlight(Stage::Classification);
        assert_eq!(
            busy.to_string(),
            "a classification request is already in flight"
        );
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::AppointmentSearch).unwrap();
        assert_eq!(json, "\"appointment_search\"");
        let back: Stage = serde_json::from_str("\"provider_search\"").unwrap();
        assert_eq!(back, Stage::ProviderSearch);
    }
}
