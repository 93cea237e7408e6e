use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::backend::BackendClient;
use crate::error::LocationError;
use crate::models::{Coordinates, Location};

/// Why the platform produced no position fix.
#[derive(Debug, Error)]
pub enum GeolocationError {
    /// Covers explicit refusals and acquisition failures alike; the
    /// message is the platform's own wording.
    #[error("permission denied: {0}")]
    Denied(String),

    #[error("geolocation is not supported on this platform")]
    Unsupported,
}

/// Access to the platform's position facility, modeled as a single
/// suspension point: the future resolves once with a fix or a refusal.
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Coordinates, GeolocationError>;
}

/// Turns a device position into a place name the search backends accept.
pub struct LocationResolver {
    source: Arc<dyn GeolocationSource>,
    backend: Arc<dyn BackendClient>,
}

impl LocationResolver {
    pub fn new(source: Arc<dyn GeolocationSource>, backend: Arc<dyn BackendClient>) -> Self {
        Self { source, backend }
    }

    /// Acquires a position fix and reverse geocodes it.
    ///
    /// A refusal short-circuits: the geocoder is never called without a
    /// fix. A geocoder answer naming neither city nor country is
    /// unresolvable rather than an empty place.
    pub async fn resolve_current(&self) -> std::result::Result<Location, LocationError> {
        let position = self.source.current_position().await.map_err(|e| match e {
            GeolocationError::Denied(reason) => LocationError::Denied(reason),
            GeolocationError::Unsupported => LocationError::Unsupported,
        })?;
        info!(
            latitude = position.latitude,
            longitude = position.longitude,
            "Acquired device position"
        );

        let place = self
            .backend
            .reverse_geocode(position)
            .await
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;

        Location::compose(place.city.as_deref(), place.country.as_deref())
            .ok_or(LocationError::Unresolvable)
    }
}
