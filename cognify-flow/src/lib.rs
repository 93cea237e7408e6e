pub mod backend;
pub mod error;
pub mod history;
pub mod location;
pub mod models;
pub mod search;
pub mod segment;
pub mod state;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use backend::{BackendClient, GeocodedPlace, HttpBackend};
pub use error::{BackendError, LocationError, Result, SearchError, Stage, WorkflowError};
pub use history::{ChatHistory, ChatRole, ChatTurn};
pub use location::{GeolocationError, GeolocationSource, LocationResolver};
pub use models::{
    Appointment, ClassificationResult, Coordinates, Location, Provider, ScanImage,
};
pub use search::ProviderSearch;
pub use segment::{ResponseSegment, segment};
pub use state::WorkflowState;
pub use workflow::{
    AppointmentOutcome, ProviderSearchOutcome, ScanWorkflow, SubmitOutcome, WorkflowSnapshot,
};
