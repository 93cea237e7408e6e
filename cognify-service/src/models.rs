use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cognify_flow::{
    Appointment, AppointmentOutcome, ClassificationResult, Provider, ResponseSegment,
    WorkflowSnapshot, WorkflowState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeScanResponse {
    pub session_id: String,
    pub state: WorkflowState,
    pub classification: Option<ClassificationResult>,
    pub segments: Vec<ResponseSegment>,
    /// Set when the classification landed but the explanation did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderSearchRequest {
    pub location: String,
}

/// Position fix the client's platform produced, if it produced one.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NearbySearchRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderSearchResponse {
    pub session_id: String,
    pub state: WorkflowState,
    pub providers: Vec<Provider>,
    pub providers_found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub appointments: Vec<Appointment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_outcome: Option<AppointmentOutcome>,
    /// The search area actually used, after any geolocation resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowupRequest {
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowupResponse {
    pub session_id: String,
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: WorkflowSnapshot,
}
