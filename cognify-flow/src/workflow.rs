//! Drives a scan analysis from upload through provider search, holding the
//! single authoritative [`WorkflowState`] and the conversation record.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::backend::BackendClient;
use crate::error::{LocationError, Result, SearchError, Stage, WorkflowError};
use crate::history::ChatHistory;
use crate::location::{GeolocationSource, LocationResolver};
use crate::models::{Appointment, ClassificationResult, Location, Provider, ScanImage};
use crate::search::ProviderSearch;
use crate::segment::{ResponseSegment, segment};
use crate::state::WorkflowState;

const DEFAULT_LANGUAGE: &str = "en";

/// What a completed submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Classification and explanation both landed.
    ExplanationReady,
    /// Classification landed but the explanation request failed. The
    /// label stands; the failure is information, not an error.
    ExplanationUnavailable { reason: String },
}

/// What a completed provider search produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderSearchOutcome {
    Found(Vec<Provider>),
    /// The search ran and legitimately matched nothing. Zero providers
    /// are stored and the workflow rests in the state its remaining
    /// data supports.
    NoneFound,
}

/// How the piggybacked appointment search ended. Never affects the
/// provider result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AppointmentOutcome {
    Found { count: usize },
    NoneFound,
    Unavailable { reason: String },
}

/// Point-in-time copy of everything a caller may render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub language: String,
    pub classification: Option<ClassificationResult>,
    pub chat_history: ChatHistory,
    pub segments: Vec<ResponseSegment>,
    pub location: Option<Location>,
    pub providers: Vec<Provider>,
    pub appointments: Vec<Appointment>,
    pub appointment_outcome: Option<AppointmentOutcome>,
}

#[derive(Default)]
struct WorkflowInner {
    state: WorkflowState,
    classification: Option<ClassificationResult>,
    history: ChatHistory,
    segments: Vec<ResponseSegment>,
    location: Option<Location>,
    providers: Vec<Provider>,
    appointments: Vec<Appointment>,
    appointment_outcome: Option<AppointmentOutcome>,
}

impl WorkflowInner {
    /// A fresh submission invalidates everything from earlier passes
    /// except the search area, which belongs to the user, not the scan.
    fn begin_pass(&mut self) {
        self.classification = None;
        self.history = ChatHistory::new();
        self.segments.clear();
        self.providers.clear();
        self.appointments.clear();
        self.appointment_outcome = None;
        self.state = WorkflowState::Uploading;
    }

    /// The settled state the stored data supports. Local rejections and
    /// empty results return here, which keeps combinations like
    /// `ProvidersReady` with no providers unreachable.
    fn resting_state(&self) -> WorkflowState {
        if !self.providers.is_empty() {
            WorkflowState::ProvidersReady
        } else if !self.history.is_empty() {
            WorkflowState::ExplanationReady
        } else if self.classification.is_some() {
            WorkflowState::Classified
        } else {
            WorkflowState::Idle
        }
    }

    fn settle_back(&mut self) {
        self.state = self.resting_state();
    }

    fn fail(&mut self, stage: Stage, message: String) {
        self.state = WorkflowState::Failed { stage, message };
    }
}

/// Releases the claimed stage slots when the operation finishes or its
/// future is dropped mid-flight.
struct StageGuard<'a> {
    slots: &'a Mutex<HashSet<Stage>>,
    claimed: Vec<Stage>,
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.slots.lock().unwrap();
        for stage in &self.claimed {
            held.remove(stage);
        }
    }
}

/// Orchestrates one scan analysis: submit, explain, locate, search.
///
/// All methods take `&self`; state lives behind short-lived locks that are
/// never held across an await. One request per stage may be in flight at a
/// time; a clashing call is rejected with [`WorkflowError::StageInFlight`]
/// before it transitions anything or touches the network.
pub struct ScanWorkflow {
    backend: Arc<dyn BackendClient>,
    resolver: LocationResolver,
    search: ProviderSearch,
    language: Mutex<String>,
    inner: Mutex<WorkflowInner>,
    in_flight: Mutex<HashSet<Stage>>,
}

impl ScanWorkflow {
    pub fn new(backend: Arc<dyn BackendClient>, geolocation: Arc<dyn GeolocationSource>) -> Self {
        Self {
            resolver: LocationResolver::new(geolocation, backend.clone()),
            search: ProviderSearch::new(backend.clone()),
            backend,
            language: Mutex::new(DEFAULT_LANGUAGE.to_string()),
            inner: Mutex::new(WorkflowInner::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Preferred language for explanations. Blank input keeps the
    /// current setting.
    pub fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        let trimmed = language.trim();
        if !trimmed.is_empty() {
            *self.language.lock().unwrap() = trimmed.to_string();
        }
    }

    pub fn language(&self) -> String {
        self.language.lock().unwrap().clone()
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.inner.lock().unwrap();
        WorkflowSnapshot {
            state: inner.state.clone(),
            language: self.language(),
            classification: inner.classification.clone(),
            chat_history: inner.history.clone(),
            segments: inner.segments.clone(),
            location: inner.location.clone(),
            providers: inner.providers.clone(),
            appointments: inner.appointments.clone(),
            appointment_outcome: inner.appointment_outcome.clone(),
        }
    }

    /// Submits an image for classification, then asks for an explanation
    /// of the predicted label. Classification always strictly precedes
    /// the explanation request; an explanation failure leaves the stored
    /// classification in place.
    pub async fn submit_image(&self, image: ScanImage) -> Result<SubmitOutcome> {
        let _guard = self.claim(&[Stage::Classification, Stage::Explanation])?;
        if image.file_name.trim().is_empty() || image.bytes.is_empty() {
            return Err(WorkflowError::Validation("no image selected".to_string()));
        }

        info!("Submitting {} for classification", image.file_name);
        self.inner.lock().unwrap().begin_pass();

        let classification = match self.backend.classify_image(&image).await {
            Ok(classification) => classification,
            Err(e) => {
                error!("Classification failed: {}", e);
                let message = e.to_string();
                self.inner
                    .lock()
                    .unwrap()
                    .fail(Stage::Classification, message.clone());
                return Err(WorkflowError::Network {
                    stage: Stage::Classification,
                    message,
                });
            }
        };
        info!("Scan classified as {}", classification.label);
        {
            let mut inner = self.inner.lock().unwrap();
            inner.classification = Some(classification.clone());
            inner.state = WorkflowState::Classified;
        }

        let message = explanation_query(&classification.label);
        let language = self.language();
        match self.backend.explain(&message, &language).await {
            Ok(explanation) => {
                let segments = segment(&explanation);
                info!("Explanation ready with {} segments", segments.len());
                let mut inner = self.inner.lock().unwrap();
                inner.history.push_user(classification.label);
                inner.history.push_assistant(explanation);
                inner.segments = segments;
                inner.state = WorkflowState::ExplanationReady;
                Ok(SubmitOutcome::ExplanationReady)
            }
            Err(e) => {
                warn!("Explanation request failed, label stands: {}", e);
                Ok(SubmitOutcome::ExplanationUnavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Resolves the device position and searches providers around it.
    /// Any resolution failure names the geolocation stage and advises
    /// manual entry; the manual path stays open from the failed state.
    pub async fn search_providers_nearby(&self) -> Result<ProviderSearchOutcome> {
        let _guard = self.claim(&[
            Stage::Geolocation,
            Stage::ProviderSearch,
            Stage::AppointmentSearch,
        ])?;
        self.inner.lock().unwrap().state = WorkflowState::LocationPending;
        info!("Resolving device location");

        match self.resolver.resolve_current().await {
            Ok(location) => {
                info!("Device location resolved to {}", location);
                self.provider_search_pass(location.as_str()).await
            }
            Err(e) => {
                warn!("Location resolution failed: {}", e);
                let advisory = format!("{e}. Please enter your location manually.");
                self.inner
                    .lock()
                    .unwrap()
                    .fail(Stage::Geolocation, advisory.clone());
                Err(match e {
                    LocationError::Denied(_) => WorkflowError::PermissionDenied(advisory),
                    LocationError::Unsupported => WorkflowError::Unsupported(advisory),
                    LocationError::Geocoding(_) | LocationError::Unresolvable => {
                        WorkflowError::Network {
                            stage: Stage::Geolocation,
                            message: advisory,
                        }
                    }
                })
            }
        }
    }

    /// Searches providers around a manually entered place.
    pub async fn search_providers_at(&self, location_text: &str) -> Result<ProviderSearchOutcome> {
        let _guard = self.claim(&[Stage::ProviderSearch, Stage::AppointmentSearch])?;
        self.provider_search_pass(location_text).await
    }

    /// One follow-up turn of the explanation conversation. Does not move
    /// the state machine; on failure the history is left untouched.
    pub async fn ask_followup(&self, question: &str) -> Result<String> {
        let _guard = self.claim(&[Stage::Explanation])?;
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(WorkflowError::Validation("message is required".to_string()));
        }
        if self.inner.lock().unwrap().history.is_empty() {
            return Err(WorkflowError::Validation(
                "no explanation conversation to continue".to_string(),
            ));
        }

        let language = self.language();
        info!("Sending follow-up question");
        let reply = match self.backend.explain(&question, &language).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Follow-up request failed: {}", e);
                return Err(WorkflowError::Network {
                    stage: Stage::Explanation,
                    message: e.to_string(),
                });
            }
        };

        let mut inner = self.inner.lock().unwrap();
        inner.history.push_user(question);
        inner.history.push_assistant(reply.clone());
        Ok(reply)
    }

    /// Shared tail of both search entry points. The caller holds the
    /// provider and appointment stage slots.
    async fn provider_search_pass(&self, location_text: &str) -> Result<ProviderSearchOutcome> {
        let disease = self.known_disease();
        let (disease, location) = match (disease, Location::new(location_text)) {
            (Some(disease), Some(location)) => (disease, location),
            (None, _) => {
                self.inner.lock().unwrap().settle_back();
                return Err(WorkflowError::Validation(
                    "no disease has been classified yet".to_string(),
                ));
            }
            (_, None) => {
                self.inner.lock().unwrap().settle_back();
                return Err(WorkflowError::Validation("location is required".to_string()));
            }
        };
        {
            let mut inner = self.inner.lock().unwrap();
            inner.location = Some(location.clone());
            inner.state = WorkflowState::SearchingProviders;
        }

        let providers = match self.search.find_providers(&disease, location.as_str()).await {
            Ok(providers) => providers,
            Err(SearchError::Validation(message)) => {
                self.inner.lock().unwrap().settle_back();
                return Err(WorkflowError::Validation(message));
            }
            Err(e) => {
                error!("Provider search failed: {}", e);
                let message = e.to_string();
                self.inner
                    .lock()
                    .unwrap()
                    .fail(Stage::ProviderSearch, message.clone());
                return Err(WorkflowError::Network {
                    stage: Stage::ProviderSearch,
                    message,
                });
            }
        };

        if providers.is_empty() {
            info!("No providers found for {} near {}", disease, location);
            let mut inner = self.inner.lock().unwrap();
            inner.providers.clear();
            inner.appointments.clear();
            inner.appointment_outcome = None;
            inner.settle_back();
            return Ok(ProviderSearchOutcome::NoneFound);
        }

        info!("Found {} providers near {}", providers.len(), location);
        {
            let mut inner = self.inner.lock().unwrap();
            inner.providers = providers.clone();
            inner.appointments.clear();
            inner.appointment_outcome = None;
            inner.state = WorkflowState::ProvidersReady;
        }

        self.appointment_pass(&disease, location.as_str()).await;
        Ok(ProviderSearchOutcome::Found(providers))
    }

    /// Appointment lookup that rides along after a successful provider
    /// search. Whatever happens here, the workflow settles back to
    /// `ProvidersReady`.
    async fn appointment_pass(&self, disease: &str, location: &str) {
        self.inner.lock().unwrap().state = WorkflowState::SearchingAppointments;

        let outcome = match self.search.find_appointments(disease, location).await {
            Ok(appointments) if appointments.is_empty() => {
                info!("No appointments found for {} near {}", disease, location);
                AppointmentOutcome::NoneFound
            }
            Ok(appointments) => {
                info!("Found {} appointments", appointments.len());
                let count = appointments.len();
                self.inner.lock().unwrap().appointments = appointments;
                AppointmentOutcome::Found { count }
            }
            Err(e) => {
                warn!("Appointment search failed: {}", e);
                AppointmentOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let mut inner = self.inner.lock().unwrap();
        inner.appointment_outcome = Some(outcome);
        inner.settle_back();
    }

    /// Disease label for searches: the classification, or the first user
    /// turn of the conversation when re-hosted history is all we have.
    fn known_disease(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .classification
            .as_ref()
            .map(|c| c.label.trim().to_string())
            .filter(|label| !label.is_empty())
            .or_else(|| {
                inner
                    .history
                    .first_user()
                    .map(|turn| turn.trim().to_string())
                    .filter(|turn| !turn.is_empty())
            })
    }

    fn claim(&self, stages: &[Stage]) -> Result<StageGuard<'_>> {
        let mut held = self.in_flight.lock().unwrap();
        if let Some(stage) = stages.iter().find(|stage| held.contains(stage)) {
            return Err(WorkflowError::StageInFlight(*stage));
        }
        held.extend(stages.iter().copied());
        Ok(StageGuard {
            slots: &self.in_flight,
            claimed: stages.to_vec(),
        })
    }
}

fn explanation_query(label: &str) -> String {
    format!("I have the following disease: {label}. What can you tell me about this?")
}
