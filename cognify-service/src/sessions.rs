use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use cognify_flow::{
    BackendClient, Coordinates, GeolocationError, GeolocationSource, ScanWorkflow,
};

/// Position source fed by the HTTP client.
///
/// The browser owns the platform geolocation facility, so each nearby
/// search reports the fix it obtained before the workflow asks for one.
/// A report is consumed by exactly one resolution; asking without a
/// report is a denial, which the workflow turns into the manual-entry
/// advisory.
pub struct ReportedPosition {
    slot: Mutex<Option<Coordinates>>,
}

impl ReportedPosition {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn report(&self, position: Coordinates) {
        *self.slot.lock().unwrap() = Some(position);
    }
}

impl Default for ReportedPosition {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeolocationSource for ReportedPosition {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        match self.slot.lock().unwrap().take() {
            Some(position) => Ok(position),
            None => Err(GeolocationError::Denied(
                "no position was reported by the client".to_string(),
            )),
        }
    }
}

/// One scan analysis session: the workflow plus its client-fed position
/// source.
pub struct ScanSession {
    pub id: String,
    pub workflow: ScanWorkflow,
    pub created_at: DateTime<Utc>,
    position: Arc<ReportedPosition>,
}

impl ScanSession {
    fn new(backend: Arc<dyn BackendClient>) -> Arc<Self> {
        let position = Arc::new(ReportedPosition::new());
        let workflow = ScanWorkflow::new(backend, position.clone());
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            workflow,
            created_at: Utc::now(),
            position,
        })
    }

    pub fn report_position(&self, position: Coordinates) {
        self.position.report(position);
    }
}

/// In-memory registry of live sessions, keyed by id.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<ScanSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn create(&self, backend: Arc<dyn BackendClient>) -> Arc<ScanSession> {
        let session = ScanSession::new(backend);
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<ScanSession>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
