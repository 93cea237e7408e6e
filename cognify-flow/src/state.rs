use serde::{Deserialize, Serialize};

use crate::error::Stage;

/// The single authoritative position of a scan workflow.
///
/// Exactly one variant holds at any time; every transition is driven by the
/// orchestrator in [`crate::workflow::ScanWorkflow`]. Settled states are
/// places the machine can rest between operations, the remaining variants
/// describe work in flight or a failure that names its stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    /// No image submitted yet.
    #[default]
    Idle,
    /// Image upload and classification in progress.
    Uploading,
    /// A disease label is known; no explanation yet.
    Classified,
    /// Explanation received and segmented.
    ExplanationReady,
    /// Waiting on the platform for a device position.
    LocationPending,
    /// Provider search in progress.
    SearchingProviders,
    /// Providers found and stored.
    ProvidersReady,
    /// Appointment search in progress.
    SearchingAppointments,
    /// A stage failed; retrying that stage's action leaves this state.
    Failed { stage: Stage, message: String },
}

impl WorkflowState {
    /// States the machine rests in between operations. Empty search
    /// results and local rejections land on one of these.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            WorkflowState::Idle
                | WorkflowState::Classified
                | WorkflowState::ExplanationReady
                | WorkflowState::ProvidersReady
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WorkflowState::Failed { .. })
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            WorkflowState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
