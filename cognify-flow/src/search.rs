use std::sync::Arc;

use tracing::info;

use crate::backend::BackendClient;
use crate::error::SearchError;
use crate::models::{Appointment, Provider};

/// Coordinates provider and appointment lookups for a classified disease.
///
/// Both lookups validate their terms before any traffic goes out. The
/// provider lookup additionally probes backend liveness first, so an
/// unreachable service surfaces as [`SearchError::Unreachable`] instead of
/// masquerading as an empty result.
pub struct ProviderSearch {
    backend: Arc<dyn BackendClient>,
}

impl ProviderSearch {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Searches healthcare providers treating `disease` around `location`.
    /// An empty result is a legitimate answer, not an error.
    pub async fn find_providers(
        &self,
        disease: &str,
        location: &str,
    ) -> std::result::Result<Vec<Provider>, SearchError> {
        let (disease, location) = validated(disease, location)?;

        self.backend
            .health()
            .await
            .map_err(|e| SearchError::Unreachable(e.to_string()))?;

        info!("Searching providers for {} near {}", disease, location);
        self.backend
            .find_doctors(location, disease)
            .await
            .map_err(|e| SearchError::Request(e.to_string()))
    }

    /// Searches bookable appointments for the same terms. No probe here;
    /// this lookup only ever runs right after a successful provider search.
    pub async fn find_appointments(
        &self,
        disease: &str,
        location: &str,
    ) -> std::result::Result<Vec<Appointment>, SearchError> {
        let (disease, location) = validated(disease, location)?;

        info!("Searching appointments for {} near {}", disease, location);
        self.backend
            .find_appointments(disease, location)
            .await
            .map_err(|e| SearchError::Request(e.to_string()))
    }
}

fn validated<'a>(
    disease: &'a str,
    location: &'a str,
) -> std::result::Result<(&'a str, &'a str), SearchError> {
    let disease = disease.trim();
    if disease.is_empty() {
        return Err(SearchError::Validation("disease is required".to_string()));
    }
    let location = location.trim();
    if location.is_empty() {
        return Err(SearchError::Validation("location is required".to_string()));
    }
    Ok((disease, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn empty_disease_is_rejected_before_any_call() {
        let backend = Arc::new(MockBackend::happy());
        let search = ProviderSearch::new(backend.clone());

        let err = search.find_providers("  ", "Paris").await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.doctor_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_location_is_rejected_before_any_call() {
        let backend = Arc::new(MockBackend::happy());
        let search = ProviderSearch::new(backend.clone());

        let err = search.find_providers("Alzheimer's", "").await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 0);

        let err = search
            .find_appointments("Alzheimer's", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(backend.appointment_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dead_backend_is_unreachable_not_empty() {
        let mut mock = MockBackend::happy();
        mock.healthy = false;
        let backend = Arc::new(mock);
        let search = ProviderSearch::new(backend.clone());

        let err = search
            .find_providers("Alzheimer's", "Lahore")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Unreachable(_)));
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.doctor_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_search_probes_then_queries() {
        let backend = Arc::new(MockBackend::happy());
        let search = ProviderSearch::new(backend.clone());

        let providers = search
            .find_providers("Alzheimer's", " Lahore, Pakistan ")
            .await
            .unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 1);

        let query = backend.last_doctor_query.lock().unwrap().clone().unwrap();
        assert_eq!(query, ("Lahore, Pakistan".to_string(), "Alzheimer's".to_string()));
    }

    #[tokio::test]
    async fn appointment_search_skips_the_probe() {
        let mut mock = MockBackend::happy();
        mock.healthy = false;
        let backend = Arc::new(mock);
        let search = ProviderSearch::new(backend.clone());

        let appointments = search
            .find_appointments("Alzheimer's", "Lahore")
            .await
            .unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(backend.health_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_searches_return_identical_ordered_results() {
        let backend = Arc::new(MockBackend::happy());
        let search = ProviderSearch::new(backend.clone());

        let first = search.find_providers("Alzheimer's", "Lahore").await.unwrap();
        let second = search.find_providers("Alzheimer's", "Lahore").await.unwrap();
        assert_eq!(first, second);
        let titles: Vec<&str> = first.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["City Neurology Center", "Dr. Ahmed Khan"]);
    }

    #[tokio::test]
    async fn failed_query_is_a_request_error() {
        let mut mock = MockBackend::happy();
        mock.doctors = Mutex::new(None);
        let search = ProviderSearch::new(Arc::new(mock));

        let err = search
            .find_providers("Alzheimer's", "Lahore")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Request(_)));
    }
}
