//! Canned analysis backend for the router tests.

use async_trait::async_trait;

use cognify_flow::{
    Appointment, BackendClient, BackendError, ClassificationResult, Coordinates, GeocodedPlace,
    Provider, ScanImage,
};

pub(crate) const STUB_EXPLANATION: &str =
    "**Summary:**\n\nAn early, measurable stage of cognitive decline.\n\n1. **Consult a neurologist**: Book a full assessment soon.";

pub(crate) struct StubBackend {
    pub classification: Option<String>,
    pub doctors: Vec<Provider>,
    pub appointments: Vec<Appointment>,
}

impl StubBackend {
    pub(crate) fn happy() -> Self {
        Self {
            classification: Some("Mild_Demented".to_string()),
            doctors: vec![Provider {
                title: "City Neurology Center".to_string(),
                link: Some("https://example.com/listing".to_string()),
                snippet: None,
                address: Some("12 Mall Road".to_string()),
                rating: Some(4.6),
                rating_count: Some(87),
                phone: None,
            }],
            appointments: vec![Appointment {
                doctor_name: "Dr. Sara Malik".to_string(),
                specialty: "Neurologist".to_string(),
                location: "Lahore".to_string(),
                date: "Book online".to_string(),
                time: "Contact clinic".to_string(),
                phone: None,
                address: None,
            }],
        }
    }
}

#[async_trait]
impl BackendClient for StubBackend {
    async fn health(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn classify_image(
        &self,
        _image: &ScanImage,
    ) -> Result<ClassificationResult, BackendError> {
        match &self.classification {
            Some(label) => Ok(ClassificationResult::new(label.clone())),
            None => Err(BackendError::Transport("connection refused".to_string())),
        }
    }

    async fn explain(&self, _message: &str, _language: &str) -> Result<String, BackendError> {
        Ok(STUB_EXPLANATION.to_string())
    }

    async fn reverse_geocode(&self, _position: Coordinates) -> Result<GeocodedPlace, BackendError> {
        Ok(GeocodedPlace {
            city: Some("Lahore".to_string()),
            country: Some("Pakistan".to_string()),
        })
    }

    async fn find_doctors(
        &self,
        _location: &str,
        _disease: &str,
    ) -> Result<Vec<Provider>, BackendError> {
        Ok(self.doctors.clone())
    }

    async fn find_appointments(
        &self,
        _disease: &str,
        _location: &str,
    ) -> Result<Vec<Appointment>, BackendError> {
        Ok(self.appointments.clone())
    }
}
