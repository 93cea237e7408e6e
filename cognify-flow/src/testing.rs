//! Hand-written doubles shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::backend::{BackendClient, GeocodedPlace};
use crate::error::BackendError;
use crate::location::{GeolocationError, GeolocationSource};
use crate::models::{Appointment, ClassificationResult, Coordinates, Provider, ScanImage};

pub(crate) const SAMPLE_EXPLANATION: &str = "**Understanding Very Mild Dementia:**\n\nVery mild dementia describes the earliest measurable decline in memory and reasoning.\n\n1. **Consult a neurologist**: Book a full assessment.\n2. **Stay active**: Daily exercise supports cognition.";

pub(crate) fn lahore_fix() -> Coordinates {
    Coordinates {
        latitude: 31.5204,
        longitude: 74.3587,
    }
}

pub(crate) fn provider(title: &str) -> Provider {
    Provider {
        title: title.to_string(),
        link: Some("https://example.com/listing".to_string()),
        snippet: Some("Neurology clinic".to_string()),
        address: Some("12 Mall Road".to_string()),
        rating: Some(4.7),
        rating_count: Some(134),
        phone: Some("+92 42 111 222".to_string()),
    }
}

pub(crate) fn appointment(doctor_name: &str) -> Appointment {
    Appointment {
        doctor_name: doctor_name.to_string(),
        specialty: "Neurologist".to_string(),
        location: "Lahore".to_string(),
        date: "Book online".to_string(),
        time: "Contact clinic".to_string(),
        phone: Some("+92 42 111 333".to_string()),
        address: Some("45 Gulberg".to_string()),
    }
}

/// Scripted backend. `None` in a response slot makes that call fail; the
/// `*_failures` counters fail that many leading calls first, which is how
/// retry paths are exercised. Counters record how often each endpoint was
/// hit so tests can assert a call never went out.
///
/// With `yield_before_reply` set, the slow endpoints suspend once before
/// answering, which lets tests interleave a competing operation at a
/// deterministic point.
pub(crate) struct MockBackend {
    pub healthy: bool,
    pub yield_before_reply: bool,
    pub classification: Option<String>,
    pub explanations: Mutex<Vec<String>>,
    pub place: Option<GeocodedPlace>,
    pub doctors: Mutex<Option<Vec<Provider>>>,
    pub appointments: Option<Vec<Appointment>>,

    pub classify_failures: AtomicUsize,
    pub doctor_failures: AtomicUsize,

    pub health_calls: AtomicUsize,
    pub classify_calls: AtomicUsize,
    pub explain_calls: AtomicUsize,
    pub geocode_calls: AtomicUsize,
    pub doctor_calls: AtomicUsize,
    pub appointment_calls: AtomicUsize,

    pub last_chat: Mutex<Option<(String, String)>>,
    pub last_doctor_query: Mutex<Option<(String, String)>>,
}

impl MockBackend {
    /// Every endpoint answers successfully with plausible data.
    pub(crate) fn happy() -> Self {
        Self {
            healthy: true,
            yield_before_reply: false,
            classification: Some("Very_Mild_Demented".to_string()),
            explanations: Mutex::new(vec![SAMPLE_EXPLANATION.to_string()]),
            place: Some(GeocodedPlace {
                city: Some("Lahore".to_string()),
                country: Some("Pakistan".to_string()),
            }),
            doctors: Mutex::new(Some(vec![
                provider("City Neurology Center"),
                provider("Dr. Ahmed Khan"),
            ])),
            appointments: Some(vec![appointment("Dr. Sara Malik")]),
            classify_failures: AtomicUsize::new(0),
            doctor_failures: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
            classify_calls: AtomicUsize::new(0),
            explain_calls: AtomicUsize::new(0),
            geocode_calls: AtomicUsize::new(0),
            doctor_calls: AtomicUsize::new(0),
            appointment_calls: AtomicUsize::new(0),
            last_chat: Mutex::new(None),
            last_doctor_query: Mutex::new(None),
        }
    }

    fn consume_failure(counter: &AtomicUsize) -> bool {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining > 0 {
            counter.store(remaining - 1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    async fn maybe_yield(&self) {
        if self.yield_before_reply {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn health(&self) -> Result<(), BackendError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy {
            Ok(())
        } else {
            Err(BackendError::Transport("connection refused".to_string()))
        }
    }

    async fn classify_image(
        &self,
        _image: &ScanImage,
    ) -> Result<ClassificationResult, BackendError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_yield().await;
        if Self::consume_failure(&self.classify_failures) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        match &self.classification {
            Some(label) => Ok(ClassificationResult::new(label.clone())),
            None => Err(BackendError::Status {
                status: 500,
                message: "Error processing the file".to_string(),
            }),
        }
    }

    async fn explain(&self, message: &str, language: &str) -> Result<String, BackendError> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_yield().await;
        *self.last_chat.lock().unwrap() = Some((message.to_string(), language.to_string()));
        let mut queue = self.explanations.lock().unwrap();
        if queue.is_empty() {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        if queue.len() == 1 {
            Ok(queue[0].clone())
        } else {
            Ok(queue.remove(0))
        }
    }

    async fn reverse_geocode(&self, _position: Coordinates) -> Result<GeocodedPlace, BackendError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        match &self.place {
            Some(place) => Ok(place.clone()),
            None => Err(BackendError::Rejected(
                "Unable to get location details".to_string(),
            )),
        }
    }

    async fn find_doctors(
        &self,
        location: &str,
        disease: &str,
    ) -> Result<Vec<Provider>, BackendError> {
        self.doctor_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_yield().await;
        *self.last_doctor_query.lock().unwrap() =
            Some((location.to_string(), disease.to_string()));
        if Self::consume_failure(&self.doctor_failures) {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        let doctors = self.doctors.lock().unwrap().clone();
        match doctors {
            Some(doctors) => Ok(doctors),
            None => Err(BackendError::Status {
                status: 503,
                message: "search backend down".to_string(),
            }),
        }
    }

    async fn find_appointments(
        &self,
        _disease: &str,
        _location: &str,
    ) -> Result<Vec<Appointment>, BackendError> {
        self.appointment_calls.fetch_add(1, Ordering::SeqCst);
        match &self.appointments {
            Some(appointments) => Ok(appointments.clone()),
            None => Err(BackendError::Status {
                status: 503,
                message: "appointment backend down".to_string(),
            }),
        }
    }
}

/// Scripted platform position facility.
pub(crate) enum MockGeolocation {
    Fix(Coordinates),
    Denied(String),
    Unsupported,
}

#[async_trait]
impl GeolocationSource for MockGeolocation {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        match self {
            MockGeolocation::Fix(position) => Ok(*position),
            MockGeolocation::Denied(reason) => Err(GeolocationError::Denied(reason.clone())),
            MockGeolocation::Unsupported => Err(GeolocationError::Unsupported),
        }
    }
}
