use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::models::{Appointment, ClassificationResult, Coordinates, Provider, ScanImage};

/// City and country parts a position resolved to. Either part may be
/// missing; composing them into a usable place is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodedPlace {
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Client for the analysis backend, one method per endpoint.
///
/// The workflow only ever talks to this trait, so tests swap in a scripted
/// implementation and the service wires up [`HttpBackend`].
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Liveness probe against the backend root.
    async fn health(&self) -> std::result::Result<(), BackendError>;

    /// Uploads the image and returns the predicted disease label.
    async fn classify_image(
        &self,
        image: &ScanImage,
    ) -> std::result::Result<ClassificationResult, BackendError>;

    /// Sends one conversational message and returns the model's reply text.
    async fn explain(
        &self,
        message: &str,
        language: &str,
    ) -> std::result::Result<String, BackendError>;

    /// Resolves a position fix to city and country parts.
    async fn reverse_geocode(
        &self,
        position: Coordinates,
    ) -> std::result::Result<GeocodedPlace, BackendError>;

    async fn find_doctors(
        &self,
        location: &str,
        disease: &str,
    ) -> std::result::Result<Vec<Provider>, BackendError>;

    async fn find_appointments(
        &self,
        disease: &str,
        location: &str,
    ) -> std::result::Result<Vec<Appointment>, BackendError>;
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    predicted_class: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct GeocodeRequest {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DoctorSearchRequest<'a> {
    location: &'a str,
    disease: &'a str,
}

#[derive(Debug, Deserialize)]
struct DoctorSearchResponse {
    #[serde(default)]
    doctors: Vec<Provider>,
}

#[derive(Debug, Serialize)]
struct AppointmentSearchRequest<'a> {
    disease: &'a str,
    location: &'a str,
}

#[derive(Debug, Deserialize)]
struct AppointmentSearchResponse {
    #[serde(default)]
    appointments: Vec<Appointment>,
}

/// HTTP implementation of [`BackendClient`] over the documented REST
/// surface: `/image`, `/chat`, `/get-location`, `/find-doctors`,
/// `/find-appointments` and the root liveness route.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> std::result::Result<T, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        decode_response(response).await
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn health(&self) -> std::result::Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                message: "liveness probe failed".to_string(),
            })
        }
    }

    async fn classify_image(
        &self,
        image: &ScanImage,
    ) -> std::result::Result<ClassificationResult, BackendError> {
        let mime = mime_guess::from_path(&image.file_name).first_or_octet_stream();
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| BackendError::Transport(format!("upload part rejected: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/image"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let prediction: PredictionResponse = decode_response(response).await?;
        Ok(ClassificationResult::new(prediction.predicted_class))
    }

    async fn explain(
        &self,
        message: &str,
        language: &str,
    ) -> std::result::Result<String, BackendError> {
        let reply: ChatResponse = self
            .post_json("/chat", &ChatRequest { message, language })
            .await?;
        Ok(reply.response)
    }

    async fn reverse_geocode(
        &self,
        position: Coordinates,
    ) -> std::result::Result<GeocodedPlace, BackendError> {
        let body = GeocodeRequest {
            latitude: position.latitude,
            longitude: position.longitude,
        };
        let place: GeocodeResponse = self.post_json("/get-location", &body).await?;
        if let Some(error) = place.error {
            return Err(BackendError::Rejected(error));
        }
        Ok(GeocodedPlace {
            city: place.city,
            country: place.country,
        })
    }

    async fn find_doctors(
        &self,
        location: &str,
        disease: &str,
    ) -> std::result::Result<Vec<Provider>, BackendError> {
        let found: DoctorSearchResponse = self
            .post_json("/find-doctors", &DoctorSearchRequest { location, disease })
            .await?;
        Ok(found.doctors)
    }

    async fn find_appointments(
        &self,
        disease: &str,
        location: &str,
    ) -> std::result::Result<Vec<Appointment>, BackendError> {
        let found: AppointmentSearchResponse = self
            .post_json(
                "/find-appointments",
                &AppointmentSearchRequest { disease, location },
            )
            .await?;
        Ok(found.appointments)
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.json::<Value>().await.ok();
        let message = body
            .as_ref()
            .and_then(extract_error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Pulls the backend's `{"error": "..."}` payload out of a response body.
fn extract_error(body: &Value) -> Option<String> {
    body.get("error")?.as_str().map(str::to_string)
}
