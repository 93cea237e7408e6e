use serde::{Deserialize, Serialize};

/// Disease label predicted by the classification backend.
///
/// Immutable for the lifetime of an analysis pass; a fresh submission
/// starts a new pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// A device position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A human-readable place used as the search area.
///
/// Always non-empty. Composed from reverse-geocoded parts or accepted
/// verbatim from manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location {
    text: String,
}

impl Location {
    /// Accepts any text with visible content; returns `None` for blank input.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                text: trimmed.to_string(),
            })
        }
    }

    /// Builds the display form from reverse-geocoded parts:
    /// `"City, Country"` when both are present, `"Country"` when only the
    /// country is. Anything less resolves to nothing.
    pub fn compose(city: Option<&str>, country: Option<&str>) -> Option<Self> {
        let city = city.map(str::trim).filter(|c| !c.is_empty());
        let country = country.map(str::trim).filter(|c| !c.is_empty());
        match (city, country) {
            (Some(city), Some(country)) => Self::new(format!("{city}, {country}")),
            (None, Some(country)) => Self::new(country),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A healthcare provider search hit.
///
/// Only the title is guaranteed; everything else depends on how much the
/// search backend knew about the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A bookable appointment slot from the appointment search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub doctor_name: String,
    pub specialty: String,
    pub location: String,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// An MRI image selected for submission, carried as opaque bytes.
#[derive(Clone)]
pub struct ScanImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ScanImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for ScanImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanImage")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
