pub mod models;
pub mod service;
pub mod sessions;

#[cfg(test)]
pub(crate) mod testing;

pub use models::*;
pub use service::{AppState, create_app};
pub use sessions::{ReportedPosition, ScanSession, SessionRegistry};
