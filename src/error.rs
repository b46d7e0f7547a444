use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] snip_core::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Feature {feature}: {reason}")]
    Attribute { feature: String, reason: String },
    #[error("Sweep case name {0:?} is not a plain directory name")]
    CaseName(String),
    #[error("Scenario did not finish within {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn attribute(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Attribute {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}
