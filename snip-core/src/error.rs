use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed input ({entity}): {reason}")]
    MalformedInput { entity: String, reason: String },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Invalid node index")]
    InvalidNodeIndex,
    #[error("No points found for aggregation")]
    NoPointsFound,
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn malformed(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
