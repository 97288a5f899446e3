use thiserror::Error;

/// Failures surfaced by backend lookups and the generation backend. Neither
/// variant is fatal; both are recovered in the response composer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: &'static str, id: String },
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn order_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { kind: "order", id: id.into() }
    }

    pub fn tracking_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { kind: "tracking number", id: id.into() }
    }

    /// Only transient failures are worth another attempt; a missing record
    /// will still be missing on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
