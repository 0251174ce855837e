//! Unified error type for all observers.

use thiserror::Error;

/// Unified error type for all observer operations.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A registry could not be exported.
    #[error("metric error: {0}")]
    Metric(String),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_display() {
        let err = ObserverError::Metric("empty registry".to_string());
        assert_eq!(err.to_string(), "metric error: empty registry");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json_error() {
        let err: ObserverError = serde_json::from_str::<u64>("not json").unwrap_err().into();
        assert!(matches!(err, ObserverError::Json(_)));
        assert!(err.to_string().starts_with("json error"));
    }
}
