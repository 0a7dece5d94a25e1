use {
    thiserror::Error,
    crate::collector::{CollectionOutcome, StopReason},
};

/// Page-level failure of the review source. Always retryable.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("review source returned status: {0}")]
    Status(u16),

    #[error("malformed review page: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("sentiment model is unavailable: {0}")]
    ModelUnavailable(String),
}

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("sentiment model is unavailable: {0}")]
    ModelUnavailable(String),

    #[error("invalid confidence threshold: {0} (expected a value between 0 and 1)")]
    InvalidThreshold(String),

    #[error("none of the {processed} processed reviews met the confidence threshold (stopped: {stop_reason}); try lowering the threshold")]
    NoQualifyingReviews {
        processed: u32,
        stop_reason: StopReason,
        /// Session counters, with nothing accepted.
        outcome: Box<CollectionOutcome>,
    },
}

impl From<PredictorError> for CollectorError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::ModelUnavailable(reason) => CollectorError::ModelUnavailable(reason),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum LanguageError {
    #[error("language could not be determined")]
    Undetermined,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("database connection string is not configured")]
    NotConfigured,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
