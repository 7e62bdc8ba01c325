use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid GPX: {0}")]
    InvalidGpx(String),
    #[error("Invalid FIT: {0}")]
    InvalidFit(String),
    #[error("Unrecognised track format")]
    UnknownFormat,
    #[error("No track points found in file")]
    EmptyFile,
    #[error("Track point {index} is missing its {field} attribute")]
    MissingCoordinate { index: usize, field: &'static str },
    #[error("Track point {index} has a non-numeric {field}: {value:?}")]
    InvalidCoordinate {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("Track point {index} has {field} {value} outside the valid range")]
    CoordinateOutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("Track point {index} is timestamped before the point preceding it")]
    TimestampsOutOfOrder { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient data points (need at least 2, got {0})")]
    InsufficientPoints(usize),
    #[error("Rider weight must be a positive number of kilograms, got {0}")]
    InvalidRiderWeight(f64),
}

/// Failures talking to a third-party API. Always recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("{service} did not answer within {timeout:?}")]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },
    #[error("{service} rate limit hit")]
    RateLimited { service: &'static str },
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} response could not be read: {message}")]
    InvalidPayload {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned no observations")]
    NoData { service: &'static str },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request cancelled")]
    Cancelled,
}

impl ExternalServiceError {
    /// Maps a failed send, keeping timeouts distinguishable.
    pub fn from_reqwest(service: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExternalServiceError::Timeout { service, timeout }
        } else {
            ExternalServiceError::Request(err)
        }
    }

    /// Maps a non-success HTTP status to the matching error.
    pub fn from_status(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ExternalServiceError::RateLimited { service }
        } else {
            ExternalServiceError::Status {
                service,
                status: status.as_u16(),
                body,
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{provider} is not configured: missing {variable}")]
    MissingCredential {
        provider: &'static str,
        variable: &'static str,
    },
}

/// Errors from any weather backend call.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    External(#[from] ExternalServiceError),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::External(ExternalServiceError::Request(err))
    }
}

/// The only failures an analysis surfaces to its caller.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Analysis cancelled")]
    Cancelled,
}
