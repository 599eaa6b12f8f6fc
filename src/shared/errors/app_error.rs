use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service answered 429. Distinct from this layer's own limiter.
    #[error("Remote rate limit hit{}", retry_suffix(.retry_after_secs))]
    RemoteRateLimited { retry_after_secs: Option<u64> },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {message}")]
    ApiError {
        status: Option<u16>,
        message: String,
    },

    /// Local sliding-window admission failed. Raised immediately, never slept on.
    #[error("Rate limit exceeded for '{operation}', retry after {retry_after_secs:.1} seconds")]
    RateLimitExceeded {
        operation: String,
        retry_after_secs: f64,
    },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: Box<AppError> },

    #[error("Batch of {requested} ids exceeds the per-request ceiling of {max}")]
    InvalidBatchSize { requested: usize, max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn retry_suffix(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {} seconds", secs),
        None => String::new(),
    }
}

impl AppError {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::ApiError {
            status,
            message: message.into(),
        }
    }

    /// The failure that actually ended an operation, looking through retry wrapping.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::RetryExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Only consulted by `RetryOn::TransientOnly`; the default policy retries everything.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::RemoteRateLimited { .. }
            | AppError::RateLimitExceeded { .. }
            | AppError::NetworkError(_)
            | AppError::InternalError(_) => true,

            AppError::ApiError { status, .. } => match status {
                Some(code) => *code >= 500 || *code == 408,
                None => true,
            },

            AppError::RetryExhausted { last, .. } => last.is_transient(),

            AppError::NotFound(_)
            | AppError::InvalidBatchSize { .. }
            | AppError::InvalidInput(_)
            | AppError::SerializationError(_) => false,
        }
    }

    /// Server-suggested or locally estimated wait before trying again.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self.root_cause() {
            AppError::RemoteRateLimited {
                retry_after_secs: Some(secs),
            } => Some(std::time::Duration::from_secs(*secs)),
            AppError::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(std::time::Duration::from_secs_f64(retry_after_secs.max(0.0))),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::NetworkError(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            AppError::NetworkError(format!("Failed to connect: {}", err))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => AppError::RemoteRateLimited {
                    retry_after_secs: None,
                },
                404 => AppError::NotFound(err.to_string()),
                code => AppError::api(Some(code), err.to_string()),
            }
        } else if err.is_decode() {
            AppError::SerializationError(err.to_string())
        } else {
            AppError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::InvalidInput(format!("Invalid number: {}", err))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(err: std::num::ParseFloatError) -> Self {
        AppError::InvalidInput(format!("Invalid decimal number: {}", err))
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
