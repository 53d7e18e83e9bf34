use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Platform error codes the management API is known to surface in its
/// error body. Anything else is treated as opaque and non-retryable.
pub const RATE_EXCEEDED_CODE: u32 = 10000;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("{codename_or_id} not found")]
    NotFound { codename_or_id: String },

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        status: StatusCode,
        body: String,
        error_code: Option<u32>,
    },

    #[error("retry limit reached after {attempts} attempts (last status {status:?})")]
    RetryLimitReached {
        attempts: u32,
        status: Option<StatusCode>,
    },

    #[error("bad publish: {message}")]
    BadPublish { message: String },
}

impl Error {
    /// Platform errors carrying no code, or exactly the rate-exceeded code,
    /// are retryable per the retry policy; everything else surfaces
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            Error::UnexpectedStatus { error_code, .. } => {
                error_code.is_none() || *error_code == Some(RATE_EXCEEDED_CODE)
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
            || matches!(self, Error::UnexpectedStatus { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn is_bad_publish(&self) -> bool {
        matches!(self, Error::BadPublish { .. })
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PlatformErrorBody {
    pub message: Option<String>,
    pub error_code: Option<u32>,
    #[serde(default)]
    pub request_id: Option<String>,
}
