use std::time::Duration;
use thiserror::Error;

/// Why a call to the inference endpoint did not produce an image.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("inference service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("exhausted {attempts} attempts, last error: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },

    #[error("model still loading after waiting {waited:?}")]
    ModelLoadingTimeout { waited: Duration },

    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Prompt2ImageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Remote service error: {0}")]
    RemoteService(#[from] InferenceFailure),

    #[error("Invalid output image: {0}")]
    InvalidOutput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
}

impl From<std::io::Error> for Prompt2ImageError {
    fn from(err: std::io::Error) -> Self {
        Prompt2ImageError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Prompt2ImageError>;
