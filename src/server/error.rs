use crate::error::Prompt2ImageError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// The one place where pipeline failures become HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub Prompt2ImageError);

impl ApiError {
    fn summary(&self) -> &'static str {
        match &self.0 {
            Prompt2ImageError::InvalidRequest(_) => "Invalid request",
            Prompt2ImageError::NotFound(_) => "Image not found",
            Prompt2ImageError::RateLimited(_) => "Too many requests",
            Prompt2ImageError::RemoteService(_) | Prompt2ImageError::InvalidOutput(_) => {
                "Image generation failed"
            }
            Prompt2ImageError::Storage(_) => "Storage error",
            Prompt2ImageError::Config(_) => "Server misconfigured",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Prompt2ImageError> for ApiError {
    fn from(err: Prompt2ImageError) -> Self {
        ApiError(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Prompt2ImageError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Prompt2ImageError::NotFound(_) => StatusCode::NOT_FOUND,
            Prompt2ImageError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}: {}", self.summary(), self.0);
        } else {
            log::warn!("{}: {}", self.summary(), self.0);
        }

        HttpResponse::build(status).json(json!({
            "success": false,
            "message": self.summary(),
            "error": self.0.to_string(),
        }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
