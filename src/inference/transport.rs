use crate::{
    error::{Prompt2ImageError, Result},
    models::InferencePayload,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Raw HTTP answer from the inference endpoint.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png".to_string(),
            body: bytes,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("image")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// One POST to the inference endpoint.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        payload: &InferencePayload,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport that authenticates with a bearer token.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpTransport {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Prompt2ImageError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, token })
    }
}

#[async_trait]
impl InferenceTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        payload: &InferencePayload,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec();

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    // reqwest includes the URL but never the headers, so the token stays out
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_detection() {
        assert!(TransportResponse::image(vec![1]).is_image());
        assert!(!TransportResponse::json(200, "{}").is_image());

        let upper = TransportResponse {
            status: 200,
            content_type: "IMAGE/JPEG".into(),
            body: vec![],
        };
        assert!(upper.is_image());
    }

    #[test]
    fn test_http_transport_debug_hides_token() {
        let transport =
            HttpTransport::new(Some("hf_secret".into()), Duration::from_secs(5)).unwrap();
        assert!(!format!("{:?}", transport).contains("hf_secret"));
    }
}
