use crate::{
    config::Config,
    error::{InferenceFailure, Result},
    inference::{
        registry::ModelRegistry,
        transport::{HttpTransport, InferenceTransport, TransportError, TransportResponse},
    },
    models::{prompt_preview, GenerationRequest, InferenceParameters, InferencePayload},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempt budget and wait lengths for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub model_loading_delay: Duration,
    /// Total time spent in model-loading waits before giving up. These waits
    /// never consume an attempt.
    pub max_model_loading_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            model_loading_delay: Duration::from_secs(20),
            max_model_loading_wait: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// States of one call's retry loop.
#[derive(Debug)]
enum RetryState {
    Attempting { attempt: u32 },
    Backoff { next_attempt: u32, delay: Duration },
    WaitingForModelLoad { attempt: u32 },
    Succeeded(Vec<u8>),
    ExhaustedFailed(InferenceFailure),
}

/// Calls the hosted inference endpoint with bounded retries.
#[derive(Clone)]
pub struct InferenceClient {
    transport: Arc<dyn InferenceTransport>,
    registry: ModelRegistry,
    policy: RetryPolicy,
    base_url: String,
    default_negative_prompt: String,
}

impl InferenceClient {
    pub fn new(transport: Arc<dyn InferenceTransport>, config: &Config) -> Self {
        Self {
            transport,
            registry: ModelRegistry::new(),
            policy: RetryPolicy::default(),
            base_url: config.inference_base_url.clone(),
            default_negative_prompt: config.default_negative_prompt.clone(),
        }
    }

    /// Client over the real HTTP transport, authenticated with the configured token.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport =
            HttpTransport::new(config.huggingface_token.clone(), config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Request body for `request`, whose prompt is sent as-is.
    pub fn build_payload(&self, request: &GenerationRequest) -> InferencePayload {
        InferencePayload {
            inputs: request.prompt().to_string(),
            parameters: InferenceParameters {
                negative_prompt: request
                    .negative_prompt()
                    .unwrap_or(&self.default_negative_prompt)
                    .to_string(),
                width: request.width(),
                height: request.height(),
                num_inference_steps: request.steps(),
                guidance_scale: request.guidance(),
                // varies results between calls; not a security value
                seed: chrono::Utc::now().timestamp().max(0) as u64,
            },
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Vec<u8>, InferenceFailure> {
        self.generate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like `generate`, but gives up with `Cancelled` as soon as `cancel` fires,
    /// including during backoff and model-loading waits.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, InferenceFailure> {
        let url = self.registry.endpoint(&self.base_url, request.model_key());
        let payload = self.build_payload(request);
        let preview = prompt_preview(request.prompt());
        let mut loading_waited = Duration::ZERO;

        log::info!(
            "Requesting image from {} for \"{}\"",
            self.registry.resolve(request.model_key()),
            preview
        );

        let mut state = RetryState::Attempting { attempt: 0 };
        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let outcome =
                        until_cancelled(cancel, self.transport.post(&url, &payload)).await?;
                    match outcome {
                        Ok(response) => self.on_response(attempt, response, &preview),
                        Err(TransportError::Other(msg)) => {
                            RetryState::ExhaustedFailed(InferenceFailure::Network(msg))
                        }
                        Err(err) => {
                            log::warn!(
                                "Request failed, attempt {}/{} for \"{}\": {}",
                                attempt + 1,
                                self.policy.max_attempts,
                                preview,
                                err
                            );
                            self.retry_or_fail(attempt, || InferenceFailure::ExhaustedRetries {
                                attempts: attempt + 1,
                                last_error: err.to_string(),
                            })
                        }
                    }
                }
                RetryState::Backoff { next_attempt, delay } => {
                    log::debug!("Backing off {:?} before attempt {}", delay, next_attempt + 1);
                    until_cancelled(cancel, tokio::time::sleep(delay)).await?;
                    RetryState::Attempting {
                        attempt: next_attempt,
                    }
                }
                RetryState::WaitingForModelLoad { attempt } => {
                    let delay = self.policy.model_loading_delay;
                    if loading_waited + delay > self.policy.max_model_loading_wait {
                        RetryState::ExhaustedFailed(InferenceFailure::ModelLoadingTimeout {
                            waited: loading_waited,
                        })
                    } else {
                        log::info!("Model is loading, waiting {:?}", delay);
                        until_cancelled(cancel, tokio::time::sleep(delay)).await?;
                        loading_waited += delay;
                        RetryState::Attempting { attempt }
                    }
                }
                RetryState::Succeeded(bytes) => {
                    log::info!("Received {} bytes for \"{}\"", bytes.len(), preview);
                    return Ok(bytes);
                }
                RetryState::ExhaustedFailed(failure) => {
                    log::error!("Image request for \"{}\" failed: {}", preview, failure);
                    return Err(failure);
                }
            };
        }
    }

    fn on_response(&self, attempt: u32, response: TransportResponse, preview: &str) -> RetryState {
        match response.status {
            200..=299 if response.is_image() => RetryState::Succeeded(response.body),
            200..=299 => {
                let text = response.text();
                if text.to_lowercase().contains("loading") {
                    RetryState::WaitingForModelLoad { attempt }
                } else {
                    log::error!("Unexpected non-image response for \"{}\": {}", preview, text);
                    RetryState::ExhaustedFailed(InferenceFailure::MalformedResponse(format!(
                        "expected an image, got {:?}: {}",
                        response.content_type, text
                    )))
                }
            }
            503 => {
                log::warn!(
                    "Service unavailable, attempt {}/{}",
                    attempt + 1,
                    self.policy.max_attempts
                );
                self.retry_or_fail(attempt, || InferenceFailure::ServiceUnavailable {
                    attempts: attempt + 1,
                })
            }
            status => {
                let body = response.text();
                log::error!("HTTP {} for \"{}\": {}", status, preview, body);
                RetryState::ExhaustedFailed(InferenceFailure::HttpStatus { status, body })
            }
        }
    }

    fn retry_or_fail<F>(&self, attempt: u32, failure: F) -> RetryState
    where
        F: FnOnce() -> InferenceFailure,
    {
        if attempt + 1 >= self.policy.max_attempts {
            RetryState::ExhaustedFailed(failure())
        } else {
            RetryState::Backoff {
                next_attempt: attempt + 1,
                delay: self.policy.backoff_delay(attempt),
            }
        }
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> std::result::Result<F::Output, InferenceFailure> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InferenceFailure::Cancelled),
        out = fut => Ok(out),
    }
}
