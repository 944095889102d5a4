use super::transport::{InferenceTransport, TransportError, TransportResponse};
use crate::models::InferencePayload;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Test double that replays a fixed sequence of outcomes and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<std::result::Result<TransportResponse, TransportError>>>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<(String, InferencePayload)>>,
}

impl ScriptedTransport {
    pub fn new(
        script: impl IntoIterator<Item = std::result::Result<TransportResponse, TransportError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, outcome: std::result::Result<TransportResponse, TransportError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, InferencePayload)> {
        self.payloads.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceTransport for ScriptedTransport {
    async fn post(
        &self,
        url: &str,
        payload: &InferencePayload,
    ) -> std::result::Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push((url.to_string(), payload.clone()));
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Err(TransportError::Connection("script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new(vec![
            Ok(TransportResponse::json(503, "busy")),
            Ok(TransportResponse::image(vec![9])),
        ]);
        let payload = InferencePayload {
            inputs: "p".into(),
            parameters: crate::models::InferenceParameters {
                negative_prompt: String::new(),
                width: 64,
                height: 64,
                num_inference_steps: 1,
                guidance_scale: 1.0,
                seed: 0,
            },
        };

        assert_eq!(transport.post("u", &payload).await.unwrap().status, 503);
        assert_eq!(transport.post("u", &payload).await.unwrap().body, vec![9]);
        assert!(transport.post("u", &payload).await.is_err());
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.requests().len(), 3);
    }
}
