pub mod client;
pub mod prompt;
pub mod registry;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod transport;

pub use client::{InferenceClient, RetryPolicy};
pub use prompt::PromptEnhancer;
pub use registry::ModelRegistry;
pub use transport::{HttpTransport, InferenceTransport, TransportError, TransportResponse};

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedTransport;
