pub mod config;
pub mod error;
pub mod inference;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod validation;

#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, ConfigSummary, ConfigValidation};
pub use error::{InferenceFailure, Prompt2ImageError, Result};
pub use inference::{
    HttpTransport, InferenceClient, InferenceTransport, ModelRegistry, PromptEnhancer,
    RetryPolicy, TransportError, TransportResponse,
};

#[cfg(any(test, feature = "test-util"))]
pub use inference::ScriptedTransport;
pub use models::{
    GalleryEntry, GeneratedImage, GenerationOutcome, GenerationParams, GenerationRequest,
    InferencePayload, ModelInfo, StorageInfo, StoredImageRecord,
};
pub use pipeline::GenerationPipeline;
pub use storage::ImageStore;
pub use validation::ImageValidator;

#[cfg(feature = "server")]
pub use server::AppState;
