pub mod error;
pub mod handlers;
pub mod rate_limit;

use crate::{
    config::Config,
    error::{Prompt2ImageError, Result},
    inference::InferenceClient,
    pipeline::GenerationPipeline,
    storage::ImageStore,
};
use actix_web::web;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use error::{ApiError, ApiResult};
pub use rate_limit::RateLimiter;

/// Services shared by every handler. Built once and handed to actix as
/// `web::Data`.
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: GenerationPipeline,
    pub store: Arc<ImageStore>,
    pub limiter: RateLimiter,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Open the store under `config.output_dir` and wire it to `client`.
    pub async fn new(config: Config, client: InferenceClient) -> Result<Self> {
        let store = Arc::new(ImageStore::open(&config).await?);
        Ok(Self::with_store(config, client, store))
    }

    pub fn with_store(config: Config, client: InferenceClient, store: Arc<ImageStore>) -> Self {
        let config = Arc::new(config);
        let limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        let pipeline = GenerationPipeline::new(Arc::new(client), store.clone(), config.clone());
        Self {
            config,
            pipeline,
            store,
            limiter,
            started_at: Utc::now(),
        }
    }
}

/// Register every route. Malformed JSON bodies are reported like any other
/// invalid request.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError(Prompt2ImageError::InvalidRequest(err.to_string())).into()
    }))
    .route("/", web::get().to(handlers::root))
    .route("/health", web::get().to(handlers::health))
    .route("/models", web::get().to(handlers::models))
    .route("/config", web::get().to(handlers::config_summary))
    .route("/generate", web::post().to(handlers::generate))
    .route("/gallery", web::get().to(handlers::gallery))
    .route("/image/{filename}", web::get().to(handlers::get_image))
    .route("/image/{filename}", web::delete().to(handlers::delete_image))
    .route("/output/{filename}", web::get().to(handlers::get_image))
    .route("/stats", web::get().to(handlers::stats));
}
