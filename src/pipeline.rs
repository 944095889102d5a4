use crate::{
    config::Config,
    error::{Prompt2ImageError, Result},
    inference::{InferenceClient, PromptEnhancer},
    logger,
    models::{GenerationOutcome, GenerationParams, GenerationRequest},
    storage::ImageStore,
    validation::ImageValidator,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CONNECTION_TEST_PROMPT: &str = "a simple test image";

/// enhance -> remote call -> validate -> persist. Nothing is written to the
/// store unless the bytes pass validation.
#[derive(Clone)]
pub struct GenerationPipeline {
    client: Arc<InferenceClient>,
    enhancer: PromptEnhancer,
    validator: ImageValidator,
    store: Arc<ImageStore>,
    config: Arc<Config>,
}

impl GenerationPipeline {
    pub fn new(client: Arc<InferenceClient>, store: Arc<ImageStore>, config: Arc<Config>) -> Self {
        Self {
            client,
            enhancer: PromptEnhancer::new(),
            validator: ImageValidator::new(),
            store,
            config,
        }
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        self.generate_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let _timer = logger::timer("Image generation");
        let enhanced = self.enhancer.enhance(request.prompt());
        log::debug!("Enhanced prompt: {}", enhanced);

        let bytes = self
            .client
            .generate_with_cancel(&request.with_prompt(enhanced.clone()), cancel)
            .await?;

        let image = self.validator.inspect(&bytes).map_err(|reason| {
            log::error!(
                "Discarding output for \"{}\": {}",
                request.prompt_preview(),
                reason
            );
            Prompt2ImageError::InvalidOutput(reason.to_string())
        })?;

        let image_id = Uuid::new_v4().to_string();
        let filename = self
            .store
            .save(&image.bytes, request.prompt(), &image_id)
            .await?;

        log::info!(
            "Generated {} ({}x{}) for \"{}\"",
            filename,
            image.width,
            image.height,
            request.prompt_preview()
        );

        Ok(GenerationOutcome {
            image_id,
            filename,
            prompt: request.prompt().to_string(),
            enhanced_prompt: enhanced,
            model: self.client.registry().resolve(request.model_key()).to_string(),
        })
    }

    /// Runs the pipeline `count` times, one after another, with a different
    /// style suffix each time, and keeps the successes. Once the suffixes run
    /// out the prompt is used unchanged.
    pub async fn generate_variations(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> Vec<GenerationOutcome> {
        let mut outcomes = Vec::with_capacity(count);

        for index in 0..count {
            let varied = request.with_prompt(self.enhancer.add_variation(request.prompt(), index));
            match self.generate(&varied).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => log::warn!("Variation {} failed: {}", index + 1, e),
            }
        }

        log::info!("Generated {}/{} variations", outcomes.len(), count);
        outcomes
    }

    /// One unsaved generation against the endpoint.
    pub async fn test_connection(&self) -> bool {
        let request = match GenerationRequest::from_params(
            GenerationParams::new(CONNECTION_TEST_PROMPT),
            &self.config,
        ) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Connection test could not build a request: {}", e);
                return false;
            }
        };

        let request = request.with_prompt(self.enhancer.enhance(request.prompt()));
        match self.client.generate(&request).await {
            Ok(bytes) => {
                let ok = self.validator.validate(&bytes);
                if ok {
                    log::info!("✅ Inference endpoint reachable");
                }
                ok
            }
            Err(e) => {
                log::error!("❌ Connection test failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceFailure;
    use crate::inference::{ScriptedTransport, TransportResponse};
    use crate::validation::tests::encoded;
    use image::ImageFormat;

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<ScriptedTransport>,
        pipeline: GenerationPipeline,
        config: Config,
    }

    async fn fixture(transport: ScriptedTransport) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new()
            .with_token("hf_test")
            .with_output_dir(dir.path())
            .with_inference_base_url("http://inference.test/models");
        let transport = Arc::new(transport);
        let client = Arc::new(InferenceClient::new(transport.clone(), &config));
        let store = Arc::new(ImageStore::open(&config).await.unwrap());
        let pipeline = GenerationPipeline::new(client, store, Arc::new(config.clone()));
        Fixture {
            _dir: dir,
            transport,
            pipeline,
            config,
        }
    }

    fn png_response() -> std::result::Result<TransportResponse, crate::inference::TransportError> {
        Ok(TransportResponse::image(encoded(512, 512, ImageFormat::Png)))
    }

    fn request(prompt: &str, config: &Config) -> GenerationRequest {
        GenerationRequest::from_params(GenerationParams::new(prompt), config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_stores_validated_image() {
        let f = fixture(ScriptedTransport::new(vec![png_response()])).await;

        let outcome = f
            .pipeline
            .generate(&request("A portrait of a fox", &f.config))
            .await
            .unwrap();

        assert_eq!(outcome.prompt, "A portrait of a fox");
        assert!(outcome.enhanced_prompt.starts_with("A portrait of a fox, "));
        assert_eq!(outcome.model, "stabilityai/stable-diffusion-xl-base-1.0");
        assert!(outcome.filename.starts_with("a_portrait_of_a_fox_"));

        let record = f.pipeline.store().get(&outcome.image_id).await.unwrap();
        assert_eq!(record.filename, outcome.filename);
        assert_eq!(record.prompt, "A portrait of a fox");

        let sent = f.transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.inputs, outcome.enhanced_prompt);
    }

    #[tokio::test]
    async fn test_invalid_output_leaves_no_file() {
        let f = fixture(ScriptedTransport::new(vec![Ok(TransportResponse::image(
            encoded(10, 10, ImageFormat::Png),
        ))]))
        .await;

        let result = f.pipeline.generate(&request("tiny", &f.config)).await;

        assert!(matches!(result, Err(Prompt2ImageError::InvalidOutput(_))));
        assert!(f.pipeline.store().list().await.unwrap().is_empty());
        assert_eq!(f.pipeline.store().storage_info().await.unwrap().total_files, 0);
    }

    #[tokio::test]
    async fn test_remote_failure_is_propagated() {
        let f = fixture(ScriptedTransport::new(vec![Ok(TransportResponse::json(
            401,
            "unauthorized",
        ))]))
        .await;

        let result = f.pipeline.generate(&request("a cat", &f.config)).await;

        assert!(matches!(
            result,
            Err(Prompt2ImageError::RemoteService(InferenceFailure::HttpStatus {
                status: 401,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let f = fixture(ScriptedTransport::new(vec![png_response()])).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = f
            .pipeline
            .generate_with_cancel(&request("a cat", &f.config), &cancel)
            .await;

        assert!(matches!(
            result,
            Err(Prompt2ImageError::RemoteService(InferenceFailure::Cancelled))
        ));
        assert_eq!(f.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_variations_keep_successes() {
        let f = fixture(ScriptedTransport::new(vec![
            png_response(),
            Ok(TransportResponse::json(400, "bad request")),
            png_response(),
        ]))
        .await;

        let outcomes = f
            .pipeline
            .generate_variations(&request("a lighthouse", &f.config), 3)
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].prompt, "a lighthouse, artistic style");
        assert_eq!(outcomes[1].prompt, "a lighthouse, vibrant colors");
        assert_eq!(f.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_variations_past_the_suffix_list_reuse_the_prompt() {
        let f = fixture(ScriptedTransport::new((0..8).map(|_| png_response()))).await;

        let outcomes = f
            .pipeline
            .generate_variations(&request("a boat", &f.config), 8)
            .await;

        assert_eq!(outcomes.len(), 8);
        assert_eq!(f.transport.calls(), 8);
        assert_eq!(outcomes[5].prompt, "a boat, minimalist style");
        assert_eq!(outcomes[6].prompt, "a boat");
        assert_eq!(outcomes[7].prompt, "a boat");
    }

    #[tokio::test]
    async fn test_connection_check_does_not_persist() {
        let f = fixture(ScriptedTransport::new(vec![png_response()])).await;

        assert!(f.pipeline.test_connection().await);
        assert!(f.pipeline.store().list().await.unwrap().is_empty());
        let sent = &f.transport.requests()[0].1.inputs;
        assert_eq!(sent, &PromptEnhancer::new().enhance(CONNECTION_TEST_PROMPT));
        assert!(sent.starts_with("a simple test image, high quality"));
    }

    #[tokio::test]
    async fn test_connection_check_reports_failure() {
        let f = fixture(ScriptedTransport::new(vec![Ok(TransportResponse::json(
            403, "forbidden",
        ))]))
        .await;

        assert!(!f.pipeline.test_connection().await);
    }
}
