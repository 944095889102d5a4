use crate::{
    config::Config,
    error::{Prompt2ImageError, Result},
};
use serde::{Deserialize, Serialize};

/// Body of `POST /generate`. Everything except the prompt falls back to config defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub guidance_scale: Option<f32>,
    pub model: Option<String>,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// A validated generation request. Fields are private so every instance has
/// passed `from_params`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    negative_prompt: Option<String>,
    width: u32,
    height: u32,
    steps: u32,
    guidance: f32,
    model_key: String,
}

impl GenerationRequest {
    pub fn from_params(params: GenerationParams, config: &Config) -> Result<Self> {
        let prompt = params.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(invalid("prompt must not be empty"));
        }
        let length = prompt.chars().count();
        if length > config.max_prompt_length {
            return Err(invalid(format!(
                "prompt is {} characters, the limit is {}",
                length, config.max_prompt_length
            )));
        }

        let width = params.width.unwrap_or(config.default_width);
        let height = params.height.unwrap_or(config.default_height);
        if width == 0 || height == 0 {
            return Err(invalid("width and height must be positive"));
        }
        if width > config.max_width || height > config.max_height {
            return Err(invalid(format!(
                "{}x{} exceeds the maximum of {}x{}",
                width, height, config.max_width, config.max_height
            )));
        }

        let steps = params.num_inference_steps.unwrap_or(config.default_steps);
        if steps == 0 || steps > config.max_steps {
            return Err(invalid(format!(
                "num_inference_steps must be between 1 and {}",
                config.max_steps
            )));
        }

        let guidance = params.guidance_scale.unwrap_or(config.default_guidance);
        if !guidance.is_finite() || guidance <= 0.0 {
            return Err(invalid("guidance_scale must be positive"));
        }

        let negative_prompt = params
            .negative_prompt
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            prompt,
            negative_prompt,
            width,
            height,
            steps,
            guidance,
            model_key: params
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| config.default_model.clone()),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn guidance(&self) -> f32 {
        self.guidance
    }

    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    /// Same parameters, different prompt. Used for variations.
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..self.clone()
        }
    }

    /// First 50 characters, for log lines.
    pub fn prompt_preview(&self) -> String {
        prompt_preview(&self.prompt)
    }
}

pub fn prompt_preview(prompt: &str) -> String {
    let mut preview: String = prompt.chars().take(50).collect();
    if prompt.chars().count() > 50 {
        preview.push_str("...");
    }
    preview
}

fn invalid(msg: impl Into<String>) -> Prompt2ImageError {
    Prompt2ImageError::InvalidRequest(msg.into())
}

/// Decoded and checked output of the inference endpoint.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub format: ::image::ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// JSON body sent to the inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferencePayload {
    pub inputs: String,
    pub parameters: InferenceParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceParameters {
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub image_id: String,
    pub filename: String,
    pub prompt: String,
    pub enhanced_prompt: String,
    pub model: String,
}
