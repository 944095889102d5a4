use crate::models::ModelInfo;
use std::collections::BTreeMap;

pub const DEFAULT_MODEL_KEY: &str = "stable-diffusion-xl";

const MODELS: &[(&str, &str)] = &[
    ("stable-diffusion-xl", "stabilityai/stable-diffusion-xl-base-1.0"),
    ("stable-diffusion-2", "stabilityai/stable-diffusion-2-1"),
    ("midjourney", "prompthero/openjourney-v4"),
    ("anime", "hakurei/waifu-diffusion"),
    ("realistic", "runwayml/stable-diffusion-v1-5"),
];

/// Maps short model keys to hosted model identifiers. Unknown keys resolve
/// to the default entry.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: BTreeMap<&'static str, &'static str>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            models: MODELS.iter().copied().collect(),
        }
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn resolve(&self, key: &str) -> &'static str {
        match self.models.get(key) {
            Some(model_id) => model_id,
            None => {
                log::debug!("Unknown model key {:?}, using {}", key, DEFAULT_MODEL_KEY);
                self.models[DEFAULT_MODEL_KEY]
            }
        }
    }

    /// Full endpoint URL for a model key under `base_url`.
    pub fn endpoint(&self, base_url: &str, key: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.resolve(key))
    }

    pub fn entries(&self) -> Vec<ModelInfo> {
        self.models
            .iter()
            .map(|(key, model_id)| ModelInfo {
                key: key.to_string(),
                model_id: model_id.to_string(),
                is_default: *key == DEFAULT_MODEL_KEY,
            })
            .collect()
    }
}
