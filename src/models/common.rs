use serde::{Deserialize, Serialize};

/// A registry entry as exposed by `GET /models`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub key: String,
    pub model_id: String,
    pub is_default: bool,
}
