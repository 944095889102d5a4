use crate::error::{Prompt2ImageError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Process-wide settings. Built once at startup and shared read-only.
#[derive(Clone, Serialize)]
pub struct Config {
    #[serde(skip_serializing)]
    pub huggingface_token: Option<String>,

    pub default_width: u32,
    pub default_height: u32,
    pub max_width: u32,
    pub max_height: u32,

    pub default_steps: u32,
    pub max_steps: u32,
    pub default_guidance: f32,
    pub default_model: String,
    pub default_negative_prompt: String,

    pub output_dir: PathBuf,
    pub max_storage_mb: u64,
    pub auto_cleanup_days: i64,

    pub rate_limit_per_minute: u32,
    pub timeout_seconds: u64,
    pub inference_base_url: String,

    pub allowed_file_types: Vec<String>,
    pub max_prompt_length: usize,
    pub enable_metadata: bool,

    pub host: String,
    pub port: u16,
}

/// Partial settings read from a JSON file. Absent keys keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    huggingface_token: Option<String>,
    default_width: Option<u32>,
    default_height: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    default_steps: Option<u32>,
    max_steps: Option<u32>,
    default_guidance: Option<f32>,
    default_model: Option<String>,
    default_negative_prompt: Option<String>,
    output_dir: Option<PathBuf>,
    max_storage_mb: Option<u64>,
    auto_cleanup_days: Option<i64>,
    rate_limit_per_minute: Option<u32>,
    timeout_seconds: Option<u64>,
    inference_base_url: Option<String>,
    allowed_file_types: Option<Vec<String>>,
    max_prompt_length: Option<usize>,
    enable_metadata: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualitySummary {
    pub steps: u32,
    pub guidance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    pub output_dir: String,
    pub max_storage_mb: u64,
    pub auto_cleanup_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiLimitsSummary {
    pub rate_limit_per_minute: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturesSummary {
    pub metadata: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub huggingface_configured: bool,
    pub default_image_size: String,
    pub max_image_size: String,
    pub default_quality: QualitySummary,
    pub storage: StorageSummary,
    pub api_limits: ApiLimitsSummary,
    pub features: FeaturesSummary,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            huggingface_token: None,
            default_width: 512,
            default_height: 512,
            max_width: 1024,
            max_height: 1024,
            default_steps: 20,
            max_steps: 50,
            default_guidance: 7.5,
            default_model: "stable-diffusion-xl".to_string(),
            default_negative_prompt: "blurry, bad quality, distorted, ugly, low resolution"
                .to_string(),
            output_dir: PathBuf::from("output"),
            max_storage_mb: 1000,
            auto_cleanup_days: 30,
            rate_limit_per_minute: 10,
            timeout_seconds: 60,
            inference_base_url: "https://api-inference.huggingface.co/models".to_string(),
            allowed_file_types: vec![".png".into(), ".jpg".into(), ".jpeg".into()],
            max_prompt_length: 500,
            enable_metadata: true,
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

// Never print the token.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "huggingface_token",
                &self.huggingface_token.as_ref().map(|_| "<redacted>"),
            )
            .field("default_width", &self.default_width)
            .field("default_height", &self.default_height)
            .field("max_width", &self.max_width)
            .field("max_height", &self.max_height)
            .field("default_steps", &self.default_steps)
            .field("max_steps", &self.max_steps)
            .field("default_guidance", &self.default_guidance)
            .field("default_model", &self.default_model)
            .field("output_dir", &self.output_dir)
            .field("max_storage_mb", &self.max_storage_mb)
            .field("auto_cleanup_days", &self.auto_cleanup_days)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("inference_base_url", &self.inference_base_url)
            .field("max_prompt_length", &self.max_prompt_length)
            .field("enable_metadata", &self.enable_metadata)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then environment variables, then the JSON file named by
    /// `CONFIG_FILE` (or `config.json`). A missing file is not an error.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env()?;
        let file = env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        config.load_from_file(&file)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.overlay_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides from any lookup function.
    pub fn overlay_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("HUGGINGFACE_TOKEN").filter(|t| !t.is_empty()) {
            self.huggingface_token = Some(token);
        }
        if let Some(width) = parse_var(&lookup, "DEFAULT_WIDTH")? {
            self.default_width = width;
        }
        if let Some(height) = parse_var(&lookup, "DEFAULT_HEIGHT")? {
            self.default_height = height;
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(mb) = parse_var(&lookup, "MAX_STORAGE_MB")? {
            self.max_storage_mb = mb;
        }
        if let Some(limit) = parse_var(&lookup, "RATE_LIMIT_PER_MINUTE")? {
            self.rate_limit_per_minute = limit;
        }
        if let Some(timeout) = parse_var(&lookup, "TIMEOUT_SECONDS")? {
            self.timeout_seconds = timeout;
        }
        if let Some(url) = lookup("INFERENCE_BASE_URL") {
            self.inference_base_url = url;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.port = port;
        }
        Ok(())
    }

    /// Overlay settings from a JSON file. Returns whether the file existed.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            Prompt2ImageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let overlay: ConfigOverlay = serde_json::from_str(&raw).map_err(|e| {
            Prompt2ImageError::Config(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        self.apply(overlay);

        log::info!("Loaded settings from {}", path.display());
        Ok(true)
    }

    /// Write every setting except the token as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Prompt2ImageError::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            Prompt2ImageError::Config(format!("cannot write {}: {}", path.display(), e))
        })?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    fn apply(&mut self, o: ConfigOverlay) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = o.$field { self.$field = v; })*
            };
        }
        if let Some(token) = o.huggingface_token.filter(|t| !t.is_empty()) {
            self.huggingface_token = Some(token);
        }
        overlay!(
            default_width,
            default_height,
            max_width,
            max_height,
            default_steps,
            max_steps,
            default_guidance,
            default_model,
            default_negative_prompt,
            output_dir,
            max_storage_mb,
            auto_cleanup_days,
            rate_limit_per_minute,
            timeout_seconds,
            inference_base_url,
            allowed_file_types,
            max_prompt_length,
            enable_metadata,
            host,
            port,
        );
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.huggingface_token = Some(token.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_inference_base_url(mut self, url: impl Into<String>) -> Self {
        self.inference_base_url = url.into();
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn development() -> Self {
        Self {
            max_steps: 30,
            max_storage_mb: 500,
            rate_limit_per_minute: 5,
            timeout_seconds: 30,
            ..Default::default()
        }
    }

    pub fn production() -> Self {
        Self {
            default_steps: 25,
            max_steps: 50,
            max_storage_mb: 2000,
            rate_limit_per_minute: 10,
            timeout_seconds: 60,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn max_storage_bytes(&self) -> u64 {
        self.max_storage_mb.saturating_mul(1024 * 1024)
    }

    /// Check the settings. Creates the output directory if it is missing.
    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self
            .huggingface_token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            errors.push("HuggingFace token is required".to_string());
        }

        if self.default_width == 0 || self.default_height == 0 {
            errors.push("Image dimensions must be positive".to_string());
        }
        if self.max_width == 0 || self.max_height == 0 {
            errors.push("Maximum image dimensions must be positive".to_string());
        }
        if self.default_width > self.max_width || self.default_height > self.max_height {
            warnings.push("Default dimensions exceed maximum allowed".to_string());
        }

        if self.default_steps == 0 || self.default_steps > self.max_steps {
            errors.push("Default steps must be between 1 and max_steps".to_string());
        }
        if !(self.default_guidance > 0.0) || !self.default_guidance.is_finite() {
            errors.push("Guidance scale must be positive".to_string());
        }

        if self.max_storage_mb == 0 {
            errors.push("Max storage must be positive".to_string());
        }
        if self.max_prompt_length == 0 {
            errors.push("Max prompt length must be positive".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            errors.push("Rate limit must be positive".to_string());
        }
        if self.timeout_seconds == 0 {
            errors.push("Timeout must be positive".to_string());
        }
        if self.auto_cleanup_days <= 0 {
            warnings.push("Auto cleanup is disabled".to_string());
        }

        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            errors.push(format!("Cannot create output directory: {}", e));
        }

        ConfigValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            huggingface_configured: self.huggingface_token.is_some(),
            default_image_size: format!("{}x{}", self.default_width, self.default_height),
            max_image_size: format!("{}x{}", self.max_width, self.max_height),
            default_quality: QualitySummary {
                steps: self.default_steps,
                guidance: self.default_guidance,
            },
            storage: StorageSummary {
                output_dir: self.output_dir.display().to_string(),
                max_storage_mb: self.max_storage_mb,
                auto_cleanup_days: self.auto_cleanup_days,
            },
            api_limits: ApiLimitsSummary {
                rate_limit_per_minute: self.rate_limit_per_minute,
                timeout_seconds: self.timeout_seconds,
            },
            features: FeaturesSummary {
                metadata: self.enable_metadata,
            },
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            Prompt2ImageError::Config(format!("{} must be a number, got {:?}", key, raw))
        }),
    }
}
