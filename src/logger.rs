use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

static SERVICE_LOGGER: Lazy<ServiceLogger> = Lazy::new(ServiceLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level.to_log_level_filter();
    SERVICE_LOGGER.update_config(config);

    if let Err(e) = log::set_logger(&*SERVICE_LOGGER) {
        return Err(format!("Failed to set logger: {:?}", e));
    }

    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Parse `trace`, `debug`, `info`, `warn`/`warning` or `error`, any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn to_log_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_log_level_filter(&self) -> log::LevelFilter {
        self.to_log_level().to_level_filter()
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

/// One emitted log line, also the JSON output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    pub thread_id: String,
    pub context: HashMap<String, serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, module: String, file: String, line: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message,
            module,
            file,
            line,
            thread_id: format!("{:?}", std::thread::current().id()),
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_thread_id: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub include_timestamp: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_to_file: bool,
    pub log_file_path: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_thread_id: false,
            show_file_location: false,
            show_module: true,
            include_timestamp: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_to_file: false,
            log_file_path: "prompt2image.log".to_string(),
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LOG_LEVEL` picks the level, `LOG_FORMAT=json` switches to JSON lines
    /// and `LOG_FILE` mirrors output into a file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|l| LogLevel::parse(&l)) {
            config.min_level = level;
        }
        if std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json")) {
            config = config.with_json_output(true).with_colors(false);
        }
        if let Ok(path) = std::env::var("LOG_FILE") {
            config = config.with_file_output(&path);
        }
        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_to_file = true;
        self.log_file_path = path.to_string();
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            log_to_file: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_colors: true,
            show_emojis: true,
            output_json: false,
            show_file_location: true,
            ..Default::default()
        }
    }
}

pub struct ServiceLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl ServiceLogger {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) {
        if new_config.log_to_file {
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&new_config.log_file_path)
            {
                Ok(file) => {
                    if let Ok(mut log_file) = self.log_file.lock() {
                        *log_file = Some(file);
                    }
                }
                Err(e) => eprintln!(
                    "cannot open log file {}: {}",
                    new_config.log_file_path, e
                ),
            }
        }

        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn format_console_output(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        let paint = |text: String, style: fn(String) -> ColoredString| -> String {
            if config.show_colors {
                style(text).to_string()
            } else {
                text
            }
        };
        let mut parts: Vec<String> = Vec::with_capacity(6);

        if config.include_timestamp {
            parts.push(paint(
                entry.timestamp.format(&config.timestamp_format).to_string(),
                |t| t.bright_black(),
            ));
        }

        let level = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        let level = if config.show_colors {
            level.color(entry.level.color()).bold().to_string()
        } else {
            level
        };
        parts.push(format!("[{}]", level));

        let mut message = String::new();
        if config.show_module && !entry.module.is_empty() {
            message.push_str(&paint(entry.module.clone(), |m| m.bright_blue()));
            message.push_str(": ");
        }
        message.push_str(&entry.message);
        parts.push(message);

        if !entry.context.is_empty() {
            let context = serde_json::to_string(&entry.context).unwrap_or_default();
            parts.push(paint(context, |c| c.bright_cyan()));
        }
        if config.show_thread_id {
            parts.push(format!("[thread:{}]", entry.thread_id));
        }
        if config.show_file_location {
            let location = format!("({}:{})", entry.file, entry.line);
            parts.push(paint(location, |l| l.bright_black()));
        }

        parts.join(" ")
    }

    fn render(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            serde_json::to_string(entry).unwrap_or_default()
        } else {
            self.format_console_output(entry, config)
        }
    }

    fn write_to_file(&self, line: &str) {
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    fn create_log_entry(&self, record: &Record) -> LogEntry {
        LogEntry::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown").to_string(),
            record.file().unwrap_or("unknown").to_string(),
            record.line().unwrap_or(0),
        )
    }
}

impl Default for ServiceLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for ServiceLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.to_log_level(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = self.create_log_entry(record);

        if let Ok(config) = self.config.lock() {
            let line = self.render(&entry, &config);
            println!("{}", line);

            if config.log_to_file {
                let file_line = if config.show_colors && !config.output_json {
                    self.render(&entry, &config.clone().with_colors(false))
                } else {
                    line
                };
                self.write_to_file(&file_line);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long the enclosing operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  {} completed in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, host: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Server will run on http://{}:{}", host, port);
}

/// Prints the effective settings. The token is reported only as present or missing.
pub fn log_config_info(config: &crate::config::Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!(
        "   HuggingFace token: {}",
        if config.huggingface_token.is_some() { "✅" } else { "❌" }
    );
    log::info!(
        "   Default size: {}x{} (max {}x{})",
        config.default_width,
        config.default_height,
        config.max_width,
        config.max_height
    );
    log::info!(
        "   Steps: {} (max {}), guidance: {}",
        config.default_steps,
        config.max_steps,
        config.default_guidance
    );
    log::info!(
        "   Output: {} (cap {} MB, cleanup after {} days)",
        config.output_dir.display(),
        config.max_storage_mb,
        config.auto_cleanup_days
    );
    log::info!(
        "   Limits: {} req/min, {}s timeout",
        config.rate_limit_per_minute,
        config.timeout_seconds
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Error.emoji(), "❌");
        assert_eq!(LogLevel::Debug.color(), Color::Blue);
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_logger_config() {
        let config = LoggerConfig::development();
        assert_eq!(config.min_level, LogLevel::Debug);
        assert!(config.show_colors);

        let prod_config = LoggerConfig::production();
        assert!(!prod_config.show_colors);
        assert!(prod_config.output_json);
    }

    #[test]
    fn test_plain_console_format() {
        let logger = ServiceLogger::new();
        let config = LoggerConfig::new().with_colors(false);
        let entry = LogEntry::new(
            LogLevel::Warn,
            "retrying".into(),
            "prompt2image::inference".into(),
            "src/inference/client.rs".into(),
            10,
        )
        .with_context("attempt", serde_json::json!(2));

        let line = logger.format_console_output(&entry, &config);
        assert!(line.contains("[⚠️ WARN]"));
        assert!(line.contains("prompt2image::inference: retrying"));
        assert!(line.ends_with(r#"{"attempt":2}"#));
    }

    #[test]
    fn test_json_output() {
        let logger = ServiceLogger::new();
        let config = LoggerConfig::new().with_json_output(true);
        let entry = LogEntry::new(LogLevel::Info, "saved".into(), "m".into(), "f".into(), 1);

        let line = logger.render(&entry, &config);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["message"], "saved");
        assert_eq!(value["level"], "Info");
    }
}
