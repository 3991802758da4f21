use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub recognition: RecognitionSettings,

    #[serde(default)]
    pub streaming: StreamingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub insecure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            insecure: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognitionSettings {
    #[serde(default = "default_language_code")]
    pub language_code: String,

    #[serde(default)]
    pub context_phrases: Vec<String>,

    #[serde(default)]
    pub word_time_offsets: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            context_phrases: Vec::new(),
            word_time_offsets: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamingSettings {
    /// Quiet period after the source reports fully buffered.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Decoded frames allowed in flight between decoder and session.
    #[serde(default = "default_frame_buffer")]
    pub frame_buffer: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            frame_buffer: default_frame_buffer(),
        }
    }
}

impl StreamingSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "aiq.skelterlabs.com".to_string()
}

fn default_port() -> u16 {
    443
}

fn default_language_code() -> String {
    "ko-KR".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_frame_buffer() -> usize {
    16
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
        }
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
