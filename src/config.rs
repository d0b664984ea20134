//! Configuration management for ingredisense
//!
//! TOML configuration with defaults for every section.
//! Location: ~/.ingredisense/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AnalysisError, Result};

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub sources: SourcesConfig,
    pub research: ResearchConfig,
    pub telemetry: TelemetryConfig,
}

/// Ollama connection used for both reasoning and vision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub reasoning_model: String,
    pub vision_model: String,
    pub temperature: f32,
    /// Upper bound on a single reasoning request; label reading is not bounded
    pub request_timeout_sec: u64,
}

/// Encyclopedia and product catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub encyclopedia_url: String,
    pub catalog_search_url: String,
    pub catalog_category_url: String,
    pub user_agent: String,
    pub encyclopedia_timeout_ms: u64,
    pub catalog_timeout_ms: u64,
    pub category_probe_timeout_ms: u64,
    pub candidate_timeout_ms: u64,
    pub candidate_page_size: usize,
}

/// Research stage behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Cap on in-flight encyclopedia fetches
    pub max_concurrent_fetches: usize,
    /// Hand the classifier's category to the ranking engine instead of
    /// letting it resolve its own
    pub classify_category: bool,
}

/// Telemetry display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub show_summary: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            reasoning_model: "qwen2.5:7b-instruct".to_string(),
            vision_model: "llama3.2-vision:11b".to_string(),
            temperature: 0.1,
            request_timeout_sec: 180,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            encyclopedia_url: "https://en.wikipedia.org/wiki".to_string(),
            catalog_search_url: "https://world.openfoodfacts.org/cgi/search.pl".to_string(),
            catalog_category_url: "https://in.openfoodfacts.org/category".to_string(),
            user_agent: format!("ingredisense/{}", env!("CARGO_PKG_VERSION")),
            encyclopedia_timeout_ms: 5_000,
            catalog_timeout_ms: 5_000,
            category_probe_timeout_ms: 1_000,
            candidate_timeout_ms: 10_000,
            candidate_page_size: 50,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: (num_cpus::get() * 2).clamp(4, 16),
            classify_category: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            show_summary: true,
        }
    }
}

impl SourcesConfig {
    pub fn encyclopedia_timeout(&self) -> Duration {
        Duration::from_millis(self.encyclopedia_timeout_ms)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }

    pub fn category_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.category_probe_timeout_ms)
    }

    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, or built-in defaults when absent
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ingredisense").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.research.max_concurrent_fetches == 0 {
            return Err(AnalysisError::ConfigError(
                "max_concurrent_fetches must be greater than 0".to_string(),
            ));
        }

        if self.sources.candidate_page_size == 0 {
            return Err(AnalysisError::ConfigError(
                "candidate_page_size must be greater than 0".to_string(),
            ));
        }

        let timeouts = [
            self.sources.encyclopedia_timeout_ms,
            self.sources.catalog_timeout_ms,
            self.sources.category_probe_timeout_ms,
            self.sources.candidate_timeout_ms,
        ];
        if timeouts.iter().any(|&ms| ms == 0) {
            return Err(AnalysisError::ConfigError(
                "source timeouts must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.ollama.temperature) {
            return Err(AnalysisError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            other => {
                return Err(AnalysisError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnalysisError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AnalysisError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }
}
