
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;

/// Width of the `all-MiniLM-L6-v2` sentence embeddings
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

pub const DEFAULT_EMBEDDING_URL: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub url: String,
    pub dimension: usize,
    pub max_input_chars: usize,
    pub batch_size: usize,
    pub timeout_seconds: u64,
    /// Environment variable holding the bearer token, if any
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            max_input_chars: 512,
            batch_size: 16,
            timeout_seconds: 30,
            api_key_env: Some("HUGGINGFACE_TOKEN".to_string()),
        }
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if !(1..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if self.max_input_chars == 0 {
            return Err(ConfigError::InvalidMaxInputChars(self.max_input_chars));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        validate_timeout(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Results must score strictly above this
    pub min_score: f32,
    pub expand_queries: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: 0.3,
            expand_queries: true,
        }
    }
}

/// An OpenAI-compatible chat-completion provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmProviderConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_llm_timeout() -> u64 {
    60
}

impl LlmProviderConfig {
    #[inline]
    pub fn openai() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_seconds: default_llm_timeout(),
        }
    }

    #[inline]
    pub fn groq(model: &str) -> Self {
        Self {
            name: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: model.to_string(),
            api_key_env: Some("GROQ_API_KEY".to_string()),
            timeout_seconds: default_llm_timeout(),
        }
    }

    #[inline]
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.base_url)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// Answers GPT-flavoured prompts
    pub primary: LlmProviderConfig,
    /// Takes over when the primary provider is rate limited
    pub fallback: LlmProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: LlmProviderConfig::openai(),
            fallback: LlmProviderConfig::groq("llama-3.3-70b-versatile"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpansionConfig {
    pub provider: LlmProviderConfig,
    pub min_chars: usize,
    pub max_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderConfig::groq("llama-3.1-8b-instant"),
            min_chars: 5,
            max_chars: 200,
            max_tokens: 100,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemperatureConfig {
    pub rag: f32,
    pub general: f32,
    pub code: f32,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            rag: 0.1,
            general: 0.5,
            code: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Past exchanges replayed to the model
    pub history_limit: usize,
    pub max_output_tokens: u32,
    pub temperature: TemperatureConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            max_output_tokens: 2048,
            temperature: TemperatureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    pub assistant_name: String,
    /// Facts listed under the date in every system prompt
    pub factual_notes: Vec<String>,
    pub document_keywords: Vec<String>,
    pub code_keywords: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            assistant_name: "AI Study Assistant".to_string(),
            factual_notes: to_strings(&[
                "Presiden Indonesia saat ini adalah Prabowo Subianto, dilantik pada 20 Oktober 2024",
                "Wakil Presiden Indonesia saat ini adalah Gibran Rakabuming Raka",
                "Joko Widodo (Jokowi) adalah presiden sebelumnya (2014-2024)",
            ]),
            document_keywords: to_strings(&[
                "dokumen", "file", "pdf", "upload", "buku", "materi", "catatan", "yang saya",
                "yang aku", "yang di", "isinya", "bab", "halaman", "bagian", "chapter", "slide",
            ]),
            code_keywords: to_strings(&[
                "code",
                "kode",
                "coding",
                "program",
                "function",
                "fungsi",
                "class",
                "method",
                "variable",
                "error",
                "bug",
                "debug",
                "javascript",
                "python",
                "php",
                "java",
                "react",
                "next",
            ]),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL: {0} (must be an http or https URL)")]
    InvalidUrl(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(usize),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid max input length: {0} (must be at least 1 character)")]
    InvalidMaxInputChars(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be between 1 and 10000 words)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be less than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top-k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid {0}: {1} (must be between 0 and 1)")]
    OutOfUnitRange(&'static str, f32),
    #[error("Invalid temperature {0}: {1} (must be between 0 and 2)")]
    InvalidTemperature(&'static str, f32),
    #[error("Invalid expansion bounds: min {0} must not exceed max {1}")]
    InvalidExpansionBounds(usize, usize),
    #[error("Invalid token limit: {0} (must be at least 1)")]
    InvalidTokenLimit(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn parse_http_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}

fn validate_temperature(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&value) {
        return Err(ConfigError::InvalidTemperature(name, value));
    }
    Ok(())
}

impl Config {
    /// Default configuration directory, `~/.study-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".study-rag"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when the file is missing
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.validate_chunking_config()?;
        self.validate_retrieval_config()?;
        self.validate_expansion_config()?;
        self.llm.primary.validate()?;
        self.llm.fallback.validate()?;
        self.validate_generation_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(1..=10_000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.overlap,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if !(1..=100).contains(&config.top_k) {
            return Err(ConfigError::InvalidTopK(config.top_k));
        }

        if !(0.0..=1.0).contains(&config.min_score) {
            return Err(ConfigError::OutOfUnitRange("min_score", config.min_score));
        }

        Ok(())
    }

    fn validate_expansion_config(&self) -> Result<(), ConfigError> {
        let config = &self.expansion;

        config.provider.validate()?;

        if config.min_chars > config.max_chars {
            return Err(ConfigError::InvalidExpansionBounds(
                config.min_chars,
                config.max_chars,
            ));
        }

        if config.max_tokens == 0 {
            return Err(ConfigError::InvalidTokenLimit(config.max_tokens));
        }

        validate_temperature("expansion", config.temperature)
    }

    fn validate_generation_config(&self) -> Result<(), ConfigError> {
        let config = &self.generation;

        if config.max_output_tokens == 0 {
            return Err(ConfigError::InvalidTokenLimit(config.max_output_tokens));
        }

        validate_temperature("rag", config.temperature.rag)?;
        validate_temperature("general", config.temperature.general)?;
        validate_temperature("code", config.temperature.code)
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the SQLite database
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join(crate::store::sqlite::DATABASE_FILE)
    }
}
