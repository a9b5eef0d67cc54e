// Configuration management module
// TOML settings for the embedding service, retrieval, language models and prompts

pub mod display;
pub mod settings;

pub use display::show_config;
pub use settings::{
    Config, ConfigError, EmbeddingConfig, ExpansionConfig, GenerationConfig, LlmConfig,
    LlmProviderConfig, PromptConfig, RetrievalConfig, TemperatureConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
