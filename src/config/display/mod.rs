#[cfg(test)]
mod tests;

use anyhow::Result;
use console::style;

use super::settings::{Config, LlmProviderConfig};

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Service:").bold().yellow());
    match config.embedding.endpoint() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!(
        "  Max Input: {} characters",
        style(config.embedding.max_input_chars).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  API Key: {}",
        key_status(config.embedding.api_key_env.as_deref())
    );

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} words",
        style(config.chunking.chunk_size).cyan()
    );
    eprintln!("  Overlap: {} words", style(config.chunking.overlap).cyan());
    eprintln!(
        "  Minimum: more than {} words",
        style(config.chunking.min_words).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!("  Min Score: {}", style(config.retrieval.min_score).cyan());
    eprintln!(
        "  Query Expansion: {}",
        style(if config.retrieval.expand_queries {
            "enabled"
        } else {
            "disabled"
        })
        .cyan()
    );

    eprintln!();
    eprintln!("{}", style("Language Models:").bold().yellow());
    show_provider("Primary", &config.llm.primary);
    show_provider("Fallback", &config.llm.fallback);
    show_provider("Expansion", &config.expansion.provider);

    eprintln!();
    eprintln!("{}", style("Generation:").bold().yellow());
    eprintln!(
        "  History: {} exchanges",
        style(config.generation.history_limit).cyan()
    );
    eprintln!(
        "  Temperatures: rag {} / general {} / code {}",
        style(config.generation.temperature.rag).cyan(),
        style(config.generation.temperature.general).cyan(),
        style(config.generation.temperature.code).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Database: {}",
        style(config.database_path().display()).dim()
    );

    Ok(())
}

fn show_provider(label: &str, provider: &LlmProviderConfig) {
    eprintln!(
        "  {}: {} ({}) at {} [key: {}]",
        label,
        style(&provider.model).cyan(),
        provider.name,
        style(&provider.base_url).dim(),
        key_status(provider.api_key_env.as_deref())
    );
}

/// Describe whether the named environment variable is set, without revealing it
pub(crate) fn key_status(env_name: Option<&str>) -> String {
    match env_name {
        None => "none".to_string(),
        Some(name) if std::env::var(name).is_ok_and(|v| !v.trim().is_empty()) => {
            format!("{} (set)", name)
        }
        Some(name) => format!("{} (not set)", name),
    }
}
