use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::assistant::Assistant;
use crate::config::{Config, LlmProviderConfig};
use crate::embeddings::{EmbeddingBackend, EmbeddingProvider, HttpEmbeddingClient};
use crate::llm::{CompletionBackend, OpenAiCompatibleClient};
use crate::prompt::ModelFlavor;
use crate::search::{QueryExpander, Retriever};
use crate::store::Database;


/// Read an API key from the named environment variable; blank values count as missing
#[inline]
pub fn resolve_api_key(env_name: Option<&str>) -> Option<String> {
    let name = env_name?;
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            debug!("Environment variable {} is not set", name);
            None
        }
    }
}

fn completion_client(config: &LlmProviderConfig) -> Result<Arc<dyn CompletionBackend>> {
    let client = OpenAiCompatibleClient::new(config, resolve_api_key(config.api_key_env.as_deref()))
        .with_context(|| format!("Invalid configuration for provider {}", config.name))?;
    Ok(Arc::new(client))
}

/// Wire every client and component from configuration
#[inline]
pub fn build_assistant(config: &Config, database: Database) -> Result<Assistant> {
    let embedding_client = HttpEmbeddingClient::new(
        &config.embedding,
        resolve_api_key(config.embedding.api_key_env.as_deref()),
    )
    .context("Invalid embedding configuration")?;
    let backend: Arc<dyn EmbeddingBackend> = Arc::new(embedding_client);
    let provider = EmbeddingProvider::new(backend, &config.embedding);

    let expander = QueryExpander::new(
        completion_client(&config.expansion.provider)?,
        &config.expansion,
    );
    let retriever = Retriever::new(
        provider,
        Some(expander),
        &config.retrieval,
        config.chunking.clone(),
    );

    let primary = completion_client(&config.llm.primary)?;
    let fallback = completion_client(&config.llm.fallback)?;

    Ok(Assistant::new(
        database,
        retriever,
        primary,
        Some(fallback),
        config,
    ))
}

/// Open the knowledge database next to the configuration and build the assistant
#[inline]
pub async fn open_assistant(config: &Config) -> Result<Assistant> {
    let database = Database::initialize_from_config_dir(config.get_base_dir())
        .await
        .context("Failed to initialize database")?;
    build_assistant(config, database)
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Ingest a plain-text document into `owner`'s knowledge base
#[inline]
pub async fn ingest_file(
    config: &Config,
    owner: i64,
    path: &Path,
    title: Option<&str>,
    source: Option<&str>,
) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    let title = title.map_or_else(
        || {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        },
        str::to_string,
    );

    let assistant = open_assistant(config).await?;

    info!("Ingesting {} for owner {}", path.display(), owner);
    let progress = spinner(&format!("Embedding {}", path.display()));
    let result = assistant
        .ingest_document(owner, &title, &text, source)
        .await;
    progress.finish_and_clear();

    let records = result?;
    if records.is_empty() {
        println!("Document is too short to store; nothing was saved.");
        return Ok(());
    }

    println!("✅ Saved {} knowledge records", records.len());
    for record in &records {
        println!("   {} (ID: {})", record.title, record.id);
    }

    let total = assistant
        .database()
        .count_knowledge(owner)
        .await
        .context("Failed to count knowledge")?;
    println!("Knowledge base for user {} now holds {} records", owner, total);

    Ok(())
}

/// List `owner`'s knowledge records
#[inline]
pub async fn list_knowledge(config: &Config, owner: i64) -> Result<()> {
    let database = Database::initialize_from_config_dir(config.get_base_dir())
        .await
        .context("Failed to initialize database")?;

    let records = database
        .list_knowledge(owner)
        .await
        .context("Failed to list knowledge")?;

    if records.is_empty() {
        println!("No knowledge stored for user {} yet.", owner);
        println!("Use 'study-rag ingest --user {} <file>' to add a document.", owner);
        return Ok(());
    }

    println!("Knowledge Base ({} records):", records.len());
    println!();

    for record in &records {
        println!("📚 {} (ID: {})", record.title, record.id);
        println!("   Source: {}", record.source);
        println!(
            "   Words: {}",
            crate::embeddings::word_count(&record.content)
        );
        if record.embedding.is_none() {
            println!("   ⚠️  No embedding");
        }
        println!(
            "   Created: {}",
            record.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Delete one of `owner`'s knowledge records
#[inline]
pub async fn delete_knowledge(config: &Config, owner: i64, id: i64) -> Result<()> {
    let database = Database::initialize_from_config_dir(config.get_base_dir())
        .await
        .context("Failed to initialize database")?;

    if database
        .delete_knowledge(id, owner)
        .await
        .context("Failed to delete knowledge")?
    {
        println!("✓ Knowledge record {} deleted", id);
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Knowledge record {} not found for user {}",
            id,
            owner
        ))
    }
}

/// Search `owner`'s knowledge and print the ranked results and context
#[inline]
pub async fn search(config: &Config, owner: i64, query: &str, top_k: Option<usize>) -> Result<()> {
    let assistant = open_assistant(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let outcome = assistant.search(owner, query, top_k).await?;

    if !outcome.has_results() {
        println!("No relevant knowledge found.");
        return Ok(());
    }

    println!(
        "Found {} results: {}",
        outcome.results.len(),
        outcome
            .results
            .iter()
            .map(|r| format!("#{} ({:.0}%)", r.id, r.score * 100.0))
            .join(", ")
    );
    println!();
    println!("{}", outcome.context);

    Ok(())
}

/// Record feedback on an answer
#[inline]
pub async fn feedback(
    config: &Config,
    owner: i64,
    question: &str,
    answer: &str,
    positive: bool,
) -> Result<()> {
    let assistant = open_assistant(config).await?;

    match assistant
        .promote_feedback(owner, question, answer, positive)
        .await?
    {
        Some(record) => println!(
            "Terima kasih! Jawaban ini telah disimpan ke knowledge base Anda (ID: {}).",
            record.id
        ),
        None => println!("Terima kasih atas feedback Anda. Kami akan berusaha lebih baik."),
    }

    Ok(())
}

/// Print the messages that would be sent for `message`, without calling a model
#[inline]
pub async fn show_prompt(
    config: &Config,
    owner: Option<i64>,
    message: &str,
    flavor: ModelFlavor,
) -> Result<()> {
    let assistant = open_assistant(config).await?;
    let prepared = assistant
        .prepare_chat(owner, message, flavor, Local::now().date_naive())
        .await?;

    println!(
        "Temperature: {} | document query: {} | code query: {} | context passages: {}",
        prepared.temperature,
        prepared.is_document_query,
        prepared.is_code_query,
        prepared.results.len()
    );

    for chat_message in &prepared.messages {
        println!();
        println!("--- {:?} ---", chat_message.role);
        println!("{}", chat_message.content);
    }

    Ok(())
}

/// Answer `message` and print the reply
#[inline]
pub async fn ask(config: &Config, owner: Option<i64>, message: &str) -> Result<()> {
    let assistant = open_assistant(config).await?;

    let progress = spinner("Thinking...");
    let result = assistant
        .answer(owner, message, Local::now().date_naive())
        .await;
    progress.finish_and_clear();

    let answer = result?;
    println!("{}", answer.reply);
    println!();
    println!(
        "[{}{}, {} context passages]",
        answer.model,
        if answer.used_fallback { ", fallback" } else { "" },
        answer.results.len()
    );

    Ok(())
}
