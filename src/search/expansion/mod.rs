#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::ExpansionConfig;
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest};

pub const QUERY_EXPANSION_PROMPT: &str = r#"Kamu adalah query expander untuk sistem pencarian dokumen akademik/belajar.

TUGAS:
Perluas query user dengan menambahkan kata kunci relevan untuk meningkatkan hasil pencarian.

ATURAN:
1. Output HANYA query yang diperluas, TANPA penjelasan
2. Pertahankan intent asli dari user
3. Tambahkan sinonim dan kata kunci terkait
4. Jangan mengubah makna query
5. Maksimal 50 kata

CONTOH:
Input: "siapa sophie?"
Output: "siapa sophie karakter utama novel dunia filsafat jostein gaarder norwegia"

Input: "rumus pythagoras"
Output: "rumus teorema pythagoras matematika segitiga siku-siku a² + b² = c² geometri"

Input: "apa itu demokrasi"
Output: "apa itu demokrasi sistem pemerintahan rakyat pemilu voting politik kebebasan""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    pub original: String,
    /// Text to embed; equals `original` when expansion was skipped or failed
    pub expanded: String,
    pub was_expanded: bool,
}

impl ExpandedQuery {
    #[inline]
    pub fn unchanged(query: &str) -> Self {
        Self {
            original: query.to_string(),
            expanded: query.to_string(),
            was_expanded: false,
        }
    }
}

/// Enriches search queries with related keywords through an auxiliary model
#[derive(Clone)]
pub struct QueryExpander {
    backend: Arc<dyn CompletionBackend>,
    min_chars: usize,
    max_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl fmt::Debug for QueryExpander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExpander")
            .field("model", &self.backend.model())
            .field("min_chars", &self.min_chars)
            .field("max_chars", &self.max_chars)
            .finish_non_exhaustive()
    }
}

impl QueryExpander {
    #[inline]
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &ExpansionConfig) -> Self {
        Self {
            backend,
            min_chars: config.min_chars,
            max_chars: config.max_chars,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Whether `query` is long enough, and short enough, to be worth expanding
    #[inline]
    pub fn should_expand(&self, query: &str) -> bool {
        let length = query.chars().count();
        length >= self.min_chars && length <= self.max_chars
    }

    /// Expand `query`; any failure yields the query unchanged
    #[inline]
    pub async fn expand(&self, query: &str) -> ExpandedQuery {
        if !self.should_expand(query) {
            debug!("Skipping expansion for query of {} characters", query.chars().count());
            return ExpandedQuery::unchanged(query);
        }

        let started = Instant::now();
        let request = CompletionRequest::new(vec![
            ChatMessage::system(QUERY_EXPANSION_PROMPT),
            ChatMessage::user(query),
        ])
        .with_max_tokens(self.max_tokens)
        .with_temperature(self.temperature);

        match self.backend.complete(&request).await {
            Ok(output) => {
                let expanded = strip_quotes(output.trim());
                if expanded.is_empty() {
                    return ExpandedQuery::unchanged(query);
                }

                info!(
                    event = "QUERY_EXPANDED",
                    original = query,
                    expanded,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Expanded query"
                );

                ExpandedQuery {
                    original: query.to_string(),
                    expanded: expanded.to_string(),
                    was_expanded: expanded != query,
                }
            }
            Err(e) => {
                error!(
                    event = "QUERY_EXPANSION_ERROR",
                    error = %e,
                    "Query expansion failed, using original query"
                );
                ExpandedQuery::unchanged(query)
            }
        }
    }
}

/// Remove one pair of surrounding double quotes
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(text, str::trim)
}
