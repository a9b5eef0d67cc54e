#[cfg(test)]
mod tests;

use tracing::{debug, info};

use super::expansion::{ExpandedQuery, QueryExpander};
use super::similarity::{KnowledgeCandidate, SimilarityResult, rank};
use crate::config::RetrievalConfig;
use crate::embeddings::{ChunkingConfig, Embedding, EmbeddingProvider, EmbeddingSource, chunk_text};
use crate::{RagError, Result};

/// A chunk of an ingested document together with its vector
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedChunk {
    pub index: usize,
    pub content: String,
    pub word_count: usize,
    pub embedding: Embedding,
}

/// What a retrieval did, for callers that report on it
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalDetails {
    pub query: ExpandedQuery,
    /// `None` when no embedding was needed
    pub embedding_source: Option<EmbeddingSource>,
    pub candidate_count: usize,
    pub results: Vec<SimilarityResult>,
}

/// Finds the stored knowledge most relevant to a query
#[derive(Debug, Clone)]
pub struct Retriever {
    provider: EmbeddingProvider,
    expander: Option<QueryExpander>,
    chunking: ChunkingConfig,
    min_score: f32,
}

impl Retriever {
    /// Expansion is disabled when `expander` is `None` or the configuration turns it off
    #[inline]
    pub fn new(
        provider: EmbeddingProvider,
        expander: Option<QueryExpander>,
        retrieval: &RetrievalConfig,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            provider,
            expander: expander.filter(|_| retrieval.expand_queries),
            chunking,
            min_score: retrieval.min_score,
        }
    }

    #[inline]
    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    #[inline]
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Rank `candidates` against `query` and return at most `top_k` results
    /// scoring above the threshold
    ///
    /// Candidates must already be restricted to a single owner.
    #[inline]
    pub async fn retrieve(
        &self,
        query: &str,
        candidates: &[KnowledgeCandidate],
        top_k: usize,
    ) -> Result<Vec<SimilarityResult>> {
        self.retrieve_with_details(query, candidates, top_k)
            .await
            .map(|details| details.results)
    }

    #[inline]
    pub async fn retrieve_with_details(
        &self,
        query: &str,
        candidates: &[KnowledgeCandidate],
        top_k: usize,
    ) -> Result<RetrievalDetails> {
        if top_k == 0 {
            return Err(RagError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "query must not be blank".to_string(),
            ));
        }

        if candidates.is_empty() {
            debug!("No candidates to rank, skipping retrieval");
            return Ok(RetrievalDetails {
                query: ExpandedQuery::unchanged(query),
                embedding_source: None,
                candidate_count: 0,
                results: Vec::new(),
            });
        }

        let expanded = match &self.expander {
            Some(expander) => expander.expand(query).await,
            None => ExpandedQuery::unchanged(query),
        };

        let embedding = self.provider.embed(&expanded.expanded).await;
        let results = rank(&embedding, candidates, top_k, self.min_score);

        info!(
            event = "RETRIEVAL_COMPLETE",
            candidates = candidates.len(),
            results = results.len(),
            top_score = results.first().map_or(0.0, |r| r.score),
            expanded = expanded.was_expanded,
            fallback = embedding.is_fallback(),
            "Retrieved relevant knowledge"
        );

        Ok(RetrievalDetails {
            query: expanded,
            embedding_source: Some(embedding.source),
            candidate_count: candidates.len(),
            results,
        })
    }

    /// Chunk and embed a document ready for storage
    #[inline]
    pub async fn prepare_ingestion(&self, text: &str) -> Vec<IngestedChunk> {
        let chunks: Vec<_> = chunk_text(text, &self.chunking).collect();
        if chunks.is_empty() {
            return Vec::new();
        }

        let contents: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = self.provider.embed_many(&contents).await;

        debug!("Prepared {} chunks for ingestion", chunks.len());

        chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IngestedChunk {
                index: chunk.index,
                content: chunk.content,
                word_count: chunk.word_count,
                embedding,
            })
            .collect()
    }
}
