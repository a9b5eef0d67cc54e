
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, GenerationConfig};
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest};
use crate::prompt::builder::FALLBACK_MODEL_TAG;
use crate::prompt::{
    ChatExchange, ModelFlavor, PromptBuilder, QueryClassifier, SystemPromptOptions,
    build_context, build_messages, format_indonesian_date, prepare_history, select_temperature,
};
use crate::search::{Retriever, SimilarityResult};
use crate::store::{
    ChatRecord, Database, KnowledgeRecord, NewChatRecord, NewKnowledgeRecord, SOURCE_FEEDBACK,
    SOURCE_MANUAL,
};
use crate::{RagError, Result};

const UNTITLED: &str = "Untitled";
const FEEDBACK_TITLE_CHARS: usize = 50;

/// Ranked knowledge plus the context block built from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SimilarityResult>,
    pub context: String,
}

impl SearchOutcome {
    #[inline]
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }
}

/// Everything needed to ask a model about one user message
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChat {
    pub owner: Option<i64>,
    pub message: String,
    pub today: String,
    pub history: Vec<ChatExchange>,
    pub results: Vec<SimilarityResult>,
    pub context: String,
    pub is_document_query: bool,
    pub is_code_query: bool,
    pub temperature: f32,
    pub flavor: ModelFlavor,
    pub messages: Vec<ChatMessage>,
}

impl PreparedChat {
    #[inline]
    pub fn is_guest(&self) -> bool {
        self.owner.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatAnswer {
    pub reply: String,
    pub model: String,
    pub flavor: ModelFlavor,
    /// True when the fallback provider produced the reply
    pub used_fallback: bool,
    pub results: Vec<SimilarityResult>,
}

/// The study assistant: knowledge ingestion, search and grounded chat
#[derive(Clone)]
pub struct Assistant {
    database: Database,
    retriever: Retriever,
    classifier: QueryClassifier,
    prompts: PromptBuilder,
    primary: Arc<dyn CompletionBackend>,
    fallback: Option<Arc<dyn CompletionBackend>>,
    top_k: usize,
    generation: GenerationConfig,
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("retriever", &self.retriever)
            .field("primary", &self.primary.model())
            .field("fallback", &self.fallback.as_ref().map(|backend| backend.model()))
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

fn database_error(error: anyhow::Error) -> RagError {
    RagError::Database(format!("{:#}", error))
}

impl Assistant {
    #[inline]
    pub fn new(
        database: Database,
        retriever: Retriever,
        primary: Arc<dyn CompletionBackend>,
        fallback: Option<Arc<dyn CompletionBackend>>,
        config: &Config,
    ) -> Self {
        Self {
            database,
            retriever,
            classifier: QueryClassifier::from_config(&config.prompt),
            prompts: PromptBuilder::new(&config.prompt),
            primary,
            fallback,
            top_k: config.retrieval.top_k,
            generation: config.generation.clone(),
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Chunk, embed and store a document for `owner`; one record per chunk
    ///
    /// Text too short to form a single chunk stores nothing.
    #[inline]
    pub async fn ingest_document(
        &self,
        owner: i64,
        title: &str,
        text: &str,
        source: Option<&str>,
    ) -> Result<Vec<KnowledgeRecord>> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "document text must not be empty".to_string(),
            ));
        }

        let title = match title.trim() {
            "" => UNTITLED,
            trimmed => trimmed,
        };
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(SOURCE_MANUAL);

        let chunks = self.retriever.prepare_ingestion(text).await;
        if chunks.is_empty() {
            warn!("Document '{}' is too short to chunk, nothing stored", title);
            return Ok(Vec::new());
        }

        let multipart = chunks.len() > 1;
        let records = chunks
            .into_iter()
            .map(|chunk| {
                let embedding = chunk
                    .embedding
                    .to_stored()
                    .map_err(|e| RagError::Embedding(e.to_string()))?;

                Ok(NewKnowledgeRecord {
                    owner_id: owner,
                    title: if multipart {
                        format!("{} (Part {})", title, chunk.index + 1)
                    } else {
                        title.to_string()
                    },
                    content: chunk.content,
                    embedding: Some(embedding),
                    source: source.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // All parts or none
        let saved = self
            .database
            .insert_knowledge_batch(records)
            .await
            .map_err(database_error)?;

        info!("Stored {} knowledge records for owner {}", saved.len(), owner);
        Ok(saved)
    }

    /// Store a helpful answer as knowledge; negative feedback stores nothing
    #[inline]
    pub async fn promote_feedback(
        &self,
        owner: i64,
        question: &str,
        answer: &str,
        positive: bool,
    ) -> Result<Option<KnowledgeRecord>> {
        if question.trim().is_empty() || answer.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "question and answer are required".to_string(),
            ));
        }

        if !positive {
            debug!("Negative feedback from owner {}, nothing stored", owner);
            return Ok(None);
        }

        let content = format!("Pertanyaan: {}\n\nJawaban: {}", question, answer);
        let embedding = self
            .retriever
            .provider()
            .embed(&content)
            .await
            .to_stored()
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let title_prefix: String = question.chars().take(FEEDBACK_TITLE_CHARS).collect();
        let record = NewKnowledgeRecord {
            owner_id: owner,
            title: format!("Q&A: {}...", title_prefix),
            content,
            embedding: Some(embedding),
            source: SOURCE_FEEDBACK.to_string(),
        };

        let saved = self
            .database
            .insert_knowledge(record)
            .await
            .map_err(database_error)?;

        info!("Promoted feedback to knowledge record {}", saved.id);
        Ok(Some(saved))
    }

    /// Rank `owner`'s knowledge against `query`
    #[inline]
    pub async fn search(&self, owner: i64, query: &str, top_k: usize) -> Result<SearchOutcome> {
        let candidates = self
            .database
            .knowledge_candidates(owner)
            .await
            .map_err(database_error)?;

        let results = self.retriever.retrieve(query, &candidates, top_k).await?;
        let context = build_context(&results);

        Ok(SearchOutcome { results, context })
    }

    /// Retrieve context and history for `message` and assemble the prompt
    ///
    /// Guests (`owner == None`) get neither retrieval nor history.
    #[inline]
    pub async fn prepare_chat(
        &self,
        owner: Option<i64>,
        message: &str,
        flavor: ModelFlavor,
        today: NaiveDate,
    ) -> Result<PreparedChat> {
        if message.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }

        let (results, history) = match owner {
            Some(owner) => {
                let outcome = self.search(owner, message, self.top_k).await?;
                let recent = self
                    .database
                    .recent_chats(owner, self.generation.history_limit)
                    .await
                    .map_err(database_error)?;
                let history = prepare_history(recent.into_iter().map(ChatExchange::from).collect());
                (outcome.results, history)
            }
            None => (Vec::new(), Vec::new()),
        };

        let context = build_context(&results);
        let is_document_query = self.classifier.is_document_query(message);
        let is_code_query = self.classifier.is_code_query(message);
        let temperature = select_temperature(
            !context.is_empty(),
            is_code_query,
            &self.generation.temperature,
        );

        let mut prepared = PreparedChat {
            owner,
            message: message.to_string(),
            today: format_indonesian_date(today),
            history,
            results,
            context,
            is_document_query,
            is_code_query,
            temperature,
            flavor,
            messages: Vec::new(),
        };
        prepared.messages = self.render_messages(&prepared, flavor);

        debug!(
            "Prepared chat with {} history exchanges and {} context passages",
            prepared.history.len(),
            prepared.results.len()
        );
        Ok(prepared)
    }

    /// Build the message list for `flavor` from already prepared inputs
    #[inline]
    pub fn render_messages(&self, prepared: &PreparedChat, flavor: ModelFlavor) -> Vec<ChatMessage> {
        let system_prompt = self.prompts.build_system_prompt(&SystemPromptOptions {
            flavor,
            is_guest: prepared.is_guest(),
            today: &prepared.today,
            context: &prepared.context,
            is_document_query: prepared.is_document_query,
        });

        build_messages(system_prompt, &prepared.history, &prepared.message)
    }

    /// Answer `message`, failing over to the fallback provider when the
    /// primary one is rate limited, and save the exchange for signed-in users
    #[inline]
    pub async fn answer(
        &self,
        owner: Option<i64>,
        message: &str,
        today: NaiveDate,
    ) -> Result<ChatAnswer> {
        let prepared = self
            .prepare_chat(owner, message, ModelFlavor::Gpt, today)
            .await?;

        let request = |messages: Vec<ChatMessage>| {
            CompletionRequest::new(messages)
                .with_max_tokens(self.generation.max_output_tokens)
                .with_temperature(prepared.temperature)
        };

        let primary_result = self
            .primary
            .complete(&request(prepared.messages.clone()))
            .await;

        let (reply, model, flavor) = match (primary_result, self.fallback.as_ref()) {
            (Ok(reply), _) => (reply, self.primary.model().to_string(), ModelFlavor::Gpt),
            (Err(error), Some(fallback)) if error.is_rate_limited() => {
                warn!(
                    event = "PROVIDER_FAILOVER",
                    from = self.primary.model(),
                    to = fallback.model(),
                    "Primary provider rate limited, switching to fallback"
                );

                let messages = self.render_messages(&prepared, ModelFlavor::Llama);
                let reply = fallback
                    .complete(&request(messages))
                    .await
                    .map_err(|e| RagError::Llm(e.to_string()))?;
                (reply, fallback.model().to_string(), ModelFlavor::Llama)
            }
            (Err(error), _) => return Err(RagError::Llm(error.to_string())),
        };

        let used_fallback = flavor == ModelFlavor::Llama;
        if let Some(owner) = owner {
            self.save_exchange(owner, message, &reply, used_fallback)
                .await?;
        }

        Ok(ChatAnswer {
            reply,
            model,
            flavor,
            used_fallback,
            results: prepared.results,
        })
    }

    async fn save_exchange(
        &self,
        owner: i64,
        message: &str,
        reply: &str,
        used_fallback: bool,
    ) -> Result<ChatRecord> {
        let message = if used_fallback {
            format!("{}{}", FALLBACK_MODEL_TAG, message)
        } else {
            message.to_string()
        };

        self.database
            .insert_chat(NewChatRecord {
                owner_id: owner,
                message,
                reply: reply.to_string(),
            })
            .await
            .map_err(database_error)
    }
}
