// Embeddings module
// Text chunking, the semantic embedding client and its hash fallback

pub mod chunking;
pub mod fallback;
pub mod provider;
pub mod remote;

pub use chunking::{ChunkingConfig, TextChunk, chunk_text, word_count};
pub use fallback::HashEmbedder;
pub use provider::{Embedding, EmbeddingProvider, EmbeddingSource, StoredEmbedding, clean_text};
pub use remote::{EmbeddingBackend, EmbeddingError, HttpEmbeddingClient};
