// Search module
// Similarity ranking, query expansion and the retrieval pipeline built on them

pub mod expansion;
pub mod retrieval;
pub mod similarity;

pub use expansion::{ExpandedQuery, QueryExpander};
pub use retrieval::{IngestedChunk, RetrievalDetails, Retriever};
pub use similarity::{
    KnowledgeCandidate, SimilarityResult, cosine_similarity, rank, score_candidate,
};
