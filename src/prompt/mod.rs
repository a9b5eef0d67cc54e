// Prompt module
// Query classification, retrieval context formatting and chat message assembly

pub mod builder;
pub mod classifier;
pub mod context;

pub use builder::{
    ChatExchange, ModelFlavor, PromptBuilder, SystemPromptOptions, build_messages,
    format_indonesian_date, prepare_history,
};
pub use classifier::{KeywordClassifier, QueryClassifier, select_temperature};
pub use context::{CONTEXT_SEPARATOR, build_context};
