
use crate::config::{PromptConfig, TemperatureConfig};

/// Case-insensitive substring match against a fixed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Blank keywords are ignored
    #[inline]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }

    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Decides whether a query refers to the user's documents or asks about code
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryClassifier {
    documents: KeywordClassifier,
    code: KeywordClassifier,
}

impl QueryClassifier {
    #[inline]
    pub fn new(documents: KeywordClassifier, code: KeywordClassifier) -> Self {
        Self { documents, code }
    }

    #[inline]
    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(
            KeywordClassifier::new(&config.document_keywords),
            KeywordClassifier::new(&config.code_keywords),
        )
    }

    #[inline]
    pub fn is_document_query(&self, query: &str) -> bool {
        self.documents.matches(query)
    }

    #[inline]
    pub fn is_code_query(&self, query: &str) -> bool {
        self.code.matches(query)
    }
}

/// Code questions win over retrieved context, which wins over general chat
#[inline]
pub fn select_temperature(
    has_context: bool,
    is_code_query: bool,
    temperatures: &TemperatureConfig,
) -> f32 {
    if is_code_query {
        temperatures.code
    } else if has_context {
        temperatures.rag
    } else {
        temperatures.general
    }
}
