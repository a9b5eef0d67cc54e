
use serde::{Deserialize, Serialize};

/// A contiguous window of words taken from a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of this chunk among the retained chunks of the document
    pub index: usize,
    /// The window's words joined by single spaces
    pub content: String,
    /// Number of words in the window
    pub word_count: usize,
}

/// Configuration for word-window chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum number of words in a chunk
    pub chunk_size: usize,
    /// Number of words shared by adjacent chunks
    pub overlap: usize,
    /// Windows with this many words or fewer are discarded
    pub min_words: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            overlap: 50,
            min_words: 10,
        }
    }
}

impl ChunkingConfig {
    /// Number of words between the starts of two adjacent windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Lazily produces overlapping word windows over a text
#[derive(Debug, Clone)]
pub struct WordWindows<'a> {
    words: Vec<&'a str>,
    chunk_size: usize,
    stride: usize,
    min_words: usize,
    start: usize,
    next_index: usize,
}

impl Iterator for WordWindows<'_> {
    type Item = TextChunk;

    fn next(&mut self) -> Option<Self::Item> {
        while self.start < self.words.len() {
            let end = (self.start + self.chunk_size).min(self.words.len());
            let window = &self.words[self.start..end];
            self.start += self.stride;

            if window.len() <= self.min_words {
                continue;
            }

            let chunk = TextChunk {
                index: self.next_index,
                content: window.join(" "),
                word_count: window.len(),
            };
            self.next_index += 1;
            return Some(chunk);
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.words.len().saturating_sub(self.start);
        (0, Some(remaining.div_ceil(self.stride)))
    }
}

/// Split text into overlapping word windows ready for embedding
///
/// A new window starts every `chunk_size - overlap` words and spans up to
/// `chunk_size` words. Windows with `min_words` words or fewer are dropped.
#[inline]
pub fn chunk_text<'a>(text: &'a str, config: &ChunkingConfig) -> WordWindows<'a> {
    WordWindows {
        words: text.split_whitespace().collect(),
        chunk_size: config.chunk_size.max(1),
        stride: config.stride(),
        min_words: config.min_words,
        start: 0,
        next_index: 0,
    }
}

/// Count whitespace-separated words
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
