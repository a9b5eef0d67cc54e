#[cfg(test)]
mod tests;

/// Deterministic bag-of-words embedding used when the semantic backend is unavailable
///
/// Every word is hashed into one of `dimension` buckets and the bucket counts
/// are L2-normalized. The result carries no semantic meaning beyond shared
/// vocabulary, but it is stable across processes and platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed already-cleaned text
    #[inline]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0_f32; self.dimension];

        for word in tokenize(text) {
            let index = (i64::from(word_hash(&word)).unsigned_abs() % self.dimension as u64) as usize;
            buckets[index] += 1.0;
        }

        normalize(&mut buckets);
        buckets
    }
}

/// Lowercase the text, turn every non-word character into a separator and
/// yield the remaining words
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// 32-bit rolling hash (`h = h * 31 + unit`) over UTF-16 code units
fn word_hash(word: &str) -> i32 {
    word.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}
