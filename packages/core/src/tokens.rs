//! Best-effort token counting.

/// Counts tokens in a piece of text.
///
/// Implementations must not fail; an approximate count is acceptable.
pub trait TokenCounter: Send + Sync + 'static {
    fn count(&self, text: &str) -> u64;
}

/// Whitespace word count scaled by a constant factor.
///
/// Used when no real tokenizer is available.
#[derive(Debug, Clone, Copy)]
pub struct WordCountApprox {
    factor: f64,
}

impl WordCountApprox {
    pub const DEFAULT_FACTOR: f64 = 1.3;

    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Default for WordCountApprox {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FACTOR)
    }
}

impl TokenCounter for WordCountApprox {
    fn count(&self, text: &str) -> u64 {
        let words = text.split_whitespace().count() as f64;
        (words * self.factor) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximates_from_word_count() {
        let counter = WordCountApprox::default();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("OK"), 1);
        assert_eq!(counter.count("make a cube of ten mm"), 7);
        assert_eq!(counter.count("  spaced \n\t out  "), 2);
    }
}
