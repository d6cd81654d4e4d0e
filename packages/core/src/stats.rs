//! Aggregate generation statistics.

use serde::{Deserialize, Serialize};

use crate::GenerationResult;

/// Running totals over every job that reached a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Jobs that completed successfully.
    pub total_requests: u64,
    /// Jobs that failed, for any reason.
    pub failed_requests: u64,
    /// Sum of generation times of completed jobs (seconds).
    pub total_generation_time: f64,
    pub total_tokens_generated: u64,
    /// `total_tokens_generated / total_generation_time`, or zero.
    pub average_tokens_per_second: f64,
}

impl GenerationStats {
    pub fn record_completion(&mut self, result: &GenerationResult) {
        self.total_requests += 1;
        self.total_generation_time += result.generation_time.max(0.0);
        self.total_tokens_generated += result.tokens_generated;
        self.average_tokens_per_second = if self.total_generation_time > 0.0 {
            self.total_tokens_generated as f64 / self.total_generation_time
        } else {
            0.0
        };
    }

    pub fn record_failure(&mut self) {
        self.failed_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_over_totals_not_per_job() {
        let mut stats = GenerationStats::default();
        stats.record_completion(&GenerationResult::new("a", 1.0, 10, 0));
        stats.record_completion(&GenerationResult::new("b", 3.0, 10, 0));
        stats.record_failure();

        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.total_tokens_generated, 20);
        assert_eq!(stats.average_tokens_per_second, 5.0);
    }
}
