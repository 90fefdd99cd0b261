use std::time::{Duration, Instant};

/// Execution statistics for one scoring run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total execution time.
    pub total_time: Duration,
    /// Number of pairs processed.
    pub items_processed: usize,
    /// Number of model forward passes issued.
    pub forward_passes: usize,
}

impl PipelineStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
            forward_passes: 0,
        }
    }
}

/// Builder for [`PipelineStats`], tracks timing from creation to finalize.
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
    forward_passes: usize,
}

impl PipelineStatsBuilder {
    pub fn record_forward(&mut self) {
        self.forward_passes += 1;
    }

    pub fn finish(self, items_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            items_processed,
            forward_passes: self.forward_passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_captures_counts() {
        let mut builder = PipelineStats::start();
        builder.record_forward();
        builder.record_forward();
        let stats = builder.finish(7);
        assert_eq!(stats.items_processed, 7);
        assert_eq!(stats.forward_passes, 2);
    }
}
