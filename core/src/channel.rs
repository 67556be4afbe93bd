//! Channel configuration for the worker -> aggregator hand-off

/// Channel buffer configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Outcome channel buffer size (workers -> aggregator)
    pub outcome_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            outcome_buffer: 1_024,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom outcome buffer size
    ///
    /// A size of zero is bumped to one, since tokio rejects empty channels.
    pub fn with_outcome_buffer(mut self, size: usize) -> Self {
        self.outcome_buffer = size.max(1);
        self
    }
}
