//! Matching engine configuration.

/// Matching engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingConfig {
    /// Capacity of the notification channel between the engine and the writer.
    pub notification_buffer: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            notification_buffer: crate::events::DEFAULT_CHANNEL_BUFFER,
        }
    }
}
