use std::time::Duration;

/// Configures timeout, retry and display behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds. `None` lets a hung call stall its sequence.
    pub timeout_ms: Option<u64>,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before retry `k` is `retry_delays_ms[k]`; index 0 is the initial attempt.
    pub retry_delays_ms: Vec<u64>,
    /// Delay used when the schedule has no entry for a retry.
    pub fallback_delay_ms: u64,
    /// Characters of the backend log shown before truncation.
    pub log_preview_chars: usize,
    /// How long a success/error class stays on the display before reverting.
    pub status_reset_ms: u64,
    /// Cancel the previous in-flight submission when a new one starts.
    pub supersede_in_flight: bool,
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn status_reset(&self) -> Duration {
        Duration::from_millis(self.status_reset_ms)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_retries: 3,
            retry_delays_ms: vec![0, 1_000, 4_000, 9_000],
            fallback_delay_ms: 1_000,
            log_preview_chars: 500,
            status_reset_ms: 3_000,
            supersede_in_flight: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClientOptions;

    #[test]
    fn defaults_match_backoff_schedule() {
        let opts = ClientOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.retry_delays_ms, vec![0, 1_000, 4_000, 9_000]);
        assert!(opts.max_retries < opts.retry_delays_ms.len());
        assert_eq!(opts.timeout(), None);
    }
}
