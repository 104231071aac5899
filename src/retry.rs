use std::time::Duration;

use crate::ClientOptions;

/// Where a submission's retry sequence currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Created, no call issued yet.
    Idle,
    /// Call number `n` (zero-based) is in flight or scheduled.
    Attempting(usize),
    /// An envelope was decoded.
    Success,
    /// Retries ran out, or a failure was not worth retrying.
    Exhausted,
    /// The handle was cancelled before a terminal state.
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Exhausted | Self::Cancelled)
    }
}

/// Attempt counter and backoff schedule for one retry sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryState {
    attempt_count: usize,
    max_attempts: usize,
    delay_schedule: Vec<Duration>,
    fallback_delay: Duration,
    phase: Phase,
}

impl RetryState {
    pub fn new(
        max_attempts: usize,
        delay_schedule: Vec<Duration>,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
            delay_schedule,
            fallback_delay,
            phase: Phase::Idle,
        }
    }

    pub fn from_options(options: &ClientOptions) -> Self {
        Self::new(
            options.max_retries,
            options
                .retry_delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            Duration::from_millis(options.fallback_delay_ms),
        )
    }

    /// Retries already consumed.
    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Calls issued so far, the one in flight included.
    pub fn calls_issued(&self) -> usize {
        match self.phase {
            Phase::Idle => 0,
            _ => self.attempt_count + 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Delay applied before retry `attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.delay_schedule
            .get(attempt)
            .copied()
            .unwrap_or(self.fallback_delay)
    }

    /// Moves `Idle` to `Attempting(0)`.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Attempting(0);
        }
    }

    /// Records a failed call.
    ///
    /// Returns the delay before the next call, or `None` once the sequence
    /// is exhausted.
    pub fn record_failure(&mut self) -> Option<Duration> {
        if self.phase.is_terminal() {
            return None;
        }
        if self.attempt_count < self.max_attempts {
            self.attempt_count += 1;
            self.phase = Phase::Attempting(self.attempt_count);
            Some(self.delay_for(self.attempt_count))
        } else {
            self.phase = Phase::Exhausted;
            None
        }
    }

    /// Ends the sequence on a failure that must not be retried.
    pub fn record_fatal(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Exhausted;
        }
    }

    pub fn record_success(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Success;
        }
    }

    pub fn record_cancelled(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Cancelled;
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::from_options(&ClientOptions::default())
    }
}
