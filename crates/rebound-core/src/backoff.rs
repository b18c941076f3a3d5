//! Exponential backoff interval generator.
//!
//! The state is a plain `Copy` value advanced by a pure transition
//! ([`BackoffState::advance`]) so the schedule can be tested against a
//! simulated clock. [`ExponentialBackoff`] couples one state with the wall
//! clock and a random source for use inside a single retry sequence.

use std::time::{Duration, Instant};

/// Total retry budget used when none is configured.
pub const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(60);
/// Upper bound on the nominal interval used when none is configured.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(5);
/// Jitter factor used when none is configured.
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Nominal interval before the first retry.
pub const INITIAL_INTERVAL: Duration = Duration::from_millis(50);
/// Growth ratio applied to the nominal interval after every step.
pub const MULTIPLIER: f64 = 1.5;

/// Budget parameters for one backoff sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Wall-clock window in which retries are permitted.
    pub max_elapsed_time: Duration,
    /// Cap on the nominal interval; the returned wait may exceed it by the jitter factor.
    pub max_interval: Duration,
    /// Jitter factor in `[0, 1]`. The wait is stretched by up to this fraction.
    pub randomization_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
            max_interval: DEFAULT_MAX_INTERVAL,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
        }
    }
}

/// Outcome of one backoff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStep {
    /// Wait this long, then try again.
    RetryAfter(Duration),
    /// The elapsed-time budget is spent. Terminal.
    Expired,
}

impl BackoffStep {
    pub fn should_retry(&self) -> bool {
        matches!(self, BackoffStep::RetryAfter(_))
    }

    /// The wait for this step; zero once expired.
    pub fn wait(&self) -> Duration {
        match self {
            BackoffStep::RetryAfter(d) => *d,
            BackoffStep::Expired => Duration::ZERO,
        }
    }
}

/// State of one backoff sequence. Owned by exactly one retry loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    current_interval: Duration,
    max_elapsed_time: Duration,
    max_interval: Duration,
    randomization_factor: f64,
    start_time: Instant,
}

impl BackoffState {
    /// Starts a sequence at `start_time`.
    ///
    /// The initial interval is clamped to `max_interval` so that no wait can
    /// exceed `max_interval * (1 + randomization_factor)`.
    pub fn new(config: &BackoffConfig, start_time: Instant) -> Self {
        Self {
            current_interval: INITIAL_INTERVAL.min(config.max_interval),
            max_elapsed_time: config.max_elapsed_time,
            max_interval: config.max_interval,
            randomization_factor: config.randomization_factor,
            start_time,
        }
    }

    /// Nominal interval the next step will be based on.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// True once `now` lies past the elapsed-time budget.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start_time) > self.max_elapsed_time
    }

    /// Pure transition: returns the successor state and the step for `now`.
    ///
    /// `random` must lie in `[0, 1)`. Jitter is one-sided: the wait is the
    /// pre-growth interval stretched by `random * randomization_factor`.
    pub fn advance(self, now: Instant, random: f64) -> (BackoffState, BackoffStep) {
        if self.is_expired(now) {
            return (self, BackoffStep::Expired);
        }

        let interval = self.current_interval.as_nanos() as f64;
        let max = self.max_interval.as_nanos() as f64;
        let next_interval = if interval >= max / MULTIPLIER {
            self.max_interval
        } else {
            nanos(interval * MULTIPLIER)
        };

        let wait = nanos(interval * (1.0 + random * self.randomization_factor));
        let next = BackoffState {
            current_interval: next_interval,
            ..self
        };
        (next, BackoffStep::RetryAfter(wait))
    }
}

fn nanos(value: f64) -> Duration {
    // Float-to-int `as` saturates, so huge intervals pin at u64::MAX nanoseconds.
    Duration::from_nanos(value as u64)
}

/// Backoff generator driven by the wall clock and `rand`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    state: BackoffState,
}

impl ExponentialBackoff {
    /// Starts a new sequence now.
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            state: BackoffState::new(config, Instant::now()),
        }
    }

    /// Next step: whether to retry and how long to wait first.
    pub fn next_backoff(&mut self) -> BackoffStep {
        let (state, step) = self.state.advance(Instant::now(), rand::random::<f64>());
        self.state = state;
        step
    }

    pub fn state(&self) -> &BackoffState {
        &self.state
    }
}
