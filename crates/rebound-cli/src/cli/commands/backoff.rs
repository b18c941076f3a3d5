//! `rebound backoff` – print the retry schedule for a budget on a simulated clock.

use anyhow::{Context, Result};
use clap::Args;
use rebound_core::backoff::{BackoffConfig, BackoffState, BackoffStep};
use rebound_core::config::ReboundConfig;
use rebound_core::retry::{duration_from_secs, RetryOptions};
use std::time::{Duration, Instant};

#[derive(Debug, Args)]
pub struct BackoffArgs {
    /// Total retry budget in seconds (defaults to config).
    #[arg(long, value_name = "SECS")]
    pub max_elapsed: Option<f64>,

    /// Cap on the nominal interval in milliseconds (defaults to config).
    #[arg(long, value_name = "MS")]
    pub max_interval_ms: Option<u64>,

    /// Jitter factor in [0, 1] (defaults to config).
    #[arg(long, value_name = "FACTOR")]
    pub randomization_factor: Option<f64>,

    /// Fixed random draw in [0, 1) used for every step.
    #[arg(long, default_value_t = 0.5)]
    pub random: f64,

    /// Simulated duration of each attempt in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub attempt_ms: u64,
}

/// One granted retry on the simulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScheduleRow {
    pub retry: u32,
    pub interval: Duration,
    pub wait: Duration,
    pub elapsed: Duration,
}

/// Runs the backoff to expiry, advancing the clock by `attempt` plus each wait.
pub(crate) fn schedule(cfg: &BackoffConfig, random: f64, attempt: Duration) -> Vec<ScheduleRow> {
    let mut state = BackoffState::new(cfg, Instant::now());
    let mut now = state.start_time();
    let mut rows = Vec::new();
    loop {
        now += attempt;
        let interval = state.current_interval();
        let (next, step) = state.advance(now, random);
        match step {
            BackoffStep::Expired => break,
            BackoffStep::RetryAfter(wait) => {
                now += wait;
                rows.push(ScheduleRow {
                    retry: rows.len() as u32 + 1,
                    interval,
                    wait,
                    elapsed: now - state.start_time(),
                });
            }
        }
        state = next;
    }
    rows
}

fn print_schedule(rows: &[ScheduleRow]) {
    println!(
        "  {:>5}  {:>12}  {:>10}  {:>10}",
        "Retry", "Interval(ms)", "Wait(ms)", "Elapsed(s)"
    );
    println!("  {}  {}  {}  {}", "-----", "------------", "----------", "----------");
    for r in rows {
        println!(
            "  {:>5}  {:>12}  {:>10}  {:>10.3}",
            r.retry,
            r.interval.as_millis(),
            r.wait.as_millis(),
            r.elapsed.as_secs_f64()
        );
    }
}

pub fn run_backoff(cfg: &ReboundConfig, args: BackoffArgs) -> Result<()> {
    let mut options: RetryOptions = cfg.retry.to_options().context("invalid [retry] config")?;
    if let Some(secs) = args.max_elapsed {
        options.backoff.max_elapsed_time = duration_from_secs("--max-elapsed", secs)?;
    }
    if let Some(ms) = args.max_interval_ms {
        options.backoff.max_interval = Duration::from_millis(ms);
    }
    if let Some(factor) = args.randomization_factor {
        options.backoff.randomization_factor = factor;
    }
    options.validate()?;
    if !(0.0..1.0).contains(&args.random) {
        anyhow::bail!("--random must be within [0, 1), got {}", args.random);
    }

    let rows = schedule(
        &options.backoff,
        args.random,
        Duration::from_millis(args.attempt_ms),
    );
    print_schedule(&rows);
    println!(
        "{} retries within {:.1}s budget",
        rows.len(),
        options.backoff.max_elapsed_time.as_secs_f64()
    );
    Ok(())
}
