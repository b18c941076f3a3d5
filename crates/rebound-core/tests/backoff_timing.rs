//! Wall-clock behaviour of the backoff generator.

use rebound_core::backoff::{BackoffConfig, BackoffStep, ExponentialBackoff};
use std::time::{Duration, Instant};

#[test]
fn sleeping_each_wait_stops_after_max_elapsed_time() {
    let max_elapsed = Duration::from_secs(1);
    let started = Instant::now();
    let mut backoff = ExponentialBackoff::new(&BackoffConfig {
        max_elapsed_time: max_elapsed,
        ..BackoffConfig::default()
    });

    loop {
        match backoff.next_backoff() {
            BackoffStep::RetryAfter(wait) => {
                assert!(
                    started.elapsed() <= max_elapsed + Duration::from_millis(5),
                    "retry granted after the budget"
                );
                std::thread::sleep(wait);
            }
            BackoffStep::Expired => break,
        }
    }
    assert!(started.elapsed() > max_elapsed);
}

#[test]
fn waits_never_exceed_jittered_max_interval() {
    let max_interval = Duration::from_millis(100);
    let cfg = BackoffConfig {
        max_elapsed_time: Duration::from_secs(1),
        max_interval,
        randomization_factor: 0.5,
    };
    let limit = Duration::from_millis(150);
    let started = Instant::now();
    let mut backoff = ExponentialBackoff::new(&cfg);

    loop {
        let step = backoff.next_backoff();
        assert!(step.wait() <= limit, "wait {:?} above {:?}", step.wait(), limit);
        if !step.should_retry() {
            break;
        }
        std::thread::sleep(step.wait());
    }

    let elapsed = started.elapsed();
    assert!(elapsed > Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1_500), "took {:?}", elapsed);
}
