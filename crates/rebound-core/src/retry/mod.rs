//! Retry orchestration.
//!
//! This module wraps a [`Transport`](crate::transport::Transport) with an
//! exponential-backoff retry loop: outcome classification (the evaluator),
//! request body replay, per-attempt deadlines, cancellation between attempts
//! and optional diagnostics through a [`Logger`].

mod body;
mod error;
mod evaluate;
mod log;
mod options;
mod run;

pub use body::BodySnapshot;
pub use error::{AttemptError, Diagnostics, RetryError};
pub use evaluate::{default_evaluator, is_retryable_status, DefaultEvaluator, Evaluator, RetryDecision};
pub use log::{Field, FieldList, Logger, TracingLogger};
pub use options::{duration_from_secs, ConfigError, RetryOptions};
pub use run::{RetryTransport, RetryTransportBuilder};
