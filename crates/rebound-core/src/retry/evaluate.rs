//! Classify a finished attempt as retryable or final.

use super::error::AttemptError;
use crate::http::{Request, Response, StatusCode};
use crate::transport::TransportError;

/// Decision for one attempt.
#[derive(Debug, Clone)]
pub struct RetryDecision {
    pub should_retry: bool,
    /// Error to report for this attempt, if any.
    pub error: Option<AttemptError>,
}

impl RetryDecision {
    /// Stop and hand the outcome to the caller.
    pub fn done() -> Self {
        Self {
            should_retry: false,
            error: None,
        }
    }

    /// Stop and report `error`.
    pub fn fail(error: AttemptError) -> Self {
        Self {
            should_retry: false,
            error: Some(error),
        }
    }

    /// Try again; `error` is what the caller sees if this was the last attempt.
    pub fn retry(error: AttemptError) -> Self {
        Self {
            should_retry: true,
            error: Some(error),
        }
    }
}

/// Decides whether an attempt should be retried.
///
/// Implementations must be free of side effects: the same inputs always
/// yield the same decision. Any
/// `Fn(Option<&TransportError>, &Request, Option<&Response>) -> RetryDecision`
/// closure is an evaluator.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        error: Option<&TransportError>,
        request: &Request,
        response: Option<&Response>,
    ) -> RetryDecision;
}

impl<F> Evaluator for F
where
    F: Fn(Option<&TransportError>, &Request, Option<&Response>) -> RetryDecision + Send + Sync,
{
    fn evaluate(
        &self,
        error: Option<&TransportError>,
        request: &Request,
        response: Option<&Response>,
    ) -> RetryDecision {
        self(error, request, response)
    }
}

/// Retries transport errors, 5xx and 408; everything else is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

impl Evaluator for DefaultEvaluator {
    fn evaluate(
        &self,
        error: Option<&TransportError>,
        request: &Request,
        response: Option<&Response>,
    ) -> RetryDecision {
        default_evaluator(error, request, response)
    }
}

/// The default policy as a plain function.
pub fn default_evaluator(
    error: Option<&TransportError>,
    _request: &Request,
    response: Option<&Response>,
) -> RetryDecision {
    if let Some(e) = error {
        return RetryDecision::retry(AttemptError::Transport(e.clone()));
    }

    match response {
        Some(res) if is_retryable_status(res.status()) => {
            RetryDecision::retry(AttemptError::ServerResponse {
                status: res.status(),
            })
        }
        _ => RetryDecision::done(),
    }
}

/// 5xx and 408 are worth another try.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
}
