//! Retry loop: send until the evaluator accepts the outcome, the backoff
//! budget runs out, the request deadline passes, or the caller cancels.

use super::body::BodySnapshot;
use super::error::{AttemptError, Diagnostics, RetryError};
use super::evaluate::{DefaultEvaluator, Evaluator};
use super::log::{Field, Logger};
use super::options::{ConfigError, RetryOptions};
use crate::backoff::{BackoffStep, ExponentialBackoff};
use crate::http::{dump_request, dump_response, Request, Response};
use crate::transport::{Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Decorates a [`Transport`] with exponential-backoff retries.
///
/// Each call to [`RetryTransport::execute`] is an independent sequence with
/// its own backoff state; nothing is shared between calls except the inner
/// transport.
pub struct RetryTransport<T> {
    inner: T,
    options: RetryOptions,
    evaluator: Arc<dyn Evaluator>,
    logger: Option<Arc<dyn Logger>>,
}

impl<T> RetryTransport<T>
where
    T: Transport,
{
    /// Wraps `inner` with the default options and evaluator.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            options: RetryOptions::default(),
            evaluator: Arc::new(DefaultEvaluator),
            logger: None,
        }
    }

    pub fn builder(inner: T) -> RetryTransportBuilder<T> {
        RetryTransportBuilder::new(inner)
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Sends `request`, retrying until the evaluator accepts the outcome.
    ///
    /// `cancel` and the request's own deadline are observed while waiting
    /// between attempts; an in-flight attempt is never interrupted by
    /// `cancel`. On cancellation, deadline expiry or budget exhaustion the
    /// last attempt's error is returned.
    pub async fn execute(
        &self,
        mut request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, RetryError> {
        let span = tracing::debug_span!(
            "retry",
            method = %request.method(),
            url = %request.url(),
        );

        async move {
            let snapshot = match request.take_body() {
                Some(body) => match BodySnapshot::capture_blocking(body).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => return Err(RetryError::Body(e)),
                },
                None => None,
            };

            // A deadline carried by the request wins over the per-attempt timeout.
            let attempt_timeout = match request.deadline() {
                Some(_) => None,
                None => self.options.request_timeout,
            };

            self.run(request, snapshot, attempt_timeout, cancel).await
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        template: Request,
        snapshot: Option<BodySnapshot>,
        attempt_timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Response, RetryError> {
        let request_deadline = template.deadline();
        let mut backoff = ExponentialBackoff::new(&self.options.backoff);
        let mut retries: u32 = 0;

        loop {
            let mut attempt = template.clone_head();
            // Scoped to this iteration; dropped with `attempt`. A timeout too
            // large to add to the clock leaves the attempt unbounded.
            if let Some(timeout) = attempt_timeout {
                attempt.set_deadline(Instant::now().checked_add(timeout));
            }
            if let Some(snapshot) = &snapshot {
                attempt.set_body(Some(snapshot.reader()));
                if let Some(logger) = &self.logger {
                    let bytes = snapshot.len();
                    logger.debug(
                        &attempt,
                        "replaying buffered request body",
                        &[("bytes", &bytes as &dyn fmt::Display)],
                    );
                }
            }
            let deadline = attempt.deadline();

            let outcome = self.send(&mut attempt, deadline).await;
            match &outcome {
                Ok(res) => tracing::debug!(attempt = retries + 1, status = %res.status(), "attempt finished"),
                Err(e) => tracing::debug!(attempt = retries + 1, error = %e, "attempt failed"),
            }

            let decision = self.evaluator.evaluate(
                outcome.as_ref().err(),
                &attempt,
                outcome.as_ref().ok(),
            );
            if !decision.should_retry {
                return match (decision.error, outcome) {
                    (Some(error), _) => Err(RetryError::attempt(error, Diagnostics::new())),
                    (None, Ok(res)) => Ok(res),
                    (None, Err(e)) => Err(RetryError::attempt(
                        AttemptError::Transport(e),
                        Diagnostics::new(),
                    )),
                };
            }

            let last_error = decision.error.unwrap_or_else(|| fallback_error(&outcome));
            let mut diagnostics = Diagnostics::new();
            if let Ok(res) = outcome {
                self.discard(res, &attempt, snapshot.as_ref(), &mut diagnostics);
            }

            let wait = match backoff.next_backoff() {
                BackoffStep::RetryAfter(wait) => wait,
                BackoffStep::Expired => {
                    tracing::debug!(retries, error = %last_error, "retry budget exhausted");
                    return Err(RetryError::attempt(last_error, diagnostics));
                }
            };

            if request_deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!(retries, error = %last_error, "request deadline passed");
                return Err(RetryError::attempt(last_error, diagnostics));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(retries, error = %last_error, "retry cancelled");
                    return Err(RetryError::attempt(last_error, diagnostics));
                }
                _ = deadline_elapsed(request_deadline) => {
                    tracing::debug!(retries, error = %last_error, "request deadline passed during backoff");
                    return Err(RetryError::attempt(last_error, diagnostics));
                }
                _ = tokio::time::sleep(wait) => {
                    retries += 1;
                    self.warn_retry(&attempt, retries, &last_error, &diagnostics);
                }
            }
        }
    }

    /// Executes one attempt, bounded by `deadline` when set.
    async fn send(
        &self,
        attempt: &mut Request,
        deadline: Option<Instant>,
    ) -> Result<Response, TransportError> {
        let Some(deadline) = deadline else {
            return self.inner.execute(attempt).await;
        };

        let started = Instant::now();
        match tokio::time::timeout_at(
            tokio::time::Instant::from_std(deadline),
            self.inner.execute(attempt),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::deadline_exceeded(started.elapsed())),
        }
    }

    /// Drains and closes a response that is about to be retried, capturing
    /// dumps into `diagnostics` when enabled.
    fn discard(
        &self,
        response: Response,
        attempt: &Request,
        snapshot: Option<&BodySnapshot>,
        diagnostics: &mut Diagnostics,
    ) {
        if self.options.dumps_enabled() {
            if self.options.log_request {
                diagnostics.push(
                    "request",
                    dump_request(attempt, snapshot.map(BodySnapshot::as_bytes)),
                );
            }
            if self.options.log_response {
                let (status, headers, body) = response.into_parts();
                let bytes = match body.into_bytes() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::debug!(error = %e, "failed to read retried response body");
                        Vec::new()
                    }
                };
                diagnostics.push("response", dump_response(status, &headers, &bytes));
                return;
            }
        }

        if let Err(e) = response.into_body().drain() {
            tracing::debug!(error = %e, "failed to drain retried response body");
        }
    }

    fn warn_retry(
        &self,
        attempt: &Request,
        retries: u32,
        error: &AttemptError,
        diagnostics: &Diagnostics,
    ) {
        let Some(logger) = &self.logger else {
            return;
        };
        let message = format!("error during request, retry # {}", retries);
        let mut fields: Vec<Field<'_>> = vec![
            ("retry", &retries as &dyn fmt::Display),
            ("error", error as &dyn fmt::Display),
        ];
        if !diagnostics.is_empty() {
            fields.push(("diagnostics", diagnostics as &dyn fmt::Display));
        }
        logger.warn(attempt, &message, &fields);
    }
}

/// Resolves once `deadline` passes; never resolves without one.
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}


/// Error to report when a retried attempt came back without one.
fn fallback_error(outcome: &Result<Response, TransportError>) -> AttemptError {
    match outcome {
        Err(e) => AttemptError::Transport(e.clone()),
        Ok(res) => AttemptError::ServerResponse {
            status: res.status(),
        },
    }
}

/// Builder for [`RetryTransport`]. Options are validated once in [`build`](Self::build).
pub struct RetryTransportBuilder<T> {
    inner: T,
    options: RetryOptions,
    evaluator: Arc<dyn Evaluator>,
    logger: Option<Arc<dyn Logger>>,
}

impl<T> RetryTransportBuilder<T>
where
    T: Transport,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            options: RetryOptions::default(),
            evaluator: Arc::new(DefaultEvaluator),
            logger: None,
        }
    }

    /// Replaces all options at once (e.g. from a config file).
    pub fn options(mut self, options: RetryOptions) -> Self {
        self.options = options;
        self
    }

    /// Total retry budget.
    pub fn backoff_timeout(mut self, timeout: Duration) -> Self {
        self.options.backoff.max_elapsed_time = timeout;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.options.backoff.max_interval = interval;
        self
    }

    pub fn randomization_factor(mut self, factor: f64) -> Self {
        self.options.backoff.randomization_factor = factor;
        self
    }

    /// Per-attempt deadline for requests that carry none of their own.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    pub fn evaluator<E>(mut self, evaluator: E) -> Self
    where
        E: Evaluator + 'static,
    {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// Enables retry diagnostics through `logger`.
    pub fn logger<L>(mut self, logger: L) -> Self
    where
        L: Logger + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn log_request(mut self) -> Self {
        self.options.log_request = true;
        self
    }

    pub fn log_response(mut self) -> Self {
        self.options.log_response = true;
        self
    }

    pub fn build(self) -> Result<RetryTransport<T>, ConfigError> {
        self.options.validate()?;
        Ok(RetryTransport {
            inner: self.inner,
            options: self.options,
            evaluator: self.evaluator,
            logger: self.logger,
        })
    }
}
