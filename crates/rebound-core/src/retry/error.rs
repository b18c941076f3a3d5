//! Failures surfaced by the retry layer.

use crate::http::StatusCode;
use crate::transport::TransportError;
use std::fmt;
use std::sync::Arc;

/// Failure attributed to one attempt, as decided by the evaluator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptError {
    /// The transport failed (network, timeout, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server answered with a status worth retrying (5xx, 408).
    #[error("server response error")]
    ServerResponse { status: StatusCode },
    /// Reported by a custom evaluator.
    #[error("{0}")]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl AttemptError {
    /// Wraps an arbitrary error for use in a custom evaluator.
    pub fn custom<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AttemptError::Custom(Arc::new(e))
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            AttemptError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Key/value diagnostics attached to the final error (e.g. request and
/// response dumps of the last retried attempt).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    fields: Vec<(&'static str, String)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.fields.push((key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", k, v)?;
        }
        Ok(())
    }
}

/// Final error of a retry sequence.
///
/// Budget exhaustion and cancellation are not separate variants: both
/// surface the last attempt's error.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The request body could not be buffered; no attempt was made.
    #[error("failed to read request body: {0}")]
    Body(#[source] std::io::Error),
    /// The last attempt's failure.
    #[error("{error}")]
    Attempt {
        error: AttemptError,
        diagnostics: Diagnostics,
    },
}

impl RetryError {
    pub(crate) fn attempt(error: AttemptError, diagnostics: Diagnostics) -> Self {
        RetryError::Attempt { error, diagnostics }
    }

    /// The attempt failure, if any attempt was made.
    pub fn attempt_error(&self) -> Option<&AttemptError> {
        match self {
            RetryError::Attempt { error, .. } => Some(error),
            RetryError::Body(_) => None,
        }
    }

    pub fn transport_error(&self) -> Option<&TransportError> {
        self.attempt_error().and_then(AttemptError::as_transport)
    }

    /// Diagnostics captured for the last retried attempt (empty unless
    /// request/response dumping is enabled).
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            RetryError::Attempt { diagnostics, .. } => Some(diagnostics),
            RetryError::Body(_) => None,
        }
    }
}
