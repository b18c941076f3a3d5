//! Transport capability: send one request, get a response or an error.
//!
//! The retry layer wraps any [`Transport`]. Implementations must be safe to
//! reuse across sequential calls; concurrent use is up to the implementation.

mod curl;

pub use self::curl::{CurlOptions, CurlTransport};

use crate::http::{Request, Response};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Sends a single request attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes `request`. Implementations take the body out of the request
    /// with [`Request::take_body`]; the remaining head stays readable for the
    /// caller afterwards.
    async fn execute(&self, request: &mut Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        (**self).execute(request).await
    }
}

/// Rough category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connect/read timeout or an expired request deadline.
    Timeout,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// Request could not be built or sent (bad option, body read failure).
    Request,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(s)
    }
}

/// Error raised by a transport. Cheap to clone so evaluators can propagate it.
#[derive(Debug, Clone)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    /// The attempt ran past its deadline.
    pub fn deadline_exceeded(after: Duration) -> Self {
        Self::timeout(format!("deadline exceeded after {:?}", after))
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe => TransportErrorKind::Connection,
            _ => TransportErrorKind::Other,
        };
        TransportError::new(kind, e.to_string()).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_includes_kind_and_message() {
        let e = TransportError::connection("connection refused");
        assert_eq!(e.to_string(), "connection error: connection refused");
        assert_eq!(e.kind(), TransportErrorKind::Connection);
    }

    #[test]
    fn io_errors_are_classified() {
        let e: TransportError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(e.is_timeout());
        assert!(e.source().is_some());
        let e: TransportError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(e.kind(), TransportErrorKind::Connection);
    }

    #[test]
    fn clones_share_the_source() {
        let e = TransportError::other("boom").with_source(std::fmt::Error);
        let c = e.clone();
        assert_eq!(c.to_string(), e.to_string());
        assert!(c.source().is_some());
    }
}
