//! Logger capability used for retry diagnostics.

use crate::http::Request;
use std::fmt;

/// One key/value pair attached to a log entry.
pub type Field<'a> = (&'a str, &'a dyn fmt::Display);

/// Sink for retry diagnostics. Setting one on the retry transport enables
/// logging of intermediate failures.
///
/// `request` is the attempt the entry is about (method, URL, headers and
/// deadline; never the body).
pub trait Logger: Send + Sync {
    fn error(&self, request: &Request, message: &str, fields: &[Field<'_>]);
    fn warn(&self, request: &Request, message: &str, fields: &[Field<'_>]);
    fn debug(&self, request: &Request, message: &str, fields: &[Field<'_>]);
}

/// Forwards entries to `tracing` under the `rebound::retry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        tracing::error!(
            target: "rebound::retry",
            method = %request.method(),
            url = %request.url(),
            fields = %FieldList(fields),
            "{}",
            message
        );
    }

    fn warn(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        tracing::warn!(
            target: "rebound::retry",
            method = %request.method(),
            url = %request.url(),
            fields = %FieldList(fields),
            "{}",
            message
        );
    }

    fn debug(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        tracing::debug!(
            target: "rebound::retry",
            method = %request.method(),
            url = %request.url(),
            fields = %FieldList(fields),
            "{}",
            message
        );
    }
}

/// Renders fields as `key=value` pairs separated by spaces.
pub struct FieldList<'a, 'b>(pub &'a [Field<'b>]);

impl fmt::Display for FieldList<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}
