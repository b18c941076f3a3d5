//! Request body snapshot for replaying a body on every attempt.

use crate::http::Body;
use bytes::Bytes;
use std::io;

/// Immutable copy of a request body, captured once per retry sequence.
///
/// [`BodySnapshot::reader`] hands out a fresh, independent stream on every
/// call; the single-use source stream is consumed by [`BodySnapshot::capture`].
#[derive(Debug, Clone)]
pub struct BodySnapshot {
    bytes: Bytes,
}

impl BodySnapshot {
    /// Reads `body` to the end and drops it.
    pub fn capture(body: Body) -> io::Result<Self> {
        let bytes = body.into_bytes()?;
        Ok(Self {
            bytes: Bytes::from(bytes),
        })
    }

    /// Same as [`capture`](Self::capture), run on the blocking pool so a slow
    /// reader cannot stall a runtime worker.
    pub async fn capture_blocking(body: Body) -> io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::capture(body))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("body reader task failed: {}", e)))?
    }

    /// New stream positioned at the start of the buffered bytes.
    pub fn reader(&self) -> Body {
        Body::from(self.bytes.clone())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
