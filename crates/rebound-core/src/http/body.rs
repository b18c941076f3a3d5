//! Single-use body streams for requests and responses.

use bytes::Bytes;
use std::fmt;
use std::io::{self, Read};

/// A body stream that can be read once.
///
/// Request bodies are consumed by the transport; response bodies must be
/// drained or dropped by whoever ends up holding the response.
pub struct Body {
    reader: Box<dyn Read + Send>,
    len: Option<u64>,
}

impl Body {
    /// Wraps an arbitrary reader. The length is unknown.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            len: None,
        }
    }

    pub fn empty() -> Self {
        Self::from(Vec::new())
    }

    /// Length in bytes when known up front (in-memory bodies).
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Reads the whole stream into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len.unwrap_or(0) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Reads and discards the rest of the stream, returning the byte count.
    pub fn drain(mut self) -> io::Result<u64> {
        io::copy(&mut self.reader, &mut io::sink())
    }

    pub(crate) fn with_len<R>(reader: R, len: u64) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            len: Some(len),
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").field("len", &self.len).finish_non_exhaustive()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self::with_len(io::Cursor::new(bytes), len)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        let len = bytes.len() as u64;
        Self::with_len(io::Cursor::new(bytes), len)
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::with_len(io::Cursor::new(s.as_bytes()), s.len() as u64)
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::with_len(io::Cursor::new(bytes), bytes.len() as u64)
    }
}
