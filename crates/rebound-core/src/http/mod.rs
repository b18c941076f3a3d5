//! Request/response model carried through the retry loop.
//!
//! Methods, headers and status codes are the `http` crate's types. Bodies are
//! single-use streams ([`Body`]); everything else on a request is cheap to
//! clone so that every attempt can be rebuilt from the caller's request.

mod body;
mod dump;

pub use self::body::Body;
pub use self::dump::{dump_request, dump_response};
pub use ::http::header::{HeaderName, HeaderValue};
pub use ::http::{HeaderMap, Method, StatusCode};

use ::http::header::IntoHeaderName;
use std::time::{Duration, Instant};
use url::Url;

/// Parses a raw `Name: value` header line. Returns None for status lines,
/// blank lines and anything that is not a valid header.
pub fn parse_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = line.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

/// Outbound request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    deadline: Option<Instant>,
}

impl Request {
    /// Builds a request for `url`.
    pub fn new(method: Method, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(method, Url::parse(url)?))
    }

    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            deadline: None,
        }
    }

    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self, url::ParseError> {
        Self::new(Method::POST, url)
    }

    /// Appends a header, keeping earlier values with the same name.
    pub fn with_header<K>(mut self, name: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets an absolute deadline. It bounds every attempt and the retry
    /// sequence as a whole.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now. A timeout too large to represent
    /// leaves the request without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Removes the body stream; transports call this to consume it.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub fn set_body(&mut self, body: Option<Body>) {
        self.body = body;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Copy of everything except the body.
    pub(crate) fn clone_head(&self) -> Request {
        Request {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: None,
            deadline: self.deadline,
        }
    }
}

/// Response received from a transport.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_header<K>(mut self, name: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Splits the response so the body can be consumed separately.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }
}
