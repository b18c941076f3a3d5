//! libcurl-backed transport.
//!
//! One `Easy` handle per attempt, run on the blocking pool. The response
//! body is buffered in memory before the response is handed back.

use super::{Transport, TransportError, TransportErrorKind};
use crate::http::{parse_header_line, Body, HeaderMap, Method, Request, Response, StatusCode};
use async_trait::async_trait;
use std::str;
use std::time::{Duration, Instant};

/// Connection settings for [`CurlTransport`].
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirections: u32,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            follow_redirects: true,
            max_redirections: 10,
            user_agent: Some(concat!("rebound/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// Transport that performs each request with libcurl.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        let body = request.take_body();
        let method = request.method().clone();
        let url = request.url().to_string();
        let headers = request.headers().clone();
        let deadline = request.deadline();
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || {
            perform(&options, method, &url, &headers, body, deadline)
        })
        .await
        .map_err(|e| TransportError::other(format!("curl worker failed: {}", e)))?
    }
}

/// Runs one blocking transfer.
fn perform(
    options: &CurlOptions,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Option<Body>,
    deadline: Option<Instant>,
) -> Result<Response, TransportError> {
    let payload = match body {
        Some(b) => Some(b.into_bytes().map_err(|e| {
            TransportError::new(TransportErrorKind::Request, "reading request body").with_source(e)
        })?),
        None => None,
    };

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(from_curl)?;
    easy.follow_location(options.follow_redirects)
        .map_err(from_curl)?;
    easy.max_redirections(options.max_redirections)
        .map_err(from_curl)?;
    easy.connect_timeout(options.connect_timeout)
        .map_err(from_curl)?;
    if let Some(agent) = &options.user_agent {
        easy.useragent(agent).map_err(from_curl)?;
    }
    if let Some(deadline) = deadline {
        easy.timeout(curl_timeout(deadline, Instant::now())?)
            .map_err(from_curl)?;
    }

    if method == Method::GET {
        easy.get(true).map_err(from_curl)?;
    } else if method == Method::HEAD {
        easy.nobody(true).map_err(from_curl)?;
    } else if method == Method::POST {
        easy.post(true).map_err(from_curl)?;
    } else {
        easy.custom_request(method.as_str()).map_err(from_curl)?;
    }
    if let Some(bytes) = &payload {
        easy.post_fields_copy(bytes).map_err(from_curl)?;
        if method != Method::POST {
            // post_fields switches libcurl to POST; restore the verb.
            easy.custom_request(method.as_str()).map_err(from_curl)?;
        }
    }

    let mut list = curl::easy::List::new();
    for (name, value) in headers {
        let value = value.to_str().map_err(|e| {
            TransportError::new(TransportErrorKind::Request, format!("header {}", name)).with_source(e)
        })?;
        list.append(&format!("{}: {}", name, value))
            .map_err(from_curl)?;
    }
    // Suppress `Expect: 100-continue` so small uploads are sent immediately.
    list.append("Expect:").map_err(from_curl)?;
    easy.http_headers(list).map_err(from_curl)?;

    let mut header_lines: Vec<String> = Vec::new();
    let mut response_body: Vec<u8> = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    if line.starts_with("HTTP/") {
                        // New status line (redirect hop): keep only the final block.
                        header_lines.clear();
                    } else if !line.is_empty() {
                        header_lines.push(line.to_string());
                    }
                }
                true
            })
            .map_err(from_curl)?;
        transfer
            .write_function(|data| {
                response_body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(from_curl)?;
        transfer.perform().map_err(from_curl)?;
    }

    let code = easy.response_code().map_err(from_curl)?;
    let status = u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| TransportError::other(format!("invalid status code {}", code)))?;

    let mut response_headers = HeaderMap::new();
    for (name, value) in header_lines.iter().filter_map(|line| parse_header_line(line)) {
        response_headers.append(name, value);
    }

    Ok(Response::new(status)
        .with_headers(response_headers)
        .with_body(response_body))
}

/// Time left before `deadline`, as a curl total timeout.
///
/// libcurl reads a zero timeout as "none", so anything under a millisecond
/// is rounded up to one.
fn curl_timeout(deadline: Instant, now: Instant) -> Result<Duration, TransportError> {
    let remaining = deadline.saturating_duration_since(now);
    if remaining.is_zero() {
        return Err(TransportError::timeout("request deadline already passed"));
    }
    Ok(remaining.max(Duration::from_millis(1)))
}

/// Classify a curl error into a transport error kind.
pub fn classify_curl_error(e: &curl::Error) -> TransportErrorKind {
    if e.is_operation_timedout() {
        return TransportErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransportErrorKind::Connection;
    }
    TransportErrorKind::Other
}

fn from_curl(e: curl::Error) -> TransportError {
    TransportError::new(classify_curl_error(&e), e.to_string()).with_source(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_follow_redirects() {
        let opts = CurlOptions::default();
        assert!(opts.follow_redirects);
        assert_eq!(opts.max_redirections, 10);
        assert!(opts.user_agent.as_deref().unwrap().starts_with("rebound/"));
    }

    #[test]
    fn expired_deadline_fails_before_sending() {
        let result = perform(
            &CurlOptions::default(),
            Method::GET,
            "http://127.0.0.1:9/",
            &HeaderMap::new(),
            None,
            Some(Instant::now() - Duration::from_millis(1)),
        );
        let err = result.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn sub_millisecond_remainder_keeps_a_timeout() {
        let now = Instant::now();
        let timeout = curl_timeout(now + Duration::from_micros(200), now).unwrap();
        assert_eq!(timeout, Duration::from_millis(1));

        let timeout = curl_timeout(now + Duration::from_secs(2), now).unwrap();
        assert_eq!(timeout, Duration::from_secs(2));

        assert!(curl_timeout(now, now).unwrap_err().is_timeout());
    }
}
