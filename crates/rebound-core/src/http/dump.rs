//! Text dumps of requests and responses for retry diagnostics.

use super::{HeaderMap, Request, StatusCode};

/// Renders `request` in HTTP/1.1 wire form, with `body` appended when given.
pub fn dump_request(request: &Request, body: Option<&[u8]>) -> String {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(q) = url.query() {
        target.push('?');
        target.push_str(q);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => out.push_str(&format!("Host: {}:{}\r\n", host, port)),
            None => out.push_str(&format!("Host: {}\r\n", host)),
        }
    }
    push_headers(&mut out, request.headers());
    out.push_str("\r\n");
    if let Some(body) = body {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

/// Renders a response status line, headers and body.
pub fn dump_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> String {
    let mut out = format!("HTTP/1.1 {}\r\n", status);
    push_headers(&mut out, headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}

fn push_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
}
