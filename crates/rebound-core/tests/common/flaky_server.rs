//! Minimal HTTP/1.1 server for integration tests that fails a fixed number
//! of requests before succeeding.
//!
//! Failed requests get `failure_status` with a short body; later requests get
//! 200 with the request body echoed back. Every received body is recorded.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct FlakyServerOptions {
    /// Number of leading requests answered with `failure_status`.
    pub fail_first: usize,
    pub failure_status: u16,
}

impl Default for FlakyServerOptions {
    fn default() -> Self {
        Self {
            fail_first: 2,
            failure_status: 503,
        }
    }
}

/// Handle to a running server.
#[derive(Clone)]
pub struct FlakyServer {
    pub url: String,
    requests: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FlakyServer {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(opts: FlakyServerOptions) -> FlakyServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = FlakyServer {
        url: format!("http://127.0.0.1:{}/echo", port),
        requests: Arc::new(AtomicUsize::new(0)),
        bodies: Arc::new(Mutex::new(Vec::new())),
    };
    let handle = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let n = handle.requests.fetch_add(1, Ordering::SeqCst);
            let handle = handle.clone();
            thread::spawn(move || handle_conn(stream, n < opts.fail_first, opts, &handle));
        }
    });
    server
}

fn handle_conn(mut stream: TcpStream, fail: bool, opts: FlakyServerOptions, server: &FlakyServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let body = match read_request_body(&mut stream) {
        Some(b) => b,
        None => return,
    };
    server.bodies.lock().unwrap().push(body.clone());

    let (status_line, payload) = if fail {
        (format!("{} Flaky", opts.failure_status), b"unavailable".to_vec())
    } else {
        ("200 OK".to_string(), body)
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n",
        status_line,
        payload.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&payload);
}

/// Reads headers and a `Content-Length` body. Returns None on a broken request.
fn read_request_body(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);
    Some(body)
}
