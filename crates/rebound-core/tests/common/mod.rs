#![allow(dead_code)]

pub mod flaky_server;

use async_trait::async_trait;
use rebound_core::http::{Body, Request, Response, StatusCode};
use rebound_core::retry::{Field, FieldList, Logger};
use rebound_core::transport::{Transport, TransportError};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What the scripted transport does for one attempt.
#[derive(Debug, Clone)]
pub enum Step {
    /// Fail with a connection error; the message carries the attempt number.
    Fail,
    /// Respond with this status and body.
    Status(u16, &'static str),
    /// Sleep, then respond with this status.
    Hang(Duration, u16),
}

/// Transport that plays back a script, then repeats the fallback step.
/// Records every body and deadline it sees.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    bodies: Mutex<Vec<Vec<u8>>>,
    deadlines: Mutex<Vec<Option<Instant>>>,
    pub dropped_bodies: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            deadlines: Mutex::new(Vec::new()),
            dropped_bodies: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(Vec::new(), step)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn deadlines(&self) -> Vec<Option<Instant>> {
        self.deadlines.lock().unwrap().clone()
    }

    pub fn dropped(&self) -> usize {
        self.dropped_bodies.load(Ordering::SeqCst)
    }

    fn response(&self, status: u16, body: &'static str) -> Response {
        let status = StatusCode::from_u16(status).expect("valid status in script");
        Response::new(status).with_body(Body::from_reader(TrackedBody {
            data: io::Cursor::new(body.as_bytes()),
            dropped: Arc::clone(&self.dropped_bodies),
        }))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(body) = request.take_body() {
            self.bodies.lock().unwrap().push(body.into_bytes().unwrap());
        }
        self.deadlines.lock().unwrap().push(request.deadline());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Fail => Err(TransportError::connection(format!("attempt {} refused", n))),
            Step::Status(status, body) => Ok(self.response(status, body)),
            Step::Hang(d, status) => {
                tokio::time::sleep(d).await;
                Ok(self.response(status, "late"))
            }
        }
    }
}

/// Response body that counts how many times it was dropped.
struct TrackedBody {
    data: io::Cursor<&'static [u8]>,
    dropped: Arc<AtomicUsize>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Logger that keeps every entry as `LEVEL message fields [METHOD URL]`.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn with_level(&self, level: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(level))
            .collect()
    }

    fn record(&self, level: &str, request: &Request, message: &str, fields: &[Field<'_>]) {
        self.entries.lock().unwrap().push(format!(
            "{} {} {} [{} {}]",
            level,
            message,
            FieldList(fields),
            request.method(),
            request.url()
        ));
    }
}

impl Logger for RecordingLogger {
    fn error(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        self.record("ERROR", request, message, fields);
    }

    fn warn(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        self.record("WARN", request, message, fields);
    }

    fn debug(&self, request: &Request, message: &str, fields: &[Field<'_>]) {
        self.record("DEBUG", request, message, fields);
    }
}
