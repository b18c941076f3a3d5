//! `rebound send <url>` – one request through curl with retries.

use anyhow::{Context, Result};
use clap::Args;
use rebound_core::config::ReboundConfig;
use rebound_core::http::{parse_header_line, Method, Request};
use rebound_core::retry::{duration_from_secs, RetryTransport, TracingLogger};
use rebound_core::transport::CurlTransport;
use rebound_core::CancellationToken;
use std::io::Write;

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Target URL.
    pub url: String,

    /// Request method (case-insensitive for the standard verbs).
    #[arg(short = 'X', long = "method", default_value = "GET", value_parser = parse_method)]
    pub method: Method,

    /// Extra header as "Name: value" (repeatable).
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body.
    #[arg(short = 'd', long = "data")]
    pub data: Option<String>,

    /// Total retry budget in seconds (overrides config).
    #[arg(long, value_name = "SECS")]
    pub backoff_timeout: Option<f64>,

    /// Per-attempt timeout in seconds (overrides config).
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<f64>,

    /// Attach request dumps to the final error.
    #[arg(long)]
    pub log_request: bool,

    /// Attach response dumps to the final error.
    #[arg(long)]
    pub log_response: bool,
}

/// Parses `-X`. Standard verbs are uppercased; anything else must be a
/// valid method token and is sent as given.
fn parse_method(raw: &str) -> Result<Method, String> {
    let upper = raw.trim().to_ascii_uppercase();
    let standard = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if let Some(method) = standard.into_iter().find(|m| m.as_str() == upper) {
        return Ok(method);
    }
    Method::from_bytes(raw.trim().as_bytes()).map_err(|e| format!("{}: {:?}", e, raw))
}

/// Builds the request described by the arguments.
pub(crate) fn build_request(args: &SendArgs) -> Result<Request> {
    let mut req = Request::new(args.method.clone(), &args.url)
        .with_context(|| format!("invalid URL: {}", args.url))?;
    for raw in &args.headers {
        let Some((name, value)) = parse_header_line(raw) else {
            anyhow::bail!("invalid header {:?}, expected \"Name: value\"", raw);
        };
        req.headers_mut().append(name, value);
    }
    if let Some(data) = &args.data {
        req = req.with_body(data.clone());
    }
    Ok(req)
}

pub async fn run_send(cfg: &ReboundConfig, args: SendArgs) -> Result<()> {
    let mut options = cfg.retry.to_options().context("invalid [retry] config")?;
    if let Some(secs) = args.backoff_timeout {
        options.backoff.max_elapsed_time = duration_from_secs("--backoff-timeout", secs)?;
    }
    if let Some(secs) = args.request_timeout {
        options.request_timeout = Some(duration_from_secs("--request-timeout", secs)?);
    }
    options.log_request |= args.log_request;
    options.log_response |= args.log_response;

    let transport = CurlTransport::new(cfg.transport.to_curl_options());
    let retry = RetryTransport::builder(transport)
        .options(options)
        .logger(TracingLogger)
        .build()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling retries");
            on_signal.cancel();
        }
    });

    let req = build_request(&args)?;
    let result = retry.execute(req, &cancel).await;
    let res = match result {
        Ok(res) => res,
        Err(err) => {
            if let Some(diagnostics) = err.diagnostics().filter(|d| !d.is_empty()) {
                for (key, value) in diagnostics.iter() {
                    eprintln!("--- {} ---\n{}", key, value);
                }
            }
            return Err(err).context(format!("{} {}", args.method, args.url));
        }
    };

    let status = res.status();
    eprintln!("HTTP {}", status);
    for (name, value) in res.headers() {
        eprintln!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    let body = res.into_body().into_bytes().context("read response body")?;
    std::io::stdout().write_all(&body)?;

    if !(status.is_success() || status.is_redirection()) {
        anyhow::bail!("server answered HTTP {}", status);
    }
    Ok(())
}
