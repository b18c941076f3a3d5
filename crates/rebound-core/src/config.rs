use crate::backoff::{BackoffConfig, DEFAULT_RANDOMIZATION_FACTOR};
use crate::retry::{duration_from_secs, ConfigError, RetryOptions};
use crate::transport::CurlOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total retry budget in seconds.
    pub backoff_timeout_secs: f64,
    /// Cap on the nominal backoff interval in milliseconds.
    pub max_interval_ms: u64,
    /// Jitter factor in [0, 1]; waits are stretched by up to this fraction.
    pub randomization_factor: f64,
    /// Per-attempt timeout in seconds, applied when a request has no deadline.
    pub request_timeout_secs: Option<f64>,
    /// Attach request dumps to retry diagnostics.
    pub log_request: bool,
    /// Attach response dumps to retry diagnostics.
    pub log_response: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_timeout_secs: 60.0,
            max_interval_ms: 5_000,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            request_timeout_secs: None,
            log_request: false,
            log_response: false,
        }
    }
}

impl RetryConfig {
    /// Converts to validated runtime options.
    pub fn to_options(&self) -> Result<RetryOptions, ConfigError> {
        let options = RetryOptions {
            backoff: BackoffConfig {
                max_elapsed_time: duration_from_secs("backoff_timeout_secs", self.backoff_timeout_secs)?,
                max_interval: Duration::from_millis(self.max_interval_ms),
                randomization_factor: self.randomization_factor,
            },
            request_timeout: self
                .request_timeout_secs
                .map(|secs| duration_from_secs("request_timeout_secs", secs))
                .transpose()?,
            log_request: self.log_request,
            log_response: self.log_response,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Transport parameters (`[transport]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_redirections: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            follow_redirects: true,
            max_redirections: 10,
        }
    }
}

impl TransportConfig {
    pub fn to_curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            follow_redirects: self.follow_redirects,
            max_redirections: self.max_redirections,
            ..CurlOptions::default()
        }
    }
}

/// Global configuration loaded from `~/.config/rebound/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReboundConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rebound")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReboundConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReboundConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ReboundConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ReboundConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = ReboundConfig::default();
        assert!((cfg.retry.backoff_timeout_secs - 60.0).abs() < 1e-9);
        assert_eq!(cfg.retry.max_interval_ms, 5_000);
        assert!(cfg.retry.request_timeout_secs.is_none());
        assert!(cfg.transport.follow_redirects);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ReboundConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReboundConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.retry.max_interval_ms, cfg.retry.max_interval_ms);
        assert_eq!(parsed.transport.max_redirections, cfg.transport.max_redirections);
    }

    #[test]
    fn config_toml_partial_tables_use_defaults() {
        let toml = r#"
            [retry]
            backoff_timeout_secs = 10
            request_timeout_secs = 2.5
            log_response = true
        "#;
        let cfg: ReboundConfig = toml::from_str(toml).unwrap();
        assert!((cfg.retry.backoff_timeout_secs - 10.0).abs() < 1e-9);
        assert_eq!(cfg.retry.max_interval_ms, 5_000);
        assert!(cfg.retry.log_response);
        assert!(!cfg.retry.log_request);
        assert_eq!(cfg.transport.connect_timeout_secs, 15);

        let opts = cfg.retry.to_options().unwrap();
        assert_eq!(opts.backoff.max_elapsed_time, Duration::from_secs(10));
        assert_eq!(opts.request_timeout, Some(Duration::from_millis(2500)));
        assert!(opts.log_response);
    }

    #[test]
    fn invalid_retry_values_are_rejected() {
        let cfg = RetryConfig {
            randomization_factor: 1.2,
            ..RetryConfig::default()
        };
        assert_eq!(
            cfg.to_options().unwrap_err(),
            ConfigError::RandomizationFactor(1.2)
        );

        let cfg = RetryConfig {
            backoff_timeout_secs: -3.0,
            ..RetryConfig::default()
        };
        assert!(matches!(
            cfg.to_options().unwrap_err(),
            ConfigError::InvalidSeconds { field: "backoff_timeout_secs", .. }
        ));
    }

    #[test]
    fn transport_config_maps_to_curl_options() {
        let cfg = TransportConfig {
            connect_timeout_secs: 3,
            follow_redirects: false,
            max_redirections: 2,
        };
        let opts = cfg.to_curl_options();
        assert_eq!(opts.connect_timeout, Duration::from_secs(3));
        assert!(!opts.follow_redirects);
        assert_eq!(opts.max_redirections, 2);
    }

    #[test]
    fn load_from_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[transport]\nmax_redirections = 3").unwrap();
        let cfg = load_from(f.path()).unwrap();
        assert_eq!(cfg.transport.max_redirections, 3);
        assert_eq!(cfg.retry.max_interval_ms, 5_000);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[retry]\nmax_interval_ms = \"soon\"").unwrap();
        let err = load_from(f.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("parse config"));
    }
}
