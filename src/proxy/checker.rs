//! Proxy checker configuration and per-transport runs

use crate::error::ConfigError;
use crate::proxy::anonymity::AnonymityClassifier;
use crate::proxy::models::{Candidate, Protocol, ValidProxy};
use crate::proxy::pipeline::{Pipeline, PipelineEvent};
use crate::proxy::prober::{HttpProber, ProbeSettings, Prober, Socks5Prober};
use reqwest::{StatusCode, Url};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Default timeout for proxy checks in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks per transport
pub const DEFAULT_CONCURRENCY: usize = 40;

/// Default URL to test proxies against
pub const DEFAULT_TEST_URL: &str = "https://httpbin.org/ip";

/// Default status the test URL must answer with
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// Number of concurrent checks per transport
    pub concurrency: usize,
    /// URL to test proxies against
    pub test_url: String,
    /// Status code counted as success
    pub expected_status: u16,
    /// Grade anonymity of HTTP proxies
    pub classify_anonymity: bool,
    /// Our own public address, if known
    pub origin_ip: Option<IpAddr>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            classify_anonymity: true,
            origin_ip: None,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_anonymity(mut self, classify: bool) -> Self {
        self.classify_anonymity = classify;
        self
    }

    pub fn with_origin_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.origin_ip = ip;
        self
    }

    /// Check every field and derive the settings each probe uses
    pub fn validate(&self) -> Result<ProbeSettings, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let target_url = Url::parse(&self.test_url).map_err(|e| ConfigError::InvalidTargetUrl {
            url: self.test_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(target_url.scheme(), "http" | "https") || target_url.host_str().is_none() {
            return Err(ConfigError::InvalidTargetUrl {
                url: self.test_url.clone(),
                reason: "expected an http:// or https:// URL with a host".to_string(),
            });
        }

        let expected_status = StatusCode::from_u16(self.expected_status)
            .map_err(|_| ConfigError::InvalidStatusCode(self.expected_status))?;

        Ok(ProbeSettings {
            target_url,
            expected_status,
            timeout: self.timeout,
        })
    }
}

/// Runs the probe-and-rank pipeline once per transport
pub struct ProxyChecker {
    config: CheckerConfig,
    settings: ProbeSettings,
    events: Option<UnboundedSender<PipelineEvent>>,
}

impl ProxyChecker {
    /// Create a checker, rejecting an unusable configuration up front
    pub fn with_config(config: CheckerConfig) -> Result<Self, ConfigError> {
        let settings = config.validate()?;
        Ok(Self {
            config,
            settings,
            events: None,
        })
    }

    /// Report progress to an observer
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The prober for one transport
    pub fn prober(&self, protocol: Protocol) -> Arc<dyn Prober> {
        match protocol {
            Protocol::Http => {
                let prober = HttpProber::new(self.settings.clone());
                if self.config.classify_anonymity {
                    Arc::new(prober.with_classifier(AnonymityClassifier::new(self.config.origin_ip)))
                } else {
                    Arc::new(prober)
                }
            }
            Protocol::Socks5 => Arc::new(Socks5Prober::new(self.settings.clone())),
        }
    }

    /// Probe every eligible candidate under one transport; returns the
    /// working ones, fastest first
    pub async fn check(&self, protocol: Protocol, candidates: Arc<Vec<Candidate>>) -> Vec<ValidProxy> {
        let mut pipeline = Pipeline::new(self.config.concurrency);
        if let Some(events) = &self.events {
            pipeline = pipeline.with_events(events.clone());
        }
        pipeline.run(self.prober(protocol), candidates).await
    }
}
