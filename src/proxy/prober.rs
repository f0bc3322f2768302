//! Per-transport probers: one request to the target through one candidate

use crate::proxy::anonymity::AnonymityClassifier;
use crate::proxy::models::{AnonymityLevel, Candidate, ProbeFailure, ProbeOutcome, Protocol, ValidProxy};
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy, Response, StatusCode, Url};
use std::time::{Duration, Instant};

/// What every probe asks of the target
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub target_url: Url,
    pub expected_status: StatusCode,
    /// Deadline for the whole probe, handshake and body included
    pub timeout: Duration,
}

/// Validates a single candidate under one transport.
///
/// Implementations never fail: every problem becomes
/// [`ProbeOutcome::Invalid`], and a probe gives up on its own once
/// `timeout` has passed.
#[async_trait]
pub trait Prober: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn probe(&self, candidate: &Candidate) -> ProbeOutcome;
}

/// Create a reqwest client routed through the candidate
fn create_client(proxy_url: &str, timeout: Duration) -> reqwest::Result<Client> {
    let proxy = ReqwestProxy::all(proxy_url)?;

    Client::builder()
        .proxy(proxy)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}

fn failure_from(error: reqwest::Error) -> ProbeFailure {
    if error.is_timeout() {
        ProbeFailure::Timeout
    } else {
        ProbeFailure::Connect(error.to_string())
    }
}

/// Send the GET and check the status. The returned duration runs from just
/// before sending to the arrival of the response head.
async fn fetch(
    candidate: &Candidate,
    protocol: Protocol,
    settings: &ProbeSettings,
) -> Result<(Response, Duration), ProbeFailure> {
    let client = create_client(&candidate.proxy_url(protocol), settings.timeout)
        .map_err(|e| ProbeFailure::Setup(e.to_string()))?;

    let start = Instant::now();
    let response = client
        .get(settings.target_url.clone())
        .send()
        .await
        .map_err(failure_from)?;
    let elapsed = start.elapsed();

    if response.status() != settings.expected_status {
        return Err(ProbeFailure::Status(response.status().as_u16()));
    }

    Ok((response, elapsed))
}

/// Uses the candidate as a plain HTTP forward proxy (CONNECT for https targets)
pub struct HttpProber {
    settings: ProbeSettings,
    classifier: Option<AnonymityClassifier>,
}

impl HttpProber {
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            classifier: None,
        }
    }

    /// Read the target's echo to grade anonymity
    pub fn with_classifier(mut self, classifier: AnonymityClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }
}

#[async_trait]
impl Prober for HttpProber {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    async fn probe(&self, candidate: &Candidate) -> ProbeOutcome {
        let (response, elapsed) = match fetch(candidate, Protocol::Http, &self.settings).await {
            Ok(fetched) => fetched,
            Err(failure) => return ProbeOutcome::Invalid(failure),
        };

        let anonymity = match &self.classifier {
            Some(classifier) => {
                let headers = response.headers().clone();
                match response.text().await {
                    Ok(body) => classifier.classify(&headers, &body),
                    Err(_) => AnonymityLevel::Unknown,
                }
            }
            None => AnonymityLevel::Unknown,
        };

        ProbeOutcome::Valid(ValidProxy::new(
            candidate.raw.clone(),
            Protocol::Http,
            elapsed,
            anonymity,
        ))
    }
}

/// Tunnels through the candidate with a no-auth SOCKS5 handshake.
///
/// Anonymity is never graded: the tunnel gives no reliable echo.
pub struct Socks5Prober {
    settings: ProbeSettings,
}

impl Socks5Prober {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Prober for Socks5Prober {
    fn protocol(&self) -> Protocol {
        Protocol::Socks5
    }

    async fn probe(&self, candidate: &Candidate) -> ProbeOutcome {
        match fetch(candidate, Protocol::Socks5, &self.settings).await {
            Ok((_, elapsed)) => ProbeOutcome::Valid(ValidProxy::new(
                candidate.raw.clone(),
                Protocol::Socks5,
                elapsed,
                AnonymityLevel::Unknown,
            )),
            Err(failure) => ProbeOutcome::Invalid(failure),
        }
    }
}
