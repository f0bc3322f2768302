//! Proxy data models

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Transport a pipeline run validates candidates for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Socks5,
}

impl Protocol {
    /// Both transports, in the order they are probed
    pub const ALL: [Protocol; 2] = [Protocol::Http, Protocol::Socks5];

    /// Human readable name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP(s)",
            Protocol::Socks5 => "Socks5",
        }
    }

    /// Whether a candidate is eligible for this transport's run.
    ///
    /// Candidates without a scheme hint go to every run.
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        match &candidate.hint {
            None => true,
            Some(SchemeHint::Http) => *self == Protocol::Http,
            Some(SchemeHint::Socks5) => *self == Protocol::Socks5,
            Some(SchemeHint::Other(_)) => false,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Optional `scheme://` prefix found on an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeHint {
    /// `http://` or `https://`
    Http,
    /// `socks5://` or `socks5h://`
    Socks5,
    /// Any scheme neither run handles, e.g. `socks4://`
    Other(String),
}

/// A proxy address proposed for validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The trimmed input line, reported back unchanged
    pub raw: String,
    /// The `host:port` part the probers dial
    pub host_port: String,
    pub hint: Option<SchemeHint>,
}

impl Candidate {
    pub fn new(raw: String, host_port: String, hint: Option<SchemeHint>) -> Self {
        Self {
            raw,
            host_port,
            hint,
        }
    }

    /// Proxy URL for the given transport, ignoring any scheme hint
    pub fn proxy_url(&self, protocol: Protocol) -> String {
        match protocol {
            Protocol::Http => format!("http://{}", self.host_port),
            // remote DNS: the proxy resolves the target host
            Protocol::Socks5 => format!("socks5h://{}", self.host_port),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// How much a proxy reveals about the caller to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnonymityLevel {
    /// The caller's own address reached the target
    Transparent,
    /// The address is hidden but the proxy announces itself
    Anonymous,
    /// No trace of the caller or of the proxy
    Elite,
    #[default]
    Unknown,
}

impl fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnonymityLevel::Transparent => write!(f, "transparent"),
            AnonymityLevel::Anonymous => write!(f, "anonymous"),
            AnonymityLevel::Elite => write!(f, "elite"),
            AnonymityLevel::Unknown => write!(f, "unknown"),
        }
    }
}

/// A candidate that answered through the given transport with the expected status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidProxy {
    pub address: String,
    pub protocol: Protocol,
    #[serde(rename = "response_time_ms", serialize_with = "serialize_millis")]
    pub response_time: Duration,
    pub anonymity: AnonymityLevel,
    pub checked_at: DateTime<Utc>,
}

impl ValidProxy {
    pub fn new(
        address: String,
        protocol: Protocol,
        response_time: Duration,
        anonymity: AnonymityLevel,
    ) -> Self {
        Self {
            address,
            protocol,
            response_time,
            anonymity,
            checked_at: Utc::now(),
        }
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time.as_millis() as u64
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Why a probe did not produce a valid proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Could not build a client for the proxy URL
    Setup(String),
    /// Refused, reset, handshake rejected, DNS failure or a broken response
    Connect(String),
    /// The per-probe deadline passed
    Timeout,
    /// Reachable, but the target answered with another status
    Status(u16),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Setup(e) => write!(f, "setup failed: {}", e),
            ProbeFailure::Connect(e) => write!(f, "connection failed: {}", e),
            ProbeFailure::Timeout => write!(f, "timed out"),
            ProbeFailure::Status(code) => write!(f, "unexpected status {}", code),
        }
    }
}

/// Verdict of one probe of one candidate under one transport
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Valid(ValidProxy),
    Invalid(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ProbeOutcome::Valid(_))
    }

    /// The record worth keeping, if any
    pub fn into_valid(self) -> Option<ValidProxy> {
        match self {
            ProbeOutcome::Valid(proxy) => Some(proxy),
            ProbeOutcome::Invalid(_) => None,
        }
    }
}
