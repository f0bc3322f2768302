//! Anonymity classification of working HTTP proxies

use crate::proxy::models::AnonymityLevel;
use crate::Result;
use anyhow::anyhow;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Default service echoing the caller's address
pub const DEFAULT_IP_CHECK_URL: &str = "https://httpbin.org/ip";

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("Invalid IPv4 regex")
});

/// Header names a proxy adds when it announces itself, as echoed by judge
/// pages either as JSON keys (`"Via": ...`) or CGI variables (`HTTP_VIA = ...`)
static PROXY_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:http_)?(?:via|x[-_]forwarded[-_]for|forwarded|proxy[-_]connection|x[-_]proxy[-_]id|x[-_]real[-_]ip)"?\s*[:=]"#,
    )
    .expect("Invalid proxy header regex")
});

const PROXY_RESPONSE_HEADERS: &[&str] = &[
    "via",
    "x-forwarded-for",
    "forwarded",
    "proxy-connection",
    "x-proxy-id",
];

/// Classifies proxies by comparing what the target saw with the caller's
/// real address
#[derive(Debug, Clone, Default)]
pub struct AnonymityClassifier {
    origin_ip: Option<IpAddr>,
}

impl AnonymityClassifier {
    pub fn new(origin_ip: Option<IpAddr>) -> Self {
        Self { origin_ip }
    }

    /// Classify from the target's response headers and echoed body.
    ///
    /// Without a known origin address nothing can be concluded.
    pub fn classify(&self, headers: &HeaderMap, body: &str) -> AnonymityLevel {
        let Some(origin) = self.origin_ip else {
            return AnonymityLevel::Unknown;
        };

        if leaks_origin(body, origin) {
            AnonymityLevel::Transparent
        } else if announces_proxy(headers, body) {
            AnonymityLevel::Anonymous
        } else {
            AnonymityLevel::Elite
        }
    }
}

/// Compare whole addresses only, so a prefix of another address never counts
fn leaks_origin(body: &str, origin: IpAddr) -> bool {
    match origin {
        IpAddr::V4(v4) => IPV4_REGEX
            .find_iter(body)
            .filter_map(|m| m.as_str().parse::<Ipv4Addr>().ok())
            .any(|ip| ip == v4),
        IpAddr::V6(v6) => body
            .split(|c: char| !(c.is_ascii_hexdigit() || c == ':' || c == '.'))
            .filter_map(|token| token.parse::<Ipv6Addr>().ok())
            .any(|ip| ip == v6),
    }
}

fn announces_proxy(headers: &HeaderMap, body: &str) -> bool {
    PROXY_RESPONSE_HEADERS
        .iter()
        .any(|name| headers.contains_key(*name))
        || PROXY_HEADER_REGEX.is_match(body)
}

/// Extract the first address found in an IP echo response
pub fn extract_ip(body: &str) -> Option<IpAddr> {
    if let Some(m) = IPV4_REGEX.find(body) {
        if let Ok(ip) = m.as_str().parse() {
            return Some(ip);
        }
    }
    body.trim().parse().ok()
}

/// Ask an IP echo service, without any proxy, which address we come from
pub async fn discover_origin_ip(url: &str, timeout: Duration) -> Result<IpAddr> {
    let client = Client::builder().no_proxy().timeout(timeout).build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    debug!("IP check response from {}: {}", url, body.trim());

    extract_ip(&body).ok_or_else(|| anyhow!("no IP address in response from {}", url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::test_support::spawn_http_server;
    use reqwest::header::HeaderValue;

    fn origin() -> Option<IpAddr> {
        Some("203.0.113.7".parse().unwrap())
    }

    #[test]
    fn test_unknown_without_origin() {
        let classifier = AnonymityClassifier::new(None);
        let body = r#"{"origin": "203.0.113.7"}"#;
        assert_eq!(
            classifier.classify(&HeaderMap::new(), body),
            AnonymityLevel::Unknown
        );
    }

    #[test]
    fn test_transparent_when_origin_echoed() {
        let classifier = AnonymityClassifier::new(origin());
        let body = r#"{"origin": "203.0.113.7, 198.51.100.20"}"#;
        assert_eq!(
            classifier.classify(&HeaderMap::new(), body),
            AnonymityLevel::Transparent
        );
    }

    #[test]
    fn test_similar_address_is_not_a_leak() {
        let classifier = AnonymityClassifier::new(origin());
        let body = r#"{"origin": "203.0.113.70"}"#;
        assert_eq!(
            classifier.classify(&HeaderMap::new(), body),
            AnonymityLevel::Elite
        );
    }

    #[test]
    fn test_ipv6_origin_matches_whole_address() {
        let classifier = AnonymityClassifier::new(Some("2001:db8::1".parse().unwrap()));
        assert_eq!(
            classifier.classify(&HeaderMap::new(), r#"{"origin": "2001:db8::10"}"#),
            AnonymityLevel::Elite
        );
        assert_eq!(
            classifier.classify(&HeaderMap::new(), r#"{"origin": "2001:DB8:0::1, 198.51.100.20"}"#),
            AnonymityLevel::Transparent
        );
    }

    #[test]
    fn test_anonymous_when_proxy_headers_echoed() {
        let classifier = AnonymityClassifier::new(origin());
        let json = r#"{"headers": {"Via": "1.1 squid"}, "origin": "198.51.100.20"}"#;
        assert_eq!(
            classifier.classify(&HeaderMap::new(), json),
            AnonymityLevel::Anonymous
        );

        let azenv = "REMOTE_ADDR = 198.51.100.20\nHTTP_X_FORWARDED_FOR = unknown\n";
        assert_eq!(
            classifier.classify(&HeaderMap::new(), azenv),
            AnonymityLevel::Anonymous
        );
    }

    #[test]
    fn test_anonymous_when_response_has_via() {
        let classifier = AnonymityClassifier::new(origin());
        let mut headers = HeaderMap::new();
        headers.insert("via", HeaderValue::from_static("1.1 proxy"));
        assert_eq!(
            classifier.classify(&headers, r#"{"origin": "198.51.100.20"}"#),
            AnonymityLevel::Anonymous
        );
    }

    #[test]
    fn test_elite() {
        let classifier = AnonymityClassifier::new(origin());
        assert_eq!(
            classifier.classify(&HeaderMap::new(), r#"{"origin": "198.51.100.20"}"#),
            AnonymityLevel::Elite
        );
    }

    #[test]
    fn test_extract_ip() {
        assert_eq!(
            extract_ip(r#"{"origin": "203.0.113.7"}"#),
            Some("203.0.113.7".parse().unwrap())
        );
        assert_eq!(extract_ip("2001:db8::1\n"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(extract_ip("<html>nothing</html>"), None);
    }

    #[tokio::test]
    async fn test_discover_origin_ip() {
        let server = spawn_http_server(200, r#"{"origin": "203.0.113.7"}"#).await;
        let url = format!("http://{}/ip", server);
        let ip = discover_origin_ip(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_discover_origin_ip_error_status() {
        let server = spawn_http_server(503, "unavailable").await;
        let url = format!("http://{}/ip", server);
        assert!(discover_origin_ip(&url, Duration::from_secs(5)).await.is_err());
    }
}
