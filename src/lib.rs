//! Proxy Hunter - Proxy Validator
//!
//! Checks a list of proxy candidates as HTTP(S) and SOCKS5 proxies with a
//! bounded pool of concurrent probes, and ranks the working ones by
//! response time.

pub mod error;
pub mod proxy;

pub use error::ConfigError;
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
