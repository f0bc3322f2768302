//! Errors that stop a run before any probing starts

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("invalid target URL {url:?}: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("invalid expected HTTP status code {0}")]
    InvalidStatusCode(u16),

    #[error("no proxy candidates provided (use --path or pipe them on stdin)")]
    NoCandidates,

    #[error("failed to read candidates from {path:?}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
