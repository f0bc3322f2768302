//! Proxy module for validating proxy candidates
//!
//! This module provides functionality for:
//! - Building a deduplicated candidate set from files and piped input
//! - Probing candidates as HTTP(S) forward proxies and SOCKS5 tunnels
//! - Running a bounded worker pool per transport and ranking the survivors by latency
//! - Grading the anonymity of working HTTP proxies
//! - Saving ranked results to a file

pub mod anonymity;
pub mod checker;
pub mod collector;
pub mod dispatcher;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prober;
pub mod ranker;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use anonymity::{discover_origin_ip, AnonymityClassifier};
pub use checker::{CheckerConfig, ProxyChecker};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use models::{AnonymityLevel, Candidate, ProbeFailure, ProbeOutcome, Protocol, ValidProxy};
pub use parser::{load_candidates, CandidateParser, CandidateSetBuilder};
pub use pipeline::{Pipeline, PipelineEvent};
pub use prober::{HttpProber, ProbeSettings, Prober, Socks5Prober};
pub use ranker::rank;
pub use sink::{FileSink, OutputFormat, Sink};
