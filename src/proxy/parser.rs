//! Candidate parsing and candidate set building

use crate::error::ConfigError;
use crate::proxy::models::{Candidate, SchemeHint};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::BufRead;
use std::path::Path;

/// Matches an optional `scheme://` prefix in front of the address
static SCHEME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*)://(.+)$").expect("Invalid scheme regex")
});

/// Parser for single candidate lines
pub struct CandidateParser;

impl CandidateParser {
    /// Parse a single candidate line
    ///
    /// Supports formats:
    /// - HOST:PORT
    /// - scheme://HOST:PORT
    ///
    /// Blank lines and `#` comments yield `None`. Nothing beyond that is
    /// validated: an unusable address simply fails its probes.
    pub fn parse_line(line: &str) -> Option<Candidate> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        match SCHEME_REGEX.captures(line) {
            Some(caps) => {
                let scheme = caps[1].to_lowercase();
                let host_port = caps[2].trim_end_matches('/').to_string();
                if host_port.is_empty() {
                    return None;
                }
                let hint = match scheme.as_str() {
                    "http" | "https" => SchemeHint::Http,
                    "socks5" | "socks5h" => SchemeHint::Socks5,
                    _ => SchemeHint::Other(scheme),
                };
                Some(Candidate::new(line.to_string(), host_port, Some(hint)))
            }
            None => Some(Candidate::new(line.to_string(), line.to_string(), None)),
        }
    }
}

/// Merges candidate lines from several sources, keeping the first
/// occurrence of every distinct line.
#[derive(Debug, Default)]
pub struct CandidateSetBuilder {
    seen: HashSet<String>,
    candidates: Vec<Candidate>,
}

impl CandidateSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one raw input line
    pub fn push_line(&mut self, line: &str) {
        if let Some(candidate) = CandidateParser::parse_line(line) {
            if self.seen.insert(candidate.raw.clone()) {
                self.candidates.push(candidate);
            } else {
                debug!("Skipping duplicate candidate {}", candidate.raw);
            }
        }
    }

    /// Add every line of a string
    pub fn extend_from_str(&mut self, content: &str) {
        for line in content.lines() {
            self.push_line(line);
        }
    }

    /// Add every line of a reader. Lines that are not UTF-8 are skipped;
    /// an I/O error ends the read.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) {
        for line in reader.split(b'\n') {
            match line {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(line) => self.push_line(&line),
                    Err(e) => debug!("Skipping candidate line that is not UTF-8: {:?}", e.as_bytes()),
                },
                Err(e) => {
                    warn!("Stopped reading candidates: {}", e);
                    break;
                }
            }
        }
    }

    /// Add every line of a file
    pub fn extend_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_str(&content);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Finish the set; an empty set cannot be probed
    pub fn build(self) -> Result<Vec<Candidate>, ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        Ok(self.candidates)
    }
}

/// Build the candidate set from piped input and an optional file.
///
/// Piped lines come first. A file that cannot be read is only fatal when
/// no candidate was gathered at all.
pub fn load_candidates<R: BufRead>(
    stdin: Option<R>,
    path: Option<&Path>,
) -> Result<Vec<Candidate>, ConfigError> {
    let mut builder = CandidateSetBuilder::new();

    if let Some(reader) = stdin {
        builder.extend_from_reader(reader);
        debug!("Read {} candidates from stdin", builder.len());
    }

    if let Some(path) = path {
        if let Err(e) = builder.extend_from_file(path) {
            if builder.is_empty() {
                return Err(e);
            }
            warn!("{}, continuing with piped candidates", e);
        }
    }

    builder.build()
}
