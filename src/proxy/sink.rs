//! Persisting ranked results

use crate::proxy::models::{Protocol, ValidProxy};
use crate::Result;
use anyhow::{anyhow, Context};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Line format of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One address per line
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "txt" => Ok(OutputFormat::Plain),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Invalid output format: {}. Use: plain, json", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Destination for the ranked result set of each run
pub trait Sink {
    fn persist(&mut self, protocol: Protocol, proxies: &[ValidProxy]) -> Result<()>;
}

/// Writes every run into one file, in the order the runs finish
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create or truncate the output file
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("failed to open output file {:?}", path))?;

        Ok(Self {
            path,
            format,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, proxy: &ValidProxy) -> Result<()> {
        match self.format {
            OutputFormat::Plain => writeln!(self.writer, "{}", proxy.address)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, proxy)?;
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }
}

impl Sink for FileSink {
    fn persist(&mut self, protocol: Protocol, proxies: &[ValidProxy]) -> Result<()> {
        for proxy in proxies {
            self.write_line(proxy)?;
        }
        self.writer
            .flush()
            .with_context(|| format!("failed to write {} proxies to {:?}", protocol, self.path))?;
        Ok(())
    }
}
