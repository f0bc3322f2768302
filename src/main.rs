use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, warn};
use proxy_hunter::{
    anonymity::DEFAULT_IP_CHECK_URL,
    checker::{DEFAULT_CONCURRENCY, DEFAULT_EXPECTED_STATUS, DEFAULT_TEST_URL, DEFAULT_TIMEOUT_SECS},
    discover_origin_ip, load_candidates, CheckerConfig, FileSink, OutputFormat, PipelineEvent,
    Protocol, ProxyChecker, Sink,
};
use std::io::{self, IsTerminal};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Checks for valid proxies and writes the valid ones to a file
#[derive(Parser)]
#[command(name = "proxy-hunter")]
#[command(about = "Checks for valid HTTP(s) and Socks5 proxies and writes the valid ones to a file")]
struct Cli {
    /// Number of concurrent checks per protocol
    #[arg(short = 't', long, default_value_t = DEFAULT_CONCURRENCY)]
    threads: usize,

    /// Expected HTTP response code
    #[arg(short = 'r', long, default_value_t = DEFAULT_EXPECTED_STATUS)]
    response: u16,

    /// File with one proxy per line (optional when proxies are piped on stdin)
    #[arg(short = 'p', long)]
    path: Option<PathBuf>,

    /// URL to check proxies against
    #[arg(short = 'd', long, default_value = DEFAULT_TEST_URL)]
    domain: String,

    /// Output file
    #[arg(short = 'o', long, default_value = "out.txt")]
    output: PathBuf,

    /// Timeout in seconds
    #[arg(short = 'T', long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Output format (plain, json)
    #[arg(short = 'f', long, default_value = "plain")]
    format: String,

    /// Protocols to check (http, socks5); repeat to check several
    #[arg(long = "protocol")]
    protocols: Vec<String>,

    /// Our public IP address, used to detect transparent proxies
    #[arg(long)]
    origin_ip: Option<IpAddr>,

    /// Service used to discover our public IP address
    #[arg(long, default_value = DEFAULT_IP_CHECK_URL)]
    ip_check_url: String,

    /// Do not grade the anonymity of HTTP proxies
    #[arg(long)]
    no_anonymity: bool,

    /// Log every failed probe
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let format: OutputFormat = cli.format.parse()?;
    let protocols = parse_protocols(&cli.protocols)?;
    let timeout = Duration::from_secs(cli.timeout);

    let mut config = CheckerConfig::new()
        .with_concurrency(cli.threads)
        .with_timeout(timeout)
        .with_test_url(cli.domain.clone())
        .with_expected_status(cli.response)
        .with_anonymity(!cli.no_anonymity)
        .with_origin_ip(cli.origin_ip);
    config.validate()?;

    let stdin = io::stdin();
    let piped = (!stdin.is_terminal()).then(|| stdin.lock());
    let candidates = Arc::new(load_candidates(piped, cli.path.as_deref())?);
    info!("Loaded {} unique proxy candidates", candidates.len());

    if config.classify_anonymity && config.origin_ip.is_none() && protocols.contains(&Protocol::Http) {
        match discover_origin_ip(&cli.ip_check_url, timeout).await {
            Ok(ip) => {
                info!("Our public IP is {}", ip);
                config = config.with_origin_ip(Some(ip));
            }
            Err(e) => warn!("Could not discover our public IP, anonymity will be unknown: {}", e),
        }
    }

    let mut sink = FileSink::create(&cli.output, format)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let reporter = tokio::spawn(report_events(events_rx));
    let checker = ProxyChecker::with_config(config)?.with_events(events_tx);

    let mut total = 0;
    for protocol in protocols {
        let found = checker.check(protocol, Arc::clone(&candidates)).await;
        if found.is_empty() {
            warn!("No valid {} proxies found.", protocol.label());
            continue;
        }
        sink.persist(protocol, &found)?;
        total += found.len();
    }

    drop(checker);
    reporter.await?;

    info!("Saved {} valid proxies to {:?}", total, sink.path());
    Ok(())
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "info,proxy_hunter=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Turn pipeline progress into log lines
async fn report_events(mut events: mpsc::UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::RunStarted {
                protocol,
                candidates,
                concurrency,
            } => info!(
                "{} hunt began: {} candidates, {} workers",
                protocol.label(),
                candidates,
                concurrency
            ),
            PipelineEvent::ProxyFound { protocol, proxy } => info!(
                "[{}] {} ({}ms, {})",
                protocol,
                proxy.address,
                proxy.response_time_ms(),
                proxy.anonymity
            ),
            PipelineEvent::RunFinished {
                protocol,
                probed,
                valid,
            } => info!(
                "Total {} proxies found: {} of {} probed",
                protocol.label(),
                valid,
                probed
            ),
        }
    }
}

fn parse_protocols(values: &[String]) -> Result<Vec<Protocol>> {
    if values.is_empty() {
        return Ok(Protocol::ALL.to_vec());
    }

    let mut protocols = Vec::new();
    for value in values {
        let protocol = parse_protocol(value)?;
        if !protocols.contains(&protocol) {
            protocols.push(protocol);
        }
    }
    Ok(protocols)
}

fn parse_protocol(s: &str) -> Result<Protocol> {
    match s.to_lowercase().as_str() {
        "http" | "https" => Ok(Protocol::Http),
        "socks5" | "socks" => Ok(Protocol::Socks5),
        _ => Err(anyhow!("Invalid protocol: {}. Use: http, socks5", s)),
    }
}
