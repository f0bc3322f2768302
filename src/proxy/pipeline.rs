//! One probe-and-rank run for a single transport

use crate::proxy::collector::Collector;
use crate::proxy::dispatcher::Dispatcher;
use crate::proxy::models::{Candidate, Protocol, ValidProxy};
use crate::proxy::prober::Prober;
use crate::proxy::ranker::rank;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Progress notifications for whoever drives the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted {
        protocol: Protocol,
        candidates: usize,
        concurrency: usize,
    },
    ProxyFound {
        protocol: Protocol,
        proxy: ValidProxy,
    },
    RunFinished {
        protocol: Protocol,
        probed: usize,
        valid: usize,
    },
}

/// Dispatcher, collector and ranker wired together. The transport is
/// whatever [`Prober`] is handed to [`Pipeline::run`].
pub struct Pipeline {
    dispatcher: Dispatcher,
    events: Option<UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(concurrency: usize) -> Self {
        Self {
            dispatcher: Dispatcher::new(concurrency),
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Probe all candidates and return the working ones, fastest first.
    ///
    /// Ranking starts only after every worker has exited and the collector
    /// has drained the last verdict.
    pub async fn run(&self, prober: Arc<dyn Prober>, candidates: Arc<Vec<Candidate>>) -> Vec<ValidProxy> {
        let protocol = prober.protocol();
        self.emit(PipelineEvent::RunStarted {
            protocol,
            candidates: candidates.iter().filter(|c| protocol.accepts(c)).count(),
            concurrency: self.dispatcher.concurrency(),
        });

        let (verdicts_tx, verdicts_rx) = mpsc::unbounded_channel();
        let collector = Collector::spawn(protocol, verdicts_rx, self.events.clone());

        let stats = self.dispatcher.dispatch(prober, candidates, verdicts_tx).await;
        let ranked = rank(collector.finish().await);

        self.emit(PipelineEvent::RunFinished {
            protocol,
            probed: stats.probed,
            valid: ranked.len(),
        });
        ranked
    }
}
