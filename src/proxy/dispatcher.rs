//! Fixed-size worker pool draining one preloaded work queue

use crate::proxy::models::{Candidate, ProbeOutcome, ValidProxy};
use crate::proxy::prober::Prober;
use futures::FutureExt;
use log::{debug, error, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, UnboundedSender};
use tokio::sync::Mutex;

/// Counters of a finished dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Candidates a worker picked up
    pub probed: usize,
    /// Valid verdicts handed to the collector
    pub valid: usize,
    /// Probes that panicked; their worker carried on with the queue
    pub panicked: usize,
    /// Workers that died before the queue ran dry
    pub crashed_workers: usize,
}

/// Work queue shared by the workers, holding indices into the candidate list
type WorkQueue = Arc<Mutex<Receiver<usize>>>;

/// Runs exactly `concurrency` workers per dispatch, so never more than
/// `concurrency` probes are in flight.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every candidate the prober's transport accepts and send the
    /// valid verdicts to `verdicts`.
    ///
    /// Returns only after every worker has exited. Each worker owns a clone
    /// of `verdicts`, so once this returns the collector side sees the
    /// channel close after the last verdict.
    pub async fn dispatch(
        &self,
        prober: Arc<dyn Prober>,
        candidates: Arc<Vec<Candidate>>,
        verdicts: UnboundedSender<ValidProxy>,
    ) -> DispatchStats {
        let protocol = prober.protocol();
        let eligible: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| {
                let accepted = protocol.accepts(candidate);
                if !accepted {
                    debug!("{} skipped for {}: scheme hint excludes it", candidate, protocol.label());
                }
                accepted
            })
            .map(|(index, _)| index)
            .collect();

        // Enqueue everything up front, then close the queue.
        let (queue_tx, queue_rx) = mpsc::channel(eligible.len().max(1));
        for index in eligible {
            if queue_tx.send(index).await.is_err() {
                break;
            }
        }
        drop(queue_tx);
        let queue: WorkQueue = Arc::new(Mutex::new(queue_rx));

        // Every handle exists before its worker runs and resolves exactly
        // once however the worker ends, panics included.
        let workers: Vec<_> = (0..self.concurrency)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&queue),
                    Arc::clone(&candidates),
                    Arc::clone(&prober),
                    verdicts.clone(),
                ))
            })
            .collect();
        drop(verdicts);

        let mut stats = DispatchStats::default();
        for (id, joined) in futures::future::join_all(workers).await.into_iter().enumerate() {
            match joined {
                Ok(worker) => {
                    stats.probed += worker.probed;
                    stats.valid += worker.valid;
                    stats.panicked += worker.panicked;
                }
                Err(e) => {
                    error!("{} worker {} crashed: {}", protocol.label(), id, e);
                    stats.crashed_workers += 1;
                }
            }
        }
        stats
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    probed: usize,
    valid: usize,
    panicked: usize,
}

async fn run_worker(
    id: usize,
    queue: WorkQueue,
    candidates: Arc<Vec<Candidate>>,
    prober: Arc<dyn Prober>,
    verdicts: UnboundedSender<ValidProxy>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(index) = next else {
            break;
        };
        let candidate = &candidates[index];
        stats.probed += 1;

        let outcome = AssertUnwindSafe(prober.probe(candidate)).catch_unwind().await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    "[worker {}] probing {} via {} panicked",
                    id,
                    candidate,
                    prober.protocol().label()
                );
                stats.panicked += 1;
                continue;
            }
        };

        match outcome {
            ProbeOutcome::Valid(proxy) => {
                stats.valid += 1;
                if verdicts.send(proxy).is_err() {
                    warn!("Result collector gone, dropping verdict for {}", candidate);
                }
            }
            ProbeOutcome::Invalid(failure) => {
                debug!(
                    "[worker {}] {} via {}: {}",
                    id,
                    candidate,
                    prober.protocol().label(),
                    failure
                );
            }
        }
    }

    stats
}
