//! Single consumer gathering the verdicts of one run

use crate::proxy::models::{Protocol, ValidProxy};
use crate::proxy::pipeline::PipelineEvent;
use log::error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Owns the result set of a run while workers are still probing.
///
/// Only this task writes to the result set; it finishes once every
/// sender handed to the workers has been dropped.
pub struct Collector {
    handle: JoinHandle<Vec<ValidProxy>>,
}

impl Collector {
    pub fn spawn(
        protocol: Protocol,
        mut verdicts: UnboundedReceiver<ValidProxy>,
        events: Option<UnboundedSender<PipelineEvent>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut found = Vec::new();
            while let Some(proxy) = verdicts.recv().await {
                if let Some(events) = &events {
                    let _ = events.send(PipelineEvent::ProxyFound {
                        protocol,
                        proxy: proxy.clone(),
                    });
                }
                found.push(proxy);
            }
            found
        });

        Self { handle }
    }

    /// Wait for the channel to drain and hand over the result set in
    /// arrival order
    pub async fn finish(self) -> Vec<ValidProxy> {
        match self.handle.await {
            Ok(found) => found,
            Err(e) => {
                error!("Result collector stopped unexpectedly: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::AnonymityLevel;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_collects_in_arrival_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let collector = Collector::spawn(Protocol::Socks5, rx, Some(events_tx));

        for (address, millis) in [("b", 20), ("a", 10)] {
            tx.send(ValidProxy::new(
                address.to_string(),
                Protocol::Socks5,
                Duration::from_millis(millis),
                AnonymityLevel::Unknown,
            ))
            .unwrap();
        }
        drop(tx);

        let found = collector.finish().await;
        let addresses: Vec<_> = found.iter().map(|p| p.address.as_str()).collect();
        assert_eq!(addresses, vec!["b", "a"]);

        let mut announced = 0;
        while let Some(event) = events_rx.recv().await {
            assert!(matches!(event, PipelineEvent::ProxyFound { protocol: Protocol::Socks5, .. }));
            announced += 1;
        }
        assert_eq!(announced, 2);
    }

    #[tokio::test]
    async fn test_finishes_empty_when_nothing_sent() {
        let (tx, rx) = mpsc::unbounded_channel::<ValidProxy>();
        let collector = Collector::spawn(Protocol::Http, rx, None);
        drop(tx);
        assert!(collector.finish().await.is_empty());
    }
}
