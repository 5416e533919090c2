use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    registry::ChainEndpointRegistry,
    report::Reporter,
    types::RelayEvent,
    Error,
};

const LOG_BUFFER: usize = 256;

/// Long-lived `Sent` subscription on one chain's bridge contract.
///
/// Runs until the process exits; there is no unsubscribe. When the log
/// watcher fails it is installed again after `resubscribe_delay`, and any
/// occurrence emitted during the gap is not seen.
pub struct EventSubscription;

impl EventSubscription {
    pub fn subscribe<F>(
        registry: &ChainEndpointRegistry,
        chain_id: u64,
        reporter: Arc<dyn Reporter>,
        resubscribe_delay: Duration,
        on_event: F,
    ) -> Result<JoinHandle<()>, Error>
    where
        F: Fn(RelayEvent) + Send + Sync + 'static,
    {
        let endpoint = registry.lookup(chain_id)?;
        let filter = endpoint.contract().sent_filter()?;

        Ok(tokio::spawn(async move {
            info!("Listening to {} ({})...", endpoint.name, endpoint.chain_id);

            loop {
                let (sink, mut logs) = mpsc::channel(LOG_BUFFER);
                let watcher = {
                    let endpoint = Arc::clone(&endpoint);
                    let filter = filter.clone();
                    tokio::spawn(async move { endpoint.adapter().watch_logs(filter, sink).await })
                };

                while let Some(log) = logs.recv().await {
                    if log.removed == Some(true) {
                        debug!(
                            "Ignoring removed log {:?} on chain {}",
                            log.transaction_hash, endpoint.chain_id
                        );
                        continue;
                    }

                    match endpoint
                        .contract()
                        .decode_sent(&log, endpoint.chain_id, endpoint.counterpart)
                    {
                        Ok(event) => on_event(event),
                        Err(e) => {
                            reporter.report_undecodable(endpoint.chain_id, log.transaction_hash, &e)
                        }
                    }
                }

                match watcher.await {
                    Ok(Ok(())) => warn!("Log watcher on {} stopped", endpoint.name),
                    Ok(Err(e)) => error!("Subscription on {} failed: {}", endpoint.name, e),
                    Err(e) => error!("Log watcher on {} panicked: {}", endpoint.name, e),
                }

                warn!(
                    "Resubscribing to {} in {:?}; events emitted meanwhile are lost",
                    endpoint.name, resubscribe_delay
                );
                tokio::time::sleep(resubscribe_delay).await;
            }
        }))
    }
}
