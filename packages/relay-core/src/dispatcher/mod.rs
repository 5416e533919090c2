use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ethers::types::U256;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::{
    config::RelayerConfig,
    journal::{PassThroughJournal, RelayJournal},
    registry::ChainEndpointRegistry,
    report::Reporter,
    types::{RelayEvent, RelayOutcome, RelayStage, RelayStatus, RelayTransaction},
    Error,
};

const GWEI: u64 = 1_000_000_000;

/// Turns observed `Sent` events into confirmed `accept` transactions on the
/// destination chain. Each event is relayed once; failures are reported,
/// never retried.
pub struct RelayDispatcher {
    registry: Arc<ChainEndpointRegistry>,
    settings: RelayerConfig,
    reporter: Arc<dyn Reporter>,
    journal: Arc<dyn RelayJournal>,
    permits: Arc<Semaphore>,
}

impl RelayDispatcher {
    pub fn new(
        registry: Arc<ChainEndpointRegistry>,
        settings: RelayerConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_in_flight));
        Self {
            registry,
            settings,
            reporter,
            journal: Arc::new(PassThroughJournal),
            permits,
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn RelayJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn registry(&self) -> &Arc<ChainEndpointRegistry> {
        &self.registry
    }

    /// Relays `event` on its own task. At most `max_in_flight` relays run at
    /// once; the rest wait for a permit without blocking the caller. A panic
    /// inside the relay, the reporter or the journal is logged with the
    /// message id and does not reach the returned handle.
    pub fn dispatch(self: &Arc<Self>, event: RelayEvent) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(_permit) = dispatcher.permits.clone().acquire_owned().await else {
                return;
            };

            let attempt = AssertUnwindSafe(dispatcher.relay_and_report(&event))
                .catch_unwind()
                .await;
            if let Err(panic) = attempt {
                error!(
                    "Relay of message {} from chain {} panicked: {}",
                    event.message_id,
                    event.origin_chain_id,
                    panic_message(panic.as_ref())
                );
            }
        })
    }

    async fn relay_and_report(&self, event: &RelayEvent) {
        if !self.journal.admit(event) {
            debug!(
                "Journal declined message {} from chain {}",
                event.message_id, event.origin_chain_id
            );
            return;
        }

        let result = self.relay(event).await;
        self.reporter.report(event, &result);
        self.journal.record(event, &result);
        debug!("Message {} {:?}", event.message_id, RelayStage::Reported);
    }

    pub async fn relay(&self, event: &RelayEvent) -> Result<RelayOutcome, Error> {
        let mut stage = RelayStage::Received;
        info!(
            "Event received:\nMessage ID: {}\nChain ID: {}\nDestination: {:#x}\nFrom: {:#x}\nTo: {:#x}\nAmount: {}",
            event.message_id, event.origin_chain_id, event.destination, event.from, event.to, event.amount
        );

        let result = self.run(event, &mut stage).await;
        if result.is_err() {
            advance(&mut stage, RelayStage::Failed, event);
        }
        result
    }

    async fn run(&self, event: &RelayEvent, stage: &mut RelayStage) -> Result<RelayOutcome, Error> {
        let endpoint = self.registry.lookup(event.destination_chain_id)?;

        advance(stage, RelayStage::Encoding, event);
        let data = endpoint.contract().encode_accept(event)?;

        let tx = RelayTransaction {
            to: event.destination,
            data,
            gas_price: U256::from(self.settings.gas_price_gwei) * U256::from(GWEI),
            gas_limit: U256::from(self.settings.gas_limit),
        };
        let tx_hash = endpoint.submit(tx).await?;
        advance(stage, RelayStage::Submitted, event);
        debug!("Submitted {:#x} on {}", tx_hash, endpoint.name);

        let waited = self.settings.confirmation_timeout();
        let receipt = timeout(
            waited,
            endpoint
                .adapter()
                .wait_for_confirmation(tx_hash, self.settings.confirmations),
        )
        .await
        .map_err(|_| Error::ConfirmationTimeout { tx_hash, waited })??
        .ok_or_else(|| {
            Error::Submission(format!("Transaction {:#x} was dropped before inclusion", tx_hash))
        })?;
        advance(stage, RelayStage::Confirmed, event);

        let status = if receipt.status == Some(1u64.into()) {
            RelayStatus::Success
        } else {
            RelayStatus::Failed
        };

        Ok(RelayOutcome {
            destination_tx_hash: tx_hash,
            confirmed_at_depth: self.settings.confirmations,
            status,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn advance(stage: &mut RelayStage, next: RelayStage, event: &RelayEvent) {
    debug_assert!(stage.can_advance_to(next), "{:?} -> {:?}", stage, next);
    debug!("Message {}: {:?} -> {:?}", event.message_id, stage, next);
    *stage = next;
}
