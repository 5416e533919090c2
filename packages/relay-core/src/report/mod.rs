use std::collections::HashMap;

use ethers::types::H256;
use tracing::{error, info, warn};

use crate::{
    registry::ChainEndpointRegistry,
    types::{RelayEvent, RelayOutcome, RelayStatus},
    Error,
};

/// Receives the result of every relay attempt and every occurrence that could
/// not be decoded.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter: Send + Sync {
    fn report(&self, event: &RelayEvent, result: &Result<RelayOutcome, Error>);

    fn report_undecodable(&self, chain_id: u64, tx_hash: Option<H256>, error: &Error);
}

/// Writes relay results to the `tracing` subscriber.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter {
    chain_names: HashMap<u64, String>,
}

impl TracingReporter {
    pub fn new(chain_names: HashMap<u64, String>) -> Self {
        Self { chain_names }
    }

    pub fn from_registry(registry: &ChainEndpointRegistry) -> Self {
        let chain_names = registry
            .chain_ids()
            .into_iter()
            .filter_map(|id| registry.name_of(id).map(|name| (id, name.to_string())))
            .collect();
        Self { chain_names }
    }

    fn name(&self, chain_id: u64) -> String {
        self.chain_names
            .get(&chain_id)
            .cloned()
            .unwrap_or_else(|| format!("chain {}", chain_id))
    }
}

impl Reporter for TracingReporter {
    fn report(&self, event: &RelayEvent, result: &Result<RelayOutcome, Error>) {
        let source_tx = event
            .source_tx_hash
            .map(|hash| format!("{:#x}", hash))
            .unwrap_or_else(|| "unknown".to_string());

        match result {
            Ok(outcome) if outcome.status == RelayStatus::Success => {
                info!(
                    message_id = %event.message_id,
                    origin_chain_id = %event.origin_chain_id,
                    "Tokens have been moved\nFrom: {}\nTo: {}\nStatus: Success\nSource trx hash: {}\nDestination trx hash: {:#x}\nConfirmations: {}\nFrom: {:#x}\nTo: {:#x}",
                    self.name(event.observed_on),
                    self.name(event.destination_chain_id),
                    source_tx,
                    outcome.destination_tx_hash,
                    outcome.confirmed_at_depth,
                    event.from,
                    event.to,
                );
            }
            Ok(outcome) => {
                error!(
                    message_id = %event.message_id,
                    origin_chain_id = %event.origin_chain_id,
                    kind = "reverted",
                    "Accept transaction {:#x} on {} reverted (source trx hash: {})",
                    outcome.destination_tx_hash,
                    self.name(event.destination_chain_id),
                    source_tx,
                );
            }
            Err(e @ Error::ConfirmationTimeout { .. }) => {
                warn!(
                    message_id = %event.message_id,
                    origin_chain_id = %event.origin_chain_id,
                    kind = e.kind(),
                    "Relay outcome unknown on {}: {} (source trx hash: {})",
                    self.name(event.destination_chain_id),
                    e,
                    source_tx,
                );
            }
            Err(e) => {
                error!(
                    message_id = %event.message_id,
                    origin_chain_id = %event.origin_chain_id,
                    kind = e.kind(),
                    "Relay from {} to {} failed: {} (source trx hash: {})",
                    self.name(event.observed_on),
                    self.name(event.destination_chain_id),
                    e,
                    source_tx,
                );
            }
        }
    }

    fn report_undecodable(&self, chain_id: u64, tx_hash: Option<H256>, error: &Error) {
        error!(
            kind = error.kind(),
            "Skipping undecodable Sent log on {} (trx hash: {}): {}",
            self.name(chain_id),
            tx_hash
                .map(|hash| format!("{:#x}", hash))
                .unwrap_or_else(|| "unknown".to_string()),
            error,
        );
    }
}
