use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// A decoded `Sent` occurrence, together with the wiring that says where it
/// has to be relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub message_id: U256,
    pub origin_chain_id: U256,
    pub destination: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub source_tx_hash: Option<H256>,
    /// Chain whose bridge contract emitted the notification.
    pub observed_on: u64,
    /// Chain the `accept` call is submitted to.
    pub destination_chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayOutcome {
    pub destination_tx_hash: H256,
    pub confirmed_at_depth: usize,
    pub status: RelayStatus,
}

/// Transaction handed to a chain adapter for signing and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTransaction {
    pub to: Address,
    pub data: Bytes,
    pub gas_price: U256,
    pub gas_limit: U256,
}

/// Progress of a single relay. `Failed` absorbs; nothing is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Received,
    Encoding,
    Submitted,
    Confirmed,
    Reported,
    Failed,
}

impl RelayStage {
    pub fn can_advance_to(self, next: RelayStage) -> bool {
        use RelayStage::*;
        matches!(
            (self, next),
            (Received, Encoding)
                | (Encoding, Submitted)
                | (Submitted, Confirmed)
                | (Confirmed, Reported)
                | (Received | Encoding | Submitted, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RelayStage::Reported | RelayStage::Failed)
    }
}
