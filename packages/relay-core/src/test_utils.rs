use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::abi::parse_abi;
use ethers::types::{Address, Filter, Log, TransactionReceipt, H256, U256, U64};
use tokio::sync::mpsc;

use crate::{
    chain_adapter::{ChainAdapter, ChainAdapterFactory},
    config::{ChainConfig, RelayerConfig},
    contract::{accept_tokens, BridgeContract, BRIDGE_ABI},
    types::{RelayEvent, RelayTransaction},
    Error,
};

pub const BRIDGE_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn chain_config(id: u64, counterpart: u64) -> ChainConfig {
    ChainConfig {
        id,
        name: format!("chain-{}", id),
        rpc_url: Some(format!("http://localhost/{}", id)),
        bridge_address: Some(BRIDGE_ADDRESS.to_string()),
        counterpart,
        abi: None,
    }
}

/// Mumbai -> Sepolia transfer of 1000 units.
pub fn sample_event() -> RelayEvent {
    RelayEvent {
        message_id: U256::from(1u64),
        origin_chain_id: U256::from(80001u64),
        destination: Address::from_low_u64_be(0xaaa),
        from: Address::from_low_u64_be(0xbbb),
        to: Address::from_low_u64_be(0xccc),
        amount: U256::from(1000u64),
        source_tx_hash: Some(H256::repeat_byte(0x11)),
        observed_on: 80001,
        destination_chain_id: 11155111,
    }
}

/// A `Sent` log as the bridge contract would emit it for `event`.
pub fn sent_log(contract: &BridgeContract, event: &RelayEvent) -> Log {
    let signature = parse_abi(BRIDGE_ABI)
        .unwrap()
        .event("Sent")
        .unwrap()
        .signature();

    Log {
        address: contract.address(),
        topics: vec![signature],
        data: ethers::abi::encode(&accept_tokens(event)).into(),
        transaction_hash: event.source_tx_hash,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum ConfirmBehaviour {
    #[default]
    Mined,
    Reverted,
    Dropped,
    Stall,
}

/// In-memory chain: records submissions, replays a fixed set of logs once
/// (after any queued watch failures), and confirms according to its
/// [`ConfirmBehaviour`].
#[derive(Default)]
pub struct FakeAdapter {
    pub submitted: Mutex<Vec<RelayTransaction>>,
    submit_failures: Mutex<VecDeque<String>>,
    watch_failures: Mutex<VecDeque<String>>,
    pub watch_calls: AtomicUsize,
    logs: Mutex<Option<Vec<Log>>>,
    confirm: ConfirmBehaviour,
    next_hash: AtomicU64,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeAdapter {
    pub fn with_confirm(confirm: ConfirmBehaviour) -> Self {
        Self {
            confirm,
            ..Default::default()
        }
    }

    pub fn with_logs(logs: Vec<Log>) -> Self {
        Self {
            logs: Mutex::new(Some(logs)),
            ..Default::default()
        }
    }

    pub fn fail_next_submit(&self, reason: &str) {
        self.submit_failures.lock().unwrap().push_back(reason.to_string());
    }

    /// The next `watch_logs` call fails before replaying anything.
    pub fn fail_next_watch(&self, reason: &str) {
        self.watch_failures.lock().unwrap().push_back(reason.to_string());
    }

    pub fn submissions(&self) -> Vec<RelayTransaction> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainAdapter for FakeAdapter {
    fn chain_type(&self) -> &str {
        "fake"
    }

    fn signer_address(&self) -> Address {
        addr(0x5e)
    }

    async fn watch_logs(&self, _filter: Filter, sink: mpsc::Sender<Log>) -> Result<(), Error> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.watch_failures.lock().unwrap().pop_front() {
            return Err(Error::Chain(reason));
        }

        let logs = self.logs.lock().unwrap().take().unwrap_or_default();
        for log in logs {
            if sink.send(log).await.is_err() {
                return Ok(());
            }
        }
        futures::future::pending::<()>().await;
        Ok(())
    }

    async fn submit_transaction(&self, tx: RelayTransaction) -> Result<H256, Error> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reason) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(Error::Submission(reason));
        }

        self.submitted.lock().unwrap().push(tx);
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(H256::from_low_u64_be(n))
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        _confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, Error> {
        let status = match self.confirm {
            ConfirmBehaviour::Mined => 1u64,
            ConfirmBehaviour::Reverted => 0u64,
            ConfirmBehaviour::Dropped => return Ok(None),
            ConfirmBehaviour::Stall => return futures::future::pending().await,
        };

        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(U64::from(status)),
            ..Default::default()
        }))
    }
}

/// Hands out pre-built fakes by chain id; unknown ids fail like an
/// unreachable node.
#[derive(Default)]
pub struct FakeFactory {
    pub adapters: HashMap<u64, Arc<FakeAdapter>>,
}

#[async_trait]
impl ChainAdapterFactory for FakeFactory {
    async fn create_adapter(
        &self,
        config: &ChainConfig,
        _signer_key: &str,
        _settings: &RelayerConfig,
    ) -> Result<Arc<dyn ChainAdapter>, Error> {
        let adapter = self
            .adapters
            .get(&config.id)
            .cloned()
            .ok_or_else(|| Error::Chain(format!("Failed to reach chain {}", config.id)))?;
        Ok(adapter)
    }
}
