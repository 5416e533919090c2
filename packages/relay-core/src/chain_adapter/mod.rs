use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, Filter, Log, TransactionReceipt, H256};
use tokio::sync::mpsc;

use crate::{
    config::{ChainConfig, RelayerConfig},
    types::RelayTransaction,
    Error,
};

/// Opaque chain client capability: log subscription, signed submission and
/// confirmation tracking for one chain.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain_type(&self) -> &str;

    /// Account that signs every transaction submitted through this adapter.
    fn signer_address(&self) -> Address;

    /// Streams logs matching `filter` into `sink`. Returns `Ok` once the
    /// receiver is gone and `Err` when the underlying watcher fails.
    async fn watch_logs(&self, filter: Filter, sink: mpsc::Sender<Log>) -> Result<(), Error>;

    /// Signs and broadcasts `tx`, returning its hash once the node accepted it.
    async fn submit_transaction(&self, tx: RelayTransaction) -> Result<H256, Error>;

    /// Resolves once `tx_hash` has `confirmations` blocks on top of it, or
    /// with `None` if the transaction was dropped. Not bounded in time.
    async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, Error>;
}

#[async_trait]
pub trait ChainAdapterFactory: Send + Sync {
    async fn create_adapter(
        &self,
        config: &ChainConfig,
        signer_key: &str,
        settings: &RelayerConfig,
    ) -> Result<Arc<dyn ChainAdapter>, Error>;
}

pub struct DefaultChainAdapterFactory;

#[async_trait]
impl ChainAdapterFactory for DefaultChainAdapterFactory {
    async fn create_adapter(
        &self,
        config: &ChainConfig,
        signer_key: &str,
        settings: &RelayerConfig,
    ) -> Result<Arc<dyn ChainAdapter>, Error> {
        let adapter = EvmAdapter::connect(config, signer_key, settings.poll_interval()).await?;
        Ok(Arc::new(adapter))
    }
}

pub mod evm;

pub use evm::EvmAdapter;
