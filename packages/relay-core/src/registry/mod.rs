use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ethers::types::{Address, H256};
use tokio::sync::Mutex;

use crate::{
    chain_adapter::ChainAdapter,
    config::ChainConfig,
    contract::BridgeContract,
    types::RelayTransaction,
    Error,
};

/// Everything needed to observe and submit on one chain.
pub struct ChainEndpoint {
    pub chain_id: u64,
    pub name: String,
    /// Destination for events observed on this chain.
    pub counterpart: u64,
    adapter: Arc<dyn ChainAdapter>,
    contract: BridgeContract,
    submit_lock: Mutex<()>,
}

impl ChainEndpoint {
    pub fn new(config: &ChainConfig, adapter: Arc<dyn ChainAdapter>) -> Result<Self, Error> {
        let address: Address = config.bridge_address()?.parse().map_err(|e| {
            Error::Config(format!("Invalid bridge contract address for chain {}: {}", config.id, e))
        })?;

        let contract = match &config.abi {
            Some(signatures) => BridgeContract::with_abi(address, signatures)?,
            None => BridgeContract::new(address)?,
        };

        Ok(Self {
            chain_id: config.id,
            name: config.name.clone(),
            counterpart: config.counterpart,
            adapter,
            contract,
            submit_lock: Mutex::new(()),
        })
    }

    pub fn adapter(&self) -> &dyn ChainAdapter {
        self.adapter.as_ref()
    }

    pub fn contract(&self) -> &BridgeContract {
        &self.contract
    }

    /// Submits through this endpoint's signer. Submissions are serialized so
    /// concurrent relays never race for the same account nonce.
    pub async fn submit(&self, tx: RelayTransaction) -> Result<H256, Error> {
        let _guard = self.submit_lock.lock().await;
        self.adapter.submit_transaction(tx).await
    }
}

impl fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEndpoint")
            .field("chain_id", &self.chain_id)
            .field("name", &self.name)
            .field("counterpart", &self.counterpart)
            .field("chain_type", &self.adapter.chain_type())
            .field("signer", &self.adapter.signer_address())
            .field("contract", &self.contract.address())
            .finish()
    }
}

/// Immutable chain id -> endpoint table, built once at startup.
#[derive(Debug, Default)]
pub struct ChainEndpointRegistry {
    endpoints: HashMap<u64, Arc<ChainEndpoint>>,
}

impl ChainEndpointRegistry {
    pub fn new(endpoints: impl IntoIterator<Item = ChainEndpoint>) -> Result<Self, Error> {
        let mut table = HashMap::new();
        for endpoint in endpoints {
            let chain_id = endpoint.chain_id;
            if table.insert(chain_id, Arc::new(endpoint)).is_some() {
                return Err(Error::Config(format!("Duplicate endpoint for chain {}", chain_id)));
            }
        }
        Ok(Self { endpoints: table })
    }

    pub fn lookup(&self, chain_id: u64) -> Result<Arc<ChainEndpoint>, Error> {
        self.endpoints
            .get(&chain_id)
            .cloned()
            .ok_or(Error::UnknownChain(chain_id))
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.endpoints.contains_key(&chain_id)
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.endpoints.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn name_of(&self, chain_id: u64) -> Option<&str> {
        self.endpoints.get(&chain_id).map(|endpoint| endpoint.name.as_str())
    }
}
