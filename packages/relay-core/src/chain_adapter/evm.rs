use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    middleware::{NonceManagerMiddleware, SignerMiddleware},
    providers::{FilterKind, Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Filter, Log, TransactionReceipt, TransactionRequest, H256, U256},
};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::ChainAdapter;
use crate::{config::ChainConfig, types::RelayTransaction, Error};

type SignerClient = NonceManagerMiddleware<SignerMiddleware<Provider<Http>, LocalWallet>>;

/// JSON-RPC adapter for EVM chains. Logs are polled through an installed
/// filter; submissions go through a local wallet with a managed nonce.
pub struct EvmAdapter {
    chain_id: u64,
    provider: Provider<Http>,
    client: SignerClient,
    signer: Address,
}

impl EvmAdapter {
    pub async fn connect(
        config: &ChainConfig,
        signer_key: &str,
        poll_interval: Duration,
    ) -> Result<Self, Error> {
        let rpc_url = config.rpc_url()?;
        let wallet: LocalWallet = signer_key
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid signer key: {}", e)))?;

        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| {
                Error::Config(format!("Invalid RPC URL for chain {}: {}", config.id, e))
            })?
            .interval(poll_interval);

        let reported = provider
            .get_chainid()
            .await
            .map_err(|e| Error::Chain(format!("Failed to reach chain {}: {}", config.id, e)))?;
        if reported != U256::from(config.id) {
            return Err(Error::Config(format!(
                "RPC for chain {} ({}) reports chain ID {}",
                config.id, config.name, reported
            )));
        }

        let wallet = wallet.with_chain_id(config.id);
        let signer = wallet.address();
        let client = NonceManagerMiddleware::new(
            SignerMiddleware::new(provider.clone(), wallet),
            signer,
        );

        info!(
            "Connected to {} ({}) as {:#x}",
            config.name, config.id, signer
        );

        Ok(Self {
            chain_id: config.id,
            provider,
            client,
            signer,
        })
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain_type(&self) -> &str {
        "evm"
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    /// Polls the installed filter every provider interval. The first failed
    /// poll ends the watch with an error, so an expired or lost filter is
    /// installed again by the subscription instead of going quiet.
    async fn watch_logs(&self, filter: Filter, sink: mpsc::Sender<Log>) -> Result<(), Error> {
        let filter_id = self
            .provider
            .new_filter(FilterKind::Logs(&filter))
            .await
            .map_err(|e| {
                Error::Chain(format!(
                    "Failed to install log filter on chain {}: {}",
                    self.chain_id, e
                ))
            })?;
        debug!("Log filter {:#x} installed on chain {}", filter_id, self.chain_id);

        let mut ticker = interval(self.provider.get_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let logs: Vec<Log> = self
                .provider
                .get_filter_changes(filter_id)
                .await
                .map_err(|e| {
                    Error::Chain(format!(
                        "Log filter {:#x} on chain {} failed: {}",
                        filter_id, self.chain_id, e
                    ))
                })?;

            for log in logs {
                if sink.send(log).await.is_err() {
                    if let Err(e) = self.provider.uninstall_filter(filter_id).await {
                        debug!("Failed to uninstall log filter on chain {}: {}", self.chain_id, e);
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn submit_transaction(&self, tx: RelayTransaction) -> Result<H256, Error> {
        let request = TransactionRequest::new()
            .to(tx.to)
            .data(tx.data)
            .gas(tx.gas_limit)
            .gas_price(tx.gas_price);

        let pending = self
            .client
            .send_transaction(request, None)
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;

        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: H256,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, Error> {
        PendingTransaction::new(tx_hash, &self.provider)
            .interval(self.provider.get_interval())
            .confirmations(confirmations)
            .await
            .map_err(|e| Error::Chain(format!("Failed to track {:#x}: {}", tx_hash, e)))
    }
}
