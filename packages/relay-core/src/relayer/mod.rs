use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::{
    chain_adapter::{ChainAdapterFactory, DefaultChainAdapterFactory},
    config::{ChainConfig, Config},
    dispatcher::RelayDispatcher,
    journal::{PassThroughJournal, RelayJournal},
    registry::{ChainEndpoint, ChainEndpointRegistry},
    report::{Reporter, TracingReporter},
    subscription::EventSubscription,
    Error,
};

/// Wires the registry, one subscription per selected chain and the
/// dispatcher together.
pub struct Relayer {
    config: Config,
    registry: Arc<ChainEndpointRegistry>,
    selected: Vec<u64>,
    startup_failures: Vec<(u64, Error)>,
    reporter: Arc<dyn Reporter>,
    journal: Arc<dyn RelayJournal>,
}

impl Relayer {
    /// Connects every configured chain. An empty `chains` selects all of them
    /// for listening.
    pub async fn new(config: Config, chains: &[u64]) -> Result<Self, Error> {
        Self::with_factory(config, chains, &DefaultChainAdapterFactory).await
    }

    pub async fn with_factory(
        config: Config,
        chains: &[u64],
        factory: &dyn ChainAdapterFactory,
    ) -> Result<Self, Error> {
        config.validate()?;

        for chain_id in chains {
            if config.get_chain_config(*chain_id).is_none() {
                return Err(Error::Config(format!("Chain {} is not configured", chain_id)));
            }
        }
        let selected = if chains.is_empty() {
            config.chains.iter().map(|c| c.id).collect()
        } else {
            chains.to_vec()
        };

        let signer_key = config.signer_key()?;
        let mut endpoints = Vec::new();
        let mut startup_failures = Vec::new();

        for chain in &config.chains {
            match connect_endpoint(chain, &signer_key, &config, factory).await {
                Ok(endpoint) => {
                    info!(
                        "{} ({}) ready, relaying to chain {}",
                        endpoint.name, endpoint.chain_id, endpoint.counterpart
                    );
                    endpoints.push(endpoint);
                }
                Err(e) => {
                    error!("Failed to initialize {} ({}): {}", chain.name, chain.id, e);
                    startup_failures.push((chain.id, e));
                }
            }
        }

        let registry = ChainEndpointRegistry::new(endpoints)?;
        if registry.is_empty() {
            return Err(Error::Config("No chain could be initialized".to_string()));
        }

        for chain in &config.chains {
            if registry.contains(chain.id) && !registry.contains(chain.counterpart) {
                warn!(
                    "Counterpart {} of {} is not available; its events will fail with an unknown chain error",
                    chain.counterpart, chain.name
                );
            }
        }

        let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter::from_registry(&registry));

        Ok(Self {
            config,
            registry: Arc::new(registry),
            selected,
            startup_failures,
            reporter,
            journal: Arc::new(PassThroughJournal),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_journal(mut self, journal: Arc<dyn RelayJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn registry(&self) -> &Arc<ChainEndpointRegistry> {
        &self.registry
    }

    pub fn startup_failures(&self) -> &[(u64, Error)] {
        &self.startup_failures
    }

    /// Listens on every selected chain that came up. Only returns if all
    /// subscriptions end, and then fails when any chain failed to start.
    pub async fn start(&self) -> Result<(), Error> {
        info!("Starting relayer...");

        let dispatcher = Arc::new(
            RelayDispatcher::new(
                Arc::clone(&self.registry),
                self.config.relayer.clone(),
                Arc::clone(&self.reporter),
            )
            .with_journal(Arc::clone(&self.journal)),
        );

        let mut subscriptions = Vec::new();
        for chain_id in &self.selected {
            if !self.registry.contains(*chain_id) {
                continue;
            }
            let dispatcher = Arc::clone(&dispatcher);
            let handle = EventSubscription::subscribe(
                &self.registry,
                *chain_id,
                Arc::clone(&self.reporter),
                self.config.relayer.resubscribe_delay(),
                move |event| {
                    dispatcher.dispatch(event);
                },
            )?;
            subscriptions.push(handle);
        }

        if subscriptions.is_empty() {
            return Err(Error::Config("None of the selected chains could be started".to_string()));
        }

        for result in join_all(subscriptions).await {
            if let Err(e) = result {
                error!("Subscription task ended abnormally: {}", e);
            }
        }

        match self.startup_failures.first() {
            Some((chain_id, e)) => Err(Error::Config(format!(
                "Chain {} failed to initialize: {}",
                chain_id, e
            ))),
            None => Ok(()),
        }
    }
}

async fn connect_endpoint(
    chain: &ChainConfig,
    signer_key: &str,
    config: &Config,
    factory: &dyn ChainAdapterFactory,
) -> Result<ChainEndpoint, Error> {
    chain.rpc_url()?;
    chain.bridge_address()?;

    let adapter = factory.create_adapter(chain, signer_key, &config.relayer).await?;
    ChainEndpoint::new(chain, adapter)
}
