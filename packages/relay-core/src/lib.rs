pub mod config;
pub mod types;
pub mod contract;
pub mod chain_adapter;
pub mod registry;
pub mod subscription;
pub mod dispatcher;
pub mod report;
pub mod journal;
pub mod relayer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use registry::{ChainEndpoint, ChainEndpointRegistry};
pub use types::{RelayEvent, RelayOutcome, RelayStage, RelayStatus, RelayTransaction};

use std::time::Duration;

use ethers::types::H256;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(u64),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Transaction {tx_hash:#x} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx_hash: H256, waited: Duration },

    #[error("Chain error: {0}")]
    Chain(String),
}

impl Error {
    /// Stable label used when reporting a failed relay.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::UnknownChain(_) => "unknown_chain",
            Error::Encoding(_) => "encoding",
            Error::Decoding(_) => "decoding",
            Error::Submission(_) => "submission",
            Error::ConfirmationTimeout { .. } => "confirmation_timeout",
            Error::Chain(_) => "chain",
        }
    }
}
