use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_core::{relayer::Relayer, Config};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and summarize a configuration
    ValidateConfig {
        /// Config file (JSON, or TOML by extension); defaults to the environment
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Start relaying
    Start {
        /// Config file (JSON, or TOML by extension); defaults to the environment
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Chain to listen on; repeat for several. Defaults to every configured chain
        #[arg(long = "chain", value_name = "CHAIN_ID")]
        chains: Vec<u64>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading config file: {:?}", path);
            Config::load(path)?
        }
        None => {
            info!("Loading config from environment");
            Config::from_env()?
        }
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig { config } => {
            let config = load_config(config)?;
            println!("Configuration is valid.");
            println!("- Chains:");
            for chain in &config.chains {
                println!("  - {} ({}) -> {}", chain.name, chain.id, chain.counterpart);
                for check in [chain.rpc_url().err(), chain.bridge_address().err()]
                    .into_iter()
                    .flatten()
                {
                    println!("    ! {}", check);
                }
            }
            if let Err(e) = config.signer_key() {
                println!("- ! {}", e);
            }
            println!("- Relayer:");
            println!("  - gas price: {} gwei", config.relayer.gas_price_gwei);
            println!("  - gas limit: {}", config.relayer.gas_limit);
            println!("  - confirmations: {}", config.relayer.confirmations);
            println!("  - confirmation timeout: {}s", config.relayer.confirmation_timeout);
            println!("  - max in-flight relays: {}", config.relayer.max_in_flight);
            Ok(())
        }
        Commands::Start { config, chains } => {
            info!("Starting relay service");
            let config = load_config(config)?;

            let relayer = Relayer::new(config, &chains).await?;
            info!(
                "Relayer initialized for chains {:?}",
                relayer.registry().chain_ids()
            );

            if let Err(e) = relayer.start().await {
                error!("Relay service exited: {}", e);
                return Err(e.into());
            }

            Ok(())
        }
    }
}
