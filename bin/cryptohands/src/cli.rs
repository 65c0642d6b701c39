use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Parser, Subcommand};
use cryptohands_deploy::DeployConfig;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "cryptohands")]
#[command(
    author,
    version,
    about = "Deploy the CryptoHands contracts and wire the RockPaperScissors game into them"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "CRYPTOHANDS_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a configuration file.
    ///
    /// Defaults to ./Cryptohands.toml when that file exists.
    #[arg(short, long, global = true, alias = "conf", env = "CRYPTOHANDS_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Deploy CryptoHands and RockPaperScissors, then register the game in CryptoHands.
    DeployAndConfigure,
    /// Deploy CryptoHands only.
    DeployCryptoHands,
    /// Write the effective configuration to a TOML file and exit.
    InitConfig {
        /// Where to write the configuration.
        path: PathBuf,
    },
}

/// Command line values taking precedence over the configuration file and
/// `CRYPTOHANDS_*` variables.
#[derive(Debug, Clone, Parser)]
pub struct ConfigOverrides {
    /// JSON-RPC endpoint of the target network.
    #[arg(long, global = true, alias = "rpc")]
    pub rpc_url: Option<String>,

    /// Sender account, unlocked on the node.
    #[arg(long, global = true)]
    pub from: Option<Address>,

    /// Hardhat artifacts directory.
    #[arg(long, global = true, alias = "artifacts-dir")]
    pub artifacts: Option<PathBuf>,

    /// Where to record confirmed deployments.
    #[arg(long, global = true)]
    pub deployments_file: Option<PathBuf>,

    /// Etherscan API key. Verification is skipped when unset.
    #[arg(long, global = true, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Skip source verification even when an API key is available.
    #[arg(long, global = true, env = "CRYPTOHANDS_NO_VERIFY")]
    pub no_verify: bool,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut DeployConfig) {
        if let Some(rpc_url) = self.rpc_url {
            config.rpc_url = rpc_url;
        }
        if let Some(from) = self.from {
            config.from = Some(from);
        }
        if let Some(artifacts) = self.artifacts {
            config.artifacts_dir = artifacts;
        }
        if let Some(deployments_file) = self.deployments_file {
            config.deployments_file = Some(deployments_file);
        }
        if let Some(api_key) = self.etherscan_api_key {
            config.verification.api_key = Some(api_key);
        }
        if self.no_verify {
            config.verification.api_key = None;
        }
    }
}
