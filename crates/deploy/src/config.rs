//! Deployment configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CRYPTOHANDS_*` environment variables (`__` separates nested keys, e.g.
//! `CRYPTOHANDS_CRYPTO_HANDS__BASE_URI`).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of the environment variables read by [`DeployConfig::load`].
pub const ENV_PREFIX: &str = "CRYPTOHANDS_";

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Cryptohands.toml";

/// Everything needed to run a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the target network.
    pub rpc_url: String,
    /// Sender account. Must be unlocked on the node. Defaults to the node's first account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Hardhat artifacts directory.
    pub artifacts_dir: PathBuf,
    /// Where confirmed deployments are recorded. Disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments_file: Option<PathBuf>,
    /// Gas limit for every transaction. Estimated by the node when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Maximum time to wait for a receipt.
    pub confirmation_timeout_secs: u64,
    /// Interval between receipt polls.
    pub poll_interval_ms: u64,

    pub crypto_hands: CryptoHandsArgs,
    pub rock_paper_scissors: RockPaperScissorsArgs,
    pub verification: VerificationConfig,
}

/// Constructor arguments of `CryptoHands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoHandsArgs {
    pub base_uri: String,
    pub hidden_uri: String,
}

/// Constructor arguments of `RockPaperScissors`, in wei.
///
/// Kept as decimal strings: bet limits routinely exceed `u64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RockPaperScissorsArgs {
    #[serde(deserialize_with = "wei_amount")]
    pub max_bet: String,
    #[serde(deserialize_with = "wei_amount")]
    pub min_bet: String,
}

/// Accept an amount written either as a string or as a plain integer.
fn wei_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(u64),
    }

    Ok(match Amount::deserialize(deserializer)? {
        Amount::Text(text) => text,
        Amount::Number(number) => number.to_string(),
    })
}

/// Settings of the Etherscan-compatible verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub api_url: String,
    /// Sent as `chainid`. Defaults to the chain id reported by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// API credential. Never written to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Number of `checkverifystatus` polls before giving up.
    pub status_attempts: u32,
    pub status_interval_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            from: None,
            artifacts_dir: PathBuf::from("artifacts"),
            deployments_file: Some(PathBuf::from("deployments.json")),
            gas_limit: None,
            confirmation_timeout_secs: 300,
            poll_interval_ms: 2_000,
            crypto_hands: CryptoHandsArgs::default(),
            rock_paper_scissors: RockPaperScissorsArgs::default(),
            verification: VerificationConfig::default(),
        }
    }
}

impl Default for CryptoHandsArgs {
    fn default() -> Self {
        Self {
            base_uri: "iambaseuri".to_string(),
            hidden_uri: "iamhiddenuri".to_string(),
        }
    }
}

impl Default for RockPaperScissorsArgs {
    fn default() -> Self {
        Self {
            max_bet: "10000000000000000000".to_string(),
            min_bet: "1".to_string(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/v2/api".to_string(),
            chain_id: None,
            api_key: None,
            status_attempts: 10,
            status_interval_secs: 5,
        }
    }
}

impl DeployConfig {
    /// The layered configuration sources, without extracting them.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
        }

        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")?;

        if let Some(path) = path {
            tracing::info!(path = %path.display(), "Configuration loaded");
        }
        Ok(config)
    }

    /// Save the configuration to a TOML file. The API key is never written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
