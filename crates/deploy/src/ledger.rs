//! Persistent record of confirmed deployments.
//!
//! Updated after every confirmed step so that an interrupted run leaves enough
//! behind to finish the remaining steps by hand.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, TxHash};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompletedLink, DeployedContract};

/// One confirmed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    pub tx_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub deployed_at: DateTime<Utc>,
}

/// One confirmed configuration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub target: String,
    pub dependency: String,
    pub function: String,
    pub tx_hash: TxHash,
}

/// Content of the deployments file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployments {
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploymentRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

/// The deployments file on disk.
#[derive(Debug, Clone)]
pub struct DeploymentLedger {
    path: PathBuf,
}

impl DeploymentLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, or an empty record if it does not exist yet.
    pub fn read(&self) -> Result<Deployments> {
        if !self.path.exists() {
            return Ok(Deployments::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Record a confirmed contract, replacing an older entry of the same name.
    pub fn record_contract(&self, contract: &DeployedContract) -> Result<()> {
        let mut deployments = self.read()?;
        deployments.deployments.insert(
            contract.name.clone(),
            DeploymentRecord {
                address: contract.address,
                tx_hash: contract.tx_hash,
                block_number: contract.block_number,
                deployed_at: Utc::now(),
            },
        );
        self.write(&deployments)
    }

    pub fn record_link(&self, link: &CompletedLink) -> Result<()> {
        let mut deployments = self.read()?;
        deployments.links.push(LinkRecord {
            target: link.target.clone(),
            dependency: link.dependency.clone(),
            function: link.function.clone(),
            tx_hash: link.tx_hash,
        });
        self.write(&deployments)
    }

    fn write(&self, deployments: &Deployments) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(deployments)
            .context("Failed to serialize deployments")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "Deployments file updated");
        Ok(())
    }
}
