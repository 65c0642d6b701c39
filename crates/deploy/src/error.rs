//! Error taxonomy of a deployment run.
//!
//! Deployment and link failures are fatal and abort the run. Verification
//! failures never leave the verifier: they are reduced to
//! [`crate::VerificationOutcome::Failed`] and a log line.

use alloy_core::primitives::{Address, TxHash};
use thiserror::Error;

use crate::types::DeployedContract;

/// A contract creation that did not reach confirmation.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("{contract} deployment was rejected: {source:#}")]
    Rejected {
        contract: String,
        source: anyhow::Error,
    },

    #[error("{contract} deployment {tx_hash} was not confirmed: {source:#}")]
    Unconfirmed {
        contract: String,
        tx_hash: TxHash,
        source: anyhow::Error,
    },

    #[error("{contract} deployment {tx_hash} reverted")]
    Reverted { contract: String, tx_hash: TxHash },
}

/// A post-deployment configuration call that failed.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{contract} at {address} is not confirmed yet")]
    NotConfirmed { contract: String, address: Address },

    #[error("{function} on {target} was rejected: {source:#}")]
    Rejected {
        target: Address,
        function: String,
        source: anyhow::Error,
    },

    #[error("{function} on {target} ({tx_hash}) was not confirmed: {source:#}")]
    Unconfirmed {
        target: Address,
        function: String,
        tx_hash: TxHash,
        source: anyhow::Error,
    },

    #[error("{function} on {target} ({tx_hash}) reverted")]
    Reverted {
        target: Address,
        function: String,
        tx_hash: TxHash,
    },
}

/// Failure reported by a source verification service.
#[derive(Debug, Error)]
pub enum VerificationFailure {
    #[error("verification service unreachable: {0:#}")]
    Transport(anyhow::Error),

    #[error("verification rejected: {0}")]
    Rejected(String),

    #[error("verification still pending after {attempts} status checks")]
    Timeout { attempts: u32 },
}

impl VerificationFailure {
    /// Whether the service refused because the source is already published.
    pub fn is_already_verified(&self) -> bool {
        match self {
            Self::Rejected(message) => message.to_lowercase().contains("already verified"),
            _ => false,
        }
    }
}

/// A deployment plan that cannot be executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("step {index} references {contract}, which no earlier step deploys")]
    UnknownContract { index: usize, contract: String },

    #[error("step {index} deploys {contract} a second time")]
    DuplicateContract { index: usize, contract: String },

    #[error("step {index} links {contract} to itself")]
    SelfLink { index: usize, contract: String },
}

/// Fatal error of a run, naming the step that was in progress.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid deployment plan: {0}")]
    Plan(#[from] PlanError),

    #[error("step {index} ({step}) failed: {source}{}", deployed_suffix(.deployed))]
    Deployment {
        index: usize,
        step: String,
        source: DeploymentError,
        deployed: Vec<DeployedContract>,
    },

    #[error("step {index} ({step}) failed: {source}{}", deployed_suffix(.deployed))]
    Link {
        index: usize,
        step: String,
        source: LinkError,
        deployed: Vec<DeployedContract>,
    },
}

impl RunError {
    /// Contracts confirmed before the failure.
    pub fn deployed(&self) -> &[DeployedContract] {
        match self {
            Self::Plan(_) => &[],
            Self::Deployment { deployed, .. } | Self::Link { deployed, .. } => deployed,
        }
    }
}

fn deployed_suffix(deployed: &[DeployedContract]) -> String {
    if deployed.is_empty() {
        return String::new();
    }

    let contracts = deployed
        .iter()
        .map(|c| format!("{} at {}", c.name, c.address))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" (already deployed: {contracts})")
}
