//! Data model shared by the deployer, the verifier and the plan executor.

use std::fmt;

use alloy_core::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// A primitive value passed to a constructor or a configuration call.
///
/// Values are coerced to the parameter types declared by the contract ABI at
/// encoding time, so numeric amounts can be written as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(untagged)]
pub enum ConstructorArg {
    Bool(bool),
    Address(Address),
    Uint(U256),
    String(String),
}

impl From<&str> for ConstructorArg {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Address(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

/// What to deploy: a contract name resolved by the factory and its ordered
/// constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub contract_name: String,
    pub constructor_args: Vec<ConstructorArg>,
}

impl DeploymentSpec {
    pub fn new(contract_name: impl Into<String>, constructor_args: Vec<ConstructorArg>) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args,
        }
    }
}

/// Inclusion state of a deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConfirmationState {
    Pending,
    Confirmed,
}

/// A contract whose creation transaction has been submitted.
///
/// Only the [`crate::Deployer`] moves a contract to [`ConfirmationState::Confirmed`],
/// after the network reported a successful receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    state: ConfirmationState,
}

impl DeployedContract {
    pub(crate) fn pending(name: String, address: Address, tx_hash: TxHash) -> Self {
        Self {
            name,
            address,
            tx_hash,
            block_number: None,
            state: ConfirmationState::Pending,
        }
    }

    pub(crate) fn confirm(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self.state = ConfirmationState::Confirmed;
        self
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == ConfirmationState::Confirmed
    }
}

/// Returned by a factory once a creation transaction has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeployment {
    /// Address the contract will live at once included.
    pub address: Address,
    pub tx_hash: TxHash,
}

/// The parts of a transaction receipt the orchestrator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub contract_address: Option<Address>,
    pub success: bool,
}

/// Input for a source verification submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub address: Address,
    pub contract_name: String,
    pub constructor_args: Vec<ConstructorArg>,
}

impl VerificationRequest {
    /// Build a request for a confirmed contract. Returns `None` while the
    /// contract is still pending.
    pub fn for_contract(contract: &DeployedContract, spec: &DeploymentSpec) -> Option<Self> {
        if !contract.is_confirmed() {
            return None;
        }

        Some(Self {
            address: contract.address,
            contract_name: spec.contract_name.clone(),
            constructor_args: spec.constructor_args.clone(),
        })
    }
}

/// Result of a best-effort verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
    /// No credential configured; the service was not contacted.
    Skipped,
    Failed { reason: String },
}

/// A configuration call that completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedLink {
    pub target: String,
    pub dependency: String,
    pub function: String,
    pub tx_hash: TxHash,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub contracts: Vec<DeployedContract>,
    pub verifications: Vec<(String, VerificationOutcome)>,
    pub links: Vec<CompletedLink>,
}

impl DeploymentReport {
    pub fn contract(&self, name: &str) -> Option<&DeployedContract> {
        self.contracts.iter().find(|c| c.name == name)
    }
}
