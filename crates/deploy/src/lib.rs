//! cryptohands-deploy - Deployment library for the CryptoHands contracts.
//!
//! This crate deploys `CryptoHands` and the `RockPaperScissors` game that
//! references it, links them together and submits both for source
//! verification when an explorer API key is configured.
//!
//! # Example
//!
//! ```no_run
//! use cryptohands_deploy::{
//!     DeployConfig, DeploymentPlan, EtherscanClient, Orchestrator, RpcChain, Verifier,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DeployConfig::load(None)?;
//! let chain = RpcChain::connect(&config).await?;
//! let verifier = Verifier::<EtherscanClient>::Absent;
//!
//! let report = Orchestrator::new(chain, verifier)
//!     .run(&DeploymentPlan::crypto_hands_with_game(&config))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod artifacts;
mod chain;
mod config;
mod deployer;
mod error;
mod etherscan;
mod ledger;
mod plan;
mod rpc;
mod runner;
pub mod traits;
mod types;
mod verifier;

pub use artifacts::{ArtifactStore, BuildInfo, ContractArtifact};
pub use chain::RpcChain;
pub use config::{
    CONFIG_FILENAME, CryptoHandsArgs, DeployConfig, ENV_PREFIX, RockPaperScissorsArgs,
    VerificationConfig,
};
pub use deployer::Deployer;
pub use error::{DeploymentError, LinkError, PlanError, RunError, VerificationFailure};
pub use etherscan::EtherscanClient;
pub use ledger::{DeploymentLedger, DeploymentRecord, Deployments, LinkRecord};
pub use plan::{
    CRYPTO_HANDS, DeployStep, DeploymentPlan, LinkStep, PlanArg, ROCK_PAPER_SCISSORS, Step,
    UPDATE_GAME_ADDRESS,
};
pub use runner::Orchestrator;
pub use verifier::Verifier;
pub use traits::{ContractFactory, VerificationService};
pub use types::{
    CompletedLink, ConfirmationState, ConstructorArg, DeployedContract, DeploymentReport,
    DeploymentSpec, PendingDeployment, TransactionReceipt, VerificationOutcome,
    VerificationRequest,
};
