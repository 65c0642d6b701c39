//! Deployment plans: an ordered list of typed steps.
//!
//! A plan is plain data. Dependencies between contracts are expressed with
//! [`PlanArg::AddressOf`] and [`LinkStep`], both of which may only name
//! contracts deployed by an earlier step. [`DeploymentPlan::validate`] checks
//! this before anything is sent to the network.

use std::{collections::HashSet, fmt};

use crate::{
    config::DeployConfig,
    error::PlanError,
    types::{ConstructorArg, DeployedContract, DeploymentSpec},
};

/// Name of the collectible contract.
pub const CRYPTO_HANDS: &str = "CryptoHands";
/// Name of the game contract.
pub const ROCK_PAPER_SCISSORS: &str = "RockPaperScissors";
/// Function registering the game contract inside [`CRYPTO_HANDS`].
pub const UPDATE_GAME_ADDRESS: &str = "updateGameAddress";

/// An argument of a deploy step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanArg {
    Value(ConstructorArg),
    /// Address of a contract deployed by an earlier step.
    AddressOf(String),
}

impl From<ConstructorArg> for PlanArg {
    fn from(value: ConstructorArg) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for PlanArg {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployStep {
    pub contract_name: String,
    pub args: Vec<PlanArg>,
    /// Submit the contract for source verification once confirmed.
    pub verify: bool,
}

impl DeployStep {
    pub fn new(contract_name: impl Into<String>, args: Vec<PlanArg>) -> Self {
        Self {
            contract_name: contract_name.into(),
            args,
            verify: true,
        }
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Substitute dependency addresses from confirmed contracts.
    pub fn resolve(
        &self,
        index: usize,
        deployed: &[DeployedContract],
    ) -> Result<DeploymentSpec, PlanError> {
        let constructor_args = self
            .args
            .iter()
            .map(|arg| match arg {
                PlanArg::Value(value) => Ok(value.clone()),
                PlanArg::AddressOf(name) => find_confirmed(index, deployed, name)
                    .map(|contract| ConstructorArg::Address(contract.address)),
            })
            .collect::<Result<_, _>>()?;

        Ok(DeploymentSpec::new(self.contract_name.clone(), constructor_args))
    }

    fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            PlanArg::AddressOf(name) => Some(name.as_str()),
            PlanArg::Value(_) => None,
        })
    }
}

/// Registers `dependency`'s address inside `target` by calling `function`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStep {
    pub target: String,
    pub dependency: String,
    pub function: String,
}

impl LinkStep {
    pub fn new(
        target: impl Into<String>,
        dependency: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            dependency: dependency.into(),
            function: function.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Deploy(DeployStep),
    Link(LinkStep),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Deploy(step) => write!(f, "deploy {}", step.contract_name),
            Step::Link(step) => write!(f, "link {} -> {}", step.target, step.dependency),
        }
    }
}

/// Ordered steps executed one after the other by [`crate::Orchestrator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_more::Deref)]
pub struct DeploymentPlan(Vec<Step>);

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deploy step.
    pub fn deploy(mut self, step: DeployStep) -> Self {
        self.0.push(Step::Deploy(step));
        self
    }

    /// Append a link step.
    pub fn link(mut self, step: LinkStep) -> Self {
        self.0.push(Step::Link(step));
        self
    }

    /// Deploy `CryptoHands` only.
    pub fn crypto_hands(config: &DeployConfig) -> Self {
        Self::new().deploy(DeployStep::new(
            CRYPTO_HANDS,
            vec![
                config.crypto_hands.base_uri.as_str().into(),
                config.crypto_hands.hidden_uri.as_str().into(),
            ],
        ))
    }

    /// Deploy `CryptoHands`, then `RockPaperScissors` pointing at it, then
    /// register the game inside `CryptoHands`.
    pub fn crypto_hands_with_game(config: &DeployConfig) -> Self {
        Self::crypto_hands(config)
            .deploy(DeployStep::new(
                ROCK_PAPER_SCISSORS,
                vec![
                    config.rock_paper_scissors.max_bet.as_str().into(),
                    config.rock_paper_scissors.min_bet.as_str().into(),
                    PlanArg::AddressOf(CRYPTO_HANDS.to_string()),
                ],
            ))
            .link(LinkStep::new(
                CRYPTO_HANDS,
                ROCK_PAPER_SCISSORS,
                UPDATE_GAME_ADDRESS,
            ))
    }

    /// Check that every reference points to a contract deployed earlier.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut deployed = HashSet::new();

        for (index, step) in self.0.iter().enumerate() {
            match step {
                Step::Deploy(step) => {
                    for dependency in step.dependencies() {
                        known(&deployed, index, dependency)?;
                    }
                    if !deployed.insert(step.contract_name.as_str()) {
                        return Err(PlanError::DuplicateContract {
                            index,
                            contract: step.contract_name.clone(),
                        });
                    }
                }
                Step::Link(step) => {
                    if step.target == step.dependency {
                        return Err(PlanError::SelfLink {
                            index,
                            contract: step.target.clone(),
                        });
                    }
                    known(&deployed, index, &step.target)?;
                    known(&deployed, index, &step.dependency)?;
                }
            }
        }

        Ok(())
    }
}

fn known(deployed: &HashSet<&str>, index: usize, name: &str) -> Result<(), PlanError> {
    if deployed.contains(name) {
        Ok(())
    } else {
        Err(PlanError::UnknownContract {
            index,
            contract: name.to_string(),
        })
    }
}

/// Find `name` among confirmed contracts.
pub(crate) fn find_confirmed<'a>(
    index: usize,
    deployed: &'a [DeployedContract],
    name: &str,
) -> Result<&'a DeployedContract, PlanError> {
    deployed
        .iter()
        .find(|c| c.name == name && c.is_confirmed())
        .ok_or_else(|| PlanError::UnknownContract {
            index,
            contract: name.to_string(),
        })
}
