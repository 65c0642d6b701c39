//! End-to-end tests of the deployment flow against in-memory doubles.
//!
//! The doubles record every interaction in a single shared log so the exact
//! ordering of submissions, confirmations, verifications and calls can be
//! asserted.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use alloy_core::primitives::{Address, TxHash};
use anyhow::{Result, bail};
use cryptohands_deploy::{
    ConfirmationState, ConstructorArg, ContractFactory, DeployConfig, DeployStep, DeployedContract,
    Deployer, DeploymentError, DeploymentLedger, DeploymentPlan, DeploymentSpec, LinkError,
    Orchestrator, PendingDeployment, PlanArg, RunError, TransactionReceipt, VerificationFailure,
    VerificationOutcome, VerificationRequest, VerificationService, Verifier,
};
use tempdir::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Submit {
        contract: String,
        args: Vec<ConstructorArg>,
    },
    Confirmed(TxHash),
    Verify {
        contract: String,
        address: Address,
    },
    Call {
        target: Address,
        function: String,
        args: Vec<ConstructorArg>,
    },
}

#[derive(Debug, Default)]
struct Chain {
    events: Vec<Event>,
    sent: u8,
    created: HashMap<TxHash, Address>,
    reverted: HashSet<TxHash>,
    lost: HashSet<TxHash>,
}

type SharedChain = Arc<Mutex<Chain>>;

/// Factory that hands out deterministic addresses and tx hashes: the n-th
/// transaction gets hash `n` and, when it is a creation, address `n`.
#[derive(Default)]
struct MockFactory {
    chain: SharedChain,
    /// Contract whose creation is refused by the node.
    reject: Option<&'static str>,
    /// Contract or function whose transaction reverts.
    revert: Option<&'static str>,
    /// Contract whose receipt never arrives.
    lost: Option<&'static str>,
    /// Overrides the created address reported by receipts.
    receipt_address: Option<Address>,
}

impl MockFactory {
    fn events(&self) -> Vec<Event> {
        self.chain.lock().unwrap().events.clone()
    }

    fn next_tx(&self, reverts: bool) -> TxHash {
        let mut chain = self.chain.lock().unwrap();
        chain.sent += 1;
        let tx_hash = TxHash::with_last_byte(chain.sent);
        if reverts {
            chain.reverted.insert(tx_hash);
        }
        tx_hash
    }
}

impl ContractFactory for MockFactory {
    async fn submit_deployment(&self, spec: &DeploymentSpec) -> Result<PendingDeployment> {
        if self.reject == Some(spec.contract_name.as_str()) {
            bail!("insufficient funds for gas");
        }

        let tx_hash = self.next_tx(self.revert == Some(spec.contract_name.as_str()));
        let address = Address::with_last_byte(tx_hash[31]);

        let mut chain = self.chain.lock().unwrap();
        chain.events.push(Event::Submit {
            contract: spec.contract_name.clone(),
            args: spec.constructor_args.clone(),
        });
        chain.created.insert(tx_hash, address);
        if self.lost == Some(spec.contract_name.as_str()) {
            chain.lost.insert(tx_hash);
        }

        Ok(PendingDeployment { address, tx_hash })
    }

    async fn submit_call(
        &self,
        target: &DeployedContract,
        function: &str,
        args: &[ConstructorArg],
    ) -> Result<TxHash> {
        let tx_hash = self.next_tx(self.revert == Some(function));
        self.chain.lock().unwrap().events.push(Event::Call {
            target: target.address,
            function: function.to_string(),
            args: args.to_vec(),
        });
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let mut chain = self.chain.lock().unwrap();
        if chain.lost.contains(&tx_hash) {
            bail!("timed out waiting for receipt of {tx_hash}");
        }

        let contract_address = chain.created.get(&tx_hash).copied();
        chain.events.push(Event::Confirmed(tx_hash));
        Ok(TransactionReceipt {
            tx_hash,
            block_number: 100 + tx_hash[31] as u64,
            contract_address: self.receipt_address.or(contract_address),
            success: !chain.reverted.contains(&tx_hash),
        })
    }
}

/// Verification service that logs into the same chain as the factory.
#[derive(Clone)]
struct RecordingVerifier {
    chain: SharedChain,
    fail: bool,
}

impl VerificationService for RecordingVerifier {
    const SERVICE_NAME: &'static str = "recording";

    async fn submit(&self, request: &VerificationRequest) -> Result<(), VerificationFailure> {
        self.chain.lock().unwrap().events.push(Event::Verify {
            contract: request.contract_name.clone(),
            address: request.address,
        });
        if self.fail {
            Err(VerificationFailure::Rejected("Max rate limit reached".into()))
        } else {
            Ok(())
        }
    }
}

fn verifier(
    chain: &SharedChain,
    credential: Option<&str>,
    fail: bool,
) -> Verifier<RecordingVerifier> {
    let chain = chain.clone();
    Verifier::from_credential(credential, move |_key| RecordingVerifier { chain, fail })
}

fn standard_plan() -> DeploymentPlan {
    DeploymentPlan::crypto_hands_with_game(&DeployConfig::default())
}

fn crypto_hands_args() -> Vec<ConstructorArg> {
    vec!["iambaseuri".into(), "iamhiddenuri".into()]
}

fn game_args(crypto_hands: Address) -> Vec<ConstructorArg> {
    vec![
        "10000000000000000000".into(),
        "1".into(),
        ConstructorArg::Address(crypto_hands),
    ]
}

#[tokio::test]
async fn test_full_sequence_with_verification() {
    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, Some("key"), false));

    let report = orchestrator.run(&standard_plan()).await.unwrap();

    let crypto_hands = Address::with_last_byte(1);
    let game = Address::with_last_byte(2);
    assert_eq!(
        orchestrator.deployer().factory().events(),
        vec![
            Event::Submit {
                contract: "CryptoHands".into(),
                args: crypto_hands_args(),
            },
            Event::Confirmed(TxHash::with_last_byte(1)),
            Event::Verify {
                contract: "CryptoHands".into(),
                address: crypto_hands,
            },
            Event::Submit {
                contract: "RockPaperScissors".into(),
                args: game_args(crypto_hands),
            },
            Event::Confirmed(TxHash::with_last_byte(2)),
            Event::Verify {
                contract: "RockPaperScissors".into(),
                address: game,
            },
            Event::Call {
                target: crypto_hands,
                function: "updateGameAddress".into(),
                args: vec![ConstructorArg::Address(game)],
            },
            Event::Confirmed(TxHash::with_last_byte(3)),
        ]
    );

    assert!(report.contracts.iter().all(DeployedContract::is_confirmed));
    assert_eq!(report.contract("CryptoHands").unwrap().address, crypto_hands);
    assert_eq!(report.contract("RockPaperScissors").unwrap().block_number, Some(102));
    assert_eq!(
        report.verifications,
        vec![
            ("CryptoHands".to_string(), VerificationOutcome::Verified),
            ("RockPaperScissors".to_string(), VerificationOutcome::Verified),
        ]
    );
    assert_eq!(report.links.len(), 1);
    assert_eq!(report.links[0].tx_hash, TxHash::with_last_byte(3));
}

#[tokio::test]
async fn test_no_credential_skips_verification() {
    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, None, false));

    let report = orchestrator.run(&standard_plan()).await.unwrap();

    let events = orchestrator.deployer().factory().events();
    assert!(!events.iter().any(|e| matches!(e, Event::Verify { .. })));
    assert_eq!(events.len(), 6);
    assert!(
        report
            .verifications
            .iter()
            .all(|(_, outcome)| *outcome == VerificationOutcome::Skipped)
    );
    assert_eq!(report.links.len(), 1);
}

#[tokio::test]
async fn test_verification_failure_does_not_stop_the_run() {
    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, Some("key"), true));

    let report = orchestrator.run(&standard_plan()).await.unwrap();

    assert_eq!(report.verifications.len(), 2);
    assert!(
        report
            .verifications
            .iter()
            .all(|(_, outcome)| matches!(outcome, VerificationOutcome::Failed { .. }))
    );

    let calls: Vec<_> = orchestrator
        .deployer()
        .factory()
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Call { .. }))
        .collect();
    assert_eq!(
        calls,
        vec![Event::Call {
            target: Address::with_last_byte(1),
            function: "updateGameAddress".into(),
            args: vec![ConstructorArg::Address(Address::with_last_byte(2))],
        }]
    );
}

#[tokio::test]
async fn test_steps_opted_out_of_verification_are_not_submitted() {
    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, Some("key"), false));

    let plan = DeploymentPlan::new().deploy(
        DeployStep::new("CryptoHands", vec!["a".into(), "b".into()]).verify(false),
    );
    let report = orchestrator.run(&plan).await.unwrap();

    assert!(report.verifications.is_empty());
    assert_eq!(orchestrator.deployer().factory().events().len(), 2);
}

#[tokio::test]
async fn test_first_deployment_failure_stops_everything() {
    let factory = MockFactory {
        reject: Some("CryptoHands"),
        ..MockFactory::default()
    };
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, Some("key"), false));

    let err = orchestrator.run(&standard_plan()).await.unwrap_err();

    assert!(matches!(
        &err,
        RunError::Deployment {
            index: 0,
            source: DeploymentError::Rejected { .. },
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("deploy CryptoHands"), "{message}");
    assert!(message.contains("insufficient funds"), "{message}");
    assert!(err.deployed().is_empty());
    assert!(orchestrator.deployer().factory().events().is_empty());
}

#[tokio::test]
async fn test_second_deployment_failure_reports_deployed_contracts() {
    let factory = MockFactory {
        revert: Some("RockPaperScissors"),
        ..MockFactory::default()
    };
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, None, false));

    let err = orchestrator.run(&standard_plan()).await.unwrap_err();

    assert!(matches!(
        &err,
        RunError::Deployment {
            index: 1,
            source: DeploymentError::Reverted { .. },
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("deploy RockPaperScissors"), "{message}");
    assert!(
        message.contains(&format!("CryptoHands at {}", Address::with_last_byte(1))),
        "{message}"
    );
    assert_eq!(err.deployed().len(), 1);
    assert!(
        !orchestrator
            .deployer()
            .factory()
            .events()
            .iter()
            .any(|e| matches!(e, Event::Call { .. }))
    );
}

#[tokio::test]
async fn test_link_revert_is_fatal() {
    let factory = MockFactory {
        revert: Some("updateGameAddress"),
        ..MockFactory::default()
    };
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, None, false));

    let err = orchestrator.run(&standard_plan()).await.unwrap_err();

    assert!(matches!(
        &err,
        RunError::Link {
            index: 2,
            source: LinkError::Reverted { .. },
            ..
        }
    ));
    assert!(err.to_string().contains("link CryptoHands -> RockPaperScissors"));
    assert_eq!(err.deployed().len(), 2);
}

#[tokio::test]
async fn test_invalid_plan_sends_nothing() {
    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator = Orchestrator::new(factory, verifier(&chain, None, false));

    let plan = DeploymentPlan::new()
        .deploy(DeployStep::new(
            "RockPaperScissors",
            vec![PlanArg::AddressOf("CryptoHands".into())],
        ))
        .deploy(DeployStep::new("CryptoHands", vec![]));

    let err = orchestrator.run(&plan).await.unwrap_err();
    assert!(matches!(err, RunError::Plan(_)));
    assert!(orchestrator.deployer().factory().events().is_empty());
}

#[tokio::test]
async fn test_confirmed_steps_are_written_to_the_ledger() {
    let tmp = TempDir::new("orchestration").unwrap();
    let ledger = DeploymentLedger::new(tmp.path().join("deployments.json"));

    let factory = MockFactory::default();
    let chain = factory.chain.clone();
    let orchestrator =
        Orchestrator::new(factory, verifier(&chain, None, false)).with_ledger(ledger.clone());

    orchestrator.run(&standard_plan()).await.unwrap();

    let deployments = ledger.read().unwrap();
    assert_eq!(
        deployments.deployments["CryptoHands"].address,
        Address::with_last_byte(1)
    );
    assert_eq!(
        deployments.deployments["RockPaperScissors"].address,
        Address::with_last_byte(2)
    );
    assert_eq!(deployments.links.len(), 1);
    assert_eq!(deployments.links[0].function, "updateGameAddress");
}

#[tokio::test]
async fn test_ledger_keeps_first_contract_when_second_fails() {
    let tmp = TempDir::new("orchestration").unwrap();
    let ledger = DeploymentLedger::new(tmp.path().join("deployments.json"));

    let factory = MockFactory {
        reject: Some("RockPaperScissors"),
        ..MockFactory::default()
    };
    let chain = factory.chain.clone();
    let orchestrator =
        Orchestrator::new(factory, verifier(&chain, None, false)).with_ledger(ledger.clone());

    assert!(orchestrator.run(&standard_plan()).await.is_err());

    let deployments = ledger.read().unwrap();
    assert!(deployments.deployments.contains_key("CryptoHands"));
    assert!(!deployments.deployments.contains_key("RockPaperScissors"));
    assert!(deployments.links.is_empty());
}

#[tokio::test]
async fn test_deploy_returns_only_confirmed_contracts() {
    let deployer = Deployer::new(MockFactory::default());

    let contract = deployer
        .deploy(&DeploymentSpec::new("CryptoHands", crypto_hands_args()))
        .await
        .unwrap();

    assert_eq!(contract.state(), ConfirmationState::Confirmed);
    assert_eq!(contract.address, Address::with_last_byte(1));
    assert_eq!(contract.block_number, Some(101));
    assert_eq!(
        deployer.factory().events(),
        vec![
            Event::Submit {
                contract: "CryptoHands".into(),
                args: crypto_hands_args(),
            },
            Event::Confirmed(TxHash::with_last_byte(1)),
        ]
    );
}

#[tokio::test]
async fn test_deploy_without_receipt_yields_no_contract() {
    let deployer = Deployer::new(MockFactory {
        lost: Some("CryptoHands"),
        ..MockFactory::default()
    });

    let err = deployer
        .deploy(&DeploymentSpec::new("CryptoHands", crypto_hands_args()))
        .await
        .unwrap_err();

    assert!(matches!(err, DeploymentError::Unconfirmed { .. }));
    assert!(err.to_string().contains("timed out"));
    assert!(
        !deployer
            .factory()
            .events()
            .iter()
            .any(|e| matches!(e, Event::Confirmed(_)))
    );
}

#[tokio::test]
async fn test_receipt_address_wins_over_prediction() {
    let actual = Address::with_last_byte(0xee);
    let deployer = Deployer::new(MockFactory {
        receipt_address: Some(actual),
        ..MockFactory::default()
    });

    let contract = deployer
        .deploy(&DeploymentSpec::new("CryptoHands", crypto_hands_args()))
        .await
        .unwrap();

    assert_eq!(contract.address, actual);
}

#[tokio::test]
async fn test_link_passes_dependency_address() {
    let deployer = Deployer::new(MockFactory::default());

    let crypto_hands = deployer
        .deploy(&DeploymentSpec::new("CryptoHands", crypto_hands_args()))
        .await
        .unwrap();
    let game = deployer
        .deploy(&DeploymentSpec::new(
            "RockPaperScissors",
            game_args(crypto_hands.address),
        ))
        .await
        .unwrap();

    let tx_hash = deployer
        .link(&crypto_hands, &game, "updateGameAddress")
        .await
        .unwrap();

    assert_eq!(tx_hash, TxHash::with_last_byte(3));
    assert_eq!(
        deployer.factory().events().last(),
        Some(&Event::Confirmed(TxHash::with_last_byte(3)))
    );
    assert!(deployer.factory().events().contains(&Event::Call {
        target: crypto_hands.address,
        function: "updateGameAddress".into(),
        args: vec![ConstructorArg::Address(game.address)],
    }));
}
