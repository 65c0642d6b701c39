//! cryptohands deploys the CryptoHands collection and its RockPaperScissors game.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command};
use cryptohands_deploy::{
    ArtifactStore, CONFIG_FILENAME, DeployConfig, DeploymentLedger, DeploymentPlan,
    DeploymentReport, EtherscanClient, Orchestrator, RpcChain, Verifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    // Fall back to ./Cryptohands.toml when present.
    let config_path = cli
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(CONFIG_FILENAME)).filter(|p| p.exists()));

    let mut config = DeployConfig::load(config_path.as_deref())?;
    cli.overrides.apply(&mut config);

    let plan = match cli.command.unwrap_or(Command::DeployAndConfigure) {
        Command::DeployAndConfigure => DeploymentPlan::crypto_hands_with_game(&config),
        Command::DeployCryptoHands => DeploymentPlan::crypto_hands(&config),
        Command::InitConfig { path } => return init_config(&config, &path),
    };

    let chain = RpcChain::connect(&config).await?;
    let verifier = build_verifier(&config, chain.chain_id())?;

    let mut orchestrator = Orchestrator::new(chain, verifier);
    if let Some(path) = &config.deployments_file {
        orchestrator = orchestrator.with_ledger(DeploymentLedger::new(path));
    }

    let report = orchestrator.run(&plan).await?;
    println!("{}", summary(&report));

    Ok(())
}

fn init_config(config: &DeployConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    config.save_to_file(path)
}

/// Verification is enabled only when an API key was provided.
fn build_verifier(config: &DeployConfig, chain_id: u64) -> Result<Verifier<EtherscanClient>> {
    let artifacts = ArtifactStore::new(&config.artifacts_dir);
    let verifier =
        Verifier::try_from_credential(config.verification.api_key.as_deref(), |key| {
            EtherscanClient::new(&config.verification, key, chain_id, artifacts)
        })
        .context("Failed to set up contract verification")?;

    if !verifier.is_present() {
        tracing::info!("No Etherscan API key provided, contract verification disabled");
    }

    Ok(verifier)
}

fn summary(report: &DeploymentReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Contract", "Address", "Transaction", "Verification"]);

    for contract in &report.contracts {
        let verification = report
            .verifications
            .iter()
            .find(|(name, _)| *name == contract.name)
            .map(|(_, outcome)| outcome.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            contract.name.clone(),
            contract.address.to_string(),
            contract.tx_hash.to_string(),
            verification,
        ]);
    }

    for link in &report.links {
        table.add_row(vec![
            format!("{}.{}", link.target, link.function),
            link.dependency.clone(),
            link.tx_hash.to_string(),
            "-".to_string(),
        ]);
    }

    table
}
