//! [`ContractFactory`] backed by a node's JSON-RPC interface.
//!
//! Transactions are sent with `eth_sendTransaction` from an account unlocked on
//! the node (Hardhat node, Anvil, or a signing proxy). Nonces are assigned
//! locally and sequentially so consecutive submissions can never collide.

use std::time::Duration;

use alloy_core::primitives::{Address, Bytes, TxHash};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    config::DeployConfig,
    rpc,
    traits::ContractFactory,
    types::{
        ConstructorArg, DeployedContract, DeploymentSpec, PendingDeployment, TransactionReceipt,
    },
};

/// Receipt fields as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: String,
    #[serde(default)]
    contract_address: Option<Address>,
    /// Absent on pre-Byzantium chains.
    #[serde(default)]
    status: Option<String>,
}

impl TryFrom<RpcReceipt> for TransactionReceipt {
    type Error = anyhow::Error;

    fn try_from(receipt: RpcReceipt) -> Result<Self> {
        let success = match receipt.status.as_deref() {
            Some(status) => rpc::parse_quantity(status)? == 1,
            None => true,
        };

        Ok(Self {
            tx_hash: receipt.transaction_hash,
            block_number: rpc::parse_quantity(&receipt.block_number)?,
            contract_address: receipt.contract_address,
            success,
        })
    }
}

/// JSON-RPC client that deploys and calls contracts from one account.
pub struct RpcChain {
    client: reqwest::Client,
    rpc_url: String,
    chain_id: u64,
    from: Address,
    artifacts: ArtifactStore,
    gas_limit: Option<u64>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    /// Next nonce of `from`. Held across submission to keep transactions ordered.
    nonce: Mutex<u64>,
}

impl RpcChain {
    /// Connect to the node, resolve the sender account and its pending nonce.
    pub async fn connect(config: &DeployConfig) -> Result<Self> {
        let rpc_url = Url::parse(&config.rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", config.rpc_url))?
            .to_string();
        let client = rpc::create_client()?;

        let chain_id: String = rpc::json_rpc_call(&client, &rpc_url, "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach node at {}", rpc_url))?;

        let from = match config.from {
            Some(from) => from,
            None => {
                let accounts: Vec<Address> =
                    rpc::json_rpc_call(&client, &rpc_url, "eth_accounts", vec![])
                        .await
                        .context("Failed to list node accounts")?;
                accounts
                    .first()
                    .copied()
                    .context("Node exposes no unlocked account; set `from` explicitly")?
            }
        };

        let nonce: String = rpc::json_rpc_call(
            &client,
            &rpc_url,
            "eth_getTransactionCount",
            vec![json!(from), json!("pending")],
        )
        .await
        .context("Failed to fetch deployer nonce")?;
        let nonce = rpc::parse_quantity(&nonce)?;
        let chain_id = rpc::parse_quantity(&chain_id)?;

        tracing::info!(
            rpc_url = %rpc_url,
            chain_id,
            from = %from,
            nonce,
            "Connected to node"
        );

        Ok(Self {
            client,
            rpc_url,
            chain_id,
            from,
            artifacts: ArtifactStore::new(&config.artifacts_dir),
            gas_limit: config.gas_limit,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
            nonce: Mutex::new(nonce),
        })
    }

    /// Chain id reported by the node at connection time.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn sender(&self) -> Address {
        self.from
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Send a transaction with the next nonce. The nonce only advances once
    /// the node accepted the transaction.
    async fn send(&self, to: Option<Address>, data: Bytes) -> Result<(TxHash, u64)> {
        let mut nonce = self.nonce.lock().await;
        let tx = transaction_request(self.from, to, &data, *nonce, self.gas_limit);

        let tx_hash: TxHash =
            rpc::json_rpc_call(&self.client, &self.rpc_url, "eth_sendTransaction", vec![tx])
                .await?;

        let used = *nonce;
        *nonce += 1;
        Ok((tx_hash, used))
    }
}

fn transaction_request(
    from: Address,
    to: Option<Address>,
    data: &Bytes,
    nonce: u64,
    gas_limit: Option<u64>,
) -> Value {
    let mut tx = json!({
        "from": from,
        "data": data,
        "nonce": format!("0x{:x}", nonce),
    });
    if let Some(to) = to {
        tx["to"] = json!(to);
    }
    if let Some(gas) = gas_limit {
        tx["gas"] = json!(format!("0x{:x}", gas));
    }
    tx
}

impl ContractFactory for RpcChain {
    async fn submit_deployment(&self, spec: &DeploymentSpec) -> Result<PendingDeployment> {
        let artifact = self.artifacts.load(&spec.contract_name)?;
        let data = artifact.deployment_data(&spec.constructor_args)?;

        let (tx_hash, nonce) = self
            .send(None, data)
            .await
            .with_context(|| format!("Failed to submit {} creation", spec.contract_name))?;

        Ok(PendingDeployment {
            address: self.from.create(nonce),
            tx_hash,
        })
    }

    async fn submit_call(
        &self,
        target: &DeployedContract,
        function: &str,
        args: &[ConstructorArg],
    ) -> Result<TxHash> {
        let artifact = self.artifacts.load(&target.name)?;
        let data = artifact.encode_call(function, args)?;

        let (tx_hash, _) = self
            .send(Some(target.address), data)
            .await
            .with_context(|| format!("Failed to submit {}.{}", target.name, function))?;
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let name = format!("receipt of {}", tx_hash);
        let receipt: RpcReceipt =
            rpc::poll_until(&name, self.confirmation_timeout, self.poll_interval, || async {
                rpc::json_rpc_call::<Option<RpcReceipt>>(
                    &self.client,
                    &self.rpc_url,
                    "eth_getTransactionReceipt",
                    vec![json!(tx_hash)],
                )
                .await
            })
            .await?;

        receipt.try_into()
    }
}
