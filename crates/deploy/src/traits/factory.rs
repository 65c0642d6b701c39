//! Transaction submission capability.

use std::future::Future;

use alloy_core::primitives::TxHash;
use anyhow::Result;

use crate::types::{
    ConstructorArg, DeployedContract, DeploymentSpec, PendingDeployment, TransactionReceipt,
};

/// Submits contract creations and calls, and waits for their inclusion.
///
/// Implementations own the sender account and must submit transactions in
/// call order: the orchestrator relies on it for nonce ordering.
pub trait ContractFactory: Send + Sync {
    /// Submit the creation transaction described by `spec`.
    ///
    /// Returns as soon as the transaction is accepted, before inclusion.
    fn submit_deployment(
        &self,
        spec: &DeploymentSpec,
    ) -> impl Future<Output = Result<PendingDeployment>> + Send;

    /// Submit a call to `function` on an already deployed contract.
    fn submit_call(
        &self,
        target: &DeployedContract,
        function: &str,
        args: &[ConstructorArg],
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Wait until `tx_hash` is included and return its receipt.
    fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;
}
