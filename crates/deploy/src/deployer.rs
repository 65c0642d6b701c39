use alloy_core::primitives::TxHash;

use crate::{
    error::{DeploymentError, LinkError},
    traits::ContractFactory,
    types::{DeployedContract, DeploymentSpec},
};

/// Deploys contracts and performs post-deployment configuration calls through a
/// [`ContractFactory`], one confirmed transaction at a time.
pub struct Deployer<F> {
    factory: F,
}

impl<F: ContractFactory> Deployer<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Deploy `spec` and wait for its confirmation.
    ///
    /// The returned contract is always [`crate::ConfirmationState::Confirmed`].
    pub async fn deploy(&self, spec: &DeploymentSpec) -> Result<DeployedContract, DeploymentError> {
        let contract_name = spec.contract_name.clone();

        let pending = self
            .factory
            .submit_deployment(spec)
            .await
            .map_err(|source| DeploymentError::Rejected {
                contract: contract_name.clone(),
                source,
            })?;

        let contract = DeployedContract::pending(contract_name, pending.address, pending.tx_hash);

        tracing::info!(
            contract = %contract.name,
            address = %contract.address,
            tx_hash = %contract.tx_hash,
            "Deployment submitted, waiting for confirmation..."
        );

        let receipt = self
            .factory
            .wait_for_confirmation(contract.tx_hash)
            .await
            .map_err(|source| DeploymentError::Unconfirmed {
                contract: contract.name.clone(),
                tx_hash: contract.tx_hash,
                source,
            })?;

        if !receipt.success {
            return Err(DeploymentError::Reverted {
                contract: contract.name,
                tx_hash: contract.tx_hash,
            });
        }

        // The receipt is authoritative for the created address.
        let mut contract = contract;
        if let Some(address) = receipt.contract_address {
            if address != contract.address {
                tracing::warn!(
                    contract = %contract.name,
                    expected = %contract.address,
                    actual = %address,
                    "Receipt reports a different contract address than predicted"
                );
                contract.address = address;
            }
        }

        let contract = contract.confirm(receipt.block_number);

        tracing::info!(
            contract = %contract.name,
            address = %contract.address,
            block = receipt.block_number,
            "Contract deployed"
        );

        Ok(contract)
    }

    /// Call `function(dependency.address)` on `target` and wait for confirmation.
    pub async fn link(
        &self,
        target: &DeployedContract,
        dependency: &DeployedContract,
        function: &str,
    ) -> Result<TxHash, LinkError> {
        for contract in [target, dependency] {
            if !contract.is_confirmed() {
                return Err(LinkError::NotConfirmed {
                    contract: contract.name.clone(),
                    address: contract.address,
                });
            }
        }

        tracing::info!(
            target = %target.name,
            target_address = %target.address,
            dependency = %dependency.name,
            dependency_address = %dependency.address,
            function = %function,
            "Linking contracts..."
        );

        let tx_hash = self
            .factory
            .submit_call(target, function, &[dependency.address.into()])
            .await
            .map_err(|source| LinkError::Rejected {
                target: target.address,
                function: function.to_string(),
                source,
            })?;

        let receipt = self
            .factory
            .wait_for_confirmation(tx_hash)
            .await
            .map_err(|source| LinkError::Unconfirmed {
                target: target.address,
                function: function.to_string(),
                tx_hash,
                source,
            })?;

        if !receipt.success {
            return Err(LinkError::Reverted {
                target: target.address,
                function: function.to_string(),
                tx_hash,
            });
        }

        tracing::info!(
            target = %target.name,
            dependency = %dependency.name,
            tx_hash = %tx_hash,
            "Link complete"
        );

        Ok(tx_hash)
    }
}
