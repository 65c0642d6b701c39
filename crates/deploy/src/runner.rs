//! Sequential execution of a [`DeploymentPlan`].

use crate::{
    deployer::Deployer,
    error::RunError,
    ledger::DeploymentLedger,
    plan::{DeployStep, DeploymentPlan, LinkStep, Step, find_confirmed},
    traits::{ContractFactory, VerificationService},
    types::{CompletedLink, DeploymentReport, VerificationRequest},
    verifier::Verifier,
};

/// Drives a plan step by step: each step starts only after the previous one
/// is confirmed, and the first fatal error stops the run.
pub struct Orchestrator<F, V> {
    deployer: Deployer<F>,
    verifier: Verifier<V>,
    ledger: Option<DeploymentLedger>,
}

impl<F: ContractFactory, V: VerificationService> Orchestrator<F, V> {
    pub fn new(factory: F, verifier: Verifier<V>) -> Self {
        Self {
            deployer: Deployer::new(factory),
            verifier,
            ledger: None,
        }
    }

    /// Record every confirmed step in `ledger`.
    pub fn with_ledger(mut self, ledger: DeploymentLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn deployer(&self) -> &Deployer<F> {
        &self.deployer
    }

    pub async fn run(&self, plan: &DeploymentPlan) -> Result<DeploymentReport, RunError> {
        plan.validate()?;

        tracing::info!(
            steps = plan.len(),
            verification = self.verifier.is_present(),
            "Starting deployment plan..."
        );

        let mut report = DeploymentReport::default();

        for (index, step) in plan.iter().enumerate() {
            tracing::info!(step = index + 1, total = plan.len(), "Step: {}", step);

            match step {
                Step::Deploy(deploy) => {
                    self.deploy_step(index, step, deploy, &mut report).await?;
                }
                Step::Link(link) => {
                    self.link_step(index, step, link, &mut report).await?;
                }
            }
        }

        tracing::info!(
            contracts = report.contracts.len(),
            links = report.links.len(),
            "Deployment complete"
        );

        Ok(report)
    }

    async fn deploy_step(
        &self,
        index: usize,
        step: &Step,
        deploy: &DeployStep,
        report: &mut DeploymentReport,
    ) -> Result<(), RunError> {
        let spec = deploy.resolve(index, &report.contracts)?;

        tracing::info!(
            contract = %spec.contract_name,
            args = ?spec.constructor_args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Deploying {}...",
            spec.contract_name
        );

        let contract =
            self.deployer
                .deploy(&spec)
                .await
                .map_err(|source| RunError::Deployment {
                    index,
                    step: step.to_string(),
                    source,
                    deployed: report.contracts.clone(),
                })?;

        tracing::info!("{} deployed at {}", contract.name, contract.address);
        self.record(|ledger| ledger.record_contract(&contract));

        if deploy.verify {
            if let Some(request) = VerificationRequest::for_contract(&contract, &spec) {
                let outcome = self.verifier.verify(&request).await;
                report.verifications.push((contract.name.clone(), outcome));
            }
        }

        report.contracts.push(contract);
        Ok(())
    }

    async fn link_step(
        &self,
        index: usize,
        step: &Step,
        link: &LinkStep,
        report: &mut DeploymentReport,
    ) -> Result<(), RunError> {
        let target = find_confirmed(index, &report.contracts, &link.target)?;
        let dependency = find_confirmed(index, &report.contracts, &link.dependency)?;

        let tx_hash = self
            .deployer
            .link(target, dependency, &link.function)
            .await
            .map_err(|source| RunError::Link {
                index,
                step: step.to_string(),
                source,
                deployed: report.contracts.clone(),
            })?;

        let completed = CompletedLink {
            target: link.target.clone(),
            dependency: link.dependency.clone(),
            function: link.function.clone(),
            tx_hash,
        };
        self.record(|ledger| ledger.record_link(&completed));
        report.links.push(completed);
        Ok(())
    }

    /// Ledger failures are reported but never abort a run whose transactions
    /// already went through.
    fn record(&self, write: impl FnOnce(&DeploymentLedger) -> anyhow::Result<()>) {
        if let Some(ledger) = &self.ledger {
            if let Err(e) = write(ledger) {
                tracing::error!(
                    path = %ledger.path().display(),
                    error = %format!("{e:#}"),
                    "Failed to update deployments file"
                );
            }
        }
    }
}
