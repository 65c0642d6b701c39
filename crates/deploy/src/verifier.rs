//! Best-effort source verification gated on a configured credential.

use crate::{
    traits::VerificationService,
    types::{VerificationOutcome, VerificationRequest},
};

/// Source verification capability, decided once at startup.
///
/// Without a credential the verifier is [`Verifier::Absent`] and every request
/// is skipped without contacting any service.
#[derive(Debug, Clone)]
pub enum Verifier<V> {
    Present(V),
    Absent,
}

impl<V: VerificationService> Verifier<V> {
    /// Build the capability from an optional credential. An empty credential
    /// counts as absent, and `make` is only invoked when one is present.
    pub fn from_credential(credential: Option<&str>, make: impl FnOnce(String) -> V) -> Self {
        match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(credential) => Self::Present(make(credential.to_string())),
            None => Self::Absent,
        }
    }

    /// Same as [`Verifier::from_credential`] for services whose construction can fail.
    pub fn try_from_credential<E>(
        credential: Option<&str>,
        make: impl FnOnce(String) -> Result<V, E>,
    ) -> Result<Self, E> {
        match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(credential) => make(credential.to_string()).map(Self::Present),
            None => Ok(Self::Absent),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Verify a deployed contract. Never fails: service errors are logged and
    /// reported as [`VerificationOutcome::Failed`].
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        let service = match self {
            Self::Present(service) => service,
            Self::Absent => {
                tracing::debug!(
                    contract = %request.contract_name,
                    "No verification credential configured, skipping verification"
                );
                return VerificationOutcome::Skipped;
            }
        };

        tracing::info!(
            contract = %request.contract_name,
            address = %request.address,
            service = V::SERVICE_NAME,
            "Verifying contract..."
        );

        match service.submit(request).await {
            Ok(()) => {
                tracing::info!(contract = %request.contract_name, "Contract verified");
                VerificationOutcome::Verified
            }
            Err(e) if e.is_already_verified() => {
                tracing::info!(contract = %request.contract_name, "Contract already verified");
                VerificationOutcome::AlreadyVerified
            }
            Err(e) => {
                tracing::warn!(
                    contract = %request.contract_name,
                    address = %request.address,
                    error = %e,
                    "Verification failed, continuing deployment"
                );
                VerificationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
