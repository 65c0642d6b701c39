//! Source verification capability.

use std::future::Future;

use crate::{error::VerificationFailure, types::VerificationRequest};

/// An external service that publishes contract sources.
pub trait VerificationService: Send + Sync {
    /// Human readable name used in logs.
    const SERVICE_NAME: &'static str;

    /// Submit `request` and wait for the service's verdict.
    fn submit(
        &self,
        request: &VerificationRequest,
    ) -> impl Future<Output = Result<(), VerificationFailure>> + Send;
}
