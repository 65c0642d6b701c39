//! Etherscan-compatible source verification.
//!
//! Verification is a two step exchange: `verifysourcecode` queues the job and
//! returns a GUID, then `checkverifystatus` is polled until the job leaves the
//! queue.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::{
    artifacts::ArtifactStore, config::VerificationConfig, error::VerificationFailure, rpc,
    traits::VerificationService, types::VerificationRequest,
};

const PENDING_RESULT: &str = "Pending in queue";
const PASS_RESULT: &str = "Pass - Verified";

/// Generic Etherscan API response envelope.
#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

/// State of a queued verification job.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobStatus {
    Pending,
    Verified,
    Failed(String),
}

impl ApiResponse {
    /// Interpret a `verifysourcecode` response: the job GUID or a rejection.
    fn into_guid(self) -> Result<String, VerificationFailure> {
        if self.status == "1" {
            Ok(self.result)
        } else {
            Err(VerificationFailure::Rejected(self.reason()))
        }
    }

    fn job_status(&self) -> JobStatus {
        if self.result == PENDING_RESULT {
            JobStatus::Pending
        } else if self.status == "1" || self.result == PASS_RESULT {
            JobStatus::Verified
        } else {
            JobStatus::Failed(self.reason())
        }
    }

    fn reason(&self) -> String {
        if self.result.is_empty() {
            self.message.clone()
        } else {
            self.result.clone()
        }
    }
}

/// Client for an Etherscan-compatible explorer API.
pub struct EtherscanClient {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    artifacts: ArtifactStore,
    status_attempts: u32,
    status_interval: Duration,
}

impl EtherscanClient {
    /// `chain_id` is only used when the configuration does not set one.
    pub fn new(
        config: &VerificationConfig,
        api_key: String,
        chain_id: u64,
        artifacts: ArtifactStore,
    ) -> anyhow::Result<Self> {
        let mut api_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid verification API URL: {}", config.api_url))?;
        let chain_id = config.chain_id.unwrap_or(chain_id);
        api_url
            .query_pairs_mut()
            .append_pair("chainid", &chain_id.to_string());

        Ok(Self {
            client: rpc::create_client()?,
            api_url,
            api_key,
            artifacts,
            status_attempts: config.status_attempts.max(1),
            status_interval: Duration::from_secs(config.status_interval_secs),
        })
    }

    /// Build the `verifysourcecode` form for `request`.
    fn verification_form(
        &self,
        request: &VerificationRequest,
    ) -> Result<Vec<(&'static str, String)>, VerificationFailure> {
        let artifact = self
            .artifacts
            .load(&request.contract_name)
            .map_err(VerificationFailure::Transport)?;
        let build_info = artifact.build_info().map_err(VerificationFailure::Transport)?;
        let constructor_args = artifact
            .encode_constructor_args(&request.constructor_args)
            .map_err(VerificationFailure::Transport)?;

        Ok(vec![
            ("apikey", self.api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", request.address.to_string()),
            ("sourceCode", build_info.input.to_string()),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", artifact.qualified_name()),
            ("compilerversion", build_info.compiler_version()),
            // Misspelled on purpose: this is the parameter name the API expects.
            ("constructorArguements", hex::encode(constructor_args)),
        ])
    }

    async fn check_status(&self, guid: &str) -> Result<ApiResponse, VerificationFailure> {
        self.client
            .get(self.api_url.clone())
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await
            .context("Failed to send checkverifystatus request")
            .map_err(VerificationFailure::Transport)?
            .json()
            .await
            .context("Failed to parse checkverifystatus response")
            .map_err(VerificationFailure::Transport)
    }
}

impl VerificationService for EtherscanClient {
    const SERVICE_NAME: &'static str = "etherscan";

    async fn submit(&self, request: &VerificationRequest) -> Result<(), VerificationFailure> {
        let form = self.verification_form(request)?;

        let response: ApiResponse = self
            .client
            .post(self.api_url.clone())
            .form(&form)
            .send()
            .await
            .context("Failed to send verifysourcecode request")
            .map_err(VerificationFailure::Transport)?
            .json()
            .await
            .context("Failed to parse verifysourcecode response")
            .map_err(VerificationFailure::Transport)?;

        let guid = response.into_guid()?;
        tracing::debug!(contract = %request.contract_name, guid = %guid, "Verification queued");

        for attempt in 1..=self.status_attempts {
            tokio::time::sleep(self.status_interval).await;

            match self.check_status(&guid).await?.job_status() {
                JobStatus::Pending => {
                    tracing::debug!(guid = %guid, attempt, "Verification pending");
                }
                JobStatus::Verified => return Ok(()),
                JobStatus::Failed(reason) => return Err(VerificationFailure::Rejected(reason)),
            }
        }

        Err(VerificationFailure::Timeout {
            attempts: self.status_attempts,
        })
    }
}
