//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for a single HTTP request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC and explorer requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result deserializes fine into an `Option<T>`, which is how pending
/// receipts are reported.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    extract_result(method, result)
}

fn extract_result<T: DeserializeOwned>(method: &str, response: Value) -> Result<T, anyhow::Error> {
    if let Some(error) = response.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = response
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// `Ok(None)` and transient errors both mean "not yet"; the last error is
/// reported if the timeout elapses.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = tokio::time::Instant::now();
    let mut last_error = None;

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::trace!(target_name = %name, "Not ready yet, retrying...");
            }
            Err(e) => {
                tracing::trace!(error = %e, target_name = %name, "Check failed, retrying...");
                last_error = Some(e);
            }
        }

        if start.elapsed() + interval > timeout {
            let err = anyhow::anyhow!("Timeout after {:?} waiting for {}", timeout, name);
            return Err(match last_error {
                Some(last) => err.context(format!("last error: {last:#}")),
                None => err,
            });
        }

        tokio::time::sleep(interval).await;
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &str) -> Result<u64, anyhow::Error> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", value))
}
