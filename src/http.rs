//! JSON-over-HTTP with bounded retry, shared by the model providers.
//!
//! - HTTP 429 and 5xx are retried
//! - other 4xx fail immediately
//! - network errors are retried
//! - backoff is 1s, 2s, 4s, ... capped at 32s, or the server's
//!   `Retry-After` when it sends one

use anyhow::{anyhow, bail, Result};
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Build a client with a per-request timeout.
pub fn client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

pub fn backoff_delay(attempt: u32, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
    {
        return Duration::from_secs(secs.clamp(1, 60));
    }
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// POST `body` to `url` and decode the JSON response.
///
/// `label` names the service in error messages (e.g. `"Groq"`).
pub async fn post_json(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;
    let mut retry_after: Option<HeaderValue> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt, retry_after.as_ref());
            tracing::warn!(service = label, attempt, delay_secs = delay.as_secs(), "retrying request");
            tokio::time::sleep(delay).await;
        }
        retry_after = None;

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }

                if is_retryable(status) {
                    retry_after = response.headers().get("retry-after").cloned();
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow!("{} connection error ({}): {}", label, url, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", label)))
}
