//! Dataset download with retry on transient failures.

use std::time::Duration;

use crime_insights_incident_models::NewIncident;

use crate::IngestError;
use crate::dc::parse_dataset;

/// Retries after the first attempt. Backoff doubles from 2s.
const MAX_RETRIES: u32 = 4;

/// Per-request timeout. The full-year export is tens of megabytes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Downloads and parses a DC dataset document.
///
/// # Errors
///
/// * If the request still fails after all retries
/// * If the server answers with a non-success status
/// * If the body is not a recognized dataset document
pub async fn fetch_dataset(url: &str) -> Result<Vec<NewIncident>, IngestError> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    log::info!("Fetching dataset from {url}");
    let body = send_text(&client, url).await?;
    log::info!("Downloaded {} bytes", body.len());

    parse_dataset(&body)
}

async fn send_text(client: &reqwest::Client, url: &str) -> Result<String, IngestError> {
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let retryable = match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.text().await?);
                }
                let error = IngestError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                };
                if !(status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS)
                {
                    return Err(error);
                }
                log::warn!("  HTTP {status}");
                error
            }
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                IngestError::Http(e)
            }
            Err(e) => return Err(IngestError::Http(e)),
        };

        if attempt >= MAX_RETRIES {
            return Err(retryable);
        }
        attempt += 1;
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
