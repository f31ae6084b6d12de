//! `$batch` fan-out with per-item success accounting

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::client::{job_id_from_location, Client};
use super::common::{find_property, NameValueStringPair};
use super::error::ApiError;

pub const BATCH_PATH: &str = "/$batch";
pub const MAX_BATCH_ITEMS: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchRequestItem {
    pub reference: String,
    pub method: String,
    pub relative_url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<NameValueStringPair>,
    /// JSON document serialized to a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl BatchRequestItem {
    pub fn new(
        reference: impl Into<String>,
        method: impl Into<String>,
        relative_url: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            method: method.into(),
            relative_url: relative_url.into(),
            headers: vec![NameValueStringPair::new("Accept", "application/json")],
            body: None,
        }
    }

    pub fn with_json_body<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let text = serde_json::to_string(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to serialize batch body: {}", e)))?;
        self.headers
            .push(NameValueStringPair::new("Content-Type", "application/json"));
        self.body = Some(text);
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchRequest<'a> {
    items: &'a [BatchRequestItem],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchResponse {
    #[serde(default)]
    items: Vec<BatchResponseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchResponseItem {
    #[serde(default)]
    reference: String,
    code: u16,
    #[serde(default)]
    headers: Vec<NameValueStringPair>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub reference: String,
    pub message: String,
}

/// Tally of a batch run; callers compare `succeeded` against `requested`
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub requested: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.requested
    }

    pub fn failed_references(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.reference.as_str()).collect()
    }

    /// Diagnostic detail for a partial run, naming both counts and the failed references
    pub fn shortfall_message(&self, action: &str) -> String {
        format!(
            "{} succeeded for {} of {} requested items. Failed: {}",
            action,
            self.succeeded,
            self.requested,
            self.failures
                .iter()
                .map(|f| format!("{} ({})", f.reference, f.message))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

pub struct BatchApi<'a> {
    client: &'a Client,
    job_timeout: Duration,
    poll_interval: Duration,
}

impl<'a> BatchApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            job_timeout: super::jobs::CATALOG_JOB_TIMEOUT,
            poll_interval: super::jobs::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_job_timing(mut self, poll_interval: Duration, job_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.job_timeout = job_timeout;
        self
    }

    /// Sends `items` in chunks of [`MAX_BATCH_ITEMS`], waiting on any job an item starts
    pub async fn perform(&self, items: Vec<BatchRequestItem>) -> Result<BatchOutcome, ApiError> {
        let mut outcome = BatchOutcome {
            requested: items.len(),
            ..Default::default()
        };

        for chunk in items.chunks(MAX_BATCH_ITEMS) {
            tracing::debug!("Submitting batch of {} items", chunk.len());
            let response: BatchResponse = self
                .client
                .post(BATCH_PATH, &BatchRequest { items: chunk })
                .await?;

            let mut unanswered: HashSet<&str> = chunk.iter().map(|req| req.reference.as_str()).collect();
            let mut pending_jobs = Vec::new();
            for item in response.items {
                // Each requested reference is tallied once
                if !unanswered.remove(item.reference.as_str()) {
                    tracing::warn!(
                        "Ignoring batch result for unexpected reference {:?} (HTTP {})",
                        item.reference,
                        item.code
                    );
                    continue;
                }

                if !(200..300).contains(&item.code) {
                    outcome.failures.push(BatchFailure {
                        reference: item.reference,
                        message: failure_message(item.code, item.content.as_deref()),
                    });
                    continue;
                }

                let job_id = (item.code == 202)
                    .then(|| find_property(&item.headers, "Location"))
                    .flatten()
                    .and_then(job_id_from_location);
                match job_id {
                    Some(job_id) => pending_jobs.push((item.reference, job_id)),
                    None => outcome.succeeded += 1,
                }
            }

            for missing in chunk
                .iter()
                .filter(|req| unanswered.contains(req.reference.as_str()))
            {
                outcome.failures.push(BatchFailure {
                    reference: missing.reference.clone(),
                    message: "no result returned for item".to_string(),
                });
            }

            let jobs = self.client.jobs().with_poll_interval(self.poll_interval);
            let results = join_all(
                pending_jobs
                    .iter()
                    .map(|(_, job_id)| jobs.wait_for_job(job_id, self.job_timeout)),
            )
            .await;

            for ((reference, _), result) in pending_jobs.into_iter().zip(results) {
                match result {
                    Ok(_) => outcome.succeeded += 1,
                    Err(e) => outcome.failures.push(BatchFailure {
                        reference,
                        message: e.to_string(),
                    }),
                }
            }
        }

        if !outcome.is_complete() {
            tracing::warn!("{}", outcome.shortfall_message("Batch operation"));
        }
        let stats = self.client.connection_stats();
        tracing::debug!(
            "Batch of {} items done; {} API requests so far ({} failed, {} retried)",
            outcome.requested,
            stats.total_requests,
            stats.failed_requests,
            stats.retried_requests
        );

        Ok(outcome)
    }
}

fn failure_message(code: u16, content: Option<&str>) -> String {
    let detail = content
        .and_then(|c| serde_json::from_str::<super::common::ApiErrorResponse>(c).ok())
        .and_then(|e| e.error_message.or(e.detail))
        .or_else(|| content.map(str::to_string))
        .unwrap_or_default();
    format!("HTTP {}: {}", code, detail)
}

/// Free-standing form of [`BatchApi::perform`]
pub async fn perform_batch_operation(
    client: &Client,
    items: Vec<BatchRequestItem>,
) -> Result<BatchOutcome, ApiError> {
    client.batch().perform(items).await
}
