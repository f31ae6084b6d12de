//! Asynchronous job polling

use serde::Deserialize;
use std::time::Duration;

use super::client::Client;
use super::error::ApiError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Ceiling for long catalog operations such as create or image update
pub const CATALOG_JOB_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum JobStatus {
    Unknown,
    NotStarted,
    InProgress,
    Complete,
    Failed,
    Canceled,
    #[serde(other)]
    Other,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error_string: Option<String>,
    #[serde(default)]
    pub overall_progress_percent: Option<i32>,
}

pub struct JobsApi<'a> {
    client: &'a Client,
    poll_interval: Duration,
}

impl<'a> JobsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn get(&self, job_id: &str) -> Result<Job, ApiError> {
        let path = format!("/Jobs/{}", urlencoding::encode(job_id));
        self.client.get(&path).await
    }

    /// Polls a job until it completes, fails, is canceled or `timeout` elapses
    pub async fn wait_for_job(&self, job_id: &str, timeout: Duration) -> Result<Job, ApiError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self.get(job_id).await?;
            tracing::debug!(
                "Job {} status {:?} ({}%)",
                job_id,
                job.status,
                job.overall_progress_percent.unwrap_or(0)
            );

            match job.status {
                JobStatus::Complete => return Ok(job),
                JobStatus::Failed | JobStatus::Canceled => {
                    return Err(ApiError::JobFailed {
                        job_id: job_id.to_string(),
                        status: format!("{:?}", job.status),
                        message: job.error_string.unwrap_or_default(),
                    });
                }
                _ => {}
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                tracing::warn!("Job {} did not finish within {:?}", job_id, timeout);
                return Err(ApiError::Timeout(timeout.as_secs()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn test_wait_for_completed_job() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/Jobs/job-1")
            .with_status(200)
            .with_body(r#"{"Id":"job-1","Status":"Complete","OverallProgressPercent":100}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let job = client
            .jobs()
            .wait_for_job("job-1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_failed_job_carries_error_string() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/Jobs/job-2")
            .with_status(200)
            .with_body(r#"{"Id":"job-2","Status":"Failed","ErrorString":"Image not found"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client
            .jobs()
            .wait_for_job("job-2", Duration::from_secs(5))
            .await;

        match result {
            Err(ApiError::JobFailed { status, message, .. }) => {
                assert_eq!(status, "Failed");
                assert_eq!(message, "Image not found");
            }
            other => panic!("expected JobFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_running_job_times_out() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/Jobs/job-3")
            .with_status(200)
            .with_body(r#"{"Id":"job-3","Status":"InProgress","OverallProgressPercent":40}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client
            .jobs()
            .with_poll_interval(Duration::from_millis(10))
            .wait_for_job("job-3", Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let job: Job = serde_json::from_str(r#"{"Id":"j","Status":"Suspended"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Other);
        assert!(!job.status.is_finished());
    }
}
