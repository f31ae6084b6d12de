use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::auth::{Authenticator, Credentials, MeResponse};
use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, RequestOutcome};

pub const CUSTOMER_ID_HEADER: &str = "Citrix-CustomerId";
pub const INSTANCE_ID_HEADER: &str = "Citrix-InstanceId";
pub const TRANSACTION_ID_HEADER: &str = "Citrix-TransactionId";

/// Citrix Orchestration API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    customer_id: String,
    auth: Authenticator,
    site_id: OnceCell<String>,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

/// Everything needed to build a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub customer_id: String,
    pub credentials: Credentials,
    pub insecure: bool,
    /// Known site ID; when None it is discovered through GET /me on first use
    pub site_id: Option<String>,
}

impl Client {
    /// Create a new API client with default retry configuration
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        Self::with_config(settings, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(settings: ClientSettings, retry_config: RetryConfig) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client(settings.insecure)?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::Configuration("base URL is empty".to_string()));
        }

        let site_id = match settings.site_id {
            Some(id) => OnceCell::new_with(Some(id)),
            None => OnceCell::new(),
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                customer_id: settings.customer_id,
                auth: Authenticator::new(settings.credentials),
                site_id,
                retry_config,
                pool_manager,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn customer_id(&self) -> &str {
        &self.inner.customer_id
    }

    /// Site (instance) ID, discovered through GET /me on first use
    pub async fn site_id(&self) -> Result<String, ApiError> {
        self.inner
            .site_id
            .get_or_try_init(|| self.discover_site_id())
            .await
            .cloned()
    }

    async fn discover_site_id(&self) -> Result<String, ApiError> {
        let url = format!("{}/me", self.inner.base_url);
        tracing::debug!("Discovering site ID from: {}", url);

        let authorization = self
            .inner
            .auth
            .authorization_header(&self.inner.http_client)
            .await?;
        let response = self
            .inner
            .http_client
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .header(CUSTOMER_ID_HEADER, &self.inner.customer_id)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return self.handle_error_response(response).await;
        }

        let me: MeResponse = self.parse_success_response(response).await?;
        me.site_for(&self.inner.customer_id)
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Configuration(format!(
                    "no site found for customer {}",
                    self.inner.customer_id
                ))
            })
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET request to: {}", url);

        let response = self
            .execute_with_retry(|| self.inner.http_client.get(&url), path)
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("POST request to: {}", url);

        let response = self
            .execute_with_retry(|| self.inner.http_client.post(&url).json(body), path)
            .await?;
        self.parse_success_response(response).await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        tracing::debug!("PATCH request to: {}", url);

        self.execute_with_retry(|| self.inner.http_client.patch(&url).json(body), path)
            .await
            .map(|_| ())
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        tracing::debug!("DELETE request to: {}", url);

        self.execute_with_retry(|| self.inner.http_client.delete(&url), path)
            .await
            .map(|_| ())
    }

    /// POST that the API answers with 202 Accepted; returns the job ID
    pub async fn post_async<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        self.send_async(Method::POST, path, Some(body)).await
    }

    /// PATCH that the API answers with 202 Accepted; returns the job ID
    pub async fn patch_async<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ApiError> {
        self.send_async(Method::PATCH, path, Some(body)).await
    }

    /// DELETE that the API answers with 202 Accepted; returns the job ID
    pub async fn delete_async(&self, path: &str) -> Result<String, ApiError> {
        self.send_async::<()>(Method::DELETE, path, None).await
    }

    async fn send_async<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let url = self.url(path);
        tracing::debug!("{} (async) request to: {}", method, url);

        let response = self
            .execute_with_retry(
                || {
                    let builder = self.inner.http_client.request(method.clone(), &url);
                    match body {
                        Some(b) => builder.json(b),
                        None => builder,
                    }
                },
                path,
            )
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            tracing::warn!(
                "Expected 202 Accepted from {}, got {}",
                path,
                response.status()
            );
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(job_id_from_location)
            .ok_or(ApiError::MissingJobLocation)
    }

    /// Request counters since the client was built
    pub fn connection_stats(&self) -> super::pool::ConnectionStats {
        self.inner.pool_manager.stats()
    }

    /// Machine catalog operations
    pub fn machine_catalogs(&self) -> super::machine_catalogs::MachineCatalogsApi<'_> {
        super::machine_catalogs::MachineCatalogsApi::new(self)
    }

    /// Machine operations
    pub fn machines(&self) -> super::machines::MachinesApi<'_> {
        super::machines::MachinesApi::new(self)
    }

    /// Hypervisor and resource pool lookups
    pub fn hypervisors(&self) -> super::hypervisors::HypervisorsApi<'_> {
        super::hypervisors::HypervisorsApi::new(self)
    }

    /// Job polling
    pub fn jobs(&self) -> super::jobs::JobsApi<'_> {
        super::jobs::JobsApi::new(self)
    }

    /// `$batch` fan-out
    pub fn batch(&self) -> super::batch::BatchApi<'_> {
        super::batch::BatchApi::new(self)
    }

    /// PVS streaming lookups
    pub fn pvs(&self) -> super::pvs::PvsApi<'_> {
        super::pvs::PvsApi::new(self)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Execute request with retry logic
    ///
    /// `request_fn` builds a fresh request for every attempt; authentication and
    /// tenant headers are added here. Returns the response on any 2xx status.
    async fn execute_with_retry<F>(&self, request_fn: F, path: &str) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let site_id = self.site_id().await?;
        let transaction_id = uuid::Uuid::new_v4().to_string();
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner
                    .pool_manager
                    .record_request(RequestOutcome::Retried);
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let authorization = self
                .inner
                .auth
                .authorization_header(&self.inner.http_client)
                .await?;

            let result = request_fn()
                .header(AUTHORIZATION, authorization)
                .header(CUSTOMER_ID_HEADER, &self.inner.customer_id)
                .header(INSTANCE_ID_HEADER, &site_id)
                .header(TRANSACTION_ID_HEADER, &transaction_id)
                .header(ACCEPT, "application/json")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner
                            .pool_manager
                            .record_request(RequestOutcome::Success);
                        return Ok(response);
                    }

                    self.inner
                        .pool_manager
                        .record_request(RequestOutcome::Failure);

                    if status == StatusCode::UNAUTHORIZED {
                        self.inner.auth.invalidate().await;
                        return Err(ApiError::AuthError);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    self.inner
                        .pool_manager
                        .record_request(RequestOutcome::Failure);

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; empty bodies deserialize as JSON null
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (message, details) = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => (
                err_resp.error_message.clone().unwrap_or_else(|| text.clone()),
                Some(Box::new(ApiErrorDetails {
                    message: err_resp.error_message,
                    detail: err_resp.detail,
                    parameters: err_resp.parameters,
                })),
            ),
            Err(_) => (text, None),
        };

        Err(ApiError::ApiError {
            status,
            message,
            details,
        })
    }
}

/// Extracts the job ID from a `Location` header such as `https://host/cvad/manage/Jobs/<id>`
pub fn job_id_from_location(location: &str) -> Option<String> {
    let without_query = location.split('?').next().unwrap_or(location);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "./client_test.rs"]
mod client_test;
