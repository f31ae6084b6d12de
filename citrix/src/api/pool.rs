//! HTTP client construction and request accounting for the Orchestration API

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const USER_AGENT: &str = concat!("terraform-provider-citrix/", env!("CARGO_PKG_VERSION"));

/// Transport tuning. `request_timeout` is taken from `RetryConfig::timeout_seconds`.
#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure,
    Retried,
}

/// Snapshot of the counters kept by [`ConnectionPoolManager`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub retried_requests: u64,
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

pub struct ConnectionPoolManager {
    config: ConnectionPoolConfig,
    counters: Counters,
}

impl ConnectionPoolManager {
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
        }
    }

    pub fn record_request(&self, outcome: RequestOutcome) {
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RequestOutcome::Success => return,
            RequestOutcome::Failure => &self.counters.failed,
            RequestOutcome::Retried => &self.counters.retried,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_requests: self.counters.total.load(Ordering::Relaxed),
            failed_requests: self.counters.failed.load(Ordering::Relaxed),
            retried_requests: self.counters.retried.load(Ordering::Relaxed),
        }
    }

    /// Builds the shared HTTP client; `insecure` skips certificate checks for self-signed controllers
    pub fn build_client(&self, insecure: bool) -> Result<reqwest::Client, reqwest::Error> {
        let config = &self.config;
        let builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host);

        match config.tcp_keepalive {
            Some(keepalive) => builder.tcp_keepalive(keepalive).build(),
            None => builder.build(),
        }
    }
}
