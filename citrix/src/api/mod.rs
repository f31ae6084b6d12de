//! Citrix Orchestration API client
//!
//! Covers the subset of the Orchestration REST API the provider manages: machine catalogs,
//! machines, hypervisor resource lookups, PVS streaming lookups, jobs and `$batch`.

pub mod auth;
pub mod batch;
pub mod client;
pub mod common;
pub mod error;
pub mod hypervisors;
pub mod jobs;
pub mod machine_catalogs;
pub mod machines;
pub mod pool;
pub mod pvs;
pub mod test_helpers;

pub use auth::Credentials;
pub use client::{Client, ClientSettings, RetryConfig};
pub use common::{ApiErrorDetails, ApiQueryParams, NameValueStringPair, RefResponse};
pub use error::ApiError;
