//! Test helpers for the Orchestration API

#[cfg(test)]
use super::{Client, ClientSettings, Credentials, RetryConfig};

#[cfg(test)]
pub const TEST_SITE_ID: &str = "test-site";

#[cfg(test)]
pub const TEST_CUSTOMER_ID: &str = "test-customer";

#[cfg(test)]
#[allow(dead_code)]
pub fn test_settings(url: &str) -> ClientSettings {
    ClientSettings {
        base_url: url.to_string(),
        customer_id: TEST_CUSTOMER_ID.to_string(),
        credentials: Credentials::Static {
            token: "test-token".to_string(),
        },
        insecure: true,
        site_id: Some(TEST_SITE_ID.to_string()),
    }
}

/// Client with a static token, a fixed site ID and millisecond retry backoff
#[cfg(test)]
#[allow(dead_code)]
pub fn create_test_client(url: &str) -> Client {
    Client::with_config(
        test_settings(url),
        RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_api_query_params() {
        use common::ApiQueryParams;

        let params = ApiQueryParams::new()
            .add("farmName", "Farm A")
            .add("limit", 123)
            .add_optional("siteId", Some("s1"))
            .add_optional("none", None::<String>)
            .asynchronous();

        let query = params.to_query_string();
        assert!(query.starts_with('?'));
        assert!(query.contains("farmName=Farm%20A"));
        assert!(query.contains("limit=123"));
        assert!(query.contains("siteId=s1"));
        assert!(query.contains("async=true"));
        assert!(!query.contains("none="));
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_connection_pool_config() {
        use pool::ConnectionPoolConfig;

        let config = ConnectionPoolConfig::default();
        assert_eq!(config.max_idle_per_host, 10);
        assert_eq!(config.idle_timeout.as_secs(), 90);
        assert_eq!(config.connect_timeout.as_secs(), 10);
        assert_eq!(config.request_timeout.as_secs(), 30);
        assert_eq!(config.tcp_keepalive.unwrap().as_secs(), 30);
    }

    #[test]
    fn test_connection_stats() {
        use pool::{ConnectionPoolConfig, ConnectionPoolManager, RequestOutcome};

        let manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());

        let stats = manager.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.failed_requests, 0);

        manager.record_request(RequestOutcome::Success);
        manager.record_request(RequestOutcome::Failure);
        manager.record_request(RequestOutcome::Retried);

        let stats = manager.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.retried_requests, 1);
    }

    #[test]
    fn test_api_error_formatting() {
        let details = ApiErrorDetails {
            message: Some("Catalog name already in use".to_string()),
            detail: None,
            parameters: Some(vec![common::NameValueStringPair::new("Name", "cat")]),
        };

        let error = ApiError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            details: Some(Box::new(details)),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Bad Request"));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_custom_properties_helpers() {
        use common::{find_property, set_property, NameValueStringPair};

        let mut props = vec![NameValueStringPair::new("StorageType", "Standard_LRS")];
        set_property(&mut props, "StorageType", "Premium_LRS");
        set_property(&mut props, "UseManagedDisks", "true");

        assert_eq!(props.len(), 2);
        assert_eq!(find_property(&props, "StorageType"), Some("Premium_LRS"));
        assert_eq!(find_property(&props, "UseManagedDisks"), Some("true"));
        assert_eq!(find_property(&props, "Zones"), None);
    }
}
