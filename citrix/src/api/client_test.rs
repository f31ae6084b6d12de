#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::{create_test_client, test_settings, TEST_SITE_ID};
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_sends_citrix_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/MachineCatalogs/cat-1")
            .match_header("authorization", "CwsAuth Bearer=test-token")
            .match_header("citrix-customerid", "test-customer")
            .match_header("citrix-instanceid", TEST_SITE_ID)
            .match_header("accept", "application/json")
            .match_header(
                "citrix-transactionid",
                Matcher::Regex("^[0-9a-f-]{36}$".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Id":"cat-1"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let value: serde_json::Value = client.get("/MachineCatalogs/cat-1").await.unwrap();

        assert_eq!(value["Id"], "cat-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_site_id_is_discovered_once() {
        let mut server = Server::new_async().await;
        let me = server
            .mock("GET", "/me")
            .with_status(200)
            .with_body(r#"{"Customers":[{"Id":"test-customer","Sites":[{"Id":"site-42"}]}]}"#)
            .expect(1)
            .create_async()
            .await;
        let api = server
            .mock("GET", "/Machines/m1")
            .match_header("citrix-instanceid", "site-42")
            .with_status(200)
            .with_body("{}")
            .expect(2)
            .create_async()
            .await;

        let mut settings = test_settings(&server.url());
        settings.site_id = None;
        let client = Client::new(settings).unwrap();

        let _: serde_json::Value = client.get("/Machines/m1").await.unwrap();
        let _: serde_json::Value = client.get("/Machines/m1").await.unwrap();
        assert_eq!(client.site_id().await.unwrap(), "site-42");

        me.assert_async().await;
        api.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_body_parses_as_null() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/empty")
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let value: Option<serde_json::Value> = client.get("/empty").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_not_found_is_reported_with_details() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/MachineCatalogs/missing")
            .with_status(404)
            .with_body(
                r#"{"ErrorMessage":"Object does not exist.","Detail":"MachineCatalog missing"}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, ApiError> =
            client.get("/MachineCatalogs/missing").await;

        let err = result.unwrap_err();
        assert!(err.is_not_found());
        match err {
            ApiError::ApiError {
                message, details, ..
            } => {
                assert_eq!(message, "Object does not exist.");
                assert_eq!(
                    details.unwrap().detail.as_deref(),
                    Some("MachineCatalog missing")
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Machines")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, ApiError> = client.get("/Machines").await;

        assert!(matches!(result, Err(ApiError::AuthError)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_exhausted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Machines")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, ApiError> = client.get("/Machines").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;

        let stats = client.connection_stats();
        assert_eq!(stats.retried_requests, 2);
        assert_eq!(stats.failed_requests, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Zones")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, ApiError> = client.get("/Zones").await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_async_returns_job_id() {
        let mut server = Server::new_async().await;
        let location = format!("{}/Jobs/job-123", server.url());
        let mock = server
            .mock("POST", "/MachineCatalogs")
            .match_query(Matcher::UrlEncoded("async".into(), "true".into()))
            .match_body(Matcher::PartialJson(json!({"Name": "cat"})))
            .with_status(202)
            .with_header("location", &location)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let job_id = client
            .post_async("/MachineCatalogs?async=true", &json!({"Name": "cat"}))
            .await
            .unwrap();

        assert_eq!(job_id, "job-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_async_without_location_fails() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/MachineCatalogs/cat-1")
            .with_status(202)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.delete_async("/MachineCatalogs/cat-1").await;
        assert!(matches!(result, Err(ApiError::MissingJobLocation)));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let client = create_test_client("https://api.cloud.com/cvad/manage/");
        assert_eq!(client.base_url(), "https://api.cloud.com/cvad/manage");
    }

    #[test]
    fn test_job_id_from_location() {
        assert_eq!(
            job_id_from_location("https://api.cloud.com/cvad/manage/Jobs/abc-1"),
            Some("abc-1".to_string())
        );
        assert_eq!(
            job_id_from_location("/Jobs/abc-2/?x=1"),
            Some("abc-2".to_string())
        );
        assert_eq!(job_id_from_location(""), None);
    }
}
