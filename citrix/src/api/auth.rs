//! Bearer token acquisition and site discovery

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use tokio::sync::RwLock;

use super::error::ApiError;

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECONDS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Clone)]
pub enum Credentials {
    /// Citrix Cloud API client (client credentials grant)
    Cloud {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
    /// On-premises Delivery Controller (basic auth against `/tokens`)
    OnPremises {
        token_url: String,
        username: String,
        password: String,
    },
    /// Pre-issued token, never refreshed
    Static { token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Cloud { token_url, client_id, .. } => f
                .debug_struct("Cloud")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::OnPremises {
                token_url,
                username,
                ..
            } => f
                .debug_struct("OnPremises")
                .field("token_url", token_url)
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Static { .. } => f.write_str("Static"),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct CloudTokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_lifetime")]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OnPremTokenResponse {
    token: String,
    #[serde(default, deserialize_with = "deserialize_lifetime")]
    expires_in: Option<i64>,
}

/// Citrix Cloud reports `expires_in` as a string, on-premises as a number
fn deserialize_lifetime<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrI64 {
        String(String),
        I64(i64),
    }

    match Option::<StringOrI64>::deserialize(deserializer)? {
        Some(StringOrI64::String(s)) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        Some(StringOrI64::I64(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}

/// Hands out bearer tokens, fetching a new one when the cached token is close to expiry
pub struct Authenticator {
    credentials: Credentials,
    cached: RwLock<Option<CachedToken>>,
}

impl Authenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: RwLock::new(None),
        }
    }

    /// Value for the `Authorization` header
    pub async fn authorization_header(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        Ok(format!("CwsAuth Bearer={}", self.token(http).await?))
    }

    pub async fn token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        if let Credentials::Static { token } = &self.credentials {
            return Ok(token.clone());
        }

        let now = Utc::now();
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(existing) = cached.as_ref() {
            if existing.is_fresh(now) {
                return Ok(existing.token.clone());
            }
        }

        let fresh = self.fetch_token(http).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token so the next request authenticates again
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn fetch_token(&self, http: &reqwest::Client) -> Result<CachedToken, ApiError> {
        let (token, lifetime) = match &self.credentials {
            Credentials::Cloud {
                token_url,
                client_id,
                client_secret,
            } => {
                tracing::debug!("Requesting cloud access token from: {}", token_url);
                let response = http
                    .post(token_url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                    ])
                    .send()
                    .await?;
                let body: CloudTokenResponse = Self::read_token_body(response).await?;
                (body.access_token, body.expires_in)
            }
            Credentials::OnPremises {
                token_url,
                username,
                password,
            } => {
                tracing::debug!("Requesting on-premises access token from: {}", token_url);
                let response = http
                    .post(token_url)
                    .basic_auth(username, Some(password))
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let body: OnPremTokenResponse = Self::read_token_body(response).await?;
                (body.token, body.expires_in)
            }
            Credentials::Static { token } => (token.clone(), None),
        };

        let lifetime = lifetime.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS);
        Ok(CachedToken {
            token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }

    async fn read_token_body<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ApiError::AuthError);
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                message: text,
                details: None,
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse token response: {}", e)))
    }
}

/// Response from GET /me
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeResponse {
    #[serde(default)]
    pub customers: Vec<MeCustomer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeCustomer {
    pub id: String,
    #[serde(default)]
    pub sites: Vec<MeSite>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeSite {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl MeResponse {
    /// First site of the matching customer; falls back to the first customer listed
    pub fn site_for(&self, customer_id: &str) -> Option<&str> {
        self.customers
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(customer_id))
            .or_else(|| self.customers.first())
            .and_then(|c| c.sites.first())
            .map(|s| s.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn cloud_token_is_fetched_once_and_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/cctrustoauth2/acme/tokens/clients")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "id".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"bearer","access_token":"tok-1","expires_in":"3600"}"#)
            .expect(1)
            .create_async()
            .await;

        let auth = Authenticator::new(Credentials::Cloud {
            token_url: format!("{}/cctrustoauth2/acme/tokens/clients", server.url()),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        });
        let http = reqwest::Client::new();

        assert_eq!(auth.token(&http).await.unwrap(), "tok-1");
        assert_eq!(
            auth.authorization_header(&http).await.unwrap(),
            "CwsAuth Bearer=tok-1"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tokens")
            .with_status(200)
            .with_body(r#"{"Token":"short","ExpiresIn":30}"#)
            .expect(2)
            .create_async()
            .await;

        let auth = Authenticator::new(Credentials::OnPremises {
            token_url: format!("{}/tokens", server.url()),
            username: "DOMAIN\\admin".to_string(),
            password: "pw".to_string(),
        });
        let http = reqwest::Client::new();

        // 30s lifetime is inside the refresh margin, so every call refetches
        auth.token(&http).await.unwrap();
        auth.token(&http).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_map_to_auth_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/tokens")
            .with_status(401)
            .create_async()
            .await;

        let auth = Authenticator::new(Credentials::OnPremises {
            token_url: format!("{}/tokens", server.url()),
            username: "u".to_string(),
            password: "p".to_string(),
        });
        let result = auth.token(&reqwest::Client::new()).await;
        assert!(matches!(result, Err(ApiError::AuthError)));
    }

    #[test]
    fn me_response_picks_matching_customer_site() {
        let me: MeResponse = serde_json::from_str(
            r#"{"Customers":[
                {"Id":"other","Sites":[{"Id":"s-other"}]},
                {"Id":"ACME","Sites":[{"Id":"s-acme","Name":"Primary"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(me.site_for("acme"), Some("s-acme"));
        assert_eq!(me.site_for("missing"), Some("s-other"));
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials::Cloud {
            token_url: "https://x".to_string(),
            client_id: "id".to_string(),
            client_secret: "super-secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }
}
