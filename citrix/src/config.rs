//! Provider configuration: schema values, `CITRIX_*` environment fallbacks and derived endpoints

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tf_provider::value::Value;
use tfplug::defaults::{resolve, EnvDefault, StaticDefault};

use crate::api::{ClientSettings, Credentials};
use crate::storefront::RemoteHost;

pub const ON_PREMISES_CUSTOMER_ID: &str = "CitrixOnPremises";
pub const BASE_URL_OVERRIDE_ENV: &str = "CITRIX_API_BASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontRemoteHostConfig {
    pub computer_name: Value<String>,
    pub ad_admin_username: Value<String>,
    pub ad_admin_password: Value<String>,
}

/// Provider block as sent by Terraform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub hostname: Value<String>,
    pub environment: Value<String>,
    pub customer_id: Value<String>,
    pub client_id: Value<String>,
    pub client_secret: Value<String>,
    pub disable_ssl_verification: Value<bool>,
    pub storefront_remote_host: Value<StorefrontRemoteHostConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CitrixEnvironment {
    #[default]
    Production,
    Staging,
    Japan,
    JapanStaging,
    Gov,
    GovStaging,
}

impl CitrixEnvironment {
    pub const NAMES: &'static [&'static str] = &[
        "Production",
        "Staging",
        "Japan",
        "JapanStaging",
        "Gov",
        "GovStaging",
    ];

    pub fn api_host(&self) -> &'static str {
        match self {
            CitrixEnvironment::Production => "api.cloud.com",
            CitrixEnvironment::Staging => "api.cloudburrito.com",
            CitrixEnvironment::Japan => "api.citrixcloud.jp",
            CitrixEnvironment::JapanStaging => "api.citrixcloudstaging.jp",
            CitrixEnvironment::Gov => "api.cloud.us",
            CitrixEnvironment::GovStaging => "api.cloudstaging.us",
        }
    }
}

impl FromStr for CitrixEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Production" => Ok(CitrixEnvironment::Production),
            "Staging" => Ok(CitrixEnvironment::Staging),
            "Japan" => Ok(CitrixEnvironment::Japan),
            "JapanStaging" => Ok(CitrixEnvironment::JapanStaging),
            "Gov" => Ok(CitrixEnvironment::Gov),
            "GovStaging" => Ok(CitrixEnvironment::GovStaging),
            other => Err(format!(
                "environment '{}' is not one of: {}",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Fully resolved configuration, ready to build clients from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub on_premises: bool,
    pub client: ClientSettings,
    pub storefront_remote: Option<RemoteHost>,
}

fn setting(value: &Value<String>, var: &'static str) -> Option<String> {
    resolve(value, &[&EnvDefault::<String>::new(var)]).filter(|s| !s.trim().is_empty())
}

fn required(
    value: &Value<String>,
    name: &str,
    var: &'static str,
    errors: &mut Vec<String>,
) -> String {
    setting(value, var).unwrap_or_else(|| {
        errors.push(format!(
            "{} is required (set in provider config or {} env var)",
            name, var
        ));
        String::new()
    })
}

fn https_url(host: &str, path: &str) -> String {
    let host = host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{}{}", host, path)
}

/// Resolves provider config against `CITRIX_*` variables; every problem is reported at once
pub fn resolve_config(config: &ProviderConfig) -> Result<ResolvedConfig, Vec<String>> {
    let mut errors = Vec::new();

    let customer_id = setting(&config.customer_id, "CITRIX_CUSTOMER_ID")
        .unwrap_or_else(|| ON_PREMISES_CUSTOMER_ID.to_string());
    let on_premises = customer_id.eq_ignore_ascii_case(ON_PREMISES_CUSTOMER_ID);

    let hostname = setting(&config.hostname, "CITRIX_HOSTNAME");
    let client_id = required(&config.client_id, "client_id", "CITRIX_CLIENT_ID", &mut errors);
    let client_secret = required(
        &config.client_secret,
        "client_secret",
        "CITRIX_CLIENT_SECRET",
        &mut errors,
    );

    let environment = match resolve(
        &config.environment,
        &[
            &EnvDefault::<String>::new("CITRIX_ENVIRONMENT"),
            &StaticDefault::new("Production".to_string()),
        ],
    ) {
        Some(name) => name.parse::<CitrixEnvironment>().unwrap_or_else(|e| {
            errors.push(e);
            CitrixEnvironment::default()
        }),
        None => CitrixEnvironment::default(),
    };

    let insecure = resolve(
        &config.disable_ssl_verification,
        &[
            &EnvDefault::<bool>::new("CITRIX_DISABLE_SSL_VERIFICATION"),
            &StaticDefault::new(false),
        ],
    )
    .unwrap_or(false);

    let computed_base = if on_premises {
        match &hostname {
            Some(host) => https_url(host, "/citrix/orchestration/api"),
            None => {
                errors.push(
                    "hostname is required (set in provider config or CITRIX_HOSTNAME env var)"
                        .to_string(),
                );
                String::new()
            }
        }
    } else {
        let host = hostname
            .clone()
            .unwrap_or_else(|| environment.api_host().to_string());
        https_url(&host, "/cvad/manage")
    };

    let base_url = std::env::var(BASE_URL_OVERRIDE_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(computed_base);

    let parsed_base = match url::Url::parse(&base_url) {
        Ok(url) => Some(url),
        Err(e) if errors.is_empty() => {
            errors.push(format!("invalid API base URL '{}': {}", base_url, e));
            None
        }
        Err(_) => None,
    };

    let storefront_remote = resolve_storefront_remote(config, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let credentials = if on_premises {
        Credentials::OnPremises {
            token_url: format!("{}/tokens", base_url.trim_end_matches('/')),
            username: client_id,
            password: client_secret,
        }
    } else {
        let origin = parsed_base
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|| https_url(environment.api_host(), ""));
        Credentials::Cloud {
            token_url: format!("{}/cctrustoauth2/{}/tokens/clients", origin, customer_id),
            client_id,
            client_secret,
        }
    };

    Ok(ResolvedConfig {
        on_premises,
        client: ClientSettings {
            base_url,
            customer_id,
            credentials,
            insecure,
            site_id: None,
        },
        storefront_remote,
    })
}

fn resolve_storefront_remote(config: &ProviderConfig, errors: &mut Vec<String>) -> Option<RemoteHost> {
    let empty = StorefrontRemoteHostConfig::default();
    let block = config.storefront_remote_host.as_ref_option().unwrap_or(&empty);

    let computer_name = setting(&block.computer_name, "CITRIX_STOREFRONT_REMOTE_HOST")?;
    let username = setting(&block.ad_admin_username, "CITRIX_STOREFRONT_AD_ADMIN_USERNAME");
    let password = setting(&block.ad_admin_password, "CITRIX_STOREFRONT_AD_ADMIN_PASSWORD");

    match (username, password) {
        (Some(username), Some(password)) => Some(RemoteHost {
            computer_name,
            username,
            password,
        }),
        _ => {
            errors.push(
                "storefront_remote_host requires ad_admin_username and ad_admin_password \
                 (set in provider config or CITRIX_STOREFRONT_AD_ADMIN_USERNAME / \
                 CITRIX_STOREFRONT_AD_ADMIN_PASSWORD env vars)"
                    .to_string(),
            );
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CITRIX_HOSTNAME",
        "CITRIX_ENVIRONMENT",
        "CITRIX_CUSTOMER_ID",
        "CITRIX_CLIENT_ID",
        "CITRIX_CLIENT_SECRET",
        "CITRIX_DISABLE_SSL_VERIFICATION",
        "CITRIX_STOREFRONT_REMOTE_HOST",
        "CITRIX_STOREFRONT_AD_ADMIN_USERNAME",
        "CITRIX_STOREFRONT_AD_ADMIN_PASSWORD",
        BASE_URL_OVERRIDE_ENV,
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn cloud_config(environment: &str) -> ProviderConfig {
        ProviderConfig {
            environment: Value::Value(environment.to_string()),
            customer_id: Value::Value("acme".to_string()),
            client_id: Value::Value("id".to_string()),
            client_secret: Value::Value("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_cloud_endpoints_follow_environment() {
        clear_env();
        let resolved = resolve_config(&cloud_config("Japan")).unwrap();

        assert!(!resolved.on_premises);
        assert_eq!(resolved.client.base_url, "https://api.citrixcloud.jp/cvad/manage");
        match resolved.client.credentials {
            Credentials::Cloud { token_url, .. } => assert_eq!(
                token_url,
                "https://api.citrixcloud.jp/cctrustoauth2/acme/tokens/clients"
            ),
            other => panic!("unexpected credentials {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_on_premises_from_env() {
        clear_env();
        std::env::set_var("CITRIX_HOSTNAME", "ddc.corp.local");
        std::env::set_var("CITRIX_CLIENT_ID", r"CORP\admin");
        std::env::set_var("CITRIX_CLIENT_SECRET", "pw");
        std::env::set_var("CITRIX_DISABLE_SSL_VERIFICATION", "true");

        let resolved = resolve_config(&ProviderConfig::default()).unwrap();
        clear_env();

        assert!(resolved.on_premises);
        assert!(resolved.client.insecure);
        assert_eq!(resolved.client.customer_id, ON_PREMISES_CUSTOMER_ID);
        assert_eq!(
            resolved.client.base_url,
            "https://ddc.corp.local/citrix/orchestration/api"
        );
        assert!(matches!(
            resolved.client.credentials,
            Credentials::OnPremises { ref token_url, .. }
                if token_url == "https://ddc.corp.local/citrix/orchestration/api/tokens"
        ));
    }

    #[test]
    #[serial]
    fn test_missing_values_are_all_reported() {
        clear_env();
        let errors = resolve_config(&ProviderConfig::default()).unwrap_err();

        assert!(errors
            .iter()
            .any(|e| e == "client_id is required (set in provider config or CITRIX_CLIENT_ID env var)"));
        assert!(errors.iter().any(|e| e.starts_with("client_secret is required")));
        assert!(errors.iter().any(|e| e.starts_with("hostname is required")));
    }

    #[test]
    #[serial]
    fn test_invalid_environment() {
        clear_env();
        let errors = resolve_config(&cloud_config("Mars")).unwrap_err();
        assert!(errors[0].contains("Mars"));
    }

    #[test]
    #[serial]
    fn test_base_url_override_moves_token_endpoint() {
        clear_env();
        std::env::set_var(BASE_URL_OVERRIDE_ENV, "http://127.0.0.1:4000/cvad/manage");
        let resolved = resolve_config(&cloud_config("Production")).unwrap();
        clear_env();

        assert_eq!(resolved.client.base_url, "http://127.0.0.1:4000/cvad/manage");
        assert!(matches!(
            resolved.client.credentials,
            Credentials::Cloud { ref token_url, .. }
                if token_url == "http://127.0.0.1:4000/cctrustoauth2/acme/tokens/clients"
        ));
    }

    #[test]
    #[serial]
    fn test_storefront_remote_host_requires_credentials() {
        clear_env();
        let mut config = cloud_config("Production");
        config.storefront_remote_host = Value::Value(StorefrontRemoteHostConfig {
            computer_name: Value::Value("stf01".to_string()),
            ..Default::default()
        });
        assert!(resolve_config(&config).is_err());

        std::env::set_var("CITRIX_STOREFRONT_AD_ADMIN_USERNAME", r"CORP\stfadmin");
        std::env::set_var("CITRIX_STOREFRONT_AD_ADMIN_PASSWORD", "pw");
        let resolved = resolve_config(&config).unwrap();
        clear_env();

        let remote = resolved.storefront_remote.unwrap();
        assert_eq!(remote.computer_name, "stf01");
        assert_eq!(remote.username, r"CORP\stfadmin");
    }
}
