pub mod api;
pub mod config;
pub mod data_sources;
pub mod locks;
pub mod provider_data;
pub mod resources;
pub mod storefront;
pub mod xdpath;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{map, AttributePath, Diagnostics, DynamicDataSource, DynamicResource, Provider};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedAttributeBuilder, SchemaBuilder};
use tfplug::validator::{validate_string, OneOfValidator};

use config::{resolve_config, CitrixEnvironment, ProviderConfig};
use provider_data::{CitrixProviderData, SharedProviderData};
use storefront::{ProcessExecutor, StoreFrontClient};

/// Terraform provider for Citrix DaaS (cloud or on-premises) and StoreFront
#[derive(Default)]
pub struct CitrixProvider {
    data: SharedProviderData,
}

impl CitrixProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for CitrixProvider {
    type Config<'a> = ProviderConfig;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let remote_host = NestedAttributeBuilder::single()
            .attribute(
                AttributeBuilder::new("computer_name", AttributeType::String)
                    .description("StoreFront server to run the PowerShell SDK on")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ad_admin_username", AttributeType::String)
                    .description("Domain administrator used for the remote session")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ad_admin_password", AttributeType::String)
                    .description("Password of the domain administrator")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        Some(
            SchemaBuilder::new()
                .description("Manages Citrix DaaS machine catalogs and StoreFront configuration")
                .attribute(
                    AttributeBuilder::new("hostname", AttributeType::String)
                        .description("Delivery Controller host for on-premises sites, or a cloud API host override. Can be set with `CITRIX_HOSTNAME`.")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("environment", AttributeType::String)
                        .description("Citrix Cloud environment. Defaults to `Production`. Can be set with `CITRIX_ENVIRONMENT`.")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("customer_id", AttributeType::String)
                        .description("Citrix Cloud customer ID, or `CitrixOnPremises`. Can be set with `CITRIX_CUSTOMER_ID`.")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("client_id", AttributeType::String)
                        .description("API client ID, or the domain\\user name on-premises. Can be set with `CITRIX_CLIENT_ID`.")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("client_secret", AttributeType::String)
                        .description("API client secret, or the password on-premises. Can be set with `CITRIX_CLIENT_SECRET`.")
                        .optional()
                        .sensitive()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("disable_ssl_verification", AttributeType::Bool)
                        .description("Skip TLS certificate verification. Can be set with `CITRIX_DISABLE_SSL_VERIFICATION`.")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("storefront_remote_host", remote_host)
                        .description("Run StoreFront commands on a remote server instead of locally")
                        .optional()
                        .build(),
                )
                .build(),
        )
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        validate_string(
            &config.environment,
            AttributePath::new("environment"),
            diags,
            &[&OneOfValidator::new(CitrixEnvironment::NAMES)],
        );
        Some(())
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        tracing::info!("Configuring citrix provider (Terraform {})", terraform_version);

        let resolved = match resolve_config(&config) {
            Ok(resolved) => resolved,
            Err(errors) => {
                for error in errors {
                    diags.root_error("Invalid provider configuration", error);
                }
                return None;
            }
        };

        let client = match api::Client::new(resolved.client) {
            Ok(client) => client,
            Err(e) => {
                diags.root_error("Failed to create API client", e.to_string());
                return None;
            }
        };
        tracing::info!(
            "Using Orchestration API at {} ({})",
            client.base_url(),
            if resolved.on_premises { "on-premises" } else { "cloud" }
        );

        let storefront = StoreFrontClient::new(Arc::new(ProcessExecutor::new(resolved.storefront_remote)));
        self.data
            .set(CitrixProviderData::new(client, storefront, resolved.on_premises))
            .await;
        Some(())
    }

    fn get_resources(&self, _diags: &mut Diagnostics) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        Some(map! {
            "machine_catalog" => resources::MachineCatalogResource::new(self.data.clone()),
            "stf_deployment" => resources::StfDeploymentResource::new(self.data.clone()),
            "stf_store_service" => resources::StfStoreServiceResource::new(self.data.clone()),
            "stf_store_farm" => resources::StfStoreFarmResource::new(self.data.clone()),
            "stf_xenapp_default_store" => resources::StfXenappDefaultStoreResource::new(self.data.clone()),
        })
    }

    fn get_data_sources(&self, _diags: &mut Diagnostics) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(map! {
            "machine_properties" => data_sources::MachinePropertiesDataSource::new(self.data.clone()),
            "pvs" => data_sources::PvsDataSource::new(self.data.clone()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tf_provider::value::Value;
    use tfplug::schema::attribute_names;

    const VARS: &[&str] = &[
        "CITRIX_HOSTNAME",
        "CITRIX_ENVIRONMENT",
        "CITRIX_CUSTOMER_ID",
        "CITRIX_CLIENT_ID",
        "CITRIX_CLIENT_SECRET",
        "CITRIX_DISABLE_SSL_VERIFICATION",
        "CITRIX_STOREFRONT_REMOTE_HOST",
        "CITRIX_API_BASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn provider_schema_matches_config() {
        let provider = CitrixProvider::new();
        let mut diags = Diagnostics::default();
        let schema = provider.schema(&mut diags).unwrap();

        assert_eq!(
            attribute_names(&schema),
            vec![
                "client_id",
                "client_secret",
                "customer_id",
                "disable_ssl_verification",
                "environment",
                "hostname",
                "storefront_remote_host",
            ]
        );
    }

    #[test]
    fn provider_registers_resources_and_data_sources() {
        let provider = CitrixProvider::new();
        let mut diags = Diagnostics::default();

        let mut resources: Vec<_> = provider.get_resources(&mut diags).unwrap().into_keys().collect();
        resources.sort();
        assert_eq!(
            resources,
            vec![
                "machine_catalog",
                "stf_deployment",
                "stf_store_farm",
                "stf_store_service",
                "stf_xenapp_default_store",
            ]
        );

        let mut data_sources: Vec<_> = provider.get_data_sources(&mut diags).unwrap().into_keys().collect();
        data_sources.sort();
        assert_eq!(data_sources, vec!["machine_properties", "pvs"]);
    }

    #[tokio::test]
    async fn provider_rejects_unknown_environment() {
        let provider = CitrixProvider::new();
        let mut diags = Diagnostics::default();
        let config = ProviderConfig {
            environment: Value::Value("Moon".to_string()),
            ..Default::default()
        };

        provider.validate(&mut diags, config).await;
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_successfully_with_env_vars() {
        clear_env();
        std::env::set_var("CITRIX_CUSTOMER_ID", "acme");
        std::env::set_var("CITRIX_CLIENT_ID", "client");
        std::env::set_var("CITRIX_CLIENT_SECRET", "secret");

        let provider = CitrixProvider::new();
        let mut diags = Diagnostics::default();
        let result = provider
            .configure(&mut diags, "1.9.0".to_string(), ProviderConfig::default())
            .await;
        clear_env();

        assert!(result.is_some());
        assert!(diags.errors.is_empty());
        assert!(provider.data.is_configured().await);
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_reports_every_missing_value() {
        clear_env();

        let provider = CitrixProvider::new();
        let mut diags = Diagnostics::default();
        let result = provider
            .configure(&mut diags, "1.9.0".to_string(), ProviderConfig::default())
            .await;

        assert!(result.is_none());
        assert_eq!(diags.errors.len(), 3);
        assert!(diags
            .errors
            .iter()
            .all(|d| d.summary == "Invalid provider configuration"));
        assert!(!provider.data.is_configured().await);
    }
}
