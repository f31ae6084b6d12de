//! `citrix_stf_deployment` resource

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tfplug::plan_modifier::requires_replace;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::validator::validate_string;

use super::{default_site_id, keep_spelling, required, storefront_error, HttpUrlValidator};
use crate::provider_data::SharedProviderData;
use crate::storefront::client::Deployment;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StfDeploymentState {
    pub site_id: Value<String>,
    pub host_base_url: Value<String>,
}

impl StfDeploymentState {
    fn from_deployment(prior: &StfDeploymentState, deployment: Deployment) -> Self {
        let reported = deployment.host_base_url;
        let host_base_url = match prior.host_base_url.as_deref_option() {
            Some(p) if p.trim_end_matches('/').eq_ignore_ascii_case(&reported) => prior.host_base_url.clone(),
            _ => keep_spelling(&prior.host_base_url, reported),
        };
        Self {
            site_id: Value::Value(deployment.site_id),
            host_base_url,
        }
    }
}

pub struct StfDeploymentResource {
    data: SharedProviderData,
}

impl StfDeploymentResource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Resource for StfDeploymentResource {
    type State<'a> = StfDeploymentState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(
            SchemaBuilder::new()
                .description("Manages the StoreFront deployment of an IIS site")
                .attribute(
                    AttributeBuilder::new("site_id", AttributeType::String)
                        .description("IIS site ID of the deployment. Defaults to `1`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("host_base_url", AttributeType::String)
                        .description("Base URL users reach StoreFront on")
                        .required()
                        .build(),
                )
                .build(),
        )
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_string(
            &config.host_base_url,
            AttributePath::new("host_base_url"),
            diags,
            &[&HttpUrlValidator],
        );
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &state.site_id, "site_id")?;

        match data.storefront.get_deployment(site_id).await {
            Ok(Some(deployment)) => Some((StfDeploymentState::from_deployment(&state, deployment), private_state)),
            Ok(None) => {
                tracing::warn!("StoreFront deployment for site {} not found, removing from state", site_id);
                None
            }
            Err(e) => {
                storefront_error(diags, "Failed to read StoreFront deployment", e);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        default_site_id(&mut state.site_id);
        Some((state, ValueEmpty::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        let mut replace = Vec::new();
        default_site_id(&mut state.site_id);
        requires_replace(
            &prior_state.site_id,
            &state.site_id,
            AttributePath::new("site_id"),
            &mut replace,
        );
        Some((state, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &planned_state.site_id, "site_id")?;
        let host_base_url = required(diags, &planned_state.host_base_url, "host_base_url")?;

        if let Err(e) = data.storefront.add_deployment(site_id, host_base_url).await {
            storefront_error(diags, "Failed to create StoreFront deployment", e);
            return None;
        }

        match data.storefront.get_deployment(site_id).await {
            Ok(Some(deployment)) => Some((
                StfDeploymentState::from_deployment(&planned_state, deployment),
                planned_private_state,
            )),
            Ok(None) => {
                diags.root_error(
                    "Failed to create StoreFront deployment",
                    format!("No deployment found for site {} after creation", site_id),
                );
                None
            }
            Err(e) => {
                storefront_error(diags, "Failed to read StoreFront deployment", e);
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &planned_state.site_id, "site_id")?;
        let host_base_url = required(diags, &planned_state.host_base_url, "host_base_url")?;
        tracing::info!("Updating StoreFront deployment for site {}", site_id);

        if let Err(e) = data.storefront.set_deployment(site_id, host_base_url).await {
            storefront_error(diags, "Failed to update StoreFront deployment", e);
            return None;
        }
        Some((planned_state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &prior_state.site_id, "site_id")?;

        match data.storefront.clear_deployment(site_id).await {
            Ok(()) => Some(()),
            Err(e) => {
                storefront_error(diags, "Failed to delete StoreFront deployment", e);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = StfDeploymentState {
            site_id: Value::Value(id),
            host_base_url: Value::Null,
        };
        Some((state, ValueEmpty::default()))
    }
}
