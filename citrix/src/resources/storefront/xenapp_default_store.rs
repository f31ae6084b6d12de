//! `citrix_stf_xenapp_default_store` resource
//!
//! Marks one store as the default XenApp Services (PNA) site. Only one store per
//! IIS site can hold the role, so every change runs under the site lock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tfplug::import::{import_error, parse_import_id};
use tfplug::plan_modifier::requires_replace;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::validator::validate_string;

use super::{default_site_id, required, storefront_error, VirtualPathValidator};
use crate::locks::lock_site;
use crate::provider_data::SharedProviderData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StfXenappDefaultStoreState {
    pub store_site_id: Value<String>,
    pub store_virtual_path: Value<String>,
}

pub struct StfXenappDefaultStoreResource {
    data: SharedProviderData,
}

impl StfXenappDefaultStoreResource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }

    async fn enable(
        &self,
        diags: &mut Diagnostics,
        state: &StfXenappDefaultStoreState,
        summary: &'static str,
    ) -> Option<()> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &state.store_site_id, "store_site_id")?;
        let store = required(diags, &state.store_virtual_path, "store_virtual_path")?;

        let _guard = lock_site(site_id).await;
        match data.storefront.enable_default_pna(site_id, store).await {
            Ok(()) => Some(()),
            Err(e) => {
                storefront_error(diags, summary, e);
                None
            }
        }
    }
}

#[async_trait]
impl Resource for StfXenappDefaultStoreResource {
    type State<'a> = StfXenappDefaultStoreState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(
            SchemaBuilder::new()
                .description("Selects the store served as the default XenApp Services site")
                .attribute(
                    AttributeBuilder::new("store_site_id", AttributeType::String)
                        .description("IIS site ID of the store. Defaults to `1`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("store_virtual_path", AttributeType::String)
                        .description("Virtual path of the store to serve to XenApp Services clients")
                        .required()
                        .build(),
                )
                .build(),
        )
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_string(
            &config.store_virtual_path,
            AttributePath::new("store_virtual_path"),
            diags,
            &[&VirtualPathValidator],
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
        let site_id = required(diags, &state.store_site_id, "store_site_id")?;
        let store = required(diags, &state.store_virtual_path, "store_virtual_path")?;

        let pna = match data.storefront.get_store_pna(site_id, store).await {
            Ok(pna) => pna,
            Err(e) => {
                storefront_error(diags, "Failed to read XenApp Services default store", e);
                return None;
            }
        };

        match pna {
            Some(pna) if pna.default_pna_service => Some((state, private_state)),
            _ => {
                tracing::warn!(
                    "Store {} is no longer the default XenApp Services store, removing from state",
                    store
                );
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
        default_site_id(&mut state.store_site_id);
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
        default_site_id(&mut state.store_site_id);

        requires_replace(
            &prior_state.store_site_id,
            &state.store_site_id,
            AttributePath::new("store_site_id"),
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
        self.enable(diags, &planned_state, "Failed to set XenApp Services default store")
            .await?;
        Some((planned_state, planned_private_state))
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
        self.enable(diags, &planned_state, "Failed to update XenApp Services default store")
            .await?;
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
        let site_id = required(diags, &prior_state.store_site_id, "store_site_id")?;
        let store = required(diags, &prior_state.store_virtual_path, "store_virtual_path")?;

        let _guard = lock_site(site_id).await;
        match data.storefront.disable_pna(site_id, store).await {
            Ok(()) => Some(()),
            Err(e) => {
                storefront_error(diags, "Failed to delete XenApp Services default store", e);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        match parse_import_id(&id, &["store_site_id", "store_virtual_path"]) {
            Ok(mut parts) => {
                let store_virtual_path = parts.pop().map_or(Value::Null, Value::Value);
                let store_site_id = parts.pop().map_or(Value::Null, Value::Value);
                Some((
                    StfXenappDefaultStoreState {
                        store_site_id,
                        store_virtual_path,
                    },
                    ValueEmpty::default(),
                ))
            }
            Err(e) => {
                import_error(diags, "XenApp Services default store", e);
                None
            }
        }
    }
}
