//! `citrix_stf_store_service` resource

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tfplug::import::{import_error, parse_import_id};
use tfplug::plan_modifier::requires_replace;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::validator::validate_string;
use tfplug::{apply_default, StaticDefault};

use super::{default_site_id, keep_spelling, required, storefront_error, VirtualPathValidator};
use crate::provider_data::SharedProviderData;
use crate::storefront::client::StoreService;
use crate::storefront::StoreServiceSpec;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StfStoreServiceState {
    pub site_id: Value<String>,
    pub virtual_path: Value<String>,
    pub friendly_name: Value<String>,
    pub authentication_service_virtual_path: Value<String>,
    pub anonymous: Value<bool>,
    pub load_balance: Value<bool>,
}

impl StfStoreServiceState {
    fn spec(&self) -> StoreServiceSpec {
        StoreServiceSpec {
            site_id: self.site_id.as_deref_option().unwrap_or_default().to_string(),
            virtual_path: self.virtual_path.as_deref_option().unwrap_or_default().to_string(),
            friendly_name: self.friendly_name.as_deref_option().map(str::to_string),
            authentication_service_virtual_path: self
                .authentication_service_virtual_path
                .as_deref_option()
                .map(str::to_string),
            anonymous: self.anonymous.as_ref_option().copied().unwrap_or(false),
            load_balance: self.load_balance.as_ref_option().copied().unwrap_or(false),
        }
    }

    fn from_store(prior: &StfStoreServiceState, store: StoreService) -> Self {
        let friendly_name = store
            .friendly_name
            .map_or(Value::Null, |name| keep_spelling(&prior.friendly_name, name));
        Self {
            site_id: Value::Value(store.site_id),
            virtual_path: keep_spelling(&prior.virtual_path, store.virtual_path),
            friendly_name,
            // Not reported back by the SDK
            authentication_service_virtual_path: prior.authentication_service_virtual_path.clone(),
            anonymous: Value::Value(store.anonymous),
            load_balance: Value::Value(store.load_balance),
        }
    }

    fn apply_defaults(&mut self) {
        default_site_id(&mut self.site_id);
        apply_default(&mut self.anonymous, &StaticDefault::new(false));
        apply_default(&mut self.load_balance, &StaticDefault::new(false));
    }
}

pub struct StfStoreServiceResource {
    data: SharedProviderData,
}

impl StfStoreServiceResource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }

    async fn fetch(
        &self,
        diags: &mut Diagnostics,
        prior: &StfStoreServiceState,
    ) -> Option<Option<StfStoreServiceState>> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &prior.site_id, "site_id")?;
        let virtual_path = required(diags, &prior.virtual_path, "virtual_path")?;

        match data.storefront.get_store_service(site_id, virtual_path).await {
            Ok(store) => Some(store.map(|s| StfStoreServiceState::from_store(prior, s))),
            Err(e) => {
                storefront_error(diags, "Failed to read StoreFront store", e);
                None
            }
        }
    }
}

#[async_trait]
impl Resource for StfStoreServiceResource {
    type State<'a> = StfStoreServiceState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(
            SchemaBuilder::new()
                .description("Manages a StoreFront store service")
                .attribute(
                    AttributeBuilder::new("site_id", AttributeType::String)
                        .description("IIS site ID of the store. Defaults to `1`. Changing this forces a new store.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("virtual_path", AttributeType::String)
                        .description("IIS virtual path of the store, e.g. `/Citrix/Store`")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("friendly_name", AttributeType::String)
                        .description("Name shown to users. Defaults to the name StoreFront derives from the path.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("authentication_service_virtual_path", AttributeType::String)
                        .description(
                            "Virtual path of the authentication service. Defaults to the store path with an `Auth` suffix.",
                        )
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("anonymous", AttributeType::Bool)
                        .description("Whether the store allows unauthenticated access. Changing this forces a new store.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("load_balance", AttributeType::Bool)
                        .description("Whether launches are load balanced across the farm servers")
                        .optional()
                        .computed()
                        .build(),
                )
                .build(),
        )
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_string(
            &config.virtual_path,
            AttributePath::new("virtual_path"),
            diags,
            &[&VirtualPathValidator],
        );
        validate_string(
            &config.authentication_service_virtual_path,
            AttributePath::new("authentication_service_virtual_path"),
            diags,
            &[&VirtualPathValidator],
        );
        if config.anonymous == Value::Value(true) && config.authentication_service_virtual_path.is_value() {
            diags.error(
                "Conflicting store authentication",
                "authentication_service_virtual_path cannot be set on an anonymous store",
                AttributePath::new("authentication_service_virtual_path"),
            );
        }
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        match self.fetch(diags, &state).await? {
            Some(fresh) => Some((fresh, private_state)),
            None => {
                tracing::warn!(
                    "StoreFront store {} not found, removing from state",
                    state.virtual_path.as_deref_option().unwrap_or_default()
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
        state.apply_defaults();
        if state.friendly_name.is_null() {
            state.friendly_name = Value::Unknown;
        }
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
        state.apply_defaults();

        requires_replace(
            &prior_state.site_id,
            &state.site_id,
            AttributePath::new("site_id"),
            &mut replace,
        );
        requires_replace(
            &prior_state.virtual_path,
            &state.virtual_path,
            AttributePath::new("virtual_path"),
            &mut replace,
        );
        requires_replace(
            &prior_state.anonymous,
            &state.anonymous,
            AttributePath::new("anonymous"),
            &mut replace,
        );
        requires_replace(
            &prior_state.authentication_service_virtual_path,
            &state.authentication_service_virtual_path,
            AttributePath::new("authentication_service_virtual_path"),
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
        required(diags, &planned_state.virtual_path, "virtual_path")?;

        if let Err(e) = data.storefront.add_store_service(&planned_state.spec()).await {
            storefront_error(diags, "Failed to create StoreFront store", e);
            return None;
        }

        match self.fetch(diags, &planned_state).await? {
            Some(created) => Some((created, planned_private_state)),
            None => {
                diags.root_error(
                    "Failed to create StoreFront store",
                    format!(
                        "Store {} was not found after creation",
                        planned_state.virtual_path.as_deref_option().unwrap_or_default()
                    ),
                );
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
        required(diags, &planned_state.virtual_path, "virtual_path")?;
        tracing::info!(
            "Updating StoreFront store {}",
            planned_state.virtual_path.as_deref_option().unwrap_or_default()
        );

        if let Err(e) = data.storefront.set_store_service(&planned_state.spec()).await {
            storefront_error(diags, "Failed to update StoreFront store", e);
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
        let virtual_path = required(diags, &prior_state.virtual_path, "virtual_path")?;

        match data.storefront.remove_store_service(site_id, virtual_path).await {
            Ok(()) => Some(()),
            Err(e) => {
                storefront_error(diags, "Failed to delete StoreFront store", e);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = match parse_import_id(&id, &["site_id", "virtual_path"]) {
            Ok(parts) => parts,
            Err(e) => {
                import_error(diags, "StoreFront store", e);
                return None;
            }
        };
        let [site_id, virtual_path] = [&parts[0], &parts[1]];
        let state = StfStoreServiceState {
            site_id: Value::Value(site_id.clone()),
            virtual_path: Value::Value(virtual_path.clone()),
            ..Default::default()
        };
        Some((state, ValueEmpty::default()))
    }
}
