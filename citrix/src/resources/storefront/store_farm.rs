//! `citrix_stf_store_farm` resource

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tfplug::import::{import_error, parse_import_id};
use tfplug::plan_modifier::requires_replace;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::validator::{
    validate_number, validate_string, validate_string_list, ListLengthValidator, NumberRangeValidator,
    OneOfValidator, StringLengthValidator,
};
use tfplug::{apply_default, StaticDefault};

use super::{default_site_id, keep_spelling, required, storefront_error, VirtualPathValidator};
use crate::provider_data::SharedProviderData;
use crate::storefront::client::StoreFarm;
use crate::storefront::StoreFarmSpec;

const FARM_TYPES: OneOfValidator =
    OneOfValidator::new(&["XenDesktop", "XenApp", "AppController", "VDIinaBox"]);
const TRANSPORT_TYPES: OneOfValidator = OneOfValidator::new(&["HTTP", "HTTPS", "SSL"]);

const DEFAULT_FARM_TYPE: &str = "XenDesktop";
const DEFAULT_TRANSPORT_TYPE: &str = "HTTP";
const DEFAULT_PORT: i64 = 80;

type StringList = Value<Vec<Value<String>>>;

fn known_strings(list: &StringList) -> Vec<String> {
    list.as_ref_option()
        .map(|items| items.iter().filter_map(|v| v.as_deref_option()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn string_list(items: Vec<String>) -> StringList {
    Value::Value(items.into_iter().map(Value::Value).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StfStoreFarmState {
    pub site_id: Value<String>,
    pub store_virtual_path: Value<String>,
    pub farm_name: Value<String>,
    pub farm_type: Value<String>,
    pub servers: StringList,
    pub port: Value<i64>,
    pub transport_type: Value<String>,
    pub load_balance: Value<bool>,
    pub zones: StringList,
}

impl StfStoreFarmState {
    fn spec(&self) -> StoreFarmSpec {
        StoreFarmSpec {
            site_id: self.site_id.as_deref_option().unwrap_or_default().to_string(),
            store_virtual_path: self
                .store_virtual_path
                .as_deref_option()
                .unwrap_or_default()
                .to_string(),
            farm_name: self.farm_name.as_deref_option().unwrap_or_default().to_string(),
            farm_type: self
                .farm_type
                .as_deref_option()
                .unwrap_or(DEFAULT_FARM_TYPE)
                .to_string(),
            servers: known_strings(&self.servers),
            port: self.port.as_ref_option().copied().unwrap_or(DEFAULT_PORT),
            transport_type: self
                .transport_type
                .as_deref_option()
                .unwrap_or(DEFAULT_TRANSPORT_TYPE)
                .to_string(),
            load_balance: self.load_balance.as_ref_option().copied().unwrap_or(false),
            zones: known_strings(&self.zones),
        }
    }

    fn from_farm(prior: &StfStoreFarmState, farm: StoreFarm) -> Self {
        // An unset zone list reads back empty
        let zones = if farm.zones.is_empty() && prior.zones.is_null() {
            Value::Null
        } else {
            string_list(farm.zones)
        };
        Self {
            site_id: prior.site_id.clone(),
            store_virtual_path: prior.store_virtual_path.clone(),
            farm_name: keep_spelling(&prior.farm_name, farm.farm_name),
            farm_type: keep_spelling(&prior.farm_type, farm.farm_type),
            servers: string_list(farm.servers),
            port: Value::Value(farm.port),
            transport_type: keep_spelling(&prior.transport_type, farm.transport_type),
            load_balance: Value::Value(farm.load_balance),
            zones,
        }
    }

    fn apply_defaults(&mut self) {
        default_site_id(&mut self.site_id);
        apply_default(&mut self.farm_type, &StaticDefault::new(DEFAULT_FARM_TYPE.to_string()));
        apply_default(&mut self.port, &StaticDefault::new(DEFAULT_PORT));
        apply_default(
            &mut self.transport_type,
            &StaticDefault::new(DEFAULT_TRANSPORT_TYPE.to_string()),
        );
        apply_default(&mut self.load_balance, &StaticDefault::new(false));
    }

    fn label(&self) -> String {
        format!(
            "{} in store {}",
            self.farm_name.as_deref_option().unwrap_or_default(),
            self.store_virtual_path.as_deref_option().unwrap_or_default()
        )
    }
}

pub struct StfStoreFarmResource {
    data: SharedProviderData,
}

impl StfStoreFarmResource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }

    async fn fetch(
        &self,
        diags: &mut Diagnostics,
        prior: &StfStoreFarmState,
    ) -> Option<Option<StfStoreFarmState>> {
        let data = self.data.get(diags).await?;
        let site_id = required(diags, &prior.site_id, "site_id")?;
        let store = required(diags, &prior.store_virtual_path, "store_virtual_path")?;
        let farm_name = required(diags, &prior.farm_name, "farm_name")?;

        match data.storefront.get_store_farm(site_id, store, farm_name).await {
            Ok(farm) => Some(farm.map(|f| StfStoreFarmState::from_farm(prior, f))),
            Err(e) => {
                storefront_error(diags, "Failed to read StoreFront farm", e);
                None
            }
        }
    }
}

#[async_trait]
impl Resource for StfStoreFarmResource {
    type State<'a> = StfStoreFarmState;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(
            SchemaBuilder::new()
                .description("Manages a Citrix farm behind a StoreFront store")
                .attribute(
                    AttributeBuilder::new("site_id", AttributeType::String)
                        .description("IIS site ID of the store. Defaults to `1`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("store_virtual_path", AttributeType::String)
                        .description("Virtual path of the store the farm belongs to")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("farm_name", AttributeType::String)
                        .description("Name of the farm, unique within the store")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("farm_type", AttributeType::String)
                        .description("One of `XenDesktop`, `XenApp`, `AppController` or `VDIinaBox`. Defaults to `XenDesktop`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("servers", AttributeType::List(Box::new(AttributeType::String)))
                        .description("Delivery Controller or XML broker addresses")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("port", AttributeType::Number)
                        .description("XML service port. Defaults to `80`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("transport_type", AttributeType::String)
                        .description("One of `HTTP`, `HTTPS` or `SSL`. Defaults to `HTTP`.")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("load_balance", AttributeType::Bool)
                        .description("Whether requests are spread across the servers instead of failing over in order")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("zones", AttributeType::List(Box::new(AttributeType::String)))
                        .description("Zones the farm serves")
                        .optional()
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
        validate_string(
            &config.farm_name,
            AttributePath::new("farm_name"),
            diags,
            &[&StringLengthValidator {
                min: Some(1),
                max: None,
            }],
        );
        validate_string(&config.farm_type, AttributePath::new("farm_type"), diags, &[&FARM_TYPES]);
        validate_string(
            &config.transport_type,
            AttributePath::new("transport_type"),
            diags,
            &[&TRANSPORT_TYPES],
        );
        validate_number(
            &config.port,
            AttributePath::new("port"),
            diags,
            &[&NumberRangeValidator {
                min: Some(1),
                max: Some(65535),
            }],
        );
        ListLengthValidator {
            min: Some(1),
            max: None,
        }
        .validate_list(&config.servers, AttributePath::new("servers"), diags);
        validate_string_list(
            &config.servers,
            AttributePath::new("servers"),
            diags,
            &[&StringLengthValidator {
                min: Some(1),
                max: None,
            }],
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
        match self.fetch(diags, &state).await? {
            Some(fresh) => Some((fresh, private_state)),
            None => {
                tracing::warn!("StoreFront farm {} not found, removing from state", state.label());
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
            &prior_state.store_virtual_path,
            &state.store_virtual_path,
            AttributePath::new("store_virtual_path"),
            &mut replace,
        );
        requires_replace(
            &prior_state.farm_name,
            &state.farm_name,
            AttributePath::new("farm_name"),
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
        required(diags, &planned_state.store_virtual_path, "store_virtual_path")?;
        required(diags, &planned_state.farm_name, "farm_name")?;

        if let Err(e) = data.storefront.add_store_farm(&planned_state.spec()).await {
            storefront_error(diags, "Failed to create StoreFront farm", e);
            return None;
        }

        match self.fetch(diags, &planned_state).await? {
            Some(created) => Some((created, planned_private_state)),
            None => {
                diags.root_error(
                    "Failed to create StoreFront farm",
                    format!("Farm {} was not found after creation", planned_state.label()),
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
        tracing::info!("Updating StoreFront farm {}", planned_state.label());

        if let Err(e) = data.storefront.set_store_farm(&planned_state.spec()).await {
            storefront_error(diags, "Failed to update StoreFront farm", e);
            return None;
        }

        match self.fetch(diags, &planned_state).await? {
            Some(updated) => Some((updated, planned_private_state)),
            None => {
                diags.root_error(
                    "Failed to update StoreFront farm",
                    format!("Farm {} disappeared during update", planned_state.label()),
                );
                None
            }
        }
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
        let store = required(diags, &prior_state.store_virtual_path, "store_virtual_path")?;
        let farm_name = required(diags, &prior_state.farm_name, "farm_name")?;

        match data.storefront.remove_store_farm(site_id, store, farm_name).await {
            Ok(()) => Some(()),
            Err(e) => {
                storefront_error(diags, "Failed to delete StoreFront farm", e);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let parts = match parse_import_id(&id, &["site_id", "store_virtual_path", "farm_name"]) {
            Ok(parts) => parts,
            Err(e) => {
                import_error(diags, "StoreFront farm", e);
                return None;
            }
        };
        let mut parts = parts.into_iter();
        let state = StfStoreFarmState {
            site_id: parts.next().map_or(Value::Null, Value::Value),
            store_virtual_path: parts.next().map_or(Value::Null, Value::Value),
            farm_name: parts.next().map_or(Value::Null, Value::Value),
            ..Default::default()
        };
        Some((state, ValueEmpty::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::storefront::mock_provider_data;
    use crate::storefront::executor::MockExecutor;
    use std::sync::Arc;

    async fn resource(mock: MockExecutor) -> (StfStoreFarmResource, Arc<MockExecutor>) {
        let mock = Arc::new(mock);
        (StfStoreFarmResource::new(mock_provider_data(mock.clone()).await), mock)
    }

    fn farm() -> StfStoreFarmState {
        StfStoreFarmState {
            site_id: Value::Value("1".to_string()),
            store_virtual_path: Value::Value("/Citrix/Store".to_string()),
            farm_name: Value::Value("Controller".to_string()),
            servers: string_list(vec!["ddc01.corp.local".to_string()]),
            ..Default::default()
        }
    }

    // ConvertTo-Json collapses the single server into a bare string
    const FARM_JSON: &str = r#"{"FarmName":"Controller","FarmType":"XenDesktop","Servers":"ddc01.corp.local","Port":80,"TransportType":"HTTP","LoadBalance":false,"Zones":null}"#;

    #[tokio::test]
    async fn test_validate_rejects_bad_values() {
        let (resource, _) = resource(MockExecutor::new()).await;
        let mut diags = Diagnostics::default();

        let mut config = farm();
        config.farm_type = Value::Value("Citrix".to_string());
        config.transport_type = Value::Value("FTP".to_string());
        config.port = Value::Value(70000);
        config.servers = Value::Value(Vec::new());
        resource.validate(&mut diags, config).await;

        assert_eq!(diags.errors.len(), 4);
    }

    #[tokio::test]
    async fn test_plan_create_fills_defaults() {
        let (resource, _) = resource(MockExecutor::new()).await;
        let mut diags = Diagnostics::default();

        let mut proposed = farm();
        proposed.site_id = Value::Null;
        let (planned, _) = resource
            .plan_create(&mut diags, proposed.clone(), proposed, ValueEmpty::default())
            .await
            .unwrap();

        assert_eq!(planned.site_id, Value::Value("1".to_string()));
        assert_eq!(planned.farm_type, Value::Value("XenDesktop".to_string()));
        assert_eq!(planned.port, Value::Value(80));
        assert_eq!(planned.transport_type, Value::Value("HTTP".to_string()));
        assert_eq!(planned.load_balance, Value::Value(false));
        assert!(planned.zones.is_null());
    }

    #[tokio::test]
    async fn test_create_renders_farm_command() {
        let (resource, mock) = resource(MockExecutor::new().respond("").respond(FARM_JSON)).await;
        let mut diags = Diagnostics::default();

        let mut planned = farm();
        planned.apply_defaults();
        let (created, _) = resource
            .create(
                &mut diags,
                planned.clone(),
                planned.clone(),
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(created, planned);
        let scripts = mock.scripts();
        assert!(scripts[0].starts_with(
            "Add-STFStoreFarm -StoreService (Get-STFStoreService -SiteId '1' -VirtualPath '/Citrix/Store') -FarmName 'Controller' -FarmType 'XenDesktop'"
        ));
        assert!(!scripts[0].contains("-Zones"));
    }

    #[tokio::test]
    async fn test_read_missing_farm_removes_state() {
        let (resource, _) = resource(MockExecutor::new().respond("")).await;
        let mut diags = Diagnostics::default();

        let result = resource
            .read(&mut diags, farm(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(result.is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_reports_command_failure() {
        let (resource, _) = resource(MockExecutor::new().fail("Farm is in use")).await;
        let mut diags = Diagnostics::default();

        let result = resource
            .destroy(&mut diags, farm(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(result.is_none());
        assert_eq!(diags.errors[0].summary, "Failed to delete StoreFront farm");
        assert!(diags.errors[0].detail.contains("Farm is in use"));
    }

    #[tokio::test]
    async fn test_import_id() {
        let (resource, _) = resource(MockExecutor::new()).await;
        let mut diags = Diagnostics::default();

        let (state, _) = resource
            .import(&mut diags, "1,/Citrix/Store,Controller".to_string())
            .await
            .unwrap();
        assert_eq!(state.store_virtual_path, Value::Value("/Citrix/Store".to_string()));
        assert_eq!(state.farm_name, Value::Value("Controller".to_string()));

        assert!(resource.import(&mut diags, "1,/Citrix/Store".to_string()).await.is_none());
    }
}
