//! `citrix_pvs` data source
//!
//! Resolves PVS farm, site, store and vDisk names to the IDs a PVS-streamed
//! machine catalog needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, DataSource, Diagnostics};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};

use crate::provider_data::SharedProviderData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PvsState {
    pub pvs_farm_name: Value<String>,
    pub pvs_site_name: Value<String>,
    pub pvs_store_name: Value<String>,
    pub vdisk_name: Value<String>,
    pub pvs_farm_id: Value<String>,
    pub pvs_site_id: Value<String>,
    pub pvs_store_id: Value<String>,
    pub pvs_vdisk_id: Value<String>,
}

pub struct PvsDataSource {
    data: SharedProviderData,
}

impl PvsDataSource {
    pub fn new(data: SharedProviderData) -> Self {
        Self { data }
    }
}

fn input<'v>(diags: &mut Diagnostics, value: &'v Value<String>, attribute: &'static str) -> Option<&'v str> {
    match value.as_deref_option() {
        Some(s) if !s.is_empty() => Some(s),
        _ => {
            diags.error_short(format!("{} is required", attribute), AttributePath::new(attribute));
            None
        }
    }
}

#[async_trait]
impl DataSource for PvsDataSource {
    type State<'a> = PvsState;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let required = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .build()
        };
        let computed = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .computed()
                .build()
        };

        Some(
            SchemaBuilder::new()
                .description("Looks up the IDs of a PVS vDisk and the farm, site and store serving it")
                .attribute(required("pvs_farm_name", "Name of the PVS farm"))
                .attribute(required("pvs_site_name", "Name of the PVS site"))
                .attribute(required("pvs_store_name", "Name of the PVS store holding the vDisk"))
                .attribute(required("vdisk_name", "Name of the vDisk"))
                .attribute(computed("pvs_farm_id", "ID of the PVS farm"))
                .attribute(computed("pvs_site_id", "ID of the PVS site"))
                .attribute(computed("pvs_store_id", "ID of the PVS store"))
                .attribute(computed("pvs_vdisk_id", "ID of the vDisk"))
                .build(),
        )
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let data = self.data.get(diags).await?;
        let farm_name = input(diags, &config.pvs_farm_name, "pvs_farm_name")?;
        let site_name = input(diags, &config.pvs_site_name, "pvs_site_name")?;
        let store_name = input(diags, &config.pvs_store_name, "pvs_store_name")?;
        let vdisk_name = input(diags, &config.vdisk_name, "vdisk_name")?;
        let pvs = data.client.pvs();

        let sites = match pvs.list_sites(farm_name).await {
            Ok(sites) => sites,
            Err(e) => {
                diags.root_error("Failed to read PVS sites", format!("API error: {}", e));
                return None;
            }
        };
        let Some(site) = sites
            .into_iter()
            .find(|s| s.site_name.eq_ignore_ascii_case(site_name))
        else {
            diags.error(
                "PVS site not found",
                format!("Farm {} has no site named {}", farm_name, site_name),
                AttributePath::new("pvs_site_name"),
            );
            return None;
        };

        let vdisks = match pvs.list_vdisks(&site.farm_id, &site.site_id).await {
            Ok(vdisks) => vdisks,
            Err(e) => {
                diags.root_error("Failed to read PVS vDisks", format!("API error: {}", e));
                return None;
            }
        };
        let Some(vdisk) = vdisks.into_iter().find(|d| {
            d.disk_locator_name.eq_ignore_ascii_case(vdisk_name)
                && d.store_name
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(store_name))
        }) else {
            diags.error(
                "PVS vDisk not found",
                format!(
                    "Site {} has no vDisk named {} in store {}",
                    site_name, vdisk_name, store_name
                ),
                AttributePath::new("vdisk_name"),
            );
            return None;
        };

        tracing::debug!("Resolved PVS vDisk {} to {}", vdisk_name, vdisk.disk_locator_id);
        Some(PvsState {
            pvs_farm_id: Value::Value(site.farm_id),
            pvs_site_id: Value::Value(site.site_id),
            pvs_store_id: vdisk.store_id.map_or(Value::Null, Value::Value),
            pvs_vdisk_id: Value::Value(vdisk.disk_locator_id),
            ..config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::{CitrixProviderData, SharedProviderData};
    use crate::storefront::{ProcessExecutor, StoreFrontClient};
    use mockito::{Matcher, Server, ServerGuard};
    use std::sync::Arc;

    async fn data_source(url: &str) -> PvsDataSource {
        let data = SharedProviderData::new();
        data.set(CitrixProviderData::new(
            create_test_client(url),
            StoreFrontClient::new(Arc::new(ProcessExecutor::new(None))),
            false,
        ))
        .await;
        PvsDataSource::new(data)
    }

    fn config(site: &str, vdisk: &str) -> PvsState {
        PvsState {
            pvs_farm_name: Value::Value("Farm 1".to_string()),
            pvs_site_name: Value::Value(site.to_string()),
            pvs_store_name: Value::Value("Store".to_string()),
            vdisk_name: Value::Value(vdisk.to_string()),
            ..Default::default()
        }
    }

    async fn mock_farm(server: &mut ServerGuard) {
        server
            .mock("GET", "/PvsStreaming/Sites")
            .match_query(Matcher::UrlEncoded("farmName".into(), "Farm 1".into()))
            .with_status(200)
            .with_body(
                r#"{"Items":[{"FarmId":"f1","FarmName":"Farm 1","SiteId":"s1","SiteName":"Site"}]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/PvsStreaming/vDisks")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"Items":[
                    {"DiskLocatorId":"d0","DiskLocatorName":"win11","StoreId":"st0","StoreName":"Other"},
                    {"DiskLocatorId":"d1","DiskLocatorName":"win11","StoreId":"st1","StoreName":"Store"}
                ]}"#,
            )
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_read_resolves_ids() {
        let mut server = Server::new_async().await;
        mock_farm(&mut server).await;

        let ds = data_source(&server.url()).await;
        let mut diags = Diagnostics::default();
        let state = ds
            .read(&mut diags, config("site", "WIN11"), ValueEmpty::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.pvs_farm_id, Value::Value("f1".to_string()));
        assert_eq!(state.pvs_site_id, Value::Value("s1".to_string()));
        assert_eq!(state.pvs_store_id, Value::Value("st1".to_string()));
        assert_eq!(state.pvs_vdisk_id, Value::Value("d1".to_string()));
        assert_eq!(state.vdisk_name, Value::Value("WIN11".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_site_is_an_error() {
        let mut server = Server::new_async().await;
        mock_farm(&mut server).await;

        let ds = data_source(&server.url()).await;
        let mut diags = Diagnostics::default();
        let state = ds
            .read(&mut diags, config("Elsewhere", "win11"), ValueEmpty::default())
            .await;

        assert!(state.is_none());
        assert_eq!(diags.errors[0].summary, "PVS site not found");
    }

    #[tokio::test]
    async fn test_unknown_vdisk_is_an_error() {
        let mut server = Server::new_async().await;
        mock_farm(&mut server).await;

        let ds = data_source(&server.url()).await;
        let mut diags = Diagnostics::default();
        let state = ds
            .read(&mut diags, config("Site", "win10"), ValueEmpty::default())
            .await;

        assert!(state.is_none());
        assert_eq!(diags.errors[0].summary, "PVS vDisk not found");
    }
}
