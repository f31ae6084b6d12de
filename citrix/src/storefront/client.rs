//! StoreFront administration through the StoreFront PowerShell SDK

use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use super::command::{store_service_expression, PowerShellCommand};
use super::error::StoreFrontError;
use super::executor::PowerShellExecutor;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    #[serde(deserialize_with = "string_or_number")]
    pub site_id: String,
    pub host_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoreService {
    #[serde(deserialize_with = "string_or_number")]
    pub site_id: String,
    pub virtual_path: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub load_balance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreServiceSpec {
    pub site_id: String,
    pub virtual_path: String,
    pub friendly_name: Option<String>,
    pub authentication_service_virtual_path: Option<String>,
    pub anonymous: bool,
    pub load_balance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoreFarm {
    pub farm_name: String,
    pub farm_type: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub servers: Vec<String>,
    pub port: i64,
    pub transport_type: String,
    #[serde(default)]
    pub load_balance: bool,
    #[serde(default, deserialize_with = "one_or_many")]
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFarmSpec {
    pub site_id: String,
    pub store_virtual_path: String,
    pub farm_name: String,
    pub farm_type: String,
    pub servers: Vec<String>,
    pub port: i64,
    pub transport_type: String,
    pub load_balance: bool,
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorePna {
    #[serde(default)]
    pub pna_enabled: bool,
    #[serde(default)]
    pub default_pna_service: bool,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// `ConvertTo-Json` emits a bare value for single-element arrays
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

/// Parses `Get-*` output; empty output means the object does not exist
fn parse_optional<T: for<'de> Deserialize<'de>>(output: &str) -> Result<Option<T>, StoreFrontError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }

    match serde_json::from_str::<OneOrMany<T>>(trimmed) {
        Ok(OneOrMany::One(v)) => Ok(Some(v)),
        Ok(OneOrMany::Many(v)) => Ok(v.into_iter().next()),
        Err(e) => {
            tracing::error!("Failed to parse StoreFront output: {}, output: {}", e, trimmed);
            Err(StoreFrontError::Parse(e.to_string()))
        }
    }
}

/// Select-Object stage that flattens the SDK objects into plain JSON
const DEPLOYMENT_FIELDS: &str =
    "Select-Object SiteId, @{n='HostBaseUrl';e={$_.HostbaseUrl.AbsoluteUri.TrimEnd('/')}}";
const STORE_FIELDS: &str = "Select-Object SiteId, VirtualPath, FriendlyName, \
     @{n='Anonymous';e={$_.Service.Anonymous}}, \
     @{n='LoadBalance';e={$_.FarmsConfiguration.LoadBalance}}";
const FARM_FIELDS: &str = "Select-Object FarmName, @{n='FarmType';e={$_.FarmType.ToString()}}, \
     Servers, Port, @{n='TransportType';e={$_.TransportType.ToString()}}, LoadBalance, Zones";
const PNA_FIELDS: &str = "Select-Object PnaEnabled, DefaultPnaService";

#[derive(Clone)]
pub struct StoreFrontClient {
    executor: Arc<dyn PowerShellExecutor>,
}

impl StoreFrontClient {
    pub fn new(executor: Arc<dyn PowerShellExecutor>) -> Self {
        Self { executor }
    }

    async fn run(&self, command: PowerShellCommand) -> Result<String, StoreFrontError> {
        self.executor.run(&command.render()).await
    }

    // Deployment

    pub async fn add_deployment(&self, site_id: &str, host_base_url: &str) -> Result<(), StoreFrontError> {
        tracing::info!("Adding StoreFront deployment for site {}", site_id);
        self.run(
            PowerShellCommand::new("Add-STFDeployment")
                .param("SiteId", site_id)
                .param("HostBaseUrl", host_base_url)
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    pub async fn get_deployment(&self, site_id: &str) -> Result<Option<Deployment>, StoreFrontError> {
        let output = self
            .run(
                PowerShellCommand::new("Get-STFDeployment")
                    .param("SiteId", site_id)
                    .pipe(DEPLOYMENT_FIELDS)
                    .pipe_to_json(),
            )
            .await?;
        parse_optional(&output)
    }

    pub async fn set_deployment(&self, site_id: &str, host_base_url: &str) -> Result<(), StoreFrontError> {
        self.run(
            PowerShellCommand::new("Set-STFDeployment")
                .param("SiteId", site_id)
                .param("HostBaseUrl", host_base_url)
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    pub async fn clear_deployment(&self, site_id: &str) -> Result<(), StoreFrontError> {
        tracing::info!("Clearing StoreFront deployment for site {}", site_id);
        self.run(
            PowerShellCommand::new("Clear-STFDeployment")
                .param("SiteId", site_id)
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    // Store service

    pub async fn add_store_service(&self, spec: &StoreServiceSpec) -> Result<(), StoreFrontError> {
        tracing::info!("Adding StoreFront store {}", spec.virtual_path);
        let mut command = PowerShellCommand::new("Add-STFStoreService")
            .param("SiteId", &spec.site_id)
            .param("VirtualPath", &spec.virtual_path)
            .param_opt("FriendlyName", spec.friendly_name.as_deref());

        command = if spec.anonymous {
            command.switch("Anonymous")
        } else {
            let auth_path = spec
                .authentication_service_virtual_path
                .clone()
                .unwrap_or_else(|| format!("{}Auth", spec.virtual_path.trim_end_matches('/')));
            command.raw_param(
                "AuthenticationService",
                &PowerShellCommand::new("Get-STFAuthenticationService")
                    .param("SiteId", &spec.site_id)
                    .param("VirtualPath", &auth_path)
                    .as_subexpression(),
            )
        };

        self.run(command.bool_param("LoadBalance", spec.load_balance).no_confirm())
            .await
            .map(|_| ())
    }

    pub async fn get_store_service(
        &self,
        site_id: &str,
        virtual_path: &str,
    ) -> Result<Option<StoreService>, StoreFrontError> {
        let output = self
            .run(
                PowerShellCommand::new("Get-STFStoreService")
                    .param("SiteId", site_id)
                    .param("VirtualPath", virtual_path)
                    .pipe(STORE_FIELDS)
                    .pipe_to_json(),
            )
            .await?;
        parse_optional(&output)
    }

    pub async fn set_store_service(&self, spec: &StoreServiceSpec) -> Result<(), StoreFrontError> {
        self.run(
            PowerShellCommand::new("Set-STFStoreService")
                .raw_param(
                    "StoreService",
                    &store_service_expression(&spec.site_id, &spec.virtual_path),
                )
                .param_opt("FriendlyName", spec.friendly_name.as_deref())
                .bool_param("LoadBalance", spec.load_balance)
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    pub async fn remove_store_service(&self, site_id: &str, virtual_path: &str) -> Result<(), StoreFrontError> {
        tracing::info!("Removing StoreFront store {}", virtual_path);
        self.run(
            PowerShellCommand::new("Remove-STFStoreService")
                .raw_param("StoreService", &store_service_expression(site_id, virtual_path))
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    // Store farm

    fn farm_command(cmdlet: &str, spec: &StoreFarmSpec) -> PowerShellCommand {
        let mut command = PowerShellCommand::new(cmdlet)
            .raw_param(
                "StoreService",
                &store_service_expression(&spec.site_id, &spec.store_virtual_path),
            )
            .param("FarmName", &spec.farm_name)
            .param("FarmType", &spec.farm_type)
            .list_param("Servers", &spec.servers)
            .int_param("Port", spec.port)
            .param("TransportType", &spec.transport_type)
            .bool_param("LoadBalance", spec.load_balance);
        if !spec.zones.is_empty() {
            command = command.list_param("Zones", &spec.zones);
        }
        command.no_confirm()
    }

    pub async fn add_store_farm(&self, spec: &StoreFarmSpec) -> Result<(), StoreFrontError> {
        tracing::info!("Adding farm {} to store {}", spec.farm_name, spec.store_virtual_path);
        self.run(Self::farm_command("Add-STFStoreFarm", spec))
            .await
            .map(|_| ())
    }

    pub async fn get_store_farm(
        &self,
        site_id: &str,
        store_virtual_path: &str,
        farm_name: &str,
    ) -> Result<Option<StoreFarm>, StoreFrontError> {
        let output = self
            .run(
                PowerShellCommand::new("Get-STFStoreFarm")
                    .raw_param(
                        "StoreService",
                        &store_service_expression(site_id, store_virtual_path),
                    )
                    .param("FarmName", farm_name)
                    .pipe(FARM_FIELDS)
                    .pipe_to_json(),
            )
            .await?;
        parse_optional(&output)
    }

    pub async fn set_store_farm(&self, spec: &StoreFarmSpec) -> Result<(), StoreFrontError> {
        self.run(Self::farm_command("Set-STFStoreFarm", spec))
            .await
            .map(|_| ())
    }

    pub async fn remove_store_farm(
        &self,
        site_id: &str,
        store_virtual_path: &str,
        farm_name: &str,
    ) -> Result<(), StoreFrontError> {
        tracing::info!("Removing farm {} from store {}", farm_name, store_virtual_path);
        self.run(
            PowerShellCommand::new("Remove-STFStoreFarm")
                .raw_param(
                    "StoreService",
                    &store_service_expression(site_id, store_virtual_path),
                )
                .param("FarmName", farm_name)
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    // PNA (XenApp services site)

    pub async fn enable_default_pna(&self, site_id: &str, store_virtual_path: &str) -> Result<(), StoreFrontError> {
        tracing::info!("Making {} the default XenApp Services store", store_virtual_path);
        self.run(
            PowerShellCommand::new("Enable-STFStorePna")
                .raw_param(
                    "StoreService",
                    &store_service_expression(site_id, store_virtual_path),
                )
                .switch("DefaultPnaService")
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }

    pub async fn get_store_pna(
        &self,
        site_id: &str,
        store_virtual_path: &str,
    ) -> Result<Option<StorePna>, StoreFrontError> {
        let output = self
            .run(
                PowerShellCommand::new("Get-STFStorePna")
                    .raw_param(
                        "StoreService",
                        &store_service_expression(site_id, store_virtual_path),
                    )
                    .pipe(PNA_FIELDS)
                    .pipe_to_json(),
            )
            .await?;
        parse_optional(&output)
    }

    pub async fn disable_pna(&self, site_id: &str, store_virtual_path: &str) -> Result<(), StoreFrontError> {
        self.run(
            PowerShellCommand::new("Disable-STFStorePna")
                .raw_param(
                    "StoreService",
                    &store_service_expression(site_id, store_virtual_path),
                )
                .no_confirm(),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::executor::MockExecutor;

    fn client(mock: MockExecutor) -> (StoreFrontClient, Arc<MockExecutor>) {
        let mock = Arc::new(mock);
        (StoreFrontClient::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_get_deployment_parses_numeric_site_id() {
        let (client, mock) =
            client(MockExecutor::new().respond(r#"{"SiteId":1,"HostBaseUrl":"https://stf.corp.local"}"#));

        let deployment = client.get_deployment("1").await.unwrap().unwrap();
        assert_eq!(deployment.site_id, "1");
        assert_eq!(deployment.host_base_url, "https://stf.corp.local");
        assert!(mock.scripts()[0].starts_with("Get-STFDeployment -SiteId '1' | Select-Object"));
    }

    #[tokio::test]
    async fn test_missing_object_is_none() {
        let (client, _) = client(MockExecutor::new().respond(""));
        assert!(client.get_deployment("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_output_is_parse_error() {
        let (client, _) = client(MockExecutor::new().respond("WARNING: not json"));
        assert!(matches!(
            client.get_deployment("1").await,
            Err(StoreFrontError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_add_store_uses_authentication_service() {
        let (client, mock) = client(MockExecutor::new());
        client
            .add_store_service(&StoreServiceSpec {
                site_id: "1".to_string(),
                virtual_path: "/Citrix/Store".to_string(),
                friendly_name: Some("Main Store".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            mock.scripts()[0],
            "Add-STFStoreService -SiteId '1' -VirtualPath '/Citrix/Store' -FriendlyName 'Main Store' \
             -AuthenticationService (Get-STFAuthenticationService -SiteId '1' -VirtualPath '/Citrix/StoreAuth') \
             -LoadBalance:$false -Confirm:$false"
        );
    }

    #[tokio::test]
    async fn test_add_anonymous_store() {
        let (client, mock) = client(MockExecutor::new());
        client
            .add_store_service(&StoreServiceSpec {
                site_id: "1".to_string(),
                virtual_path: "/Citrix/Anon".to_string(),
                anonymous: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let script = &mock.scripts()[0];
        assert!(script.contains("-Anonymous"));
        assert!(!script.contains("AuthenticationService"));
    }

    #[tokio::test]
    async fn test_store_farm_round_trip() {
        let (client, mock) = client(MockExecutor::new().respond("").respond(
            r#"{"FarmName":"Farm1","FarmType":"XenDesktop","Servers":"ddc1","Port":80,"TransportType":"HTTP","LoadBalance":false,"Zones":null}"#,
        ));

        let spec = StoreFarmSpec {
            site_id: "1".to_string(),
            store_virtual_path: "/Citrix/Store".to_string(),
            farm_name: "Farm1".to_string(),
            farm_type: "XenDesktop".to_string(),
            servers: vec!["ddc1".to_string()],
            port: 80,
            transport_type: "HTTP".to_string(),
            load_balance: false,
            zones: Vec::new(),
        };
        client.add_store_farm(&spec).await.unwrap();
        let farm = client
            .get_store_farm("1", "/Citrix/Store", "Farm1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(farm.servers, vec!["ddc1"]);
        assert!(farm.zones.is_empty());
        assert!(mock.scripts()[0].starts_with(
            "Add-STFStoreFarm -StoreService (Get-STFStoreService -SiteId '1' -VirtualPath '/Citrix/Store')"
        ));
        assert!(!mock.scripts()[0].contains("-Zones"));
    }

    #[tokio::test]
    async fn test_enable_default_pna() {
        let (client, mock) = client(MockExecutor::new());
        client.enable_default_pna("1", "/Citrix/Store").await.unwrap();
        assert_eq!(
            mock.scripts()[0],
            "Enable-STFStorePna -StoreService (Get-STFStoreService -SiteId '1' -VirtualPath '/Citrix/Store') \
             -DefaultPnaService -Confirm:$false"
        );
    }

    #[tokio::test]
    async fn test_command_failure_propagates() {
        let (client, _) = client(MockExecutor::new().fail("Access denied"));
        let err = client.clear_deployment("1").await.unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }
}
