//! Machine catalog API implementation

use serde::{Deserialize, Serialize};

use super::batch::BatchRequestItem;
use super::client::Client;
use super::common::{ApiQueryParams, CitrixApiResource, ListResponse, NameValueStringPair, RefResponse};
use super::error::ApiError;
use super::hypervisors::HypervisorResourceRef;
use super::machines::{Machine, MachineRemoval};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineAccountCreationRules {
    #[serde(default)]
    pub naming_scheme: Option<String>,
    #[serde(default)]
    pub naming_scheme_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "OU", default, skip_serializing_if = "Option::is_none")]
    pub ou: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemotePcEnrollmentScope {
    #[serde(rename = "OU")]
    pub ou: String,
    #[serde(default)]
    pub include_subfolders: bool,
    #[serde(default = "default_true")]
    pub is_organizational_unit: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkMappingRequest {
    pub network_device_name_or_id: String,
    pub network_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkMappingResponse {
    #[serde(default)]
    pub network_device_name_or_id: Option<String>,
    #[serde(default)]
    pub network: Option<HypervisorResourceRef>,
}

/// Domain service account used by MCS to create AD computer accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainCredentials {
    pub username: String,
    pub password: String,
}

/// Provisioning scheme part of create and update-image requests
///
/// The per-hypervisor translators fill in the image path, machine profile, sizing
/// and custom properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningSchemeRequest {
    pub num_total_machines: i64,
    pub identity_type: String,
    pub machine_account_creation_rules: MachineAccountCreationRules,
    pub resource_pool: String,
    /// Empty for PVS streaming, which boots from the vDisk instead
    #[serde(skip_serializing_if = "String::is_empty")]
    pub master_image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_profile_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_image_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_offering_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores_per_cpu_count: Option<i64>,
    #[serde(rename = "MemoryMB", skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network_mapping: Vec<NetworkMappingRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_properties: Vec<NameValueStringPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_write_back_cache: Option<bool>,
    #[serde(rename = "WriteBackCacheDiskSizeGB", skip_serializing_if = "Option::is_none")]
    pub write_back_cache_disk_size_gb: Option<i64>,
    #[serde(rename = "WriteBackCacheMemorySizeMB", skip_serializing_if = "Option::is_none")]
    pub write_back_cache_memory_size_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_back_cache_drive_letter: Option<String>,
    #[serde(rename = "PVSSite", skip_serializing_if = "Option::is_none")]
    pub pvs_site: Option<String>,
    #[serde(rename = "PVSVDisk", skip_serializing_if = "Option::is_none")]
    pub pvs_vdisk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_management_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_credentials: Option<DomainCredentials>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningSchemeResponse {
    #[serde(default)]
    pub hypervisor_connection: Option<RefResponse>,
    #[serde(default)]
    pub resource_pool: Option<RefResponse>,
    #[serde(default)]
    pub identity_type: Option<String>,
    #[serde(default)]
    pub machine_account_creation_rules: Option<MachineAccountCreationRules>,
    #[serde(default)]
    pub master_image: Option<HypervisorResourceRef>,
    #[serde(default)]
    pub master_image_note: Option<String>,
    #[serde(default)]
    pub machine_profile: Option<HypervisorResourceRef>,
    #[serde(default)]
    pub service_offering: Option<String>,
    #[serde(default)]
    pub cpu_count: Option<i64>,
    #[serde(default)]
    pub cores_per_cpu_count: Option<i64>,
    #[serde(rename = "MemoryMB", default)]
    pub memory_mb: Option<i64>,
    #[serde(default)]
    pub network_mapping: Vec<NetworkMappingResponse>,
    #[serde(default)]
    pub custom_properties: Vec<NameValueStringPair>,
    #[serde(rename = "WriteBackCacheDiskSizeGB", default)]
    pub write_back_cache_disk_size_gb: Option<i64>,
    #[serde(rename = "WriteBackCacheMemorySizeMB", default)]
    pub write_back_cache_memory_size_mb: Option<i64>,
    #[serde(default)]
    pub write_back_cache_drive_letter: Option<String>,
    #[serde(rename = "PVSSite", default)]
    pub pvs_site: Option<String>,
    #[serde(rename = "PVSVDisk", default)]
    pub pvs_vdisk: Option<String>,
    #[serde(default)]
    pub device_management_type: Option<String>,
    #[serde(default)]
    pub tenancy_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddMachineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_machine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypervisor_connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_account_creation_rules: Option<MachineAccountCreationRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_credentials: Option<DomainCredentials>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateMachineCatalogRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub allocation_type: String,
    pub session_support: String,
    pub persist_user_changes: String,
    pub provisioning_type: String,
    pub is_power_managed: bool,
    #[serde(rename = "IsRemotePC")]
    pub is_remote_pc: bool,
    pub minimum_functional_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub machine_accounts: Vec<AddMachineRequest>,
    #[serde(rename = "RemotePCEnrollmentScopes", skip_serializing_if = "Vec::is_empty")]
    pub remote_pc_enrollment_scopes: Vec<RemotePcEnrollmentScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_scheme: Option<ProvisioningSchemeRequest>,
}

/// PATCH body; unset fields are left alone by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateMachineCatalogRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_power_managed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_functional_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(rename = "RemotePCEnrollmentScopes", skip_serializing_if = "Option::is_none")]
    pub remote_pc_enrollment_scopes: Option<Vec<RemotePcEnrollmentScope>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mapping: Option<Vec<NetworkMappingRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<Vec<NameValueStringPair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores_per_cpu_count: Option<i64>,
    #[serde(rename = "MemoryMB", skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_write_back_cache: Option<bool>,
    #[serde(rename = "WriteBackCacheDiskSizeGB", skip_serializing_if = "Option::is_none")]
    pub write_back_cache_disk_size_gb: Option<i64>,
    #[serde(rename = "WriteBackCacheMemorySizeMB", skip_serializing_if = "Option::is_none")]
    pub write_back_cache_memory_size_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_back_cache_drive_letter: Option<String>,
}

impl UpdateMachineCatalogRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Body of `$UpdateProvisioningScheme`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateProvisioningSchemeRequest {
    pub master_image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_image_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_profile_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_offering_path: Option<String>,
    pub store_old_image: bool,
    pub minimum_functional_level: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineCatalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allocation_type: Option<String>,
    #[serde(default)]
    pub session_support: Option<String>,
    #[serde(default)]
    pub persist_user_changes: Option<String>,
    #[serde(default)]
    pub provisioning_type: Option<String>,
    #[serde(default)]
    pub is_power_managed: Option<bool>,
    #[serde(rename = "IsRemotePC", default)]
    pub is_remote_pc: Option<bool>,
    #[serde(default)]
    pub minimum_functional_level: Option<String>,
    #[serde(default)]
    pub zone: Option<RefResponse>,
    #[serde(default)]
    pub scopes: Vec<RefResponse>,
    #[serde(rename = "RemotePCEnrollmentScopes", default)]
    pub remote_pc_enrollment_scopes: Vec<RemotePcEnrollmentScope>,
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub provisioning_scheme: Option<ProvisioningSchemeResponse>,
}

impl CitrixApiResource for MachineCatalog {
    fn api_path() -> &'static str {
        "/MachineCatalogs"
    }
}

pub struct MachineCatalogsApi<'a> {
    client: &'a Client,
}

impl<'a> MachineCatalogsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, name_or_id: &str) -> Result<MachineCatalog, ApiError> {
        self.client
            .get(&MachineCatalog::resource_path(name_or_id))
            .await
    }

    /// Starts catalog creation and returns the job ID
    pub async fn create(&self, request: &CreateMachineCatalogRequest) -> Result<String, ApiError> {
        let path = format!(
            "{}{}",
            MachineCatalog::api_path(),
            ApiQueryParams::new().asynchronous().to_query_string()
        );
        self.client.post_async(&path, request).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateMachineCatalogRequest,
    ) -> Result<String, ApiError> {
        let path = format!(
            "{}{}",
            MachineCatalog::resource_path(id),
            ApiQueryParams::new().asynchronous().to_query_string()
        );
        self.client.patch_async(&path, request).await
    }

    pub async fn delete(&self, id: &str, removal: MachineRemoval) -> Result<String, ApiError> {
        let params = ApiQueryParams::new()
            .add("deleteVm", removal.delete_vm)
            .add("purgeDBOnly", false)
            .add(
                "deleteAccount",
                if removal.delete_account { "Delete" } else { "None" },
            )
            .asynchronous();
        let path = format!(
            "{}{}",
            MachineCatalog::resource_path(id),
            params.to_query_string()
        );
        self.client.delete_async(&path).await
    }

    pub async fn list_machines(&self, id: &str) -> Result<Vec<Machine>, ApiError> {
        let mut machines = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let params =
                ApiQueryParams::new().add_optional("continuationToken", continuation.as_deref());
            let page: ListResponse<Machine> = self
                .client
                .get_with_params(&format!("{}/Machines", MachineCatalog::resource_path(id)), &params)
                .await?;
            machines.extend(page.items);

            match page.continuation_token {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => break,
            }
        }

        Ok(machines)
    }

    pub async fn update_provisioning_scheme(
        &self,
        id: &str,
        request: &UpdateProvisioningSchemeRequest,
    ) -> Result<String, ApiError> {
        let path = format!(
            "{}/$UpdateProvisioningScheme{}",
            MachineCatalog::resource_path(id),
            ApiQueryParams::new().asynchronous().to_query_string()
        );
        self.client.post_async(&path, request).await
    }
}

/// Batch item that adds one machine to a catalog
pub fn add_machine_item(
    catalog_id: &str,
    reference: impl Into<String>,
    request: &AddMachineRequest,
) -> Result<BatchRequestItem, ApiError> {
    BatchRequestItem::new(
        reference,
        "POST",
        format!(
            "{}/Machines?async=true",
            MachineCatalog::resource_path(catalog_id)
        ),
    )
    .with_json_body(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_catalog_with_scheme() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/MachineCatalogs/cat-1")
            .with_status(200)
            .with_body(
                r#"{
                "Id":"cat-1","Name":"win11","AllocationType":"Random","SessionSupport":"SingleSession",
                "PersistUserChanges":"Discard","ProvisioningType":"MCS","IsPowerManaged":true,"IsRemotePC":false,
                "MinimumFunctionalLevel":"L7_20","TotalCount":2,
                "Zone":{"Id":"z1","Name":"Primary"},
                "ProvisioningScheme":{
                    "HypervisorConnection":{"Id":"h1","Name":"azure"},
                    "ResourcePool":{"Id":"p1","Name":"pool"},
                    "IdentityType":"ActiveDirectory",
                    "MachineAccountCreationRules":{"NamingScheme":"win-##","NamingSchemeType":"Numeric","Domain":"corp.local"},
                    "MasterImage":{"XDPath":"XDHyp:\\HostingUnits\\pool\\rg.resourcegroup\\disk.manageddisk"},
                    "ServiceOffering":"Standard_D2s_v3",
                    "CustomProperties":[{"Name":"StorageType","Value":"Premium_LRS"}],
                    "MemoryMB":4096
                }
            }"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let catalog = client.machine_catalogs().get("cat-1").await.unwrap();

        assert_eq!(catalog.total_count, Some(2));
        let scheme = catalog.provisioning_scheme.unwrap();
        assert_eq!(scheme.hypervisor_connection.unwrap().id, "h1");
        assert_eq!(scheme.memory_mb, Some(4096));
        assert_eq!(scheme.custom_properties.len(), 1);
        assert_eq!(
            scheme.machine_account_creation_rules.unwrap().domain.as_deref(),
            Some("corp.local")
        );
    }

    #[tokio::test]
    async fn test_create_is_async() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/MachineCatalogs")
            .match_query(Matcher::UrlEncoded("async".into(), "true".into()))
            .match_body(Matcher::PartialJson(json!({
                "Name": "manual",
                "ProvisioningType": "Manual",
                "IsRemotePC": false
            })))
            .with_status(202)
            .with_header("location", "https://x/cvad/manage/Jobs/job-9")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let request = CreateMachineCatalogRequest {
            name: "manual".to_string(),
            allocation_type: "Random".to_string(),
            session_support: "MultiSession".to_string(),
            persist_user_changes: "Discard".to_string(),
            provisioning_type: "Manual".to_string(),
            minimum_functional_level: "L7_20".to_string(),
            ..Default::default()
        };
        let job = client.machine_catalogs().create(&request).await.unwrap();

        assert_eq!(job, "job-9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/MachineCatalogs/cat-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("deleteVm".into(), "true".into()),
                Matcher::UrlEncoded("purgeDBOnly".into(), "false".into()),
                Matcher::UrlEncoded("deleteAccount".into(), "Delete".into()),
                Matcher::UrlEncoded("async".into(), "true".into()),
            ]))
            .with_status(202)
            .with_header("location", "/Jobs/job-del")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let job = client
            .machine_catalogs()
            .delete(
                "cat-1",
                MachineRemoval {
                    delete_vm: true,
                    delete_account: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(job, "job-del");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_machines_follows_continuation() {
        let mut server = Server::new_async().await;
        let _first = server
            .mock("GET", "/MachineCatalogs/cat-1/Machines")
            .match_query(Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"Items":[{"Id":"m1","Name":"CORP\\a"}],"ContinuationToken":"next"}"#)
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/MachineCatalogs/cat-1/Machines")
            .match_query(Matcher::UrlEncoded("continuationToken".into(), "next".into()))
            .with_status(200)
            .with_body(r#"{"Items":[{"Id":"m2","Name":"CORP\\b"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let machines = client.machine_catalogs().list_machines("cat-1").await.unwrap();

        assert_eq!(
            machines.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
    }

    #[test]
    fn test_add_machine_item() {
        let item = add_machine_item(
            "cat-1",
            "add-0",
            &AddMachineRequest {
                machine_account_creation_rules: Some(MachineAccountCreationRules {
                    naming_scheme: Some("vda-##".to_string()),
                    naming_scheme_type: Some("Numeric".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(item.relative_url, "/MachineCatalogs/cat-1/Machines?async=true");
        assert!(item.body.unwrap().contains(r#""NamingScheme":"vda-##""#));
    }

    #[test]
    fn test_empty_update_request() {
        assert!(UpdateMachineCatalogRequest::default().is_empty());
        let request = UpdateMachineCatalogRequest {
            description: Some("new".to_string()),
            ..Default::default()
        };
        assert!(!request.is_empty());

        let sizing = UpdateMachineCatalogRequest {
            cpu_count: Some(4),
            memory_mb: Some(8192),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&sizing).unwrap(),
            serde_json::json!({"CpuCount": 4, "MemoryMB": 8192})
        );
    }
}
