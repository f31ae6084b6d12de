//! Hypervisor connection, resource pool and hypervisor resource lookups

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, CitrixApiResource, RefResponse};
use super::error::ApiError;

/// Plugin ID that marks a Custom connection as Nutanix AHV
pub const NUTANIX_PLUGIN_ID: &str = "AcropolisFactory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionType {
    AzureRM,
    AWS,
    GoogleCloudPlatform,
    VCenter,
    XenServer,
    SCVMM,
    Custom,
    #[serde(other)]
    Unknown,
}

/// Hypervisor family a provisioning scheme is translated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypervisorConnectionType {
    Azure,
    Aws,
    Gcp,
    VSphere,
    XenServer,
    Scvmm,
    Nutanix,
}

impl HypervisorConnectionType {
    pub const ALL: [HypervisorConnectionType; 7] = [
        HypervisorConnectionType::Azure,
        HypervisorConnectionType::Aws,
        HypervisorConnectionType::Gcp,
        HypervisorConnectionType::VSphere,
        HypervisorConnectionType::XenServer,
        HypervisorConnectionType::Scvmm,
        HypervisorConnectionType::Nutanix,
    ];

    /// Name of the machine config block that belongs to this connection type
    pub fn config_block(&self) -> &'static str {
        match self {
            HypervisorConnectionType::Azure => "azure_machine_config",
            HypervisorConnectionType::Aws => "aws_machine_config",
            HypervisorConnectionType::Gcp => "gcp_machine_config",
            HypervisorConnectionType::VSphere => "vsphere_machine_config",
            HypervisorConnectionType::XenServer => "xenserver_machine_config",
            HypervisorConnectionType::Scvmm => "scvmm_machine_config",
            HypervisorConnectionType::Nutanix => "nutanix_machine_config",
        }
    }
}

impl std::fmt::Display for HypervisorConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HypervisorConnectionType::Azure => "Azure",
            HypervisorConnectionType::Aws => "AWS",
            HypervisorConnectionType::Gcp => "GCP",
            HypervisorConnectionType::VSphere => "vSphere",
            HypervisorConnectionType::XenServer => "XenServer",
            HypervisorConnectionType::Scvmm => "SCVMM",
            HypervisorConnectionType::Nutanix => "Nutanix",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hypervisor {
    pub id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub zone: Option<RefResponse>,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

impl Hypervisor {
    /// Maps the API connection type onto a supported provisioning family
    pub fn connection_kind(&self) -> Option<HypervisorConnectionType> {
        match self.connection_type {
            ConnectionType::AzureRM => Some(HypervisorConnectionType::Azure),
            ConnectionType::AWS => Some(HypervisorConnectionType::Aws),
            ConnectionType::GoogleCloudPlatform => Some(HypervisorConnectionType::Gcp),
            ConnectionType::VCenter => Some(HypervisorConnectionType::VSphere),
            ConnectionType::XenServer => Some(HypervisorConnectionType::XenServer),
            ConnectionType::SCVMM => Some(HypervisorConnectionType::Scvmm),
            ConnectionType::Custom
                if self
                    .plugin_id
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(NUTANIX_PLUGIN_ID)) =>
            {
                Some(HypervisorConnectionType::Nutanix)
            }
            _ => None,
        }
    }
}

impl CitrixApiResource for Hypervisor {
    fn api_path() -> &'static str {
        "/hypervisors"
    }
}

/// Reference to a hypervisor object by XDPath
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HypervisorResourceRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "XDPath", default)]
    pub xd_path: Option<String>,
    #[serde(default)]
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourcePool {
    pub id: String,
    pub name: String,
    #[serde(rename = "XDPath", default)]
    pub xd_path: Option<String>,
    #[serde(default)]
    pub virtual_network: Option<HypervisorResourceRef>,
    #[serde(default)]
    pub networks: Vec<HypervisorResourceRef>,
    #[serde(default)]
    pub region: Option<HypervisorResourceRef>,
    #[serde(default)]
    pub project: Option<HypervisorResourceRef>,
}

impl ResourcePool {
    /// Parent path for network segments: the virtual network when present, otherwise the pool itself
    pub fn network_parent_path(&self) -> String {
        self.virtual_network
            .as_ref()
            .and_then(|v| v.xd_path.clone())
            .or_else(|| self.xd_path.clone())
            .unwrap_or_else(|| crate::xdpath::hosting_unit_path(&self.name))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HypervisorResource {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "XDPath", default)]
    pub xd_path: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

pub struct HypervisorsApi<'a> {
    client: &'a Client,
}

impl<'a> HypervisorsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, name_or_id: &str) -> Result<Hypervisor, ApiError> {
        self.client.get(&Hypervisor::resource_path(name_or_id)).await
    }

    pub async fn get_resource_pool(
        &self,
        hypervisor: &str,
        pool: &str,
    ) -> Result<ResourcePool, ApiError> {
        let path = format!(
            "{}/resourcePools/{}",
            Hypervisor::resource_path(hypervisor),
            urlencoding::encode(pool)
        );
        self.client.get(&path).await
    }

    /// Looks up a single hypervisor object below a resource pool by its XDPath
    pub async fn get_resource(
        &self,
        hypervisor: &str,
        pool: &str,
        xd_path: &str,
    ) -> Result<HypervisorResource, ApiError> {
        let path = format!(
            "{}/resourcePools/{}/resources",
            Hypervisor::resource_path(hypervisor),
            urlencoding::encode(pool)
        );
        let params = ApiQueryParams::new().add("path", xd_path);
        self.client.get_with_params(&path, &params).await
    }
}
