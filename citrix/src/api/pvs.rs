//! PVS streaming site and vDisk lookups

use serde::Deserialize;

use super::client::Client;
use super::common::{ApiQueryParams, ListResponse};
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PvsSite {
    pub farm_id: String,
    #[serde(default)]
    pub farm_name: Option<String>,
    pub site_id: String,
    pub site_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PvsVdisk {
    pub disk_locator_id: String,
    pub disk_locator_name: String,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
}

pub struct PvsApi<'a> {
    client: &'a Client,
}

impl<'a> PvsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list_sites(&self, farm_name: &str) -> Result<Vec<PvsSite>, ApiError> {
        let params = ApiQueryParams::new().add("farmName", farm_name);
        let response: ListResponse<PvsSite> = self
            .client
            .get_with_params("/PvsStreaming/Sites", &params)
            .await?;
        Ok(response.items)
    }

    pub async fn list_vdisks(&self, farm_id: &str, site_id: &str) -> Result<Vec<PvsVdisk>, ApiError> {
        let params = ApiQueryParams::new()
            .add("farmId", farm_id)
            .add("siteId", site_id);
        let response: ListResponse<PvsVdisk> = self
            .client
            .get_with_params("/PvsStreaming/vDisks", &params)
            .await?;
        Ok(response.items)
    }
}
