//! Machine lookups and the request items used for batch add/remove

use serde::{Deserialize, Serialize};

use super::batch::BatchRequestItem;
use super::common::{CitrixApiResource, RefResponse};
use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub machine_catalog: Option<RefResponse>,
    #[serde(default)]
    pub delivery_group: Option<RefResponse>,
    #[serde(default)]
    pub hosted_machine_id: Option<String>,
    #[serde(default)]
    pub hypervisor: Option<RefResponse>,
    #[serde(default)]
    pub power_state: Option<String>,
    #[serde(default)]
    pub registration_state: Option<String>,
    #[serde(default)]
    pub in_maintenance_mode: Option<bool>,
    #[serde(default)]
    pub session_count: Option<i64>,
    #[serde(default)]
    pub associated_users: Vec<RefResponse>,
}

impl Machine {
    /// Machines without sessions or assigned users are removed first when a catalog shrinks
    pub fn is_idle(&self) -> bool {
        self.session_count.unwrap_or(0) == 0 && self.associated_users.is_empty()
    }
}

impl CitrixApiResource for Machine {
    fn api_path() -> &'static str {
        "/Machines"
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateMachineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_maintenance_mode: Option<bool>,
}

/// What happens to the VM and its AD account when a machine leaves its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineRemoval {
    pub delete_vm: bool,
    pub delete_account: bool,
}

impl MachineRemoval {
    pub fn keep_everything() -> Self {
        Self {
            delete_vm: false,
            delete_account: false,
        }
    }

    fn query(&self) -> String {
        format!(
            "deleteVm={}&purgeDBOnly=false&deleteAccount={}&async=true",
            self.delete_vm,
            if self.delete_account { "Delete" } else { "None" }
        )
    }
}

pub struct MachinesApi<'a> {
    client: &'a Client,
}

impl<'a> MachinesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, name_or_id: &str) -> Result<Machine, ApiError> {
        self.client.get(&Machine::resource_path(name_or_id)).await
    }

    pub async fn set_maintenance_mode(&self, id: &str, enabled: bool) -> Result<(), ApiError> {
        self.client
            .patch(
                &Machine::resource_path(id),
                &UpdateMachineRequest {
                    in_maintenance_mode: Some(enabled),
                },
            )
            .await
    }
}

/// Batch item that toggles maintenance mode on one machine
pub fn maintenance_mode_item(machine: &Machine, enabled: bool) -> Result<BatchRequestItem, ApiError> {
    BatchRequestItem::new(
        machine.id.clone(),
        "PATCH",
        Machine::resource_path(&machine.id),
    )
    .with_json_body(&UpdateMachineRequest {
        in_maintenance_mode: Some(enabled),
    })
}

/// Batch item that deletes one machine from its catalog
pub fn delete_machine_item(machine: &Machine, removal: MachineRemoval) -> BatchRequestItem {
    BatchRequestItem::new(
        machine.id.clone(),
        "DELETE",
        format!("{}?{}", Machine::resource_path(&machine.id), removal.query()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn machine(id: &str, sessions: i64) -> Machine {
        serde_json::from_value(json!({"Id": id, "Name": format!("CORP\\{}", id), "SessionCount": sessions}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_machine_by_name_is_url_encoded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/Machines/CORP%5Cvda01")
            .with_status(200)
            .with_body(
                r#"{"Id":"m1","Name":"CORP\\vda01","DnsName":"vda01.corp.local",
                    "MachineCatalog":{"Id":"c1","Name":"cat"},"PowerState":"On",
                    "RegistrationState":"Registered","InMaintenanceMode":false,"SessionCount":2}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let m = client.machines().get(r"CORP\vda01").await.unwrap();

        assert_eq!(m.id, "m1");
        assert_eq!(m.machine_catalog.unwrap().id, "c1");
        assert_eq!(m.session_count, Some(2));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_maintenance_mode() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/Machines/m1")
            .match_body(Matcher::Json(json!({"InMaintenanceMode": true})))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.machines().set_maintenance_mode("m1", true).await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_idle_machines() {
        assert!(machine("a", 0).is_idle());
        assert!(!machine("b", 1).is_idle());
    }

    #[test]
    fn test_delete_item_query() {
        let item = delete_machine_item(
            &machine("m9", 0),
            MachineRemoval {
                delete_vm: true,
                delete_account: true,
            },
        );
        assert_eq!(item.method, "DELETE");
        assert_eq!(
            item.relative_url,
            "/Machines/m9?deleteVm=true&purgeDBOnly=false&deleteAccount=Delete&async=true"
        );

        let item = delete_machine_item(&machine("m9", 0), MachineRemoval::keep_everything());
        assert!(item.relative_url.contains("deleteVm=false"));
        assert!(item.relative_url.contains("deleteAccount=None"));
    }

    #[test]
    fn test_maintenance_item_body() {
        let item = maintenance_mode_item(&machine("m2", 0), true).unwrap();
        assert_eq!(item.body.as_deref(), Some(r#"{"InMaintenanceMode":true}"#));
    }
}
